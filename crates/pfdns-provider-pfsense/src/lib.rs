// # pfSense Remote Store
//
// This crate provides the pfSense implementation of `RemoteStore`, talking to
// the appliance's XML-RPC endpoint (`/xmlrpc.php`).
//
// ## Behavior
//
// - One HTTP request per trait call
// - Full error propagation to the engine; no retry, no backoff
// - HTTP timeout configured (30 seconds by default)
// - Specific error handling for HTTP status codes (401/403, 5xx)
// - No background tasks, no caching
//
// ## Security Requirements
//
// - The admin password NEVER appears in logs or `Debug` output
// - TLS verification can only be disabled explicitly (`insecure`)
//
// ## XML-RPC Methods
//
// - `pfsense.backup_config_section([section])` → struct keyed by section
// - `pfsense.restore_config_section({section: contents}, timeout)` → status
// - `pfsense.exec_php(code)` → value of `$toreturn`

pub mod xmlrpc;

use async_trait::async_trait;
use pfdns_core::config::RemoteStoreConfig;
use pfdns_core::traits::{OperationResult, RemoteStore, RemoteStoreFactory};
use pfdns_core::{Error, Result};
use reqwest::Url;
use reqwest::header::CONTENT_TYPE;
use serde_json::{Value, json};
use std::time::Duration;

/// Path of the XML-RPC endpoint on the appliance
pub const XMLRPC_PATH: &str = "/xmlrpc.php";

/// Default HTTP timeout for requests (30 seconds)
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Seconds pfSense may take to apply a restored section
const RESTORE_TIMEOUT_SECS: i64 = 30;

/// pfSense XML-RPC remote store
///
/// Stateless and single-shot. All coordination is owned by `SyncEngine`.
pub struct PfsenseStore {
    /// Full XML-RPC endpoint URL
    endpoint: Url,

    /// Admin user name
    username: String,

    /// Admin password
    /// ⚠️ NEVER log this value
    password: String,

    /// HTTP client for XML-RPC requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the password
impl std::fmt::Debug for PfsenseStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PfsenseStore")
            .field("endpoint", &self.endpoint.as_str())
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .finish()
    }
}

impl PfsenseStore {
    /// Create a new pfSense store
    ///
    /// # Parameters
    ///
    /// - `url`: Base URL of the appliance; `/xmlrpc.php` is appended when no path is given
    /// - `username` / `password`: admin credentials (HTTP basic auth)
    /// - `insecure`: accept invalid TLS certificates (self-signed appliance certificates)
    /// - `timeout`: per-request timeout
    ///
    /// # Errors
    ///
    /// [`Error::Config`] for an unusable URL or empty credentials.
    pub fn new(
        url: &str,
        username: impl Into<String>,
        password: impl Into<String>,
        insecure: bool,
        timeout: Duration,
    ) -> Result<Self> {
        let username = username.into();
        let password = password.into();

        if username.is_empty() || password.is_empty() {
            return Err(Error::config("pfSense username and password are required"));
        }

        let endpoint = endpoint_url(url)?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(insecure)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        if insecure {
            tracing::warn!("TLS certificate verification disabled for {}", endpoint);
        }

        Ok(Self {
            endpoint,
            username,
            password,
            client,
        })
    }

    /// XML-RPC endpoint this store talks to
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    /// Perform one XML-RPC call
    ///
    /// ```http
    /// POST /xmlrpc.php
    /// Authorization: Basic <credentials>
    /// Content-Type: text/xml
    /// ```
    async fn call(&self, method: &str, params: &[Value]) -> Result<Value> {
        tracing::debug!("Calling {} on {}", method, self.endpoint);

        let body = xmlrpc::method_call(method, params)?;

        let response = self
            .client
            .post(self.endpoint.clone())
            .basic_auth(&self.username, Some(&self.password))
            .header(CONTENT_TYPE, "text/xml")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::http(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            return Err(match status.as_u16() {
                401 | 403 => Error::auth(format!(
                    "Invalid pfSense credentials or insufficient privileges. Status: {}",
                    status
                )),
                500..=599 => Error::http(format!(
                    "pfSense server error (transient): {} - {}",
                    status, error_text
                )),
                _ => Error::http(format!("{} failed: {} - {}", method, status, error_text)),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| Error::http(format!("Failed to read response: {}", e)))?;

        xmlrpc::parse_response(&text).map_err(|e| match e {
            Error::Rpc(msg) => Error::rpc(format!("{}: {}", method, msg)),
            other => other,
        })
    }
}

/// Resolve the XML-RPC endpoint from a configured base URL
pub fn endpoint_url(url: &str) -> Result<Url> {
    let mut endpoint =
        Url::parse(url).map_err(|e| Error::config(format!("Invalid pfSense URL {}: {}", url, e)))?;

    if !matches!(endpoint.scheme(), "http" | "https") {
        return Err(Error::config(format!(
            "pfSense URL must use HTTP or HTTPS scheme, got: {}",
            url
        )));
    }

    if endpoint.path().is_empty() || endpoint.path() == "/" {
        endpoint.set_path(XMLRPC_PATH);
    }
    Ok(endpoint)
}

/// Interpret the result of a state-changing call
///
/// A boolean is taken as is, an integer is a status code (`0` is success),
/// a structure may carry a `success` member. Anything else is success.
pub fn operation_result(value: &Value) -> OperationResult {
    let success = match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64() == Some(0),
        Value::Object(members) => members
            .get("success")
            .map(|s| operation_result(s).success)
            .unwrap_or(true),
        _ => true,
    };
    OperationResult { success }
}

#[async_trait]
impl RemoteStore for PfsenseStore {
    async fn fetch_section(&self, section: &str) -> Result<Value> {
        let response = self
            .call("pfsense.backup_config_section", &[json!([section])])
            .await?;

        match response {
            Value::Object(mut sections) => sections
                .remove(section)
                .ok_or_else(|| Error::rpc(format!("section {} missing from backup", section))),
            other => Err(Error::rpc(format!(
                "unexpected backup_config_section result: {}",
                other
            ))),
        }
    }

    async fn persist_section(&self, section: &str, contents: &Value) -> Result<OperationResult> {
        let mut sections = serde_json::Map::new();
        sections.insert(section.to_string(), contents.clone());

        let response = self
            .call(
                "pfsense.restore_config_section",
                &[Value::Object(sections), json!(RESTORE_TIMEOUT_SECS)],
            )
            .await?;

        Ok(operation_result(&response))
    }

    async fn execute_trigger(&self, script: &str) -> Result<OperationResult> {
        let response = self.call("pfsense.exec_php", &[json!(script)]).await?;
        Ok(operation_result(&response))
    }

    fn store_name(&self) -> &'static str {
        "pfsense"
    }
}

/// Factory for creating pfSense stores
pub struct PfsenseFactory;

impl RemoteStoreFactory for PfsenseFactory {
    fn create(&self, config: &RemoteStoreConfig) -> Result<Box<dyn RemoteStore>> {
        let RemoteStoreConfig::Pfsense {
            url,
            username,
            password,
            insecure,
            timeout_secs,
        } = config;

        Ok(Box::new(PfsenseStore::new(
            url,
            username.clone(),
            password.clone(),
            *insecure,
            Duration::from_secs(*timeout_secs),
        )?))
    }
}

/// Register the pfSense store with a registry
///
/// # Example
///
/// ```rust
/// use pfdns_core::RemoteStoreRegistry;
///
/// let registry = RemoteStoreRegistry::new();
/// pfdns_provider_pfsense::register(&registry);
/// assert!(registry.has_remote_store("pfsense"));
/// ```
pub fn register(registry: &pfdns_core::RemoteStoreRegistry) {
    registry.register_remote_store("pfsense", Box::new(PfsenseFactory));
}
