//! Configuration types for the pfdns system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the pfSense configuration section holding the DNS resolver settings
pub const DEFAULT_SECTION: &str = "unbound";

/// PHP snippets that make pfSense pick up changed host overrides
pub const DEFAULT_RECONFIGURE_TRIGGERS: &[&str] = &[
    "$toreturn = services_unbound_configure(false);",
    "$toreturn = services_dhcpd_configure();",
];

/// Main pfdns configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Remote store configuration
    pub remote: RemoteStoreConfig,

    /// Engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Inbound webhook settings
    #[serde(default)]
    pub webhook: WebhookConfig,
}

impl SyncConfig {
    /// Create a new configuration for a remote store with default settings
    pub fn new(remote: RemoteStoreConfig) -> Self {
        Self {
            remote,
            engine: EngineConfig::default(),
            webhook: WebhookConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.remote.validate()?;
        self.engine.validate()?;
        self.webhook.validate()?;
        Ok(())
    }
}

/// Remote store configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RemoteStoreConfig {
    /// pfSense XML-RPC endpoint
    Pfsense {
        /// Base URL of the appliance (e.g., "https://192.168.1.1")
        url: String,
        /// Admin user name
        username: String,
        /// Admin password
        password: String,
        /// Accept invalid TLS certificates
        #[serde(default)]
        insecure: bool,
        /// Request timeout in seconds
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

impl RemoteStoreConfig {
    /// Validate the remote store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            RemoteStoreConfig::Pfsense {
                url,
                username,
                password,
                timeout_secs,
                ..
            } => {
                if url.is_empty() {
                    return Err(crate::Error::config("pfSense URL cannot be empty"));
                }
                if !url.starts_with("https://") && !url.starts_with("http://") {
                    return Err(crate::Error::config(format!(
                        "pfSense URL must use HTTP or HTTPS scheme, got: {url}"
                    )));
                }
                if username.is_empty() {
                    return Err(crate::Error::config("pfSense username cannot be empty"));
                }
                if password.is_empty() {
                    return Err(crate::Error::config("pfSense password cannot be empty"));
                }
                if *timeout_secs == 0 {
                    return Err(crate::Error::config("pfSense timeout must be > 0"));
                }
                Ok(())
            }
        }
    }

    /// Get the remote store type name
    pub fn type_name(&self) -> &'static str {
        match self {
            RemoteStoreConfig::Pfsense { .. } => "pfsense",
        }
    }
}

// Custom Debug implementation that hides the password
impl fmt::Debug for RemoteStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteStoreConfig::Pfsense {
                url,
                username,
                insecure,
                timeout_secs,
                ..
            } => f
                .debug_struct("Pfsense")
                .field("url", url)
                .field("username", username)
                .field("password", &"<REDACTED>")
                .field("insecure", insecure)
                .field("timeout_secs", timeout_secs)
                .finish(),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Configuration section that holds the host overrides
    #[serde(default = "default_section")]
    pub section: String,

    /// Remote scripts run after a successful write, in order
    #[serde(default = "default_reconfigure_triggers")]
    pub reconfigure_triggers: Vec<String>,

    /// Compute and report the final host list without writing it
    #[serde(default)]
    pub dry_run: bool,

    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.section.is_empty() {
            return Err(crate::Error::config("Section name cannot be empty"));
        }
        if self.reconfigure_triggers.iter().any(|t| t.trim().is_empty()) {
            return Err(crate::Error::config("Reconfigure triggers cannot be empty"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            section: default_section(),
            reconfigure_triggers: default_reconfigure_triggers(),
            dry_run: false,
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

/// Inbound webhook configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Socket address to listen on
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Domain filters announced during negotiation
    #[serde(default)]
    pub domain_filters: Vec<String>,
}

impl WebhookConfig {
    /// Validate the webhook configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(crate::Error::config(format!(
                "Webhook listen address is not a socket address: {}",
                self.listen_addr
            )));
        }
        if self.domain_filters.iter().any(|d| d.is_empty()) {
            return Err(crate::Error::config("Domain filters cannot be empty"));
        }
        Ok(())
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            domain_filters: Vec::new(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_section() -> String {
    DEFAULT_SECTION.to_string()
}

fn default_reconfigure_triggers() -> Vec<String> {
    DEFAULT_RECONFIGURE_TRIGGERS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_event_channel_capacity() -> usize {
    100
}

fn default_listen_addr() -> String {
    "127.0.0.1:8888".to_string()
}
