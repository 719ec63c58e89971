// # pfdnsd - pfSense DNS webhook daemon
//
// This is a thin integration layer. All reconciliation logic lives in
// pfdns-core; configuration is read from environment variables only.
//
// The pfdnsd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Registering remote stores and creating the engine
// 4. Serving the external-dns webhook until SIGTERM/SIGINT
//
// ## Configuration
//
// ### pfSense
// - `PFDNS_PFSENSE_URL`: Base URL of the appliance (e.g. https://192.168.1.1)
// - `PFDNS_PFSENSE_USERNAME`: Admin user
// - `PFDNS_PFSENSE_PASSWORD`: Admin password
// - `PFDNS_PFSENSE_INSECURE`: Accept invalid TLS certificates (true/false)
// - `PFDNS_PFSENSE_TIMEOUT_SECS`: Request timeout (default 30)
//
// ### Engine
// - `PFDNS_SECTION`: Configuration section holding host overrides (default unbound)
// - `PFDNS_MODE`: `live` (default) or `dry-run`
//
// ### Webhook
// - `PFDNS_LISTEN_ADDR`: Socket address (default 127.0.0.1:8888)
// - `PFDNS_DOMAIN_FILTERS`: Comma-separated domains announced to external-dns
//
// ### Logging
// - `PFDNS_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export PFDNS_PFSENSE_URL=https://192.168.1.1
// export PFDNS_PFSENSE_USERNAME=admin
// export PFDNS_PFSENSE_PASSWORD=...
// export PFDNS_PFSENSE_INSECURE=true
// export PFDNS_DOMAIN_FILTERS=home.lan
//
// pfdnsd
// ```

use anyhow::{Context, Result};
use pfdns_core::config::{DEFAULT_SECTION, EngineConfig, RemoteStoreConfig, SyncConfig, WebhookConfig};
use pfdns_core::{EngineEvent, RemoteStoreRegistry, SyncEngine};
use std::env;
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Time allowed for in-flight requests after a shutdown signal
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum PfdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<PfdnsExitCode> for ExitCode {
    fn from(code: PfdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    pfsense_url: String,
    pfsense_username: String,
    pfsense_password: String,
    pfsense_insecure: bool,
    pfsense_timeout_secs: u64,
    section: String,
    mode: String,
    listen_addr: String,
    domain_filters: Vec<String>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            pfsense_url: env::var("PFDNS_PFSENSE_URL").unwrap_or_default(),
            pfsense_username: env::var("PFDNS_PFSENSE_USERNAME").unwrap_or_default(),
            pfsense_password: env::var("PFDNS_PFSENSE_PASSWORD").unwrap_or_default(),
            pfsense_insecure: env::var("PFDNS_PFSENSE_INSECURE")
                .ok()
                .map(|s| parse_bool(&s))
                .transpose()
                .context("PFDNS_PFSENSE_INSECURE")?
                .unwrap_or(false),
            pfsense_timeout_secs: env::var("PFDNS_PFSENSE_TIMEOUT_SECS")
                .ok()
                .map(|s| s.trim().parse::<u64>())
                .transpose()
                .context("PFDNS_PFSENSE_TIMEOUT_SECS must be a number of seconds")?
                .unwrap_or(30),
            section: env::var("PFDNS_SECTION").unwrap_or_else(|_| DEFAULT_SECTION.to_string()),
            mode: env::var("PFDNS_MODE").unwrap_or_else(|_| "live".to_string()),
            listen_addr: env::var("PFDNS_LISTEN_ADDR").unwrap_or_else(|_| "127.0.0.1:8888".to_string()),
            domain_filters: split_list(&env::var("PFDNS_DOMAIN_FILTERS").unwrap_or_default()),
            log_level: env::var("PFDNS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.pfsense_url.is_empty() {
            anyhow::bail!(
                "PFDNS_PFSENSE_URL is required. \
                Set it via: export PFDNS_PFSENSE_URL=https://192.168.1.1"
            );
        }

        if !self.pfsense_url.starts_with("https://") && !self.pfsense_url.starts_with("http://") {
            anyhow::bail!(
                "PFDNS_PFSENSE_URL must use HTTP or HTTPS scheme. Got: {}",
                self.pfsense_url
            );
        }

        if self.pfsense_url.starts_with("http://") {
            eprintln!(
                "WARNING: PFDNS_PFSENSE_URL uses HTTP (not HTTPS). \
                Admin credentials will be sent in clear text."
            );
        }

        if self.pfsense_username.is_empty() {
            anyhow::bail!("PFDNS_PFSENSE_USERNAME is required");
        }

        if self.pfsense_password.is_empty() {
            anyhow::bail!(
                "PFDNS_PFSENSE_PASSWORD is required. \
                Set it via: export PFDNS_PFSENSE_PASSWORD=..."
            );
        }

        if !(1..=300).contains(&self.pfsense_timeout_secs) {
            anyhow::bail!(
                "PFDNS_PFSENSE_TIMEOUT_SECS must be between 1 and 300 seconds. Got: {}",
                self.pfsense_timeout_secs
            );
        }

        match self.mode.as_str() {
            "live" | "dry-run" => {}
            _ => anyhow::bail!(
                "PFDNS_MODE '{}' is not supported. Supported modes: live, dry-run",
                self.mode
            ),
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "PFDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        // Remaining checks (socket address, section name) are shared with the library
        self.to_sync_config()
            .validate()
            .map_err(|e| anyhow::anyhow!("{}", e))?;

        Ok(())
    }

    fn dry_run(&self) -> bool {
        self.mode == "dry-run"
    }

    fn to_sync_config(&self) -> SyncConfig {
        SyncConfig {
            remote: RemoteStoreConfig::Pfsense {
                url: self.pfsense_url.clone(),
                username: self.pfsense_username.clone(),
                password: self.pfsense_password.clone(),
                insecure: self.pfsense_insecure,
                timeout_secs: self.pfsense_timeout_secs,
            },
            engine: EngineConfig {
                section: self.section.clone(),
                dry_run: self.dry_run(),
                ..EngineConfig::default()
            },
            webhook: WebhookConfig {
                listen_addr: self.listen_addr.clone(),
                domain_filters: self.domain_filters.clone(),
            },
        }
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => anyhow::bail!("expected true or false, got '{}'", other),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return PfdnsExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return PfdnsExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return PfdnsExitCode::ConfigError.into();
    }

    info!("Starting pfdnsd daemon");
    info!(
        "pfSense: {} (section: {}, mode: {})",
        config.pfsense_url, config.section, config.mode
    );

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return PfdnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {:#}", e);
            PfdnsExitCode::RuntimeError
        } else {
            PfdnsExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    let sync_config = config.to_sync_config();

    // Create remote store registry
    let registry = RemoteStoreRegistry::new();

    #[cfg(feature = "pfsense")]
    {
        info!("Registering pfSense remote store");
        pfdns_provider_pfsense::register(&registry);
    }

    let store = registry
        .create_remote_store(&sync_config.remote)
        .map_err(|e| anyhow::anyhow!("Failed to create remote store: {}", e))?;

    let (engine, events) = SyncEngine::new(store, sync_config.engine)
        .map_err(|e| anyhow::anyhow!("Failed to create engine: {}", e))?;

    if engine.is_dry_run() {
        warn!("Running in DRY-RUN mode - host overrides will not be written");
    }

    tokio::spawn(log_events(events));

    let app = pfdns_webhook::router(pfdns_webhook::WebhookState::new(
        engine,
        sync_config.webhook.domain_filters,
    ));

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let listen_addr = sync_config.webhook.listen_addr;
    let mut server = tokio::spawn(async move {
        pfdns_webhook::run(&listen_addr, app, async move {
            let _ = shutdown_rx.await;
        })
        .await
    });

    info!("Daemon initialized successfully");

    tokio::select! {
        signal = wait_for_shutdown() => {
            info!("Received shutdown signal: {}", signal?);
        }
        // The server only returns on its own when it fails (e.g. address in use)
        result = &mut server => {
            return result.context("Webhook server task failed")?;
        }
    }

    info!("Shutting down daemon");
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, server).await {
        Ok(result) => result.context("Webhook server task failed")?,
        Err(_) => Err(anyhow::anyhow!(
            "Shutdown timeout after {:?}",
            SHUTDOWN_TIMEOUT
        )),
    }
}

/// Drain engine events into the log
async fn log_events(mut events: mpsc::Receiver<EngineEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            EngineEvent::ApplyFailed { stage, error } => {
                warn!("Apply failed at {:?}: {}", stage, error);
            }
            EngineEvent::Persisted { hosts } => info!("Persisted {} host overrides", hosts),
            other => debug!("Engine event: {:?}", other),
        }
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
