// # Remote Store Trait
//
// Defines the interface to the appliance that holds the host overrides.
//
// ## Implementations
//
// - pfSense XML-RPC: `pfdns-provider-pfsense` crate
// - In-memory: `pfdns_core::store::MemoryRemoteStore` (tests, demos)
//
// ## Usage
//
// ```rust,ignore
// use pfdns_core::RemoteStore;
//
// #[tokio::main]
// async fn main() -> pfdns_core::Result<()> {
//     let store = /* RemoteStore implementation */;
//
//     let section = store.fetch_section("unbound").await?;
//     let result = store.persist_section("unbound", &section).await?;
//     assert!(result.success);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde_json::Value;

/// Outcome of a remote operation that reports success as data
///
/// The engine treats `success == false` the same as a transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationResult {
    /// Whether the remote side reports the operation as applied
    pub success: bool,
}

impl OperationResult {
    /// Successful operation
    pub fn ok() -> Self {
        Self { success: true }
    }

    /// Operation the remote side rejected
    pub fn failed() -> Self {
        Self { success: false }
    }
}

/// Trait for remote configuration store implementations
///
/// A remote store exposes whole configuration sections. It has no notion of
/// individual DNS records and no partial update primitive.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Constraints
///
/// - One remote call per method invocation
/// - No retry or backoff (a failed call is reported, the caller decides)
/// - No caching of sections between calls
/// - No background tasks
///
/// Sections are opaque structured values. Implementations must round-trip
/// every field they receive, including ones the core never reads.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch a configuration section
    ///
    /// # Parameters
    ///
    /// - `section`: Section name (e.g., "unbound")
    ///
    /// # Returns
    ///
    /// - `Ok(Value)`: The section contents
    /// - `Err(Error)`: If the call failed
    async fn fetch_section(&self, section: &str) -> Result<Value, crate::Error>;

    /// Replace a configuration section as a whole
    ///
    /// # Parameters
    ///
    /// - `section`: Section name
    /// - `contents`: Full new section contents
    async fn persist_section(
        &self,
        section: &str,
        contents: &Value,
    ) -> Result<OperationResult, crate::Error>;

    /// Run a remote configuration trigger (e.g. service reload)
    ///
    /// # Parameters
    ///
    /// - `script`: Trigger identifier understood by the remote side
    async fn execute_trigger(&self, script: &str) -> Result<OperationResult, crate::Error>;

    /// Get the store name (for logging/debugging)
    fn store_name(&self) -> &'static str;
}

/// Helper trait for constructing remote stores from configuration
pub trait RemoteStoreFactory: Send + Sync {
    /// Create a RemoteStore instance from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Configuration specific to this store
    ///
    /// # Returns
    ///
    /// A boxed RemoteStore trait object
    fn create(
        &self,
        config: &crate::config::RemoteStoreConfig,
    ) -> Result<Box<dyn RemoteStore>, crate::Error>;
}
