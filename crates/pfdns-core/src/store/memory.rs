// # Memory Remote Store
//
// In-memory implementation of RemoteStore.
//
// ## Purpose
//
// Stands in for the appliance when embedding the engine in tests or demos.
// Sections are kept as structured values exactly as a real store would return
// them, and every call is counted so callers can assert which remote steps ran.
//
// ## Failure Injection
//
// A single failure point can be armed with `set_failure()` to exercise the
// engine's error paths (transport errors and `success = false` results).

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::remote_store::{OperationResult, RemoteStore};

/// Remote step at which the memory store fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryFailure {
    /// `fetch_section` returns an error
    Fetch,
    /// `persist_section` returns an error
    Persist,
    /// `persist_section` returns `success = false`
    PersistRejected,
    /// `execute_trigger` returns an error
    Trigger,
    /// `execute_trigger` returns `success = false`
    TriggerRejected,
}

#[derive(Debug, Default)]
struct Inner {
    sections: HashMap<String, Value>,
    failure: Option<MemoryFailure>,
    fetch_calls: usize,
    persist_calls: usize,
    triggers: Vec<String>,
}

/// In-memory remote store
///
/// Clones share the same underlying state.
///
/// # Example
///
/// ```rust,no_run
/// use pfdns_core::store::MemoryRemoteStore;
/// use pfdns_core::traits::RemoteStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryRemoteStore::new();
///     store.set_section("unbound", serde_json::json!({ "hosts": [] })).await;
///
///     let section = store.fetch_section("unbound").await?;
///     assert_eq!(section["hosts"], serde_json::json!([]));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryRemoteStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryRemoteStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents of a section
    pub async fn set_section(&self, name: impl Into<String>, contents: Value) {
        self.inner.write().await.sections.insert(name.into(), contents);
    }

    /// Current contents of a section
    pub async fn section(&self, name: &str) -> Option<Value> {
        self.inner.read().await.sections.get(name).cloned()
    }

    /// Arm (or clear) a failure point
    pub async fn set_failure(&self, failure: Option<MemoryFailure>) {
        self.inner.write().await.failure = failure;
    }

    /// Number of `fetch_section` calls so far
    pub async fn fetch_calls(&self) -> usize {
        self.inner.read().await.fetch_calls
    }

    /// Number of `persist_section` calls so far
    pub async fn persist_calls(&self) -> usize {
        self.inner.read().await.persist_calls
    }

    /// Triggers executed so far, in order
    pub async fn executed_triggers(&self) -> Vec<String> {
        self.inner.read().await.triggers.clone()
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn fetch_section(&self, section: &str) -> Result<Value, Error> {
        let mut inner = self.inner.write().await;
        inner.fetch_calls += 1;

        if inner.failure == Some(MemoryFailure::Fetch) {
            return Err(Error::rpc("memory store: fetch failure injected"));
        }

        inner
            .sections
            .get(section)
            .cloned()
            .ok_or_else(|| Error::rpc(format!("memory store: no section named {section}")))
    }

    async fn persist_section(&self, section: &str, contents: &Value) -> Result<OperationResult, Error> {
        let mut inner = self.inner.write().await;
        inner.persist_calls += 1;

        match inner.failure {
            Some(MemoryFailure::Persist) => {
                return Err(Error::rpc("memory store: persist failure injected"));
            }
            Some(MemoryFailure::PersistRejected) => return Ok(OperationResult::failed()),
            _ => {}
        }

        inner.sections.insert(section.to_string(), contents.clone());
        Ok(OperationResult::ok())
    }

    async fn execute_trigger(&self, script: &str) -> Result<OperationResult, Error> {
        let mut inner = self.inner.write().await;

        match inner.failure {
            Some(MemoryFailure::Trigger) => {
                return Err(Error::rpc("memory store: trigger failure injected"));
            }
            Some(MemoryFailure::TriggerRejected) => return Ok(OperationResult::failed()),
            _ => {}
        }

        inner.triggers.push(script.to_string());
        Ok(OperationResult::ok())
    }

    fn store_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryRemoteStore::new();
        store.set_section("unbound", json!({ "enable": "", "hosts": [] })).await;

        let section = assert_ok!(store.fetch_section("unbound").await);
        assert_eq!(section["enable"], "");

        let result = assert_ok!(store.persist_section("unbound", &json!({ "hosts": [] })).await);
        assert!(result.success);
        assert_eq!(store.section("unbound").await, Some(json!({ "hosts": [] })));

        assert_ok!(store.execute_trigger("reload").await);
        assert_eq!(store.executed_triggers().await, vec!["reload"]);
        assert_eq!(store.fetch_calls().await, 1);
        assert_eq!(store.persist_calls().await, 1);
    }

    #[tokio::test]
    async fn test_missing_section() {
        let store = MemoryRemoteStore::new();
        assert_err!(store.fetch_section("unbound").await);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = MemoryRemoteStore::new();
        let clone = store.clone();
        clone.set_section("unbound", json!({})).await;
        assert!(store.section("unbound").await.is_some());
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = MemoryRemoteStore::new();
        store.set_section("unbound", json!({})).await;

        store.set_failure(Some(MemoryFailure::PersistRejected)).await;
        let result = assert_ok!(store.persist_section("unbound", &json!({ "x": 1 })).await);
        assert!(!result.success);
        assert_eq!(store.section("unbound").await, Some(json!({})));

        store.set_failure(Some(MemoryFailure::Fetch)).await;
        assert_err!(store.fetch_section("unbound").await);

        store.set_failure(None).await;
        assert_ok!(store.fetch_section("unbound").await);
    }
}
