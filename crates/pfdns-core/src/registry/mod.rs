//! Plugin-based remote store registry
//!
//! The registry allows remote store implementations to be registered
//! dynamically at runtime, avoiding hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pfdns_core::registry::RemoteStoreRegistry;
//!
//! let registry = RemoteStoreRegistry::new();
//! pfdns_provider_pfsense::register(&registry);
//!
//! let store = registry.create_remote_store(&config.remote)?;
//! ```
//!
//! ## Registration
//!
//! Implementations register themselves during initialization:
//!
//! ```rust,ignore
//! // In pfdns-provider-pfsense crate
//! pub fn register(registry: &RemoteStoreRegistry) {
//!     registry.register_remote_store("pfsense", Box::new(PfsenseFactory));
//! }
//! ```

use crate::config::RemoteStoreConfig;
use crate::error::{Error, Result};
use crate::traits::{RemoteStore, RemoteStoreFactory};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

type FactoryMap = HashMap<String, Box<dyn RemoteStoreFactory>>;

/// Registry for plugin-based remote store creation
///
/// The registry maintains a map of store type names to factory objects,
/// allowing dynamic instantiation of stores based on configuration.
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct RemoteStoreRegistry {
    stores: RwLock<FactoryMap>,
}

impl RemoteStoreRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a remote store factory
    ///
    /// # Parameters
    ///
    /// - `name`: Store type name (e.g., "pfsense")
    /// - `factory`: Factory object for creating store instances
    pub fn register_remote_store(
        &self,
        name: impl Into<String>,
        factory: Box<dyn RemoteStoreFactory>,
    ) {
        self.write().insert(name.into(), factory);
    }

    /// Create a remote store from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn RemoteStore>)`: Created store instance
    /// - `Err(Error)`: If the store type is not registered or creation fails
    pub fn create_remote_store(&self, config: &RemoteStoreConfig) -> Result<Box<dyn RemoteStore>> {
        let store_type = config.type_name();
        let stores = self.read();

        let factory = stores
            .get(store_type)
            .ok_or_else(|| Error::config(format!("Unknown remote store type: {}", store_type)))?;

        factory.create(config)
    }

    /// List all registered remote store types
    pub fn list_remote_stores(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    /// Check if a remote store type is registered
    pub fn has_remote_store(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    // A panic while holding the lock cannot leave the map half-written
    fn read(&self) -> RwLockReadGuard<'_, FactoryMap> {
        self.stores.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, FactoryMap> {
        self.stores.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRemoteStore;

    struct MemoryFactory;

    impl RemoteStoreFactory for MemoryFactory {
        fn create(&self, _config: &RemoteStoreConfig) -> Result<Box<dyn RemoteStore>> {
            Ok(Box::new(MemoryRemoteStore::new()))
        }
    }

    fn pfsense() -> RemoteStoreConfig {
        RemoteStoreConfig::Pfsense {
            url: "https://fw.lan".to_string(),
            username: "admin".to_string(),
            password: "secret".to_string(),
            insecure: false,
            timeout_secs: 30,
        }
    }

    #[test]
    fn test_registry_registration() {
        let registry = RemoteStoreRegistry::new();

        // Initially empty
        assert!(!registry.has_remote_store("pfsense"));

        registry.register_remote_store("pfsense", Box::new(MemoryFactory));

        assert!(registry.has_remote_store("pfsense"));
        assert!(registry.list_remote_stores().contains(&"pfsense".to_string()));
    }

    #[test]
    fn test_create_registered_store() {
        let registry = RemoteStoreRegistry::new();
        // Lookup is by the config's type name; the factory decides the store
        registry.register_remote_store("pfsense", Box::new(MemoryFactory));

        let store = registry.create_remote_store(&pfsense()).unwrap();
        assert_eq!(store.store_name(), "memory");
    }

    #[test]
    fn test_create_unknown_store() {
        let registry = RemoteStoreRegistry::new();
        registry.register_remote_store("memory", Box::new(MemoryFactory));
        let err = registry.create_remote_store(&pfsense()).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }
}
