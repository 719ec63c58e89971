// # pfdns-core
//
// Core library for syncing DNS records into pfSense host overrides.
//
// ## Architecture Overview
//
// - **Endpoint / HostRecord**: the desired-state record and its stored form
// - **RemoteStore**: Trait for the appliance holding the configuration section
// - **reconcile**: pure computation of the host list to write back
// - **SyncEngine**: applies a change batch (fetch → reconcile → persist → reconfigure)
// - **RemoteStoreRegistry**: Plugin-based registry for remote stores
//
// ## Design Principles
//
// 1. **Whole-section writes**: the remote store has no per-record update, so the
//    complete host list is recomputed and written back every time
// 2. **Lossless round-trip**: fields the core does not understand survive a write
// 3. **Plugin-Based**: remote stores are registered dynamically
// 4. **Library-First**: the engine can be embedded without the webhook or daemon

pub mod config;
pub mod engine;
pub mod error;
pub mod reconcile;
pub mod record;
pub mod registry;
pub mod store;
pub mod traits;

// Re-export core types for convenience
pub use config::{EngineConfig, RemoteStoreConfig, SyncConfig, WebhookConfig};
pub use engine::{ApplyOutcome, ApplyStage, EngineEvent, SyncEngine};
pub use error::{Error, Result};
pub use record::{Changes, Endpoint, HostKey, HostRecord, RecordType};
pub use registry::RemoteStoreRegistry;
pub use store::MemoryRemoteStore;
pub use traits::{OperationResult, RemoteStore, RemoteStoreFactory};
