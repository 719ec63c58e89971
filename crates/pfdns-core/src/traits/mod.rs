//! Core traits for the pfdns system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`RemoteStore`]: Whole-section access to the appliance configuration

pub mod remote_store;

pub use remote_store::{OperationResult, RemoteStore, RemoteStoreFactory};
