//! Remote store implementations that live in the core crate

pub mod memory;

pub use memory::{MemoryFailure, MemoryRemoteStore};
