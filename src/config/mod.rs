//! Configuration models for capacity, backends, and timeouts.

pub mod batch;

pub use batch::{BatchConfig, CapacityConfig, QueueBackendConfig, StoreBackendConfig};
