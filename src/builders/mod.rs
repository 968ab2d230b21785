//! Builders to construct scheduler components from configuration.

pub mod service_builder;

pub use service_builder::{build_capacity, build_queue, build_service, build_store};
