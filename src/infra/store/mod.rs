//! Job record stores.

pub mod memory;
pub mod yaque;

pub use memory::InMemoryJobStore;
pub use yaque::YaqueJobStore;
