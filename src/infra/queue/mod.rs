//! Job queue backends.

pub mod memory;
pub mod yaque;

pub use memory::InMemoryJobQueue;
pub use yaque::YaqueJobQueue;
