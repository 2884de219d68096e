pub mod memory;

pub use memory::InMemoryLinkStore;
pub use ttlink_core::{LinkRepository, ReadRepository, StorageError};
