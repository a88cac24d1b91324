pub mod json_store;
pub mod migrate;
pub mod repository;
pub mod schema;

pub use json_store::JsonStore;
pub use repository::{MemoryStore, ProgressRepository};
