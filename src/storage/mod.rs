//! Storage implementations of the catalog store

pub mod in_memory;
pub mod seed;
pub mod traced;

pub use in_memory::InMemoryCatalog;
pub use seed::{CatalogSeed, LocalizationSeed};
pub use traced::{StoreCall, TracedStore};
