// src/lib.rs
pub mod api;
pub mod audit;
pub mod clustering;
pub mod errors;
pub mod matching;
pub mod merge;
pub mod models;
pub mod store;
pub mod sync;
pub mod utils;

pub use errors::{ReconcileError, ReconcileResult, StoreError};
pub use store::{CatalogStore, MemoryCatalog, PgCatalog};
