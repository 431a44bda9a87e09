//! Tile label lookups: batched backends and the expiring cache.

mod backend;
mod cache;

pub use backend::{JsonFileBackend, LabelBackend, PooledBackend};
pub use cache::{LabelBatch, LabelCache, DEFAULT_EXPIRY_WINDOW};
