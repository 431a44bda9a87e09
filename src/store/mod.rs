//! Blob storage layer.
//!
//! Tile artifacts and pyramid metadata live in a blob store addressed by
//! canonical string paths. The backend is selected once at startup by
//! configuration and injected as a trait object; nothing in the crate
//! probes for backends at runtime.
//!
//! Variants:
//!
//! - [`S3BlobStore`] - S3 or S3-compatible object storage (MinIO, GCS
//!   interop endpoints)
//! - [`LocalBlobStore`] - a local filesystem tree, mirroring the blob
//!   paths as directories
//! - [`MemoryBlobStore`] - in-process map, for tests and examples

mod local;
mod memory;
mod s3;
mod tiles;

pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;
pub use s3::{create_s3_client, S3BlobStore};
pub use tiles::{TileArtifact, TileStore, MAX_GET_ATTEMPTS, RETRY_BASE_DELAY};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreError;

/// Capability for reading and writing opaque blobs by path.
///
/// Reads are idempotent and safe to retry or parallelize freely. `NotFound`
/// and `Unavailable` are distinct outcomes and must never be conflated: a
/// missing object is an expected state, an unreachable backend is not.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Whether an object exists at `path`.
    async fn exists(&self, path: &str) -> Result<bool, StoreError>;

    /// Fetch the object at `path`.
    async fn get(&self, path: &str) -> Result<Bytes, StoreError>;

    /// Write `data` to `path`, overwriting any existing object.
    async fn put(&self, path: &str, data: Bytes) -> Result<(), StoreError>;
}
