//! Shared fixtures for integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use image::{DynamicImage, Rgb, RgbImage};

use astrotile::label::{LabelBackend, LabelCache};
use astrotile::pyramid::{generate_tileset, CancelFlag, GenerateOptions};
use astrotile::server::{create_router, RouterConfig};
use astrotile::service::TileService;
use astrotile::store::{MemoryBlobStore, TileStore};
use astrotile::LabelError;

/// Tile size used by the test pyramids.
pub const TEST_TILE_SIZE: u32 = 16;

/// Label backend stub that counts calls and can simulate an outage.
pub struct CountingBackend {
    labels: HashMap<String, String>,
    calls: AtomicUsize,
    down: AtomicBool,
}

impl CountingBackend {
    pub fn new(labels: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self {
            labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            calls: AtomicUsize::new(0),
            down: AtomicBool::new(false),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }
}

#[async_trait]
impl LabelBackend for CountingBackend {
    async fn batch_get(&self, keys: &[String]) -> Result<HashMap<String, String>, LabelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            return Err(LabelError::Unavailable("simulated outage".to_string()));
        }
        Ok(keys
            .iter()
            .filter_map(|k| self.labels.get(k).map(|v| (k.clone(), v.clone())))
            .collect())
    }
}

fn gradient_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }))
}

/// Generate a small pyramid for `image_set` into a fresh memory store.
///
/// 40x24 pixels with 16px tiles: max level 2, native grid 3x2.
pub async fn seeded_tile_store(image_set: &str) -> TileStore {
    let store = TileStore::new(Arc::new(MemoryBlobStore::new()));
    let options = GenerateOptions {
        tile_size: TEST_TILE_SIZE,
        min_level_size: TEST_TILE_SIZE,
    };
    generate_tileset(
        &store,
        image_set,
        &gradient_image(40, 24),
        &options,
        &CancelFlag::new(),
    )
    .await
    .expect("fixture generation");
    store
}

/// Router over a seeded pyramid, without a label store.
pub async fn seeded_router(image_set: &str) -> Router {
    let store = seeded_tile_store(image_set).await;
    let service = TileService::new(store, None);
    create_router(service, RouterConfig::default().with_tracing(false))
}

/// Router over a seeded pyramid with the given label backend.
pub async fn seeded_router_with_labels(
    image_set: &str,
    backend: Arc<CountingBackend>,
) -> Router {
    let store = seeded_tile_store(image_set).await;
    let cache = Arc::new(LabelCache::new(backend));
    let service = TileService::new(store, Some(cache));
    create_router(service, RouterConfig::default().with_tracing(false))
}

/// Whether the bytes start with the PNG signature.
pub fn is_valid_png(data: &[u8]) -> bool {
    data.len() > 8 && &data[..8] == b"\x89PNG\r\n\x1a\n"
}
