use crate::layout::{Orientation, Surface};
use crate::prelude::{Arc, Mutex};
use crate::tiles::address::TileAddress;
use crate::traits::{CacheStats, Cacheable};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Image encoding requested from the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TileFormat {
    #[default]
    Jpeg,
    Png,
    Webp,
}

impl TileFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TileFormat::Jpeg => "JPEG",
            TileFormat::Png => "PNG",
            TileFormat::Webp => "WEBP",
        }
    }
}

/// Every per-tile backend parameter of one tile request
///
/// The base URL and `view` name are not part of the key: they belong to the
/// fetcher, and a [`TileLoader`](crate::tiles::loader::TileLoader) keeps one
/// fetcher and its cache together for its whole life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileKey {
    pub surface: Surface,
    pub seq_id: i64,
    pub level: u8,
    pub tile_x: u32,
    pub tile_y: u32,
    pub orientation: Orientation,
    pub format: TileFormat,
    /// Base tile size in pixels
    pub tile_size: u32,
}

impl TileKey {
    pub fn from_address(
        address: TileAddress,
        seq_id: i64,
        orientation: Orientation,
        format: TileFormat,
        tile_size: u32,
    ) -> Self {
        Self {
            surface: address.surface,
            seq_id,
            level: address.level,
            tile_x: address.tile_x,
            tile_y: address.tile_y,
            orientation,
            format,
            tile_size,
        }
    }

    pub fn address(&self) -> TileAddress {
        TileAddress {
            surface: self.surface,
            level: self.level,
            tile_x: self.tile_x,
            tile_y: self.tile_y,
        }
    }
}

/// Encoded tile bytes as delivered by the backend
#[derive(Debug, Clone, PartialEq)]
pub struct TileImage {
    pub key: TileKey,
    pub bytes: Arc<Vec<u8>>,
}

impl TileImage {
    pub fn new(key: TileKey, bytes: Vec<u8>) -> Self {
        Self {
            key,
            bytes: Arc::new(bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Decode into RGBA pixels
    #[cfg(feature = "decode")]
    pub fn decode(&self) -> crate::Result<image::RgbaImage> {
        image::load_from_memory(&self.bytes)
            .map(|img| img.to_rgba8())
            .map_err(|e| crate::MosaicError::Decode(format!("{:?}: {e}", self.key)))
    }
}

/// In-memory tile cache using LRU eviction
///
/// Clones share the same storage.
#[derive(Debug, Clone)]
pub struct TileCache {
    cache: Arc<Mutex<LruCache<TileKey, TileImage>>>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl TileCache {
    /// Create a new tile cache with the given capacity
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Create a new tile cache with the default capacity
    pub fn with_default_capacity() -> Self {
        Self::new(crate::core::constants::DEFAULT_CACHE_CAPACITY)
    }

    /// Get a tile, promoting it in the LRU order and counting the lookup
    pub fn get(&self, key: &TileKey) -> Option<TileImage> {
        let found = self.cache.lock().ok()?.get(key).cloned();
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Look a tile up without touching LRU order or statistics
    pub fn peek(&self, key: &TileKey) -> Option<TileImage> {
        self.cache.lock().ok()?.peek(key).cloned()
    }

    /// Insert a tile into the cache
    pub fn put(&self, image: TileImage) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(image.key, image);
        }
    }

    /// Check if a tile is in the cache
    pub fn contains(&self, key: &TileKey) -> bool {
        self.cache
            .lock()
            .ok()
            .map(|cache| cache.contains(key))
            .unwrap_or(false)
    }

    /// Remove a tile from the cache
    pub fn remove(&self, key: &TileKey) -> Option<TileImage> {
        self.cache.lock().ok()?.pop(key)
    }

    /// Clear all tiles from the cache
    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }

    /// Get the current number of cached tiles
    pub fn len(&self) -> usize {
        self.cache.lock().ok().map(|cache| cache.len()).unwrap_or(0)
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get cache capacity
    pub fn capacity(&self) -> usize {
        self.cache
            .lock()
            .ok()
            .map(|cache| cache.cap().get())
            .unwrap_or(0)
    }

    /// Keys currently cached, most recently used first
    pub fn keys(&self) -> Vec<TileKey> {
        self.cache
            .lock()
            .ok()
            .map(|cache| cache.iter().map(|(k, _)| *k).collect())
            .unwrap_or_default()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size: self.len(),
            in_flight: 0,
        }
    }
}

impl Default for TileCache {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

impl Cacheable for TileCache {
    type Key = TileKey;
    type Value = TileImage;

    fn get_cached(&self, key: &TileKey) -> Option<TileImage> {
        self.get(key)
    }

    fn cache(&mut self, key: TileKey, value: TileImage) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(key, value);
        }
    }

    fn invalidate(&mut self, key: &TileKey) {
        self.remove(key);
    }

    fn clear_cache(&mut self) {
        self.clear();
    }

    fn cache_stats(&self) -> CacheStats {
        self.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(x: u32) -> TileKey {
        TileKey {
            surface: Surface::Top,
            seq_id: 42,
            level: 0,
            tile_x: x,
            tile_y: 0,
            orientation: Orientation::Vertical,
            format: TileFormat::Jpeg,
            tile_size: 1024,
        }
    }

    #[test]
    fn test_tile_cache_basic_operations() {
        let cache = TileCache::new(2);
        assert!(cache.is_empty());

        cache.put(TileImage::new(key(1), vec![1, 2, 3]));
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&key(1)));
        assert_eq!(*cache.get(&key(1)).unwrap().bytes, vec![1, 2, 3]);
        assert!(cache.get(&key(2)).is_none());

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.size), (1, 1, 1));

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_tile_cache_lru_eviction() {
        let cache = TileCache::new(2);
        cache.put(TileImage::new(key(1), vec![1]));
        cache.put(TileImage::new(key(2), vec![2]));
        // touch 1 so 2 becomes least recently used
        cache.get(&key(1));
        cache.put(TileImage::new(key(3), vec![3]));
        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&key(1)));
        assert!(!cache.contains(&key(2)));
        assert!(cache.contains(&key(3)));
    }

    #[test]
    fn test_keys_differ_by_every_parameter() {
        let a = key(1);
        let mut b = a;
        b.orientation = Orientation::Horizontal;
        let mut c = a;
        c.format = TileFormat::Png;
        let mut d = a;
        d.seq_id = 43;
        let cache = TileCache::new(8);
        cache.put(TileImage::new(a, vec![0]));
        assert!(cache.peek(&b).is_none());
        assert!(cache.peek(&c).is_none());
        assert!(cache.peek(&d).is_none());
        assert!(cache.peek(&a).is_some());
        // peek does not count
        assert_eq!(cache.stats().hits + cache.stats().misses, 0);
    }

    #[test]
    fn test_cacheable_stores_under_given_key() {
        let mut cache = TileCache::new(4);
        cache.cache(key(5), TileImage::new(key(6), vec![5]));
        assert_eq!(*cache.get_cached(&key(5)).unwrap().bytes, vec![5]);
        assert!(cache.peek(&key(6)).is_none());

        cache.invalidate(&key(5));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_capacity_falls_back_to_one() {
        let cache = TileCache::new(0);
        assert_eq!(cache.capacity(), 1);
    }
}
