//! Core constants shared by the layout, tile and viewport modules.
//! Defaults mirror the inspection backend's tile service.

/// Base (level 0) square tile size in pixels served by the backend.
pub const DEFAULT_TILE_SIZE: u32 = 1024;

/// Coarsest pyramid level the backend serves (levels `0..=2`).
pub const DEFAULT_MAX_LEVEL: u8 = 2;

/// Finest pyramid level.
pub const DEFAULT_MIN_LEVEL: u8 = 0;

/// World-pixel gap between two surfaces laid out side by side.
pub const DEFAULT_SURFACE_GAP: f64 = 256.0;

/// Screen-pixel margin around the container used for tile prefetch.
pub const DEFAULT_PREFETCH_MARGIN: f64 = 200.0;

/// Delay before a tile rebuild runs after the last view change.
pub const DEFAULT_DEBOUNCE_MS: u64 = 40;

/// Upper scale bound: one mosaic pixel per screen pixel.
pub const MAX_SCALE: f64 = 1.0;

/// View name passed to the backend with every image request.
pub const DEFAULT_VIEW: &str = "2D";

/// Tile cache capacity (entries).
pub const DEFAULT_CACHE_CAPACITY: usize = 512;

/// Tolerance applied before flooring/ceiling tile indices.
pub const TILE_INDEX_EPSILON: f64 = 1e-9;

/// Debug label size in screen pixels, independent of zoom.
pub const DEBUG_TEXT_SIZE: f32 = 12.0;
