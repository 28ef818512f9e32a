//! # mosaic-viewer
//!
//! Tile-pyramid viewer core for ultra-large steel-surface scan mosaics.
//!
//! The crate lays out one or two surface mosaics (top/bottom) in a shared world
//! coordinate space, selects the visible pyramid tiles for the current pan/zoom
//! transform, maps them to backend tile addresses, loads them asynchronously
//! into an LRU cache and composes each frame (background, tiles, defect
//! overlays, debug HUD) as a list of backend-agnostic draw commands.
//!
//! [`MosaicViewer`] is the host-facing context object tying these pieces
//! together; the `egui` feature adds a ready-made widget on top of it.

pub mod core;
pub mod data;
pub mod input;
pub mod layout;
pub mod overlay;
pub mod prelude;
pub mod rendering;
pub mod runtime;
pub mod tiles;
pub mod traits;
pub use crate::core::constants;

// Re-export public API
pub use core::{
    bounds::Rect,
    config::{ViewerConfig, ViewerProfile},
    geo::{Point, Size},
    viewer::{MosaicViewer, ViewerEvent},
    viewport::{ViewportController, ViewportTransform},
};

pub use layout::{Layout, Orientation, Surface, SurfaceFilter, SurfaceLayout, SurfaceMeta};

pub use tiles::{
    address::{TileAddress, TileAddressMapper},
    cache::{TileCache, TileImage, TileKey},
    loader::{TileLoader, TilePriority, TileStatus},
    lod::{Tile, TileSelection, TileSelector},
    source::{TileFetcher, TileSource},
};

pub use overlay::{Defect, DefectOverlay, Severity};

pub use input::{events::InputEvent, gestures::GestureRecognizer};

pub use rendering::{
    context::{Color, DrawCommand, RenderContext},
    render_loop::RenderLoop,
};

pub use data::{
    api::MosaicMeta,
    backend::{HttpBackend, ViewerBackend},
};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MosaicError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MosaicError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Error type alias for convenience
pub type Error = MosaicError;
