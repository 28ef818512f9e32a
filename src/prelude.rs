//! Prelude module for common mosaic-viewer types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use mosaic_viewer::prelude::*;`

pub use crate::core::{
    bounds::Rect,
    config::{
        ApiConfig, FrameTimingConfig, InteractionConfig, LayoutConfig, OverlayStyle,
        TileLoadingConfig, ViewerConfig, ViewerProfile,
    },
    geo::{Point, Size},
    viewer::{MosaicViewer, ViewerEvent},
    viewport::{compute_scale_bounds, ViewportController, ViewportTransform},
};

pub use crate::layout::{Layout, Orientation, Surface, SurfaceFilter, SurfaceLayout, SurfaceMeta};

pub use crate::tiles::{
    address::{TileAddress, TileAddressMapper},
    cache::{TileCache, TileFormat, TileImage, TileKey},
    loader::{TileLoader, TilePriority, TileStatus},
    lod::{pyramid_level, Tile, TileSelection, TileSelector},
    source::{ApiTileSource, TileFetcher, TileSource},
};

pub use crate::overlay::{map_defect, Defect, DefectOverlay, MappedDefect, Severity};

pub use crate::input::{
    events::InputEvent,
    gestures::{GestureAction, GestureConfig, GestureRecognizer},
};

pub use crate::rendering::{
    context::{Color, DrawCommand, RenderContext},
    render_loop::{RenderLoop, RenderMode},
    renderer::{compose_frame, FrameSnapshot, TileContent, TileDraw},
};

#[cfg(feature = "egui")]
pub use crate::rendering::widget::MosaicView;

pub use crate::data::{
    api::{DefectList, MosaicMeta},
    backend::{HttpBackend, ViewerBackend},
};

pub use crate::runtime::{spawn, AsyncHandle, AsyncSpawner};

pub use crate::traits::{CacheStats, Cacheable, Configurable, GeometryOps};

pub use crate::{Error as MosaicError, Result};

pub use instant::Instant;
pub use std::{
    pin::Pin,
    sync::{Arc, Mutex},
    time::Duration,
};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet, FxHasher};

pub use futures::Future;
