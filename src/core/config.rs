//! Configuration system for viewer behaviour and performance tuning
//!
//! Presets are selected through [`ViewerProfile`]; every section can also be
//! loaded from JSON, where missing fields fall back to the balanced defaults.

use crate::core::constants::{
    DEFAULT_CACHE_CAPACITY, DEFAULT_DEBOUNCE_MS, DEFAULT_PREFETCH_MARGIN, DEFAULT_SURFACE_GAP,
    DEFAULT_VIEW,
};
use crate::layout::{Orientation, SurfaceFilter};
use crate::rendering::context::Color;
use crate::tiles::cache::TileFormat;
use crate::{MosaicError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ViewerProfile {
    #[default]
    Balanced,
    LowBandwidth,
    HighQuality,
    Custom(ViewerConfig),
}

impl ViewerProfile {
    pub fn resolve(&self) -> ViewerConfig {
        match self {
            Self::Balanced => ViewerConfig {
                tile_loading: TileLoadingConfig::default(),
                interaction: InteractionConfig::default(),
                frame_timing: FrameTimingConfig::default(),
                layout: LayoutConfig::default(),
                overlay: OverlayStyle::default(),
                api: ApiConfig::default(),
            },
            Self::LowBandwidth => ViewerConfig {
                tile_loading: TileLoadingConfig {
                    cache_capacity: 128,
                    max_concurrent: 2,
                    max_retries: 2,
                    retry_delay_ms: 1000,
                    exponential_backoff: true,
                    format: TileFormat::Jpeg,
                    prefetch_margin: 0.0,
                    prefetch_coarser_level: false,
                    show_parent_tiles: true,
                    min_request_tile_pixels: Some(64.0),
                },
                interaction: InteractionConfig {
                    debounce_ms: 120,
                    ..InteractionConfig::default()
                },
                frame_timing: FrameTimingConfig {
                    continuous: false,
                    min_frame_interval_ms: 33,
                },
                ..ViewerConfig::balanced()
            },
            Self::HighQuality => ViewerConfig {
                tile_loading: TileLoadingConfig {
                    cache_capacity: 2048,
                    max_concurrent: 12,
                    max_retries: 5,
                    retry_delay_ms: 250,
                    exponential_backoff: true,
                    format: TileFormat::Png,
                    prefetch_margin: 400.0,
                    prefetch_coarser_level: true,
                    show_parent_tiles: true,
                    min_request_tile_pixels: None,
                },
                interaction: InteractionConfig {
                    debounce_ms: 20,
                    ..InteractionConfig::default()
                },
                frame_timing: FrameTimingConfig {
                    continuous: true,
                    min_frame_interval_ms: 16,
                },
                ..ViewerConfig::balanced()
            },
            Self::Custom(config) => config.clone(),
        }
    }
}

/// Complete viewer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub tile_loading: TileLoadingConfig,
    pub interaction: InteractionConfig,
    pub frame_timing: FrameTimingConfig,
    pub layout: LayoutConfig,
    pub overlay: OverlayStyle,
    pub api: ApiConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        ViewerProfile::default().resolve()
    }
}

impl ViewerConfig {
    fn balanced() -> Self {
        ViewerProfile::Balanced.resolve()
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: ViewerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        let tiles = &self.tile_loading;
        if tiles.cache_capacity == 0 {
            return Err(MosaicError::Config("tile_loading.cache_capacity must be > 0".into()));
        }
        if tiles.max_concurrent == 0 {
            return Err(MosaicError::Config("tile_loading.max_concurrent must be > 0".into()));
        }
        if !(tiles.prefetch_margin >= 0.0 && tiles.prefetch_margin.is_finite()) {
            return Err(MosaicError::Config("tile_loading.prefetch_margin must be >= 0".into()));
        }
        if let Some(min_px) = tiles.min_request_tile_pixels {
            if !(min_px > 0.0 && min_px.is_finite()) {
                return Err(MosaicError::Config(
                    "tile_loading.min_request_tile_pixels must be > 0".into(),
                ));
            }
        }

        let input = &self.interaction;
        if !(input.wheel_zoom_sensitivity > 0.0 && input.wheel_zoom_sensitivity.is_finite()) {
            return Err(MosaicError::Config("interaction.wheel_zoom_sensitivity must be > 0".into()));
        }
        if input.drag_threshold < 0.0 || input.pinch_threshold < 0.0 {
            return Err(MosaicError::Config("interaction thresholds must be >= 0".into()));
        }

        if !(self.layout.surface_gap >= 0.0 && self.layout.surface_gap.is_finite()) {
            return Err(MosaicError::Config("layout.surface_gap must be >= 0".into()));
        }
        if self.api.base_url.trim().is_empty() {
            return Err(MosaicError::Config("api.base_url must not be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileLoadingConfig {
    pub cache_capacity: usize,
    pub max_concurrent: usize,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub exponential_backoff: bool,
    pub format: TileFormat,
    /// Screen pixels of prefetch around the container
    pub prefetch_margin: f64,
    /// Also request the next coarser level for the visible area
    pub prefetch_coarser_level: bool,
    /// Draw the coarser tile while a tile is still loading
    pub show_parent_tiles: bool,
    /// Skip requests for tiles smaller than this on screen
    pub min_request_tile_pixels: Option<f64>,
}

impl Default for TileLoadingConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            max_concurrent: 6,
            max_retries: 3,
            retry_delay_ms: 500,
            exponential_backoff: true,
            format: TileFormat::Jpeg,
            prefetch_margin: DEFAULT_PREFETCH_MARGIN,
            prefetch_coarser_level: true,
            show_parent_tiles: true,
            min_request_tile_pixels: None,
        }
    }
}

impl TileLoadingConfig {
    pub fn for_testing() -> Self {
        Self {
            cache_capacity: 64,
            max_concurrent: 4,
            max_retries: 0,
            retry_delay_ms: 0,
            exponential_backoff: false,
            prefetch_coarser_level: false,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Zoom factor per wheel unit: `exp(-delta_y * sensitivity)`
    pub wheel_zoom_sensitivity: f64,
    /// Minimum pointer distance change before a pinch zooms
    pub pinch_threshold: f64,
    /// Minimum pointer travel before a press becomes a drag
    pub drag_threshold: f64,
    /// Longest press still recognized as a tap
    pub tap_timeout_ms: u64,
    /// Delay between the last view change and the tile rebuild
    pub debounce_ms: u64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            wheel_zoom_sensitivity: 0.0015,
            pinch_threshold: 4.0,
            drag_threshold: 4.0,
            tap_timeout_ms: 300,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameTimingConfig {
    /// Draw every frame instead of only after invalidation
    pub continuous: bool,
    pub min_frame_interval_ms: u64,
}

impl Default for FrameTimingConfig {
    fn default() -> Self {
        Self {
            continuous: false,
            min_frame_interval_ms: 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub surface_gap: f64,
    pub orientation: Orientation,
    pub surface_filter: SurfaceFilter,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            surface_gap: DEFAULT_SURFACE_GAP,
            orientation: Orientation::Vertical,
            surface_filter: SurfaceFilter::All,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    pub background: Color,
    pub surface_fill: Color,
    pub placeholder_fill: Color,
    pub grid_line: Color,
    pub high: Color,
    pub medium: Color,
    pub other: Color,
    pub selected: Color,
    pub border_width: f32,
    pub selected_border_width: f32,
    pub debug_text: Color,
    pub show_debug: bool,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            background: Color::rgb(24, 24, 27),
            surface_fill: Color::rgb(39, 39, 42),
            placeholder_fill: Color::rgb(52, 52, 58),
            grid_line: Color::rgb(82, 82, 91),
            high: Color::rgb(239, 68, 68),
            medium: Color::rgb(245, 158, 11),
            other: Color::rgb(34, 197, 94),
            selected: Color::rgb(59, 130, 246),
            border_width: 1.5,
            selected_border_width: 4.0,
            debug_text: Color::WHITE,
            show_debug: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    /// Backend `view` parameter
    pub view: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout_ms: 30_000,
            view: DEFAULT_VIEW.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles_validate() {
        for profile in [
            ViewerProfile::Balanced,
            ViewerProfile::LowBandwidth,
            ViewerProfile::HighQuality,
        ] {
            profile.resolve().validate().unwrap();
        }
        let custom = ViewerConfig {
            layout: LayoutConfig {
                surface_gap: 0.0,
                ..LayoutConfig::default()
            },
            ..ViewerConfig::default()
        };
        assert_eq!(ViewerProfile::Custom(custom.clone()).resolve(), custom);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = ViewerConfig::from_json_str(
            r#"{ "tile_loading": { "max_concurrent": 2, "format": "PNG" }, "api": { "base_url": "http://backend" } }"#,
        )
        .unwrap();
        assert_eq!(config.tile_loading.max_concurrent, 2);
        assert_eq!(config.tile_loading.format, TileFormat::Png);
        assert_eq!(config.tile_loading.cache_capacity, DEFAULT_CACHE_CAPACITY);
        assert_eq!(config.api.view, "2D");
        assert_eq!(config.layout.surface_gap, DEFAULT_SURFACE_GAP);
    }

    #[test]
    fn test_invalid_json_config_rejected() {
        let err = ViewerConfig::from_json_str(r#"{ "tile_loading": { "cache_capacity": 0 } }"#);
        assert!(matches!(err, Err(MosaicError::Config(_))));
        let err = ViewerConfig::from_json_str("not json");
        assert!(matches!(err, Err(MosaicError::Serialization(_))));
    }

    #[test]
    fn test_json_round_trip_of_defaults() {
        let config = ViewerConfig::default();
        let json = config.to_json_string().unwrap();
        assert_eq!(ViewerConfig::from_json_str(&json).unwrap(), config);
    }
}
