//! Wire types of the inspection backend
//!
//! Field names are accepted in both camelCase and snake_case.

use crate::core::constants::{DEFAULT_MAX_LEVEL, DEFAULT_MIN_LEVEL, DEFAULT_TILE_SIZE};
use crate::layout::SurfaceMeta;
use crate::overlay::Defect;
use crate::{MosaicError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
struct TileSection {
    #[serde(default, alias = "defaultTileSize")]
    default_tile_size: Option<u32>,
    #[serde(default, alias = "maxLevel")]
    max_level: Option<u8>,
    #[serde(default, alias = "minLevel")]
    min_level: Option<u8>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawMeta {
    #[serde(default, alias = "defaultTileSize")]
    default_tile_size: Option<u32>,
    #[serde(default, alias = "maxLevel")]
    max_level: Option<u8>,
    #[serde(default, alias = "minLevel")]
    min_level: Option<u8>,
    #[serde(default)]
    tile: Option<TileSection>,
    #[serde(default, alias = "perSurface", alias = "surfaces")]
    per_surface: Vec<SurfaceMeta>,
}

/// Pyramid parameters and per-surface frame geometry of one record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MosaicMeta {
    pub default_tile_size: u32,
    pub max_level: u8,
    pub min_level: u8,
    pub per_surface: Vec<SurfaceMeta>,
}

impl Default for MosaicMeta {
    fn default() -> Self {
        Self {
            default_tile_size: DEFAULT_TILE_SIZE,
            max_level: DEFAULT_MAX_LEVEL,
            min_level: DEFAULT_MIN_LEVEL,
            per_surface: Vec::new(),
        }
    }
}

impl MosaicMeta {
    pub fn new(default_tile_size: u32, max_level: u8, per_surface: Vec<SurfaceMeta>) -> Self {
        Self {
            default_tile_size,
            max_level,
            min_level: DEFAULT_MIN_LEVEL,
            per_surface,
        }
    }

    /// Parse a metadata document.
    ///
    /// Pyramid fields may sit at the top level or inside a `tile` section
    /// (top level wins); missing ones take the backend defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: RawMeta = serde_json::from_str(json)?;
        Self::from_raw(raw)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let raw: RawMeta = serde_json::from_value(value)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawMeta) -> Result<Self> {
        let tile = raw.tile.unwrap_or_default();
        let meta = Self {
            default_tile_size: raw
                .default_tile_size
                .or(tile.default_tile_size)
                .unwrap_or(DEFAULT_TILE_SIZE),
            max_level: raw.max_level.or(tile.max_level).unwrap_or(DEFAULT_MAX_LEVEL),
            min_level: raw.min_level.or(tile.min_level).unwrap_or(DEFAULT_MIN_LEVEL),
            per_surface: raw.per_surface,
        };
        meta.validate()?;
        Ok(meta)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_tile_size == 0 {
            return Err(MosaicError::InvalidMetadata("default tile size is 0".into()));
        }
        if self.min_level > self.max_level {
            return Err(MosaicError::InvalidMetadata(format!(
                "min level {} above max level {}",
                self.min_level, self.max_level
            )));
        }
        Ok(())
    }
}

/// Defect list response: an envelope or a bare array
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DefectList {
    Envelope {
        #[serde(default, alias = "seqNo")]
        seq_no: Option<i64>,
        defects: Vec<Defect>,
        #[serde(default, alias = "totalCount")]
        total_count: Option<usize>,
    },
    Bare(Vec<Defect>),
}

impl DefectList {
    pub fn into_defects(self) -> Vec<Defect> {
        match self {
            DefectList::Envelope { defects, .. } => defects,
            DefectList::Bare(defects) => defects,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Surface;

    #[test]
    fn test_meta_nested_tile_section() {
        let meta = MosaicMeta::from_json_str(
            r#"{
                "defect_classes": {"items": []},
                "tile": {"max_level": 2, "min_level": 0, "default_tile_size": 1024},
                "perSurface": [
                    {"surface": "top", "frameWidth": 16384, "frameHeight": 1024, "frameCount": 12},
                    {"surface": "bottom", "frame_width": 16384, "frame_height": 1024, "image_count": 10}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(meta.default_tile_size, 1024);
        assert_eq!(meta.max_level, 2);
        assert_eq!(meta.per_surface.len(), 2);
        assert_eq!(meta.per_surface[1].surface, Surface::Bottom);
        assert_eq!(meta.per_surface[1].frame_count, 10);
    }

    #[test]
    fn test_meta_top_level_fields_and_defaults() {
        let meta = MosaicMeta::from_json_str(r#"{"defaultTileSize": 512, "maxLevel": 4}"#).unwrap();
        assert_eq!(meta.default_tile_size, 512);
        assert_eq!(meta.max_level, 4);
        assert!(meta.per_surface.is_empty());

        let meta = MosaicMeta::from_json_str("{}").unwrap();
        assert_eq!(meta, MosaicMeta::default());
    }

    #[test]
    fn test_invalid_meta_rejected() {
        assert!(matches!(
            MosaicMeta::from_json_str(r#"{"default_tile_size": 0}"#),
            Err(MosaicError::InvalidMetadata(_))
        ));
        assert!(matches!(
            MosaicMeta::from_json_str(r#"{"tile": {"min_level": 3, "max_level": 1}}"#),
            Err(MosaicError::InvalidMetadata(_))
        ));
    }

    #[test]
    fn test_defect_list_shapes() {
        let envelope: DefectList = serde_json::from_str(
            r#"{"seq_no": 5, "defects": [{"defect_id": "1", "surface": "top", "image_index": 1,
                "x": 0, "y": 0, "width": 1, "height": 1, "severity": "low", "defect_type": "x"}],
                "total_count": 1}"#,
        )
        .unwrap();
        assert_eq!(envelope.into_defects().len(), 1);

        let bare: DefectList = serde_json::from_str("[]").unwrap();
        assert!(bare.into_defects().is_empty());
    }
}
