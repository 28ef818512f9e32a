//! Mosaic layout engine
//!
//! Places the active surface mosaics side by side (vertical orientation) or
//! stacked (horizontal orientation, rotated 90°) in one world coordinate
//! space separated by a fixed gap.

use crate::core::{bounds::Rect, geo::Size};
use crate::{MosaicError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scanned side of the plate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    Top,
    Bottom,
}

impl Surface {
    /// Layout order
    pub const ALL: [Surface; 2] = [Surface::Top, Surface::Bottom];

    pub fn as_str(&self) -> &'static str {
        match self {
            Surface::Top => "top",
            Surface::Bottom => "bottom",
        }
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Surface {
    type Err = MosaicError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" => Ok(Surface::Top),
            "bottom" => Ok(Surface::Bottom),
            other => Err(MosaicError::InvalidMetadata(format!("unknown surface '{other}'"))),
        }
    }
}

/// How surfaces are arranged on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Mosaics upright, surfaces left to right
    #[default]
    Vertical,
    /// Mosaics rotated, surfaces top to bottom
    Horizontal,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Vertical => "vertical",
            Orientation::Horizontal => "horizontal",
        }
    }

    /// World axes are swapped relative to the stored mosaic
    pub fn is_rotated(&self) -> bool {
        matches!(self, Orientation::Horizontal)
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which surfaces are shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceFilter {
    #[default]
    All,
    Top,
    Bottom,
}

impl SurfaceFilter {
    pub fn includes(&self, surface: Surface) -> bool {
        match self {
            SurfaceFilter::All => true,
            SurfaceFilter::Top => surface == Surface::Top,
            SurfaceFilter::Bottom => surface == Surface::Bottom,
        }
    }
}

/// Frame geometry of one surface of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceMeta {
    pub surface: Surface,
    #[serde(alias = "frameWidth")]
    pub frame_width: u32,
    #[serde(alias = "frameHeight")]
    pub frame_height: u32,
    #[serde(alias = "frameCount", alias = "image_count", alias = "imageCount")]
    pub frame_count: u32,
}

impl SurfaceMeta {
    pub fn new(surface: Surface, frame_width: u32, frame_height: u32, frame_count: u32) -> Self {
        Self {
            surface,
            frame_width,
            frame_height,
            frame_count,
        }
    }

    /// Stitched mosaic size: frames stacked along y
    pub fn mosaic_size(&self) -> Size {
        Size::new(
            self.frame_width as f64,
            self.frame_count as f64 * self.frame_height as f64,
        )
    }
}

/// Placement of one surface in world space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceLayout {
    pub surface: Surface,
    /// Position in line, 0 for the first placed surface
    pub ordinal: usize,
    pub frame_height: f64,
    pub mosaic_width: f64,
    pub mosaic_height: f64,
    pub world_width: f64,
    pub world_height: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl SurfaceLayout {
    /// World-space rectangle covered by this surface
    pub fn bounds(&self) -> Rect {
        Rect::new(self.offset_x, self.offset_y, self.world_width, self.world_height)
    }

    pub fn mosaic_size(&self) -> Size {
        Size::new(self.mosaic_width, self.mosaic_height)
    }
}

/// Arrangement of all active surfaces
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Layout {
    pub orientation: Orientation,
    pub surfaces: Vec<SurfaceLayout>,
    pub world_width: f64,
    pub world_height: f64,
}

impl Layout {
    pub fn empty(orientation: Orientation) -> Self {
        Self {
            orientation,
            ..Default::default()
        }
    }

    /// Lays out every surface accepted by `filter`.
    ///
    /// Surfaces are placed top before bottom regardless of input order; a
    /// repeated surface keeps its first entry. Zero-sized mosaics are skipped.
    pub fn build(
        orientation: Orientation,
        filter: SurfaceFilter,
        metas: &[SurfaceMeta],
        gap: f64,
    ) -> Self {
        let gap = if gap.is_finite() { gap.max(0.0) } else { 0.0 };
        let mut layout = Layout::empty(orientation);
        let mut cursor = 0.0;

        for surface in Surface::ALL {
            if !filter.includes(surface) {
                continue;
            }
            let Some(meta) = metas.iter().find(|m| m.surface == surface) else {
                continue;
            };
            let mosaic = meta.mosaic_size();
            if mosaic.is_degenerate() {
                log::debug!("skipping {surface} surface with empty mosaic {mosaic:?}");
                continue;
            }

            let (world_width, world_height) = if orientation.is_rotated() {
                (mosaic.height, mosaic.width)
            } else {
                (mosaic.width, mosaic.height)
            };

            if !layout.surfaces.is_empty() {
                cursor += gap;
            }
            let (offset_x, offset_y) = match orientation {
                Orientation::Vertical => (cursor, 0.0),
                Orientation::Horizontal => (0.0, cursor),
            };

            layout.surfaces.push(SurfaceLayout {
                surface,
                ordinal: layout.surfaces.len(),
                frame_height: meta.frame_height as f64,
                mosaic_width: mosaic.width,
                mosaic_height: mosaic.height,
                world_width,
                world_height,
                offset_x,
                offset_y,
            });

            match orientation {
                Orientation::Vertical => {
                    cursor += world_width;
                    layout.world_width = cursor;
                    layout.world_height = layout.world_height.max(world_height);
                }
                Orientation::Horizontal => {
                    cursor += world_height;
                    layout.world_height = cursor;
                    layout.world_width = layout.world_width.max(world_width);
                }
            }
        }

        layout
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    pub fn world_size(&self) -> Size {
        Size::new(self.world_width, self.world_height)
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.world_width, self.world_height)
    }

    pub fn surface(&self, surface: Surface) -> Option<&SurfaceLayout> {
        self.surfaces.iter().find(|s| s.surface == surface)
    }
}
