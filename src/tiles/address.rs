//! World tile rectangle to backend tile address
//!
//! The backend stores every mosaic un-rotated and indexes tiles from the
//! surface's own origin, so the mapper works in surface-local coordinates and
//! swaps axes for the horizontal orientation.

use crate::core::{bounds::Rect, constants::TILE_INDEX_EPSILON};
use crate::layout::{Layout, Orientation, Surface, SurfaceLayout};
use crate::tiles::lod::{tile_at, virtual_tile_size, Tile};
use serde::{Deserialize, Serialize};

/// Backend tile coordinates of one pyramid tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileAddress {
    pub surface: Surface,
    pub level: u8,
    pub tile_x: u32,
    pub tile_y: u32,
}

/// Maps selector tiles to backend addresses and back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileAddressMapper {
    pub base_tile_size: u32,
}

impl TileAddressMapper {
    pub fn new(base_tile_size: u32) -> Self {
        Self { base_tile_size }
    }

    /// Backend address for a world tile rectangle, or `None` when it falls
    /// outside the stored mosaic.
    ///
    /// In the vertical orientation the local origin of any surface after the
    /// first is aligned up to a multiple of the base tile size, matching the
    /// backend's column numbering for the second surface.
    pub fn map(
        &self,
        rect: &Rect,
        surface: &SurfaceLayout,
        orientation: Orientation,
        level: u8,
    ) -> Option<TileAddress> {
        let vts = virtual_tile_size(self.base_tile_size, level);
        if !(vts > 0.0) {
            return None;
        }

        let local_y = rect.y - surface.offset_y;
        let (col, row) = match orientation {
            Orientation::Vertical if surface.ordinal > 0 => {
                let base = self.base_tile_size as f64;
                let aligned = (surface.offset_x / base).ceil() * base;
                let local_x = rect.x - aligned;
                (
                    (local_x / vts - TILE_INDEX_EPSILON).ceil(),
                    (local_y / vts + TILE_INDEX_EPSILON).floor(),
                )
            }
            _ => {
                let local_x = rect.x - surface.offset_x;
                (
                    (local_x / vts + TILE_INDEX_EPSILON).floor(),
                    (local_y / vts + TILE_INDEX_EPSILON).floor(),
                )
            }
        };

        let (tile_x, tile_y) = match orientation {
            Orientation::Vertical => (col, row),
            Orientation::Horizontal => (row, col),
        };

        let max_x = (surface.mosaic_width / vts).ceil() - 1.0;
        let max_y = (surface.mosaic_height / vts).ceil() - 1.0;
        if !(tile_x >= 0.0 && tile_y >= 0.0 && tile_x <= max_x && tile_y <= max_y) {
            log::trace!(
                "no backend tile for {rect:?} on {} ({tile_x}, {tile_y})",
                surface.surface
            );
            return None;
        }

        Some(TileAddress {
            surface: surface.surface,
            level,
            tile_x: tile_x as u32,
            tile_y: tile_y as u32,
        })
    }

    /// Address of a selector tile within `layout`
    pub fn map_tile(&self, tile: &Tile, layout: &Layout) -> Option<TileAddress> {
        let surface = layout.surface(tile.surface)?;
        self.map(&tile.rect(), surface, layout.orientation, tile.level)
    }

    /// World tile for a backend address (inverse of [`map_tile`](Self::map_tile))
    pub fn tile_for_address(&self, address: &TileAddress, layout: &Layout) -> Option<Tile> {
        let surface = layout.surface(address.surface)?;
        let (col, row) = match layout.orientation {
            Orientation::Vertical => (address.tile_x, address.tile_y),
            Orientation::Horizontal => (address.tile_y, address.tile_x),
        };
        let vts = virtual_tile_size(self.base_tile_size, address.level);
        tile_at(surface, address.level, vts, col, row)
    }
}
