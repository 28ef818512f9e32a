//! Level-of-detail and visibility selection
//!
//! Picks one pyramid level for the whole view and enumerates, per surface,
//! the tiles of that level that intersect the (margin-expanded) viewport.

use crate::core::{
    bounds::Rect,
    geo::{Point, Size},
    viewport::ViewportTransform,
};
use crate::layout::{Layout, Surface, SurfaceLayout};
use crate::traits::GeometryOps;
use serde::{Deserialize, Serialize};

/// Pyramid level for a scale: `max(0, floor(log2(1/scale)))`, capped at `max_level`
pub fn pyramid_level(scale: f64, max_level: u8) -> u8 {
    if !(scale > 0.0) || !scale.is_finite() {
        return 0;
    }
    let level = (1.0 / scale).log2().floor();
    if level <= 0.0 {
        0
    } else {
        level.min(max_level as f64) as u8
    }
}

/// World extent covered by one tile at `level`: `base * 2^level`
pub fn virtual_tile_size(base_tile_size: u32, level: u8) -> f64 {
    base_tile_size as f64 * 2f64.powi(level as i32)
}

/// One tile of the pyramid in world space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub surface: Surface,
    pub level: u8,
    pub virtual_size: f64,
    pub world_x: f64,
    pub world_y: f64,
    /// Equal to `virtual_size` except on the last column, where it is clipped
    pub world_width: f64,
    /// Equal to `virtual_size` except on the last row, where it is clipped
    pub world_height: f64,
    /// Column in the surface's world grid
    pub tile_x: u32,
    /// Row in the surface's world grid
    pub tile_y: u32,
}

impl Tile {
    pub fn rect(&self) -> Rect {
        Rect::new(self.world_x, self.world_y, self.world_width, self.world_height)
    }

    /// The tile one level coarser that covers this one
    pub fn parent(&self, surface: &SurfaceLayout) -> Option<Tile> {
        tile_at(
            surface,
            self.level.checked_add(1)?,
            self.virtual_size * 2.0,
            self.tile_x / 2,
            self.tile_y / 2,
        )
    }
}

/// Grid cell `(col, row)` of a surface at the given level, clipped to the surface
pub fn tile_at(
    surface: &SurfaceLayout,
    level: u8,
    virtual_size: f64,
    col: u32,
    row: u32,
) -> Option<Tile> {
    if !(virtual_size > 0.0) {
        return None;
    }
    let local_x = col as f64 * virtual_size;
    let local_y = row as f64 * virtual_size;
    let world_width = virtual_size.min(surface.world_width - local_x);
    let world_height = virtual_size.min(surface.world_height - local_y);
    if world_width <= 0.0 || world_height <= 0.0 {
        return None;
    }
    Some(Tile {
        surface: surface.surface,
        level,
        virtual_size,
        world_x: surface.offset_x + local_x,
        world_y: surface.offset_y + local_y,
        world_width,
        world_height,
        tile_x: col,
        tile_y: row,
    })
}

/// Result of one visibility pass
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TileSelection {
    pub level: u8,
    pub virtual_size: f64,
    /// World rect of the container without the prefetch margin
    pub visible_rect: Rect,
    /// World rect including the prefetch margin
    pub prefetch_rect: Rect,
    /// Ordered nearest-to-centre first
    pub tiles: Vec<Tile>,
}

impl TileSelection {
    /// Tile is inside the container (not only in the prefetch margin)
    pub fn is_visible(&self, tile: &Tile) -> bool {
        self.visible_rect.intersects_bounds(&tile.rect())
    }
}

/// Chooses the pyramid level and enumerates visible tiles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileSelector {
    pub base_tile_size: u32,
    pub max_level: u8,
    /// Screen pixels added around the container
    pub prefetch_margin: f64,
}

impl TileSelector {
    pub fn new(base_tile_size: u32, max_level: u8, prefetch_margin: f64) -> Self {
        Self {
            base_tile_size,
            max_level,
            prefetch_margin: prefetch_margin.max(0.0),
        }
    }

    pub fn level_for_scale(&self, scale: f64) -> u8 {
        pyramid_level(scale, self.max_level)
    }

    /// Visible tiles for the transform across every surface of `layout`
    pub fn select(
        &self,
        transform: &ViewportTransform,
        container: Size,
        layout: &Layout,
    ) -> TileSelection {
        let level = self.level_for_scale(transform.scale);
        let virtual_size = virtual_tile_size(self.base_tile_size, level);
        let visible_rect = transform.visible_world_rect(container, 0.0);
        let prefetch_rect = transform.visible_world_rect(container, self.prefetch_margin);

        let mut tiles = if container.is_degenerate() || self.base_tile_size == 0 {
            Vec::new()
        } else {
            self.tiles_in_rect(layout, level, &prefetch_rect)
        };
        sort_by_distance(&mut tiles, visible_rect.center());

        TileSelection {
            level,
            virtual_size,
            visible_rect,
            prefetch_rect,
            tiles,
        }
    }

    /// Tiles of `level` intersecting `rect`, per surface in layout order
    pub fn tiles_in_rect(&self, layout: &Layout, level: u8, rect: &Rect) -> Vec<Tile> {
        let virtual_size = virtual_tile_size(self.base_tile_size, level);
        if !(virtual_size > 0.0) {
            return Vec::new();
        }
        let mut tiles = Vec::new();
        for surface in &layout.surfaces {
            let Some(inter) = rect.intersection(&surface.bounds()) else {
                continue;
            };
            let cols = (surface.world_width / virtual_size).ceil() as i64;
            let rows = (surface.world_height / virtual_size).ceil() as i64;

            let c0 = (((inter.x - surface.offset_x) / virtual_size).floor() as i64).max(0);
            let c1 = ((((inter.right() - surface.offset_x) / virtual_size).ceil() as i64) - 1)
                .min(cols - 1);
            let r0 = (((inter.y - surface.offset_y) / virtual_size).floor() as i64).max(0);
            let r1 = ((((inter.bottom() - surface.offset_y) / virtual_size).ceil() as i64) - 1)
                .min(rows - 1);

            for row in r0..=r1 {
                for col in c0..=c1 {
                    if let Some(tile) = tile_at(surface, level, virtual_size, col as u32, row as u32) {
                        tiles.push(tile);
                    }
                }
            }
        }
        tiles
    }
}

fn sort_by_distance(tiles: &mut [Tile], center: Point) {
    tiles.sort_by(|a, b| {
        let da = a.rect().center().distance_to(&center);
        let db = b.rect().center().distance_to(&center);
        da.total_cmp(&db)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Orientation, SurfaceFilter, SurfaceMeta};

    fn single(width: u32, height: u32) -> Layout {
        Layout::build(
            Orientation::Vertical,
            SurfaceFilter::All,
            &[SurfaceMeta::new(Surface::Top, width, height, 1)],
            256.0,
        )
    }

    #[test]
    fn test_pyramid_level() {
        assert_eq!(pyramid_level(1.0, 2), 0);
        assert_eq!(pyramid_level(0.75, 2), 0);
        assert_eq!(pyramid_level(0.5, 2), 1);
        assert_eq!(pyramid_level(0.3, 2), 1);
        assert_eq!(pyramid_level(0.25, 2), 2);
        assert_eq!(pyramid_level(0.005, 2), 2);
        assert_eq!(pyramid_level(0.005, 10), 7);
        assert_eq!(pyramid_level(0.0, 2), 0);
        assert_eq!(pyramid_level(-1.0, 2), 0);
        assert_eq!(virtual_tile_size(1024, 2), 4096.0);
    }

    #[test]
    fn test_last_column_is_clipped() {
        let layout = single(1000, 600);
        let surface = &layout.surfaces[0];
        let tile = tile_at(surface, 0, 512.0, 1, 0).unwrap();
        assert_eq!(tile.world_width, 488.0);
        assert_eq!(tile.world_height, 512.0);
        let tile = tile_at(surface, 0, 512.0, 1, 1).unwrap();
        assert_eq!(tile.world_height, 88.0);
        assert!(tile_at(surface, 0, 512.0, 2, 0).is_none());
    }

    #[test]
    fn test_select_covers_view_within_bounds() {
        let layout = single(1000, 600);
        let selector = TileSelector::new(512, 2, 0.0);
        let selection = selector.select(
            &ViewportTransform::new(0.0, 0.0, 1.0),
            Size::new(2000.0, 2000.0),
            &layout,
        );
        assert_eq!(selection.level, 0);
        assert_eq!(selection.tiles.len(), 4);
        let bounds = layout.surfaces[0].bounds();
        for tile in &selection.tiles {
            assert!(bounds.contains_rect(&tile.rect(), 1e-9));
            assert!(tile.world_width > 0.0 && tile.world_width <= 512.0);
        }
        // nearest to the view centre comes first
        assert_eq!((selection.tiles[0].tile_x, selection.tiles[0].tile_y), (1, 1));
    }

    #[test]
    fn test_select_partial_view() {
        let layout = single(4096, 4096);
        let selector = TileSelector::new(1024, 2, 0.0);
        // scale 1, container shows world [1500, 2600) x [0, 500)
        let selection = selector.select(
            &ViewportTransform::new(-1500.0, 0.0, 1.0),
            Size::new(1100.0, 500.0),
            &layout,
        );
        let mut cols: Vec<u32> = selection.tiles.iter().map(|t| t.tile_x).collect();
        cols.sort_unstable();
        assert_eq!(cols, vec![1, 2]);
        assert!(selection.tiles.iter().all(|t| t.tile_y == 0));
    }

    #[test]
    fn test_margin_adds_prefetch_tiles() {
        let layout = single(4096, 1024);
        let no_margin = TileSelector::new(1024, 2, 0.0);
        let margin = TileSelector::new(1024, 2, 200.0);
        let t = ViewportTransform::new(-1024.0, 0.0, 1.0);
        let size = Size::new(1024.0, 1024.0);
        let a = no_margin.select(&t, size, &layout);
        let b = margin.select(&t, size, &layout);
        assert_eq!(a.tiles.len(), 1);
        assert_eq!(b.tiles.len(), 3);
        assert_eq!(b.tiles.iter().filter(|t| b.is_visible(t)).count(), 1);
    }

    #[test]
    fn test_view_outside_layout_selects_nothing() {
        let layout = single(1000, 600);
        let selector = TileSelector::new(512, 2, 0.0);
        let selection = selector.select(
            &ViewportTransform::new(5000.0, 5000.0, 1.0),
            Size::new(800.0, 600.0),
            &layout,
        );
        assert!(selection.tiles.is_empty());

        let empty = Layout::empty(Orientation::Vertical);
        let selection = selector.select(&ViewportTransform::default(), Size::new(800.0, 600.0), &empty);
        assert!(selection.tiles.is_empty());
    }

    #[test]
    fn test_parent_tile() {
        let layout = single(3000, 3000);
        let surface = &layout.surfaces[0];
        let tile = tile_at(surface, 0, 1024.0, 2, 1).unwrap();
        let parent = tile.parent(surface).unwrap();
        assert_eq!((parent.level, parent.tile_x, parent.tile_y), (1, 1, 0));
        assert_eq!(parent.world_x, 2048.0);
        assert_eq!(parent.world_width, 952.0);
        assert!(parent.rect().contains_rect(&tile.rect(), 1e-9));
    }
}
