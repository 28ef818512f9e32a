//! Frame composition
//!
//! Turns a snapshot of viewer state into screen-space draw commands in a fixed
//! order: background, surface fills, tiles, defect boxes, debug text.

use crate::core::{
    bounds::Rect,
    config::OverlayStyle,
    constants::DEBUG_TEXT_SIZE,
    geo::{Point, Size},
    viewport::ViewportTransform,
};
use crate::layout::{Orientation, SurfaceLayout};
use crate::overlay::{MappedDefect, Severity};
use crate::rendering::context::{Color, RenderContext};
use crate::tiles::{address::TileAddress, cache::TileImage, lod::Tile};
use crate::traits::CacheStats;

/// What to draw for one tile this frame
#[derive(Debug, Clone, PartialEq)]
pub enum TileContent {
    Image(TileImage),
    /// Coarser tile cropped to the child's region while the child loads
    Parent { image: TileImage, parent: Tile },
    Placeholder { status: &'static str },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TileDraw {
    pub tile: Tile,
    /// `None` when the tile has no backend counterpart
    pub address: Option<TileAddress>,
    pub content: TileContent,
}

/// Read-only view of everything one frame needs
#[derive(Debug, Clone)]
pub struct FrameSnapshot<'a> {
    pub transform: ViewportTransform,
    pub container: Size,
    pub orientation: Orientation,
    pub surfaces: &'a [SurfaceLayout],
    pub tiles: &'a [TileDraw],
    pub defects: &'a [MappedDefect],
    pub selected: Option<&'a str>,
    pub style: &'a OverlayStyle,
    pub level: u8,
    pub stats: CacheStats,
}

/// Normalized source region of `image_tile`'s image covering the world `region`.
///
/// Backend images are stored un-rotated, so for the horizontal orientation the
/// axes are swapped and the result must be drawn transposed.
pub fn image_uv(region: &Rect, image_tile: &Tile, orientation: Orientation) -> Rect {
    let vts = image_tile.virtual_size;
    if !(vts > 0.0) {
        return Rect::new(0.0, 0.0, 1.0, 1.0);
    }
    let u = (region.x - image_tile.world_x) / vts;
    let v = (region.y - image_tile.world_y) / vts;
    let w = region.width / vts;
    let h = region.height / vts;
    match orientation {
        Orientation::Vertical => Rect::new(u, v, w, h),
        Orientation::Horizontal => Rect::new(v, u, h, w),
    }
}

fn severity_color(style: &OverlayStyle, severity: Severity) -> Color {
    match severity {
        Severity::High => style.high,
        Severity::Medium => style.medium,
        Severity::Low | Severity::Unknown => style.other,
    }
}

/// Record one frame into `ctx`
pub fn compose_frame(frame: &FrameSnapshot<'_>, ctx: &mut RenderContext) {
    let style = frame.style;
    let transform = &frame.transform;
    let transposed = frame.orientation.is_rotated();

    ctx.begin_frame();
    ctx.resize(
        frame.container.width.max(0.0) as u32,
        frame.container.height.max(0.0) as u32,
    );
    ctx.set_clip_bounds(Rect::new(
        0.0,
        0.0,
        frame.container.width,
        frame.container.height,
    ));
    ctx.clear(style.background);

    for surface in frame.surfaces {
        ctx.fill_rect(transform.world_rect_to_screen(&surface.bounds()), style.surface_fill);
    }

    for draw in frame.tiles {
        let tile_rect = draw.tile.rect();
        let dest = transform.world_rect_to_screen(&tile_rect);
        match &draw.content {
            TileContent::Image(image) => {
                let uv = image_uv(&tile_rect, &draw.tile, frame.orientation);
                ctx.image(image.clone(), dest, uv, transposed);
            }
            TileContent::Parent { image, parent } => {
                let uv = image_uv(&tile_rect, parent, frame.orientation);
                ctx.image(image.clone(), dest, uv, transposed);
            }
            TileContent::Placeholder { .. } => {
                ctx.fill_rect(dest, style.placeholder_fill);
                ctx.stroke_rect(dest, style.grid_line, 1.0);
                ctx.line(dest.min(), dest.max(), style.grid_line, 1.0);
                ctx.line(
                    Point::new(dest.right(), dest.y),
                    Point::new(dest.x, dest.bottom()),
                    style.grid_line,
                    1.0,
                );
            }
        }
    }

    let mut selected = None;
    for defect in frame.defects {
        if frame.selected == Some(defect.id.as_str()) {
            selected = Some(defect);
            continue;
        }
        let rect = transform.world_rect_to_screen(&defect.rect);
        ctx.stroke_rect(rect, severity_color(style, defect.severity), style.border_width);
    }
    // selected box goes on top
    if let Some(defect) = selected {
        let rect = transform.world_rect_to_screen(&defect.rect);
        ctx.stroke_rect(rect, style.selected, style.selected_border_width);
    }

    if style.show_debug {
        draw_debug(frame, ctx);
    }
}

fn draw_debug(frame: &FrameSnapshot<'_>, ctx: &mut RenderContext) {
    let style = frame.style;
    let visible = Rect::new(0.0, 0.0, frame.container.width, frame.container.height);

    for draw in frame.tiles {
        let dest = frame.transform.world_rect_to_screen(&draw.tile.rect());
        if visible.intersection(&dest).is_none() {
            continue;
        }
        let status = match &draw.content {
            TileContent::Image(_) => "ready",
            TileContent::Parent { .. } => "parent",
            TileContent::Placeholder { status } => *status,
        };
        let label = match draw.address {
            Some(a) => format!("{} L{} {},{} {status}", a.surface, a.level, a.tile_x, a.tile_y),
            None => format!("L{} -- {status}", draw.tile.level),
        };
        ctx.text(
            Point::new(dest.x + 4.0, dest.y + 4.0),
            label,
            DEBUG_TEXT_SIZE,
            style.debug_text,
        );
    }

    let ready = frame
        .tiles
        .iter()
        .filter(|d| matches!(d.content, TileContent::Image(_)))
        .count();
    let hud = format!(
        "level {} scale {:.4} tiles {}/{} cache {} in-flight {} hit {:.0}%",
        frame.level,
        frame.transform.scale,
        ready,
        frame.tiles.len(),
        frame.stats.size,
        frame.stats.in_flight,
        frame.stats.hit_rate() * 100.0,
    );
    ctx.text(Point::new(8.0, 8.0), hud, DEBUG_TEXT_SIZE, style.debug_text);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Layout, Surface, SurfaceFilter, SurfaceMeta};
    use crate::rendering::context::DrawCommand;
    use crate::tiles::cache::{TileFormat, TileKey};
    use crate::tiles::lod::tile_at;

    fn image(x: u32) -> TileImage {
        TileImage::new(
            TileKey {
                surface: Surface::Top,
                seq_id: 1,
                level: 0,
                tile_x: x,
                tile_y: 0,
                orientation: Orientation::Vertical,
                format: TileFormat::Jpeg,
                tile_size: 512,
            },
            vec![1, 2, 3],
        )
    }

    #[test]
    fn test_image_uv_clipped_edge_tile() {
        let layout = Layout::build(
            Orientation::Vertical,
            SurfaceFilter::All,
            &[SurfaceMeta::new(Surface::Top, 1000, 1000, 1)],
            0.0,
        );
        let surface = &layout.surfaces[0];
        let tile = tile_at(surface, 0, 512.0, 1, 0).unwrap();
        assert_eq!(tile.world_width, 488.0);
        let uv = image_uv(&tile.rect(), &tile, Orientation::Vertical);
        assert_eq!(uv, Rect::new(0.0, 0.0, 488.0 / 512.0, 1.0));

        let parent = tile.parent(surface).unwrap();
        let uv = image_uv(&tile.rect(), &parent, Orientation::Vertical);
        assert_eq!(uv, Rect::new(0.5, 0.0, 488.0 / 1024.0, 0.5));
    }

    #[test]
    fn test_image_uv_horizontal_swaps_axes() {
        let tile = Tile {
            surface: Surface::Top,
            level: 0,
            virtual_size: 100.0,
            world_x: 0.0,
            world_y: 0.0,
            world_width: 100.0,
            world_height: 40.0,
            tile_x: 0,
            tile_y: 0,
        };
        let uv = image_uv(&tile.rect(), &tile, Orientation::Horizontal);
        assert_eq!(uv, Rect::new(0.0, 0.0, 0.4, 1.0));
    }

    #[test]
    fn test_compose_order_and_selection() {
        let style = OverlayStyle {
            show_debug: true,
            ..OverlayStyle::default()
        };
        let tile = Tile {
            surface: Surface::Top,
            level: 0,
            virtual_size: 512.0,
            world_x: 0.0,
            world_y: 0.0,
            world_width: 512.0,
            world_height: 512.0,
            tile_x: 0,
            tile_y: 0,
        };
        let tiles = [
            TileDraw {
                tile,
                address: None,
                content: TileContent::Image(image(0)),
            },
            TileDraw {
                tile: Tile {
                    world_x: 512.0,
                    tile_x: 1,
                    ..tile
                },
                address: None,
                content: TileContent::Placeholder { status: "pending" },
            },
        ];
        let defects = [
            MappedDefect {
                id: "a".into(),
                surface: Surface::Top,
                severity: Severity::High,
                rect: Rect::new(10.0, 10.0, 20.0, 20.0),
            },
            MappedDefect {
                id: "b".into(),
                surface: Surface::Top,
                severity: Severity::Low,
                rect: Rect::new(50.0, 50.0, 20.0, 20.0),
            },
        ];
        let frame = FrameSnapshot {
            transform: ViewportTransform::new(0.0, 0.0, 1.0),
            container: Size::new(800.0, 600.0),
            orientation: Orientation::Vertical,
            surfaces: &[],
            tiles: &tiles,
            defects: &defects,
            selected: Some("a"),
            style: &style,
            level: 0,
            stats: CacheStats::default(),
        };
        let mut ctx = RenderContext::new(1, 1);
        compose_frame(&frame, &mut ctx);
        let queue = ctx.get_drawing_queue();

        assert!(matches!(queue[0], DrawCommand::Clear(_)));
        assert!(matches!(queue[1], DrawCommand::Image { .. }));
        assert!(matches!(queue[2], DrawCommand::FillRect { .. }));

        let strokes: Vec<(Color, f32)> = queue
            .iter()
            .filter_map(|c| match c {
                DrawCommand::StrokeRect { color, width, .. } if *color != style.grid_line => {
                    Some((*color, *width))
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            strokes,
            vec![
                (style.other, style.border_width),
                (style.selected, style.selected_border_width)
            ]
        );

        let texts = queue
            .iter()
            .filter(|c| matches!(c, DrawCommand::Text { size, .. } if *size == DEBUG_TEXT_SIZE))
            .count();
        assert_eq!(texts, 3);
        assert_eq!(ctx.width, 800);
    }
}
