//! egui integration: feeds egui input to the viewer and paints its frames

use crate::core::geo::{Point, Size};
use crate::core::viewer::MosaicViewer;
use crate::input::events::InputEvent;
use crate::prelude::{HashMap, HashSet, Instant};
use crate::rendering::context::{Color, DrawCommand, RenderContext};
use crate::tiles::cache::{TileImage, TileKey};
use egui::{
    epaint::Vertex, Color32, ColorImage, FontId, Mesh, Pos2, Rect, Response, Sense, Shape,
    Stroke, TextureHandle, TextureOptions, Ui, Vec2, Widget,
};

/// Mouse pointer id; touch ids are offset by one
const MOUSE_POINTER: u64 = 0;

/// Decoded tile textures kept between frames
#[derive(Clone, Default)]
struct TextureStore {
    textures: HashMap<TileKey, TextureHandle>,
    undecodable: HashSet<TileKey>,
}

impl TextureStore {
    fn texture(&mut self, ctx: &egui::Context, image: &TileImage) -> Option<egui::TextureId> {
        if let Some(handle) = self.textures.get(&image.key) {
            return Some(handle.id());
        }
        if self.undecodable.contains(&image.key) {
            return None;
        }
        match image.decode() {
            Ok(rgba) => {
                let size = [rgba.width() as usize, rgba.height() as usize];
                let color_image = ColorImage::from_rgba_unmultiplied(size, rgba.as_raw());
                let name = format!(
                    "mosaic-{}-{}-{}-{}-{}",
                    image.key.seq_id, image.key.surface, image.key.level, image.key.tile_x, image.key.tile_y
                );
                let handle = ctx.load_texture(name, color_image, TextureOptions::LINEAR);
                let id = handle.id();
                self.textures.insert(image.key, handle);
                Some(id)
            }
            Err(e) => {
                log::warn!("{e}");
                self.undecodable.insert(image.key);
                None
            }
        }
    }
}

fn color32(c: Color) -> Color32 {
    Color32::from_rgba_unmultiplied(c.r, c.g, c.b, c.a)
}

/// Widget painting a [`MosaicViewer`] into the available space
///
/// ```no_run
/// # fn show(ui: &mut egui::Ui, viewer: &mut mosaic_viewer::MosaicViewer) {
/// ui.add(mosaic_viewer::prelude::MosaicView::new(viewer));
/// # }
/// ```
pub struct MosaicView<'a> {
    viewer: &'a mut MosaicViewer,
    id: egui::Id,
    size: Option<Vec2>,
}

impl<'a> MosaicView<'a> {
    pub fn new(viewer: &'a mut MosaicViewer) -> Self {
        Self {
            viewer,
            id: egui::Id::new("mosaic_viewer_textures"),
            size: None,
        }
    }

    /// Distinguish texture stores when several views are shown
    pub fn id(mut self, id: impl Into<egui::Id>) -> Self {
        self.id = id.into();
        self
    }

    pub fn size(mut self, size: Vec2) -> Self {
        self.size = Some(size);
        self
    }

    fn feed_input(&mut self, ui: &Ui, rect: Rect, response: &Response, now: Instant) {
        let local = |pos: Pos2| Point::new((pos.x - rect.min.x) as f64, (pos.y - rect.min.y) as f64);
        let (events, hover, touching) =
            ui.input(|i| (i.events.clone(), i.pointer.hover_pos(), i.any_touches()));
        let hovered = response.hovered();

        for event in events {
            let input = match event {
                // egui mirrors the first touch as a mouse; use the touches only
                egui::Event::PointerButton { pos, button, pressed, .. }
                    if button == egui::PointerButton::Primary && !touching =>
                {
                    if pressed && !rect.contains(pos) {
                        continue;
                    }
                    let position = local(pos);
                    if pressed {
                        InputEvent::PointerDown { id: MOUSE_POINTER, position }
                    } else {
                        InputEvent::PointerUp { id: MOUSE_POINTER, position }
                    }
                }
                egui::Event::PointerMoved(pos) if !touching => InputEvent::PointerMove {
                    id: MOUSE_POINTER,
                    position: local(pos),
                },
                egui::Event::PointerGone => InputEvent::PointerCancel { id: MOUSE_POINTER },
                egui::Event::Touch { id, phase, pos, .. } => {
                    let id = id.0.wrapping_add(1);
                    let position = local(pos);
                    match phase {
                        egui::TouchPhase::Start if rect.contains(pos) => {
                            InputEvent::PointerDown { id, position }
                        }
                        egui::TouchPhase::Start => continue,
                        egui::TouchPhase::Move => InputEvent::PointerMove { id, position },
                        egui::TouchPhase::End => InputEvent::PointerUp { id, position },
                        egui::TouchPhase::Cancel => InputEvent::PointerCancel { id },
                    }
                }
                egui::Event::Scroll(delta) if hovered => {
                    let Some(pos) = hover else { continue };
                    InputEvent::Wheel {
                        delta_y: -delta.y as f64,
                        position: local(pos),
                    }
                }
                egui::Event::Zoom(factor) if hovered => {
                    if let Some(pos) = hover {
                        self.viewer.zoom_by(local(pos), factor as f64);
                    }
                    continue;
                }
                _ => continue,
            };
            self.viewer.handle_input(input, now);
        }
    }

    fn paint(&self, ui: &Ui, rect: Rect, commands: &[DrawCommand], store: &mut TextureStore) {
        let painter = ui.painter_at(rect);
        let origin = rect.min.to_vec2();
        let to_rect = |r: &crate::core::bounds::Rect| {
            Rect::from_min_size(
                Pos2::new(r.x as f32, r.y as f32) + origin,
                Vec2::new(r.width as f32, r.height as f32),
            )
        };
        let to_pos = |p: &Point| Pos2::new(p.x as f32, p.y as f32) + origin;

        for command in commands {
            match command {
                DrawCommand::Clear(color) => {
                    painter.rect_filled(rect, 0.0, color32(*color));
                }
                DrawCommand::FillRect { rect: r, color } => {
                    painter.rect_filled(to_rect(r), 0.0, color32(*color));
                }
                DrawCommand::StrokeRect { rect: r, color, width } => {
                    painter.rect_stroke(to_rect(r), 0.0, Stroke::new(*width, color32(*color)));
                }
                DrawCommand::Line { from, to, color, width } => {
                    painter.line_segment([to_pos(from), to_pos(to)], Stroke::new(*width, color32(*color)));
                }
                DrawCommand::Image { image, dest, uv, transposed } => {
                    let Some(texture) = store.texture(ui.ctx(), image) else {
                        continue;
                    };
                    let dest = to_rect(dest);
                    let (u0, v0) = (uv.x as f32, uv.y as f32);
                    let (u1, v1) = (uv.right() as f32, uv.bottom() as f32);
                    // corner uvs: top-left, top-right, bottom-right, bottom-left
                    let uvs = if *transposed {
                        [(u0, v0), (u0, v1), (u1, v1), (u1, v0)]
                    } else {
                        [(u0, v0), (u1, v0), (u1, v1), (u0, v1)]
                    };
                    let corners = [
                        dest.left_top(),
                        dest.right_top(),
                        dest.right_bottom(),
                        dest.left_bottom(),
                    ];
                    let mut mesh = Mesh::with_texture(texture);
                    for (pos, (u, v)) in corners.into_iter().zip(uvs) {
                        mesh.vertices.push(Vertex {
                            pos,
                            uv: Pos2::new(u, v),
                            color: Color32::WHITE,
                        });
                    }
                    mesh.add_triangle(0, 1, 2);
                    mesh.add_triangle(0, 2, 3);
                    painter.add(Shape::mesh(mesh));
                }
                DrawCommand::Text { position, text, size, color } => {
                    painter.text(
                        to_pos(position),
                        egui::Align2::LEFT_TOP,
                        text,
                        FontId::monospace(*size),
                        color32(*color),
                    );
                }
            }
        }
    }
}

impl Widget for MosaicView<'_> {
    fn ui(mut self, ui: &mut Ui) -> Response {
        let desired = self.size.unwrap_or_else(|| ui.available_size());
        let (rect, response) = ui.allocate_exact_size(desired, Sense::click_and_drag());
        let now = Instant::now();

        self.viewer
            .set_container_size(Size::new(rect.width() as f64, rect.height() as f64));
        self.feed_input(ui, rect, &response, now);
        self.viewer.tick(now);

        // immediate mode: every egui frame repaints everything
        let mut ctx = RenderContext::new(rect.width() as u32, rect.height() as u32);
        self.viewer.compose(&mut ctx);

        let mut store: TextureStore = ui
            .ctx()
            .data_mut(|d| d.get_temp(self.id))
            .unwrap_or_default();
        self.paint(ui, rect, ctx.get_drawing_queue(), &mut store);

        let cache = self.viewer.loader().cache();
        store.textures.retain(|key, _| cache.contains(key));
        store.undecodable.retain(|key| cache.contains(key));
        ui.ctx().data_mut(|d| d.insert_temp(self.id, store));

        if self.viewer.is_busy() {
            ui.ctx().request_repaint();
        }
        response
    }
}
