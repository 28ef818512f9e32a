use crate::core::{bounds::Rect, geo::Point};
use crate::tiles::cache::TileImage;
use serde::{Deserialize, Serialize};

/// Straight (non-premultiplied) RGBA colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

/// Commands that can be issued to the render context
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(Color),
    FillRect {
        rect: Rect,
        color: Color,
    },
    StrokeRect {
        rect: Rect,
        color: Color,
        width: f32,
    },
    Line {
        from: Point,
        to: Point,
        color: Color,
        width: f32,
    },
    /// Part of a tile image stretched over `dest`
    Image {
        image: TileImage,
        dest: Rect,
        /// Normalized source region in image space
        uv: Rect,
        /// Screen x runs along image y (horizontal orientation)
        transposed: bool,
    },
    Text {
        position: Point,
        text: String,
        size: f32,
        color: Color,
    },
}

/// Screen-space command recorder for one frame
pub struct RenderContext {
    pub width: u32,
    pub height: u32,
    /// Drawing primitives queue, consumed by the host painter
    pub drawing_queue: Vec<DrawCommand>,
    /// Viewport clipping bounds in screen coordinates
    pub clip_bounds: Option<Rect>,
}

impl RenderContext {
    /// Create a new render context
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            drawing_queue: Vec::new(),
            clip_bounds: None,
        }
    }

    /// Begin a frame
    pub fn begin_frame(&mut self) {
        self.drawing_queue.clear();
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn clear(&mut self, color: Color) {
        self.drawing_queue.push(DrawCommand::Clear(color));
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        if self.is_visible(&rect) {
            self.drawing_queue.push(DrawCommand::FillRect { rect, color });
        }
    }

    pub fn stroke_rect(&mut self, rect: Rect, color: Color, width: f32) {
        let margin = width as f64;
        if self.is_visible(&rect.expand(margin)) {
            self.drawing_queue
                .push(DrawCommand::StrokeRect { rect, color, width });
        }
    }

    pub fn line(&mut self, from: Point, to: Point, color: Color, width: f32) {
        let bounds = Rect::from_corners(
            Point::new(from.x.min(to.x), from.y.min(to.y)),
            Point::new(from.x.max(to.x), from.y.max(to.y)),
        )
        .expand(width as f64);
        if self.is_visible(&bounds) {
            self.drawing_queue.push(DrawCommand::Line {
                from,
                to,
                color,
                width,
            });
        }
    }

    /// Queue a tile image; fully clipped images are dropped
    pub fn image(&mut self, image: TileImage, dest: Rect, uv: Rect, transposed: bool) {
        if self.is_visible(&dest) {
            self.drawing_queue.push(DrawCommand::Image {
                image,
                dest,
                uv,
                transposed,
            });
        }
    }

    pub fn text(&mut self, position: Point, text: impl Into<String>, size: f32, color: Color) {
        self.drawing_queue.push(DrawCommand::Text {
            position,
            text: text.into(),
            size,
            color,
        });
    }

    /// Get the current drawing queue
    pub fn get_drawing_queue(&self) -> &[DrawCommand] {
        &self.drawing_queue
    }

    /// Take the recorded commands, leaving the queue empty
    pub fn take_queue(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.drawing_queue)
    }

    /// Set viewport clipping bounds
    pub fn set_clip_bounds(&mut self, clip: Rect) {
        self.clip_bounds = Some(clip);
    }

    /// Clear clipping bounds
    pub fn clear_clip_bounds(&mut self) {
        self.clip_bounds = None;
    }

    fn is_visible(&self, rect: &Rect) -> bool {
        match &self.clip_bounds {
            Some(clip) => clip.intersection(rect).is_some(),
            None => true,
        }
    }
}
