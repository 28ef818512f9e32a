use crate::core::{
    bounds::Rect,
    constants::MAX_SCALE,
    geo::{Point, Size},
};
use serde::{Deserialize, Serialize};

/// Pan/zoom transform: `screen = world * scale + (x, y)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportTransform {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
        }
    }
}

impl ViewportTransform {
    pub fn new(x: f64, y: f64, scale: f64) -> Self {
        Self { x, y, scale }
    }

    pub fn world_to_screen(&self, world: Point) -> Point {
        Point::new(world.x * self.scale + self.x, world.y * self.scale + self.y)
    }

    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point::new((screen.x - self.x) / self.scale, (screen.y - self.y) / self.scale)
    }

    pub fn world_rect_to_screen(&self, rect: &Rect) -> Rect {
        Rect::new(
            rect.x * self.scale + self.x,
            rect.y * self.scale + self.y,
            rect.width * self.scale,
            rect.height * self.scale,
        )
    }

    /// World rectangle visible in a container, grown by `margin` screen pixels
    pub fn visible_world_rect(&self, container: Size, margin: f64) -> Rect {
        if !(self.scale > 0.0) {
            return Rect::default();
        }
        let min = self.screen_to_world(Point::new(-margin, -margin));
        let max = self.screen_to_world(Point::new(
            container.width + margin,
            container.height + margin,
        ));
        Rect::from_corners(min, max)
    }
}

/// Scale range that lets the whole mosaic fit the container and caps at 1:1.
///
/// Degenerate sizes yield `(MAX_SCALE, MAX_SCALE)`. A mosaic smaller than the
/// container gets `min == max`.
pub fn compute_scale_bounds(container: Size, mosaic: Size) -> (f64, f64) {
    if container.is_degenerate() || mosaic.is_degenerate() {
        return (MAX_SCALE, MAX_SCALE);
    }
    let fit = (container.width / mosaic.width).min(container.height / mosaic.height);
    (fit.min(MAX_SCALE), MAX_SCALE)
}

/// Owns the viewport transform and enforces the scale bounds
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportController {
    transform: ViewportTransform,
    container: Size,
    mosaic: Size,
    min_scale: f64,
    max_scale: f64,
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewportController {
    pub fn new() -> Self {
        Self {
            transform: ViewportTransform::default(),
            container: Size::default(),
            mosaic: Size::default(),
            min_scale: MAX_SCALE,
            max_scale: MAX_SCALE,
        }
    }

    pub fn transform(&self) -> ViewportTransform {
        self.transform
    }

    pub fn container_size(&self) -> Size {
        self.container
    }

    pub fn mosaic_size(&self) -> Size {
        self.mosaic
    }

    pub fn scale_bounds(&self) -> (f64, f64) {
        (self.min_scale, self.max_scale)
    }

    /// Resize the container; the transform is re-clamped around its centre
    pub fn set_container_size(&mut self, size: Size) {
        if self.container == size {
            return;
        }
        self.container = size;
        self.recompute_bounds();
    }

    /// Replace the mosaic (layout world) size
    pub fn set_mosaic_size(&mut self, size: Size) {
        if self.mosaic == size {
            return;
        }
        self.mosaic = size;
        self.recompute_bounds();
    }

    fn recompute_bounds(&mut self) {
        let (min, max) = compute_scale_bounds(self.container, self.mosaic);
        self.min_scale = min;
        self.max_scale = max;
        let scale = self.transform.scale;
        if scale < min || scale > max || !scale.is_finite() {
            self.zoom_around(self.container.center(), scale);
        }
    }

    fn clamp_scale(&self, scale: f64) -> f64 {
        if scale.is_nan() {
            return self.min_scale;
        }
        scale.clamp(self.min_scale, self.max_scale)
    }

    /// Replace the transform, clamping its scale
    pub fn set_transform(&mut self, transform: ViewportTransform) {
        self.transform = ViewportTransform {
            scale: self.clamp_scale(transform.scale),
            ..transform
        };
    }

    /// Centre the mosaic in the container at the current scale
    pub fn center(&mut self) {
        let s = self.transform.scale;
        self.transform.x = (self.container.width - self.mosaic.width * s) / 2.0;
        self.transform.y = (self.container.height - self.mosaic.height * s) / 2.0;
    }

    /// Zoom to `requested_scale` (clamped) keeping the world point under `anchor` fixed
    pub fn zoom_around(&mut self, anchor: Point, requested_scale: f64) {
        let new_scale = self.clamp_scale(requested_scale);
        let old = self.transform;
        let world = if old.scale > 0.0 && old.scale.is_finite() {
            old.screen_to_world(anchor)
        } else {
            anchor
        };
        self.transform = ViewportTransform {
            x: anchor.x - world.x * new_scale,
            y: anchor.y - world.y * new_scale,
            scale: new_scale,
        };
    }

    /// Multiply the current scale by `factor` around `anchor`
    pub fn zoom_by(&mut self, anchor: Point, factor: f64) {
        if factor.is_finite() && factor > 0.0 {
            self.zoom_around(anchor, self.transform.scale * factor);
        }
    }

    /// Translate by screen deltas, unclamped
    pub fn pan(&mut self, dx: f64, dy: f64) {
        if dx.is_finite() && dy.is_finite() {
            self.transform.x += dx;
            self.transform.y += dy;
        }
    }

    /// Show the whole mosaic: minimum scale, centred
    pub fn fit(&mut self) {
        self.transform.scale = self.min_scale;
        self.center();
    }

    pub fn reset_view(&mut self) {
        self.fit();
    }
}
