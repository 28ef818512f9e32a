pub mod context;
pub mod render_loop;
pub mod renderer;

#[cfg(feature = "egui")]
pub mod widget;

// Re-export main types
pub use context::{Color, DrawCommand, RenderContext};
pub use render_loop::{RenderLoop, RenderMode};
pub use renderer::{compose_frame, image_uv, FrameSnapshot, TileContent, TileDraw};
