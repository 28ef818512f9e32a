use crate::core::geo::{Point, Size};
use serde::{Deserialize, Serialize};

/// Raw pointer/wheel input in container (screen) coordinates
///
/// Mouse and touch both arrive as pointers; `id` distinguishes fingers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    PointerDown { id: u64, position: Point },
    PointerMove { id: u64, position: Point },
    PointerUp { id: u64, position: Point },
    /// Pointer lost (e.g. touch cancelled); never produces a tap
    PointerCancel { id: u64 },
    /// Scroll wheel; positive `delta_y` zooms out
    Wheel { delta_y: f64, position: Point },
    /// Container resize
    Resize { size: Size },
}

impl InputEvent {
    pub fn position(&self) -> Option<Point> {
        match self {
            InputEvent::PointerDown { position, .. }
            | InputEvent::PointerMove { position, .. }
            | InputEvent::PointerUp { position, .. }
            | InputEvent::Wheel { position, .. } => Some(*position),
            InputEvent::PointerCancel { .. } | InputEvent::Resize { .. } => None,
        }
    }
}
