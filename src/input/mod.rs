pub mod events;
pub mod gestures;

// Re-export the essential types
pub use events::InputEvent;
pub use gestures::{GestureAction, GestureConfig, GestureRecognizer};
