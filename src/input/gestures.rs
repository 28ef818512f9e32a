use crate::{
    core::{config::InteractionConfig, geo::Point},
    input::events::InputEvent,
    prelude::{Duration, HashMap, Instant},
};

/// Viewport operation produced by a recognized gesture
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureAction {
    /// Translate by screen deltas
    Pan { dx: f64, dy: f64 },
    /// Multiply the scale by `factor` keeping `anchor` fixed
    ZoomAround { anchor: Point, factor: f64 },
    /// Short press/release without movement
    Tap { position: Point },
}

/// Configuration for gesture recognition
#[derive(Debug, Clone)]
pub struct GestureConfig {
    /// Minimum distance for drag to start
    pub drag_threshold: f64,
    /// Maximum time for tap gesture
    pub tap_timeout: Duration,
    /// Minimum distance change for pinch gesture
    pub pinch_threshold: f64,
    /// Wheel zoom factor is `exp(-delta_y * sensitivity)`
    pub wheel_zoom_sensitivity: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self::from(&InteractionConfig::default())
    }
}

impl From<&InteractionConfig> for GestureConfig {
    fn from(config: &InteractionConfig) -> Self {
        Self {
            drag_threshold: config.drag_threshold,
            tap_timeout: Duration::from_millis(config.tap_timeout_ms),
            pinch_threshold: config.pinch_threshold,
            wheel_zoom_sensitivity: config.wheel_zoom_sensitivity,
        }
    }
}

/// Pointer tracking information
#[derive(Debug, Clone)]
struct PointerInfo {
    start_position: Point,
    current_position: Point,
    start_time: Instant,
}

#[derive(Debug, Clone)]
struct PinchState {
    ids: (u64, u64),
    initial_distance: f64,
    last_distance: f64,
    last_midpoint: Point,
    zooming: bool,
}

/// Turns pointer and wheel events into pan, zoom and tap actions
///
/// One pointer drags; two pointers pinch (distance ratio zooms around the
/// midpoint, midpoint movement pans). A press released before the tap timeout
/// without crossing the drag threshold is a tap.
pub struct GestureRecognizer {
    pub enabled: bool,
    config: GestureConfig,
    pointers: HashMap<u64, PointerInfo>,
    pinch: Option<PinchState>,
    dragging: bool,
    tap_candidate: bool,
}

impl GestureRecognizer {
    pub fn new() -> Self {
        Self::with_config(GestureConfig::default())
    }

    pub fn with_config(config: GestureConfig) -> Self {
        Self {
            enabled: true,
            config,
            pointers: HashMap::default(),
            pinch: None,
            dragging: false,
            tap_candidate: false,
        }
    }

    /// Processes input events and returns recognized actions
    pub fn process(&mut self, event: InputEvent, now: Instant) -> Vec<GestureAction> {
        if !self.enabled {
            return Vec::new();
        }

        let mut actions = Vec::new();
        match event {
            InputEvent::PointerDown { id, position } => self.pointer_down(id, position, now),
            InputEvent::PointerMove { id, position } => {
                self.pointer_move(id, position, &mut actions)
            }
            InputEvent::PointerUp { id, position } => {
                self.pointer_move(id, position, &mut actions);
                self.pointer_up(id, now, true, &mut actions);
            }
            InputEvent::PointerCancel { id } => self.pointer_up(id, now, false, &mut actions),
            InputEvent::Wheel { delta_y, position } => {
                if delta_y.is_finite() && delta_y != 0.0 {
                    actions.push(GestureAction::ZoomAround {
                        anchor: position,
                        factor: (-delta_y * self.config.wheel_zoom_sensitivity).exp(),
                    });
                }
            }
            InputEvent::Resize { .. } => {}
        }
        actions
    }

    fn pointer_down(&mut self, id: u64, position: Point, now: Instant) {
        self.pointers.insert(
            id,
            PointerInfo {
                start_position: position,
                current_position: position,
                start_time: now,
            },
        );

        match self.pointers.len() {
            1 => {
                self.dragging = false;
                self.tap_candidate = true;
            }
            2 => {
                self.tap_candidate = false;
                self.dragging = false;
                self.start_pinch();
            }
            _ => {}
        }
    }

    fn start_pinch(&mut self) {
        let mut ids: Vec<u64> = self.pointers.keys().copied().collect();
        ids.sort_unstable();
        let (Some(&a), Some(&b)) = (ids.first(), ids.get(1)) else {
            return;
        };
        let (Some(pa), Some(pb)) = (self.pointers.get(&a), self.pointers.get(&b)) else {
            return;
        };
        let distance = pa.current_position.distance_to(&pb.current_position);
        self.pinch = Some(PinchState {
            ids: (a, b),
            initial_distance: distance,
            last_distance: distance,
            last_midpoint: pa.current_position.midpoint(&pb.current_position),
            zooming: false,
        });
    }

    fn pointer_move(&mut self, id: u64, position: Point, actions: &mut Vec<GestureAction>) {
        let Some(info) = self.pointers.get_mut(&id) else {
            return; // hover
        };
        let previous = info.current_position;
        info.current_position = position;
        let start = info.start_position;

        if let Some(pinch) = self.pinch.as_mut() {
            let (a, b) = pinch.ids;
            let (Some(pa), Some(pb)) = (self.pointers.get(&a), self.pointers.get(&b)) else {
                return;
            };
            let distance = pa.current_position.distance_to(&pb.current_position);
            let midpoint = pa.current_position.midpoint(&pb.current_position);

            let pan = midpoint.subtract(&pinch.last_midpoint);
            if pan.x != 0.0 || pan.y != 0.0 {
                actions.push(GestureAction::Pan { dx: pan.x, dy: pan.y });
            }
            pinch.last_midpoint = midpoint;

            if !pinch.zooming
                && (distance - pinch.initial_distance).abs() >= self.config.pinch_threshold
            {
                pinch.zooming = true;
            }
            if pinch.zooming && pinch.last_distance > 0.0 && distance > 0.0 {
                let factor = distance / pinch.last_distance;
                if factor != 1.0 {
                    actions.push(GestureAction::ZoomAround {
                        anchor: midpoint,
                        factor,
                    });
                }
                pinch.last_distance = distance;
            }
            return;
        }

        if self.pointers.len() != 1 {
            return;
        }
        if !self.dragging {
            if position.distance_to(&start) < self.config.drag_threshold {
                return;
            }
            self.dragging = true;
            self.tap_candidate = false;
            // catch up the movement swallowed by the threshold
            let delta = position.subtract(&start);
            actions.push(GestureAction::Pan { dx: delta.x, dy: delta.y });
            return;
        }
        let delta = position.subtract(&previous);
        if delta.x != 0.0 || delta.y != 0.0 {
            actions.push(GestureAction::Pan { dx: delta.x, dy: delta.y });
        }
    }

    fn pointer_up(&mut self, id: u64, now: Instant, released: bool, actions: &mut Vec<GestureAction>) {
        let Some(info) = self.pointers.remove(&id) else {
            return;
        };

        if self.pointers.is_empty() {
            if released
                && self.tap_candidate
                && !self.dragging
                && now.saturating_duration_since(info.start_time) <= self.config.tap_timeout
            {
                actions.push(GestureAction::Tap {
                    position: info.current_position,
                });
            }
            self.reset();
            return;
        }

        if let Some(pinch) = &self.pinch {
            if pinch.ids.0 == id || pinch.ids.1 == id {
                self.pinch = None;
                if self.pointers.len() >= 2 {
                    self.start_pinch();
                } else {
                    // remaining finger continues as a drag without jumping
                    for other in self.pointers.values_mut() {
                        other.start_position = other.current_position;
                    }
                    self.dragging = true;
                }
            }
        }
    }

    pub fn set_config(&mut self, config: GestureConfig) {
        self.config = config;
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// Active pointer count
    pub fn pointer_count(&self) -> usize {
        self.pointers.len()
    }

    pub fn is_pinching(&self) -> bool {
        self.pinch.is_some()
    }

    pub fn reset(&mut self) {
        self.pointers.clear();
        self.pinch = None;
        self.dragging = false;
        self.tap_candidate = false;
    }
}

impl Default for GestureRecognizer {
    fn default() -> Self {
        Self::new()
    }
}
