use crate::core::config::FrameTimingConfig;
use crate::prelude::{Duration, Instant};

/// When frames are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Every tick, rate-limited by the minimum frame interval
    Continuous,
    /// Only after something invalidated the last frame
    OnInvalidate,
}

/// Frame scheduling state driven by the host's animation callback
#[derive(Debug, Clone)]
pub struct RenderLoop {
    mode: RenderMode,
    min_frame_interval: Duration,
    dirty: bool,
    last_render_time: Option<Instant>,
    frame_count: u64,
}

impl RenderLoop {
    pub fn new(config: &FrameTimingConfig) -> Self {
        Self {
            mode: if config.continuous {
                RenderMode::Continuous
            } else {
                RenderMode::OnInvalidate
            },
            min_frame_interval: Duration::from_millis(config.min_frame_interval_ms),
            // first frame always draws
            dirty: true,
            last_render_time: None,
            frame_count: 0,
        }
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn set_config(&mut self, config: &FrameTimingConfig) {
        let dirty = self.dirty;
        *self = Self {
            dirty,
            last_render_time: self.last_render_time,
            frame_count: self.frame_count,
            ..Self::new(config)
        };
    }

    /// Mark the last frame stale
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn should_render(&self, now: Instant) -> bool {
        if self.mode == RenderMode::OnInvalidate && !self.dirty {
            return false;
        }
        match self.last_render_time {
            Some(last) => now.saturating_duration_since(last) >= self.min_frame_interval,
            None => true,
        }
    }

    pub fn mark_rendered(&mut self, now: Instant) {
        self.dirty = false;
        self.last_render_time = Some(now);
        self.frame_count += 1;
    }

    /// Frames drawn so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Default for RenderLoop {
    fn default() -> Self {
        Self::new(&FrameTimingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalidation_driven() {
        let mut rl = RenderLoop::new(&FrameTimingConfig {
            continuous: false,
            min_frame_interval_ms: 16,
        });
        let t0 = Instant::now();
        assert!(rl.should_render(t0));
        rl.mark_rendered(t0);
        assert!(!rl.should_render(t0 + Duration::from_millis(100)));

        rl.invalidate();
        // rate limited
        assert!(!rl.should_render(t0 + Duration::from_millis(5)));
        assert!(rl.should_render(t0 + Duration::from_millis(20)));
        assert_eq!(rl.frame_count(), 1);
    }

    #[test]
    fn test_continuous() {
        let mut rl = RenderLoop::new(&FrameTimingConfig {
            continuous: true,
            min_frame_interval_ms: 10,
        });
        let t0 = Instant::now();
        rl.mark_rendered(t0);
        assert!(!rl.is_dirty());
        assert!(rl.should_render(t0 + Duration::from_millis(10)));
        assert_eq!(rl.mode(), RenderMode::Continuous);
    }
}
