use std::time::{Duration, Instant};

/// Source of "now" for the render loop, swappable so tests can drive time.
pub trait Clock {
    fn now(&mut self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&mut self) -> Instant {
        Instant::now()
    }
}

/// Frame rate over the most recent complete window.
///
/// Counts frames until at least `window` has elapsed since the last boundary,
/// then reports `frames * 1000 / elapsed_ms` and starts a new window. Between
/// boundaries the previous value is kept.
pub struct RollingFps {
    window: Duration,
    window_start: Instant,
    frames: u32,
    fps: f64,
}

impl RollingFps {
    pub fn new(window: Duration, now: Instant) -> Self {
        Self {
            window,
            window_start: now,
            frames: 0,
            fps: 0.0,
        }
    }

    /// Counts one frame at `now`. Returns the new estimate when this frame
    /// closed a window.
    pub fn tick(&mut self, now: Instant) -> Option<f64> {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.window {
            return None;
        }

        let elapsed_ms = elapsed.as_millis().max(1) as f64;
        self.fps = f64::from(self.frames) * 1000.0 / elapsed_ms;
        self.frames = 0;
        self.window_start = now;
        Some(self.fps)
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    #[allow(dead_code)]
    pub fn pending_frames(&self) -> u32 {
        self.frames
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thirty_frames_in_one_second() {
        let start = Instant::now();
        let mut fps = RollingFps::new(Duration::from_millis(1000), start);
        for i in 1..30u64 {
            assert_eq!(fps.tick(start + Duration::from_millis(i * 33)), None);
        }
        assert_eq!(fps.tick(start + Duration::from_millis(1000)), Some(30.0));
        assert_eq!(fps.fps(), 30.0);
        assert_eq!(fps.pending_frames(), 0);
    }

    #[test]
    fn test_below_window_keeps_estimate_and_counter() {
        let start = Instant::now();
        let mut fps = RollingFps::new(Duration::from_millis(1000), start);
        for _ in 0..29 {
            fps.tick(start + Duration::from_millis(500));
        }
        let boundary = start + Duration::from_millis(1000);
        assert_eq!(fps.tick(boundary), Some(30.0));
        let previous = fps.fps();

        for i in 1..=15u64 {
            assert_eq!(fps.tick(boundary + Duration::from_millis(i * 33)), None);
        }
        assert_eq!(fps.tick(boundary + Duration::from_millis(500)), None);
        assert_eq!(fps.fps(), previous);
        assert_eq!(fps.pending_frames(), 16);
    }

    #[test]
    fn test_long_window_scales_down() {
        let start = Instant::now();
        let mut fps = RollingFps::new(Duration::from_millis(1000), start);
        for _ in 0..29 {
            fps.tick(start + Duration::from_millis(100));
        }
        assert_eq!(fps.tick(start + Duration::from_millis(2000)), Some(15.0));
    }
}
