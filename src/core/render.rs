use serde::Serialize;
use std::time::Duration;

use super::endpoints::FrameSink;
use super::fps::{Clock, RollingFps};
use super::pipeline::{Ready, RenderSide};
use super::shutdown::ShutdownReason;
use super::spin::SpinPolicy;
use crate::utils::logger;

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct RenderStats {
    pub rendered: u64,
    pub out_of_range: u64,
    pub sink_errors: u64,
    pub fps: f64,
}

pub struct RenderSettings {
    pub fps_window: Duration,
    pub spin: SpinPolicy,
    /// Stop after this many rendered frames.
    pub max_frames: Option<u64>,
}

/// Consumer-side loop: wait for a ready index, validate it, update FPS,
/// render, poll for quit. Runs on the thread that owns the sink.
pub struct RenderLoop<'a, F, K, C> {
    side: RenderSide<F>,
    sink: &'a mut K,
    clock: C,
    settings: RenderSettings,
    stats: RenderStats,
}

impl<'a, F, K: FrameSink<F>, C: Clock> RenderLoop<'a, F, K, C> {
    pub fn new(side: RenderSide<F>, sink: &'a mut K, clock: C, mut settings: RenderSettings) -> Self {
        settings.spin = settings.spin.resolve();
        Self {
            side,
            sink,
            clock,
            settings,
            stats: RenderStats::default(),
        }
    }

    pub fn run(&mut self) -> RenderStats {
        let mut fps = RollingFps::new(self.settings.fps_window, self.clock.now());
        let spin = self.settings.spin;

        while !self.side.shutdown().is_requested() {
            if !self.side.wait_ready(spin) {
                break;
            }

            let backlog = self.side.queued();
            let mut slot = match self.side.poll_ready() {
                Some(Ready::Frame(slot)) => slot,
                Some(Ready::OutOfRange(index)) => {
                    self.stats.out_of_range += 1;
                    logger::error(&format!("Discarding out-of-range slot index {}", index));
                    continue;
                }
                None => continue,
            };

            if let Some(value) = fps.tick(self.clock.now()) {
                logger::debug(&format!("FPS: {:.1} ({} queued)", value, backlog));
            }

            if let Err(e) = self.sink.render(slot.frame_mut(), fps.fps()) {
                self.stats.sink_errors += 1;
                logger::error(&format!("Render error on slot {}: {:#}", slot.index(), e));
            } else {
                self.stats.rendered += 1;
            }
            // Releases the slot back to the producer.
            drop(slot);

            match self.sink.poll_quit() {
                Ok(true) => self.side.shutdown().request(ShutdownReason::UserQuit),
                Ok(false) => {}
                Err(e) => {
                    self.stats.sink_errors += 1;
                    logger::error(&format!("Input poll error: {:#}", e));
                }
            }

            if let Some(limit) = self.settings.max_frames {
                if self.stats.rendered >= limit {
                    self.side.shutdown().request(ShutdownReason::FrameLimit);
                }
            }
        }

        self.stats.fps = fps.fps();
        self.stats
    }
}
