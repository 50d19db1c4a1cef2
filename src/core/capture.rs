use serde::{Deserialize, Serialize};

use super::endpoints::FrameSource;
use super::pipeline::CaptureSide;
use super::spin::SpinPolicy;
use crate::utils::logger;

/// What the producer does when every slot is still queued for the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Keep pulling from the source into the scratch frame and throw the
    /// capture away, so a live camera never backs up.
    #[default]
    Drop,
    /// Stop pulling from the source until the consumer frees a slot.
    Wait,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CaptureStats {
    pub published: u64,
    pub dropped_full: u64,
    pub empty_frames: u64,
    pub source_errors: u64,
}

/// Producer-side loop: acquire into the cursor slot, validate, publish,
/// advance. Runs until shutdown is requested.
pub struct CaptureLoop<F, S> {
    side: CaptureSide<F>,
    source: S,
    overflow: OverflowPolicy,
    spin: SpinPolicy,
    stats: CaptureStats,
    empty_streak: u64,
    drop_streak: u64,
}

enum Acquired {
    Frame,
    Empty,
    Failed,
}

impl<F, S: FrameSource<F>> CaptureLoop<F, S> {
    pub fn new(side: CaptureSide<F>, source: S, overflow: OverflowPolicy, spin: SpinPolicy) -> Self {
        Self {
            side,
            source,
            overflow,
            spin: spin.resolve(),
            stats: CaptureStats::default(),
            empty_streak: 0,
            drop_streak: 0,
        }
    }

    #[allow(dead_code)]
    pub fn side(&self) -> &CaptureSide<F> {
        &self.side
    }

    pub fn stats(&self) -> CaptureStats {
        self.stats
    }

    pub fn run(&mut self) -> CaptureStats {
        logger::info(&format!(
            "Frame capture thread started ({} slots, overflow={:?})",
            self.side.pool_size(),
            self.overflow
        ));

        while !self.side.shutdown().is_requested() {
            self.step();
        }

        logger::info(&format!(
            "Frame capture thread finished: published={} dropped={} empty={} errors={}",
            self.stats.published,
            self.stats.dropped_full,
            self.stats.empty_frames,
            self.stats.source_errors
        ));
        self.stats
    }

    /// One iteration of the loop body.
    pub fn step(&mut self) {
        let acquired = match self.side.writable_slot() {
            Some(slot) => Self::acquire(&mut self.source, slot),
            None => {
                self.on_full();
                return;
            }
        };

        match acquired {
            Acquired::Frame => self.publish(),
            Acquired::Empty => self.on_empty(),
            Acquired::Failed => self.stats.source_errors += 1,
        }
    }

    fn acquire(source: &mut S, frame: &mut F) -> Acquired {
        match source.acquire_into(frame) {
            Ok(true) => Acquired::Frame,
            Ok(false) => Acquired::Empty,
            Err(e) => {
                logger::error(&format!("Frame source error, retrying: {:#}", e));
                Acquired::Failed
            }
        }
    }

    fn publish(&mut self) {
        self.end_empty_streak();
        self.end_drop_streak();
        match self.side.publish() {
            Ok(_) => self.stats.published += 1,
            Err(index) => {
                // The slot was free when acquired and only the consumer can
                // make room, so this is unexpected. Keep the cursor put.
                self.stats.dropped_full += 1;
                logger::warn(&format!("Index channel rejected slot {}, frame dropped", index));
            }
        }
    }

    fn on_full(&mut self) {
        match self.overflow {
            OverflowPolicy::Wait => {
                self.side.wait_writable(self.spin);
            }
            OverflowPolicy::Drop => {
                let acquired = Self::acquire(&mut self.source, self.side.scratch());
                match acquired {
                    Acquired::Frame => {
                        self.end_empty_streak();
                        self.stats.dropped_full += 1;
                        if self.drop_streak == 0 {
                            logger::warn(&format!(
                                "Index channel full, dropping newest frame (slot {} still queued)",
                                self.side.cursor()
                            ));
                        }
                        self.drop_streak += 1;
                    }
                    Acquired::Empty => self.on_empty(),
                    Acquired::Failed => self.stats.source_errors += 1,
                }
            }
        }
    }

    fn on_empty(&mut self) {
        self.stats.empty_frames += 1;
        if self.empty_streak == 0 {
            logger::warn("Empty frame captured, skipping...");
        }
        self.empty_streak += 1;
    }

    fn end_empty_streak(&mut self) {
        if self.empty_streak > 1 {
            logger::info(&format!("Source recovered after {} empty frames", self.empty_streak));
        }
        self.empty_streak = 0;
    }

    fn end_drop_streak(&mut self) {
        if self.drop_streak > 1 {
            logger::info(&format!("Consumer caught up after {} dropped frames", self.drop_streak));
        }
        self.drop_streak = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pipeline::{FramePipeline, Ready};
    use crate::core::shutdown::{ShutdownReason, ShutdownSignal};
    use anyhow::{anyhow, Result};
    use std::collections::VecDeque;

    /// Plays back a script of acquisition outcomes, then requests shutdown.
    struct ScriptedSource {
        script: VecDeque<Option<u32>>,
        calls: usize,
        shutdown: ShutdownSignal,
    }

    impl ScriptedSource {
        fn new(script: Vec<Option<u32>>, shutdown: &ShutdownSignal) -> Self {
            Self {
                script: script.into(),
                calls: 0,
                shutdown: shutdown.clone(),
            }
        }
    }

    impl FrameSource<u32> for ScriptedSource {
        fn acquire_into(&mut self, frame: &mut u32) -> Result<bool> {
            self.calls += 1;
            let outcome = self.script.pop_front();
            if self.script.is_empty() {
                self.shutdown.request(ShutdownReason::Interrupt);
            }
            match outcome {
                Some(Some(value)) => {
                    *frame = value;
                    Ok(true)
                }
                Some(None) => Ok(false),
                None => Err(anyhow!("script exhausted")),
            }
        }
    }

    fn pipeline(size: usize, shutdown: &ShutdownSignal) -> FramePipeline<u32> {
        FramePipeline::new(size, || 0, shutdown.clone()).unwrap()
    }

    #[test]
    fn test_empty_frames_do_not_advance_cursor() {
        let shutdown = ShutdownSignal::new();
        let FramePipeline { capture, mut render } = pipeline(4, &shutdown);
        let source = ScriptedSource::new(vec![None, None, None, Some(7)], &shutdown);

        let mut capture = CaptureLoop::new(capture, source, OverflowPolicy::Drop, SpinPolicy::Busy);
        let stats = capture.run();

        assert_eq!(capture.side().cursor(), 1);
        assert_eq!(stats.published, 1);
        assert_eq!(stats.empty_frames, 3);
        assert_eq!(render.queued(), 1);
        match render.poll_ready() {
            Some(Ready::Frame(slot)) => assert_eq!((slot.index(), *slot.frame()), (0, 7)),
            _ => panic!("expected slot 0"),
        };
    }

    #[test]
    fn test_source_errors_are_retried() {
        let shutdown = ShutdownSignal::new();
        let FramePipeline { capture, render } = pipeline(3, &shutdown);
        let source = ScriptedSource::new(vec![None, Some(5)], &shutdown);

        let mut capture = CaptureLoop::new(capture, source, OverflowPolicy::Drop, SpinPolicy::Busy);
        capture.step();
        capture.step();
        assert_eq!(capture.stats().empty_frames, 1);
        assert_eq!(capture.stats().published, 1);
        // Script is now empty: the next call errors and nothing moves.
        capture.step();
        assert_eq!(capture.stats().source_errors, 1);
        assert_eq!(capture.stats().published, 1);
        assert_eq!(capture.side().cursor(), 1);
        assert_eq!(render.queued(), 1);
    }

    #[test]
    fn test_full_channel_drops_into_scratch() {
        let shutdown = ShutdownSignal::new();
        let FramePipeline { capture, mut render } = pipeline(2, &shutdown);
        let source = ScriptedSource::new(vec![Some(1), Some(2), Some(3), Some(4)], &shutdown);

        let mut capture = CaptureLoop::new(capture, source, OverflowPolicy::Drop, SpinPolicy::Busy);
        let stats = capture.run();

        assert_eq!(stats.published, 2);
        assert_eq!(stats.dropped_full, 2);
        assert_eq!(capture.side().cursor(), 0);

        // Slots still hold the first two captures.
        for expected in [(0, 1), (1, 2)] {
            match render.poll_ready() {
                Some(Ready::Frame(slot)) => assert_eq!((slot.index(), *slot.frame()), expected),
                _ => panic!("expected a frame"),
            }
        }
    }

    #[test]
    fn test_wait_policy_leaves_source_alone_while_full() {
        let shutdown = ShutdownSignal::new();
        let FramePipeline { capture, render } = pipeline(2, &shutdown);
        let source = ScriptedSource::new(vec![Some(1), Some(2), Some(3), Some(4)], &shutdown);

        let mut capture = CaptureLoop::new(capture, source, OverflowPolicy::Wait, SpinPolicy::Yield);
        capture.step();
        capture.step();
        assert_eq!(render.queued(), 2);

        // Full: the waiter returns once shutdown is requested, without
        // pulling Some(3) from the source.
        shutdown.request(ShutdownReason::Interrupt);
        capture.step();
        assert_eq!(capture.source.calls, 2);
        assert_eq!(capture.stats().dropped_full, 0);
    }

    #[test]
    fn test_preset_shutdown_skips_source() {
        let shutdown = ShutdownSignal::new();
        shutdown.request(ShutdownReason::Interrupt);
        let FramePipeline { capture, .. } = pipeline(3, &shutdown);
        let source = ScriptedSource::new(vec![Some(1)], &shutdown);

        let mut capture = CaptureLoop::new(capture, source, OverflowPolicy::Drop, SpinPolicy::Busy);
        let stats = capture.run();
        assert_eq!(stats, CaptureStats::default());
        assert_eq!(capture.source.calls, 0);
    }

    #[test]
    fn test_auto_spin_is_resolved_once() {
        let shutdown = ShutdownSignal::new();
        let FramePipeline { capture, .. } = pipeline(2, &shutdown);
        let source = ScriptedSource::new(vec![Some(1)], &shutdown);

        let capture = CaptureLoop::new(capture, source, OverflowPolicy::Wait, SpinPolicy::Auto);
        assert_ne!(capture.spin, SpinPolicy::Auto);
    }
}
