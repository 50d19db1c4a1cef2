use anyhow::{ensure, Context, Result};
use std::time::{Duration, Instant};

/// Lateness beyond this many intervals drops the backlog instead of bursting.
const MAX_LAG_INTERVALS: u64 = 3;

/// What a call to [`FramePacer::pace`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    /// Slept until the deadline.
    OnTime,
    /// Deadline already passed, within the catch-up allowance.
    Late,
    /// Too far behind; the schedule restarted from now and `missed`
    /// intervals were skipped.
    Resynced { missed: u64 },
}

/// Holds a producer to a fixed frame interval, the way a camera hands out
/// frames.
pub struct FramePacer {
    interval: Duration,
    deadline: Instant,
    resyncs: u64,
}

impl FramePacer {
    /// Fails unless `fps` is a finite, positive rate with a representable
    /// interval.
    pub fn new(fps: f64) -> Result<Self> {
        ensure!(fps.is_finite() && fps > 0.0, "Frame rate must be positive (got {})", fps);
        let interval = Duration::try_from_secs_f64(1.0 / fps)
            .with_context(|| format!("Frame rate {} has no usable interval", fps))?;
        ensure!(!interval.is_zero(), "Frame rate {} is too high to pace", fps);

        Ok(Self {
            interval,
            deadline: Instant::now() + interval,
            resyncs: 0,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn resyncs(&self) -> u64 {
        self.resyncs
    }

    pub fn pace(&mut self) -> Pace {
        self.pace_at(Instant::now())
    }

    fn pace_at(&mut self, now: Instant) -> Pace {
        if now < self.deadline {
            std::thread::sleep(self.deadline - now);
            self.deadline += self.interval;
            return Pace::OnTime;
        }

        let missed = ((now - self.deadline).as_nanos() / self.interval.as_nanos()) as u64;
        if missed > MAX_LAG_INTERVALS {
            self.deadline = now + self.interval;
            self.resyncs += 1;
            Pace::Resynced { missed }
        } else {
            self.deadline += self.interval;
            Pace::Late
        }
    }
}
