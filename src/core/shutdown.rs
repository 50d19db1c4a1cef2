use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Why a run stopped. The first request wins and later ones are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownReason {
    Interrupt,
    UserQuit,
    FrameLimit,
}

const RUNNING: u8 = 0;

impl ShutdownReason {
    fn to_raw(self) -> u8 {
        match self {
            ShutdownReason::Interrupt => 1,
            ShutdownReason::UserQuit => 2,
            ShutdownReason::FrameLimit => 3,
        }
    }

    fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(ShutdownReason::Interrupt),
            2 => Some(ShutdownReason::UserQuit),
            3 => Some(ShutdownReason::FrameLimit),
            _ => None,
        }
    }
}

/// Cooperative stop flag shared by both loops and the interrupt handler.
///
/// Transitions once from running to stopped and never resets. Cloning shares
/// the same flag.
#[derive(Clone, Default)]
pub struct ShutdownSignal {
    state: Arc<AtomicU8>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests shutdown. Only a single atomic write, so it is fine to call
    /// from an interrupt handler concurrently with both loops.
    pub fn request(&self, reason: ShutdownReason) {
        let _ = self.state.compare_exchange(
            RUNNING,
            reason.to_raw(),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    pub fn is_requested(&self) -> bool {
        self.state.load(Ordering::Acquire) != RUNNING
    }

    pub fn reason(&self) -> Option<ShutdownReason> {
        ShutdownReason::from_raw(self.state.load(Ordering::Acquire))
    }
}

/// Routes Ctrl+C (and SIGTERM on unix) to `signal`. Can only be installed once
/// per process.
pub fn install_interrupt_handler(signal: &ShutdownSignal) -> Result<()> {
    let signal = signal.clone();
    ctrlc::set_handler(move || signal.request(ShutdownReason::Interrupt))
        .context("Failed to install interrupt handler")
}
