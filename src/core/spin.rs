use crossbeam::utils::Backoff;
use serde::{Deserialize, Serialize};

/// How a loop waits while it has nothing to do (empty channel on the render
/// side, full channel under the `wait` overflow policy on the capture side).
///
/// `Busy` gives the lowest hand-off latency and keeps one core at 100% while
/// idle. `Backoff` spins with exponential backoff and then yields the time
/// slice. `Yield` yields on every turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SpinPolicy {
    #[default]
    Auto,
    Busy,
    Backoff,
    Yield,
}

impl SpinPolicy {
    /// `Auto` becomes `Busy` when there is a core to spare for each thread,
    /// `Yield` otherwise.
    pub fn resolve(self) -> SpinPolicy {
        match self {
            SpinPolicy::Auto if num_cpus::get() >= 2 => SpinPolicy::Busy,
            SpinPolicy::Auto => SpinPolicy::Yield,
            other => other,
        }
    }

    /// Starts a fresh wait. Create one per wait so backoff restarts from the
    /// shortest spin. Loops resolve `Auto` once up front; an unresolved
    /// `Auto` spins like `Busy`.
    pub fn waiter(self) -> SpinWait {
        SpinWait {
            policy: self,
            backoff: Backoff::new(),
        }
    }
}

pub struct SpinWait {
    policy: SpinPolicy,
    backoff: Backoff,
}

impl SpinWait {
    pub fn spin(&self) {
        match self.policy {
            SpinPolicy::Backoff => self.backoff.snooze(),
            SpinPolicy::Yield => std::thread::yield_now(),
            SpinPolicy::Busy | SpinPolicy::Auto => std::hint::spin_loop(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_resolves_to_concrete_policy() {
        let resolved = SpinPolicy::Auto.resolve();
        assert_ne!(resolved, SpinPolicy::Auto);
        assert_eq!(resolved.resolve(), resolved);
        assert_eq!(SpinPolicy::Backoff.resolve(), SpinPolicy::Backoff);
    }

    #[test]
    fn test_policy_parses_from_config_names() {
        let policy: SpinPolicy = serde_json::from_str("\"backoff\"").unwrap();
        assert_eq!(policy, SpinPolicy::Backoff);
    }

    #[test]
    fn test_waiters_return_promptly() {
        for policy in [SpinPolicy::Busy, SpinPolicy::Backoff, SpinPolicy::Yield] {
            let wait = policy.waiter();
            let start = std::time::Instant::now();
            for _ in 0..64 {
                wait.spin();
            }
            assert!(start.elapsed() < std::time::Duration::from_secs(1));
        }
    }
}
