use std::fmt;
use std::time::{Duration, Instant};

/// When a sending loop stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopCondition {
    /// Keep going until interrupted or a fatal error.
    #[default]
    Unbounded,
    /// Stop after this many iterations.
    Messages(u64),
    /// Stop once this much wall time has elapsed.
    Duration(Duration),
}

impl StopCondition {
    /// Start a clock that evaluates this condition.
    pub fn start(self) -> StopClock {
        StopClock {
            condition: self,
            started: Instant::now(),
            completed: 0,
        }
    }
}

impl fmt::Display for StopCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopCondition::Unbounded => f.write_str("until interrupted"),
            StopCondition::Messages(n) => write!(f, "{n} messages"),
            StopCondition::Duration(d) => write!(f, "for {} seconds", d.as_secs_f64()),
        }
    }
}

/// Tracks progress against a [`StopCondition`].
///
/// The condition is evaluated between iterations only. An iteration that
/// starts before a deadline runs to completion even if it ends after it.
#[derive(Debug)]
pub struct StopClock {
    condition: StopCondition,
    started: Instant,
    completed: u64,
}

impl StopClock {
    pub fn should_continue(&self) -> bool {
        match self.condition {
            StopCondition::Unbounded => true,
            StopCondition::Messages(limit) => self.completed < limit,
            StopCondition::Duration(limit) => self.started.elapsed() < limit,
        }
    }

    /// Count one finished iteration.
    pub fn record(&mut self) {
        self.completed += 1;
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
