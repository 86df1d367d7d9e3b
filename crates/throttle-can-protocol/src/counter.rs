//! Watchdog counter validation for successive throttle commands.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// How the `count` field of successive commands is expected to evolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterPolicy {
    /// The counter is unused.
    #[default]
    Ignore,
    /// Each command increments the counter by one, wrapping 255 to 0.
    Monotonic,
    /// Each command carries a value different from the previous one.
    Toggle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterCheck {
    /// First value seen since construction or reset.
    First,
    Ok,
    Violation { previous: u8, actual: u8 },
}

impl CounterCheck {
    pub fn is_violation(&self) -> bool {
        matches!(self, Self::Violation { .. })
    }
}

#[derive(Debug, Clone, Default)]
pub struct CounterChecker {
    policy: CounterPolicy,
    last: Option<u8>,
    violations: u64,
}

impl CounterChecker {
    pub fn new(policy: CounterPolicy) -> Self {
        Self {
            policy,
            last: None,
            violations: 0,
        }
    }

    pub fn policy(&self) -> CounterPolicy {
        self.policy
    }

    /// Record `count` and report whether it follows the previous value.
    pub fn check(&mut self, count: u8) -> CounterCheck {
        let Some(previous) = self.last.replace(count) else {
            return CounterCheck::First;
        };

        let valid = match self.policy {
            CounterPolicy::Ignore => true,
            CounterPolicy::Monotonic => count == previous.wrapping_add(1),
            CounterPolicy::Toggle => count != previous,
        };
        if valid {
            return CounterCheck::Ok;
        }

        self.violations = self.violations.saturating_add(1);
        warn!(
            policy = ?self.policy,
            previous,
            actual = count,
            "throttle command counter violation"
        );
        CounterCheck::Violation {
            previous,
            actual: count,
        }
    }

    pub fn violation_count(&self) -> u64 {
        self.violations
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}
