//! Consumer-side caching of the most recent throttle report.
//!
//! The report carries no staleness field. A host that keeps the latest report
//! around decides freshness from timestamp deltas against its own clock, in
//! milliseconds, using the same time base as the timestamps it observes.
//! Deltas use wrapping 32-bit arithmetic so a timestamp rollover is not
//! mistaken for a huge gap. A report stamped ahead of the host clock is
//! tolerated by at most `stale_after_ms`; anything further out is stale.
//! A sender whose timestamps jump backwards by more than `stale_after_ms`
//! is taken to have restarted and resynchronizes the monitor.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ThrottleError, ThrottleResult};
use crate::ids::THROTTLE_REPORT_PUBLISH_INTERVAL_MS;
use crate::report::{ThrottleReport, ThrottleReportMessage};

/// Deltas beyond half the timestamp range are read as "earlier", not "later".
const HALF_RANGE: u32 = u32::MAX / 2;

/// Report monitor configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Age in milliseconds after which the cached report is stale.
    pub stale_after_ms: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            stale_after_ms: THROTTLE_REPORT_PUBLISH_INTERVAL_MS,
        }
    }
}

impl MonitorConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ThrottleError::InvalidConfig`] if `stale_after_ms` is zero
    /// or so large that rollover could not be told apart from a gap.
    pub fn validate(&self) -> ThrottleResult<()> {
        if self.stale_after_ms == 0 {
            return Err(ThrottleError::InvalidConfig(
                "stale_after_ms must be greater than 0".to_string(),
            ));
        }
        if self.stale_after_ms >= HALF_RANGE {
            return Err(ThrottleError::InvalidConfig(format!(
                "stale_after_ms must be below {HALF_RANGE}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFreshness {
    /// No report has been observed yet.
    NoReport,
    Fresh { age_ms: u32 },
    Stale { age_ms: u32 },
}

impl ReportFreshness {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh { .. })
    }
}

/// Signed distance between two wrapping timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delta {
    /// `now` is this many milliseconds after `earlier`.
    Forward(u32),
    /// `now` is this many milliseconds before `earlier`.
    Backward(u32),
}

fn delta(earlier: u32, now: u32) -> Delta {
    let forward = now.wrapping_sub(earlier);
    if forward <= HALF_RANGE {
        Delta::Forward(forward)
    } else {
        Delta::Backward(earlier.wrapping_sub(now))
    }
}

/// Most recent report plus the bookkeeping needed to age it.
#[derive(Debug, Clone)]
pub struct ReportMonitor {
    config: MonitorConfig,
    latest: Option<ThrottleReportMessage>,
    received: u64,
    out_of_order: u64,
    restarts: u64,
}

impl ReportMonitor {
    /// # Errors
    ///
    /// Returns [`ThrottleError::InvalidConfig`] if `config` fails validation.
    pub fn new(config: MonitorConfig) -> ThrottleResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            latest: None,
            received: 0,
            out_of_order: 0,
            restarts: 0,
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Cache `message` unless it is a slightly older report than the one
    /// already held.
    ///
    /// A backwards jump beyond `stale_after_ms` is a sender restart: the
    /// message replaces the cached report and is counted as a restart.
    ///
    /// Returns `true` if the message replaced the cached report.
    pub fn observe(&mut self, message: ThrottleReportMessage) -> bool {
        if let Some(latest) = &self.latest {
            match delta(latest.timestamp, message.timestamp) {
                Delta::Forward(gap) if gap > self.config.stale_after_ms => {
                    debug!(gap_ms = gap, "throttle report stream resumed");
                }
                Delta::Forward(_) => {}
                Delta::Backward(back) if back <= self.config.stale_after_ms => {
                    self.out_of_order = self.out_of_order.saturating_add(1);
                    warn!(
                        cached = latest.timestamp,
                        received = message.timestamp,
                        "discarding out-of-order throttle report"
                    );
                    return false;
                }
                Delta::Backward(back) => {
                    self.restarts = self.restarts.saturating_add(1);
                    warn!(
                        cached = latest.timestamp,
                        received = message.timestamp,
                        jump_ms = back,
                        "throttle report timestamps jumped backwards, assuming sender restart"
                    );
                }
            }
        }
        self.latest = Some(message);
        self.received = self.received.saturating_add(1);
        true
    }

    pub fn freshness(&self, now_ms: u32) -> ReportFreshness {
        let Some(latest) = &self.latest else {
            return ReportFreshness::NoReport;
        };
        match delta(latest.timestamp, now_ms) {
            Delta::Forward(age_ms) if age_ms <= self.config.stale_after_ms => {
                ReportFreshness::Fresh { age_ms }
            }
            // Stamped slightly ahead of `now`: the sender's clock leads ours.
            Delta::Backward(skew) if skew <= self.config.stale_after_ms => {
                ReportFreshness::Fresh { age_ms: 0 }
            }
            Delta::Forward(_) | Delta::Backward(_) => ReportFreshness::Stale {
                age_ms: now_ms.wrapping_sub(latest.timestamp),
            },
        }
    }

    /// The cached report regardless of age.
    pub fn latest(&self) -> Option<&ThrottleReportMessage> {
        self.latest.as_ref()
    }

    /// The cached report only while it is fresh.
    pub fn latest_fresh(&self, now_ms: u32) -> Option<ThrottleReport> {
        match self.freshness(now_ms) {
            ReportFreshness::Fresh { .. } => self.latest.map(|msg| msg.data),
            ReportFreshness::NoReport | ReportFreshness::Stale { .. } => None,
        }
    }

    pub fn received_count(&self) -> u64 {
        self.received
    }

    pub fn out_of_order_count(&self) -> u64 {
        self.out_of_order
    }

    /// Number of backwards timestamp jumps taken as sender restarts.
    pub fn restart_count(&self) -> u64 {
        self.restarts
    }

    pub fn clear(&mut self) {
        self.latest = None;
    }
}

impl Default for ReportMonitor {
    fn default() -> Self {
        Self {
            config: MonitorConfig::default(),
            latest: None,
            received: 0,
            out_of_order: 0,
            restarts: 0,
        }
    }
}

/// Cloneable handle sharing one [`ReportMonitor`] across threads.
#[derive(Debug, Clone, Default)]
pub struct SharedReportMonitor {
    inner: Arc<RwLock<ReportMonitor>>,
}

impl SharedReportMonitor {
    /// # Errors
    ///
    /// Returns [`ThrottleError::InvalidConfig`] if `config` fails validation.
    pub fn new(config: MonitorConfig) -> ThrottleResult<Self> {
        Ok(Self {
            inner: Arc::new(RwLock::new(ReportMonitor::new(config)?)),
        })
    }

    pub fn observe(&self, message: ThrottleReportMessage) -> bool {
        self.inner.write().observe(message)
    }

    pub fn freshness(&self, now_ms: u32) -> ReportFreshness {
        self.inner.read().freshness(now_ms)
    }

    pub fn latest_fresh(&self, now_ms: u32) -> Option<ThrottleReport> {
        self.inner.read().latest_fresh(now_ms)
    }

    pub fn latest(&self) -> Option<ThrottleReportMessage> {
        self.inner.read().latest().copied()
    }

    pub fn received_count(&self) -> u64 {
        self.inner.read().received_count()
    }

    pub fn out_of_order_count(&self) -> u64 {
        self.inner.read().out_of_order_count()
    }

    pub fn restart_count(&self) -> u64 {
        self.inner.read().restart_count()
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }
}
