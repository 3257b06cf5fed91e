//! Tracks sensor read failures and raises a one-shot alarm when they
//! persist.
//!
//! A single failed read is routine (the loop just skips that cycle), but a
//! sensor that stays unreadable means the fan is flying blind on a stale
//! duty. The watchdog separates the two.
//!
//! ```text
//!             failure               failing >= trip_after
//!  Healthy ──────────► Failing ──────────────────────► Tripped
//!   ▲                    │                               │
//!   │      success       │            success            │
//!   └────────────────────┴───────────────────────────────┘
//! ```
//!
//! [`record_failure`](SensorWatchdog::record_failure) returns
//! [`WatchdogStatus::Tripped`] exactly once per outage and
//! [`record_success`](SensorWatchdog::record_success) returns
//! [`WatchdogStatus::Recovered`] exactly once when it ends, so the loop can
//! log the edges without flooding.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogStatus {
    /// Last read succeeded and no outage was in progress.
    Healthy,

    /// Reads are failing, but not for long enough to alarm.
    Failing,

    /// Failures just outlasted `trip_after`. Returned once per outage.
    Tripped,

    /// Already tripped and still failing.
    StillFailing,

    /// A read succeeded after the watchdog had tripped. Returned once.
    Recovered,
}

#[derive(Debug)]
enum State {
    Healthy,
    Failing(Instant),
    Tripped,
}

#[derive(Debug)]
pub struct SensorWatchdog {
    trip_after: Duration,
    state: State,
    consecutive_failures: u32,
}

impl SensorWatchdog {
    pub fn new(trip_after: Duration) -> Self {
        Self {
            trip_after,
            state: State::Healthy,
            consecutive_failures: 0,
        }
    }

    /// Failed reads since the last successful one.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn record_failure(&mut self) -> WatchdogStatus {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);

        match self.state {
            State::Healthy => {
                self.state = State::Failing(Instant::now());
                WatchdogStatus::Failing
            }
            State::Failing(since) => {
                if since.elapsed() >= self.trip_after {
                    self.state = State::Tripped;
                    WatchdogStatus::Tripped
                } else {
                    WatchdogStatus::Failing
                }
            }
            State::Tripped => WatchdogStatus::StillFailing,
        }
    }

    pub fn record_success(&mut self) -> WatchdogStatus {
        self.consecutive_failures = 0;

        let status = match self.state {
            State::Tripped => WatchdogStatus::Recovered,
            State::Healthy | State::Failing(_) => WatchdogStatus::Healthy,
        };
        self.state = State::Healthy;
        status
    }
}
