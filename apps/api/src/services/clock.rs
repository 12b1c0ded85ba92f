//! Follower-side clock synchronization
//!
//! Followers never read the host's player. They receive server-stamped
//! [`SyncReport`]s, project them onto the server's timeline using a clock
//! offset captured at connect, and only seek when the drift leaves the
//! deadband.
//!
//! The latency probe is independent of position compensation: the report's
//! server receipt time already accounts for relay delay.

use std::time::Duration;

use serde::Serialize;

use crate::models::{PlaybackState, SyncReport};

/// Drift (seconds) below which a follower leaves its position alone
pub const DEADBAND_SECS: f64 = 0.5;

/// How often a playing host reports its position
pub const HOST_REPORT_INTERVAL: Duration = Duration::from_secs(2);

/// How often a client sends an echo probe
pub const PROBE_INTERVAL: Duration = Duration::from_secs(5);

/// Round trips below this are [`LatencyQuality::Good`]
pub const GOOD_LATENCY_MS: i64 = 100;

/// Round trips below this (and not good) are [`LatencyQuality::Medium`]
pub const MEDIUM_LATENCY_MS: i64 = 200;

/// Difference between the server clock and the local clock, in ms
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClockOffset {
    offset_ms: i64,
}

impl ClockOffset {
    /// Capture the offset from the `server-time` greeting
    pub fn establish(server_time: i64, local_now: i64) -> Self {
        Self {
            offset_ms: server_time - local_now,
        }
    }

    pub fn offset_ms(&self) -> i64 {
        self.offset_ms
    }

    /// Local clock reading translated to the server's timeline
    pub fn estimated_server_now(&self, local_now: i64) -> i64 {
        local_now + self.offset_ms
    }
}

/// Where the host should be at `estimated_server_now`
///
/// While paused the reported position stands. A report that appears to come
/// from the future (skewed offset) is treated as zero elapsed time.
pub fn compensated_target(report: &SyncReport, estimated_server_now: i64) -> f64 {
    match report.state {
        PlaybackState::Playing => {
            let elapsed_ms = (estimated_server_now - report.server_time).max(0);
            report.position + elapsed_ms as f64 / 1000.0
        }
        PlaybackState::Paused => report.position,
    }
}

/// Opaque media player driven by a follower
pub trait Player {
    /// Current local position in seconds
    fn position(&self) -> f64;
    fn state(&self) -> PlaybackState;
    fn seek(&mut self, position: f64);
    fn play(&mut self);
    fn pause(&mut self);
}

/// What a follower did in response to one report
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncOutcome {
    pub target: f64,
    /// Local position minus target, measured before any seek
    pub drift: f64,
    pub seeked: bool,
    pub state_changed: bool,
}

/// Applies host reports to a local player
#[derive(Debug, Clone, Copy)]
pub struct Follower {
    offset: ClockOffset,
    deadband: f64,
}

impl Follower {
    pub fn new(offset: ClockOffset) -> Self {
        Self {
            offset,
            deadband: DEADBAND_SECS,
        }
    }

    pub fn with_deadband(mut self, deadband: f64) -> Self {
        self.deadband = deadband;
        self
    }

    pub fn offset(&self) -> ClockOffset {
        self.offset
    }

    /// Bring `player` in line with `report`
    ///
    /// State changes are applied unconditionally; the deadband only governs
    /// position corrections.
    pub fn apply_report<P: Player + ?Sized>(
        &self,
        player: &mut P,
        report: &SyncReport,
        local_now: i64,
    ) -> SyncOutcome {
        let target = compensated_target(report, self.offset.estimated_server_now(local_now));
        let drift = player.position() - target;

        let state_changed = player.state() != report.state;
        if state_changed {
            match report.state {
                PlaybackState::Playing => player.play(),
                PlaybackState::Paused => player.pause(),
            }
        }

        let seeked = drift.abs() > self.deadband;
        if seeked {
            player.seek(target);
        }

        SyncOutcome {
            target,
            drift,
            seeked,
            state_changed,
        }
    }
}

/// Coarse classification of a probe round trip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LatencyQuality {
    Good,
    Medium,
    Poor,
}

impl LatencyQuality {
    pub fn from_round_trip(round_trip_ms: i64) -> Self {
        if round_trip_ms < GOOD_LATENCY_MS {
            Self::Good
        } else if round_trip_ms < MEDIUM_LATENCY_MS {
            Self::Medium
        } else {
            Self::Poor
        }
    }
}

/// Whether `interval` has passed since `last` (always true before the first run)
fn elapsed_since(last: Option<i64>, local_now: i64, interval: Duration) -> bool {
    match last {
        Some(last) => local_now - last >= interval.as_millis() as i64,
        None => true,
    }
}

/// Paces a playing host's `sync-time` reports
#[derive(Debug, Clone, Copy)]
pub struct HostReporter {
    interval: Duration,
    last_report: Option<i64>,
}

impl Default for HostReporter {
    fn default() -> Self {
        Self {
            interval: HOST_REPORT_INTERVAL,
            last_report: None,
        }
    }
}

impl HostReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// True when a report should go out now; only ever while playing
    pub fn is_due(&self, state: PlaybackState, local_now: i64) -> bool {
        state.is_playing() && elapsed_since(self.last_report, local_now, self.interval)
    }

    pub fn record(&mut self, local_now: i64) {
        self.last_report = Some(local_now);
    }
}

/// Echo-based round-trip estimator
#[derive(Debug, Clone, Copy)]
pub struct LatencyProbe {
    interval: Duration,
    last_sent: Option<i64>,
    last_round_trip: Option<i64>,
}

impl Default for LatencyProbe {
    fn default() -> Self {
        Self {
            interval: PROBE_INTERVAL,
            last_sent: None,
            last_round_trip: None,
        }
    }
}

impl LatencyProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// True when the next `echo-probe` should be sent
    pub fn is_due(&self, local_now: i64) -> bool {
        elapsed_since(self.last_sent, local_now, self.interval)
    }

    /// Timestamp to place in an `echo-probe`
    pub fn request(&mut self, local_now: i64) -> i64 {
        self.last_sent = Some(local_now);
        local_now
    }

    /// Record the echo of `echoed` received at `local_now`
    pub fn round_trip(&mut self, echoed: i64, local_now: i64) -> i64 {
        let rtt = (local_now - echoed).max(0);
        self.last_round_trip = Some(rtt);
        rtt
    }

    pub fn last_round_trip(&self) -> Option<i64> {
        self.last_round_trip
    }

    /// Quality of the latest round trip, if any probe has completed
    pub fn quality(&self) -> Option<LatencyQuality> {
        self.last_round_trip.map(LatencyQuality::from_round_trip)
    }
}
