//! Multi-stage acceptance filter for raw position fixes
//!
//! Stages run in a fixed order and the first rejection wins:
//!
//! 1. Settling: nothing is accepted during the sensor warm-up window
//! 2. Staleness: out-of-order or duplicate timestamps
//! 3. Cadence: too little time since the last accepted point
//! 4. Accuracy: missing, zero or too large accuracy radius
//! 5. Speed: implied speed from the last accepted point is a jump
//! 6. Distance: too close to the last accepted point
//! 7. Stationary: recent raw fixes are only noise around one spot
//!
//! Distance runs before the stationary test so a real small movement is
//! recorded instead of being swallowed by the stationary classifier.

use crate::config::FilterConfig;
use crate::geodesy;
use crate::smoothing::PositionSmoother;
use crate::stationary::{StationaryDetector, WindowSample};
use crate::types::{AcceptedPoint, RawFix, Trail};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Why a fix was not added to the trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Non-finite coordinates or accuracy
    Invalid,
    Settling,
    Stale,
    TooSoon,
    PoorAccuracy,
    SpeedJump,
    TooClose,
    Stationary,
}

impl RejectReason {
    pub const ALL: [RejectReason; 8] = [
        RejectReason::Invalid,
        RejectReason::Settling,
        RejectReason::Stale,
        RejectReason::TooSoon,
        RejectReason::PoorAccuracy,
        RejectReason::SpeedJump,
        RejectReason::TooClose,
        RejectReason::Stationary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::Invalid => "invalid",
            RejectReason::Settling => "settling",
            RejectReason::Stale => "stale",
            RejectReason::TooSoon => "too_soon",
            RejectReason::PoorAccuracy => "poor_accuracy",
            RejectReason::SpeedJump => "speed_jump",
            RejectReason::TooClose => "too_close",
            RejectReason::Stationary => "stationary",
        }
    }
}

impl Display for RejectReason {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of feeding one fix through the filter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "detail", rename_all = "snake_case")]
pub enum FilterVerdict {
    Accepted(AcceptedPoint),
    Rejected(RejectReason),
}

impl FilterVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, FilterVerdict::Accepted(_))
    }

    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            FilterVerdict::Accepted(_) => None,
            FilterVerdict::Rejected(reason) => Some(*reason),
        }
    }
}

/// Filter history for one recording session
///
/// Mutated only by [`ingest`]; one instance per session.
#[derive(Debug, Clone)]
pub struct FilterState {
    last_accepted: Option<AcceptedPoint>,
    detector: StationaryDetector,
    smoother: PositionSmoother,
    session_start_ms: i64,
}

impl FilterState {
    pub fn new(config: &FilterConfig, session_start_ms: i64) -> Self {
        FilterState {
            last_accepted: None,
            detector: StationaryDetector::new(
                config.stationary_check_count,
                config.stationary_min_samples,
                config.stationary_radius_meters,
            ),
            smoother: PositionSmoother::new(config.smoothing_factor),
            session_start_ms,
        }
    }

    pub fn last_accepted(&self) -> Option<&AcceptedPoint> {
        self.last_accepted.as_ref()
    }

    /// Smoothed position estimate; keeps tracking while fixes are rejected
    pub fn current_position(&self) -> Option<(f64, f64)> {
        self.smoother.current()
    }

    pub fn session_start_ms(&self) -> i64 {
        self.session_start_ms
    }

    pub fn window_len(&self) -> usize {
        self.detector.len()
    }
}

/// Run one raw fix through every stage, appending to `trail` on acceptance.
///
/// The fix's own timestamp is "now" for the settling test, so replaying a
/// recorded log gives the same trail as the live run did.
pub fn ingest(
    state: &mut FilterState,
    trail: &mut Trail,
    config: &FilterConfig,
    fix: &RawFix,
) -> FilterVerdict {
    let verdict = evaluate(state, trail, config, fix);
    match verdict {
        FilterVerdict::Accepted(point) => log::debug!(
            "Accepted fix t={} ({:.6}, {:.6}) acc={:.1}m, trail now {} points",
            point.timestamp,
            point.lat,
            point.lon,
            point.accuracy,
            trail.len()
        ),
        FilterVerdict::Rejected(reason) => {
            log::debug!("Rejected fix t={}: {}", fix.timestamp, reason)
        }
    }
    verdict
}

fn evaluate(
    state: &mut FilterState,
    trail: &mut Trail,
    config: &FilterConfig,
    fix: &RawFix,
) -> FilterVerdict {
    let accuracy_is_finite = fix.accuracy.map_or(true, f64::is_finite);
    if !fix.has_finite_position() || !accuracy_is_finite {
        return FilterVerdict::Rejected(RejectReason::Invalid);
    }

    // 1. settling
    if state.last_accepted.is_none()
        && fix.timestamp - state.session_start_ms < config.gps_settling_time_ms
    {
        return FilterVerdict::Rejected(RejectReason::Settling);
    }

    let good_accuracy = fix
        .accuracy
        .filter(|acc| *acc > 0.0 && *acc <= config.max_accuracy_meters);

    if let Some(accuracy) = good_accuracy {
        state.detector.push(WindowSample {
            lat: fix.lat,
            lon: fix.lon,
            accuracy,
            timestamp: fix.timestamp,
        });
    }

    // 2. staleness
    if let Some(last) = state.last_accepted {
        if fix.timestamp <= last.timestamp {
            return FilterVerdict::Rejected(RejectReason::Stale);
        }
    }

    // 3. cadence
    if let Some(last) = state.last_accepted {
        let dt_secs = (fix.timestamp - last.timestamp) as f64 / 1000.0;
        if dt_secs < config.min_interval_seconds {
            state.smoother.update(fix.lat, fix.lon);
            return FilterVerdict::Rejected(RejectReason::TooSoon);
        }
    }

    // 4. accuracy
    let Some(accuracy) = good_accuracy else {
        return FilterVerdict::Rejected(RejectReason::PoorAccuracy);
    };

    // 5. speed / jump
    if let Some(last) = state.last_accepted {
        let dist = geodesy::distance(last.position(), fix.position());
        let dt_secs = (fix.timestamp - last.timestamp) as f64 / 1000.0;
        let speed = dist / dt_secs;
        if speed > config.max_speed_mps {
            log::debug!(
                "Position jump: {:.0}m in {:.1}s = {:.1} m/s",
                dist,
                dt_secs,
                speed
            );
            return FilterVerdict::Rejected(RejectReason::SpeedJump);
        }
    }

    // 6. distance
    if let Some(last) = state.last_accepted {
        if geodesy::distance(last.position(), fix.position()) < config.min_distance_meters {
            state.smoother.update(fix.lat, fix.lon);
            return FilterVerdict::Rejected(RejectReason::TooClose);
        }
    }

    // 7. stationary
    if state.detector.is_stationary(accuracy) {
        state.smoother.update(fix.lat, fix.lon);
        return FilterVerdict::Rejected(RejectReason::Stationary);
    }

    let (lat, lon) = state.smoother.update(fix.lat, fix.lon);
    let point = AcceptedPoint {
        lat,
        lon,
        accuracy,
        timestamp: fix.timestamp,
    };
    if !trail.push(point) {
        // trail was appended to outside this filter
        return FilterVerdict::Rejected(RejectReason::Stale);
    }
    state.last_accepted = Some(point);
    FilterVerdict::Accepted(point)
}

/// Per-reason tally of filter verdicts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerdictCounts {
    pub accepted: u64,
    pub invalid: u64,
    pub settling: u64,
    pub stale: u64,
    pub too_soon: u64,
    pub poor_accuracy: u64,
    pub speed_jump: u64,
    pub too_close: u64,
    pub stationary: u64,
}

impl VerdictCounts {
    pub fn record(&mut self, verdict: &FilterVerdict) {
        let slot = match verdict {
            FilterVerdict::Accepted(_) => &mut self.accepted,
            FilterVerdict::Rejected(RejectReason::Invalid) => &mut self.invalid,
            FilterVerdict::Rejected(RejectReason::Settling) => &mut self.settling,
            FilterVerdict::Rejected(RejectReason::Stale) => &mut self.stale,
            FilterVerdict::Rejected(RejectReason::TooSoon) => &mut self.too_soon,
            FilterVerdict::Rejected(RejectReason::PoorAccuracy) => &mut self.poor_accuracy,
            FilterVerdict::Rejected(RejectReason::SpeedJump) => &mut self.speed_jump,
            FilterVerdict::Rejected(RejectReason::TooClose) => &mut self.too_close,
            FilterVerdict::Rejected(RejectReason::Stationary) => &mut self.stationary,
        };
        *slot += 1;
    }

    /// Rejections recorded for one reason
    pub fn count(&self, reason: RejectReason) -> u64 {
        match reason {
            RejectReason::Invalid => self.invalid,
            RejectReason::Settling => self.settling,
            RejectReason::Stale => self.stale,
            RejectReason::TooSoon => self.too_soon,
            RejectReason::PoorAccuracy => self.poor_accuracy,
            RejectReason::SpeedJump => self.speed_jump,
            RejectReason::TooClose => self.too_close,
            RejectReason::Stationary => self.stationary,
        }
    }

    pub fn rejected(&self) -> u64 {
        RejectReason::ALL.iter().map(|r| self.count(*r)).sum()
    }

    pub fn total(&self) -> u64 {
        self.accepted + self.rejected()
    }
}
