//! Tunable parameters for the fix filter and walked-path reconstruction
//!
//! Every threshold is an independent constant; none is derived from another.
//! Files may name only the fields they override, the rest keep their defaults.

use crate::error::{TrailError, TrailResult};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Acceptance filter, stationary detector and smoother settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Minimum spacing between consecutive accepted points
    pub min_distance_meters: f64,
    /// Fixes with a worse (larger) accuracy radius are rejected
    pub max_accuracy_meters: f64,
    /// Minimum time between accepted points
    pub min_interval_seconds: f64,
    /// Implied speed above this is treated as a position jump
    pub max_speed_mps: f64,
    /// Warm-up period after session start during which nothing is accepted
    pub gps_settling_time_ms: i64,
    /// Capacity of the stationary detection window
    pub stationary_check_count: usize,
    /// Samples required before the detector gives a verdict
    pub stationary_min_samples: usize,
    /// Nominal stationary radius
    pub stationary_radius_meters: f64,
    /// EMA weight of each new raw coordinate
    pub smoothing_factor: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_distance_meters: 5.0,
            max_accuracy_meters: 40.0,
            min_interval_seconds: 2.0,
            max_speed_mps: 15.0, // on-foot survey
            gps_settling_time_ms: 3000,
            stationary_check_count: 10,
            stationary_min_samples: 5,
            stationary_radius_meters: 8.0,
            smoothing_factor: 0.3,
        }
    }
}

impl FilterConfig {
    /// Same thresholds with a different speed cap (e.g. cycling or vehicle surveys)
    pub fn with_max_speed(self, max_speed_mps: f64) -> Self {
        Self {
            max_speed_mps,
            ..self
        }
    }

    pub fn validate(&self) -> TrailResult<()> {
        require_positive("min_distance_meters", self.min_distance_meters)?;
        require_positive("max_accuracy_meters", self.max_accuracy_meters)?;
        require_positive("max_speed_mps", self.max_speed_mps)?;
        require_positive("stationary_radius_meters", self.stationary_radius_meters)?;

        if !(self.min_interval_seconds.is_finite() && self.min_interval_seconds >= 0.0) {
            return Err(invalid("min_interval_seconds must be >= 0"));
        }
        if self.gps_settling_time_ms < 0 {
            return Err(invalid("gps_settling_time_ms must be >= 0"));
        }
        if !(self.smoothing_factor > 0.0 && self.smoothing_factor <= 1.0) {
            return Err(invalid("smoothing_factor must be in (0, 1]"));
        }
        if self.stationary_check_count == 0 {
            return Err(invalid("stationary_check_count must be > 0"));
        }
        if self.stationary_min_samples == 0
            || self.stationary_min_samples > self.stationary_check_count
        {
            return Err(invalid(
                "stationary_min_samples must be in 1..=stationary_check_count",
            ));
        }
        Ok(())
    }
}

/// Walked-path reconstruction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Two trail points closer than this are adjacent
    pub connectivity_radius_meters: f64,
    /// Upper bound on segments in the decimated fallback path
    pub fallback_segments: usize,
    /// Search pops at most `iteration_factor × trail length` heap entries,
    /// stale ones included
    pub iteration_factor: usize,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            connectivity_radius_meters: 20.0,
            fallback_segments: 10,
            iteration_factor: 2,
        }
    }
}

impl PathConfig {
    pub fn validate(&self) -> TrailResult<()> {
        require_positive("connectivity_radius_meters", self.connectivity_radius_meters)?;
        if self.fallback_segments == 0 {
            return Err(invalid("fallback_segments must be > 0"));
        }
        if self.iteration_factor == 0 {
            return Err(invalid("iteration_factor must be > 0"));
        }
        Ok(())
    }
}

/// Complete configuration surface of the crate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailConfig {
    pub filter: FilterConfig,
    pub path: PathConfig,
}

impl TrailConfig {
    pub fn from_json_str(json: &str) -> TrailResult<Self> {
        let config: TrailConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> TrailResult<Self> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let config: TrailConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        log::info!("Loaded trail config from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn validate(&self) -> TrailResult<()> {
        let result = self.filter.validate().and_then(|_| self.path.validate());
        if let Err(ref e) = result {
            log::warn!("Rejected trail config: {}", e);
        }
        result
    }
}

fn require_positive(name: &str, value: f64) -> TrailResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(&format!("{} must be a positive number", name)))
    }
}

fn invalid(msg: &str) -> TrailError {
    TrailError::InvalidConfig(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = TrailConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.filter.min_distance_meters, 5.0);
        assert_eq!(config.filter.max_accuracy_meters, 40.0);
        assert_eq!(config.filter.stationary_check_count, 10);
        assert_eq!(config.path.connectivity_radius_meters, 20.0);
        assert_eq!(config.path.fallback_segments, 10);
    }

    #[test]
    fn test_partial_json_overrides() {
        let config = TrailConfig::from_json_str(
            r#"{ "filter": { "max_speed_mps": 40.0 }, "path": { "fallback_segments": 4 } }"#,
        )
        .unwrap();
        assert_eq!(config.filter.max_speed_mps, 40.0);
        assert_eq!(config.filter.min_interval_seconds, 2.0);
        assert_eq!(config.path.fallback_segments, 4);
        assert_eq!(config.path.connectivity_radius_meters, 20.0);
    }

    #[test]
    fn test_rejects_bad_smoothing_factor() {
        let err = TrailConfig::from_json_str(r#"{ "filter": { "smoothing_factor": 1.5 } }"#)
            .unwrap_err();
        assert!(matches!(err, TrailError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_min_samples_above_capacity() {
        let config = FilterConfig {
            stationary_check_count: 4,
            stationary_min_samples: 5,
            ..FilterConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_fallback_segments() {
        let config = PathConfig {
            fallback_segments: 0,
            ..PathConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_with_max_speed() {
        let config = FilterConfig::default().with_max_speed(100.0);
        assert_eq!(config.max_speed_mps, 100.0);
        assert_eq!(config.min_distance_meters, 5.0);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = TrailConfig::from_json_file("/nonexistent/trail_config.json").unwrap_err();
        assert!(matches!(err, TrailError::Io(_)));
    }
}
