pub mod trail;

pub use trail::Trail;

use serde::{Deserialize, Serialize};

/// One position reading as delivered by the location sensor
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawFix {
    pub lat: f64,
    pub lon: f64,
    /// Horizontal accuracy radius in meters; absent when the sensor did not report one
    #[serde(default)]
    pub accuracy: Option<f64>,
    /// Epoch milliseconds
    pub timestamp: i64,
}

impl RawFix {
    pub fn new(lat: f64, lon: f64, accuracy: Option<f64>, timestamp: i64) -> Self {
        Self {
            lat,
            lon,
            accuracy,
            timestamp,
        }
    }

    pub fn position(&self) -> (f64, f64) {
        (self.lat, self.lon)
    }

    pub fn has_finite_position(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

/// A fix that passed every filter stage, stored with smoothed coordinates
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AcceptedPoint {
    pub lat: f64,
    pub lon: f64,
    pub accuracy: f64,
    pub timestamp: i64,
}

impl AcceptedPoint {
    pub fn position(&self) -> (f64, f64) {
        (self.lat, self.lon)
    }

    /// geo uses (x = lon, y = lat)
    pub fn to_geo_point(&self) -> geo::Point<f64> {
        geo::Point::new(self.lon, self.lat)
    }
}
