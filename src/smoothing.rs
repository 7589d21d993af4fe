/// Exponential moving average over raw fix coordinates
///
/// Damps high-frequency sensor jitter while still following real movement.
/// The first update seeds the estimate with the raw coordinate unchanged.
#[derive(Debug, Clone)]
pub struct PositionSmoother {
    alpha: f64,
    smoothed: Option<(f64, f64)>,
}

impl PositionSmoother {
    /// Create a new smoother with weight `alpha` for each new sample (typically 0.3)
    pub fn new(alpha: f64) -> Self {
        PositionSmoother {
            alpha,
            smoothed: None,
        }
    }

    /// Blend a raw coordinate into the estimate
    /// Returns the updated smoothed `(lat, lon)`
    pub fn update(&mut self, raw_lat: f64, raw_lon: f64) -> (f64, f64) {
        let next = match self.smoothed {
            None => (raw_lat, raw_lon),
            Some((lat, lon)) => (
                lat * (1.0 - self.alpha) + raw_lat * self.alpha,
                lon * (1.0 - self.alpha) + raw_lon * self.alpha,
            ),
        };
        self.smoothed = Some(next);
        next
    }

    /// Current estimate, None until the first update
    pub fn current(&self) -> Option<(f64, f64)> {
        self.smoothed
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn reset(&mut self) {
        self.smoothed = None;
    }
}
