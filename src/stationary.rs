use crate::geodesy;
use std::collections::VecDeque;

/// One raw fix as remembered by the stationary window
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowSample {
    pub lat: f64,
    pub lon: f64,
    pub accuracy: f64,
    pub timestamp: i64,
}

/// Stationary detection over the most recent accurate raw fixes
///
/// # Algorithm
/// 1. Fewer than `min_samples` in the window: not stationary
/// 2. Worst accuracy in the window above the nominal radius: not stationary
/// 3. Unweighted centroid of the raw coordinates
/// 4. Largest distance from any sample to the centroid
/// 5. Stationary iff that distance < max(nominal radius, current accuracy)
///
/// Only fixes that passed the accuracy test belong in the window; the
/// caller is responsible for that gate.
#[derive(Debug, Clone)]
pub struct StationaryDetector {
    window: VecDeque<WindowSample>,
    capacity: usize,
    min_samples: usize,
    radius_m: f64,
}

impl StationaryDetector {
    pub fn new(capacity: usize, min_samples: usize, radius_m: f64) -> Self {
        StationaryDetector {
            window: VecDeque::with_capacity(capacity),
            capacity,
            min_samples,
            radius_m,
        }
    }

    /// Add a sample, evicting the oldest once the window is full
    pub fn push(&mut self, sample: WindowSample) {
        if self.capacity == 0 {
            return;
        }
        while self.window.len() >= self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(sample);
    }

    /// Verdict for the current window given the accuracy of the fix being judged
    pub fn is_stationary(&self, current_accuracy: f64) -> bool {
        if self.window.len() < self.min_samples {
            return false;
        }

        let worst_accuracy = self
            .window
            .iter()
            .map(|s| s.accuracy)
            .fold(f64::NEG_INFINITY, f64::max);
        if worst_accuracy > self.radius_m {
            return false;
        }

        let Some(centroid) = self.centroid() else {
            return false;
        };

        let max_dist = self
            .window
            .iter()
            .map(|s| geodesy::distance(centroid, (s.lat, s.lon)))
            .fold(0.0, f64::max);

        let effective_radius = self.radius_m.max(current_accuracy);
        max_dist < effective_radius
    }

    /// Unweighted centroid `(lat, lon)` of the window
    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.window.is_empty() {
            return None;
        }
        let n = self.window.len() as f64;
        let (sum_lat, sum_lon) = self
            .window
            .iter()
            .fold((0.0, 0.0), |(a, b), s| (a + s.lat, b + s.lon));
        Some((sum_lat / n, sum_lon / n))
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::offset_meters;

    const ORIGIN: (f64, f64) = (44.787197, 17.191);

    fn sample_at(east_m: f64, north_m: f64, accuracy: f64, timestamp: i64) -> WindowSample {
        let (lat, lon) = offset_meters(ORIGIN, east_m, north_m);
        WindowSample {
            lat,
            lon,
            accuracy,
            timestamp,
        }
    }

    #[test]
    fn test_too_few_samples() {
        let mut detector = StationaryDetector::new(10, 5, 8.0);
        for i in 0..4 {
            detector.push(sample_at(0.0, 0.0, 5.0, i));
        }
        assert!(!detector.is_stationary(5.0));
    }

    #[test]
    fn test_identical_points_are_stationary() {
        let mut detector = StationaryDetector::new(10, 5, 8.0);
        for i in 0..5 {
            detector.push(sample_at(0.0, 0.0, 5.0, i));
        }
        assert!(detector.is_stationary(5.0));
    }

    #[test]
    fn test_jitter_within_radius_is_stationary() {
        let mut detector = StationaryDetector::new(10, 5, 8.0);
        let offsets = [(2.0, 1.0), (-1.5, 2.0), (0.5, -2.5), (-2.0, -1.0), (1.0, 1.5)];
        for (i, (e, n)) in offsets.iter().enumerate() {
            detector.push(sample_at(*e, *n, 4.0, i as i64));
        }
        assert!(detector.is_stationary(4.0));
    }

    #[test]
    fn test_single_outlier_breaks_stationary() {
        let mut detector = StationaryDetector::new(10, 5, 8.0);
        for i in 0..5 {
            detector.push(sample_at(0.0, 0.0, 5.0, i));
        }
        detector.push(sample_at(30.0, 0.0, 5.0, 5));
        // centroid shifts 5 m east, outlier sits 25 m from it
        assert!(!detector.is_stationary(5.0));
    }

    #[test]
    fn test_poor_accuracy_member_blocks_verdict() {
        let mut detector = StationaryDetector::new(10, 5, 8.0);
        for i in 0..4 {
            detector.push(sample_at(0.0, 0.0, 5.0, i));
        }
        detector.push(sample_at(0.0, 0.0, 12.0, 4));
        assert!(!detector.is_stationary(5.0));
    }

    #[test]
    fn test_radius_adapts_to_current_accuracy() {
        let mut detector = StationaryDetector::new(10, 5, 8.0);
        // spread of ±10 m east-west: max distance to centroid is 10 m
        for i in 0..6 {
            let east = if i % 2 == 0 { -10.0 } else { 10.0 };
            detector.push(sample_at(east, 0.0, 6.0, i));
        }
        assert!(!detector.is_stationary(6.0));
        assert!(detector.is_stationary(15.0));
    }

    #[test]
    fn test_window_evicts_oldest() {
        let mut detector = StationaryDetector::new(3, 2, 8.0);
        detector.push(sample_at(100.0, 0.0, 5.0, 0));
        for i in 1..4 {
            detector.push(sample_at(0.0, 0.0, 5.0, i));
        }
        assert_eq!(detector.len(), 3);
        // the far-away first sample is gone
        assert!(detector.is_stationary(5.0));
    }
}
