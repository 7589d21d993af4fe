use super::AcceptedPoint;
use crate::geodesy;
use geo::{BoundingRect, Coord, LineString, Rect};
use serde::{Deserialize, Serialize};

/// Append-only sequence of accepted points for one recording session
///
/// Timestamps are strictly increasing; `push` refuses anything else so the
/// invariant holds no matter who appends.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<AcceptedPoint>", into = "Vec<AcceptedPoint>")]
pub struct Trail {
    points: Vec<AcceptedPoint>,
}

impl Trail {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Rebuild a trail from stored points, dropping any that would break
    /// timestamp ordering.
    pub fn from_points(points: impl IntoIterator<Item = AcceptedPoint>) -> Self {
        let (trail, dropped) = Self::from_points_counted(points);
        if dropped > 0 {
            log::warn!(
                "Dropped {} out-of-order points while loading trail of {}",
                dropped,
                trail.len()
            );
        }
        trail
    }

    /// Like [`Trail::from_points`], also returning how many points were dropped
    pub fn from_points_counted(points: impl IntoIterator<Item = AcceptedPoint>) -> (Self, usize) {
        let mut trail = Trail::new();
        let mut dropped = 0usize;
        for point in points {
            if !trail.push(point) {
                dropped += 1;
            }
        }
        (trail, dropped)
    }

    /// Append a point; returns false (and leaves the trail untouched) if its
    /// timestamp does not advance past the last point.
    pub fn push(&mut self, point: AcceptedPoint) -> bool {
        if let Some(last) = self.points.last() {
            if point.timestamp <= last.timestamp {
                return false;
            }
        }
        self.points.push(point);
        true
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&AcceptedPoint> {
        self.points.get(index)
    }

    pub fn first(&self) -> Option<&AcceptedPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&AcceptedPoint> {
        self.points.last()
    }

    pub fn points(&self) -> &[AcceptedPoint] {
        &self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AcceptedPoint> {
        self.points.iter()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Walked length in meters, summed over consecutive points
    pub fn total_distance(&self) -> f64 {
        self.points
            .windows(2)
            .map(|pair| geodesy::distance(pair[0].position(), pair[1].position()))
            .sum()
    }

    pub fn to_line_string(&self) -> LineString<f64> {
        LineString::new(
            self.points
                .iter()
                .map(|p| Coord { x: p.lon, y: p.lat })
                .collect(),
        )
    }

    /// Bounding box of the trail (x = lon, y = lat); None when empty
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.to_line_string().bounding_rect()
    }
}

impl From<Vec<AcceptedPoint>> for Trail {
    fn from(points: Vec<AcceptedPoint>) -> Self {
        Trail::from_points(points)
    }
}

impl From<Trail> for Vec<AcceptedPoint> {
    fn from(trail: Trail) -> Self {
        trail.points
    }
}

impl<'a> IntoIterator for &'a Trail {
    type Item = &'a AcceptedPoint;
    type IntoIter = std::slice::Iter<'a, AcceptedPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
