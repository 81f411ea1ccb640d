//! Piecewise-linear envelopes.

use serde::{Deserialize, Serialize};

/// Breakpoints `(x, level)` joined by straight lines.
///
/// Outside the first and last breakpoint the envelope holds the nearest level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    points: Vec<(f64, f64)>,
}

impl Envelope {
    /// Builds an envelope; points are sorted by x.
    pub fn from_points(points: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let mut points: Vec<(f64, f64)> = points.into_iter().collect();
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { points }
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn value_at(&self, x: f64) -> f64 {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return 0.0,
        };
        if x <= first.0 {
            return first.1;
        }
        if x >= last.0 {
            return last.1;
        }
        let upper = self.points.partition_point(|(px, _)| *px <= x);
        let (x0, y0) = self.points[upper - 1];
        let (x1, y1) = self.points[upper];
        if x1 == x0 {
            return y1;
        }
        y0 + (y1 - y0) * (x - x0) / (x1 - x0)
    }

    /// Mean level over the span of the envelope.
    pub fn average_level(&self) -> f64 {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return 0.0,
        };
        let span = last.0 - first.0;
        if span == 0.0 {
            return self.points.iter().map(|(_, y)| y).sum::<f64>() / self.points.len() as f64;
        }
        let integral: f64 = self
            .points
            .windows(2)
            .map(|w| (w[1].0 - w[0].0) * (w[0].1 + w[1].1) / 2.0)
            .sum();
        integral / span
    }
}

/// Flat response at 80 dB: the loudspeaker is assumed to be neutral.
impl Default for Envelope {
    fn default() -> Self {
        Self::from_points([(0.0, 80.0), (2000.0, 80.0)])
    }
}
