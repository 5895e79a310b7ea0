//! Shared numeric helpers
//!
//! Distances, eye openness ratios, oscillation statistics and label entropy used by
//! several detectors.

use crate::types::Point2;

/// Horizontal spans shorter than this are treated as degenerate
const MIN_SPAN: f64 = 1e-6;

/// Euclidean distance between two points
pub fn distance(a: Point2, b: Point2) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

pub fn midpoint(a: Point2, b: Point2) -> Point2 {
    Point2::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
}

/// Mean of a set of points
pub fn centroid(points: &[Point2]) -> Option<Point2> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Some(Point2::new(sx / n, sy / n))
}

/// Eye aspect ratio over the six-point eyelid contour
///
/// Points are ordered `[corner, upper, upper, corner, lower, lower]`:
/// `(|p2 - p6| + |p3 - p5|) / (2 * |p1 - p4|)`
pub fn eye_aspect_ratio(p: &[Point2; 6]) -> f64 {
    let horizontal = distance(p[0], p[3]);
    if horizontal < MIN_SPAN {
        return 0.0;
    }
    let v1 = distance(p[1], p[5]);
    let v2 = distance(p[2], p[4]);
    (v1 + v2) / (2.0 * horizontal)
}

/// Position of `point` projected onto the segment `start -> end`, as a fraction of its length
///
/// Returns 0.5 (centered) for a degenerate segment.
pub fn projection_ratio(point: Point2, start: Point2, end: Point2) -> f64 {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq < MIN_SPAN * MIN_SPAN {
        return 0.5;
    }
    ((point.x - start.x) * dx + (point.y - start.y) * dy) / len_sq
}

/// Peak-to-peak amplitude
pub fn peak_to_peak(values: &[f64]) -> f64 {
    let mut iter = values.iter().copied();
    let Some(first) = iter.next() else {
        return 0.0;
    };
    let (min, max) = iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
    max - min
}

/// Count direction reversals in a scalar trace
///
/// Velocity samples with magnitude below `min_step` are ignored, so slow drift near
/// turning points neither creates nor hides a reversal.
pub fn count_reversals(values: &[f64], min_step: f64) -> u32 {
    let mut reversals = 0;
    let mut last_sign: Option<bool> = None;

    for pair in values.windows(2) {
        let velocity = pair[1] - pair[0];
        if velocity.abs() < min_step {
            continue;
        }
        let positive = velocity > 0.0;
        if let Some(prev) = last_sign {
            if prev != positive {
                reversals += 1;
            }
        }
        last_sign = Some(positive);
    }

    reversals
}

/// Net travel over the trace divided by its peak-to-peak amplitude
///
/// Near 0 for back-and-forth motion, near 1 for smooth directional drift.
pub fn drift_ratio(values: &[f64]) -> f64 {
    let amplitude = peak_to_peak(values);
    match (values.first(), values.last()) {
        (Some(first), Some(last)) if amplitude > 0.0 => (last - first).abs() / amplitude,
        _ => 0.0,
    }
}

/// Shannon entropy of a label histogram normalized by the maximum for the labels observed
///
/// A single observed label (or none) yields 0.
pub fn normalized_entropy<I>(counts: I) -> f64
where
    I: IntoIterator<Item = u32>,
{
    let counts: Vec<f64> = counts
        .into_iter()
        .filter(|&c| c > 0)
        .map(f64::from)
        .collect();
    if counts.len() < 2 {
        return 0.0;
    }

    let total: f64 = counts.iter().sum();
    let entropy: f64 = counts
        .iter()
        .map(|c| {
            let p = c / total;
            -p * p.log2()
        })
        .sum();
    let max_entropy = (counts.len() as f64).log2();

    (entropy / max_entropy).clamp(0.0, 1.0)
}

/// Events per minute over an effective duration, capped at `ceiling`
pub fn per_minute(count: u32, effective_duration_sec: f64, ceiling: f64) -> f64 {
    if effective_duration_sec <= 0.0 {
        return 0.0;
    }
    (f64::from(count) / effective_duration_sec * 60.0).min(ceiling)
}
