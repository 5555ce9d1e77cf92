//! Scalar metrics over one recorded trajectory.
//!
//! Every function here is total: malformed or short trajectories produce
//! `NaN` (time-based metrics) or 0 (length-based metrics), never a panic.

use nalgebra::Point2;

/// Displacement from the first sample below this threshold does not count
/// as movement.
pub const MOVEMENT_EPSILON: f64 = 1e-12;

/// Polyline length of the trajectory; 0 for one sample or none.
pub fn path_length(points: &[Point2<f64>]) -> f64 {
    points
        .windows(2)
        .map(|pair| nalgebra::distance(&pair[0], &pair[1]))
        .sum()
}

/// Index of the first sample that diverges from the first sample by more
/// than [`MOVEMENT_EPSILON`]; `None` when the cursor never moved.
pub fn first_movement_index(points: &[Point2<f64>]) -> Option<usize> {
    let first = *points.first()?;
    points
        .iter()
        .position(|p| nalgebra::distance(p, &first) > MOVEMENT_EPSILON)
}

/// Time from target onset (the sample at `baseline`) to first movement.
///
/// Falls back to the last sample when motion is never detected, and may be
/// negative when the cursor was already moving before onset. `NaN` when
/// there is no sample at the baseline index.
pub fn reaction_time(timestamps: &[f64], points: &[Point2<f64>], baseline: usize) -> f64 {
    let Some(&onset) = timestamps.get(baseline) else {
        return f64::NAN;
    };
    let index = first_movement_index(points).unwrap_or(timestamps.len() - 1);
    timestamps[index] - onset
}

/// Time from target onset to the last sample; `NaN` without a baseline
/// sample.
pub fn total_time(timestamps: &[f64], baseline: usize) -> f64 {
    let Some(&onset) = timestamps.get(baseline) else {
        return f64::NAN;
    };
    match timestamps.last() {
        Some(&last) => last - onset,
        None => f64::NAN,
    }
}

/// Root-mean-square perpendicular deviation from the straight line between
/// the first sample and the target.
///
/// The first sample anchors the line and is excluded from the mean. `NaN`
/// for fewer than two samples or a zero-length line.
pub fn rmse(points: &[Point2<f64>], target: Point2<f64>) -> f64 {
    if points.len() <= 1 {
        return f64::NAN;
    }
    let origin = points[0];
    let line = target - origin;
    let length_sq = line.norm_squared();
    if length_sq == 0.0 {
        return f64::NAN;
    }
    let sum: f64 = points[1..]
        .iter()
        .map(|p| {
            let offset = p - origin;
            let cross = line.x * offset.y - line.y * offset.x;
            cross * cross
        })
        .sum();
    (sum / ((points.len() - 1) as f64 * length_sq)).sqrt()
}

/// How far outside the target circle the trajectory ended; 0 inside it and
/// 0 for an empty trajectory.
pub fn spatial_error(points: &[Point2<f64>], target: Point2<f64>, target_radius: f64) -> f64 {
    match points.last() {
        Some(last) => (nalgebra::distance(last, &target) - target_radius).max(0.0),
        None => 0.0,
    }
}
