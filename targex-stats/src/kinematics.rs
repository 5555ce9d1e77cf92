//! Discrete velocity and acceleration profiles of a trajectory.

use nalgebra::{Point2, Vector2};

/// Location of the velocity maximum within a trajectory.
#[derive(Debug, Clone, Copy)]
pub struct PeakVelocity {
    pub magnitude: f64,
    /// Index of the sample at the end of the fastest interval.
    pub sample_index: usize,
}

/// Consecutive-difference velocity vectors. Each vector is stamped with the
/// timestamp of the interval's end sample.
pub fn velocity_series(
    timestamps: &[f64],
    points: &[Point2<f64>],
) -> (Vec<Vector2<f64>>, Vec<f64>) {
    let n = timestamps.len().min(points.len());
    let mut velocities = Vec::with_capacity(n.saturating_sub(1));
    let mut stamps = Vec::with_capacity(n.saturating_sub(1));
    for i in 0..n.saturating_sub(1) {
        let dt = timestamps[i + 1] - timestamps[i];
        velocities.push((points[i + 1] - points[i]) / dt);
        stamps.push(timestamps[i + 1]);
    }
    (velocities, stamps)
}

/// Maximum speed over the trajectory; `None` for fewer than two samples or
/// when no interval yields a finite speed.
pub fn peak_velocity(timestamps: &[f64], points: &[Point2<f64>]) -> Option<PeakVelocity> {
    let (velocities, _) = velocity_series(timestamps, points);
    let mut best: Option<PeakVelocity> = None;
    for (i, v) in velocities.iter().enumerate() {
        let magnitude = v.norm();
        if !magnitude.is_finite() {
            continue;
        }
        if best.map_or(true, |b| magnitude > b.magnitude) {
            best = Some(PeakVelocity {
                magnitude,
                sample_index: i + 1,
            });
        }
    }
    best
}

/// Maximum magnitude of the second discrete derivative; `None` for fewer
/// than three samples or no finite value.
pub fn peak_acceleration(timestamps: &[f64], points: &[Point2<f64>]) -> Option<f64> {
    let (velocities, stamps) = velocity_series(timestamps, points);
    let mut best: Option<f64> = None;
    for i in 0..velocities.len().saturating_sub(1) {
        let dt = stamps[i + 1] - stamps[i];
        let magnitude = ((velocities[i + 1] - velocities[i]) / dt).norm();
        if !magnitude.is_finite() {
            continue;
        }
        if best.map_or(true, |b| magnitude > b) {
            best = Some(magnitude);
        }
    }
    best
}
