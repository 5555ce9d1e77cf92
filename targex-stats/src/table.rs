use crate::area::{closed_path_length, enclosed_area};
use crate::kinematics::{peak_acceleration, peak_velocity};
use crate::metrics::{
    first_movement_index, path_length, reaction_time, rmse, spatial_error, total_time,
};
use nalgebra::Point2;
use serde::Serialize;
use targex_core::{ExperimentResults, TargetVisitRecord, TrialResult};

/// Scalar metrics of one recorded path (to the outer target or back to the
/// centre).
#[derive(Debug, Clone, Serialize)]
pub struct PathStats {
    pub reaction_time: f64,
    pub movement_time: f64,
    pub total_time: f64,
    pub distance: f64,
    pub rmse: f64,
    pub spatial_error: f64,
    /// Stored success flag as 0.0/1.0 so it averages into a fraction.
    pub success: f64,
}

impl PathStats {
    fn from_visit(visit: &TargetVisitRecord) -> Self {
        let timestamps = visit.timestamps();
        let points = visit.positions();
        let baseline = visit.num_before_visible();
        let reaction = reaction_time(timestamps, points, baseline);
        let total = total_time(timestamps, baseline);
        Self {
            reaction_time: reaction,
            movement_time: total - reaction,
            total_time: total,
            distance: path_length(points),
            rmse: rmse(points, visit.target_position()),
            spatial_error: spatial_error(points, visit.target_position(), visit.target_radius()),
            success: if visit.success() { 1.0 } else { 0.0 },
        }
    }
}

/// One derived row: the metrics of one (trial, outer target) pair.
///
/// The joint columns are computed over the to-target and to-centre paths
/// concatenated in time order; the enclosed area closes that combined path
/// back to its start.
#[derive(Debug, Clone, Serialize)]
pub struct StatRow {
    pub trial_index: usize,
    pub condition_index: usize,
    pub repetition: usize,
    pub target_index: usize,
    pub to_target: PathStats,
    pub to_center: Option<PathStats>,
    pub peak_velocity: f64,
    pub peak_acceleration: f64,
    pub area: f64,
    pub normalized_area: f64,
    pub total_time_at_peak_velocity: f64,
    pub movement_time_at_peak_velocity: f64,
    pub distance_at_peak_velocity: f64,
    pub rmse_at_peak_velocity: f64,
}

impl StatRow {
    fn build(
        trial_index: usize,
        trial: &TrialResult,
        outer: &TargetVisitRecord,
        center: Option<&TargetVisitRecord>,
    ) -> Self {
        let mut timestamps: Vec<f64> = outer.timestamps().to_vec();
        let mut points: Vec<Point2<f64>> = outer.positions().to_vec();
        if let Some(center) = center {
            timestamps.extend_from_slice(center.timestamps());
            points.extend_from_slice(center.positions());
        }
        let baseline = outer.num_before_visible();

        let peak = peak_velocity(&timestamps, &points);
        let peak_accel = peak_acceleration(&timestamps, &points);

        let mut total_at_peak = f64::NAN;
        let mut movement_at_peak = f64::NAN;
        let mut distance_at_peak = f64::NAN;
        let mut rmse_at_peak = f64::NAN;
        if let Some(peak) = peak {
            let movement_start = first_movement_index(&points).unwrap_or(points.len() - 1);
            if peak.sample_index >= movement_start {
                let window = &points[movement_start..=peak.sample_index];
                total_at_peak = timestamps
                    .get(baseline)
                    .map_or(f64::NAN, |&onset| timestamps[peak.sample_index] - onset);
                movement_at_peak = timestamps[peak.sample_index] - timestamps[movement_start];
                distance_at_peak = path_length(window);
                rmse_at_peak = rmse(window, outer.target_position());
            }
        }

        let area = enclosed_area(&points);
        let perimeter = closed_path_length(&points);
        let normalized_area = if perimeter > 0.0 {
            area / (perimeter * perimeter)
        } else {
            0.0
        };

        Self {
            trial_index,
            condition_index: trial.condition_index(),
            repetition: trial.repetition(),
            target_index: outer.target_index(),
            to_target: PathStats::from_visit(outer),
            to_center: center.map(PathStats::from_visit),
            peak_velocity: peak.map_or(f64::NAN, |p| p.magnitude),
            peak_acceleration: peak_accel.unwrap_or(f64::NAN),
            area,
            normalized_area,
            total_time_at_peak_velocity: total_at_peak,
            movement_time_at_peak_velocity: movement_at_peak,
            distance_at_peak_velocity: distance_at_peak,
            rmse_at_peak_velocity: rmse_at_peak,
        }
    }
}

/// Column-wise means over the rows in scope, NaN entries skipped.
#[derive(Debug, Clone, Serialize)]
pub struct StatAverages {
    pub to_target: PathStats,
    pub to_center: PathStats,
    pub peak_velocity: f64,
    pub peak_acceleration: f64,
    pub area: f64,
    pub normalized_area: f64,
    pub total_time_at_peak_velocity: f64,
    pub movement_time_at_peak_velocity: f64,
    pub distance_at_peak_velocity: f64,
    pub rmse_at_peak_velocity: f64,
    /// Fraction of trials in scope whose every outer target was reached.
    pub successful_trial_fraction: f64,
    /// Plain mean of the per-target success flags.
    pub successful_target_fraction: f64,
}

/// The derived statistics of a set of trials: one [`StatRow`] per
/// (trial, outer target) pair, recomputed on demand from the frozen records.
#[derive(Debug, Clone, Serialize)]
pub struct StatTable {
    rows: Vec<StatRow>,
}

impl StatTable {
    /// Rows for every trial of a run.
    pub fn from_results(results: &ExperimentResults) -> Self {
        let mut rows = Vec::new();
        for (trial_index, trial) in results.trials().iter().enumerate() {
            push_trial_rows(&mut rows, trial_index, trial);
        }
        Self { rows }
    }

    /// Rows for a single trial.
    pub fn from_trial(trial: &TrialResult, trial_index: usize) -> Self {
        let mut rows = Vec::new();
        push_trial_rows(&mut rows, trial_index, trial);
        Self { rows }
    }

    pub fn rows(&self) -> &[StatRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Mean of the per-outer-target success flags.
    pub fn successful_target_fraction(&self) -> f64 {
        nan_mean(self.rows.iter().map(|row| row.to_target.success))
    }

    /// Fraction of trials whose every in-scope outer target succeeded.
    pub fn successful_trial_fraction(&self) -> f64 {
        let mut trials: Vec<usize> = self.rows.iter().map(|row| row.trial_index).collect();
        trials.sort_unstable();
        trials.dedup();
        if trials.is_empty() {
            return f64::NAN;
        }
        let successful = trials
            .iter()
            .filter(|&&trial| {
                self.rows
                    .iter()
                    .filter(|row| row.trial_index == trial)
                    .all(|row| row.to_target.success == 1.0)
            })
            .count();
        successful as f64 / trials.len() as f64
    }

    /// The averages row over every row in the table.
    pub fn averages(&self) -> StatAverages {
        let target: Vec<&PathStats> = self.rows.iter().map(|row| &row.to_target).collect();
        let center: Vec<&PathStats> = self
            .rows
            .iter()
            .filter_map(|row| row.to_center.as_ref())
            .collect();
        StatAverages {
            to_target: mean_path_stats(&target),
            to_center: mean_path_stats(&center),
            peak_velocity: nan_mean(self.rows.iter().map(|r| r.peak_velocity)),
            peak_acceleration: nan_mean(self.rows.iter().map(|r| r.peak_acceleration)),
            area: nan_mean(self.rows.iter().map(|r| r.area)),
            normalized_area: nan_mean(self.rows.iter().map(|r| r.normalized_area)),
            total_time_at_peak_velocity: nan_mean(
                self.rows.iter().map(|r| r.total_time_at_peak_velocity),
            ),
            movement_time_at_peak_velocity: nan_mean(
                self.rows.iter().map(|r| r.movement_time_at_peak_velocity),
            ),
            distance_at_peak_velocity: nan_mean(
                self.rows.iter().map(|r| r.distance_at_peak_velocity),
            ),
            rmse_at_peak_velocity: nan_mean(self.rows.iter().map(|r| r.rmse_at_peak_velocity)),
            successful_trial_fraction: self.successful_trial_fraction(),
            successful_target_fraction: self.successful_target_fraction(),
        }
    }
}

/// Pairs each outer visit with the central visit that followed it, when one
/// was recorded.
fn push_trial_rows(rows: &mut Vec<StatRow>, trial_index: usize, trial: &TrialResult) {
    let visits = trial.visits();
    let mut i = 0;
    while i < visits.len() {
        let outer = &visits[i];
        if outer.is_central() {
            i += 1;
            continue;
        }
        let center = visits
            .get(i + 1)
            .filter(|v| v.is_central() && v.target_index() == outer.target_index());
        rows.push(StatRow::build(trial_index, trial, outer, center));
        i += if center.is_some() { 2 } else { 1 };
    }
}

fn nan_mean(values: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for value in values {
        if value.is_finite() {
            sum += value;
            count += 1;
        }
    }
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

fn mean_path_stats(stats: &[&PathStats]) -> PathStats {
    PathStats {
        reaction_time: nan_mean(stats.iter().map(|s| s.reaction_time)),
        movement_time: nan_mean(stats.iter().map(|s| s.movement_time)),
        total_time: nan_mean(stats.iter().map(|s| s.total_time)),
        distance: nan_mean(stats.iter().map(|s| s.distance)),
        rmse: nan_mean(stats.iter().map(|s| s.rmse)),
        spatial_error: nan_mean(stats.iter().map(|s| s.spatial_error)),
        success: nan_mean(stats.iter().map(|s| s.success)),
    }
}
