use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// One acquisition attempt at one target within one trial.
///
/// Samples arrive strictly in time order, one per rendered frame, and only
/// through [`push_sample`](Self::push_sample), which keeps the timestamp and
/// position sequences the same length. `num_before_visible` counts the
/// samples recorded before the target lit up and anchors reaction-time
/// measurement; it never exceeds the sample count. The record is frozen once
/// the enclosing trial ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetVisitRecord {
    target_index: usize,
    is_central: bool,
    target_position: Point2<f64>,
    target_radius: f64,
    timestamps: Vec<f64>,
    positions: Vec<Point2<f64>>,
    num_before_visible: usize,
    success: bool,
}

impl TargetVisitRecord {
    pub fn new(
        target_index: usize,
        is_central: bool,
        target_position: Point2<f64>,
        target_radius: f64,
    ) -> Self {
        Self {
            target_index,
            is_central,
            target_position,
            target_radius,
            timestamps: Vec::new(),
            positions: Vec::new(),
            num_before_visible: 0,
            success: false,
        }
    }

    /// Appends one `(seconds-from-trial-start, position)` sample.
    pub fn push_sample(&mut self, timestamp: f64, position: Point2<f64>) {
        self.timestamps.push(timestamp);
        self.positions.push(position);
    }

    /// Marks the moment the target became visible: every sample recorded so
    /// far belongs to the pre-onset baseline.
    pub fn mark_visible(&mut self) {
        self.num_before_visible = self.timestamps.len();
    }

    pub fn set_success(&mut self, success: bool) {
        self.success = success;
    }

    pub fn target_index(&self) -> usize {
        self.target_index
    }

    pub fn is_central(&self) -> bool {
        self.is_central
    }

    pub fn target_position(&self) -> Point2<f64> {
        self.target_position
    }

    pub fn target_radius(&self) -> f64 {
        self.target_radius
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    pub fn positions(&self) -> &[Point2<f64>] {
        &self.positions
    }

    pub fn num_before_visible(&self) -> usize {
        self.num_before_visible
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// All visit records of one execution of one condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialResult {
    condition_index: usize,
    repetition: usize,
    visits: Vec<TargetVisitRecord>,
}

impl TrialResult {
    pub fn new(condition_index: usize, repetition: usize) -> Self {
        Self {
            condition_index,
            repetition,
            visits: Vec::new(),
        }
    }

    pub fn push_visit(&mut self, visit: TargetVisitRecord) {
        self.visits.push(visit);
    }

    pub fn condition_index(&self) -> usize {
        self.condition_index
    }

    pub fn repetition(&self) -> usize {
        self.repetition
    }

    pub fn visits(&self) -> &[TargetVisitRecord] {
        &self.visits
    }
}

/// One full run of the experiment: every completed trial in execution order,
/// plus the planned condition sequence (trial slot -> condition index). The
/// trial list can be shorter than the plan when a condition's time budget
/// expired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentResults {
    condition_sequence: Vec<usize>,
    trials: Vec<TrialResult>,
}

impl ExperimentResults {
    pub fn new(condition_sequence: Vec<usize>) -> Self {
        Self {
            condition_sequence,
            trials: Vec::new(),
        }
    }

    pub fn push_trial(&mut self, trial: TrialResult) {
        self.trials.push(trial);
    }

    pub fn condition_sequence(&self) -> &[usize] {
        &self.condition_sequence
    }

    pub fn trials(&self) -> &[TrialResult] {
        &self.trials
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }
}
