use serde::{Deserialize, Serialize};

/// Order in which the outer targets of a condition are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetOrder {
    Clockwise,
    AntiClockwise,
    Random,
    Fixed,
}

/// Immutable per-condition configuration.
///
/// Distances are in normalized height units (origin at screen centre, the
/// screen is one unit tall); durations are in seconds. Values coming from an
/// external source should pass through [`TrialConfig::from_partial`] or
/// [`TrialConfig::sanitized`], which enforce the invariants below instead of
/// trusting the producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialConfig {
    /// Number of outer targets on the circle. Always at least 1.
    pub num_targets: usize,
    pub target_radius: f64,
    pub target_distance: f64,
    pub central_target: bool,
    pub central_target_radius: f64,
    pub target_order: TargetOrder,
    /// Explicit visit sequence, honored only for [`TargetOrder::Fixed`].
    /// For every other order it is regenerated from `num_targets`.
    pub target_indices: Vec<usize>,
    pub target_duration: f64,
    pub central_target_duration: f64,
    pub pre_target_delay: f64,
    /// One-time addition to the pre-target delay of a condition's very first
    /// target.
    pub first_target_extra_delay: f64,
    pub inter_target_delay: f64,
    pub post_trial_delay: f64,
    pub post_block_delay: f64,
    /// Time budget for the whole condition; 0 means unlimited.
    pub condition_timeout: f64,
    /// Targets appear on an absolute schedule accumulated from trial start
    /// instead of delays relative to the previous acquisition.
    pub fixed_target_intervals: bool,
    pub rotation_degrees: f64,
    pub use_joystick: bool,
    /// Logical units the joystick can cover per frame at full deflection.
    pub joystick_max_speed: f64,
    pub freeze_cursor_between_targets: bool,
    pub automove_cursor_to_center: bool,
    pub ignore_incorrect_targets: bool,
    pub hide_target_when_reached: bool,
    pub play_tone: bool,
    pub tone_duration: f64,
    /// How many consecutive repetitions of this condition are run.
    pub weight: usize,
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            num_targets: 8,
            target_radius: 0.025,
            target_distance: 0.4,
            central_target: true,
            central_target_radius: 0.025,
            target_order: TargetOrder::Clockwise,
            target_indices: (0..8).collect(),
            target_duration: 5.0,
            central_target_duration: 5.0,
            pre_target_delay: 0.5,
            first_target_extra_delay: 1.0,
            inter_target_delay: 0.0,
            post_trial_delay: 0.0,
            post_block_delay: 10.0,
            condition_timeout: 0.0,
            fixed_target_intervals: false,
            rotation_degrees: 0.0,
            use_joystick: false,
            joystick_max_speed: 0.02,
            freeze_cursor_between_targets: false,
            automove_cursor_to_center: false,
            ignore_incorrect_targets: true,
            hide_target_when_reached: true,
            play_tone: false,
            tone_duration: 0.15,
            weight: 1,
        }
    }
}

impl TrialConfig {
    /// Returns a copy with every invariant enforced, logging a warning for
    /// each value that had to be coerced.
    pub fn sanitized(&self) -> Self {
        let mut config = self.clone();
        if config.num_targets == 0 {
            log::warn!("num_targets must be at least 1, raising from 0");
            config.num_targets = 1;
        }
        if config.weight == 0 {
            log::warn!("weight must be at least 1, raising from 0");
            config.weight = 1;
        }
        for (name, value) in [
            ("target_radius", &mut config.target_radius),
            ("target_distance", &mut config.target_distance),
            ("central_target_radius", &mut config.central_target_radius),
            ("target_duration", &mut config.target_duration),
            ("central_target_duration", &mut config.central_target_duration),
            ("pre_target_delay", &mut config.pre_target_delay),
            ("first_target_extra_delay", &mut config.first_target_extra_delay),
            ("inter_target_delay", &mut config.inter_target_delay),
            ("post_trial_delay", &mut config.post_trial_delay),
            ("post_block_delay", &mut config.post_block_delay),
            ("condition_timeout", &mut config.condition_timeout),
            ("joystick_max_speed", &mut config.joystick_max_speed),
            ("tone_duration", &mut config.tone_duration),
        ] {
            if !value.is_finite() || *value < 0.0 {
                log::warn!("{name} must be a non-negative number, clamping {value} to 0");
                *value = 0.0;
            }
        }

        if config.target_order == TargetOrder::Fixed {
            let before = config.target_indices.len();
            config.target_indices.retain(|&i| i < config.num_targets);
            if config.target_indices.len() < before {
                log::warn!(
                    "dropped {} fixed target indices outside 0..{}",
                    before - config.target_indices.len(),
                    config.num_targets
                );
            }
            if config.target_indices.is_empty() {
                log::warn!("fixed target order with no usable indices, falling back to 0..{}", config.num_targets);
                config.target_indices = (0..config.num_targets).collect();
            }
        } else {
            // Never user-supplied for non-fixed orders.
            config.target_indices = (0..config.num_targets).collect();
        }
        config
    }

    /// Boundary adapter: builds a config from a loosely-populated record,
    /// filling defaults for every absent field and then sanitizing.
    pub fn from_partial(partial: PartialTrialConfig) -> Self {
        let defaults = Self::default();
        let target_indices = match partial.target_indices.as_deref() {
            Some(raw) => parse_target_indices(raw),
            None => defaults.target_indices,
        };
        Self {
            num_targets: partial.num_targets.unwrap_or(defaults.num_targets),
            target_radius: partial.target_radius.unwrap_or(defaults.target_radius),
            target_distance: partial.target_distance.unwrap_or(defaults.target_distance),
            central_target: partial.central_target.unwrap_or(defaults.central_target),
            central_target_radius: partial
                .central_target_radius
                .unwrap_or(defaults.central_target_radius),
            target_order: partial.target_order.unwrap_or(defaults.target_order),
            target_indices,
            target_duration: partial.target_duration.unwrap_or(defaults.target_duration),
            central_target_duration: partial
                .central_target_duration
                .unwrap_or(defaults.central_target_duration),
            pre_target_delay: partial.pre_target_delay.unwrap_or(defaults.pre_target_delay),
            first_target_extra_delay: partial
                .first_target_extra_delay
                .unwrap_or(defaults.first_target_extra_delay),
            inter_target_delay: partial
                .inter_target_delay
                .unwrap_or(defaults.inter_target_delay),
            post_trial_delay: partial.post_trial_delay.unwrap_or(defaults.post_trial_delay),
            post_block_delay: partial.post_block_delay.unwrap_or(defaults.post_block_delay),
            condition_timeout: partial.condition_timeout.unwrap_or(defaults.condition_timeout),
            fixed_target_intervals: partial
                .fixed_target_intervals
                .unwrap_or(defaults.fixed_target_intervals),
            rotation_degrees: partial.rotation_degrees.unwrap_or(defaults.rotation_degrees),
            use_joystick: partial.use_joystick.unwrap_or(defaults.use_joystick),
            joystick_max_speed: partial
                .joystick_max_speed
                .unwrap_or(defaults.joystick_max_speed),
            freeze_cursor_between_targets: partial
                .freeze_cursor_between_targets
                .unwrap_or(defaults.freeze_cursor_between_targets),
            automove_cursor_to_center: partial
                .automove_cursor_to_center
                .unwrap_or(defaults.automove_cursor_to_center),
            ignore_incorrect_targets: partial
                .ignore_incorrect_targets
                .unwrap_or(defaults.ignore_incorrect_targets),
            hide_target_when_reached: partial
                .hide_target_when_reached
                .unwrap_or(defaults.hide_target_when_reached),
            play_tone: partial.play_tone.unwrap_or(defaults.play_tone),
            tone_duration: partial.tone_duration.unwrap_or(defaults.tone_duration),
            weight: partial.weight.unwrap_or(defaults.weight),
        }
        .sanitized()
    }
}

/// The same record with every field optional, as external condition files
/// supply it. Unknown fields are ignored rather than rejected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PartialTrialConfig {
    pub num_targets: Option<usize>,
    pub target_radius: Option<f64>,
    pub target_distance: Option<f64>,
    pub central_target: Option<bool>,
    pub central_target_radius: Option<f64>,
    pub target_order: Option<TargetOrder>,
    /// Whitespace- or comma-separated index list, e.g. `"0 3 1"`.
    pub target_indices: Option<String>,
    pub target_duration: Option<f64>,
    pub central_target_duration: Option<f64>,
    pub pre_target_delay: Option<f64>,
    pub first_target_extra_delay: Option<f64>,
    pub inter_target_delay: Option<f64>,
    pub post_trial_delay: Option<f64>,
    pub post_block_delay: Option<f64>,
    pub condition_timeout: Option<f64>,
    pub fixed_target_intervals: Option<bool>,
    pub rotation_degrees: Option<f64>,
    pub use_joystick: Option<bool>,
    pub joystick_max_speed: Option<f64>,
    pub freeze_cursor_between_targets: Option<bool>,
    pub automove_cursor_to_center: Option<bool>,
    pub ignore_incorrect_targets: Option<bool>,
    pub hide_target_when_reached: Option<bool>,
    pub play_tone: Option<bool>,
    pub tone_duration: Option<f64>,
    pub weight: Option<usize>,
}

fn parse_target_indices(raw: &str) -> Vec<usize> {
    let mut indices = Vec::new();
    for token in raw.split(|c: char| c.is_whitespace() || c == ',') {
        if token.is_empty() {
            continue;
        }
        match token.parse::<usize>() {
            Ok(index) => indices.push(index),
            Err(_) => log::warn!("ignoring unparsable target index {token:?}"),
        }
    }
    indices
}
