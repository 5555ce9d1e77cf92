use nalgebra::{Point2, Vector2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;
use targex_core::{points_on_circle, TargetOrder, TrialConfig};
use targex_experiment::{ExperimentError, FrameScene, Frontend, RunOutcome, TargetState, TrialRunner};
use targex_timing::VirtualTimer;

const FRAME: Duration = Duration::from_millis(16);

/// How the scripted participant behaves each frame.
enum Drive {
    /// Never moves.
    Hold,
    /// Moves the pointer toward the hot target at the given speed per frame.
    TowardHot(f64),
    /// Moves the pointer toward a fixed point, ignoring the hot target.
    TowardPoint(Point2<f64>, f64),
    /// Deflects the joystick toward the hot target.
    JoystickTowardHot,
}

/// Deterministic stand-in for the renderer and the input devices: each
/// rendered frame advances the shared virtual clock by one frame interval
/// and steps the simulated participant.
struct ScriptedFrontend {
    timer: VirtualTimer,
    drive: Drive,
    pointer: Point2<f64>,
    displayed_cursor: Point2<f64>,
    hot_target: Option<Point2<f64>>,
    has_joystick: bool,
    cancel_after_frames: Option<usize>,
    frames: usize,
    tones_played: usize,
}

impl ScriptedFrontend {
    fn new(timer: VirtualTimer, drive: Drive) -> Self {
        Self {
            timer,
            drive,
            pointer: Point2::origin(),
            displayed_cursor: Point2::origin(),
            hot_target: None,
            has_joystick: false,
            cancel_after_frames: None,
            frames: 0,
            tones_played: 0,
        }
    }

    fn step_toward(from: Point2<f64>, to: Point2<f64>, speed: f64) -> Point2<f64> {
        let offset = to - from;
        let distance = offset.norm();
        if distance <= speed || distance == 0.0 {
            to
        } else {
            from + offset * (speed / distance)
        }
    }
}

impl Frontend for ScriptedFrontend {
    fn render_frame(&mut self, scene: &FrameScene) {
        self.frames += 1;
        self.timer.advance(FRAME);
        self.hot_target = scene
            .targets
            .iter()
            .find(|t| t.state == TargetState::Hot)
            .map(|t| t.position);
        if let Some(cursor) = scene.cursor {
            self.displayed_cursor = cursor;
        }
        match self.drive {
            Drive::Hold | Drive::JoystickTowardHot => {}
            Drive::TowardHot(speed) => {
                if let Some(target) = self.hot_target {
                    self.pointer = Self::step_toward(self.pointer, target, speed);
                }
            }
            Drive::TowardPoint(point, speed) => {
                self.pointer = Self::step_toward(self.pointer, point, speed);
            }
        }
    }

    fn poll_pointer(&mut self) -> Point2<f64> {
        self.pointer
    }

    fn poll_joystick(&mut self) -> Vector2<f64> {
        match (&self.drive, self.hot_target) {
            (Drive::JoystickTowardHot, Some(target)) => {
                let offset = target - self.displayed_cursor;
                if offset.norm() == 0.0 {
                    Vector2::zeros()
                } else {
                    offset.normalize()
                }
            }
            _ => Vector2::zeros(),
        }
    }

    fn joystick_present(&self) -> bool {
        self.has_joystick
    }

    fn poll_cancel_requested(&mut self) -> bool {
        self.cancel_after_frames
            .map_or(false, |after| self.frames >= after)
    }

    fn play_tone(&mut self, _duration_s: f64) {
        self.tones_played += 1;
    }

    fn surface_size(&self) -> (f64, f64) {
        (16.0 / 9.0, 1.0)
    }

    fn warp_pointer(&mut self, to: Point2<f64>) {
        self.pointer = to;
    }
}

fn runner(
    frontend: ScriptedFrontend,
    timer: VirtualTimer,
) -> TrialRunner<ScriptedFrontend, VirtualTimer, StdRng> {
    let mut settings = targex_experiment::RunnerSettings::default();
    settings.splash_duration = 0.0;
    TrialRunner::with_settings(frontend, timer, StdRng::seed_from_u64(7), settings)
}

fn base_config() -> TrialConfig {
    TrialConfig {
        num_targets: 8,
        target_radius: 0.03,
        target_distance: 0.4,
        central_target: false,
        pre_target_delay: 0.0,
        first_target_extra_delay: 0.0,
        inter_target_delay: 0.0,
        post_trial_delay: 0.0,
        post_block_delay: 0.0,
        ..TrialConfig::default()
    }
}

fn expect_completed(outcome: RunOutcome) -> targex_core::ExperimentResults {
    match outcome {
        RunOutcome::Completed(results) => results,
        RunOutcome::Cancelled => panic!("run was cancelled"),
    }
}

#[test]
fn clockwise_trial_visits_the_circle_in_order() {
    let timer = VirtualTimer::new();
    let frontend = ScriptedFrontend::new(timer.clone(), Drive::TowardHot(0.5));
    let mut runner = runner(frontend, timer);

    let results = expect_completed(runner.run(&[base_config()]).unwrap());
    assert_eq!(results.len(), 1);
    assert_eq!(results.condition_sequence(), &[0]);

    let visits = results.trials()[0].visits();
    assert_eq!(visits.len(), 8);
    let expected = points_on_circle(8, 0.4, false);
    for (index, visit) in visits.iter().enumerate() {
        assert_eq!(visit.target_index(), index);
        assert!(!visit.is_central());
        assert_eq!(visit.target_position(), expected[index]);
    }
}

#[test]
fn fast_acquisition_succeeds_on_every_visit() {
    let timer = VirtualTimer::new();
    let frontend = ScriptedFrontend::new(timer.clone(), Drive::TowardHot(1.0));
    let mut runner = runner(frontend, timer);

    let results = expect_completed(runner.run(&[base_config()]).unwrap());
    for visit in results.trials()[0].visits() {
        assert!(visit.success());
        assert!(visit.num_before_visible() <= visit.len());
        // One pre-onset frame, then a handful of acquisition frames.
        let frame_s = FRAME.as_secs_f64();
        let span = visit.timestamps().last().unwrap()
            - visit.timestamps()[visit.num_before_visible()];
        let frames = (visit.len() - visit.num_before_visible()) as f64;
        assert!((span - (frames - 1.0) * frame_s).abs() < 1e-9);
    }
}

#[test]
fn central_target_is_visited_between_outer_targets() {
    let timer = VirtualTimer::new();
    let frontend = ScriptedFrontend::new(timer.clone(), Drive::TowardHot(1.0));
    let mut runner = runner(frontend, timer);

    let config = TrialConfig {
        central_target: true,
        num_targets: 3,
        ..base_config()
    };
    let results = expect_completed(runner.run(&[config]).unwrap());
    let visits = results.trials()[0].visits();
    assert_eq!(visits.len(), 6);
    for pair in visits.chunks(2) {
        assert!(!pair[0].is_central());
        assert!(pair[1].is_central());
        assert_eq!(pair[0].target_index(), pair[1].target_index());
        assert_eq!(pair[1].target_position(), Point2::origin());
    }
}

#[test]
fn automove_skips_the_central_visit_and_recenters() {
    let timer = VirtualTimer::new();
    let frontend = ScriptedFrontend::new(timer.clone(), Drive::TowardHot(1.0));
    let mut runner = runner(frontend, timer);

    let config = TrialConfig {
        central_target: true,
        automove_cursor_to_center: true,
        num_targets: 4,
        ..base_config()
    };
    let results = expect_completed(runner.run(&[config]).unwrap());
    let visits = results.trials()[0].visits();
    assert_eq!(visits.len(), 4);
    assert!(visits.iter().all(|v| !v.is_central() && v.success()));
    // Every visit starts from the centre again: its first sample is at or
    // near the origin.
    for visit in &visits[1..] {
        assert!(visit.positions()[0].coords.norm() < 1e-9);
    }
}

#[test]
fn joystick_mode_integrates_to_the_target() {
    let timer = VirtualTimer::new();
    let mut frontend = ScriptedFrontend::new(timer.clone(), Drive::JoystickTowardHot);
    frontend.has_joystick = true;
    let mut runner = runner(frontend, timer);

    let config = TrialConfig {
        use_joystick: true,
        joystick_max_speed: 0.05,
        num_targets: 2,
        target_distance: 0.2,
        ..base_config()
    };
    let results = expect_completed(runner.run(&[config]).unwrap());
    for visit in results.trials()[0].visits() {
        assert!(visit.success());
    }
}

#[test]
fn joystick_requirement_fails_before_any_frame() {
    let timer = VirtualTimer::new();
    let frontend = ScriptedFrontend::new(timer.clone(), Drive::Hold);
    let mut runner = runner(frontend, timer);

    let config = TrialConfig {
        use_joystick: true,
        ..base_config()
    };
    let err = runner.run(&[config]).unwrap_err();
    assert_eq!(err, ExperimentError::JoystickMissing);
    assert_eq!(runner.frontend().frames, 0);
}

#[test]
fn empty_condition_list_is_rejected() {
    let timer = VirtualTimer::new();
    let frontend = ScriptedFrontend::new(timer.clone(), Drive::Hold);
    let mut runner = runner(frontend, timer);
    assert_eq!(runner.run(&[]).unwrap_err(), ExperimentError::NoConditions);
}

#[test]
fn condition_budget_skips_later_trials_but_keeps_earlier_ones() {
    let timer = VirtualTimer::new();
    let frontend = ScriptedFrontend::new(timer.clone(), Drive::TowardHot(0.5));
    let mut runner = runner(frontend, timer);

    let slow = TrialConfig {
        num_targets: 1,
        weight: 3,
        condition_timeout: 0.1,
        post_trial_delay: 0.1,
        ..base_config()
    };
    let unlimited = TrialConfig {
        num_targets: 1,
        weight: 2,
        ..base_config()
    };
    let results = expect_completed(runner.run(&[slow, unlimited]).unwrap());

    let of_condition = |index: usize| {
        results
            .trials()
            .iter()
            .filter(|t| t.condition_index() == index)
            .count()
    };
    // The first trial fits into the budget; the post-trial pause spends the
    // rest of it, so repetitions 1 and 2 are skipped entirely.
    assert_eq!(of_condition(0), 1);
    assert_eq!(of_condition(1), 2);
    assert_eq!(results.condition_sequence(), &[0, 0, 0, 1, 1]);
    assert!(results.trials()[0].visits()[0].success());
}

#[test]
fn budget_expiry_mid_trial_discards_the_whole_trial() {
    let timer = VirtualTimer::new();
    let frontend = ScriptedFrontend::new(timer.clone(), Drive::Hold);
    let mut runner = runner(frontend, timer);

    // A 60 ms budget: the first visit times out after ~46 ms, the second
    // trips the budget mid-flight, so the trial as a whole must be dropped.
    let config = TrialConfig {
        num_targets: 2,
        target_duration: 0.03,
        condition_timeout: 0.06,
        weight: 1,
        ..base_config()
    };
    let results = expect_completed(runner.run(&[config]).unwrap());
    assert!(results.is_empty());
    assert_eq!(results.condition_sequence(), &[0]);
}

#[test]
fn cancellation_mid_acquisition_discards_everything() {
    let timer = VirtualTimer::new();
    let mut frontend = ScriptedFrontend::new(timer.clone(), Drive::TowardHot(0.01));
    frontend.cancel_after_frames = Some(10);
    let mut runner = runner(frontend, timer);

    let outcome = runner.run(&[base_config()]).unwrap();
    assert!(matches!(outcome, RunOutcome::Cancelled));
}

#[test]
fn random_order_reshuffles_every_trial() {
    let timer = VirtualTimer::new();
    let frontend = ScriptedFrontend::new(timer.clone(), Drive::TowardHot(1.0));
    let mut runner = runner(frontend, timer);

    let config = TrialConfig {
        target_order: TargetOrder::Random,
        weight: 2,
        ..base_config()
    };
    let results = expect_completed(runner.run(&[config]).unwrap());
    assert_eq!(results.len(), 2);

    let order_of = |trial: &targex_core::TrialResult| -> Vec<usize> {
        trial.visits().iter().map(|v| v.target_index()).collect()
    };
    let first = order_of(&results.trials()[0]);
    let second = order_of(&results.trials()[1]);
    for order in [&first, &second] {
        let mut sorted = order.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..8).collect::<Vec<_>>());
    }
    assert_ne!(first, second);
}

#[test]
fn competing_target_ends_the_visit_when_not_ignored() {
    let wrong_target = points_on_circle(4, 0.4, false)[2];

    let timer = VirtualTimer::new();
    let frontend = ScriptedFrontend::new(timer.clone(), Drive::TowardPoint(wrong_target, 0.1));
    let mut runner = runner(frontend, timer);

    let config = TrialConfig {
        num_targets: 4,
        target_order: TargetOrder::Fixed,
        target_indices: vec![0],
        ignore_incorrect_targets: false,
        central_target: true,
        target_duration: 2.0,
        central_target_duration: 0.05,
        ..base_config()
    };
    let results = expect_completed(runner.run(&[config]).unwrap());
    let visit = &results.trials()[0].visits()[0];
    assert_eq!(visit.target_index(), 0);
    assert!(visit.success());
    let last = visit.positions().last().unwrap();
    assert!(nalgebra::distance(last, &wrong_target) <= 0.03 + 0.1);
}

#[test]
fn assigned_target_only_when_incorrect_targets_are_ignored() {
    let wrong_target = points_on_circle(4, 0.4, false)[2];

    let timer = VirtualTimer::new();
    let frontend = ScriptedFrontend::new(timer.clone(), Drive::TowardPoint(wrong_target, 0.1));
    let mut runner = runner(frontend, timer);

    let config = TrialConfig {
        num_targets: 4,
        target_order: TargetOrder::Fixed,
        target_indices: vec![0],
        ignore_incorrect_targets: true,
        target_duration: 0.2,
        ..base_config()
    };
    let results = expect_completed(runner.run(&[config]).unwrap());
    let visit = &results.trials()[0].visits()[0];
    assert!(!visit.success());
}

#[test]
fn fixed_intervals_follow_the_absolute_schedule() {
    let timer = VirtualTimer::new();
    let frontend = ScriptedFrontend::new(timer.clone(), Drive::TowardHot(1.0));
    let mut runner = runner(frontend, timer);

    let config = TrialConfig {
        num_targets: 3,
        fixed_target_intervals: true,
        pre_target_delay: 0.048,
        target_duration: 0.096,
        ..base_config()
    };
    let results = expect_completed(runner.run(&[config]).unwrap());
    let visits = results.trials()[0].visits();
    assert_eq!(visits.len(), 3);
    for (index, visit) in visits.iter().enumerate() {
        assert!(visit.success());
        // Onset samples line up with the per-visit slot ladder.
        let onset = visit.timestamps()[visit.num_before_visible()];
        let slot_start = (index as f64) * (0.048 + 0.096) + 0.048;
        assert!(onset >= slot_start - 1e-9, "visit {index} began at {onset}");
    }
}

#[test]
fn tone_plays_once_per_visit_when_enabled() {
    let timer = VirtualTimer::new();
    let frontend = ScriptedFrontend::new(timer.clone(), Drive::TowardHot(1.0));
    let mut runner = runner(frontend, timer);

    let config = TrialConfig {
        num_targets: 4,
        play_tone: true,
        ..base_config()
    };
    expect_completed(runner.run(&[config]).unwrap());
    assert_eq!(runner.frontend().tones_played, 4);
}
