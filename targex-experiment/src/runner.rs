use crate::error::ExperimentError;
use crate::frontend::{FrameScene, Frontend, TargetSprite, TargetState};
use nalgebra::Point2;
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;
use targex_core::{
    points_on_circle, ExperimentResults, JoystickPointUpdater, PointRotator, TargetOrder,
    TargetVisitRecord, TrialConfig, TrialResult,
};
use targex_timing::Timer;

/// How a full run ended. Cancellation is a value, not an error: the
/// participant pressing the abort key unwinds the run and discards all
/// in-flight state.
#[derive(Debug)]
pub enum RunOutcome {
    Completed(ExperimentResults),
    Cancelled,
}

/// Runner-level settings that are not part of any condition.
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub splash_duration: f64,
    pub splash_message: String,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            splash_duration: 2.0,
            splash_message: "Get ready".to_string(),
        }
    }
}

/// Cancellation signal threaded through the phase handlers as an explicit
/// value; nothing in the runner unwinds via panics.
enum Flow<V> {
    Continue(V),
    Cancelled,
}

enum VisitEnd {
    Done,
    BudgetExpired,
}

enum TrialEnd {
    Completed(TrialResult),
    BudgetExpired,
}

/// Mutable state of one trial, owned by the runner for the trial's duration
/// and handed `&mut` to the waiting/acquiring phase handlers.
struct TrialContext<'a> {
    config: &'a TrialConfig,
    outer_targets: Vec<Point2<f64>>,
    result: TrialResult,
    reached: Vec<bool>,
    /// Trial start, runner-clock nanoseconds. Sample timestamps are seconds
    /// from this point.
    epoch_ns: u64,
    /// Start of the enclosing condition's time budget.
    condition_epoch_ns: u64,
    /// Absolute onset/deadline ladder for fixed target intervals, seconds
    /// from the trial epoch.
    schedule: f64,
    rotator: PointRotator,
    joystick: Option<JoystickPointUpdater>,
    cursor: Point2<f64>,
    /// Displayed cursor while frozen between targets; `None` means live.
    frozen: Option<Point2<f64>>,
    /// One-time extra pre-target delay, consumed by the first waiting phase.
    extra_delay: f64,
}

impl TrialContext<'_> {
    fn seconds_since_epoch(&self, now_ns: u64) -> f64 {
        now_ns.saturating_sub(self.epoch_ns) as f64 / 1e9
    }

    fn budget_expired(&self, now_ns: u64) -> bool {
        self.config.condition_timeout > 0.0
            && now_ns.saturating_sub(self.condition_epoch_ns) as f64 / 1e9
                > self.config.condition_timeout
    }

    /// Distance used for the acquisition test. With competing-target
    /// detection enabled (`ignore_incorrect_targets == false`) an outer
    /// visit measures against the nearest outer target; the central target
    /// is always excluded from that search.
    fn acquisition_distance(&self, target: Point2<f64>, is_central: bool) -> f64 {
        if !self.config.ignore_incorrect_targets && !is_central {
            self.outer_targets
                .iter()
                .map(|t| nalgebra::distance(t, &self.cursor))
                .fold(f64::INFINITY, f64::min)
        } else {
            nalgebra::distance(&target, &self.cursor)
        }
    }

    fn scene(&self, hot: Option<(usize, bool)>) -> FrameScene {
        let mut targets = Vec::with_capacity(self.outer_targets.len() + 1);
        for (index, &position) in self.outer_targets.iter().enumerate() {
            let mut state = if self.reached[index] {
                if self.config.hide_target_when_reached {
                    TargetState::Hidden
                } else {
                    TargetState::Reached
                }
            } else {
                TargetState::Armed
            };
            if hot == Some((index, false)) {
                state = TargetState::Hot;
            }
            targets.push(TargetSprite {
                position,
                radius: self.config.target_radius,
                state,
                is_central: false,
            });
        }
        if self.config.central_target {
            let state = if hot.map_or(false, |(_, central)| central) {
                TargetState::Hot
            } else {
                TargetState::Armed
            };
            targets.push(TargetSprite {
                position: Point2::origin(),
                radius: self.config.central_target_radius,
                state,
                is_central: true,
            });
        }
        FrameScene {
            targets,
            cursor: Some(self.frozen.unwrap_or(self.cursor)),
            message: None,
        }
    }
}

/// Drives the experiment through conditions, trials and target visits,
/// in lockstep with the frontend's frame loop.
pub struct TrialRunner<F, T, R> {
    frontend: F,
    timer: T,
    rng: R,
    settings: RunnerSettings,
    cursor: Point2<f64>,
    last_frame_ns: Option<u64>,
}

impl<F, T, R> TrialRunner<F, T, R>
where
    F: Frontend,
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    pub fn new(frontend: F, timer: T, rng: R) -> Self {
        Self::with_settings(frontend, timer, rng, RunnerSettings::default())
    }

    pub fn with_settings(frontend: F, timer: T, rng: R, settings: RunnerSettings) -> Self {
        Self {
            frontend,
            timer,
            rng,
            settings,
            cursor: Point2::origin(),
            last_frame_ns: None,
        }
    }

    pub fn frontend(&self) -> &F {
        &self.frontend
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    /// Runs every condition in order, each repeated `weight` times
    /// consecutively.
    ///
    /// Fails before any frame renders if a condition requires a joystick
    /// the frontend does not have. Conditions whose time budget expires
    /// lose their remaining trials (and a trial interrupted by the budget
    /// is discarded whole), but their post-block delay still runs.
    pub fn run(&mut self, configs: &[TrialConfig]) -> Result<RunOutcome, ExperimentError> {
        if configs.is_empty() {
            return Err(ExperimentError::NoConditions);
        }
        let configs: Vec<TrialConfig> = configs.iter().map(TrialConfig::sanitized).collect();
        if configs.iter().any(|c| c.use_joystick) && !self.frontend.joystick_present() {
            return Err(ExperimentError::JoystickMissing);
        }

        let mut condition_sequence = Vec::new();
        for (index, config) in configs.iter().enumerate() {
            condition_sequence.extend(std::iter::repeat(index).take(config.weight));
        }
        let mut results = ExperimentResults::new(condition_sequence);

        self.last_frame_ns = None;
        let Flow::Continue(()) = self.splash_screen() else {
            return Ok(RunOutcome::Cancelled);
        };
        self.cursor = self.frontend.poll_pointer();

        for (condition_index, config) in configs.iter().enumerate() {
            log::info!(
                "condition {condition_index}: {} trial(s) of {} target(s)",
                config.weight,
                config.num_targets
            );
            let mut condition_epoch: Option<u64> = None;
            for repetition in 0..config.weight {
                let epoch = *condition_epoch.get_or_insert_with(|| self.timer.now());
                if config.condition_timeout > 0.0
                    && self.timer.now().saturating_sub(epoch) as f64 / 1e9
                        > config.condition_timeout
                {
                    log::warn!(
                        "condition {condition_index}: budget of {:.3} s spent, skipping trials {repetition}..{}",
                        config.condition_timeout,
                        config.weight
                    );
                    break;
                }
                match self.run_trial(config, condition_index, repetition, epoch) {
                    Flow::Cancelled => {
                        log::info!("run cancelled by the participant");
                        return Ok(RunOutcome::Cancelled);
                    }
                    Flow::Continue(TrialEnd::BudgetExpired) => {
                        log::warn!(
                            "condition {condition_index}: budget expired during trial {repetition}, discarding it"
                        );
                        break;
                    }
                    Flow::Continue(TrialEnd::Completed(trial)) => results.push_trial(trial),
                }
            }
            self.timer
                .sleep(Duration::from_secs_f64(config.post_block_delay));
        }

        let stats = self.timer.frame_stats();
        if stats.dropped_frames > 0 {
            log::warn!(
                "{} dropped frame(s) over {} (avg {:.3} ms, jitter {:.3} ms)",
                stats.dropped_frames,
                self.timer.frame_count(),
                stats.average_frame_time_ns / 1e6,
                stats.jitter_ns / 1e6
            );
        }
        Ok(RunOutcome::Completed(results))
    }

    /// One execution of one condition: every outer target in the resolved
    /// order, each followed by the central target unless the cursor is
    /// auto-moved back to centre.
    fn run_trial(
        &mut self,
        config: &TrialConfig,
        condition_index: usize,
        repetition: usize,
        condition_epoch_ns: u64,
    ) -> Flow<TrialEnd> {
        let order = self.resolve_order(config);
        let mut ctx = TrialContext {
            config,
            outer_targets: points_on_circle(config.num_targets, config.target_distance, false),
            result: TrialResult::new(condition_index, repetition),
            reached: vec![false; config.num_targets],
            epoch_ns: self.timer.now(),
            condition_epoch_ns,
            schedule: 0.0,
            rotator: PointRotator::new(config.rotation_degrees),
            joystick: config.use_joystick.then(|| {
                let mut updater = JoystickPointUpdater::new(
                    config.rotation_degrees,
                    config.joystick_max_speed,
                    self.frontend.surface_size(),
                );
                updater.set_position(self.cursor);
                updater
            }),
            cursor: self.cursor,
            frozen: None,
            extra_delay: if repetition == 0 {
                config.first_target_extra_delay
            } else {
                0.0
            },
        };

        for (position_in_order, &target_index) in order.iter().enumerate() {
            match self.acquire_target(&mut ctx, target_index, false) {
                Flow::Cancelled => return Flow::Cancelled,
                Flow::Continue(VisitEnd::BudgetExpired) => {
                    return Flow::Continue(TrialEnd::BudgetExpired)
                }
                Flow::Continue(VisitEnd::Done) => {}
            }

            if config.automove_cursor_to_center {
                ctx.cursor = Point2::origin();
                if let Some(joystick) = &mut ctx.joystick {
                    joystick.reset();
                }
                self.frontend.warp_pointer(Point2::origin());
            } else if config.central_target {
                match self.acquire_target(&mut ctx, target_index, true) {
                    Flow::Cancelled => return Flow::Cancelled,
                    Flow::Continue(VisitEnd::BudgetExpired) => {
                        return Flow::Continue(TrialEnd::BudgetExpired)
                    }
                    Flow::Continue(VisitEnd::Done) => {}
                }
            }

            if position_in_order + 1 < order.len() {
                self.timer
                    .sleep(Duration::from_secs_f64(config.inter_target_delay));
            }
        }

        self.timer
            .sleep(Duration::from_secs_f64(config.post_trial_delay));
        self.cursor = ctx.cursor;
        Flow::Continue(TrialEnd::Completed(ctx.result))
    }

    /// One target visit: the waiting phase, then the acquisition phase.
    /// Samples are recorded in both; the ones from the waiting phase form
    /// the pre-onset baseline.
    fn acquire_target(
        &mut self,
        ctx: &mut TrialContext<'_>,
        target_index: usize,
        is_central: bool,
    ) -> Flow<VisitEnd> {
        let (target_position, target_radius, duration) = if is_central {
            (
                Point2::origin(),
                ctx.config.central_target_radius,
                ctx.config.central_target_duration,
            )
        } else {
            (
                ctx.outer_targets[target_index],
                ctx.config.target_radius,
                ctx.config.target_duration,
            )
        };
        let mut visit =
            TargetVisitRecord::new(target_index, is_central, target_position, target_radius);

        if ctx.config.freeze_cursor_between_targets {
            ctx.frozen = Some(ctx.cursor);
        }
        let delay = ctx.config.pre_target_delay + std::mem::take(&mut ctx.extra_delay);
        if ctx.config.fixed_target_intervals {
            // Absolute schedule: wait out the slot, however much of it is
            // left, rather than a delay relative to the last acquisition.
            ctx.schedule += delay;
            let onset_ns = ctx.epoch_ns + secs_to_ns(ctx.schedule);
            while self.timer.now() < onset_ns {
                let Flow::Continue(()) = self.sample_and_render(ctx, &mut visit, None) else {
                    return Flow::Cancelled;
                };
                if ctx.budget_expired(self.timer.now()) {
                    return Flow::Continue(VisitEnd::BudgetExpired);
                }
            }
        } else {
            let deadline_ns = self.timer.now() + secs_to_ns(delay);
            // At least one frame renders even for a zero delay.
            loop {
                let Flow::Continue(()) = self.sample_and_render(ctx, &mut visit, None) else {
                    return Flow::Cancelled;
                };
                if ctx.budget_expired(self.timer.now()) {
                    return Flow::Continue(VisitEnd::BudgetExpired);
                }
                if self.timer.now() >= deadline_ns {
                    break;
                }
            }
        }
        visit.mark_visible();
        ctx.frozen = None;

        if ctx.config.play_tone {
            self.frontend.play_tone(ctx.config.tone_duration);
        }
        let deadline_ns = if ctx.config.fixed_target_intervals {
            ctx.schedule += duration;
            ctx.epoch_ns + secs_to_ns(ctx.schedule)
        } else {
            self.timer.now() + secs_to_ns(duration)
        };

        let success = loop {
            let Flow::Continue(()) =
                self.sample_and_render(ctx, &mut visit, Some((target_index, is_central)))
            else {
                return Flow::Cancelled;
            };
            let now = self.timer.now();
            if ctx.budget_expired(now) {
                return Flow::Continue(VisitEnd::BudgetExpired);
            }
            if now >= deadline_ns {
                break false;
            }
            if ctx.acquisition_distance(target_position, is_central) <= target_radius {
                break true;
            }
        };

        visit.set_success(success);
        if success && !is_central {
            ctx.reached[target_index] = true;
        }
        log::debug!(
            "visit target={target_index} central={is_central} samples={} success={success}",
            visit.len()
        );
        ctx.result.push_visit(visit);
        Flow::Continue(VisitEnd::Done)
    }

    /// One frame: poll and transform the input, record the sample, render,
    /// check the cancel key. The render call is the run's only suspension
    /// point.
    fn sample_and_render(
        &mut self,
        ctx: &mut TrialContext<'_>,
        visit: &mut TargetVisitRecord,
        hot: Option<(usize, bool)>,
    ) -> Flow<()> {
        let position = if let Some(joystick) = &mut ctx.joystick {
            joystick.update(self.frontend.poll_joystick())
        } else {
            ctx.rotator.rotate(self.frontend.poll_pointer())
        };
        ctx.cursor = position;
        visit.push_sample(ctx.seconds_since_epoch(self.timer.now()), position);

        let scene = ctx.scene(hot);
        self.render_frame(&scene)
    }

    fn render_frame(&mut self, scene: &FrameScene) -> Flow<()> {
        self.frontend.render_frame(scene);
        if self.frontend.poll_cancel_requested() {
            return Flow::Cancelled;
        }
        let now = self.timer.now();
        if let Some(last) = self.last_frame_ns {
            self.timer
                .record_frame(Duration::from_nanos(now.saturating_sub(last)));
        }
        self.last_frame_ns = Some(now);
        Flow::Continue(())
    }

    fn splash_screen(&mut self) -> Flow<()> {
        let scene = FrameScene {
            targets: Vec::new(),
            cursor: None,
            message: Some(self.settings.splash_message.clone()),
        };
        let deadline_ns = self.timer.now() + secs_to_ns(self.settings.splash_duration);
        loop {
            let Flow::Continue(()) = self.render_frame(&scene) else {
                return Flow::Cancelled;
            };
            if self.timer.now() >= deadline_ns {
                return Flow::Continue(());
            }
        }
    }

    /// Resolved once per trial: the random order reshuffles every trial,
    /// the others are a pure function of the config.
    fn resolve_order(&mut self, config: &TrialConfig) -> Vec<usize> {
        match config.target_order {
            TargetOrder::Clockwise => (0..config.num_targets).collect(),
            TargetOrder::AntiClockwise => (0..config.num_targets).rev().collect(),
            TargetOrder::Random => {
                let mut order: Vec<usize> = (0..config.num_targets).collect();
                order.shuffle(&mut self.rng);
                order
            }
            TargetOrder::Fixed => config.target_indices.clone(),
        }
    }
}

fn secs_to_ns(seconds: f64) -> u64 {
    (seconds * 1e9) as u64
}
