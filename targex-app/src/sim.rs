use nalgebra::{Point2, Vector2};
use std::time::Duration;
use targex_experiment::{FrameScene, Frontend, TargetState};
use targex_timing::VirtualTimer;

/// Simulated participant and display, standing in for a windowed frontend.
///
/// Each rendered frame advances the shared virtual clock by one frame
/// interval and nudges the pointer toward whichever target is hot, steering
/// by the displayed cursor so rotated-feedback conditions behave like a
/// participant correcting from what they see.
pub struct SimulatedFrontend {
    timer: VirtualTimer,
    frame_interval: Duration,
    speed: f64,
    pointer: Point2<f64>,
    displayed_cursor: Point2<f64>,
    hot_target: Option<Point2<f64>>,
    frames: usize,
}

impl SimulatedFrontend {
    pub fn new(timer: VirtualTimer, frame_interval: Duration, speed: f64) -> Self {
        Self {
            timer,
            frame_interval,
            speed,
            pointer: Point2::origin(),
            displayed_cursor: Point2::origin(),
            hot_target: None,
            frames: 0,
        }
    }

    pub fn frames(&self) -> usize {
        self.frames
    }
}

impl Frontend for SimulatedFrontend {
    fn render_frame(&mut self, scene: &FrameScene) {
        self.frames += 1;
        self.timer.advance(self.frame_interval);
        self.hot_target = scene
            .targets
            .iter()
            .find(|t| t.state == TargetState::Hot)
            .map(|t| t.position);
        if let Some(cursor) = scene.cursor {
            self.displayed_cursor = cursor;
        }
        if let Some(target) = self.hot_target {
            // Steer from the displayed cursor toward the target; the raw
            // pointer inherits the correction.
            let error = target - self.displayed_cursor;
            let distance = error.norm();
            if distance > 0.0 {
                let step = self.speed.min(distance);
                self.pointer += error * (step / distance);
            }
        }
    }

    fn poll_pointer(&mut self) -> Point2<f64> {
        self.pointer
    }

    fn poll_joystick(&mut self) -> Vector2<f64> {
        match self.hot_target {
            Some(target) => {
                let error = target - self.displayed_cursor;
                if error.norm() == 0.0 {
                    Vector2::zeros()
                } else {
                    error.normalize()
                }
            }
            None => Vector2::zeros(),
        }
    }

    fn joystick_present(&self) -> bool {
        true
    }

    fn poll_cancel_requested(&mut self) -> bool {
        false
    }

    fn play_tone(&mut self, _duration_s: f64) {}

    fn surface_size(&self) -> (f64, f64) {
        (16.0 / 9.0, 1.0)
    }

    fn warp_pointer(&mut self, to: Point2<f64>) {
        self.pointer = to;
    }
}
