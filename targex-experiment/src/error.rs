use thiserror::Error;

/// Precondition failures raised before any trial starts. Timeouts, skips and
/// user cancellation are not errors; they are encoded in the run outcome and
/// the recorded data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExperimentError {
    #[error("a condition requires a joystick but none is connected")]
    JoystickMissing,
    #[error("no trial conditions were supplied")]
    NoConditions,
}
