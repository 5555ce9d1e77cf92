use nalgebra::{Point2, Vector2};

/// Display state of one target sprite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    /// Not drawn at all.
    Hidden,
    /// Drawn in the resting style.
    Armed,
    /// The active acquisition target.
    Hot,
    /// Already reached this trial, drawn with the success cue.
    Reached,
}

#[derive(Debug, Clone)]
pub struct TargetSprite {
    pub position: Point2<f64>,
    pub radius: f64,
    pub state: TargetState,
    pub is_central: bool,
}

/// Everything the frontend needs to draw one frame.
///
/// Coordinates are normalized height units with the origin at screen centre.
/// `cursor` is the position to display, which during cursor freezes is not
/// the live pointer.
#[derive(Debug, Clone, Default)]
pub struct FrameScene {
    pub targets: Vec<TargetSprite>,
    pub cursor: Option<Point2<f64>>,
    pub message: Option<String>,
}

/// Boundary to the excluded collaborators: the stimulus renderer, the
/// pointing devices, the cancel key and the audio cue.
///
/// `render_frame` is called exactly once per runner loop iteration and is
/// expected to block until the frame is presented (vsync in a windowed
/// frontend, a virtual-clock step in a simulated one); those calls are the
/// only suspension and polling points of the whole run.
pub trait Frontend {
    fn render_frame(&mut self, scene: &FrameScene);

    /// Current pointer position in normalized height units.
    fn poll_pointer(&mut self) -> Point2<f64>;

    /// Joystick axes, each in [-1, 1].
    fn poll_joystick(&mut self) -> Vector2<f64>;

    fn joystick_present(&self) -> bool;

    /// Whether the participant asked to abort, checked once per frame.
    fn poll_cancel_requested(&mut self) -> bool;

    /// Fire-and-forget feedback tone.
    fn play_tone(&mut self, duration_s: f64);

    /// Logical width and height of the drawing surface.
    fn surface_size(&self) -> (f64, f64);

    /// Move the pointer; frontends without that capability ignore it.
    fn warp_pointer(&mut self, _to: Point2<f64>) {}
}
