use nalgebra::{Point2, Rotation2, Vector2};

/// Lays out `n` points on a circle of the given radius, at angles `2πk/n`
/// measured clockwise from vertical, so index 0 sits straight above the
/// origin. When `include_centre` is set the origin is appended as a final
/// central point.
pub fn points_on_circle(n: usize, radius: f64, include_centre: bool) -> Vec<Point2<f64>> {
    let mut points = Vec::with_capacity(n + usize::from(include_centre));
    for k in 0..n {
        let theta = std::f64::consts::TAU * k as f64 / n as f64;
        points.push(Point2::new(radius * theta.sin(), radius * theta.cos()));
    }
    if include_centre {
        points.push(Point2::origin());
    }
    points
}

/// Fixed 2D rotation applied to every raw pointer sample.
///
/// This is a deliberate perturbation of the participant's visual feedback,
/// not a coordinate-system correction.
#[derive(Debug, Clone, Copy)]
pub struct PointRotator {
    rotation: Rotation2<f64>,
}

impl PointRotator {
    pub fn new(angle_degrees: f64) -> Self {
        Self {
            rotation: Rotation2::new(angle_degrees.to_radians()),
        }
    }

    pub fn rotate(&self, point: Point2<f64>) -> Point2<f64> {
        self.rotation * point
    }
}

/// Integrates joystick axes into a logical cursor position.
///
/// Axes arrive in [-1, 1] per component. Each update rotates the axis vector
/// by the same convention as [`PointRotator`], scales it by `max_speed`
/// (logical units per frame) and adds it to the held position, which is then
/// clipped to the screen's logical extent: height-normalized, so `|y| <= 0.5`
/// and `|x| <= aspect / 2`.
#[derive(Debug, Clone)]
pub struct JoystickPointUpdater {
    rotation: Rotation2<f64>,
    max_speed: f64,
    half_extent: Vector2<f64>,
    position: Point2<f64>,
}

impl JoystickPointUpdater {
    pub fn new(angle_degrees: f64, max_speed: f64, surface_size: (f64, f64)) -> Self {
        let (width, height) = surface_size;
        let aspect = if height > 0.0 { width / height } else { 1.0 };
        Self {
            rotation: Rotation2::new(angle_degrees.to_radians()),
            max_speed,
            half_extent: Vector2::new(aspect / 2.0, 0.5),
            position: Point2::origin(),
        }
    }

    /// Advances the integrator by one frame's worth of input.
    pub fn update(&mut self, axes: Vector2<f64>) -> Point2<f64> {
        self.position += self.rotation * axes * self.max_speed;
        self.position.x = self.position.x.clamp(-self.half_extent.x, self.half_extent.x);
        self.position.y = self.position.y.clamp(-self.half_extent.y, self.half_extent.y);
        self.position
    }

    pub fn position(&self) -> Point2<f64> {
        self.position
    }

    pub fn set_position(&mut self, position: Point2<f64>) {
        self.position = position;
    }

    /// Recenters the integrator on the origin.
    pub fn reset(&mut self) {
        self.position = Point2::origin();
    }
}
