use glam::{Mat4, Vec3};

/// World-space up axis shared by the camera basis and the view transform.
const WORLD_UP: Vec3 = Vec3::Y;

/// Keeps the pitch away from the poles so the up vector never inverts.
const PITCH_LIMIT: f32 = 89.0;

/// Near/far planes for the perspective transform.
const NEAR_PLANE: f32 = 0.1;
const FAR_PLANE: f32 = 100.0;

/// Free-fly camera driven by per-frame movement and mouse-look deltas.
///
/// Yaw and pitch are stored in degrees. The orthonormal basis is cached and
/// recomputed whenever the angles change; with yaw and pitch both zero the
/// camera looks down the positive X axis.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    yaw: f32,
    pitch: f32,
    forward: Vec3,
    right: Vec3,
    up: Vec3,
    fov_y: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::ZERO, 0.0, 0.0, 45.0)
    }
}

impl Camera {
    /// Creates a camera at `position` with the given angles (degrees) and
    /// vertical field of view (degrees).
    pub fn new(position: Vec3, yaw: f32, pitch: f32, fov_y: f32) -> Self {
        let mut camera = Self {
            position,
            yaw,
            pitch: pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT),
            forward: Vec3::X,
            right: Vec3::Z,
            up: WORLD_UP,
            fov_y,
        };
        camera.update_basis();
        camera
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Translates along the current forward vector; negative moves backward.
    pub fn move_forward(&mut self, amount: f32) {
        self.position += self.forward * amount;
    }

    /// Strafes along the current right vector; negative moves left.
    pub fn move_right(&mut self, amount: f32) {
        self.position += self.right * amount;
    }

    /// Applies mouse-look deltas (degrees) and refreshes the basis.
    pub fn rotate(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.yaw += delta_yaw;
        self.pitch = (self.pitch + delta_pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.update_basis();
    }

    /// View transform looking from the camera position along its forward
    /// vector.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.forward, WORLD_UP)
    }

    /// Perspective transform for the given aspect ratio.
    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y.to_radians(),
            aspect.max(0.01),
            NEAR_PLANE,
            FAR_PLANE,
        )
    }

    fn update_basis(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.forward = Vec3::new(
            pitch.cos() * yaw.cos(),
            pitch.sin(),
            pitch.cos() * yaw.sin(),
        )
        .normalize();
        self.right = self.forward.cross(WORLD_UP).normalize();
        self.up = self.right.cross(self.forward).normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f32 = 1e-5;

    #[test]
    fn forward_stays_unit_length() {
        let mut camera = Camera::default();
        for (yaw, pitch) in [
            (0.0, 0.0),
            (37.5, 12.0),
            (-180.0, 45.0),
            (720.0, -88.9),
            (15.0, 300.0),
        ] {
            camera.rotate(yaw, pitch);
            assert!(
                (camera.forward().length() - 1.0).abs() < TOLERANCE,
                "forward not unit at yaw={yaw} pitch={pitch}"
            );
        }
    }

    #[test]
    fn pitch_clamp_keeps_up_positive() {
        let mut camera = Camera::default();
        for _ in 0..100 {
            camera.rotate(13.0, 47.0);
        }
        assert!(camera.pitch() <= PITCH_LIMIT);
        assert!(camera.up().y > 0.0);
        for _ in 0..100 {
            camera.rotate(-5.0, -47.0);
        }
        assert!(camera.pitch() >= -PITCH_LIMIT);
        assert!(camera.up().y > 0.0);
    }

    #[test]
    fn move_forward_round_trips() {
        let mut camera = Camera::new(Vec3::new(1.0, 2.0, 3.0), 25.0, -10.0, 45.0);
        let start = camera.position();
        camera.move_forward(4.5);
        camera.move_forward(-4.5);
        assert!((camera.position() - start).length() < TOLERANCE);
    }

    #[test]
    fn projection_scales_with_aspect_and_fov() {
        let camera = Camera::new(Vec3::ZERO, 0.0, 0.0, 60.0);
        let half_fov_tan = (60.0_f32.to_radians() / 2.0).tan();

        for aspect in [1.0_f32, 4.0 / 3.0, 16.0 / 9.0] {
            let projection = camera.projection(aspect);
            let expected_x = 1.0 / (aspect * half_fov_tan);
            let expected_y = 1.0 / half_fov_tan;
            assert!((projection.col(0).x - expected_x).abs() < TOLERANCE);
            assert!((projection.col(1).y - expected_y).abs() < TOLERANCE);
        }
    }

    #[test]
    fn zero_angles_look_down_positive_x() {
        let camera = Camera::default();
        assert!((camera.forward() - Vec3::X).length() < TOLERANCE);
    }

    #[test]
    fn strafe_moves_one_unit_orthogonally() {
        let mut camera = Camera::default();
        assert!(camera.right().dot(camera.forward()).abs() < TOLERANCE);
        camera.move_right(1.0);
        let moved = camera.position();
        assert!(moved.dot(Vec3::X).abs() < TOLERANCE);
        assert!(moved.dot(Vec3::Y).abs() < TOLERANCE);
        assert!((moved.length() - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn view_matrix_places_eye_at_position() {
        let camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), -90.0, 0.0, 45.0);
        let view = camera.view_matrix();
        let eye = view.inverse().col(3).truncate();
        assert!((eye - Vec3::new(0.0, 0.0, 5.0)).length() < 1e-4);
    }
}
