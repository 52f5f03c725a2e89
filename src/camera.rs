//! Pinhole camera: look-at view matrix and perspective projection.

use glam::{Mat4, Vec3, Vec4};

/// Perspective camera defined by eye position, target, and projection
/// parameters.
///
/// The basis vectors `right`, `up`, and `forward` are derived state:
/// [`Camera::view`] recomputes and writes them back on every call, so they
/// always describe the orientation of the most recently built view matrix.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Eye (camera) position in world space.
    pub pos: Vec3,
    /// Look-at target position.
    pub at: Vec3,
    /// Up direction; re-orthonormalized by [`Camera::view`].
    pub up: Vec3,
    /// Derived right axis.
    pub right: Vec3,
    /// Derived forward axis (from eye toward target).
    pub forward: Vec3,
    /// Vertical field of view in radians.
    pub fovy: f32,
    /// Near clipping plane distance (> 0).
    pub near: f32,
    /// Far clipping plane distance (> near).
    pub far: f32,
    /// Viewport aspect ratio (width / height).
    pub aspect: f32,
}

impl Camera {
    /// Create a camera looking from `pos` toward `at`.
    ///
    /// The derived axes are valid after the first [`Camera::view`] call.
    #[must_use]
    pub fn new(
        pos: Vec3,
        at: Vec3,
        up: Vec3,
        fovy: f32,
        near: f32,
        far: f32,
        aspect: f32,
    ) -> Self {
        Self {
            pos,
            at,
            up,
            right: Vec3::ZERO,
            forward: Vec3::ZERO,
            fovy,
            near,
            far,
            aspect,
        }
    }

    /// Build the right-handed look-at view matrix and write the derived
    /// basis vectors back into the camera.
    ///
    /// Points in front of the eye land at positive view-space z; larger z
    /// is further from the eye.
    pub fn view(&mut self) -> Mat4 {
        let forward = (self.at - self.pos).normalize();
        let right = forward.cross(self.up).normalize();
        let up = right.cross(forward).normalize();

        self.forward = forward;
        self.right = right;
        self.up = up;

        Mat4::from_cols(
            Vec4::new(right.x, up.x, forward.x, 0.0),
            Vec4::new(right.y, up.y, forward.y, 0.0),
            Vec4::new(right.z, up.z, forward.z, 0.0),
            Vec4::new(
                -right.dot(self.pos),
                -up.dot(self.pos),
                -forward.dot(self.pos),
                1.0,
            ),
        )
    }

    /// Build the GL-style perspective projection matrix.
    #[must_use]
    pub fn projection(&self) -> Mat4 {
        let t = 1.0 / (self.fovy * 0.5).tan();
        let nf = self.near - self.far;

        Mat4::from_cols(
            Vec4::new(t / self.aspect, 0.0, 0.0, 0.0),
            Vec4::new(0.0, t, 0.0, 0.0),
            Vec4::new(0.0, 0.0, (self.far + self.near) / nf, -1.0),
            Vec4::new(0.0, 0.0, -(2.0 * self.far * self.near) / nf, 0.0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_camera() -> Camera {
        Camera::new(
            Vec3::new(0.0, 0.0, -1.0),
            Vec3::ZERO,
            Vec3::Y,
            0.35 * std::f32::consts::PI,
            0.1,
            100.0,
            1.0,
        )
    }

    #[test]
    fn view_writes_back_orthonormal_axes() {
        let mut cam = test_camera();
        let _ = cam.view();

        assert!((cam.forward.length() - 1.0).abs() < 1e-6);
        assert!((cam.right.length() - 1.0).abs() < 1e-6);
        assert!((cam.up.length() - 1.0).abs() < 1e-6);
        assert!(cam.forward.dot(cam.right).abs() < 1e-6);
        assert!(cam.forward.dot(cam.up).abs() < 1e-6);
        assert!(cam.right.dot(cam.up).abs() < 1e-6);
        assert_eq!(cam.forward, Vec3::Z);
    }

    #[test]
    fn points_in_front_have_positive_view_z() {
        let mut cam = test_camera();
        let view = cam.view();

        let in_front = view * Vec4::new(0.0, 0.0, 1.0, 1.0);
        assert!((in_front.z - 2.0).abs() < 1e-6);

        let behind = view * Vec4::new(0.0, 0.0, -5.0, 1.0);
        assert!(behind.z < 0.0);
    }

    #[test]
    fn view_depth_increases_with_distance() {
        let mut cam = test_camera();
        let view = cam.view();

        let near_pt = view * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let far_pt = view * Vec4::new(0.0, 0.0, 4.0, 1.0);
        assert!(far_pt.z > near_pt.z);
    }

    #[test]
    fn projection_maps_near_and_far_to_ndc_bounds() {
        let mut cam = test_camera();
        let _ = cam.view();
        let proj = cam.projection();

        // A point at distance `near` along the optical axis.
        let clip_near = proj * Vec4::new(0.0, 0.0, cam.near, 1.0);
        assert!((clip_near.z / clip_near.w - -1.0).abs() < 1e-4);

        let clip_far = proj * Vec4::new(0.0, 0.0, cam.far, 1.0);
        assert!((clip_far.z / clip_far.w - 1.0).abs() < 1e-4);
    }

    #[test]
    fn projection_w_is_negated_view_depth() {
        let cam = test_camera();
        let proj = cam.projection();

        let clip = proj * Vec4::new(0.3, -0.2, 5.0, 1.0);
        assert!((clip.w - -5.0).abs() < 1e-6);
    }
}
