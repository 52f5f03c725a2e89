//! Per-frame geometry: culling, projection, and screen-space Gaussians.
//!
//! Everything here runs single-threaded before the tile kernels start.
//! The math follows the EWA splatting scheme: each surviving Gaussian's
//! 3D covariance is pushed through the view rotation and a local
//! perspective Jacobian to get a 2D screen covariance, whose inverse and
//! 3-sigma radius drive the compositing kernel and the tile binning.

use glam::{Mat3, Mat4, UVec2, Vec2, Vec3, Vec4, Vec4Swizzles};

use super::tiles::TileRange;
use crate::camera::Camera;
use crate::frame::Frame;
use crate::model::GaussianModel;

/// Isotropic screen-space variance added to every splat.
const COV2D_REGULARIZER: f32 = 0.3;

/// Guard against division by a vanishing clip-space w.
const W_EPSILON: f32 = 1e-5;

/// A point that survived culling, in the compact per-frame prefix.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TransformedPoint {
    /// View-space position.
    pub view: Vec3,
    /// Screen-space center in pixels.
    pub screen: Vec2,
    /// Index into the model arrays.
    pub idx: u32,
    /// Tiles this splat touches; empty until the extent pass runs, and
    /// empty forever for splats that pass culling but degenerate later.
    pub tiles: TileRange,
}

/// Inverse 2D screen covariance (conic) of a splat.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct InvCov2 {
    pub xx: f32,
    pub xy: f32,
    pub yy: f32,
}

/// Screen-space extent of a splat: conic plus 3-sigma pixel radius.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SplatExtent {
    pub inv: InvCov2,
    pub radius: f32,
}

/// Per-frame projection scalars shared by the covariance pass.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FovScales {
    pub tan_fovx: f32,
    pub tan_fovy: f32,
    pub focal_x: f32,
    pub focal_y: f32,
}

impl FovScales {
    pub fn new(camera: &Camera, frame: &Frame) -> Self {
        let tan_fovy = (camera.fovy * 0.5).tan();
        let tan_fovx = tan_fovy * camera.aspect;
        Self {
            tan_fovx,
            tan_fovy,
            focal_x: frame.width as f32 / (2.0 * tan_fovx),
            focal_y: frame.height as f32 / (2.0 * tan_fovy),
        }
    }
}

fn ndc_to_screen(ndc: Vec3, frame: &Frame) -> Vec2 {
    Vec2::new(
        (0.5 * ndc.x + 0.5) * frame.width as f32,
        (0.5 * ndc.y + 0.5) * frame.height as f32,
    )
}

/// Cull against the eye plane and the NDC cube, filling the compact
/// survivor prefix in model order.
pub(crate) fn cull_points(
    model: &GaussianModel,
    view: &Mat4,
    proj: &Mat4,
    frame: &Frame,
    out: &mut Vec<TransformedPoint>,
) {
    out.clear();

    for (i, pos) in model.positions.iter().enumerate() {
        let vview = *view * Vec4::new(pos.x, pos.y, pos.z, 1.0);
        if vview.z < 0.0 {
            continue;
        }

        let vproj = *proj * vview;
        let ndc = vproj.xyz() / (vproj.w + W_EPSILON);

        // Keep-test: NaN or infinite coordinates fail it and are culled
        // along with everything outside the cube.
        let on_screen = (-1.0..=1.0).contains(&ndc.x)
            && (-1.0..=1.0).contains(&ndc.y)
            && (-1.0..=1.0).contains(&ndc.z);
        if !on_screen {
            continue;
        }

        out.push(TransformedPoint {
            view: vview.xyz(),
            screen: ndc_to_screen(ndc, frame),
            idx: i as u32,
            tiles: TileRange::EMPTY,
        });
    }
}

/// Screen-space covariance entries (xx, xy, yy) of one splat: the upper
/// 2×2 of J·W·Σ·Wᵀ·Jᵀ, with the view-space position clamped to 1.3× the
/// frustum tangent so the Jacobian stays bounded near the frame edge.
pub(crate) fn project_covariance(
    view_pos: Vec3,
    view: &Mat4,
    cov3d: &Mat3,
    fov: &FovScales,
) -> (f32, f32, f32) {
    let limx = 1.3 * fov.tan_fovx;
    let limy = 1.3 * fov.tan_fovy;
    let t = Vec3::new(
        (view_pos.x / view_pos.z).clamp(-limx, limx) * view_pos.z,
        (view_pos.y / view_pos.z).clamp(-limy, limy) * view_pos.z,
        view_pos.z,
    );

    let j = Mat3::from_cols(
        Vec3::new(fov.focal_x / t.z, 0.0, 0.0),
        Vec3::new(0.0, fov.focal_y / t.z, 0.0),
        Vec3::new(
            -(fov.focal_x * t.x) / (t.z * t.z),
            -(fov.focal_y * t.y) / (t.z * t.z),
            0.0,
        ),
    );
    let w = Mat3::from_mat4(*view);

    let tm = j * w;
    let cov = tm * *cov3d * tm.transpose();

    (cov.x_axis.x, cov.y_axis.x, cov.y_axis.y)
}

/// Regularize, invert, and bound a screen covariance.
///
/// Returns `None` for splats the kernel could not composite safely:
/// vanishing or non-finite determinants and sub-pixel radii.
pub(crate) fn splat_extent(cov: (f32, f32, f32)) -> Option<SplatExtent> {
    let (mut xx, xy, mut yy) = cov;
    xx += COV2D_REGULARIZER;
    yy += COV2D_REGULARIZER;

    let det = xx * yy - xy * xy;
    if det == 0.0 || !det.is_finite() {
        return None;
    }

    let inv = InvCov2 {
        xx: yy / det,
        xy: -xy / det,
        yy: xx / det,
    };

    let mid = 0.5 * (xx + yy);
    let lambda_max = mid + (mid * mid - det).max(0.1).sqrt();
    let radius = (3.0 * lambda_max.sqrt()).ceil();
    if radius.is_nan() || radius < 1.0 {
        return None;
    }

    Some(SplatExtent { inv, radius })
}

/// Pixel rect `[min, max)` of a splat, clamped to the frame. `None` when
/// the clamped rect is degenerate.
pub(crate) fn splat_rect(
    screen: Vec2,
    radius: f32,
    width: usize,
    height: usize,
) -> Option<(UVec2, UVec2)> {
    let min_x = (screen.x.floor() - radius).max(0.0) as u32;
    let min_y = (screen.y.floor() - radius).max(0.0) as u32;
    let max_x = (screen.x + radius + 1.0).clamp(0.0, width as f32) as u32;
    let max_y = (screen.y + radius + 1.0).clamp(0.0, height as f32) as u32;

    if max_x <= min_x || max_y <= min_y {
        return None;
    }
    Some((
        UVec2::new(min_x, min_y),
        UVec2::new(max_x, max_y),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extent_inverse_matches_regularized_covariance() {
        let cov = (4.0, 1.0, 3.0);
        let ext = splat_extent(cov).unwrap();

        // Multiply [xx xy; xy yy] (after regularization) by its inverse.
        let (xx, xy, yy) =
            (cov.0 + COV2D_REGULARIZER, cov.1, cov.2 + COV2D_REGULARIZER);
        let i00 = xx * ext.inv.xx + xy * ext.inv.xy;
        let i01 = xx * ext.inv.xy + xy * ext.inv.yy;
        let i11 = xy * ext.inv.xy + yy * ext.inv.yy;
        assert!((i00 - 1.0).abs() < 1e-5);
        assert!(i01.abs() < 1e-5);
        assert!((i11 - 1.0).abs() < 1e-5);

        assert!(ext.radius >= 1.0);
        assert_eq!(ext.radius, ext.radius.ceil());
    }

    #[test]
    fn degenerate_covariances_are_rejected() {
        // xy equal to the regularized diagonal makes the determinant
        // exactly zero (a*a - a*a).
        let a = 0.7f32 + COV2D_REGULARIZER;
        assert!(splat_extent((0.7, a, 0.7)).is_none());
        assert!(splat_extent((f32::NAN, 0.0, 1.0)).is_none());
        assert!(splat_extent((f32::INFINITY, 0.0, 1.0)).is_none());
    }

    #[test]
    fn radius_grows_with_variance() {
        let small = splat_extent((1.0, 0.0, 1.0)).unwrap();
        let large = splat_extent((100.0, 0.0, 100.0)).unwrap();
        assert!(large.radius > small.radius);
        // 3-sigma of the dominant eigenvalue, rounded up.
        assert_eq!(large.radius, (3.0 * 100.3f32.sqrt()).ceil());
    }

    #[test]
    fn rect_is_clamped_and_rejects_degenerates() {
        let (min, max) =
            splat_rect(Vec2::new(2.0, 2.0), 5.0, 64, 64).unwrap();
        assert_eq!(min, UVec2::new(0, 0));
        assert_eq!(max, UVec2::new(8, 8));

        // Fully clamped away.
        assert!(splat_rect(Vec2::new(0.0, 32.0), 0.0, 0, 64).is_none());
    }

    #[test]
    fn rect_includes_the_radius_plus_one_column() {
        let (min, max) =
            splat_rect(Vec2::new(100.0, 100.0), 20.0, 640, 360).unwrap();
        assert_eq!(min, UVec2::new(80, 80));
        assert_eq!(max, UVec2::new(121, 121));
    }
}
