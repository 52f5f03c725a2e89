//! Gaussian point-cloud model and its PLY loader.
//!
//! A loaded model is immutable: the raster context borrows it for its whole
//! lifetime and every per-frame buffer is derived from it. Raw file values
//! are activated at load time — DC spherical-harmonic coefficients become
//! linear RGB, logit opacities pass through a sigmoid, and log-scales plus
//! a rotation quaternion become a world-space 3×3 covariance per point.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use glam::{Mat3, Vec3};
use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Property};

use crate::error::Error;

/// Zero-order spherical-harmonic basis constant.
const SH_C0: f32 = 0.28209;

/// Vertex properties a splat PLY must carry.
const REQUIRED_PROPERTIES: [&str; 14] = [
    "x", "y", "z", "f_dc_0", "f_dc_1", "f_dc_2", "scale_0", "scale_1",
    "scale_2", "rot_0", "rot_1", "rot_2", "rot_3", "opacity",
];

/// A set of anisotropic 3D Gaussians, ready for rasterization.
///
/// All arrays have the same length; index `i` describes one Gaussian.
#[derive(Debug, Clone, Default)]
pub struct GaussianModel {
    /// World-space centers.
    pub positions: Vec<Vec3>,
    /// Linear RGB in `[0, 1]`, from the zero-order SH term.
    pub colors: Vec<Vec3>,
    /// Sigmoid-activated opacities in `(0, 1)`.
    pub opacities: Vec<f32>,
    /// Symmetric positive-semidefinite world-space covariances.
    pub cov3d: Vec<Mat3>,
}

impl GaussianModel {
    /// Load a model from a 3D Gaussian Splatting PLY file.
    ///
    /// The vertex element must carry `x y z`, `f_dc_0..2`, `scale_0..2`,
    /// `rot_0..3` (quaternion in `(r, x, y, z)` order, consumed as-is),
    /// and `opacity` (a logit). ASCII and binary encodings both work.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelLoad`] when the file is missing, the header
    /// does not parse, or a required vertex property is absent.
    pub fn from_ply<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            Error::ModelLoad(format!("unable to open {}: {e}", path.display()))
        })?;
        let mut reader = BufReader::new(file);

        let parser = Parser::<DefaultElement>::new();
        let ply = parser.read_ply(&mut reader).map_err(|e| {
            Error::ModelLoad(format!("unable to parse PLY header or data: {e}"))
        })?;

        let vertex_def =
            ply.header.elements.get("vertex").ok_or_else(|| {
                Error::ModelLoad("PLY has no vertex element".to_owned())
            })?;
        for name in REQUIRED_PROPERTIES {
            if !vertex_def.properties.contains_key(name) {
                return Err(Error::ModelLoad(format!(
                    "missing vertex property `{name}`"
                )));
            }
        }

        let empty = Vec::new();
        let vertices = ply.payload.get("vertex").unwrap_or(&empty);

        let mut model = Self {
            positions: Vec::with_capacity(vertices.len()),
            colors: Vec::with_capacity(vertices.len()),
            opacities: Vec::with_capacity(vertices.len()),
            cov3d: Vec::with_capacity(vertices.len()),
        };

        for vertex in vertices {
            let p = |name| scalar(vertex, name);

            model
                .positions
                .push(Vec3::new(p("x")?, p("y")?, p("z")?));
            model.colors.push(Vec3::new(
                p("f_dc_0")?.mul_add(SH_C0, 0.5),
                p("f_dc_1")?.mul_add(SH_C0, 0.5),
                p("f_dc_2")?.mul_add(SH_C0, 0.5),
            ));
            model.opacities.push(sigmoid(p("opacity")?));

            let scale = Vec3::new(
                p("scale_0")?.exp(),
                p("scale_1")?.exp(),
                p("scale_2")?.exp(),
            );
            let quat =
                [p("rot_0")?, p("rot_1")?, p("rot_2")?, p("rot_3")?];
            model.cov3d.push(covariance(scale, quat));
        }

        log::info!(
            "loaded {} gaussians from {}",
            model.len(),
            path.display()
        );
        Ok(model)
    }

    /// Build a model from already-activated per-point arrays.
    ///
    /// All arrays must have the same length.
    #[must_use]
    pub fn from_parts(
        positions: Vec<Vec3>,
        colors: Vec<Vec3>,
        opacities: Vec<f32>,
        cov3d: Vec<Mat3>,
    ) -> Self {
        assert_eq!(positions.len(), colors.len());
        assert_eq!(positions.len(), opacities.len());
        assert_eq!(positions.len(), cov3d.len());
        Self {
            positions,
            colors,
            opacities,
            cov3d,
        }
    }

    /// Number of Gaussians in the model.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the model holds no Gaussians.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Read a scalar vertex property as `f32`.
fn scalar(vertex: &DefaultElement, name: &str) -> Result<f32, Error> {
    match vertex.get(name) {
        Some(Property::Float(v)) => Ok(*v),
        Some(Property::Double(v)) => Ok(*v as f32),
        Some(_) => Err(Error::ModelLoad(format!(
            "vertex property `{name}` is not a scalar float"
        ))),
        None => Err(Error::ModelLoad(format!(
            "missing vertex property `{name}`"
        ))),
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// World-space covariance R·S·(R·S)ᵀ from exp-activated scales and a
/// quaternion in `(r, x, y, z)` order. The quaternion is used as-is.
fn covariance(scale: Vec3, quat: [f32; 4]) -> Mat3 {
    let [r, x, y, z] = quat;

    // Conventional right-handed quaternion-to-matrix formula; each Vec3 is
    // one column.
    let rot = Mat3::from_cols(
        Vec3::new(
            1.0 - 2.0 * (y * y + z * z),
            2.0 * (x * y + r * z),
            2.0 * (x * z - r * y),
        ),
        Vec3::new(
            2.0 * (x * y - r * z),
            1.0 - 2.0 * (x * x + z * z),
            2.0 * (y * z + r * x),
        ),
        Vec3::new(
            2.0 * (x * z + r * y),
            2.0 * (y * z - r * x),
            1.0 - 2.0 * (x * x + y * y),
        ),
    );

    let m = rot * Mat3::from_diagonal(scale);
    m * m.transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp_ply(name: &str, body: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir()
            .join(format!("stipple-model-{name}-{}.ply", std::process::id()));
        std::fs::write(&path, body).unwrap();
        path
    }

    fn ascii_header(count: usize, properties: &[&str]) -> String {
        let mut header = format!("ply\nformat ascii 1.0\nelement vertex {count}\n");
        for p in properties {
            header.push_str(&format!("property float {p}\n"));
        }
        header.push_str("end_header\n");
        header
    }

    #[test]
    fn sigmoid_activation() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!(sigmoid(20.0) > 0.999);
        assert!(sigmoid(-20.0) < 0.001);
    }

    #[test]
    fn identity_quaternion_gives_diagonal_covariance() {
        let cov = covariance(
            Vec3::new(1.0, 2.0, 3.0),
            [1.0, 0.0, 0.0, 0.0],
        );
        let expected = Mat3::from_diagonal(Vec3::new(1.0, 4.0, 9.0));
        assert!(cov.abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn quarter_turn_about_z_swaps_principal_axes() {
        let half = std::f32::consts::FRAC_PI_4; // half of a 90° turn
        let cov = covariance(
            Vec3::new(2.0, 1.0, 1.0),
            [half.cos(), 0.0, 0.0, half.sin()],
        );
        let expected = Mat3::from_diagonal(Vec3::new(1.0, 4.0, 1.0));
        assert!(cov.abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn quaternion_is_not_renormalized() {
        // (1, 1, 0, 0) has length √2; the as-is formula yields a sheared
        // frame whose covariance differs from the normalized rotation's.
        let cov = covariance(Vec3::ONE, [1.0, 1.0, 0.0, 0.0]);
        let expected = Mat3::from_diagonal(Vec3::new(1.0, 5.0, 5.0));
        assert!(cov.abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn loads_ascii_ply_and_activates_values() {
        let mut body = ascii_header(2, &REQUIRED_PROPERTIES);
        body.push_str("0 0 0 0 0 0 0 0 0 1 0 0 0 0\n");
        body.push_str("1 2 3 1.0 -1.0 0 0 0 0 1 0 0 0 100\n");
        let path = write_temp_ply("ok", &body);

        let model = GaussianModel::from_ply(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(model.len(), 2);
        assert_eq!(model.positions[1], Vec3::new(1.0, 2.0, 3.0));

        // f_dc of 0 maps to mid-gray, ±1 offsets by ±C0.
        assert!((model.colors[0].x - 0.5).abs() < 1e-6);
        assert!((model.colors[1].x - (0.5 + SH_C0)).abs() < 1e-6);
        assert!((model.colors[1].y - (0.5 - SH_C0)).abs() < 1e-6);

        // Logit 0 → 0.5; logit 100 saturates toward 1.
        assert!((model.opacities[0] - 0.5).abs() < 1e-6);
        assert!(model.opacities[1] > 0.999);

        // log-scale 0, identity rotation → identity covariance.
        assert!(model.cov3d[0].abs_diff_eq(Mat3::IDENTITY, 1e-5));
    }

    #[test]
    fn missing_property_is_a_load_failure() {
        let props: Vec<&str> = REQUIRED_PROPERTIES
            .iter()
            .copied()
            .filter(|&p| p != "opacity")
            .collect();
        let mut body = ascii_header(1, &props);
        body.push_str("0 0 0 0 0 0 0 0 0 1 0 0 0\n");
        let path = write_temp_ply("missing", &body);

        let err = GaussianModel::from_ply(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();

        assert!(err.to_string().contains("opacity"));
    }

    #[test]
    fn missing_file_is_a_load_failure() {
        let err = GaussianModel::from_ply("/nonexistent/cloud.ply");
        assert!(err.is_err());
    }

    #[test]
    fn empty_vertex_element_loads_as_empty_model() {
        let body = ascii_header(0, &REQUIRED_PROPERTIES);
        let path = write_temp_ply("empty", &body);

        let model = GaussianModel::from_ply(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(model.is_empty());
    }
}
