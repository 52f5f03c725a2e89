//! Centralized render options with TOML preset support.
//!
//! All tweakable settings (frame geometry, tiling, threading, camera,
//! output) are consolidated here. Options serialize to/from TOML; every
//! sub-struct uses `#[serde(default)]` so partial files (e.g. only
//! overriding `[camera]`) work correctly.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::camera::Camera;
use crate::error::Error;

/// Top-level options container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct RenderOptions {
    /// Output frame geometry.
    pub frame: FrameOptions,
    /// Tiling and threading parameters.
    pub raster: RasterOptions,
    /// Camera placement and projection.
    pub camera: CameraOptions,
    /// Image output settings.
    pub output: OutputOptions,
}

/// Frame geometry options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FrameOptions {
    /// Frame width in pixels.
    pub width: usize,
    /// Frame height in pixels.
    pub height: usize,
}

/// Tiling and threading options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RasterOptions {
    /// Tile size in pixels, `[x, y]`.
    pub tile_size: [u32; 2],
    /// Worker thread count.
    pub threads: usize,
    /// Contiguous tiles per work item.
    pub tile_batch: usize,
}

/// Camera placement and projection options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraOptions {
    /// Eye position in world space.
    pub pos: [f32; 3],
    /// Look-at target.
    pub at: [f32; 3],
    /// Up direction.
    pub up: [f32; 3],
    /// Vertical field of view in degrees.
    pub fovy_degrees: f32,
    /// Near clipping plane distance.
    pub near: f32,
    /// Far clipping plane distance.
    pub far: f32,
}

/// Image output options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputOptions {
    /// Path of the PPM image written after rendering.
    pub path: String,
}

impl Default for FrameOptions {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
        }
    }
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            tile_size: [8, 8],
            threads: 16,
            tile_batch: 32,
        }
    }
}

impl Default for CameraOptions {
    fn default() -> Self {
        Self {
            pos: [0.0, 0.0, -10.0],
            at: [0.0, 0.0, 0.0],
            up: [0.0, 1.0, 0.0],
            fovy_degrees: 63.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            path: "render.ppm".to_owned(),
        }
    }
}

impl RenderOptions {
    /// Load options from a TOML file. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the file cannot be read and
    /// [`Error::OptionsParse`] when it is not valid TOML.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(Error::Io)?;
        toml::from_str(&content)
            .map_err(|e| Error::OptionsParse(e.to_string()))
    }

    /// Save options to a TOML file (pretty-printed).
    ///
    /// # Errors
    ///
    /// Returns [`Error::OptionsParse`] when serialization fails and
    /// [`Error::Io`] when the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::OptionsParse(e.to_string()))?;
        std::fs::write(path, content).map_err(Error::Io)
    }
}

impl CameraOptions {
    /// Build a [`Camera`] for a frame with the given aspect ratio.
    #[must_use]
    pub fn build(&self, aspect: f32) -> Camera {
        Camera::new(
            Vec3::from_array(self.pos),
            Vec3::from_array(self.at),
            Vec3::from_array(self.up),
            self.fovy_degrees.to_radians(),
            self.near,
            self.far,
            aspect,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_toml() {
        let opts = RenderOptions::default();
        let toml_str = toml::to_string_pretty(&opts).unwrap();
        let parsed: RenderOptions = toml::from_str(&toml_str).unwrap();
        assert_eq!(opts, parsed);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_str = r"
[raster]
threads = 4
";
        let opts: RenderOptions = toml::from_str(toml_str).unwrap();
        assert_eq!(opts.raster.threads, 4);
        // Everything else should be default
        assert_eq!(opts.raster.tile_size, [8, 8]);
        assert_eq!(opts.frame.width, 640);
        assert_eq!(opts.output.path, "render.ppm");
    }

    #[test]
    fn camera_options_build_radian_camera() {
        let opts = CameraOptions {
            fovy_degrees: 63.0,
            ..Default::default()
        };
        let cam = opts.build(16.0 / 9.0);
        assert!((cam.fovy - 63.0_f32.to_radians()).abs() < 1e-6);
        assert!((cam.aspect - 16.0 / 9.0).abs() < 1e-6);
        assert_eq!(cam.pos, Vec3::new(0.0, 0.0, -10.0));
    }

    #[test]
    fn save_and_load_round_trip() {
        let path = std::env::temp_dir().join(format!(
            "stipple-options-{}.toml",
            std::process::id()
        ));
        let opts = RenderOptions {
            frame: FrameOptions {
                width: 128,
                ..Default::default()
            },
            camera: CameraOptions {
                fovy_degrees: 45.0,
                ..Default::default()
            },
            ..Default::default()
        };

        opts.save(&path).unwrap();
        let loaded = RenderOptions::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(opts, loaded);
    }
}
