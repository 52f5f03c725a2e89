// -- Lint policy ---------------------------------------------------------
// Mirrors the [lints] tables in Cargo.toml.

// Broad lint groups
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Unused / redundant code
#![deny(unused_qualifications)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]
// Graphics math allowances (see Cargo.toml for the full rationale)
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::float_cmp)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::similar_names)]
#![allow(clippy::suboptimal_flops)]
#![allow(clippy::unreadable_literal)]
#![allow(clippy::too_many_arguments)]

//! CPU software rasterizer for 3D Gaussian Splatting point clouds.
//!
//! Stipple loads a pre-trained splat model — anisotropic 3D Gaussians with
//! position, color, opacity, and covariance — and renders it from a pinhole
//! camera by alpha-compositing the Gaussians' screen-space projections in
//! view-depth order, entirely on the CPU.
//!
//! # Key entry points
//!
//! - [`model::GaussianModel`] - the loaded point cloud
//! - [`raster::RasterContext`] - per-frame preprocessing and tiled,
//!   multithreaded compositing
//! - [`camera::Camera`] - look-at view and perspective projection
//! - [`options::RenderOptions`] - runtime configuration with TOML presets
//!
//! # Architecture
//!
//! Each frame runs two phases. `preprocess` is single-threaded: it culls
//! the cloud against the view frustum, depth-sorts the survivors, projects
//! each 3D covariance to a screen-space ellipse, and bins splats into
//! fixed-size screen tiles (a compressed-sparse-row layout of counts,
//! offsets, and packed indices). `render` then composites every tile
//! independently on a fixed worker pool; tiles own disjoint pixel
//! rectangles, so workers never synchronize on the framebuffer.

pub mod camera;
pub mod error;
pub mod frame;
pub mod model;
pub mod options;
pub mod pool;
pub mod ppm;
pub mod raster;

pub use camera::Camera;
pub use error::Error;
pub use frame::Frame;
pub use model::GaussianModel;
pub use options::RenderOptions;
pub use raster::RasterContext;
