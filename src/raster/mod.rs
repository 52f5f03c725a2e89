//! Tiled CPU rasterizer for Gaussian splat models.
//!
//! A [`RasterContext`] binds a model to a frame geometry and owns every
//! per-frame buffer plus the worker pool. Each frame runs two phases:
//! [`RasterContext::preprocess`] (single-threaded culling, depth sort,
//! screen-space covariances, and CSR tile binning) followed by
//! [`RasterContext::render`] (parallel per-tile compositing into the
//! caller's frame).

mod kernel;
mod preprocess;
mod shared;
mod tiles;

use glam::{UVec2, Vec2};

use self::kernel::{RenderJob, TileBatch};
use self::preprocess::{FovScales, InvCov2, TransformedPoint};
use self::shared::{SharedSlice, SharedSliceMut};
use self::tiles::TileGrid;
use crate::camera::Camera;
use crate::error::Error;
use crate::frame::Frame;
use crate::model::GaussianModel;
use crate::pool::WorkerPool;

/// Default worker thread count.
const DEFAULT_THREADS: usize = 16;

/// Default number of contiguous tiles per work item.
const DEFAULT_TILE_BATCH: usize = 32;

/// Per-model, per-frame-geometry rasterizer state, reused across frames.
///
/// The context borrows the model for its whole lifetime; dropping the
/// context stops the worker pool.
pub struct RasterContext<'m> {
    model: &'m GaussianModel,
    grid: TileGrid,
    width: usize,
    height: usize,

    /// Compact prefix of culling survivors, depth-sorted per frame.
    trans_points: Vec<TransformedPoint>,
    /// Screen-space splat centers, by original index.
    screen_pts: Vec<Vec2>,
    /// Splat radii in pixels, by original index.
    radii: Vec<f32>,
    /// Inverse screen covariances, by original index.
    inv_cov2d: Vec<InvCov2>,

    /// Per-tile survivor counts (CSR).
    counts: Vec<u32>,
    /// Exclusive prefix sums of `counts`, length tile_count + 1 (CSR).
    offsets: Vec<u32>,
    /// Binned original indices, front-to-back per tile (CSR payload).
    indices: Vec<u32>,

    /// Per-tile transmittance slabs for the kernels.
    throughputs: Vec<[f32; 3]>,
    /// Per-tile saturation flags, parallel to `throughputs`.
    done: Vec<u8>,

    pool: WorkerPool<TileBatch>,
    tile_batch: usize,
}

impl<'m> RasterContext<'m> {
    /// Create a context with the default pool geometry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ThreadSpawn`] when a worker cannot be spawned.
    ///
    /// # Panics
    ///
    /// Panics when a tile dimension is zero.
    pub fn new(
        model: &'m GaussianModel,
        frame: &Frame,
        tile_size: UVec2,
    ) -> Result<Self, Error> {
        Self::with_pool(
            model,
            frame,
            tile_size,
            DEFAULT_THREADS,
            DEFAULT_TILE_BATCH,
        )
    }

    /// Create a context with an explicit worker count and batch size.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ThreadSpawn`] when a worker cannot be spawned.
    ///
    /// # Panics
    ///
    /// Panics when a tile dimension is zero.
    pub fn with_pool(
        model: &'m GaussianModel,
        frame: &Frame,
        tile_size: UVec2,
        threads: usize,
        tile_batch: usize,
    ) -> Result<Self, Error> {
        assert!(
            tile_size.x > 0 && tile_size.y > 0,
            "tile dimensions must be positive"
        );
        let grid = TileGrid::new(frame.width, frame.height, tile_size);
        let n = model.len();
        let tile_count = grid.tile_count();

        Ok(Self {
            model,
            grid,
            width: frame.width,
            height: frame.height,
            trans_points: Vec::with_capacity(n),
            screen_pts: vec![Vec2::ZERO; n],
            radii: vec![0.0; n],
            inv_cov2d: vec![InvCov2::default(); n],
            counts: vec![0; tile_count],
            offsets: vec![0; tile_count + 1],
            indices: Vec::new(),
            throughputs: vec![[1.0; 3]; grid.scratch_len()],
            done: vec![0; grid.scratch_len()],
            pool: WorkerPool::new(threads, kernel::render_batch)?,
            tile_batch: tile_batch.max(1),
        })
    }

    /// Number of Gaussians that survived culling in the last
    /// [`RasterContext::preprocess`].
    #[must_use]
    pub fn survivors(&self) -> usize {
        self.trans_points.len()
    }

    /// Run the per-frame geometry phase: culling, depth sort,
    /// screen-space covariances, and tile binning.
    ///
    /// Derived camera axes are written back through `camera`.
    pub fn preprocess(&mut self, camera: &mut Camera, frame: &Frame) {
        debug_assert_eq!(frame.width, self.width);
        debug_assert_eq!(frame.height, self.height);

        let view = camera.view();
        let proj = camera.projection();
        let fov = FovScales::new(camera, frame);

        self.counts.fill(0);

        preprocess::cull_points(
            self.model,
            &view,
            &proj,
            frame,
            &mut self.trans_points,
        );

        // Front-to-back: ascending view depth, nearest splat first.
        self.trans_points
            .sort_unstable_by(|a, b| a.view.z.total_cmp(&b.view.z));

        let ntx = self.grid.tiles.x;
        for point in &mut self.trans_points {
            let idx = point.idx as usize;
            let cov = preprocess::project_covariance(
                point.view,
                &view,
                &self.model.cov3d[idx],
                &fov,
            );
            let Some(extent) = preprocess::splat_extent(cov) else {
                continue;
            };
            let Some((rect_min, rect_max)) = preprocess::splat_rect(
                point.screen,
                extent.radius,
                frame.width,
                frame.height,
            ) else {
                continue;
            };
            let range = self.grid.range_for_rect(rect_min, rect_max);
            if range.is_empty() {
                continue;
            }

            for ty in range.y0..range.y1 {
                for tx in range.x0..range.x1 {
                    self.counts[(ty * ntx + tx) as usize] += 1;
                }
            }

            point.tiles = range;
            self.inv_cov2d[idx] = extent.inv;
            self.radii[idx] = extent.radius;
            self.screen_pts[idx] = point.screen;
        }

        // Exclusive prefix sum, then size the payload exactly: every
        // in-range splat lands in every tile it touches.
        self.offsets[0] = 0;
        for tile in 0..self.grid.tile_count() {
            self.offsets[tile + 1] = self.offsets[tile] + self.counts[tile];
        }
        let total = self.offsets[self.grid.tile_count()] as usize;
        self.indices.resize(total, 0);

        // Scatter in sorted order so each bin stays front-to-back.
        self.counts.fill(0);
        for point in &self.trans_points {
            let range = point.tiles;
            for ty in range.y0..range.y1 {
                for tx in range.x0..range.x1 {
                    let tile = (ty * ntx + tx) as usize;
                    let slot = (self.offsets[tile] + self.counts[tile]) as usize;
                    self.indices[slot] = point.idx;
                    self.counts[tile] += 1;
                }
            }
        }
    }

    /// Composite the binned splats into the caller's frame.
    ///
    /// Tiles run in parallel on the worker pool; the call returns after
    /// every tile has completed. The frame is not cleared first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolShutdown`] when the pool no longer accepts
    /// work; tiles already submitted still complete before the error is
    /// returned.
    pub fn render(&mut self, frame: &mut Frame) -> Result<(), Error> {
        debug_assert_eq!(frame.width, self.width);
        debug_assert_eq!(frame.height, self.height);

        // SAFETY: all views are released before this function returns —
        // the pool barrier below outlives every worker access — and each
        // tile touches a disjoint pixel rectangle and scratch slab.
        let job = unsafe {
            RenderJob {
                colors: SharedSlice::new(&self.model.colors),
                opacities: SharedSlice::new(&self.model.opacities),
                inv_cov2d: SharedSlice::new(&self.inv_cov2d),
                radii: SharedSlice::new(&self.radii),
                screen_pts: SharedSlice::new(&self.screen_pts),
                offsets: SharedSlice::new(&self.offsets),
                indices: SharedSlice::new(&self.indices),
                pixels: SharedSliceMut::new(&mut frame.pixels),
                throughputs: SharedSliceMut::new(&mut self.throughputs),
                done: SharedSliceMut::new(&mut self.done),
                grid: self.grid,
                width: self.width,
                height: self.height,
            }
        };

        let tile_count = self.grid.tile_count();
        let mut result = Ok(());
        let mut start = 0;
        while start < tile_count {
            let end = (start + self.tile_batch).min(tile_count);
            if let Err(e) = self.pool.submit(TileBatch { job, start, end }) {
                result = Err(e);
                break;
            }
            start = end;
        }

        self.pool.wait();
        result
    }
}
