//! Per-tile front-to-back alpha compositing.
//!
//! One kernel invocation owns one tile: a disjoint pixel rectangle of the
//! frame plus that tile's slice of the context's scratch slabs. Workers
//! receive [`TileBatch`] records by value and run tiles sequentially
//! within a batch.

use glam::{Vec2, Vec3};

use super::preprocess::InvCov2;
use super::shared::{SharedSlice, SharedSliceMut};
use super::tiles::TileGrid;

/// Compositing stops once every channel's transmittance falls below this.
const MIN_TRANSMITTANCE: f32 = 1e-3;

/// Contributions below one display quantum are skipped.
const MIN_ALPHA: f32 = 1.0 / 255.0;

/// Opacity ceiling; keeps a sliver of transmittance behind every splat.
const MAX_ALPHA: f32 = 0.99;

/// Everything one tile kernel needs, as plain views into the context, the
/// model, and the caller's frame.
///
/// Copies of this record travel to the worker threads inside
/// [`TileBatch`]; the views stay valid because the submitting thread
/// blocks on the pool barrier before releasing the borrows they were
/// built from.
#[derive(Clone, Copy)]
pub(crate) struct RenderJob {
    /// Model colors, by original index.
    pub colors: SharedSlice<Vec3>,
    /// Model opacities, by original index.
    pub opacities: SharedSlice<f32>,
    /// Inverse screen covariances, by original index.
    pub inv_cov2d: SharedSlice<InvCov2>,
    /// Splat radii in pixels, by original index.
    pub radii: SharedSlice<f32>,
    /// Screen-space splat centers, by original index.
    pub screen_pts: SharedSlice<Vec2>,
    /// CSR bin offsets, length tile_count + 1.
    pub offsets: SharedSlice<u32>,
    /// CSR bin payload: original indices, front-to-back per tile.
    pub indices: SharedSlice<u32>,
    /// Output pixels; each tile writes a disjoint rectangle.
    pub pixels: SharedSliceMut<[f32; 3]>,
    /// Per-tile transmittance slabs, `tile_area` elements per tile.
    pub throughputs: SharedSliceMut<[f32; 3]>,
    /// Per-tile saturation flags, parallel to `throughputs`.
    pub done: SharedSliceMut<u8>,
    /// Tiling of the frame.
    pub grid: TileGrid,
    /// Frame width in pixels.
    pub width: usize,
    /// Frame height in pixels.
    pub height: usize,
}

/// One work item: a contiguous run of tiles.
#[derive(Clone, Copy)]
pub(crate) struct TileBatch {
    pub job: RenderJob,
    pub start: usize,
    pub end: usize,
}

/// Pool handler: run every tile of the batch on this worker.
pub(crate) fn render_batch(batch: TileBatch) {
    let tile_count = batch.job.grid.tile_count();
    for tile in batch.start..batch.end.min(tile_count) {
        render_tile(&batch.job, tile);
    }
}

fn render_tile(job: &RenderJob, tile: usize) {
    let begin = job.offsets.get(tile) as usize;
    let end = job.offsets.get(tile + 1) as usize;
    if begin == end {
        // Empty bin: neither the scratch slabs nor the output rectangle
        // are touched.
        return;
    }

    let win = job.grid.window(tile, job.width, job.height);
    let tile_w = win.x1 - win.x0;
    let base = tile * job.grid.tile_area();

    for local in 0..job.grid.tile_area() {
        job.throughputs.set(base + local, [1.0; 3]);
        job.done.set(base + local, 0);
    }

    for bin_pos in begin..end {
        let idx = job.indices.get(bin_pos) as usize;
        let color = job.colors.get(idx);
        let opacity = job.opacities.get(idx);
        let con = job.inv_cov2d.get(idx);
        let radius = job.radii.get(idx);
        let p = job.screen_pts.get(idx);

        // Intersection of the splat's pixel window with the tile.
        let sx0 = ((p.x - radius).floor().max(0.0) as usize).max(win.x0);
        let sy0 = ((p.y - radius).floor().max(0.0) as usize).max(win.y0);
        let sx1 = ((p.x + radius + 1.0).max(0.0) as usize).min(win.x1);
        let sy1 = ((p.y + radius + 1.0).max(0.0) as usize).min(win.y1);

        for y in sy0..sy1 {
            for x in sx0..sx1 {
                let local = (y - win.y0) * tile_w + (x - win.x0);
                if job.done.get(base + local) != 0 {
                    continue;
                }

                let d = Vec2::new(p.x - x as f32, p.y - y as f32);
                let power = -0.5
                    * (con.xx * d.x * d.x + con.yy * d.y * d.y)
                    - con.xy * d.x * d.y;
                if power > 0.0 {
                    continue;
                }

                let alpha = (opacity * power.exp()).min(MAX_ALPHA);
                if alpha < MIN_ALPHA {
                    continue;
                }

                let t = job.throughputs.get(base + local);
                let pixel_idx = y * job.width + x;
                let mut px = job.pixels.get(pixel_idx);
                px[0] += color.x * alpha * t[0];
                px[1] += color.y * alpha * t[1];
                px[2] += color.z * alpha * t[2];
                job.pixels.set(pixel_idx, px);

                let t = [
                    t[0] * (1.0 - alpha),
                    t[1] * (1.0 - alpha),
                    t[2] * (1.0 - alpha),
                ];
                job.throughputs.set(base + local, t);

                if t[0].min(t[1]).min(t[2]) < MIN_TRANSMITTANCE {
                    job.done.set(base + local, 1);
                }
            }
        }
    }
}
