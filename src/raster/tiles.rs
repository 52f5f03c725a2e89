//! Tile grid math: pixel windows and splat-rect → tile ranges.

use glam::UVec2;

/// Fixed-size screen tiling of a frame.
///
/// Tiles are the unit of parallel work; the grid is padded up with ceiling
/// division, so edge tiles may hang past the frame and get clipped by
/// [`TileGrid::window`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct TileGrid {
    /// Tile size in pixels.
    pub tile: UVec2,
    /// Tile counts along each axis.
    pub tiles: UVec2,
}

/// Clipped pixel rectangle of one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TileWindow {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

/// Half-open tile index range `[x0, x1) × [y0, y1)` touched by one splat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TileRange {
    pub x0: u32,
    pub x1: u32,
    pub y0: u32,
    pub y1: u32,
}

impl TileRange {
    pub const EMPTY: Self = Self {
        x0: 0,
        x1: 0,
        y0: 0,
        y1: 0,
    };

    pub fn area(&self) -> usize {
        (self.x1 - self.x0) as usize * (self.y1 - self.y0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.x1 <= self.x0 || self.y1 <= self.y0
    }
}

impl TileGrid {
    pub fn new(width: usize, height: usize, tile: UVec2) -> Self {
        let tiles = UVec2::new(
            (width as u32).div_ceil(tile.x),
            (height as u32).div_ceil(tile.y),
        );
        Self { tile, tiles }
    }

    pub fn tile_count(&self) -> usize {
        (self.tiles.x * self.tiles.y) as usize
    }

    pub fn tile_area(&self) -> usize {
        (self.tile.x * self.tile.y) as usize
    }

    /// Total scratch elements covering the padded grid.
    pub fn scratch_len(&self) -> usize {
        self.tile_count() * self.tile_area()
    }

    /// Pixel window of `tile`, clipped to the frame bounds.
    pub fn window(
        &self,
        tile: usize,
        width: usize,
        height: usize,
    ) -> TileWindow {
        let tx = tile % self.tiles.x as usize;
        let ty = tile / self.tiles.x as usize;
        let x0 = tx * self.tile.x as usize;
        let y0 = ty * self.tile.y as usize;
        TileWindow {
            x0,
            y0,
            x1: (x0 + self.tile.x as usize).min(width),
            y1: (y0 + self.tile.y as usize).min(height),
        }
    }

    /// Tiles overlapped by the pixel rect `[min, max)`, clamped to the grid.
    pub fn range_for_rect(&self, min: UVec2, max: UVec2) -> TileRange {
        TileRange {
            x0: (min.x / self.tile.x).min(self.tiles.x),
            x1: max.x.div_ceil(self.tile.x).min(self.tiles.x),
            y0: (min.y / self.tile.y).min(self.tiles.y),
            y1: max.y.div_ceil(self.tile.y).min(self.tiles.y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_rounds_tile_counts_up() {
        let grid = TileGrid::new(640, 360, UVec2::new(8, 8));
        assert_eq!(grid.tiles, UVec2::new(80, 45));

        let ragged = TileGrid::new(64, 64, UVec2::new(7, 7));
        assert_eq!(ragged.tiles, UVec2::new(10, 10));
    }

    #[test]
    fn windows_cover_every_pixel_exactly_once() {
        let grid = TileGrid::new(64, 64, UVec2::new(7, 7));
        let mut covered = vec![0u8; 64 * 64];

        for tile in 0..grid.tile_count() {
            let w = grid.window(tile, 64, 64);
            for y in w.y0..w.y1 {
                for x in w.x0..w.x1 {
                    covered[y * 64 + x] += 1;
                }
            }
        }
        assert!(covered.iter().all(|&c| c == 1));
    }

    #[test]
    fn edge_windows_are_clipped() {
        let grid = TileGrid::new(10, 10, UVec2::new(8, 8));
        let last = grid.tile_count() - 1;
        let w = grid.window(last, 10, 10);
        assert_eq!(w, TileWindow { x0: 8, y0: 8, x1: 10, y1: 10 });
    }

    #[test]
    fn splat_rect_spans_expected_tiles() {
        // Splat centered at (100, 100) with radius 20 on an 8x8 tiling:
        // pixel rect [80, 121) maps to tiles 10..16 on both axes.
        let grid = TileGrid::new(640, 360, UVec2::new(8, 8));
        let range =
            grid.range_for_rect(UVec2::new(80, 80), UVec2::new(121, 121));

        assert_eq!((range.x0, range.x1), (10, 16));
        assert_eq!((range.y0, range.y1), (10, 16));
        assert_eq!(range.area(), 36);
    }

    #[test]
    fn ranges_clamp_to_the_grid() {
        let grid = TileGrid::new(64, 64, UVec2::new(8, 8));
        let range =
            grid.range_for_rect(UVec2::new(60, 0), UVec2::new(64, 200));
        assert_eq!((range.x0, range.x1), (7, 8));
        assert_eq!((range.y0, range.y1), (0, 8));

        assert!(TileRange::EMPTY.is_empty());
        assert_eq!(TileRange::EMPTY.area(), 0);
    }
}
