use std::fmt;

use crate::error::AllocationError;

/// Every cell carries exactly three channels (red, green, blue).
pub const CHANNELS: usize = 3;

/// Largest accepted grid side, matching the common GPU 2D texture limit.
pub const MAX_GRID_SIDE: u32 = 16_384;

/// One cell worth of channel values.
pub type Rgb = [f32; CHANNELS];

/// Width and height of a grid in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of cells, or the reason the extent cannot back a grid.
    pub fn cell_count(self) -> Result<usize, AllocationError> {
        if self.width == 0 || self.height == 0 {
            return Err(AllocationError::EmptyExtent {
                width: self.width,
                height: self.height,
            });
        }
        if self.width > MAX_GRID_SIDE || self.height > MAX_GRID_SIDE {
            return Err(AllocationError::TooLarge {
                width: self.width,
                height: self.height,
                limit: MAX_GRID_SIDE,
            });
        }
        Ok(self.width as usize * self.height as usize)
    }

    /// Grid-space centre, used as the default pointer position.
    pub fn center(self) -> [f32; 2] {
        [self.width as f32 / 2.0, self.height as f32 / 2.0]
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Dense row-major grid of three-channel cells.
///
/// Values are nominally in `[0, 1]` but the grid itself does not clamp;
/// enforcing the range is the job of the stage that writes it.
#[derive(Clone, PartialEq)]
pub struct Grid {
    extent: Extent,
    cells: Vec<Rgb>,
}

impl Grid {
    /// Allocates a zeroed (black) grid.
    pub fn new(extent: Extent) -> Result<Self, AllocationError> {
        let count = extent.cell_count()?;
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(count)
            .map_err(|_| AllocationError::OutOfMemory {
                what: "grid",
                cells: count,
            })?;
        cells.resize(count, [0.0; CHANNELS]);
        Ok(Self { extent, cells })
    }

    /// Allocates a grid and fills it from a per-cell function of `(x, y)`.
    pub fn from_fn<F>(extent: Extent, mut f: F) -> Result<Self, AllocationError>
    where
        F: FnMut(u32, u32) -> Rgb,
    {
        let mut grid = Self::new(extent)?;
        let width = extent.width as usize;
        for (index, cell) in grid.cells.iter_mut().enumerate() {
            *cell = f((index % width) as u32, (index / width) as u32);
        }
        Ok(grid)
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn width(&self) -> u32 {
        self.extent.width
    }

    pub fn height(&self) -> u32 {
        self.extent.height
    }

    pub fn cells(&self) -> &[Rgb] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [Rgb] {
        &mut self.cells
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        debug_assert!(x < self.extent.width && y < self.extent.height);
        y as usize * self.extent.width as usize + x as usize
    }

    pub fn get(&self, x: u32, y: u32) -> Rgb {
        self.cells[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, value: Rgb) {
        let index = self.index(x, y);
        self.cells[index] = value;
    }

    /// Reads a cell with toroidal wrapping on both axes.
    #[inline]
    pub fn get_wrapped(&self, x: i64, y: i64) -> Rgb {
        let wx = x.rem_euclid(self.extent.width as i64) as usize;
        let wy = y.rem_euclid(self.extent.height as i64) as usize;
        self.cells[wy * self.extent.width as usize + wx]
    }

    pub fn fill(&mut self, value: Rgb) {
        self.cells.fill(value);
    }

    /// Overwrites this grid with the contents of an equally sized grid.
    ///
    /// # Panics
    ///
    /// Panics if the extents differ; double buffers never change size
    /// independently.
    pub fn copy_from(&mut self, other: &Grid) {
        assert_eq!(
            self.extent, other.extent,
            "grid copy between mismatched extents"
        );
        self.cells.copy_from_slice(&other.cells);
    }

    /// Quantizes to tightly packed RGB8.
    pub fn to_rgb8(&self) -> Vec<u8> {
        self.cells
            .iter()
            .flat_map(|cell| cell.iter().map(|&value| quantize(value)))
            .collect()
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grid")
            .field("extent", &self.extent)
            .field("cells", &self.cells.len())
            .finish()
    }
}

fn quantize(value: f32) -> u8 {
    // NaN saturates to 0 through the float-to-int cast.
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}
