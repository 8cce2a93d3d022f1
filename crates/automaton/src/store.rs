use crate::error::AllocationError;
use crate::grid::{Extent, Grid};

/// Double buffer of grids with fixed read/write roles per frame.
#[derive(Debug, Clone)]
pub struct StateStore {
    read: Grid,
    write: Grid,
}

impl StateStore {
    /// Allocates both buffers at `extent`, cleared to black.
    pub fn new(extent: Extent) -> Result<Self, AllocationError> {
        let read = Grid::new(extent)?;
        let write = Grid::new(extent)?;
        Ok(Self { read, write })
    }

    /// Builds a store whose read buffer starts from `initial`.
    pub fn from_grid(initial: Grid) -> Result<Self, AllocationError> {
        let write = Grid::new(initial.extent())?;
        Ok(Self {
            read: initial,
            write,
        })
    }

    pub fn extent(&self) -> Extent {
        self.read.extent()
    }

    pub fn current_read(&self) -> &Grid {
        &self.read
    }

    pub fn current_write(&mut self) -> &mut Grid {
        &mut self.write
    }

    /// Borrows the read buffer and the write buffer at the same time.
    pub fn split(&mut self) -> (&Grid, &mut Grid) {
        (&self.read, &mut self.write)
    }

    /// Copies the write buffer into the read buffer without changing roles.
    pub fn promote_write(&mut self) {
        self.read.copy_from(&self.write);
    }

    /// Exchanges roles; called once per completed frame.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.read, &mut self.write);
    }
}
