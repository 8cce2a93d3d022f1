use crate::error::AllocationError;
use crate::grid::{Extent, Grid};

/// Owned output surface receiving a copy of each freshly written buffer.
#[derive(Debug, Clone)]
pub struct PresentStage {
    output: Grid,
}

impl PresentStage {
    pub fn new(extent: Extent) -> Result<Self, AllocationError> {
        Ok(Self {
            output: Grid::new(extent)?,
        })
    }

    pub fn present(&mut self, source: &Grid) {
        self.output.copy_from(source);
    }

    pub fn output(&self) -> &Grid {
        &self.output
    }
}
