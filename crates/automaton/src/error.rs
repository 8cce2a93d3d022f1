use crate::scheduler::SchedulerState;

/// Raised when grid or kernel storage cannot be created at the requested extent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    #[error("grid extent {width}x{height} has no cells")]
    EmptyExtent { width: u32, height: u32 },
    #[error("grid extent {width}x{height} exceeds the {limit} cell side limit")]
    TooLarge { width: u32, height: u32, limit: u32 },
    #[error("failed to reserve {cells} cells for {what}")]
    OutOfMemory { what: &'static str, cells: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("pipeline allocation failed: {0}")]
    Allocation(#[from] AllocationError),
    #[error("pipeline is not running (state: {0:?})")]
    NotRunning(SchedulerState),
}
