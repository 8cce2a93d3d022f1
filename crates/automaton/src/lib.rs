//! CPU reference pipeline for a three-channel continuous cellular automaton.
//!
//! Each frame runs a conditional interaction pass (brush, reseed, clear), a
//! convolution-based update with birth/survival growth lobes and a 3x3
//! channel coupling matrix, and a present pass, over a double-buffered grid.
//! Per-cell work is spread across grid rows with `rayon`.
//!
//! Types:
//! - [`Pipeline`]: lifecycle API (`initialize`, `tick`, `resize`, `destroy`).
//! - [`Parameters`] / [`PointerState`]: per-frame input snapshots.
//! - [`Grid`], [`StateStore`], [`KernelImage`], [`KernelTaps`]: data model.

pub mod error;
pub mod grid;
pub mod growth;
pub mod hash;
pub mod interaction;
pub mod kernel;
pub mod params;
pub mod present;
pub mod scheduler;
pub mod store;
pub mod update;

pub use error::{AllocationError, PipelineError};
pub use grid::{Extent, Grid, Rgb, CHANNELS, MAX_GRID_SIDE};
pub use growth::{GrowthFunction, Lobe};
pub use interaction::{CellOverride, InteractionStage, WARMUP_FRAMES};
pub use kernel::{KernelImage, KernelTaps, Tap};
pub use params::{ColorMix, KernelProfile, Parameters, PointerState};
pub use present::PresentStage;
pub use scheduler::{
    FrameCounter, FrameScheduler, KernelPolicy, Pipeline, ResizeHandle, SchedulerState,
};
pub use store::StateStore;
pub use update::UpdateStage;
