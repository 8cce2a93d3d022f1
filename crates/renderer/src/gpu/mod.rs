//! GPU implementation of the simulation pipeline.
//!
//! - `context` owns the wgpu instance, device and swapchain.
//! - `textures` holds the ping-pong state buffers and the kernel tap table.
//! - `pipeline` builds the interaction, update and present render pipelines.
//! - `uniforms` packs the per-frame parameter snapshot for the shaders.
//! - `state` sequences a frame and exposes `GpuSimulation` to `window`.

mod context;
mod pipeline;
mod state;
mod textures;
mod uniforms;

pub(crate) use state::{FrameError, GpuSimulation};
