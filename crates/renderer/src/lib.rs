//! GPU renderer and interactive window for chromalife.
//!
//! The crate runs the continuous automaton from `automaton` on the GPU and
//! shows it in a `winit` window. The overall flow is:
//!
//! ```text
//!   chromalife CLI
//!          │ RendererConfig
//!          ▼
//!   Renderer::run ──▶ WindowState ──▶ winit event loop ──▶ render_frame()
//!                                                 │
//!                 interaction ─▶ promote ─▶ update ─▶ present ─▶ swap
//! ```
//!
//! `WindowState` turns mouse and keyboard input into a `PointerState` and a
//! per-frame `Parameters` snapshot. `GpuSimulation` owns the ping-pong state
//! textures, the kernel tap texture and the three fragment pipelines, and
//! runs the same frame sequence as the CPU `automaton::Pipeline`.

mod compile;
mod gpu;
mod runtime;
mod types;
mod window;

use anyhow::Result;

pub use types::{GpuPowerPreference, NamedPreset, RendererConfig};

/// Entry point that owns the chosen configuration.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Opens the window and blocks until it is closed.
    ///
    /// Fails when no window system or compatible GPU adapter is available.
    pub fn run(&mut self) -> Result<()> {
        tracing::info!(
            width = self.config.grid_size.0,
            height = self.config.grid_size.1,
            scale = self.config.scale,
            presets = self.config.presets.len(),
            "starting renderer"
        );
        window::run_window(self.config.clone())
    }
}
