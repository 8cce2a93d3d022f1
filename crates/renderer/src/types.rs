use automaton::{KernelPolicy, Parameters};

/// Adapter selection hint forwarded to `wgpu`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    /// Prefer integrated or otherwise power-saving adapters.
    Low,
    /// Prefer discrete adapters.
    #[default]
    High,
}

impl GpuPowerPreference {
    pub(crate) fn to_wgpu(self) -> wgpu::PowerPreference {
        match self {
            GpuPowerPreference::Low => wgpu::PowerPreference::LowPower,
            GpuPowerPreference::High => wgpu::PowerPreference::HighPerformance,
        }
    }
}

/// A parameter set the window can switch to at run time.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedPreset {
    pub name: String,
    pub params: Parameters,
}

impl NamedPreset {
    pub fn new(name: impl Into<String>, params: Parameters) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }
}

/// Immutable configuration passed to the renderer at start-up.
///
/// `RendererConfig` mirrors the CLI flags: how large the simulation grid is,
/// how many window pixels each cell covers, and which presets the window can
/// cycle through.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Simulation grid size in cells.
    pub grid_size: (u32, u32),
    /// Window pixels per grid cell along each axis.
    pub scale: u32,
    /// Optional FPS cap; `None` renders on every vsync.
    pub target_fps: Option<f32>,
    pub gpu_power: GpuPowerPreference,
    /// Whether kernel-shaping parameter changes rebuild the kernel.
    pub kernel_policy: KernelPolicy,
    /// Presets reachable with `Tab`; never empty.
    pub presets: Vec<NamedPreset>,
    /// Index into `presets` to start with.
    pub initial_preset: usize,
    pub title: String,
}

impl RendererConfig {
    /// Window size in physical pixels.
    pub fn window_size(&self) -> (u32, u32) {
        let scale = self.scale.max(1);
        (
            self.grid_size.0.saturating_mul(scale),
            self.grid_size.1.saturating_mul(scale),
        )
    }

    pub fn initial_preset(&self) -> NamedPreset {
        self.presets
            .get(self.initial_preset)
            .or_else(|| self.presets.first())
            .cloned()
            .unwrap_or_else(|| NamedPreset::new("default", Parameters::default()))
    }
}

impl Default for RendererConfig {
    /// A 512x512 grid shown at 2x with the default parameter block.
    fn default() -> Self {
        Self {
            grid_size: (512, 512),
            scale: 2,
            target_fps: None,
            gpu_power: GpuPowerPreference::default(),
            kernel_policy: KernelPolicy::default(),
            presets: vec![NamedPreset::new("default", Parameters::default())],
            initial_preset: 0,
            title: "chromalife".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_size_scales_grid() {
        let config = RendererConfig {
            grid_size: (300, 200),
            scale: 3,
            ..RendererConfig::default()
        };
        assert_eq!(config.window_size(), (900, 600));

        let zero = RendererConfig {
            scale: 0,
            ..config
        };
        assert_eq!(zero.window_size(), (300, 200));
    }

    #[test]
    fn initial_preset_falls_back() {
        let mut config = RendererConfig {
            initial_preset: 7,
            ..RendererConfig::default()
        };
        assert_eq!(config.initial_preset().name, "default");
        config.presets.clear();
        assert_eq!(config.initial_preset().params, Parameters::default());
    }
}
