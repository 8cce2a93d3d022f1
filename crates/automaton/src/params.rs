use serde::{Deserialize, Serialize};

use crate::grid::{Extent, Rgb, CHANNELS};

/// Row-major 3x3 channel coupling matrix; row `i` mixes the growth of every
/// channel into channel `i`.
pub type ColorMix = [[f32; CHANNELS]; CHANNELS];

/// Shape of the convolution kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum KernelProfile {
    /// Outer ring plus inner core disk; the core drives the birth/survival mix.
    #[default]
    RingCore,
    /// Single smooth disk with no core; the cell's own value drives the mix.
    Unimodal,
}

impl KernelProfile {
    pub fn as_str(self) -> &'static str {
        match self {
            KernelProfile::RingCore => "ring-core",
            KernelProfile::Unimodal => "unimodal",
        }
    }
}

/// Immutable per-frame snapshot of every tunable of the automaton.
///
/// The scheduler receives a copy each frame so a concurrent editor can never
/// hand the core a half-updated configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Parameters {
    /// Integration step applied to the coupled growth rate.
    pub dt: f32,
    /// Kernel footprint radius in cells.
    pub outer_radius: f32,
    /// Core radius relative to the outer radius.
    pub ratio_of_radii: f32,
    pub birth1: f32,
    pub birth2: f32,
    pub survival1: f32,
    pub survival2: f32,
    /// Edge softness of the birth lobe, as a fraction of its half width.
    pub fullness1: f32,
    /// Edge softness of the survival lobe, as a fraction of its half width.
    pub fullness2: f32,
    pub color_mix: ColorMix,
    pub brush_radius: f32,
    pub brush_color: Rgb,
    pub kernel_profile: KernelProfile,
    /// Reseed trigger; transient input, never persisted.
    #[serde(skip)]
    pub random_seed: bool,
    /// Clear trigger; transient input, never persisted.
    #[serde(skip)]
    pub kill: bool,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            dt: 0.3,
            outer_radius: 13.0,
            ratio_of_radii: 0.5,
            birth1: 0.278,
            birth2: 0.365,
            survival1: 0.267,
            survival2: 0.445,
            fullness1: 0.3,
            fullness2: 0.3,
            color_mix: [[0.5; CHANNELS]; CHANNELS],
            brush_radius: 15.0,
            brush_color: [0.8, 0.9, 1.0],
            kernel_profile: KernelProfile::RingCore,
            random_seed: false,
            kill: false,
        }
    }
}

impl Parameters {
    /// Identity coupling: each channel evolves from its own growth only.
    pub fn identity_mix() -> ColorMix {
        let mut mix = [[0.0; CHANNELS]; CHANNELS];
        for (i, row) in mix.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        mix
    }

    /// Whether the kernel built for `self` differs from one built for `other`.
    pub fn kernel_differs(&self, other: &Parameters) -> bool {
        self.outer_radius.to_bits() != other.outer_radius.to_bits()
            || self.ratio_of_radii.to_bits() != other.ratio_of_radii.to_bits()
            || self.kernel_profile != other.kernel_profile
    }

    /// Iterates every scalar field with its name, for validation.
    pub fn scalars(&self) -> impl Iterator<Item = (String, f32)> + '_ {
        let named = [
            ("dt", self.dt),
            ("outer_radius", self.outer_radius),
            ("ratio_of_radii", self.ratio_of_radii),
            ("birth1", self.birth1),
            ("birth2", self.birth2),
            ("survival1", self.survival1),
            ("survival2", self.survival2),
            ("fullness1", self.fullness1),
            ("fullness2", self.fullness2),
            ("brush_radius", self.brush_radius),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value));
        let mix = self.color_mix.iter().enumerate().flat_map(|(i, row)| {
            row.iter()
                .enumerate()
                .map(move |(j, value)| (format!("color_mix[{i}][{j}]"), *value))
        });
        let brush = self
            .brush_color
            .iter()
            .enumerate()
            .map(|(i, value)| (format!("brush_color[{i}]"), *value));
        named.chain(mix).chain(brush)
    }
}

/// Pointer position in grid coordinates plus the primary-button state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerState {
    pub position: [f32; 2],
    pub held: bool,
}

impl PointerState {
    pub fn new(x: f32, y: f32, held: bool) -> Self {
        Self {
            position: [x, y],
            held,
        }
    }

    /// Released pointer resting on the grid centre.
    pub fn centered(extent: Extent) -> Self {
        Self {
            position: extent.center(),
            held: false,
        }
    }
}
