use automaton::{Extent, KernelTaps, Parameters, PointerState, WARMUP_FRAMES};
use bytemuck::{Pod, Zeroable};

/// Per-frame uniform block shared by every simulation pass.
///
/// Only `vec4`/`uvec4` members so the Rust layout matches std140 without
/// manual padding. Field order must match `SimParams` in `compile.rs`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub(crate) struct SimUniforms {
    /// Grid width/height, surface width/height.
    pub resolution: [f32; 4],
    /// Pointer x/y in cells, brush-active flag, brush radius.
    pub pointer: [f32; 4],
    /// Brush rgb, dt.
    pub brush: [f32; 4],
    /// birth1, birth2, fullness1.
    pub birth: [f32; 4],
    /// survival1, survival2, fullness2.
    pub survival: [f32; 4],
    /// Ring weight sum, core weight sum, core-present flag.
    pub kernel: [f32; 4],
    /// Frame (low 32 bits), kernel reach, reseed flag, clear flag.
    pub counters: [u32; 4],
    /// Rows of the coupling matrix.
    pub color_mix: [[f32; 4]; 3],
}

impl SimUniforms {
    pub fn new(
        extent: Extent,
        surface: (u32, u32),
        params: &Parameters,
        pointer: PointerState,
        frame: u64,
        taps: &KernelTaps,
    ) -> Self {
        let brush_active = pointer.held || frame < WARMUP_FRAMES;
        let mut color_mix = [[0.0; 4]; 3];
        for (row, source) in color_mix.iter_mut().zip(params.color_mix.iter()) {
            row[..3].copy_from_slice(source);
        }
        Self {
            resolution: [
                extent.width as f32,
                extent.height as f32,
                surface.0.max(1) as f32,
                surface.1.max(1) as f32,
            ],
            pointer: [
                pointer.position[0],
                pointer.position[1],
                flag(brush_active),
                params.brush_radius,
            ],
            brush: [
                params.brush_color[0],
                params.brush_color[1],
                params.brush_color[2],
                params.dt,
            ],
            birth: [params.birth1, params.birth2, params.fullness1, 0.0],
            survival: [params.survival1, params.survival2, params.fullness2, 0.0],
            kernel: [
                taps.ring_sum(),
                taps.core_sum(),
                flag(taps.has_core()),
                0.0,
            ],
            counters: [
                frame as u32,
                taps.reach(),
                params.random_seed as u32,
                params.kill as u32,
            ],
            color_mix,
        }
    }
}

fn flag(value: bool) -> f32 {
    if value {
        1.0
    } else {
        0.0
    }
}
