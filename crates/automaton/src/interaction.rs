use rayon::prelude::*;

use crate::grid::{Grid, Rgb};
use crate::hash;
use crate::params::{Parameters, PointerState};

/// Frames during which the brush paints at the pointer without a press.
pub const WARMUP_FRAMES: u64 = 10;

/// One full-grid edit. Overrides apply in list order; later ones win.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellOverride {
    /// Paint cells within `radius` of `center`.
    Brush {
        center: [f32; 2],
        radius: f32,
        color: Rgb,
    },
    /// Replace every cell with a hashed color for `frame`.
    Reseed { frame: u64 },
    /// Set every cell to black.
    Clear,
}

impl CellOverride {
    #[inline]
    fn apply(&self, x: u32, y: u32, value: Rgb) -> Rgb {
        match *self {
            CellOverride::Brush {
                center,
                radius,
                color,
            } => {
                let dx = x as f32 - center[0];
                let dy = y as f32 - center[1];
                let radius = radius.max(0.0);
                if dx * dx + dy * dy <= radius * radius {
                    color
                } else {
                    value
                }
            }
            CellOverride::Reseed { frame } => hash::random_color(x, y, frame),
            CellOverride::Clear => [0.0; 3],
        }
    }
}

/// The conditional editing pass of a frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionStage {
    overrides: Vec<CellOverride>,
}

impl InteractionStage {
    /// Collects the overrides triggered by this frame's inputs in their fixed
    /// order: brush, reseed, clear.
    pub fn plan(params: &Parameters, pointer: PointerState, frame: u64) -> Self {
        let mut overrides = Vec::with_capacity(3);
        if pointer.held || frame < WARMUP_FRAMES {
            overrides.push(CellOverride::Brush {
                center: pointer.position,
                radius: params.brush_radius,
                color: params.brush_color,
            });
        }
        if params.random_seed {
            overrides.push(CellOverride::Reseed { frame });
        }
        if params.kill {
            overrides.push(CellOverride::Clear);
        }
        Self { overrides }
    }

    pub fn is_active(&self) -> bool {
        !self.overrides.is_empty()
    }

    pub fn overrides(&self) -> &[CellOverride] {
        &self.overrides
    }

    /// Writes `read` with every override applied into `write`.
    pub fn apply(&self, read: &Grid, write: &mut Grid) {
        debug_assert_eq!(read.extent(), write.extent());
        let width = read.width() as usize;
        let source = read.cells();
        write
            .cells_mut()
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                let base = &source[y * width..(y + 1) * width];
                for (x, (out, previous)) in row.iter_mut().zip(base).enumerate() {
                    *out = self
                        .overrides
                        .iter()
                        .fold(*previous, |value, edit| edit.apply(x as u32, y as u32, value));
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Extent;

    fn released() -> PointerState {
        PointerState::new(0.0, 0.0, false)
    }

    #[test]
    fn idle_after_warmup() {
        let stage = InteractionStage::plan(&Parameters::default(), released(), WARMUP_FRAMES);
        assert!(!stage.is_active());
    }

    #[test]
    fn warmup_paints_without_press() {
        let stage = InteractionStage::plan(&Parameters::default(), released(), 0);
        assert!(matches!(stage.overrides(), [CellOverride::Brush { .. }]));
        let stage = InteractionStage::plan(&Parameters::default(), released(), WARMUP_FRAMES - 1);
        assert!(stage.is_active());
    }

    #[test]
    fn overrides_follow_fixed_order() {
        let params = Parameters {
            random_seed: true,
            kill: true,
            ..Parameters::default()
        };
        let pointer = PointerState::new(1.0, 1.0, true);
        let stage = InteractionStage::plan(&params, pointer, 50);
        assert!(matches!(
            stage.overrides(),
            [
                CellOverride::Brush { .. },
                CellOverride::Reseed { frame: 50 },
                CellOverride::Clear
            ]
        ));
    }

    #[test]
    fn brush_edge_is_inclusive() {
        let params = Parameters {
            brush_radius: 2.0,
            brush_color: [0.0, 1.0, 0.0],
            ..Parameters::default()
        };
        let stage = InteractionStage::plan(&params, PointerState::new(2.0, 2.0, true), 100);
        let read = Grid::new(Extent::new(5, 5)).unwrap();
        let mut write = Grid::new(Extent::new(5, 5)).unwrap();
        stage.apply(&read, &mut write);
        assert_eq!(write.get(4, 2), [0.0, 1.0, 0.0]);
        assert_eq!(write.get(2, 0), [0.0, 1.0, 0.0]);
        assert_eq!(write.get(4, 4), [0.0; 3]);
    }

    #[test]
    fn negative_brush_radius_paints_only_pointer_cell() {
        let params = Parameters {
            brush_radius: -4.0,
            brush_color: [1.0, 1.0, 1.0],
            ..Parameters::default()
        };
        let stage = InteractionStage::plan(&params, PointerState::new(1.0, 0.0, true), 100);
        let read = Grid::new(Extent::new(3, 1)).unwrap();
        let mut write = Grid::new(Extent::new(3, 1)).unwrap();
        stage.apply(&read, &mut write);
        assert_eq!(write.cells(), &[[0.0; 3], [1.0; 3], [0.0; 3]]);
    }
}
