use rayon::prelude::*;

use crate::grid::{Grid, Rgb, CHANNELS};
use crate::growth::{couple, GrowthFunction};
use crate::kernel::KernelTaps;
use crate::params::Parameters;

/// The mandatory per-frame integration pass.
#[derive(Debug, Clone)]
pub struct UpdateStage {
    taps: KernelTaps,
}

impl UpdateStage {
    pub fn new(taps: KernelTaps) -> Self {
        Self { taps }
    }

    pub fn taps(&self) -> &KernelTaps {
        &self.taps
    }

    /// Reads `read` only and writes every cell of `write`.
    pub fn apply(&self, params: &Parameters, read: &Grid, write: &mut Grid) {
        debug_assert_eq!(read.extent(), write.extent());
        let growth = GrowthFunction::from_parameters(params);
        let width = read.width() as usize;
        write
            .cells_mut()
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, out) in row.iter_mut().enumerate() {
                    *out = self.cell(params, &growth, read, x as i64, y as i64);
                }
            });
    }

    fn cell(
        &self,
        params: &Parameters,
        growth: &GrowthFunction,
        read: &Grid,
        x: i64,
        y: i64,
    ) -> Rgb {
        let previous = read.get_wrapped(x, y);
        let (ring, core) = self.aggregate(read, x, y);

        let mut rates = [0.0; CHANNELS];
        for c in 0..CHANNELS {
            let m = if self.taps.has_core() {
                core[c]
            } else {
                previous[c]
            };
            rates[c] = growth.rate(ring[c], m);
        }
        let coupled = couple(&params.color_mix, rates);

        let mut next = [0.0; CHANNELS];
        for c in 0..CHANNELS {
            next[c] = integrate(previous[c], params.dt, coupled[c]);
        }
        next
    }

    /// Normalized ring and core weighted means around `(x, y)`, wrapping at
    /// the grid edges.
    fn aggregate(&self, read: &Grid, x: i64, y: i64) -> (Rgb, Rgb) {
        let mut ring = [0.0; CHANNELS];
        let mut core = [0.0; CHANNELS];
        for tap in self.taps.taps() {
            let value = read.get_wrapped(x + tap.dx as i64, y + tap.dy as i64);
            for c in 0..CHANNELS {
                ring[c] += tap.ring * value[c];
                core[c] += tap.core * value[c];
            }
        }
        normalize(&mut ring, self.taps.ring_sum());
        normalize(&mut core, self.taps.core_sum());
        (ring, core)
    }
}

fn normalize(values: &mut Rgb, sum: f32) {
    if sum > 0.0 {
        values.iter_mut().for_each(|v| *v /= sum);
    } else {
        *values = [0.0; CHANNELS];
    }
}

/// Euler step with the final clamp; non-finite increments count as zero and
/// NaN state maps to zero.
#[inline]
pub fn integrate(previous: f32, dt: f32, rate: f32) -> f32 {
    let delta = dt * rate;
    let delta = if delta.is_finite() { delta } else { 0.0 };
    let next = previous + delta;
    if next.is_nan() {
        0.0
    } else {
        next.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Extent;
    use crate::kernel::KernelImage;
    use crate::params::KernelProfile;

    fn stage(radius: f32, profile: KernelProfile) -> UpdateStage {
        UpdateStage::new(KernelTaps::from_image(&KernelImage::generate(
            radius, 0.5, profile,
        )))
    }

    #[test]
    fn integrate_clamps_and_sanitizes() {
        assert_eq!(integrate(0.9, 1.0, 0.5), 1.0);
        assert_eq!(integrate(0.1, 1.0, -0.5), 0.0);
        assert_eq!(integrate(0.4, 0.5, f32::INFINITY), 0.4);
        assert_eq!(integrate(0.4, f32::NAN, 1.0), 0.4);
        assert_eq!(integrate(f32::NAN, 0.3, 0.2), 0.0);
    }

    #[test]
    fn uniform_grid_stays_uniform() {
        let extent = Extent::new(12, 9);
        let read = Grid::from_fn(extent, |_, _| [0.3, 0.6, 0.9]).unwrap();
        let mut write = Grid::new(extent).unwrap();
        stage(3.0, KernelProfile::RingCore).apply(&Parameters::default(), &read, &mut write);
        let first = write.get(0, 0);
        for cell in write.cells() {
            for c in 0..CHANNELS {
                assert!((cell[c] - first[c]).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn wrapping_makes_translation_equivariant() {
        let extent = Extent::new(16, 16);
        let seed = |x: u32, y: u32| crate::hash::random_color(x, y, 7);
        let read = Grid::from_fn(extent, seed).unwrap();
        let shifted = Grid::from_fn(extent, |x, y| seed((x + 5) % 16, (y + 3) % 16)).unwrap();
        let update = stage(3.0, KernelProfile::RingCore);
        let params = Parameters::default();
        let mut a = Grid::new(extent).unwrap();
        let mut b = Grid::new(extent).unwrap();
        update.apply(&params, &read, &mut a);
        update.apply(&params, &shifted, &mut b);
        for y in 0..16 {
            for x in 0..16 {
                let expected = a.get((x + 5) % 16, (y + 3) % 16);
                let actual = b.get(x, y);
                for c in 0..CHANNELS {
                    assert!((expected[c] - actual[c]).abs() < 1e-5);
                }
            }
        }
    }

    #[test]
    fn unimodal_uses_own_value_for_blend() {
        let extent = Extent::new(8, 8);
        let read = Grid::from_fn(extent, |_, _| [0.0, 0.0, 0.0]).unwrap();
        let params = Parameters {
            birth1: -0.1,
            birth2: 0.1,
            color_mix: Parameters::identity_mix(),
            ..Parameters::default()
        };
        let mut write = Grid::new(extent).unwrap();
        stage(2.0, KernelProfile::Unimodal).apply(&params, &read, &mut write);
        // Dead cells with zero neighborhood sit at the birth lobe peak.
        assert!(write.cells().iter().all(|c| (c[0] - params.dt).abs() < 1e-5));
    }
}
