use crate::grid::{Rgb, CHANNELS};
use crate::params::{ColorMix, Parameters};

pub const MIN_FULLNESS: f32 = 0.001;
pub const MAX_FULLNESS: f32 = 1.0;

#[inline]
fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[inline]
fn bump(lo: f32, hi: f32, soft: f32, x: f32) -> f32 {
    smoothstep(lo, lo + soft, x) * (1.0 - smoothstep(hi - soft, hi, x))
}

/// Smooth growth window on `[lo, hi]` with negative shoulders of the same
/// width on either side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lobe {
    lo: f32,
    hi: f32,
    soft: f32,
}

impl Lobe {
    pub fn new(lo: f32, hi: f32, fullness: f32) -> Self {
        let fullness = if fullness.is_nan() {
            MIN_FULLNESS
        } else {
            fullness.clamp(MIN_FULLNESS, MAX_FULLNESS)
        };
        Self {
            lo,
            hi,
            soft: fullness * (hi - lo) / 2.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.hi > self.lo) || !self.soft.is_finite()
    }

    /// Growth rate in `[-1, 1]`; exactly zero for an empty interval.
    pub fn rate(&self, x: f32) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let width = self.hi - self.lo;
        bump(self.lo, self.hi, self.soft, x)
            - bump(self.lo - width, self.lo, self.soft, x)
            - bump(self.hi, self.hi + width, self.soft, x)
    }
}

/// Birth and survival lobes blended by the core aggregate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthFunction {
    pub birth: Lobe,
    pub survival: Lobe,
}

impl GrowthFunction {
    pub fn from_parameters(params: &Parameters) -> Self {
        Self {
            birth: Lobe::new(params.birth1, params.birth2, params.fullness1),
            survival: Lobe::new(params.survival1, params.survival2, params.fullness2),
        }
    }

    /// Rate for ring aggregate `n` and core aggregate `m`.
    #[inline]
    pub fn rate(&self, n: f32, m: f32) -> f32 {
        let alive = if m.is_nan() { 0.0 } else { m.clamp(0.0, 1.0) };
        (1.0 - alive) * self.birth.rate(n) + alive * self.survival.rate(n)
    }
}

/// Mixes per-channel growth through the coupling matrix:
/// `e[i] = Σ_j mix[i][j] · g[j]`.
#[inline]
pub fn couple(mix: &ColorMix, growth: Rgb) -> Rgb {
    let mut out = [0.0; CHANNELS];
    for (i, row) in mix.iter().enumerate() {
        out[i] = row.iter().zip(growth.iter()).map(|(m, g)| m * g).sum();
    }
    out
}
