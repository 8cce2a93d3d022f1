//! Kernel precomputation.
//!
//! A [`KernelImage`] is a square texture of `[ring, core]` weight pairs whose
//! edge sits at normalized distance 5. [`KernelTaps`] resamples it once per
//! generation into the per-offset weights the update stage convolves with.

use crate::params::KernelProfile;

/// Smallest outer radius accepted before dividing by it.
pub const MIN_OUTER_RADIUS: f32 = 1.0;
/// Largest outer radius; bounds kernel memory and per-cell tap count.
pub const MAX_OUTER_RADIUS: f32 = 128.0;
pub const MIN_RATIO_OF_RADII: f32 = 0.01;
pub const MAX_RATIO_OF_RADII: f32 = 1.0;

/// Normalized distance of the image edge from its centre.
const EDGE_DISTANCE: f32 = 5.0;
const PROFILE_EXPONENT: f32 = 0.2;

/// Clamps a possibly degenerate value into `[min, max]`; NaN maps to `min`.
fn sanitize(value: f32, min: f32, max: f32) -> f32 {
    if value.is_nan() {
        min
    } else {
        value.clamp(min, max)
    }
}

pub fn effective_outer_radius(outer_radius: f32) -> f32 {
    sanitize(outer_radius, MIN_OUTER_RADIUS, MAX_OUTER_RADIUS)
}

pub fn effective_ratio(ratio_of_radii: f32) -> f32 {
    sanitize(ratio_of_radii, MIN_RATIO_OF_RADII, MAX_RATIO_OF_RADII)
}

/// Square image of `[ring, core]` weights.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelImage {
    side: u32,
    outer_radius: f32,
    ratio_of_radii: f32,
    profile: KernelProfile,
    texels: Vec<[f32; 2]>,
}

impl KernelImage {
    /// Builds the kernel for the given radii. Degenerate inputs are clamped,
    /// so generation always succeeds with finite output.
    pub fn generate(outer_radius: f32, ratio_of_radii: f32, profile: KernelProfile) -> Self {
        let outer_radius = effective_outer_radius(outer_radius);
        let ratio = effective_ratio(ratio_of_radii);
        let side = ((4.0 * outer_radius).round() as u32).max(1);
        let half = side as f32 / 2.0;
        let scale = 2.0 * EDGE_DISTANCE / side as f32;

        let mut texels = Vec::with_capacity(side as usize * side as usize);
        for j in 0..side {
            let dy = j as f32 + 0.5 - half;
            for i in 0..side {
                let dx = i as f32 + 0.5 - half;
                let d = (dx * dx + dy * dy).sqrt() * scale;
                texels.push(profile_weights(profile, d, ratio));
            }
        }

        tracing::debug!(
            side,
            outer_radius,
            ratio,
            profile = profile.as_str(),
            "generated kernel image"
        );

        Self {
            side,
            outer_radius,
            ratio_of_radii: ratio,
            profile,
            texels,
        }
    }

    pub fn side(&self) -> u32 {
        self.side
    }

    /// Outer radius after clamping, i.e. the footprint radius in cells.
    pub fn outer_radius(&self) -> f32 {
        self.outer_radius
    }

    pub fn ratio_of_radii(&self) -> f32 {
        self.ratio_of_radii
    }

    pub fn profile(&self) -> KernelProfile {
        self.profile
    }

    pub fn texels(&self) -> &[[f32; 2]] {
        &self.texels
    }

    pub fn texel(&self, i: u32, j: u32) -> [f32; 2] {
        self.texels[j as usize * self.side as usize + i as usize]
    }

    /// Bilinear sample at texel coordinate `(u, v)` where texel `i` is
    /// centred on `i + 0.5`. Coordinates outside the image clamp to the edge.
    pub fn sample(&self, u: f32, v: f32) -> [f32; 2] {
        let last = self.side as i64 - 1;
        let x = u - 0.5;
        let y = v - 0.5;
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let fetch = |i: i64, j: i64| self.texel(i.clamp(0, last) as u32, j.clamp(0, last) as u32);
        let (x0, y0) = (x0 as i64, y0 as i64);
        let a = fetch(x0, y0);
        let b = fetch(x0 + 1, y0);
        let c = fetch(x0, y0 + 1);
        let d = fetch(x0 + 1, y0 + 1);
        let mut out = [0.0; 2];
        for k in 0..2 {
            let top = a[k] + (b[k] - a[k]) * fx;
            let bottom = c[k] + (d[k] - c[k]) * fx;
            out[k] = top + (bottom - top) * fy;
        }
        out
    }
}

fn profile_weights(profile: KernelProfile, d: f32, ratio: f32) -> [f32; 2] {
    match profile {
        KernelProfile::RingCore => {
            let ring = if d <= EDGE_DISTANCE {
                (d - 1.0).sin().max(0.0).powf(PROFILE_EXPONENT)
            } else {
                0.0
            };
            let scaled = d / ratio;
            let core = if scaled <= EDGE_DISTANCE {
                (scaled / 2.0).cos().max(0.0).powf(PROFILE_EXPONENT)
            } else {
                0.0
            };
            [ring, core]
        }
        KernelProfile::Unimodal => {
            let ring = if d <= EDGE_DISTANCE {
                0.5 * d.sin() + 0.5
            } else {
                0.0
            };
            [ring, 0.0]
        }
    }
}

/// One convolution offset with its resampled weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tap {
    pub dx: i32,
    pub dy: i32,
    pub ring: f32,
    pub core: f32,
}

/// Kernel resampled onto integer grid offsets within the footprint radius.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelTaps {
    taps: Vec<Tap>,
    reach: u32,
    ring_sum: f32,
    core_sum: f32,
    profile: KernelProfile,
}

impl KernelTaps {
    pub fn from_image(image: &KernelImage) -> Self {
        let radius = image.outer_radius();
        let reach = radius.ceil() as i32;
        let centre = image.side() as f32 / 2.0;
        let step = image.side() as f32 / (2.0 * radius);
        let radius_sq = radius * radius;

        let mut taps = Vec::new();
        let mut ring_sum = 0.0;
        let mut core_sum = 0.0;
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                if (dx * dx + dy * dy) as f32 > radius_sq {
                    continue;
                }
                let [ring, core] =
                    image.sample(centre + dx as f32 * step, centre + dy as f32 * step);
                if ring <= 0.0 && core <= 0.0 {
                    continue;
                }
                ring_sum += ring;
                core_sum += core;
                taps.push(Tap { dx, dy, ring, core });
            }
        }

        Self {
            taps,
            reach: reach as u32,
            ring_sum,
            core_sum,
            profile: image.profile(),
        }
    }

    pub fn taps(&self) -> &[Tap] {
        &self.taps
    }

    /// Largest absolute offset along either axis.
    pub fn reach(&self) -> u32 {
        self.reach
    }

    pub fn ring_sum(&self) -> f32 {
        self.ring_sum
    }

    pub fn core_sum(&self) -> f32 {
        self.core_sum
    }

    /// Whether the core aggregate comes from kernel weights rather than the
    /// cell's own value.
    pub fn has_core(&self) -> bool {
        self.profile == KernelProfile::RingCore
    }

    /// Dense `(2·reach + 1)²` RGBA table of `[ring, core, 0, 0]`, row-major
    /// from offset `(-reach, -reach)`. Offsets without a tap are zero.
    pub fn to_dense_rgba(&self) -> Vec<[f32; 4]> {
        let span = 2 * self.reach as usize + 1;
        let mut dense = vec![[0.0; 4]; span * span];
        let reach = self.reach as i32;
        for tap in &self.taps {
            let x = (tap.dx + reach) as usize;
            let y = (tap.dy + reach) as usize;
            dense[y * span + x] = [tap.ring, tap.core, 0.0, 0.0];
        }
        dense
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_follows_outer_radius() {
        assert_eq!(KernelImage::generate(13.0, 0.5, KernelProfile::RingCore).side(), 52);
        assert_eq!(KernelImage::generate(2.4, 0.5, KernelProfile::RingCore).side(), 10);
    }

    #[test]
    fn degenerate_radii_are_clamped() {
        for radius in [0.0, -3.0, f32::NAN, f32::NEG_INFINITY] {
            let image = KernelImage::generate(radius, 0.0, KernelProfile::RingCore);
            assert_eq!(image.outer_radius(), MIN_OUTER_RADIUS);
            assert_eq!(image.side(), 4);
            assert!(image.texels().iter().flatten().all(|w| w.is_finite()));
        }
        let huge = KernelImage::generate(f32::INFINITY, f32::INFINITY, KernelProfile::RingCore);
        assert_eq!(huge.outer_radius(), MAX_OUTER_RADIUS);
        assert_eq!(huge.ratio_of_radii(), MAX_RATIO_OF_RADII);
    }

    #[test]
    fn ring_vanishes_at_centre_and_core_peaks() {
        let image = KernelImage::generate(8.0, 0.5, KernelProfile::RingCore);
        let mid = image.side() / 2;
        let [ring, core] = image.texel(mid, mid);
        assert_eq!(ring, 0.0);
        assert!(core > 0.99);
        let corner = image.texel(0, 0);
        assert_eq!(corner, [0.0, 0.0]);
    }

    #[test]
    fn unimodal_has_no_core() {
        let image = KernelImage::generate(6.0, 0.5, KernelProfile::Unimodal);
        assert!(image.texels().iter().all(|t| t[1] == 0.0));
        let taps = KernelTaps::from_image(&image);
        assert!(!taps.has_core());
        assert_eq!(taps.core_sum(), 0.0);
        assert!(taps.ring_sum() > 0.0);
    }

    #[test]
    fn bilinear_sample_hits_texel_centres() {
        let image = KernelImage::generate(5.0, 0.5, KernelProfile::RingCore);
        let expected = image.texel(3, 7);
        assert_eq!(image.sample(3.5, 7.5), expected);
        let left = image.texel(3, 7);
        let right = image.texel(4, 7);
        let between = image.sample(4.0, 7.5);
        assert!((between[0] - (left[0] + right[0]) / 2.0).abs() < 1e-6);
    }

    #[test]
    fn taps_stay_inside_footprint() {
        let image = KernelImage::generate(4.5, 0.5, KernelProfile::RingCore);
        let taps = KernelTaps::from_image(&image);
        assert_eq!(taps.reach(), 5);
        for tap in taps.taps() {
            assert!((tap.dx * tap.dx + tap.dy * tap.dy) as f32 <= 4.5 * 4.5);
        }
        let ring: f32 = taps.taps().iter().map(|t| t.ring).sum();
        assert!((ring - taps.ring_sum()).abs() < 1e-4);
    }

    #[test]
    fn dense_table_places_taps_by_offset() {
        let image = KernelImage::generate(3.0, 0.5, KernelProfile::RingCore);
        let taps = KernelTaps::from_image(&image);
        let dense = taps.to_dense_rgba();
        let span = 2 * taps.reach() as usize + 1;
        assert_eq!(dense.len(), span * span);
        let tap = taps.taps()[0];
        let index = (tap.dy + taps.reach() as i32) as usize * span
            + (tap.dx + taps.reach() as i32) as usize;
        assert_eq!(dense[index], [tap.ring, tap.core, 0.0, 0.0]);
    }
}
