//! Counter-based hashing for reseeding.
//!
//! The same mixing runs in the GPU interaction shader, so a reseed at a given
//! frame produces the same colors on both pipelines.

use crate::grid::{Rgb, CHANNELS};

const X_SALT: u32 = 0x9e37_79b9;

/// lowbias32 integer finalizer.
#[inline]
pub fn mix32(mut x: u32) -> u32 {
    x ^= x >> 16;
    x = x.wrapping_mul(0x7feb_352d);
    x ^= x >> 15;
    x = x.wrapping_mul(0x846c_a68b);
    x ^= x >> 16;
    x
}

/// Hash of one cell channel at one frame. Only the low 32 bits of the frame
/// take part.
#[inline]
pub fn cell_hash(x: u32, y: u32, frame: u64, channel: u32) -> u32 {
    let mut h = mix32(x ^ X_SALT);
    h = mix32(h ^ y);
    h = mix32(h ^ frame as u32);
    mix32(h ^ channel)
}

/// Maps a hash to `[0, 1)` using its top 24 bits.
#[inline]
pub fn unit_float(hash: u32) -> f32 {
    (hash >> 8) as f32 * (1.0 / 16_777_216.0)
}

pub fn random_color(x: u32, y: u32, frame: u64) -> Rgb {
    let mut color = [0.0; CHANNELS];
    for (channel, value) in color.iter_mut().enumerate() {
        *value = unit_float(cell_hash(x, y, frame, channel as u32));
    }
    color
}
