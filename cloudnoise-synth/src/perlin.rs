//! Tileable 3D gradient (Perlin) noise with fractal Brownian motion

use crate::lattice::{fade, hash3, lerp, wrap};
use crate::NoiseSettings;

/// Sample tileable gradient noise at lattice-space point `p`.
///
/// Lattice indices wrap modulo `period` before hashing, so
/// `gradient_noise(p + period * e_i, period, seed) == gradient_noise(p, period, seed)`
/// for each axis. Output is roughly in [-1, 1].
pub fn gradient_noise(p: [f64; 3], period: u32, seed: u32) -> f64 {
    let period = i64::from(period.max(1));
    let cell = p.map(|c| c.floor());
    let [fx, fy, fz] = [p[0] - cell[0], p[1] - cell[1], p[2] - cell[2]];
    let [ix, iy, iz] = cell.map(|c| c as i64);

    let corner = |dx: i64, dy: i64, dz: i64| {
        let h = hash3(
            wrap(ix + dx, period),
            wrap(iy + dy, period),
            wrap(iz + dz, period),
            seed,
        );
        grad(h, fx - dx as f64, fy - dy as f64, fz - dz as f64)
    };

    let (u, v, w) = (fade(fx), fade(fy), fade(fz));

    let x00 = lerp(corner(0, 0, 0), corner(1, 0, 0), u);
    let x10 = lerp(corner(0, 1, 0), corner(1, 1, 0), u);
    let x01 = lerp(corner(0, 0, 1), corner(1, 0, 1), u);
    let x11 = lerp(corner(0, 1, 1), corner(1, 1, 1), u);

    let y0 = lerp(x00, x10, v);
    let y1 = lerp(x01, x11, v);
    lerp(y0, y1, w)
}

/// Fractal Perlin channel at normalized position `pos` (tile length 1.0).
///
/// Octave `o` runs at frequency `periods * 2^o` with amplitude `0.5^o` and seed
/// `seed + o`. The sum is normalized, mapped to [0, 1] and remapped by the
/// settings' contrast and brightness.
pub fn perlin_fbm(settings: &NoiseSettings, pos: [f64; 3], seed: u32) -> f64 {
    let mut total = 0.0;
    let mut norm = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = settings.periods.max(1);

    for octave in 0..settings.octaves {
        let f = f64::from(frequency);
        let p = pos.map(|c| c * f);
        total += gradient_noise(p, frequency, seed.wrapping_add(octave)) * amplitude;
        norm += amplitude;
        amplitude *= 0.5;
        frequency = frequency.saturating_mul(2);
    }

    let value = if norm > 0.0 { total / norm } else { 0.0 };
    settings.remap((0.5 + 0.5 * value).clamp(0.0, 1.0))
}

/// Dot product with one of the 12 cube-edge gradients (improved Perlin set)
#[inline]
fn grad(hash: u32, x: f64, y: f64, z: f64) -> f64 {
    match hash & 15 {
        0 | 12 => x + y,
        1 | 14 => -x + y,
        2 => x - y,
        3 => -x - y,
        4 => x + z,
        5 => -x + z,
        6 => x - z,
        7 => -x - z,
        8 => y + z,
        9 | 13 => -y + z,
        10 => y - z,
        _ => -y - z,
    }
}
