//! Tileable 3D cellular (Worley) noise

use crate::lattice::{hash3, rehash, unit, wrap};
use crate::NoiseSettings;

/// Distance from lattice-space point `p` to the nearest feature point (F1).
///
/// Each cell holds one feature point whose offset is hashed from the cell index
/// wrapped modulo `cells`, so the pattern repeats every `cells` units on each
/// axis. The result is clamped to [0, 1].
pub fn cellular_noise(p: [f64; 3], cells: u32, seed: u32) -> f64 {
    let cells = i64::from(cells.max(1));
    let base = p.map(|c| c.floor() as i64);
    let mut nearest_sq = f64::MAX;

    for dz in -1..=1 {
        for dy in -1..=1 {
            for dx in -1..=1 {
                let cell = [base[0] + dx, base[1] + dy, base[2] + dz];
                let h0 = hash3(
                    wrap(cell[0], cells),
                    wrap(cell[1], cells),
                    wrap(cell[2], cells),
                    seed,
                );
                let h1 = rehash(h0);
                let h2 = rehash(h1);
                let feature = [
                    cell[0] as f64 + unit(h0),
                    cell[1] as f64 + unit(h1),
                    cell[2] as f64 + unit(h2),
                ];
                let d = [p[0] - feature[0], p[1] - feature[1], p[2] - feature[2]];
                nearest_sq = nearest_sq.min(d[0] * d[0] + d[1] * d[1] + d[2] * d[2]);
            }
        }
    }

    nearest_sq.sqrt().min(1.0)
}

/// Layered Worley channel at normalized position `pos` (tile length 1.0).
///
/// Each octave contributes the inverted F1 distance (`1 - F1`, bright cell
/// centres) with the same frequency and amplitude schedule as the Perlin channel.
pub fn worley_fbm(settings: &NoiseSettings, pos: [f64; 3], seed: u32) -> f64 {
    let mut total = 0.0;
    let mut norm = 0.0;
    let mut amplitude = 1.0;
    let mut cells = settings.periods.max(1);

    for octave in 0..settings.octaves {
        let f = f64::from(cells);
        let p = pos.map(|c| c * f);
        total += (1.0 - cellular_noise(p, cells, seed.wrapping_add(octave))) * amplitude;
        norm += amplitude;
        amplitude *= 0.5;
        cells = cells.saturating_mul(2);
    }

    let value = if norm > 0.0 { total / norm } else { 0.0 };
    settings.remap(value)
}
