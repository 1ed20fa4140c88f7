//! Integer lattice helpers shared by the gradient and cellular noise

/// Wrap a lattice index into `0..period`.
#[inline]
pub(crate) fn wrap(index: i64, period: i64) -> i64 {
    index.rem_euclid(period)
}

/// Hash a wrapped lattice point. Callers must wrap before hashing so that
/// equal points modulo the period share a hash.
#[inline]
pub(crate) fn hash3(x: i64, y: i64, z: i64, seed: u32) -> u32 {
    let mut h = seed ^ 0x9E37_79B9;
    h = fmix32(h ^ (x as u32).wrapping_mul(0x8DA6_B343));
    h = fmix32(h ^ (y as u32).wrapping_mul(0xD816_3841));
    h = fmix32(h ^ (z as u32).wrapping_mul(0xCB1A_B31F));
    h
}

/// Derive an independent hash from an existing one.
#[inline]
pub(crate) fn rehash(h: u32) -> u32 {
    fmix32(h ^ 0x68E3_1DA4)
}

/// Map a hash to [0, 1) using its top 24 bits.
#[inline]
pub(crate) fn unit(h: u32) -> f64 {
    (h >> 8) as f64 / (1u32 << 24) as f64
}

/// MurmurHash3 finalizer
#[inline]
fn fmix32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85EB_CA6B);
    h ^= h >> 13;
    h = h.wrapping_mul(0xC2B2_AE35);
    h ^= h >> 16;
    h
}

/// Quintic fade curve (6t^5 - 15t^4 + 10t^3)
#[inline]
pub(crate) fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
pub(crate) fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + t * (b - a)
}
