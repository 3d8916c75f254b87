use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits. Used for route
/// costs so path selection is identical on every machine.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Convert an f64 to Fixed64. Use only for initialization, never in sim loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display, never in sim loop.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// `reference / speed`, or `None` for a zero speed.
#[inline]
pub fn speed_ratio(reference: u32, speed: u32) -> Option<Fixed64> {
    Fixed64::from_num(reference).checked_div(Fixed64::from_num(speed))
}
