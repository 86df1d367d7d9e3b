//! Accelerator position scaling.
//!
//! Every position and output field shares one closed linear scale:
//! raw `0..=65535` maps onto `0%..=100%`. Nothing here is signed or
//! logarithmic.

use crate::error::{ThrottleError, ThrottleResult};
use crate::ids::ACCELERATOR_POSITION_MAX;

const SCALE: f32 = ACCELERATOR_POSITION_MAX as f32;

/// Narrow a wider integer to a raw accelerator position.
///
/// # Errors
///
/// Returns [`ThrottleError::FieldRange`] for values above 65535.
pub fn checked_position(field: &'static str, value: u32) -> ThrottleResult<u16> {
    u16::try_from(value)
        .map_err(|_overflow| ThrottleError::field_range(field, value, ACCELERATOR_POSITION_MAX))
}

/// Convert a demand fraction (`0.0..=1.0`) into a raw position.
///
/// Out-of-range input is clamped and NaN maps to zero demand.
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn position_from_fraction(fraction: f32) -> u16 {
    if fraction.is_nan() {
        return 0;
    }
    (fraction.clamp(0.0, 1.0) * SCALE).round() as u16
}

/// Convert a demand percentage (`0.0..=100.0`) into a raw position.
#[inline]
pub fn position_from_percent(percent: f32) -> u16 {
    position_from_fraction(percent / 100.0)
}

#[inline]
pub fn position_to_fraction(raw: u16) -> f32 {
    f32::from(raw) / SCALE
}

#[inline]
pub fn position_to_percent(raw: u16) -> f32 {
    position_to_fraction(raw) * 100.0
}
