//! Explicit bit-field packing within a single payload byte.
//!
//! Bit 0 is the least significant bit. Fields never straddle a byte boundary.

/// Mask covering the low `width` bits. A width of zero or above eight is
/// clamped to the nearest valid mask.
#[inline]
pub const fn field_mask(width: u8) -> u8 {
    if width >= 8 {
        u8::MAX
    } else {
        !(u8::MAX << width)
    }
}

/// Read the `width`-bit field starting at bit `shift`.
#[inline]
pub const fn extract_field(byte: u8, shift: u8, width: u8) -> u8 {
    if shift >= 8 {
        return 0;
    }
    (byte >> shift) & field_mask(width)
}

/// Replace the `width`-bit field starting at bit `shift`, leaving all other
/// bits untouched. Bits of `value` above `width` are discarded; range checks
/// belong to the caller.
#[inline]
pub const fn insert_field(byte: u8, shift: u8, width: u8, value: u8) -> u8 {
    if shift >= 8 {
        return byte;
    }
    let mask = field_mask(width) << shift;
    (byte & !mask) | ((value << shift) & mask)
}

#[inline]
pub const fn bit(byte: u8, index: u8) -> bool {
    extract_field(byte, index, 1) != 0
}

#[inline]
pub const fn with_bit(byte: u8, index: u8, value: bool) -> u8 {
    insert_field(byte, index, 1, value as u8)
}

/// Largest value representable in a field of `width` bits.
#[inline]
pub const fn field_max(width: u8) -> u8 {
    field_mask(width)
}
