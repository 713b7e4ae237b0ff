//! Byte primitives used by the transform stages.
//!
//! Rotation counts are reduced modulo 8. Shifts by 8 or more bits clear the
//! byte. None of these functions fail.

/// Returns `a XOR b`.
#[inline]
#[must_use]
pub const fn xor(a: u8, b: u8) -> u8
{
    a ^ b
}

/// Rotates `value` right by `bits` (modulo 8).
#[inline]
#[must_use]
pub const fn rotate_right(value: u8, bits: u32) -> u8
{
    value.rotate_right(bits % u8::BITS)
}

/// Rotates `value` left by `bits` (modulo 8).
#[inline]
#[must_use]
pub const fn rotate_left(value: u8, bits: u32) -> u8
{
    value.rotate_left(bits % u8::BITS)
}

/// Shifts `value` left by `bits`, dropping the bits pushed out.
///
/// Not invertible in general.
#[inline]
#[must_use]
pub const fn shift_left(value: u8, bits: u32) -> u8
{
    if bits >= u8::BITS { 0 } else { value << bits }
}

/// Shifts `value` right by `bits`, dropping the bits pushed out.
///
/// Not invertible in general.
#[inline]
#[must_use]
pub const fn shift_right(value: u8, bits: u32) -> u8
{
    if bits >= u8::BITS { 0 } else { value >> bits }
}

/// XORs `key` into `target` byte by byte.
///
/// Both slices are expected to have the same length, extra bytes on either
/// side are left untouched.
pub fn xor_in_place(target: &mut [u8], key: &[u8])
{
    for (byte, key) in target.iter_mut().zip(key)
    {
        *byte = xor(*byte, *key);
    }
}

/// Applies `op` to every byte of `target`.
pub fn map_in_place(target: &mut [u8], op: impl Fn(u8) -> u8)
{
    for byte in target
    {
        *byte = op(*byte);
    }
}
