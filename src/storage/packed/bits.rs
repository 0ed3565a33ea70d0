//! Bit twiddling for the packed array's slot bitmaps.

/// Presence bit for the 4-bit nibble of `index` at `shift`.
#[inline]
pub(crate) fn slot_bit(index: usize, shift: u32) -> u16 {
    1 << ((index >> shift) & 0xF)
}

/// Number of occupied slots stored before `bit` in an entry with presence `bitmap`.
#[inline]
pub(crate) fn slot_offset(bitmap: u16, bit: u16) -> usize {
    debug_assert_eq!(1, bit.count_ones());
    (bitmap & (bit - 1)).count_ones() as usize
}

/// Number of occupied slots in an entry.
#[inline]
pub(crate) fn slot_count(bitmap: u16) -> usize {
    bitmap.count_ones() as usize
}

/// `ceil(log2(n))`, with `ceil_log2(0) == ceil_log2(1) == 0`.
#[inline]
pub(crate) fn ceil_log2(n: usize) -> u32 {
    if n <= 1 {
        0
    } else {
        usize::max_value().count_ones() - (n - 1).leading_zeros()
    }
}
