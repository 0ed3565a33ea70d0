//! LEB128-64b9B variable length integers and zig-zag sign folding.
//!
//! This is not quite Protobuf's LEB128: the first 8 bytes carry 7 bits each with the high bit as a
//! continuation flag, and a 9th byte, if reached, carries the top 8 bits as-is. Every `u64`
//! therefore fits in at most 9 bytes instead of 10.

/// Longest possible encoding, in bytes.
pub const MAX_VARINT_LEN: usize = 9;

/// Write `input` to the start of `buf`, which must have room for `MAX_VARINT_LEN` bytes or for
/// the encoded length of `input`. Returns the number of bytes written, in [1, 9].
#[inline]
pub fn varint_write(input: u64, buf: &mut [u8]) -> usize {
    let mut rest = input;
    for (i, byte) in buf.iter_mut().enumerate().take(MAX_VARINT_LEN - 1) {
        if rest >> 7 == 0 {
            *byte = rest as u8;
            return i + 1;
        }
        // more bytes are coming
        *byte = 0x80 | (rest & 0x7F) as u8;
        rest >>= 7;
    }
    // special case: the last whole byte is written as is
    buf[MAX_VARINT_LEN - 1] = rest as u8;
    MAX_VARINT_LEN
}

/// Read a varint from the start of `buf`. Returns the decoded number and the number of bytes
/// consumed, or `None` if `buf` ends before the varint does.
#[inline]
pub fn varint_read(buf: &[u8]) -> Option<(u64, usize)> {
    let mut value: u64 = 0;
    for i in 0..MAX_VARINT_LEN - 1 {
        let b = *buf.get(i)?;
        value |= u64::from(b & 0x7F) << (7 * i);
        if b & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }
    let b = *buf.get(MAX_VARINT_LEN - 1)?;
    value |= u64::from(b) << (7 * (MAX_VARINT_LEN - 1));
    Some((value, MAX_VARINT_LEN))
}

/// Map signed numbers to unsigned: 0 to 0, -1 to 1, 1 to 2, -2 to 3, etc
#[inline]
pub fn zig_zag_encode(num: i64) -> u64 {
    // If num < 0, num >> 63 is all 1 and vice versa.
    ((num << 1) ^ (num >> 63)) as u64
}

/// Inverse of `zig_zag_encode`.
#[inline]
pub fn zig_zag_decode(encoded: u64) -> i64 {
    ((encoded >> 1) as i64) ^ -((encoded & 1) as i64)
}
