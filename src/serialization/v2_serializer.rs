use super::byte_buffer::ByteBuffer;
use super::varint::{zig_zag_encode, MAX_VARINT_LEN};
use super::{Serializer, RESERVED_OFFSET, RESERVED_RATIO, V2_COOKIE, V2_HEADER_SIZE};
use crate::storage::CountsStorage;
use crate::Histogram;
use std::convert::TryFrom;
use std::io::{self, Write};
use std::{error, fmt};

/// Errors that occur during serialization.
#[derive(Debug)]
pub enum V2SerializeError {
    /// A count above i64::max_value() cannot be zig-zag encoded, and therefore cannot be
    /// serialized.
    CountNotSerializable,
    /// Internal calculations cannot be represented in `usize`. Use smaller histograms or beefier
    /// hardware.
    UsizeTypeTooSmall,
    /// An i/o operation failed.
    IoError(io::Error),
}

impl std::convert::From<std::io::Error> for V2SerializeError {
    fn from(e: std::io::Error) -> Self {
        V2SerializeError::IoError(e)
    }
}

impl fmt::Display for V2SerializeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            V2SerializeError::CountNotSerializable => write!(
                f,
                "A count above i64::max_value() cannot be zig-zag encoded"
            ),
            V2SerializeError::UsizeTypeTooSmall => {
                write!(f, "Internal calculations cannot be represented in `usize`")
            }
            V2SerializeError::IoError(e) => write!(f, "An i/o operation failed: {}", e),
        }
    }
}

impl error::Error for V2SerializeError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            V2SerializeError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

/// Serializer for the V2 binary format.
pub struct V2Serializer {
    buf: ByteBuffer,
}

impl Default for V2Serializer {
    fn default() -> Self {
        Self::new()
    }
}

impl V2Serializer {
    /// Create a new serializer.
    pub fn new() -> V2Serializer {
        V2Serializer {
            buf: ByteBuffer::new(),
        }
    }
}

impl Serializer for V2Serializer {
    type SerializeError = V2SerializeError;

    fn serialize<S: CountsStorage, W: Write>(
        &mut self,
        h: &Histogram<S>,
        writer: &mut W,
    ) -> Result<usize, V2SerializeError> {
        self.buf.clear();
        let max_size = max_encoded_size(h).ok_or(V2SerializeError::UsizeTypeTooSmall)?;
        self.buf.reserve(max_size);

        self.buf.put_u32(V2_COOKIE);
        // placeholder for length
        self.buf.put_u32(0);
        self.buf.put_u32(RESERVED_OFFSET);
        self.buf.put_u32(u32::from(h.sigfig()));
        self.buf.put_u64(h.low());
        self.buf.put_u64(h.high());
        self.buf.put_u64(RESERVED_RATIO);

        debug_assert_eq!(V2_HEADER_SIZE, self.buf.len());

        let counts_len = encode_counts(h, &mut self.buf)?;
        let counts_len =
            u32::try_from(counts_len).map_err(|_| V2SerializeError::UsizeTypeTooSmall)?;
        self.buf.put_u32_at(4, counts_len)?;

        writer.write_all(self.buf.as_slice())?;
        Ok(self.buf.len())
    }
}

fn max_encoded_size<S: CountsStorage>(h: &Histogram<S>) -> Option<usize> {
    counts_array_max_encoded_size(h.index_for_or_last(h.max()) + 1)
        .and_then(|x| x.checked_add(V2_HEADER_SIZE))
}

// Only public for testing.
pub fn counts_array_max_encoded_size(length: usize) -> Option<usize> {
    length.checked_mul(MAX_VARINT_LEN)
}

// Only public for testing.
/// Append the run-length encoded counts, up to and including the bucket of the maximum value, to
/// `buf`. Returns the number of bytes appended.
pub fn encode_counts<S: CountsStorage>(
    h: &Histogram<S>,
    buf: &mut ByteBuffer,
) -> Result<usize, V2SerializeError> {
    let index_limit = h.index_for_or_last(h.max());
    let count_at = |index: usize| h.count_at_index(index).unwrap_or(0);

    let start_len = buf.len();
    let mut index = 0;
    while index <= index_limit {
        let count = count_at(index);
        index += 1;

        // Non-negative values are counts for the respective value, negative values are skipping
        // that many (absolute value) zero-count values.
        let mut zero_count: i64 = 0;
        if count == 0 {
            zero_count = 1;
            while index <= index_limit && count_at(index) == 0 {
                zero_count += 1;
                index += 1;
            }
        }

        let count_or_zeros = if zero_count > 1 {
            // a run is at most the whole counts array, far below i64::max_value()
            -zero_count
        } else {
            i64::try_from(count).map_err(|_| V2SerializeError::CountNotSerializable)?
        };

        buf.put_varint(zig_zag_encode(count_or_zeros));
    }

    Ok(buf.len() - start_len)
}
