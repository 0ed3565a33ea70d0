use super::byte_buffer::ByteBuffer;
use super::varint::zig_zag_decode;
use super::{V2_COMPRESSED_COOKIE, V2_COOKIE, V2_HEADER_SIZE};
use crate::storage::CountsStorage;
use crate::{Histogram, RestatState};
use byteorder::{BigEndian, ReadBytesExt};
use flate2::read::ZlibDecoder;
use std::convert::TryFrom;
use std::io::{self, Read};
use std::{self, error, fmt};
use tracing::debug;

/// Errors that can happen during deserialization.
#[derive(Debug)]
pub enum DeserializeError {
    /// An i/o operation failed.
    IoError(io::Error),
    /// The cookie (first 4 bytes) did not match that for any supported format.
    UnsupportedCookie,
    /// A count exceeded what can be represented in the chosen counter type.
    UnsuitableCounterType,
    /// The histogram instance could not be created because the serialized parameters were invalid
    /// (e.g. lowest value, highest value, etc.)
    InvalidParameters,
    /// The current system's pointer width cannot represent the encoded histogram.
    UsizeTypeTooSmall,
    /// The encoded array is longer than it should be for the histogram's value range.
    EncodedArrayTooLong,
    /// The text form was not valid base64.
    InvalidBase64,
}

impl std::convert::From<std::io::Error> for DeserializeError {
    fn from(e: std::io::Error) -> Self {
        DeserializeError::IoError(e)
    }
}

impl fmt::Display for DeserializeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DeserializeError::IoError(e) => write!(f, "An i/o operation failed: {}", e),
            DeserializeError::UnsupportedCookie => write!(
                f,
                "The cookie (first 4 bytes) did not match that for any supported format"
            ),
            DeserializeError::UnsuitableCounterType => write!(
                f,
                "A count exceeded what can be represented in the chosen counter type"
            ),
            DeserializeError::InvalidParameters => write!(
                f,
                "The serialized parameters were invalid (e.g. lowest value, highest value, etc)"
            ),
            DeserializeError::UsizeTypeTooSmall => write!(
                f,
                "The current system's pointer width cannot represent the encoded histogram"
            ),
            DeserializeError::EncodedArrayTooLong => write!(
                f,
                "The encoded array is longer than it should be for the histogram's value range"
            ),
            DeserializeError::InvalidBase64 => write!(f, "The text form was not valid base64"),
        }
    }
}

impl error::Error for DeserializeError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            DeserializeError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

/// Deserializer for all supported formats.
///
/// Since the serialization formats all include some magic bytes that allow reliable identification
/// of the different formats, only one Deserializer implementation is needed.
pub struct Deserializer {
    buf: ByteBuffer,
}

impl Default for Deserializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Deserializer {
    /// Create a new deserializer.
    pub fn new() -> Deserializer {
        Deserializer {
            buf: ByteBuffer::new(),
        }
    }

    /// Deserialize an encoded histogram from the provided reader.
    ///
    /// The storage of the returned histogram is chosen by the caller and need not match the
    /// storage of the histogram that was serialized. Total count, minimum and maximum are
    /// recomputed from the decoded counts.
    ///
    /// Note that `&[u8]` and `Cursor` are convenient implementations of `Read` if you have some
    /// bytes already in slice or `Vec` form.
    pub fn deserialize<S: CountsStorage, R: Read>(
        &mut self,
        reader: &mut R,
    ) -> Result<Histogram<S>, DeserializeError> {
        let cookie = reader.read_u32::<BigEndian>()?;

        match cookie {
            V2_COOKIE => self.deser_v2(reader),
            V2_COMPRESSED_COOKIE => self.deser_v2_compressed(reader),
            _ => Err(DeserializeError::UnsupportedCookie),
        }
    }

    fn deser_v2_compressed<S: CountsStorage, R: Read>(
        &mut self,
        reader: &mut R,
    ) -> Result<Histogram<S>, DeserializeError> {
        let payload_len = reader.read_u32::<BigEndian>()?;

        let mut deflate_reader = ZlibDecoder::new(reader.take(u64::from(payload_len)));
        let inner_cookie = deflate_reader.read_u32::<BigEndian>()?;
        if inner_cookie != V2_COOKIE {
            return Err(DeserializeError::UnsupportedCookie);
        }

        self.deser_v2(&mut deflate_reader)
    }

    fn deser_v2<S: CountsStorage, R: Read>(
        &mut self,
        reader: &mut R,
    ) -> Result<Histogram<S>, DeserializeError> {
        // the cookie has already been consumed
        self.buf.fill_from(reader, V2_HEADER_SIZE - 4)?;
        let payload_len = usize::try_from(self.buf.get_u32()?)
            .map_err(|_| DeserializeError::UsizeTypeTooSmall)?;
        let _reserved_offset = self.buf.get_u32()?;
        let num_digits = u8::try_from(self.buf.get_u32()?)
            .map_err(|_| DeserializeError::InvalidParameters)?;
        let low = self.buf.get_u64()?;
        let high = self.buf.get_u64()?;
        let _reserved_ratio = self.buf.get_u64()?;

        let mut h = Histogram::new_with_bounds(low, high, num_digits)
            .map_err(|_| DeserializeError::InvalidParameters)?;

        self.buf.fill_from(reader, payload_len)?;

        let mut restat_state = RestatState::new();
        let mut decode_state = DecodeLoopState::new();
        while self.buf.remaining() > 0 {
            let count_or_zeros = zig_zag_decode(self.buf.get_varint()?);
            decode_state.on_decoded_num(count_or_zeros, &mut restat_state, &mut h)?;
        }

        restat_state.update_histogram(&mut h);

        debug!(
            payload_len,
            total_count = h.len(),
            decoded_cells = decode_state.dest_index,
            "decoded V2 histogram"
        );
        Ok(h)
    }
}

/// Position in the counts array while replaying the run-length encoded payload.
struct DecodeLoopState {
    dest_index: usize,
}

impl DecodeLoopState {
    fn new() -> DecodeLoopState {
        DecodeLoopState { dest_index: 0 }
    }

    #[inline]
    fn on_decoded_num<S: CountsStorage>(
        &mut self,
        count_or_zeros: i64,
        restat_state: &mut RestatState,
        h: &mut Histogram<S>,
    ) -> Result<(), DeserializeError> {
        if count_or_zeros < 0 {
            let zero_count = usize::try_from(count_or_zeros.unsigned_abs())
                .map_err(|_| DeserializeError::UsizeTypeTooSmall)?;
            // skip the zeros
            self.dest_index = self
                .dest_index
                .checked_add(zero_count)
                .ok_or(DeserializeError::UsizeTypeTooSmall)?;
        } else {
            // non-negative, so the cast is lossless
            let count = count_or_zeros as u64;
            if count > h.storage().max_count() {
                return Err(DeserializeError::UnsuitableCounterType);
            }

            if count > 0 {
                h.set_count_at_index(self.dest_index, count)
                    .map_err(|_| DeserializeError::EncodedArrayTooLong)?;

                restat_state.on_nonzero_count(self.dest_index, count);
            }

            self.dest_index = self
                .dest_index
                .checked_add(1)
                .ok_or(DeserializeError::UsizeTypeTooSmall)?;
        }

        Ok(())
    }
}
