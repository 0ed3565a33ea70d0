//! Serialization/deserialization support.
//!
//! Two binary formats are implemented: V2 and V2 + DEFLATE (following the names used by the other
//! HdrHistogram implementations). Both are compact representations of the state of a histogram,
//! intended for archival or transmission to other systems for further analysis. A typical use
//! case would be to periodically serialize a histogram, save it somewhere, and reset the
//! histogram.
//!
//! Histograms are designed to be added, subtracted, and otherwise manipulated, and an efficient
//! storage format facilitates this. As an example, you might capture histograms once a minute to
//! have a granular view into your performance over time, but you might also want to see longer
//! trends over an hour or day. Simply deserialize the last 60 minutes worth, add them all together
//! into one `Histogram`, and compute the 99.99th percentile for the entire hour, which is not
//! something you can do if you have only stored percentiles for each minute.
//!
//! # Format
//!
//! A V2 encoding is a 40 byte big-endian header followed by the counts:
//!
//! | field | width |
//! |-------|-------|
//! | cookie | 4 |
//! | payload length | 4 |
//! | reserved (written as 1, ignored when reading) | 4 |
//! | significant value digits | 4 |
//! | lowest discernible value | 8 |
//! | highest trackable value | 8 |
//! | reserved (written as 1, ignored when reading) | 8 |
//!
//! The payload walks the counts up to the bucket of the maximum value. Each count is zig-zag
//! encoded into a variable length integer of at most 9 bytes; runs of two or more zero counts are
//! written as the negated length of the run instead.
//!
//! V2 + DEFLATE is a 4 byte cookie and a 4 byte length followed by the zlib-compressed V2 bytes.
//! It is slower to write but usually much smaller, and is the form carried (base64 encoded) in
//! interval log lines; see `encode_base64` and `decode_base64`.
//!
//! # API
//!
//! Each format has its own serializer struct, but since each format is reliably distinguishable
//! by its cookie, a single `Deserializer` reads either of them.
//!
//! Serializers and deserializers keep their buffers between calls and are intended to be re-used
//! for many histograms.
//!
//! Serializers can write to any `Write` implementation, and `Deserializer` can read from any
//! `Read`. The histogram storage type is chosen at deserialization time, independently of the
//! storage of the histogram that was serialized.
//!
//! # Examples
//!
//! Creating, serializing, and deserializing a single histogram using a `Vec<u8>` as a `Write` and a
//! `&[u8]` slice from the vec as a `Read`.
//!
//! ```
//! use hdrpack::{DenseHistogram, PackedHistogram};
//! use hdrpack::serialization::{Deserializer, Serializer, V2Serializer};
//!
//! let mut vec = Vec::new();
//! let mut orig_histogram = DenseHistogram::<u64>::new(1).unwrap();
//! orig_histogram.record_n(1_000, 4).unwrap();
//! V2Serializer::new().serialize(&orig_histogram, &mut vec).unwrap();
//!
//! let histogram: PackedHistogram = Deserializer::new()
//!     .deserialize(&mut vec.as_slice()).unwrap();
//! assert_eq!(orig_histogram, histogram);
//! ```
//!
//! This example shows serializing several histograms into a `Vec<u8>` and deserializing them again,
//! at which point they are summed into one histogram.
//!
//! ```
//! use hdrpack::DenseHistogram;
//! use hdrpack::serialization::{Deserializer, Serializer, V2DeflateSerializer};
//! use std::io::Cursor;
//!
//! let num_histograms = 4;
//! let mut buf = Vec::new();
//! let mut serializer = V2DeflateSerializer::new();
//!
//! for _ in 0..num_histograms {
//!     let mut h = DenseHistogram::<u64>::new_with_bounds(1, u64::max_value(), 3).unwrap();
//!     h.record_n(42, 7).unwrap();
//!     serializer.serialize(&h, &mut buf).unwrap();
//! }
//!
//! let mut deserializer = Deserializer::new();
//! let mut cursor = Cursor::new(&buf);
//! let mut accumulator = DenseHistogram::<u64>::new_with_bounds(1, u64::max_value(), 3).unwrap();
//!
//! for _ in 0..num_histograms {
//!     let h: DenseHistogram<u64> = deserializer.deserialize(&mut cursor).unwrap();
//!     assert_eq!(7, h.count_at(42));
//!     accumulator.add(&h).unwrap();
//! }
//!
//! assert_eq!(num_histograms * 7, accumulator.count_at(42));
//! ```

use std::{fmt, io};

use crate::storage::CountsStorage;
use crate::Histogram;


#[cfg(all(test, feature = "bench_private"))]
mod benchmarks;

mod byte_buffer;
pub use self::byte_buffer::ByteBuffer;

mod varint;

mod v2_serializer;
pub use self::v2_serializer::{V2SerializeError, V2Serializer};

mod v2_deflate_serializer;
pub use self::v2_deflate_serializer::{V2DeflateSerializeError, V2DeflateSerializer};

mod deserializer;
pub use self::deserializer::{DeserializeError, Deserializer};

mod base64_codec;
pub use self::base64_codec::{decode_base64, encode_base64};

const V2_COOKIE_BASE: u32 = 0x1c84_9303;
const V2_COMPRESSED_COOKIE_BASE: u32 = 0x1c84_9304;

const V2_COOKIE: u32 = V2_COOKIE_BASE | 0x10;
const V2_COMPRESSED_COOKIE: u32 = V2_COMPRESSED_COOKIE_BASE | 0x10;

const V2_HEADER_SIZE: usize = 40;

// Reserved header fields. Written as-is, never interpreted when reading.
const RESERVED_OFFSET: u32 = 1;
const RESERVED_RATIO: u64 = 1;

/// Histogram serializer.
///
/// Different implementations serialize to different formats.
pub trait Serializer {
    /// Error type returned when serialization fails.
    type SerializeError: fmt::Debug;

    /// Serialize the histogram into the provided writer.
    /// Returns the number of bytes written, or an error.
    ///
    /// Note that `Vec<u8>` is a reasonable `Write` implementation for simple usage.
    fn serialize<S: CountsStorage, W: io::Write>(
        &mut self,
        h: &Histogram<S>,
        writer: &mut W,
    ) -> Result<usize, Self::SerializeError>;
}
