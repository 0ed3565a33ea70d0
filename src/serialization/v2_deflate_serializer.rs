use super::byte_buffer::ByteBuffer;
use super::v2_serializer::{V2SerializeError, V2Serializer};
use super::{Serializer, V2_COMPRESSED_COOKIE};
use crate::storage::CountsStorage;
use crate::Histogram;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::convert::TryFrom;
use std::io::{self, Write};
use std::{error, fmt};

/// Errors that occur during serialization.
#[derive(Debug)]
pub enum V2DeflateSerializeError {
    /// The underlying serialization failed
    InternalSerializationError(V2SerializeError),
    /// An i/o operation failed.
    IoError(io::Error),
}

impl std::convert::From<std::io::Error> for V2DeflateSerializeError {
    fn from(e: std::io::Error) -> Self {
        V2DeflateSerializeError::IoError(e)
    }
}

impl fmt::Display for V2DeflateSerializeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            V2DeflateSerializeError::InternalSerializationError(e) => {
                write!(f, "The underlying serialization failed: {}", e)
            }
            V2DeflateSerializeError::IoError(e) => {
                write!(f, "The underlying serialization failed: {}", e)
            }
        }
    }
}

impl error::Error for V2DeflateSerializeError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            V2DeflateSerializeError::InternalSerializationError(e) => Some(e),
            V2DeflateSerializeError::IoError(e) => Some(e),
        }
    }
}

/// Serializer for the V2 + DEFLATE binary format.
///
/// It's called "deflate" to stay consistent with the naming used in the other HdrHistogram
/// implementations, but it actually uses zlib's wrapper format around plain DEFLATE.
pub struct V2DeflateSerializer {
    uncompressed_buf: ByteBuffer,
    compressed_buf: ByteBuffer,
    v2_serializer: V2Serializer,
}

impl Default for V2DeflateSerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl V2DeflateSerializer {
    /// Create a new serializer.
    pub fn new() -> V2DeflateSerializer {
        V2DeflateSerializer {
            uncompressed_buf: ByteBuffer::new(),
            compressed_buf: ByteBuffer::new(),
            v2_serializer: V2Serializer::new(),
        }
    }
}

impl Serializer for V2DeflateSerializer {
    type SerializeError = V2DeflateSerializeError;

    fn serialize<S: CountsStorage, W: Write>(
        &mut self,
        h: &Histogram<S>,
        writer: &mut W,
    ) -> Result<usize, V2DeflateSerializeError> {
        self.uncompressed_buf.clear();
        self.compressed_buf.clear();
        let uncompressed_len = self
            .v2_serializer
            .serialize(h, &mut self.uncompressed_buf)
            .map_err(V2DeflateSerializeError::InternalSerializationError)?;

        debug_assert_eq!(self.uncompressed_buf.len(), uncompressed_len);
        // Real-world histograms tend to compress to well under half their size.
        self.compressed_buf.reserve(uncompressed_len / 2);

        self.compressed_buf.put_u32(V2_COMPRESSED_COOKIE);
        // placeholder for length
        self.compressed_buf.put_u32(0);

        {
            let mut compressor = ZlibEncoder::new(&mut self.compressed_buf, Compression::default());
            compressor.write_all(self.uncompressed_buf.as_slice())?;
            let _ = compressor.finish()?;
        }

        // the compressed length excludes the 8 byte frame header
        let total_compressed_len = self.compressed_buf.len();
        let payload_len = u32::try_from(total_compressed_len - 8).map_err(|_| {
            V2DeflateSerializeError::InternalSerializationError(
                V2SerializeError::UsizeTypeTooSmall,
            )
        })?;
        self.compressed_buf.put_u32_at(4, payload_len)?;

        writer.write_all(self.compressed_buf.as_slice())?;

        Ok(total_compressed_len)
    }
}
