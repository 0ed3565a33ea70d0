use super::varint::{varint_read, varint_write, MAX_VARINT_LEN};
use byteorder::{BigEndian, ByteOrder};
use std::io::{self, ErrorKind, Read, Write};

/// A growable big-endian byte buffer.
///
/// Writes append to the end. Reads consume from a cursor that starts at the beginning and is
/// independent of the writes, so a buffer filled from a reader can be decoded field by field.
#[derive(Debug, Default, Clone)]
pub struct ByteBuffer {
    buf: Vec<u8>,
    position: usize,
}

impl ByteBuffer {
    /// Create an empty buffer.
    pub fn new() -> ByteBuffer {
        ByteBuffer::default()
    }

    /// Wrap existing bytes; reading starts at the first byte.
    pub fn from_vec(buf: Vec<u8>) -> ByteBuffer {
        ByteBuffer { buf, position: 0 }
    }

    /// Drop all content and rewind, keeping the allocation.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.position = 0;
    }

    /// Make room for at least `additional` more bytes.
    pub fn reserve(&mut self, additional: usize) {
        self.buf.reserve(additional);
    }

    /// Number of bytes held.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True if the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Read cursor.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.position
    }

    /// All bytes held, regardless of the read cursor.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Replace the contents with exactly `len` bytes from `reader` and rewind.
    pub fn fill_from<R: Read>(&mut self, reader: &mut R, len: usize) -> io::Result<()> {
        self.clear();
        let read = reader.by_ref().take(len as u64).read_to_end(&mut self.buf)?;
        if read < len {
            return Err(io::Error::new(
                ErrorKind::UnexpectedEof,
                "input ended before the expected number of bytes",
            ));
        }
        Ok(())
    }

    /// Append a big-endian `u32`.
    pub fn put_u32(&mut self, value: u32) {
        let start = self.grow(4);
        BigEndian::write_u32(&mut self.buf[start..], value);
    }

    /// Append a big-endian `u64`.
    pub fn put_u64(&mut self, value: u64) {
        let start = self.grow(8);
        BigEndian::write_u64(&mut self.buf[start..], value);
    }

    /// Overwrite four already written bytes at `index` with a big-endian `u32`.
    pub fn put_u32_at(&mut self, index: usize, value: u32) -> io::Result<()> {
        let slot = index
            .checked_add(4)
            .and_then(|end| self.buf.get_mut(index..end))
            .ok_or_else(|| io::Error::new(ErrorKind::InvalidInput, "patch beyond written bytes"))?;
        BigEndian::write_u32(slot, value);
        Ok(())
    }

    /// Append a variable length integer. Returns the number of bytes written.
    pub fn put_varint(&mut self, value: u64) -> usize {
        let mut scratch = [0; MAX_VARINT_LEN];
        let len = varint_write(value, &mut scratch);
        self.buf.extend_from_slice(&scratch[..len]);
        len
    }

    /// Read a big-endian `u32` at the cursor.
    pub fn get_u32(&mut self) -> io::Result<u32> {
        let bytes = self.take(4)?;
        Ok(BigEndian::read_u32(bytes))
    }

    /// Read a big-endian `u64` at the cursor.
    pub fn get_u64(&mut self) -> io::Result<u64> {
        let bytes = self.take(8)?;
        Ok(BigEndian::read_u64(bytes))
    }

    /// Read a variable length integer at the cursor.
    pub fn get_varint(&mut self) -> io::Result<u64> {
        let (value, len) = varint_read(&self.buf[self.position..]).ok_or_else(eof)?;
        self.position += len;
        Ok(value)
    }

    fn grow(&mut self, by: usize) -> usize {
        let start = self.buf.len();
        self.buf.resize(start + by, 0);
        start
    }

    fn take(&mut self, len: usize) -> io::Result<&[u8]> {
        if self.remaining() < len {
            return Err(eof());
        }
        let start = self.position;
        self.position += len;
        Ok(&self.buf[start..start + len])
    }
}

impl Write for ByteBuffer {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn eof() -> io::Error {
    io::Error::new(ErrorKind::UnexpectedEof, "read past the end of the buffer")
}
