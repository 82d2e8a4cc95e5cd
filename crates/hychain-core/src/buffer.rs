//! Byte buffer primitives: an append-only writer and a cursor reader.
//!
//! Both are scoped resources. `dispose` is idempotent; any access after
//! disposal fails with `ERR_RESOURCE_DISPOSED`.

use bytes::{Bytes, BytesMut};

use crate::error::{ChainError, Result};

/// Append-only accumulator of byte chunks.
///
/// Chunks are kept separate until [`ByteWriter::drain`], which concatenates
/// them and disposes the writer in one step.
#[derive(Debug, Default)]
pub struct ByteWriter {
    chunks: Option<Vec<Bytes>>,
    byte_length: usize,
}

impl ByteWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self {
            chunks: Some(Vec::new()),
            byte_length: 0,
        }
    }

    /// Append a chunk.
    pub fn write(&mut self, chunk: impl Into<Bytes>) -> Result<()> {
        let chunks = self
            .chunks
            .as_mut()
            .ok_or_else(|| ChainError::ResourceDisposed("write on disposed writer".into()))?;
        let chunk = chunk.into();
        self.byte_length += chunk.len();
        chunks.push(chunk);
        Ok(())
    }

    /// Total number of bytes accumulated so far.
    pub fn byte_length(&self) -> Result<usize> {
        if self.chunks.is_none() {
            return Err(ChainError::ResourceDisposed(
                "byte_length on disposed writer".into(),
            ));
        }
        Ok(self.byte_length)
    }

    /// Concatenate all chunks and dispose the writer.
    pub fn drain(&mut self) -> Result<Bytes> {
        let chunks = self
            .chunks
            .take()
            .ok_or_else(|| ChainError::ResourceDisposed("drain on disposed writer".into()))?;
        if chunks.len() == 1 {
            return Ok(chunks.into_iter().next().unwrap_or_default());
        }
        let mut out = BytesMut::with_capacity(self.byte_length);
        for chunk in chunks {
            out.extend_from_slice(&chunk);
        }
        Ok(out.freeze())
    }

    /// Release the accumulated chunks. Idempotent.
    pub fn dispose(&mut self) {
        self.chunks = None;
    }

    /// Whether the writer has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.chunks.is_none()
    }
}

/// Cursor-based reader over an owned byte sequence.
#[derive(Debug, Clone)]
pub struct ByteReader {
    data: Option<Bytes>,
    cursor: usize,
}

impl ByteReader {
    /// Wrap a byte sequence.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: Some(data.into()),
            cursor: 0,
        }
    }

    fn data(&self) -> Result<&Bytes> {
        self.data
            .as_ref()
            .ok_or_else(|| ChainError::ResourceDisposed("read on disposed reader".into()))
    }

    /// Read the next `n` bytes and advance the cursor. With `n` omitted,
    /// returns everything that remains.
    ///
    /// Reading past the end fails with `ERR_END_OF_STREAM`; `n == 0` fails
    /// with `ERR_INVALID_ARGUMENT`.
    pub fn read(&mut self, n: Option<usize>) -> Result<Bytes> {
        let data = self.data()?.clone();
        let remaining = data.len() - self.cursor;
        let n = match n {
            Some(0) => {
                return Err(ChainError::InvalidArgument(
                    "read length must be a positive integer".into(),
                ))
            }
            Some(n) => n,
            None => remaining,
        };
        if n > remaining {
            return Err(ChainError::EndOfStream(format!(
                "requested {n} bytes with {remaining} remaining"
            )));
        }
        let slice = data.slice(self.cursor..self.cursor + n);
        self.cursor += n;
        Ok(slice)
    }

    /// The full underlying buffer, independent of the cursor.
    pub fn buffer(&self) -> Result<Bytes> {
        Ok(self.data()?.clone())
    }

    /// Total length of the underlying buffer.
    pub fn byte_length(&self) -> Result<usize> {
        Ok(self.data()?.len())
    }

    /// Number of bytes left to read.
    pub fn remaining(&self) -> Result<usize> {
        Ok(self.data()?.len() - self.cursor)
    }

    /// Release the underlying buffer. Idempotent.
    pub fn dispose(&mut self) {
        self.data = None;
    }

    /// Whether the reader has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.data.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_accumulates_and_drains() {
        let mut writer = ByteWriter::new();
        writer.write(&b"hello "[..]).unwrap();
        writer.write(&b"world"[..]).unwrap();
        assert_eq!(writer.byte_length().unwrap(), 11);

        let drained = writer.drain().unwrap();
        assert_eq!(drained.as_ref(), b"hello world");

        // Drain disposes the writer.
        assert!(matches!(
            writer.write(&b"more"[..]),
            Err(ChainError::ResourceDisposed(_))
        ));
    }

    #[test]
    fn test_writer_dispose_idempotent() {
        let mut writer = ByteWriter::new();
        writer.dispose();
        writer.dispose();
        assert!(writer.is_disposed());
        assert!(matches!(
            writer.byte_length(),
            Err(ChainError::ResourceDisposed(_))
        ));
    }

    #[test]
    fn test_reader_cursor() {
        let mut reader = ByteReader::new(&b"abcdef"[..]);
        assert_eq!(reader.read(Some(2)).unwrap().as_ref(), b"ab");
        assert_eq!(reader.read(Some(3)).unwrap().as_ref(), b"cde");
        assert_eq!(reader.remaining().unwrap(), 1);
        assert_eq!(reader.read(None).unwrap().as_ref(), b"f");
    }

    #[test]
    fn test_reader_past_end() {
        let mut reader = ByteReader::new(&b"ab"[..]);
        assert!(matches!(
            reader.read(Some(3)),
            Err(ChainError::EndOfStream(_))
        ));
        // Cursor is untouched after a failed read.
        assert_eq!(reader.read(Some(2)).unwrap().as_ref(), b"ab");
    }

    #[test]
    fn test_reader_zero_length_read() {
        let mut reader = ByteReader::new(&b"ab"[..]);
        assert!(matches!(
            reader.read(Some(0)),
            Err(ChainError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_reader_disposed() {
        let mut reader = ByteReader::new(&b"ab"[..]);
        reader.dispose();
        reader.dispose();
        assert!(matches!(
            reader.read(Some(1)),
            Err(ChainError::ResourceDisposed(_))
        ));
        assert!(matches!(
            reader.buffer(),
            Err(ChainError::ResourceDisposed(_))
        ));
    }
}
