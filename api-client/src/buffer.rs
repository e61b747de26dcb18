//! Chunked receive buffer for streamed response bodies.
//!
//! Response sizes are unknown up front: bodies arrive as a stream of frames,
//! so the buffer grows on demand in fixed-size chunks rather than reallocating
//! per frame. Growth is fallible (`Vec::try_reserve_exact`), so an allocation
//! failure surfaces as an error instead of aborting the process.

use std::collections::TryReserveError;

/// Granularity of buffer growth, in bytes.
pub const CHUNK_SIZE: usize = 0x2000;

static NUL: [u8; 1] = [0];

/// An append-only byte accumulator for HTTP response bodies.
///
/// The content is kept NUL-terminated after every append so it can be handed
/// to C-string based parsers; the terminator is not part of [`len`] or
/// [`as_bytes`].
///
/// Appends are all-or-nothing: capacity is reserved before any byte is
/// copied, so a failed [`append`] leaves the buffer exactly as it was.
///
/// [`len`]: RecvBuffer::len
/// [`as_bytes`]: RecvBuffer::as_bytes
/// [`append`]: RecvBuffer::append
#[derive(Debug)]
pub struct RecvBuffer {
    /// Content bytes followed by a single NUL terminator (absent only while
    /// the buffer has never been appended to).
    buf: Vec<u8>,
}

impl RecvBuffer {
    /// Create an empty buffer with one chunk of capacity pre-allocated.
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(CHUNK_SIZE),
        }
    }

    /// Number of content bytes, excluding the NUL terminator.
    pub fn len(&self) -> usize {
        self.buf.len().saturating_sub(1)
    }

    /// Whether the buffer holds no content.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The content bytes, without the NUL terminator.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len()]
    }

    /// The content bytes including the trailing NUL.
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        if self.buf.is_empty() {
            &NUL
        } else {
            &self.buf
        }
    }

    /// Current capacity of the backing storage, in bytes.
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Append `data`, growing the backing storage in whole chunks as needed.
    ///
    /// On error the buffer content and length are unchanged.
    pub fn append(&mut self, data: &[u8]) -> Result<(), TryReserveError> {
        // +1 for the terminator; the old terminator is overwritten in place.
        let required = self.len() + data.len() + 1;
        if required > self.buf.capacity() {
            let shortfall = required - self.buf.capacity();
            let additional = shortfall.div_ceil(CHUNK_SIZE) * CHUNK_SIZE;
            let grow_by = self.buf.capacity() + additional - self.buf.len();
            self.buf.try_reserve_exact(grow_by)?;
        }
        self.buf.pop();
        self.buf.extend_from_slice(data);
        self.buf.push(0);
        Ok(())
    }
}

impl Default for RecvBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl AsRef<[u8]> for RecvBuffer {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffer() {
        let buf = RecvBuffer::new();
        assert_eq!(buf.len(), 0);
        assert!(buf.is_empty());
        assert_eq!(buf.as_bytes(), b"");
        assert_eq!(buf.as_bytes_with_nul(), b"\0");
    }

    #[test]
    fn append_keeps_terminator() {
        let mut buf = RecvBuffer::new();
        buf.append(b"hello").unwrap();
        assert_eq!(buf.as_bytes(), b"hello");
        assert_eq!(buf.as_bytes_with_nul(), b"hello\0");

        buf.append(b", world").unwrap();
        assert_eq!(buf.as_bytes(), b"hello, world");
        assert_eq!(buf.as_bytes_with_nul(), b"hello, world\0");
    }

    #[test]
    fn growth_one_byte_past_chunk() {
        let mut buf = RecvBuffer::new();
        let data = vec![0xab; CHUNK_SIZE + 1];
        buf.append(&data).unwrap();
        assert_eq!(buf.as_bytes(), &data[..]);
        assert_eq!(*buf.as_bytes_with_nul().last().unwrap(), 0);
    }

    #[test]
    fn growth_exactly_one_chunk() {
        let mut buf = RecvBuffer::new();
        let data = vec![0x5a; CHUNK_SIZE];
        buf.append(&data).unwrap();
        assert_eq!(buf.as_bytes(), &data[..]);
        assert_eq!(*buf.as_bytes_with_nul().last().unwrap(), 0);
    }

    #[test]
    fn growth_many_chunks_across_appends() {
        let mut buf = RecvBuffer::new();
        let mut expected = Vec::new();
        for i in 0..10u8 {
            let piece = vec![i; 3000];
            buf.append(&piece).unwrap();
            expected.extend_from_slice(&piece);
            assert_eq!(buf.as_bytes(), &expected[..]);
            assert_eq!(*buf.as_bytes_with_nul().last().unwrap(), 0);
        }
        assert_eq!(buf.len(), 30_000);
    }

    #[test]
    fn capacity_grows_in_chunks() {
        let mut buf = RecvBuffer::new();
        assert!(buf.capacity() >= CHUNK_SIZE);
        buf.append(&vec![1u8; CHUNK_SIZE * 2]).unwrap();
        assert!(buf.capacity() >= CHUNK_SIZE * 2 + 1);
    }
}
