//! Seam between the stages and the packet layer.
//!
//! The protocol layer owns the packet and knows where its transport
//! payload lives. It hands the stages a mutable view of the payload area
//! and accepts the new payload length after an in-place rewrite, updating
//! whatever length fields the packet carries.

/// A packet payload that a stage may rewrite in place.
pub trait PayloadFrame {
    /// Buffer holding the payload at offset 0. Its length bounds how far
    /// the payload may grow.
    fn payload_buf(&mut self) -> &mut [u8];

    /// Current payload length.
    fn payload_len(&self) -> usize;

    /// Records a new payload length after a rewrite.
    fn set_payload_len(&mut self, len: usize);
}

/// Owned payload with a fixed-capacity buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadBuf {
    buf: Box<[u8]>,
    len: usize,
}

impl PayloadBuf {
    /// Creates an empty payload with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity].into_boxed_slice(),
            len: 0,
        }
    }

    /// Copies `bytes` into a new buffer of at least `capacity` bytes.
    pub fn from_slice(bytes: &[u8], capacity: usize) -> Self {
        let mut frame = Self::with_capacity(capacity.max(bytes.len()));
        frame.buf[..bytes.len()].copy_from_slice(bytes);
        frame.len = bytes.len();
        frame
    }

    /// Replaces the payload with `bytes`, truncating to the buffer size.
    pub fn fill(&mut self, bytes: &[u8]) {
        let len = bytes.len().min(self.buf.len());
        self.buf[..len].copy_from_slice(&bytes[..len]);
        self.len = len;
    }

    /// Returns the payload bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Returns the buffer capacity.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }
}

impl PayloadFrame for PayloadBuf {
    fn payload_buf(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    fn payload_len(&self) -> usize {
        self.len
    }

    fn set_payload_len(&mut self, len: usize) {
        debug_assert!(len <= self.buf.len());
        self.len = len.min(self.buf.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slice_and_resize() {
        let mut frame = PayloadBuf::from_slice(b"payload", 16);
        assert_eq!(frame.capacity(), 16);
        assert_eq!(frame.as_slice(), b"payload");
        frame.set_payload_len(3);
        assert_eq!(frame.as_slice(), b"pay");
        assert_eq!(frame.payload_buf().len(), 16);
    }

    #[test]
    fn test_fill_truncates() {
        let mut frame = PayloadBuf::with_capacity(4);
        frame.fill(b"abcdef");
        assert_eq!(frame.as_slice(), b"abcd");
    }
}
