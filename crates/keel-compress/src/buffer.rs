//! Slice-chain byte buffer for the data-plane filter chain
//!
//! Filter-chain buffers are chains of contiguous slices, not one flat
//! region: input arrives as whatever slices the transport produced, and the
//! compressor drains them front to back. Appends never copy existing slices.

use std::collections::VecDeque;

use bytes::Bytes;

/// Byte buffer holding an ordered chain of contiguous slices
#[derive(Debug, Default)]
pub struct ChainBuffer {
    slices: VecDeque<Bytes>,
    len: usize,
}

impl ChainBuffer {
    /// Create an empty buffer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total byte length across all slices
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the buffer holds no bytes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append a copy of `bytes` as one slice
    pub fn add(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        self.len += bytes.len();
        self.slices.push_back(Bytes::copy_from_slice(bytes));
    }

    /// Append an owned slice without copying
    pub fn push_bytes(&mut self, bytes: Bytes) {
        if bytes.is_empty() {
            return;
        }
        self.len += bytes.len();
        self.slices.push_back(bytes);
    }

    /// Remove and return the front slice
    pub fn pop_slice(&mut self) -> Option<Bytes> {
        let slice = self.slices.pop_front()?;
        self.len -= slice.len();
        Some(slice)
    }

    /// Iterate the slices front to back
    pub fn slices(&self) -> impl Iterator<Item = &[u8]> {
        self.slices.iter().map(|slice| slice.as_ref())
    }

    /// Move the entire contents of `other` to the back of this buffer,
    /// leaving `other` empty
    pub fn move_from(&mut self, other: &mut ChainBuffer) {
        self.len += other.len;
        self.slices.append(&mut other.slices);
        other.len = 0;
    }

    /// Copy the contents into one contiguous vector
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len);
        for slice in self.slices() {
            out.extend_from_slice(slice);
        }
        out
    }
}

impl From<&[u8]> for ChainBuffer {
    fn from(bytes: &[u8]) -> Self {
        let mut buffer = ChainBuffer::new();
        buffer.add(bytes);
        buffer
    }
}

impl From<Vec<u8>> for ChainBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        let mut buffer = ChainBuffer::new();
        buffer.push_bytes(Bytes::from(bytes));
        buffer
    }
}
