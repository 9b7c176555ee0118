//! Scratch-buffer staging between codec steps and the output sink
//!
//! The codec writes each step's output into a fixed-size scratch region that
//! is reused for the lifetime of the stream. Staged bytes must be drained
//! into the caller's sink after every step, before the scratch region is
//! handed to the codec again; the write cursor never exceeds the region.

use std::io;

use zstd::stream::raw::OutBuffer;

use crate::buffer::ChainBuffer;

pub(crate) struct ChunkBuffer {
    scratch: Vec<u8>,
    pos: usize,
}

impl ChunkBuffer {
    pub(crate) fn new(chunk_size: usize) -> Self {
        Self {
            scratch: vec![0u8; chunk_size],
            pos: 0,
        }
    }

    /// Bytes staged since the last drain.
    pub(crate) fn pending(&self) -> usize {
        self.pos
    }

    /// Run one codec step writing into the scratch region. The previous
    /// step's output must already have been drained.
    pub(crate) fn step<F>(&mut self, op: F) -> io::Result<usize>
    where
        F: FnOnce(&mut OutBuffer<'_, [u8]>) -> io::Result<usize>,
    {
        debug_assert_eq!(self.pos, 0, "scratch buffer drained before reuse");
        let mut out = OutBuffer::around(&mut self.scratch[..]);
        let remaining = op(&mut out)?;
        self.pos = out.pos();
        debug_assert!(self.pos <= self.scratch.len());
        Ok(remaining)
    }

    /// Append the staged bytes to `sink` and rewind the write cursor. A
    /// second call without an intervening step appends nothing.
    pub(crate) fn drain_into(&mut self, sink: &mut ChainBuffer) {
        if self.pos > 0 {
            sink.add(&self.scratch[..self.pos]);
            self.pos = 0;
        }
    }
}
