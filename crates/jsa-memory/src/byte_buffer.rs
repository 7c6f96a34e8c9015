//! Chunked output buffer.
//!
//! Rendered diagnostics and protocol messages are assembled piece by piece
//! into a [`ByteBuffer`]. The buffer is a list of chunks; writes only ever
//! fill the last chunk or start a new one, so nothing already written is
//! copied again as the output grows. When the output is complete,
//! [`ByteBuffer::to_iovec`] hands the chunks to a [`ByteBufferIovec`] for a
//! vectored write without copying them.

use std::fmt;

use jsa_common::limits::DEFAULT_CHUNK_SIZE;
use tracing::trace;

use crate::integer::DecimalInteger;
use crate::iovec::ByteBufferIovec;

/// One contiguous block of output. Shared by the buffer and the iovec list.
pub(crate) struct Chunk {
    data: Box<[u8]>,
    used: usize,
}

impl Chunk {
    fn with_capacity(size: usize) -> Self {
        Chunk {
            data: vec![0u8; size].into_boxed_slice(),
            used: 0,
        }
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        Chunk {
            data: bytes.into(),
            used: bytes.len(),
        }
    }

    /// The bytes written so far.
    #[inline]
    pub(crate) fn filled(&self) -> &[u8] {
        &self.data[..self.used]
    }

    #[inline]
    pub(crate) fn used(&self) -> usize {
        self.used
    }

    #[inline]
    fn remaining(&self) -> usize {
        self.data.len() - self.used
    }

    #[inline]
    pub(crate) fn allocated(&self) -> usize {
        self.data.len()
    }
}

/// An append-only byte sequence stored as a list of chunks.
#[derive(Default)]
pub struct ByteBuffer {
    chunks: Vec<Chunk>,
}

impl ByteBuffer {
    /// Size of the chunks allocated for ordinary writes.
    pub const DEFAULT_CHUNK_SIZE: usize = DEFAULT_CHUNK_SIZE;

    pub fn new() -> Self {
        ByteBuffer { chunks: Vec::new() }
    }

    /// Reserve `byte_count` contiguous bytes at the end of the buffer and
    /// return them for the caller to fill. The bytes count towards
    /// [`len`](Self::len) immediately.
    pub fn append(&mut self, byte_count: usize) -> &mut [u8] {
        let chunk = self.reserve(byte_count);
        let start = chunk.used;
        chunk.used += byte_count;
        &mut chunk.data[start..start + byte_count]
    }

    /// Reserve `max_byte_count` bytes, let `writer` fill a prefix of them, and
    /// keep only the number of bytes it reports.
    ///
    /// Panics if `writer` reports more than `max_byte_count` bytes.
    pub fn append_with<F>(&mut self, max_byte_count: usize, writer: F)
    where
        F: FnOnce(&mut [u8]) -> usize,
    {
        let chunk = self.reserve(max_byte_count);
        let start = chunk.used;
        let bytes_written = writer(&mut chunk.data[start..start + max_byte_count]);
        assert!(
            bytes_written <= max_byte_count,
            "writer reported {bytes_written} bytes written into a {max_byte_count}-byte reservation"
        );
        chunk.used += bytes_written;
    }

    pub fn append_copy(&mut self, data: &[u8]) {
        self.append(data.len()).copy_from_slice(data);
    }

    pub fn append_byte(&mut self, byte: u8) {
        self.append(1)[0] = byte;
    }

    /// Append `value` in decimal, formatted directly into the buffer.
    pub fn append_decimal_integer<T: DecimalInteger>(&mut self, value: T) {
        self.append_with(T::MAX_DECIMAL_LEN, |out| value.write_decimal(out));
    }

    /// Insert `data` before everything already in the buffer, as a chunk of
    /// its own.
    pub fn prepend_copy(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        self.chunks.insert(0, Chunk::from_bytes(data));
    }

    /// Release every chunk.
    pub fn clear(&mut self) {
        self.chunks.clear();
    }

    /// Total bytes written.
    pub fn len(&self) -> usize {
        self.chunks.iter().map(Chunk::used).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.iter().all(|chunk| chunk.used == 0)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Allocated size of each chunk, in order.
    pub fn chunk_sizes(&self) -> Vec<usize> {
        self.chunks.iter().map(Chunk::allocated).collect()
    }

    /// Copy the whole contents into the front of `out`.
    ///
    /// Panics if `out` is shorter than [`len`](Self::len).
    pub fn copy_to(&self, out: &mut [u8]) {
        let size = self.len();
        assert!(
            out.len() >= size,
            "copy_to destination holds {} bytes but the buffer has {size}",
            out.len()
        );
        let mut offset = 0;
        for chunk in &self.chunks {
            let bytes = chunk.filled();
            out[offset..offset + bytes.len()].copy_from_slice(bytes);
            offset += bytes.len();
        }
    }

    /// The whole contents as one vector.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        for chunk in &self.chunks {
            out.extend_from_slice(chunk.filled());
        }
        out
    }

    /// Give the chunks to a scatter-write list. Empty chunks are dropped.
    pub fn to_iovec(self) -> ByteBufferIovec {
        let chunks = self
            .chunks
            .into_iter()
            .filter(|chunk| chunk.used > 0)
            .collect();
        ByteBufferIovec::new(chunks)
    }

    /// The chunk that will hold the next `extra` bytes.
    fn reserve(&mut self, extra: usize) -> &mut Chunk {
        let fits = self
            .chunks
            .last()
            .is_some_and(|chunk| chunk.remaining() >= extra);
        if !fits {
            let size = extra.max(Self::DEFAULT_CHUNK_SIZE);
            trace!(size, chunks = self.chunks.len() + 1, "byte buffer: new chunk");
            self.chunks.push(Chunk::with_capacity(size));
        }
        let Some(chunk) = self.chunks.last_mut() else {
            unreachable!("a chunk was just pushed");
        };
        chunk
    }
}

impl fmt::Write for ByteBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.append_copy(s.as_bytes());
        Ok(())
    }
}

impl fmt::Debug for ByteBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteBuffer")
            .field("len", &self.len())
            .field("chunks", &self.chunks.len())
            .finish()
    }
}
