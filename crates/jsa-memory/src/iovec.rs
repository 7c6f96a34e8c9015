//! Scatter-write descriptor list.
//!
//! A [`ByteBufferIovec`] owns the chunks of a finished
//! [`ByteBuffer`](crate::ByteBuffer) and exposes them as regions for a
//! vectored write. After a partial write, [`remove_front`] drops the bytes
//! that went out so the next attempt starts exactly where the last one
//! stopped.
//!
//! [`remove_front`]: ByteBufferIovec::remove_front

use std::collections::VecDeque;
use std::io::{self, IoSlice, Write};

use tracing::trace;

use crate::byte_buffer::Chunk;

/// Regions of output waiting to be written.
///
/// Invariant: every chunk has at least one used byte, and `first_offset` is
/// less than the used length of the first chunk (or 0 when empty).
pub struct ByteBufferIovec {
    chunks: VecDeque<Chunk>,
    /// Bytes of the first chunk already consumed
    first_offset: usize,
}

impl ByteBufferIovec {
    pub(crate) fn new(chunks: VecDeque<Chunk>) -> Self {
        debug_assert!(chunks.iter().all(|chunk| chunk.used() > 0));
        ByteBufferIovec {
            chunks,
            first_offset: 0,
        }
    }

    /// The remaining regions, in write order.
    pub fn iovec(&self) -> impl ExactSizeIterator<Item = &[u8]> + '_ {
        self.chunks.iter().enumerate().map(|(index, chunk)| {
            let start = if index == 0 { self.first_offset } else { 0 };
            &chunk.filled()[start..]
        })
    }

    pub fn iovec_count(&self) -> usize {
        self.chunks.len()
    }

    /// The remaining regions as `IoSlice`s for `write_vectored`.
    pub fn io_slices(&self) -> Vec<IoSlice<'_>> {
        self.iovec().map(IoSlice::new).collect()
    }

    /// Bytes not yet removed.
    pub fn len(&self) -> usize {
        self.chunks.iter().map(Chunk::used).sum::<usize>() - self.first_offset
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Forget the first `count` bytes, freeing chunks that are fully consumed.
    ///
    /// Panics if `count` exceeds [`len`](Self::len).
    pub fn remove_front(&mut self, count: usize) {
        let remaining_total = self.len();
        assert!(
            count <= remaining_total,
            "remove_front({count}) with only {remaining_total} bytes remaining"
        );

        let mut count = count;
        while count > 0 {
            let Some(first) = self.chunks.front() else {
                unreachable!("count is bounded by the remaining bytes");
            };
            let remaining = first.used() - self.first_offset;
            if remaining <= count {
                count -= remaining;
                self.chunks.pop_front();
                self.first_offset = 0;
            } else {
                self.first_offset += count;
                count = 0;
            }
        }
        trace!(
            regions = self.chunks.len(),
            first_offset = self.first_offset,
            "iovec: consumed front"
        );
    }

    /// Write everything to `out`, retrying after partial writes.
    ///
    /// The regions are gathered once and advanced in place between attempts.
    /// Interrupted writes are retried. A write that accepts zero bytes fails
    /// with [`io::ErrorKind::WriteZero`]. On any error, the bytes that did go
    /// out are removed and the rest stay queued.
    pub fn write_all_to<W: Write + ?Sized>(&mut self, out: &mut W) -> io::Result<()> {
        let mut written = 0;
        let result = {
            let mut slices = self.io_slices();
            let mut pending: &mut [IoSlice<'_>] = &mut slices;
            loop {
                if pending.is_empty() {
                    break Ok(());
                }
                match out.write_vectored(pending) {
                    Ok(0) => {
                        break Err(io::Error::new(
                            io::ErrorKind::WriteZero,
                            "failed to write buffered output",
                        ));
                    }
                    Ok(n) => {
                        written += n;
                        IoSlice::advance_slices(&mut pending, n);
                    }
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                    Err(err) => break Err(err),
                }
            }
        };
        self.remove_front(written);
        result
    }
}

impl std::fmt::Debug for ByteBufferIovec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteBufferIovec")
            .field("regions", &self.chunks.len())
            .field("len", &self.len())
            .finish()
    }
}
