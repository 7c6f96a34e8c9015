//! Centralized limits and default sizes for the jsa containers.
//!
//! Keeping these in one place means the growth policy of the bump-backed
//! vector, the chunk size of the output buffer, and the arena's refill size
//! can be tuned together.

// =============================================================================
// Vector Growth
// =============================================================================

/// Smallest capacity a bump-backed vector allocates.
///
/// The first `push` on an empty vector reserves this many slots, so vectors
/// that only ever hold a handful of tokens cost exactly one allocation.
/// After that the capacity doubles: `4, 8, 16, 32, ...`.
pub const MIN_VECTOR_CAPACITY: usize = 4;

// =============================================================================
// Byte Buffer
// =============================================================================

/// Size of each chunk the byte buffer allocates for ordinary writes.
///
/// A single reservation larger than this gets a chunk of exactly its own
/// size instead, so one write is never split across chunks.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

// =============================================================================
// Arena
// =============================================================================

/// Size of each block the reference `LinearArena` requests from the heap.
pub const DEFAULT_ARENA_CHUNK_SIZE: usize = 64 * 1024;

/// Alignment of every arena block. Requests with stricter alignment are
/// padded inside the block.
pub const ARENA_CHUNK_ALIGN: usize = 16;

/// Maximum bar width used by the instrumentation dumps when no line length
/// limit is configured.
pub const UNLIMITED_LINE_LENGTH: usize = usize::MAX;
