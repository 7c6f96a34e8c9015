//! Memory and buffering primitives for the jsa analysis engine.
//!
//! - [`LinearArena`] and the [`BumpAllocator`] contract
//! - [`RawBumpVector`]: growable arrays in arena memory, for tokens and nodes
//! - [`InstrumentedVector`] and [`VectorInstrumentation`]: lifecycle logging
//!   and size/capacity histograms for any growable array
//! - [`ByteBuffer`]: chunked output assembly
//! - [`ByteBufferIovec`]: zero-copy scatter-write list with partial-write
//!   bookkeeping

// Arena allocation
pub mod arena;
pub use arena::{BumpAllocator, LinearArena};

// Bump-backed growable array
pub mod bump_vector;
pub use bump_vector::RawBumpVector;

// Vector lifecycle instrumentation
pub mod instrumentation;
pub use instrumentation::{
    CapacityChangeHistogram, InstrumentationEntry, InstrumentationSink, NoInstrumentation,
    VectorEvent, VectorInstrumentation,
};

// Instrumented vector wrapper and the GrowableArray seam
pub mod vector;
pub use vector::{BumpVector, GrowableArray, InstrumentedVector, Vector};

// Chunked output buffer
pub mod byte_buffer;
pub use byte_buffer::ByteBuffer;

// Scatter-write descriptor list
pub mod iovec;
pub use iovec::ByteBufferIovec;

// Decimal integer formatting
pub mod integer;
pub use integer::DecimalInteger;
