//! jsa: memory and buffering primitives for a JavaScript analysis engine.
//!
//! This crate re-exports the workspace members so embedders depend on one
//! crate:
//!
//! - [`common`]: source spans, line/column locators, file reading, limits
//! - [`memory`]: bump-allocated and instrumented vectors, chunked output
//!   buffers, scatter-write lists

pub use jsa_common as common;
pub use jsa_memory as memory;

pub use jsa_common::{LineIndex, Locator, SourceCodeSpan, SourcePosition, SourceRange, read_file};
pub use jsa_memory::{
    BumpVector, ByteBuffer, ByteBufferIovec, InstrumentedVector, LinearArena, Vector,
    VectorInstrumentation,
};

// Tracing configuration (text / tree / JSON output for debugging)
pub mod tracing_config;
