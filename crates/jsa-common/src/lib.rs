//! Common types and utilities for the jsa crates.
//!
//! This crate provides foundational types used across the workspace:
//! - Tunable limits and default sizes (`limits`)
//! - Source spans over an immutable source buffer (`SourceCodeSpan`)
//! - Line/column positions (`Locator`, `LineIndex`, `SourcePosition`)
//! - Whole-file input (`read_file`)

// Centralized limits and default sizes
pub mod limits;

// Span - byte ranges borrowed from a source buffer
pub mod span;
pub use span::SourceCodeSpan;

// Position/Range types for line/column source locations
pub mod position;
pub use position::{LineIndex, Locator, SourcePosition, SourceRange};

// File input
pub mod file;
pub use file::{ReadFileError, read_file};
