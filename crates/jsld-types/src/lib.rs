//! Shared types for the js-ld linker.
//!
//! This crate defines the error model, source spans, WebAssembly object
//! descriptors, and the reserved names shared by every linker stage.

mod error;
mod span;
pub mod descriptor;
pub mod names;

pub use descriptor::{
    ElemType, FunctionSignature, GlobalSignature, Limits, MemorySignature, ObjectDescriptor,
    ObjectKind, TableSignature, ValType,
};
pub use error::{ErrorCategory, ErrorCode, LinkError};
pub use span::{SourceFile, Span};

/// Result type used throughout the linker.
pub type Result<T> = std::result::Result<T, LinkError>;
