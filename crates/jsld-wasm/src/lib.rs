//! js-ld WebAssembly binary reader.
//!
//! Decodes just enough of a Wasm module for linking: the type, import,
//! function, table, memory, global, export and start sections. Function
//! bodies and data are skipped; global initializers are decoded only far
//! enough to step over them.
//!
//! ```text
//! magic ++ version ++ (id: u8, len: uleb32, body: [u8; len])*
//! ```
//!
//! Decoding is strict: LEB128 values must fit their width, indices must
//! resolve, strings must be UTF-8, and every section must be consumed
//! exactly.

pub mod error;
pub mod module;
pub mod reader;

pub use error::{ReadError, WasmError};
pub use module::{ExportEntry, ImportEntry, WasmModule};
pub use reader::Reader;
