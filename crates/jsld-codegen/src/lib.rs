//! js-ld JavaScript emitter.
//!
//! Building blocks for the program the linker writes:
//!
//! ```text
//! "use strict";
//! (function(factory) { ...AMD / CommonJS / global dispatch... })(
//!   function(__root, __fetcher, <requirements>) {
//!     const __exports = {};                  // preamble
//!     const __symbols = {};
//!     (function() { ... })();                // one block per linked file
//!     return __fetcher("app.wasm")           // instantiation pipeline
//!       .then(...)
//!   });
//! ```
//!
//! Every identifier the emitter introduces at factory scope starts with a
//! double underscore; see [`runtime`].

pub mod binding;
pub mod literal;
pub mod pipeline;
pub mod runtime;
pub mod umd;
pub mod writer;

pub use binding::{
    emit_install, emit_late_binding, emit_late_binding_helper, emit_requirement_binding,
    RequirementBinding,
};
pub use literal::{member, string_literal};
pub use pipeline::{ExportInstall, MemoryImport, Pipeline, Stage};
pub use umd::UmdWrapper;
pub use writer::JsWriter;
