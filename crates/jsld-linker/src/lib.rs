//! js-ld linking engine.
//!
//! Combines one WebAssembly module with JavaScript symbols and exports
//! files into a single universal-module JavaScript program.
//!
//! # Pipeline
//!
//! 1. **Load**: symbols files, exports files and the Wasm module populate
//!    a [`SymbolTable`] and a [`RequirementTable`]
//! 2. **Resolve**: still-undefined memory imports get linker-provided
//!    memories; any other undefined symbol fails the link
//! 3. **Assemble**: [`ModuleAssembler`] emits the program
//! 4. **Validate**: [`validate_externs`] rejects references to undeclared
//!    globals
//!
//! Both tables live for exactly one [`link`] call.

pub mod assembler;
pub mod externs;
pub mod link;
pub mod loader;
pub mod requirement_table;
pub mod symbol_table;
pub mod validator;

pub use assembler::ModuleAssembler;
pub use externs::ExternsFile;
pub use link::{generate_imports, link, module_name_for, LinkInputs, LinkOptions, SourceInput};
pub use loader::{ExportBinding, FileKind, JsModule, RequirementImport, SymbolImport};
pub use requirement_table::{Requirement, RequirementTable};
pub use symbol_table::{Definition, MemoryDefinition, Symbol, SymbolId, SymbolTable};
pub use validator::validate_externs;
