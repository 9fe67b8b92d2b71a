//! js-ld JavaScript toolkit.
//!
//! A thin layer over tree-sitter's JavaScript grammar that gives the linker
//! exactly what it needs from an input file:
//!
//! - [`parse_module`] / [`parse_script`]: parse source text, rejecting
//!   syntax errors
//! - [`validate`]: early errors tree-sitter accepts (duplicate lexical
//!   declarations, duplicate exports, module syntax in scripts)
//! - [`top_level_items`]: classify top-level statements into imports,
//!   exports and plain code
//! - [`free_variables`] / [`global_variables`]: scope analysis

pub mod items;
pub mod parse;
pub mod scope;
pub mod validate;

pub use items::{
    top_level_items, DeclaredName, ExportDecl, ExportSpec, ImportBinding, ImportDecl, Statement,
    TopLevelItem,
};
pub use parse::{parse_module, parse_script, ParsedSource, SourceKind};
pub use scope::{free_variables, global_variables};
pub use validate::validate;
