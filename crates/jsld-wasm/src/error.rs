//! Binary reader error types.

use jsld_types::{ErrorCode, LinkError};
use thiserror::Error;

/// A decoding failure at a specific point of the input.
///
/// Offsets are absolute byte offsets into the module.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error("bad magic number")]
    BadMagic,

    #[error("bad version {0:#010x}")]
    BadVersion(u32),

    #[error("unexpected end of input at offset {offset}")]
    UnexpectedEof { offset: usize },

    /// A non-custom section appeared after one that must follow it.
    #[error("out of order section: id {id} after id {previous}")]
    SectionOutOfOrder { id: u8, previous: u8 },

    #[error("trailing section data")]
    TrailingSectionData,

    /// The encoding is longer than the width allows, or sets bits beyond it.
    #[error("bad {width} at offset {offset}")]
    BadLeb { width: &'static str, offset: usize },

    /// A ULEB32 in the upper half of the unsigned range.
    #[error("unsupported ULEB32 >= 2^31 at offset {offset}")]
    UnsupportedLeb { offset: usize },

    #[error("bad UTF-8 string at offset {offset}")]
    BadUtf8 { offset: usize },

    #[error("bad {what} index {index}")]
    BadIndex { what: &'static str, index: u32 },

    #[error("bad {what} {byte:#04x} at offset {offset}")]
    BadTag {
        what: &'static str,
        byte: u8,
        offset: usize,
    },

    #[error("bad boolean flag {byte:#04x} at offset {offset}")]
    BadFlag { byte: u8, offset: usize },

    #[error("bad constant initialiser opcode {opcode:#04x} at offset {offset}")]
    BadConstExpr { opcode: u8, offset: usize },

    /// Linker-visible names (symbol imports and exports) are not unique.
    #[error("duplicate symbols")]
    DuplicateNames { names: Vec<String> },
}

impl ReadError {
    /// The linker error code for this failure.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::BadMagic => ErrorCode::BAD_MAGIC,
            Self::BadVersion(_) => ErrorCode::BAD_VERSION,
            Self::UnexpectedEof { .. } => ErrorCode::UNEXPECTED_EOF,
            Self::SectionOutOfOrder { .. } => ErrorCode::SECTION_OUT_OF_ORDER,
            Self::TrailingSectionData => ErrorCode::TRAILING_SECTION_DATA,
            Self::BadLeb { .. } => ErrorCode::BAD_LEB,
            Self::UnsupportedLeb { .. } => ErrorCode::UNSUPPORTED_LEB,
            Self::BadUtf8 { .. } => ErrorCode::BAD_UTF8,
            Self::BadIndex { .. } => ErrorCode::BAD_INDEX,
            Self::BadTag { .. } => ErrorCode::BAD_TAG,
            Self::BadFlag { .. } => ErrorCode::BAD_FLAG,
            Self::BadConstExpr { .. } => ErrorCode::BAD_CONST_EXPR,
            Self::DuplicateNames { .. } => ErrorCode::DUPLICATE_WASM_NAME,
        }
    }
}

/// A [`ReadError`] together with the section it occurred in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}{}", section_context(.section))]
pub struct WasmError {
    /// Name of the section being decoded, `None` for the header.
    pub section: Option<&'static str>,
    #[source]
    pub kind: ReadError,
}

fn section_context(section: &Option<&'static str>) -> String {
    match section {
        Some(name) => format!(" in {name} section"),
        None => String::new(),
    }
}

impl WasmError {
    pub fn new(section: Option<&'static str>, kind: ReadError) -> Self {
        Self { section, kind }
    }

    /// Convert into a [`LinkError`] that names the offending file.
    pub fn into_link_error(self, file: &str) -> LinkError {
        let code = self.kind.code();
        if let ReadError::DuplicateNames { names } = &self.kind {
            return LinkError::new(code, format!("Wasm file '{file}' contains duplicate symbols"))
                .in_file(file)
                .with_items(names.iter().cloned());
        }
        LinkError::new(code, format!("invalid Wasm file '{file}': {self}")).in_file(file)
    }
}

impl From<ReadError> for WasmError {
    fn from(kind: ReadError) -> Self {
        Self::new(None, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_section() {
        let err = WasmError::new(Some("import"), ReadError::TrailingSectionData);
        assert_eq!(err.to_string(), "trailing section data in import section");
        let err = WasmError::from(ReadError::BadMagic);
        assert_eq!(err.to_string(), "bad magic number");
    }

    #[test]
    fn test_into_link_error() {
        let err = WasmError::new(Some("type"), ReadError::BadLeb { width: "ULEB32", offset: 12 })
            .into_link_error("app.wasm");
        assert_eq!(err.code, ErrorCode::BAD_LEB);
        assert_eq!(err.file.as_deref(), Some("app.wasm"));
        assert!(err.message.contains("bad ULEB32 at offset 12 in type section"));
    }

    #[test]
    fn test_duplicates_become_items() {
        let err = WasmError::new(
            None,
            ReadError::DuplicateNames {
                names: vec!["a".into(), "b".into()],
            },
        )
        .into_link_error("app.wasm");
        assert_eq!(err.code, ErrorCode::DUPLICATE_WASM_NAME);
        assert_eq!(err.items, vec!["a", "b"]);
    }
}
