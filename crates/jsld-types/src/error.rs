use crate::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error category, determined by error code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// The Wasm binary is not a well-formed module.
    Malformed,
    /// A symbols/exports/externs file uses a shape the linker rejects.
    Structure,
    /// Cross-file resolution failed.
    Link,
    /// Reading inputs or writing output failed.
    Host,
    /// A linker defect.
    Internal,
}

/// Numeric error code (E100–E599).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Malformed Wasm input (E100–E199) ──
    pub const BAD_MAGIC: Self = Self(100);
    pub const BAD_VERSION: Self = Self(101);
    pub const SECTION_OUT_OF_ORDER: Self = Self(102);
    pub const UNEXPECTED_EOF: Self = Self(103);
    pub const TRAILING_SECTION_DATA: Self = Self(104);
    pub const BAD_LEB: Self = Self(105);
    pub const UNSUPPORTED_LEB: Self = Self(106);
    pub const BAD_UTF8: Self = Self(107);
    pub const BAD_INDEX: Self = Self(108);
    pub const BAD_TAG: Self = Self(109);
    pub const BAD_FLAG: Self = Self(110);
    pub const BAD_CONST_EXPR: Self = Self(111);

    // ── Structural module errors (E200–E299) ──
    pub const JS_PARSE: Self = Self(200);
    pub const JS_INVALID: Self = Self(201);
    pub const NAMESPACE_IMPORT: Self = Self(202);
    pub const IMPORT_ALL: Self = Self(203);
    pub const DEFAULT_IMPORT: Self = Self(204);
    pub const EXPORT_DEFAULT: Self = Self(205);
    pub const EXPORT_ALL: Self = Self(206);
    pub const EXPORT_FROM: Self = Self(207);
    pub const DESTRUCTURING_EXPORT: Self = Self(208);

    // ── Linking errors (E300–E399) ──
    pub const DUPLICATE_SYMBOL: Self = Self(300);
    pub const DUPLICATE_WASM_NAME: Self = Self(301);
    pub const UNDEFINED_SYMBOL: Self = Self(302);
    pub const UNBOUND_GLOBAL: Self = Self(303);
    pub const DESCRIPTOR_CONFLICT: Self = Self(304);
    pub const DUPLICATE_EXPORT: Self = Self(305);

    // ── Host/environment errors (E400–E499) ──
    pub const READ_FAILED: Self = Self(400);
    pub const WRITE_FAILED: Self = Self(401);
    pub const INVALID_ARGUMENTS: Self = Self(402);
    pub const BAD_CONFIG: Self = Self(403);

    // ── Internal defects (E500–E599) ──
    pub const INTERNAL: Self = Self(500);

    /// Get the category for this error code.
    pub fn category(self) -> ErrorCategory {
        match self.0 {
            100..=199 => ErrorCategory::Malformed,
            200..=299 => ErrorCategory::Structure,
            300..=399 => ErrorCategory::Link,
            400..=499 => ErrorCategory::Host,
            _ => ErrorCategory::Internal,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// A structured linker error.
///
/// Every failure aborts the link. Multi-item failures (duplicate names,
/// undefined symbols, unbound globals) carry every offending name in
/// `items` rather than stopping at the first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkError {
    /// Error code (e.g., E302).
    pub code: ErrorCode,
    /// Error category (derived from code).
    pub category: ErrorCategory,
    /// Human-readable error message.
    pub message: String,
    /// Input file the error was found in, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Symbol the error concerns, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// Source location inside `file`, for JS inputs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    /// Every offending item of a multi-item failure.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<String>,
}

impl LinkError {
    /// Create a new error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            category: code.category(),
            message: message.into(),
            file: None,
            symbol: None,
            span: None,
            items: Vec::new(),
        }
    }

    /// Create an internal-defect error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::INTERNAL, message)
    }

    /// Attach the input file the error was found in.
    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Attach the symbol the error concerns.
    pub fn for_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    /// Attach a source location.
    pub fn at(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Attach the offending items of a multi-item failure.
    pub fn with_items<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.items = items.into_iter().map(Into::into).collect();
        self
    }

    /// Render the error as a JSON string for tooling.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"code":"{}","message":"serialization error: {e}"}}"#, self.code.0)
        })
    }
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.code, self.category, self.message)?;
        if let Some(span) = &self.span {
            write!(f, " at {span}")?;
        }
        for item in &self.items {
            write!(f, "\n  {item}")?;
        }
        Ok(())
    }
}

impl std::error::Error for LinkError {}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed"),
            Self::Structure => write!(f, "structure"),
            Self::Link => write!(f, "link"),
            Self::Host => write!(f, "host"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::BAD_MAGIC.category(), ErrorCategory::Malformed);
        assert_eq!(
            ErrorCode::EXPORT_DEFAULT.category(),
            ErrorCategory::Structure
        );
        assert_eq!(ErrorCode::UNDEFINED_SYMBOL.category(), ErrorCategory::Link);
        assert_eq!(ErrorCode::WRITE_FAILED.category(), ErrorCategory::Host);
        assert_eq!(ErrorCode::INTERNAL.category(), ErrorCategory::Internal);
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(format!("{}", ErrorCode::DUPLICATE_SYMBOL), "E300");
        assert_eq!(format!("{}", ErrorCode::BAD_MAGIC), "E100");
    }

    #[test]
    fn test_display_enumerates_items() {
        let err = LinkError::new(ErrorCode::UNDEFINED_SYMBOL, "undefined symbols")
            .with_items(["alpha", "beta"]);
        assert_eq!(
            err.to_string(),
            "E302 [link] undefined symbols\n  alpha\n  beta"
        );
    }

    #[test]
    fn test_display_with_span() {
        let err = LinkError::new(ErrorCode::JS_PARSE, "syntax error")
            .in_file("a.js")
            .at(Span::point(3, 7));
        assert_eq!(err.to_string(), "E200 [structure] syntax error at 3:7");
    }

    #[test]
    fn test_json_serialization() {
        let err = LinkError::new(ErrorCode::DUPLICATE_SYMBOL, "symbol config already defined")
            .in_file("b.js")
            .for_symbol("config");
        let json = err.to_json();
        assert!(json.contains("\"code\":300"));
        assert!(json.contains("\"category\":\"link\""));
        assert!(json.contains("\"symbol\":\"config\""));
        assert!(!json.contains("\"items\""));
        assert!(!json.contains("\"span\""));

        let back: LinkError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }
}
