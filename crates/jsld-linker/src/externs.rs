//! Externs files: scripts naming the globals the output may reference.

use jsld_js::{global_variables, parse_script, validate};
use jsld_types::Result;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternsFile {
    pub path: String,
    /// Every global the script declares or references.
    pub names: Vec<String>,
}

impl ExternsFile {
    pub fn load(path: &str, source: &str) -> Result<Self> {
        let parsed = parse_script(path, source)?;
        if let Some(err) = validate(&parsed).into_iter().next() {
            return Err(err);
        }
        let names = global_variables(&parsed);
        debug!(path, names = names.len(), "loaded externs");
        Ok(Self {
            path: path.to_string(),
            names,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsld_types::ErrorCode;

    #[test]
    fn declarations_and_references_both_count() {
        let externs = ExternsFile::load(
            "browser.js",
            "var window;\nfunction fetch(url) {}\nconsole.log(document);\n",
        )
        .unwrap();
        for name in ["window", "fetch", "console", "document"] {
            assert!(externs.names.iter().any(|n| n == name), "missing {name}");
        }
        assert!(!externs.names.iter().any(|n| n == "url"));
    }

    #[test]
    fn module_syntax_is_rejected() {
        let err = ExternsFile::load("bad.js", "export var x;\n").unwrap_err();
        assert_eq!(err.code, ErrorCode::JS_INVALID);
        assert_eq!(err.file.as_deref(), Some("bad.js"));
    }

    #[test]
    fn parse_errors_name_the_file() {
        let err = ExternsFile::load("broken.js", "var = ;\n").unwrap_err();
        assert_eq!(err.code, ErrorCode::JS_PARSE);
        assert_eq!(err.file.as_deref(), Some("broken.js"));
    }
}
