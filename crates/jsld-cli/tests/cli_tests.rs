//! Integration tests for the `js-ld` command.
//!
//! Tests validate:
//! - a link reads every input and writes the program
//! - generate-imports writes one symbol per line
//! - failures write nothing and carry host error codes
//! - config files are merged with flags
//!
//! Each test runs in its own temporary directory.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use jsld_cli::{render_error, run, Cli, ErrorFormat};
use jsld_types::{ErrorCode, LinkError};
use tempfile::TempDir;

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

/// A module with no sections.
const EMPTY_WASM: &[u8] = b"\0asm\x01\0\0\0";

fn project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("app.wasm"), EMPTY_WASM).unwrap();
    fs::write(
        dir.path().join("libc.js"),
        "import { now } from '__symbols';\nexport function puts(s) {\n  return s;\n}\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("api.js"),
        "export function greet(name) {\n  return console.log(name);\n}\n",
    )
    .unwrap();
    fs::write(dir.path().join("node.js"), "var console;\n").unwrap();
    dir
}

fn path(dir: &TempDir, name: &str) -> String {
    dir.path().join(name).display().to_string()
}

fn run_args(args: &[&str]) -> Result<(), LinkError> {
    let cli = Cli::try_parse_from(std::iter::once("js-ld").chain(args.iter().copied())).unwrap();
    run(&cli)
}

fn file_names(dir: &Path) -> Vec<PathBuf> {
    let mut names: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| PathBuf::from(entry.unwrap().file_name()))
        .collect();
    names.sort();
    names
}

// ══════════════════════════════════════════════════════════════════════════════
// Tests
// ══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_writes_program() {
        let dir = project();
        let output = path(&dir, "app.js");
        run_args(&[
            "-e",
            &path(&dir, "api.js"),
            "-x",
            &path(&dir, "node.js"),
            "-o",
            &output,
            &path(&dir, "app.wasm"),
        ])
        .unwrap();

        let program = fs::read_to_string(&output).unwrap();
        assert!(program.starts_with("\"use strict\";"));
        assert!(program.contains("root[\"app\"] = bound();"));
        assert!(program.contains("return __fetcher(\"app.wasm\")"));
        assert!(program.contains("__exports[\"greet\"] = greet;"));
    }

    #[test]
    fn test_failed_link_writes_nothing() {
        let dir = project();
        let before = file_names(dir.path());
        let err = run_args(&[
            "-e",
            &path(&dir, "api.js"),
            "-o",
            &path(&dir, "app.js"),
            &path(&dir, "app.wasm"),
        ])
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::UNBOUND_GLOBAL);
        assert_eq!(err.items, vec!["console"]);
        assert_eq!(file_names(dir.path()), before);
    }

    #[test]
    fn test_generate_imports() {
        let dir = project();
        let output = path(&dir, "imports.txt");
        run_args(&[
            "-a",
            "generate-imports",
            "-s",
            &path(&dir, "libc.js"),
            "-o",
            &output,
        ])
        .unwrap();
        assert_eq!(fs::read_to_string(&output).unwrap(), "now\nputs\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_output_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = project();
        let mode = |name: &str| {
            fs::metadata(dir.path().join(name))
                .unwrap()
                .permissions()
                .mode()
                & 0o777
        };
        let generate = |output: &str| {
            run_args(&[
                "-a",
                "generate-imports",
                "-s",
                &path(&dir, "libc.js"),
                "-o",
                &path(&dir, output),
            ])
            .unwrap();
        };

        // A new output gets 0o644 under the same umask as any created file.
        fs::write(dir.path().join("plain.txt"), "").unwrap();
        generate("imports.txt");
        assert_eq!(mode("imports.txt"), mode("plain.txt") & 0o644);

        // An existing output keeps its mode.
        fs::write(dir.path().join("shared.txt"), "").unwrap();
        fs::set_permissions(
            dir.path().join("shared.txt"),
            fs::Permissions::from_mode(0o640),
        )
        .unwrap();
        generate("shared.txt");
        assert_eq!(mode("shared.txt"), 0o640);
        assert_eq!(fs::read_to_string(dir.path().join("shared.txt")).unwrap(), "now\nputs\n");
    }

    #[test]
    fn test_missing_input_is_a_read_error() {
        let dir = project();
        let missing = path(&dir, "missing.js");
        let err = run_args(&["-s", &missing, "-o", &path(&dir, "app.js"), &path(&dir, "app.wasm")])
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::READ_FAILED);
        assert_eq!(err.file.as_deref(), Some(missing.as_str()));
    }

    #[test]
    fn test_invalid_arguments_are_rejected_before_reading() {
        let err = run_args(&["-a", "generate-imports", "-o", "out.txt", "does-not-exist.wasm"])
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_ARGUMENTS);
    }

    #[test]
    fn test_config_file() {
        let dir = project();
        fs::write(
            dir.path().join("js-ld.json"),
            r#"{ "wasm_module": "app.wasm", "output": "out/app.js", "exports": ["api.js"] }"#,
        )
        .unwrap();
        fs::create_dir(dir.path().join("out")).unwrap();
        run_args(&[
            "--config",
            &path(&dir, "js-ld.json"),
            "-x",
            &path(&dir, "node.js"),
        ])
        .unwrap();
        let program = fs::read_to_string(dir.path().join("out/app.js")).unwrap();
        assert!(program.contains("__exports[\"greet\"] = greet;"));
    }

    #[test]
    fn test_bad_config_file() {
        let dir = project();
        fs::write(dir.path().join("js-ld.json"), r#"{ "inputs": [] }"#).unwrap();
        let err = run_args(&["--config", &path(&dir, "js-ld.json")]).unwrap_err();
        assert_eq!(err.code, ErrorCode::BAD_CONFIG);
    }

    #[test]
    fn test_error_rendering() {
        let err = LinkError::new(ErrorCode::UNDEFINED_SYMBOL, "1 undefined symbol(s)")
            .with_items(["puts"]);
        assert_eq!(
            render_error(&err, ErrorFormat::Human),
            "error: E302 [link] 1 undefined symbol(s)\n  puts"
        );
        assert!(render_error(&err, ErrorFormat::Json).starts_with('{'));

        let err = LinkError::new(ErrorCode::JS_PARSE, "syntax error").in_file("a.js");
        assert_eq!(
            render_error(&err, ErrorFormat::Human),
            "error: E200 [structure] syntax error\n  --> a.js"
        );
    }
}
