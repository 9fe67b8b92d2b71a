//! Executing a resolved invocation: read inputs, link, write the output.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use jsld_linker::{generate_imports, link, LinkInputs, LinkOptions, SourceInput};
use tempfile::Builder;
use tracing::info;

use crate::config::Invocation;
use crate::error::CliError;

pub fn execute(invocation: &Invocation) -> Result<(), CliError> {
    match invocation {
        Invocation::Link {
            wasm,
            output,
            symbols,
            exports,
            externs,
        } => {
            let inputs = LinkInputs {
                wasm_path: wasm.display().to_string(),
                wasm_bytes: read_bytes(wasm)?,
                symbols_files: read_sources(symbols)?,
                exports_files: read_sources(exports)?,
                externs_files: read_sources(externs)?,
            };
            let options = LinkOptions::for_output(output, wasm);
            let program = link(&options, &inputs)?;
            write_atomically(output, program.as_bytes())?;
            info!(output = %output.display(), "linked");
        }
        Invocation::GenerateImports { output, symbols } => {
            let names = generate_imports(&read_sources(symbols)?)?;
            let mut text = names.join("\n");
            if !text.is_empty() {
                text.push('\n');
            }
            write_atomically(output, text.as_bytes())?;
            info!(output = %output.display(), symbols = names.len(), "wrote imports");
        }
    }
    Ok(())
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, CliError> {
    fs::read(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn read_sources(paths: &[PathBuf]) -> Result<Vec<SourceInput>, CliError> {
    paths
        .iter()
        .map(|path| {
            let text = fs::read_to_string(path).map_err(|source| CliError::Read {
                path: path.clone(),
                source,
            })?;
            Ok(SourceInput::new(path.display().to_string(), text))
        })
        .collect()
}

/// Write through a temporary file in the destination directory, renamed
/// into place only once complete. An existing destination keeps its
/// permissions; a new one is created world-readable, subject to the umask.
fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), CliError> {
    let failed = |source: io::Error| CliError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let existing = fs::metadata(path).ok().map(|m| m.permissions());
    let mut builder = Builder::new();
    if let Some(permissions) = new_file_permissions() {
        builder.permissions(permissions);
    }
    let mut file = builder.tempfile_in(dir).map_err(failed)?;
    if let Some(permissions) = existing {
        file.as_file().set_permissions(permissions).map_err(failed)?;
    }
    file.write_all(contents).map_err(failed)?;
    file.flush().map_err(failed)?;
    file.persist(path).map_err(|e| failed(e.error))?;
    Ok(())
}

#[cfg(unix)]
fn new_file_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<fs::Permissions> {
    None
}
