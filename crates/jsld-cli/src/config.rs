//! Configuration file and invocation resolution.
//!
//! A config file supplies defaults; command-line flags override its scalar
//! settings and extend its file lists. Relative paths in a config file are
//! resolved against the file's own directory.
//!
//! ```json
//! {
//!   "action": "link",
//!   "wasm_module": "build/app.wasm",
//!   "output": "dist/app.js",
//!   "symbols": ["src/libc.js"],
//!   "exports": ["src/api.js"],
//!   "externs": ["externs/browser.js"]
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::cli::{Action, Cli};
use crate::error::CliError;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub action: Option<Action>,
    pub wasm_module: Option<PathBuf>,
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub symbols: Vec<PathBuf>,
    #[serde(default)]
    pub exports: Vec<PathBuf>,
    #[serde(default)]
    pub externs: Vec<PathBuf>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let text = fs::read_to_string(path).map_err(|source| CliError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse(&text).map_err(|e| CliError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if let Some(dir) = path.parent() {
            config.rebase(dir);
        }
        Ok(config)
    }

    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    fn rebase(&mut self, dir: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = dir.join(&*p);
            }
        };
        self.wasm_module.iter_mut().for_each(join);
        self.output.iter_mut().for_each(join);
        self.symbols
            .iter_mut()
            .chain(&mut self.exports)
            .chain(&mut self.externs)
            .for_each(join);
    }
}

/// A fully resolved and validated command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Link {
        wasm: PathBuf,
        output: PathBuf,
        symbols: Vec<PathBuf>,
        exports: Vec<PathBuf>,
        externs: Vec<PathBuf>,
    },
    GenerateImports {
        output: PathBuf,
        symbols: Vec<PathBuf>,
    },
}

impl Invocation {
    /// Merge flags over the config file (if any) and check the combination.
    pub fn resolve(cli: &Cli) -> Result<Self, CliError> {
        let config = match &cli.config {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::default(),
        };
        Self::merge(cli, config)
    }

    pub fn merge(cli: &Cli, config: ConfigFile) -> Result<Self, CliError> {
        let action = cli.action.or(config.action).unwrap_or(Action::Link);
        let wasm = cli.wasm.clone().or(config.wasm_module);
        let output = cli
            .output
            .clone()
            .or(config.output)
            .ok_or_else(|| invalid("no output file given (use -o/--output)"))?;
        let extend = |mut base: Vec<PathBuf>, extra: &[PathBuf]| {
            base.extend_from_slice(extra);
            base
        };
        let symbols = extend(config.symbols, &cli.symbols[..]);
        let exports = extend(config.exports, &cli.exports[..]);
        let externs = extend(config.externs, &cli.externs[..]);

        match action {
            Action::Link => {
                let wasm = wasm.ok_or_else(|| invalid("linking requires a WASM_MODULE"))?;
                Ok(Self::Link {
                    wasm,
                    output,
                    symbols,
                    exports,
                    externs,
                })
            }
            Action::GenerateImports => {
                if wasm.is_some() {
                    return Err(invalid("generate-imports does not take a WASM_MODULE"));
                }
                if !exports.is_empty() || !externs.is_empty() {
                    return Err(invalid(
                        "generate-imports only reads symbols files (-s/--symbols)",
                    ));
                }
                Ok(Self::GenerateImports { output, symbols })
            }
        }
    }
}

fn invalid(message: &str) -> CliError {
    CliError::InvalidArguments(message.to_string())
}
