//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    /// Link the Wasm module and JS files into one script
    Link,
    /// List every symbol the symbols files define or import
    GenerateImports,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ErrorFormat {
    #[default]
    Human,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "js-ld", version)]
#[command(about = "Link a WebAssembly module with JavaScript glue into a universal module", long_about = None)]
pub struct Cli {
    /// What to produce [default: link]
    #[arg(short, long, value_enum)]
    pub action: Option<Action>,

    /// Output file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Symbols file (repeatable)
    #[arg(short = 's', long = "symbols", value_name = "FILE")]
    pub symbols: Vec<PathBuf>,

    /// Exports file (repeatable)
    #[arg(short = 'e', long = "exports", value_name = "FILE")]
    pub exports: Vec<PathBuf>,

    /// Externs file listing permitted globals (repeatable)
    #[arg(short = 'x', long = "externs", value_name = "FILE")]
    pub externs: Vec<PathBuf>,

    /// JSON file with default settings; flags override it
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = ErrorFormat::Human)]
    pub error_format: ErrorFormat,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    pub verbose: bool,

    /// WebAssembly module to link
    #[arg(value_name = "WASM_MODULE")]
    pub wasm: Option<PathBuf>,
}
