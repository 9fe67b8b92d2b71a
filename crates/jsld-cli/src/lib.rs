//! The `js-ld` command.
//!
//! ```text
//! js-ld -s libc.js -e api.js -x browser.js -o app.js app.wasm
//! js-ld -a generate-imports -s libc.js -o imports.txt
//! ```
//!
//! Arguments are merged with an optional JSON config file and validated
//! before any input is read. Output is written atomically, so a failed
//! link never leaves a partial file behind.

pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod logging;

pub use cli::{Action, Cli, ErrorFormat};
pub use config::{ConfigFile, Invocation};
pub use error::CliError;

use jsld_types::LinkError;

/// Resolve and execute `cli`.
pub fn run(cli: &Cli) -> Result<(), LinkError> {
    let invocation = Invocation::resolve(cli)?;
    driver::execute(&invocation)?;
    Ok(())
}

/// Render an error for the terminal.
pub fn render_error(err: &LinkError, format: ErrorFormat) -> String {
    match format {
        ErrorFormat::Human => match &err.file {
            Some(file) if !err.message.contains(file.as_str()) => {
                format!("error: {err}\n  --> {file}")
            }
            _ => format!("error: {err}"),
        },
        ErrorFormat::Json => err.to_json(),
    }
}
