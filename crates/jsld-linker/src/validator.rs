//! Unbound-global check over the assembled program.

use std::collections::HashSet;

use jsld_codegen::runtime::RUNTIME_GLOBALS;
use jsld_js::{free_variables, parse_script};
use jsld_types::{ErrorCode, LinkError, Result};
use tracing::debug;

/// Fail if `program` references a global that is neither in `externs` nor
/// one the generated scaffolding needs. Every offending name is listed.
pub fn validate_externs(program: &str, output_name: &str, externs: &[String]) -> Result<()> {
    let parsed = parse_script(output_name, program).map_err(|e| {
        LinkError::internal(format!("generated program does not parse: {}", e.message))
            .in_file(output_name)
    })?;

    let allowed: HashSet<&str> = externs
        .iter()
        .map(String::as_str)
        .chain(RUNTIME_GLOBALS.iter().copied())
        .collect();
    let unbound: Vec<String> = free_variables(&parsed)
        .into_iter()
        .filter(|name| !allowed.contains(name.as_str()))
        .collect();
    debug!(unbound = unbound.len(), "checked externs");

    if unbound.is_empty() {
        return Ok(());
    }
    Err(LinkError::new(
        ErrorCode::UNBOUND_GLOBAL,
        format!(
            "'{output_name}' references {} global variable(s) not declared in any externs file",
            unbound.len()
        ),
    )
    .in_file(output_name)
    .with_items(unbound))
}
