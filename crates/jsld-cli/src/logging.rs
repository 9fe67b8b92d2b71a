//! Logging setup.

use std::io::IsTerminal;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging from `$RUST_LOG`. Logs are disabled when it is unset,
/// unless `verbose` raises the default to `debug`.
pub fn set_up_logging(verbose: bool) {
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .with_ansi(should_emit_colors())
        .with_writer(std::io::stderr)
        .compact();

    let default = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::OFF
    };
    let filter_layer = EnvFilter::builder()
        .with_default_directive(default.into())
        .from_env_lossy();

    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init();
}

/// ANSI colors only on a terminal, and never with `NO_COLOR` set.
fn should_emit_colors() -> bool {
    std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}
