//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directives.
pub(crate) const LOG_ENV: &str = "PANELFE_LOG";

/// Install the global subscriber.
///
/// Filter directives come from `PANELFE_LOG` and fall back to `info`. Logs go
/// to stderr so the tables on stdout stay clean.
pub(crate) fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
