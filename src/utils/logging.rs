use std::sync::Once;

use tracing_subscriber::EnvFilter;

static TRACING_INIT: Once = Once::new();

const DEFAULT_DIRECTIVE: &str = "cashbook_core=info";

/// Initializes the global tracing subscriber with sensible defaults.
///
/// `RUST_LOG` directives are honored as given; without them the crate logs at
/// `info`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let filter = env_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref());

        // A host application may already own the global subscriber.
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    });
}

/// Filter for the given `RUST_LOG` value. An unset, blank or unparseable value
/// falls back to the crate default.
fn env_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .filter(|raw| !raw.trim().is_empty())
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE))
}
