//! Diagnostic logging for mdrec.
//!
//! Logs go to stderr so stdout stays reserved for the operator and
//! `Progress:` lines. `RUST_LOG` overrides the default filter; `--verbose`
//! raises the default from `info` to `debug`.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "mdrec=debug,mdrec_core=debug"
    } else {
        "mdrec=info,mdrec_core=info"
    }
}

/// Install the global subscriber
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbose),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_raises_level() {
        assert!(default_filter(true).contains("mdrec_core=debug"));
        assert!(default_filter(false).contains("mdrec_core=info"));
    }
}
