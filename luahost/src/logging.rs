//! Diagnostic logging for the `luahost` binary.
//!
//! Library code only emits `tracing` events; installing a subscriber is the
//! binary's job.  Logs go to stderr so they never mix with script output.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset and `--debug` is not given.
pub const DEFAULT_FILTER: &str = "warn";

/// Pick the log filter: `--debug` wins, then `RUST_LOG`, then
/// [`DEFAULT_FILTER`].
pub fn filter(debug: bool) -> EnvFilter {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    filter_from(debug, rust_log.as_deref())
}

/// [`filter`] with the `RUST_LOG` value passed in.  An unparsable value
/// falls back to [`DEFAULT_FILTER`].
fn filter_from(debug: bool, rust_log: Option<&str>) -> EnvFilter {
    if debug {
        return EnvFilter::new("luahost=debug");
    }
    rust_log
        .and_then(|spec| EnvFilter::try_new(spec).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber.  Later calls are ignored.
pub fn init(debug: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(debug))
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_flag_overrides_rust_log() {
        assert_eq!(filter_from(true, Some("trace")).to_string(), "luahost=debug");
        assert_eq!(filter(true).to_string(), "luahost=debug");
    }

    #[test]
    fn rust_log_is_used_when_set() {
        assert_eq!(filter_from(false, Some("luahost=info")).to_string(), "luahost=info");
    }

    #[test]
    fn default_without_rust_log() {
        assert_eq!(filter_from(false, None).to_string(), DEFAULT_FILTER);
    }

    #[test]
    fn bad_rust_log_falls_back_to_default() {
        assert_eq!(filter_from(false, Some("!!!")).to_string(), DEFAULT_FILTER);
    }
}
