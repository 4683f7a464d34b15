use crate::Mode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Initialize tracing with mode-aware configuration
///
/// - **Release** (`mode = release`):
///   - JSON format (for log aggregation)
///   - Hides module targets for cleaner logs
///
/// - **Debug / Test** (default):
///   - Pretty-printed format (human-readable)
///   - Shows module targets for debugging
///
/// `RUST_LOG` overrides the default filter (e.g. "debug", "push_worker=trace").
///
/// This function is infallible - if tracing is already initialized, it silently continues.
pub fn init_tracing(mode: &Mode) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if mode.is_release() {
            EnvFilter::new("info,tower_http=info")
        } else {
            EnvFilter::new("debug,tower_http=debug,hyper=info")
        }
    });

    let result = if mode.is_release() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .pretty()
            .try_init()
    };

    match result {
        Ok(_) => {
            info!("Tracing initialized. Mode: {}", mode);
        }
        Err(_) => {
            // Already initialized, which is fine (common in tests)
            debug!("Tracing already initialized, skipping re-initialization");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_debug() {
        init_tracing(&Mode::Debug);
    }

    #[test]
    fn test_init_tracing_release() {
        init_tracing(&Mode::Release);
    }

    #[test]
    fn test_init_tracing_multiple_calls() {
        init_tracing(&Mode::Debug);
        init_tracing(&Mode::Debug);
    }

    #[test]
    fn test_init_tracing_with_rust_log_env() {
        temp_env::with_var("RUST_LOG", Some("trace"), || {
            init_tracing(&Mode::Test);
        });
    }
}
