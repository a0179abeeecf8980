use crate::Environment;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Install color-eyre panic and error report handlers.
///
/// Call before anything fallible in `main`, so startup errors (missing
/// `DATABASE_URL`, unreachable runtime socket) render with full span
/// traces. Safe to call more than once.
pub fn install_color_eyre() {
    if color_eyre::install().is_err() {
        debug!("color-eyre already installed, skipping re-initialization");
    }
}

/// Initialize tracing for the deployment flavor.
///
/// - **Production** (`APP_ENV=production`): JSON lines for log
///   aggregation, module targets hidden.
/// - **Development** (default): pretty-printed with targets, verbose
///   enough to watch a provisioning flow end to end.
///
/// `RUST_LOG` overrides the filter either way, e.g.
/// `RUST_LOG=control_plane=trace,sea_orm=warn`. The background loops log
/// their heartbeats at `debug`, so the development default surfaces them
/// and the production default does not.
///
/// Infallible: re-initialization (common in tests) is a no-op.
pub fn init_tracing(environment: &Environment) {
    let is_production = environment.is_production();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if is_production {
            EnvFilter::new("info,tower_http=info,sea_orm=warn")
        } else {
            EnvFilter::new("debug,tower_http=debug,sea_orm=info")
        }
    });

    let result = if is_production {
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
            info!("Tracing initialized. Environment: {:?}", environment);
        }
        Err(_) => {
            debug!("Tracing already initialized, skipping re-initialization");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initializes_for_both_flavors_and_tolerates_repeats() {
        init_tracing(&Environment::Development);
        init_tracing(&Environment::Production);
        init_tracing(&Environment::Development); // already installed, no panic
    }

    #[test]
    fn rust_log_override_is_accepted() {
        temp_env::with_var("RUST_LOG", Some("control_plane=trace"), || {
            init_tracing(&Environment::Development);
        });
    }
}
