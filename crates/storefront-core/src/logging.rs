//! Logging setup.
//!
//! Configures the global [`tracing`] subscriber from [`Settings`].

use crate::settings::Settings;

/// Installs the global tracing subscriber.
///
/// The filter comes from `settings.log_level` and falls back to `info` when the
/// directive does not parse. Debug mode uses the pretty formatter; otherwise
/// log lines are emitted as JSON. Calling this twice is harmless: the second
/// install attempt is ignored.
pub fn setup_logging(settings: &Settings) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if settings.debug {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .pretty()
            .try_init()
            .ok();
    } else {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .try_init()
            .ok();
    }
}

/// Creates the span an admin request runs in.
///
/// ```
/// use storefront_core::logging::admin_span;
///
/// let span = admin_span("store.product", "changelist");
/// let _guard = span.enter();
/// tracing::info!("rendering");
/// ```
pub fn admin_span(model_key: &str, view: &str) -> tracing::Span {
    tracing::info_span!("admin", model = model_key, view = view)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_logging_twice_does_not_panic() {
        let settings = Settings {
            log_level: "not a [valid directive".to_string(),
            ..Settings::default()
        };
        setup_logging(&settings);
        setup_logging(&Settings::default());
    }
}
