use crate::config::AppSettings;

/// Installs the console log handler for non-debug profiles.
///
/// Debug profiles own their log output through development tooling, so this
/// code adds nothing there. Everywhere else an `env_logger` handler is
/// installed with a default `info` filter (`RUST_LOG` still overrides).
///
/// Returns whether this call installed the handler. `try_init` makes a
/// repeated call a no-op rather than a panic.
pub fn init(settings: &AppSettings) -> bool {
    if settings.app.debug {
        return false;
    }

    env_logger::Builder::from_env(env_logger::Env::new().default_filter_or("info"))
        .try_init()
        .is_ok()
}
