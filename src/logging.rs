use env_logger::Env;

/// Initializes env_logger. `RUST_LOG` overrides `default_filter`.
/// Calling it more than once is harmless.
pub fn init_logging(default_filter: &str) {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .try_init();
}
