//! Logger setup

/// Initialize env_logger, honoring `RUST_LOG` over `default_filter`
///
/// Safe to call more than once; later calls are ignored.
pub fn init(default_filter: &str) {
    let result = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter),
    )
    .format_timestamp_millis()
    .try_init();

    if result.is_err() {
        log::debug!("Logger already initialized");
    }
}
