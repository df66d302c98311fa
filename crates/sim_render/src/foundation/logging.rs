//! Logging utilities and structured logging support

use std::sync::Once;

pub use log::{debug, error, info, trace, warn};

static INIT: Once = Once::new();

/// Initialize the logging system from `RUST_LOG`
///
/// Falls back to `info` when the variable is unset. Subsequent calls are
/// ignored, so tests and binaries may both call it.
pub fn init() {
    init_with_filter(None);
}

/// Initialize the logging system with an explicit `env_logger` filter
///
/// `filter` uses the `env_logger` syntax (e.g. `"sim_render=debug"`). When
/// `None`, `RUST_LOG` is consulted before falling back to `info`.
pub fn init_with_filter(filter: Option<&str>) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();
        match filter {
            Some(filter) => {
                builder.parse_filters(filter);
            }
            None => match std::env::var("RUST_LOG") {
                Ok(filter) => {
                    builder.parse_filters(&filter);
                }
                Err(_) => {
                    builder.filter_level(log::LevelFilter::Info);
                }
            },
        }
        // try_init: a host application may already own the global logger
        if builder.try_init().is_ok() {
            log::debug!("logging initialized");
        }
    });
}

/// Initialize logging from a [`RendererConfig`](crate::config::RendererConfig)
pub fn init_with_config(config: &crate::config::RendererConfig) {
    init_with_filter(config.log_filter.as_deref());
}
