//! Logging bootstrap.
//!
//! Library code logs through the `log` facade only; binaries and tests call
//! [`init`] once to install the `env_logger` backend (`RUST_LOG` selects the
//! level, default `info`).

use std::sync::Once;

static INIT: Once = Once::new();

/// Install the `env_logger` backend. Safe to call repeatedly; only the
/// first call has any effect.
pub fn init() {
    INIT.call_once(|| {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format_timestamp(None)
            .init();
    });
}
