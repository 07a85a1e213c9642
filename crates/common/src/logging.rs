//! Structured logging init, shared by the curator binary and the gateway.

use crate::config::ObservabilityConfig;
use tracing_subscriber::{fmt, EnvFilter};

pub fn init(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    let subscriber = fmt().with_env_filter(filter);

    if config.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
