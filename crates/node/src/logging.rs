//! A module for anything related to logging
use std::env;

use eyre::{Result, WrapErr};
use tracing_subscriber::filter::{Directive, EnvFilter};
use tracing_subscriber::fmt::Subscriber;

/// Environment variable holding the log filter directives
pub const ENV_KEY: &str = "TERRA_LOG";

/// Install the global subscriber, filtering with the directives from
/// [`ENV_KEY`] or, when it is not set, with `default`
pub fn init_from_env_or(default: impl Into<Directive>) -> Result<()> {
    let filter = filter_from_env_or(default);
    set_subscriber(filter)
}

/// The filter from [`ENV_KEY`] or a filter with the `default` directive
pub fn filter_from_env_or(default: impl Into<Directive>) -> EnvFilter {
    env::var(ENV_KEY)
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::default().add_directive(default.into()))
}

/// Install the global subscriber with the given filter
pub fn set_subscriber(filter: EnvFilter) -> Result<()> {
    let my_collector = Subscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(my_collector)
        .wrap_err("Failed to set log subscriber")
}
