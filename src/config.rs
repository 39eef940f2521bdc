//! Per-router configuration.

use std::str::FromStr;

use tracing::Level;
use tracing::level_filters::LevelFilter;

/// Environment variable read by [`RouterConfig::from_env`].
pub const LOG_ENV: &str = "OPROUTER_LOG";

/// Settings fixed when a [`Router`](crate::Router) is built.
///
/// `log_level` is the router's own severity threshold: the router emits no
/// event more verbose than it, whatever the installed subscriber accepts.
/// Logging never changes a dispatch outcome.
///
/// ```rust
/// use oprouter::{Router, RouterConfig};
/// use tracing::level_filters::LevelFilter;
///
/// let router = Router::with_config(
///     RouterConfig::default().name("billing").log_level(LevelFilter::DEBUG),
/// );
/// assert_eq!(router.config().name, "billing");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouterConfig {
    /// Recorded as the `router` field on every event.
    pub name: String,
    pub log_level: LevelFilter,
}

impl RouterConfig {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn log_level(mut self, level: LevelFilter) -> Self {
        self.log_level = level;
        self
    }

    /// Defaults, with the threshold taken from `OPROUTER_LOG` when it holds a
    /// valid level (`off`, `error`, `warn`, `info`, `debug`, `trace`).
    pub fn from_env() -> Self {
        let config = Self::default();
        match std::env::var(LOG_ENV).ok().as_deref().map(LevelFilter::from_str) {
            Some(Ok(level)) => config.log_level(level),
            _ => config,
        }
    }

    /// Whether an event at `level` passes this router's threshold.
    pub fn enabled(&self, level: Level) -> bool {
        level <= self.log_level
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self { name: "router".to_owned(), log_level: LevelFilter::INFO }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_threshold_is_info() {
        let config = RouterConfig::default();

        assert!(config.enabled(Level::ERROR));
        assert!(config.enabled(Level::INFO));
        assert!(!config.enabled(Level::DEBUG));
    }

    #[test]
    fn test_off_disables_everything() {
        let config = RouterConfig::default().log_level(LevelFilter::OFF);
        assert!(!config.enabled(Level::ERROR));
    }

    #[test]
    fn test_trace_enables_everything() {
        let config = RouterConfig::default().log_level(LevelFilter::TRACE);
        assert!(config.enabled(Level::TRACE));
    }

    // Every case lives in one test: the variable is process-wide.
    #[test]
    fn test_from_env_reads_threshold() {
        // SAFETY: no other test in this crate reads or writes `OPROUTER_LOG`.
        unsafe { std::env::set_var(LOG_ENV, "debug") };
        assert_eq!(RouterConfig::from_env().log_level, LevelFilter::DEBUG);

        unsafe { std::env::set_var(LOG_ENV, "OFF") };
        assert_eq!(RouterConfig::from_env().log_level, LevelFilter::OFF);

        unsafe { std::env::set_var(LOG_ENV, "loud") };
        assert_eq!(RouterConfig::from_env(), RouterConfig::default());

        unsafe { std::env::remove_var(LOG_ENV) };
        let config = RouterConfig::from_env();
        assert_eq!(config.log_level, LevelFilter::INFO);
        assert_eq!(config.name, "router");
    }
}
