//! Client configuration loaded from environment variables.
//!
//! Every setting has a default, so a session can start with no
//! configuration at all.

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// SQLite file backing the local document store.
    /// Env: `HERD_DB_PATH`
    /// Default: `None` (the platform data directory).
    pub db_path: Option<PathBuf>,

    /// Use the in-memory backend instead of SQLite.
    /// Env: `HERD_IN_MEMORY` (true/false)
    /// Default: `false`
    pub in_memory: bool,

    /// Posts further than this from the feed centre are hidden.
    /// Env: `HERD_FEED_RADIUS_KM`
    /// Default: `8.0`
    pub feed_radius_km: f64,

    /// Maximum number of posts fetched for the feed.
    /// Env: `HERD_FEED_LIMIT`
    /// Default: `100`
    pub feed_limit: usize,

    /// Refuse mutations while `system/status` reports an outage.
    /// Env: `HERD_REQUIRE_STATUS` (true/false)
    /// Default: `true`
    pub require_status: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            in_memory: false,
            feed_radius_km: 8.0,
            feed_limit: 100,
            require_status: true,
        }
    }
}

impl ClientConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, falling back to defaults for
    /// missing or unparsable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup("HERD_DB_PATH") {
            if !path.is_empty() {
                config.db_path = Some(PathBuf::from(path));
            }
        }

        if let Some(val) = lookup("HERD_IN_MEMORY") {
            config.in_memory = parse_flag(&val);
        }

        if let Some(val) = lookup("HERD_FEED_RADIUS_KM") {
            match val.parse::<f64>() {
                Ok(km) if km.is_finite() && km > 0.0 => config.feed_radius_km = km,
                _ => tracing::warn!(value = %val, "Invalid HERD_FEED_RADIUS_KM, using default"),
            }
        }

        if let Some(val) = lookup("HERD_FEED_LIMIT") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.feed_limit = n,
                _ => tracing::warn!(value = %val, "Invalid HERD_FEED_LIMIT, using default"),
            }
        }

        if let Some(val) = lookup("HERD_REQUIRE_STATUS") {
            config.require_status = parse_flag(&val);
        }

        config
    }
}

fn parse_flag(val: &str) -> bool {
    val != "false" && val != "0"
}
