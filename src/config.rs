use std::time::Duration;

use crate::stats::RecomputePolicy;

/// Runtime configuration read from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// When unset the server keeps everything in memory.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub recompute_max_attempts: u32,
    pub recompute_backoff_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env_or("PORT", 3000),
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            database_max_connections: env_or("DATABASE_MAX_CONNECTIONS", 5),
            recompute_max_attempts: env_or("RECOMPUTE_MAX_ATTEMPTS", 3),
            recompute_backoff_ms: env_or("RECOMPUTE_BACKOFF_MS", 25),
        }
    }

    pub fn recompute_policy(&self) -> RecomputePolicy {
        RecomputePolicy {
            max_attempts: self.recompute_max_attempts,
            base_backoff: Duration::from_millis(self.recompute_backoff_ms),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recompute_policy_uses_configured_values() {
        let config = AppConfig {
            port: 3000,
            database_url: None,
            database_max_connections: 5,
            recompute_max_attempts: 4,
            recompute_backoff_ms: 10,
        };
        let policy = config.recompute_policy();
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.base_backoff, Duration::from_millis(10));
    }

    #[test]
    fn unparseable_values_fall_back_to_default() {
        std::env::set_var("CRICKET_STATS_TEST_PORT", "not-a-port");
        assert_eq!(env_or("CRICKET_STATS_TEST_PORT", 3000u16), 3000);
        std::env::remove_var("CRICKET_STATS_TEST_PORT");
    }
}
