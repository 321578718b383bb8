use clap::Parser;
use std::time::Duration;

use crate::sim::monte_carlo::DEFAULT_TRIALS;

/// NFL what-if simulator API
#[derive(Parser, Debug, Clone)]
#[command(name = "gridiron-whatif", version, about)]
pub struct Config {
    /// API listen address
    #[arg(long, env = "API_ADDR", default_value = "0.0.0.0:8080")]
    pub api_addr: String,

    /// SQLite database path
    #[arg(long, env = "DATABASE_PATH", default_value = "whatif.db")]
    pub database_path: String,

    /// Base URL of the nflverse play-by-play release assets
    #[arg(
        long,
        env = "NFLVERSE_BASE_URL",
        default_value = "https://github.com/nflverse/nflverse-data/releases/download/pbp"
    )]
    pub nflverse_base_url: String,

    /// Timeout for a season download, in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value = "120")]
    pub http_timeout_secs: u64,

    /// Monte Carlo trials when a request does not name a count
    #[arg(long, env = "DEFAULT_TRIALS", default_value_t = DEFAULT_TRIALS)]
    pub default_trials: u32,

    /// Upper bound on trials per request
    #[arg(long, env = "MAX_TRIALS", default_value = "100000")]
    pub max_trials: u32,

    /// Simulation worker threads (0 = one per core)
    #[arg(long, env = "WORKER_THREADS", default_value = "0")]
    pub worker_threads: usize,

    /// Wall-clock budget per Monte Carlo batch in seconds (0 = none)
    #[arg(long, env = "SIMULATION_DEADLINE_SECS", default_value = "30")]
    pub simulation_deadline_secs: u64,

    /// How long a loaded game stays cached, in seconds
    #[arg(long, env = "GAME_CACHE_TTL_SECS", default_value = "600")]
    pub game_cache_ttl_secs: u64,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_addr.parse::<std::net::SocketAddr>().is_err() {
            anyhow::bail!("api_addr '{}' is not a socket address", self.api_addr);
        }
        if let Err(e) = url::Url::parse(&self.nflverse_base_url) {
            anyhow::bail!("nflverse_base_url is not a valid URL: {}", e);
        }
        if self.http_timeout_secs == 0 {
            anyhow::bail!("http_timeout_secs must be positive");
        }
        if self.default_trials == 0 {
            anyhow::bail!("default_trials must be positive");
        }
        if self.default_trials > self.max_trials {
            anyhow::bail!(
                "default_trials ({}) must not exceed max_trials ({})",
                self.default_trials,
                self.max_trials
            );
        }
        if self.game_cache_ttl_secs == 0 {
            anyhow::bail!("game_cache_ttl_secs must be positive");
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn simulation_deadline(&self) -> Option<Duration> {
        (self.simulation_deadline_secs > 0).then(|| Duration::from_secs(self.simulation_deadline_secs))
    }

    pub fn game_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.game_cache_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["gridiron-whatif"];
        argv.extend_from_slice(args);
        Config::parse_from(argv)
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = parse(&[]);
        assert!(config.validate().is_ok());
        assert_eq!(config.default_trials, 5000);
        assert_eq!(config.simulation_deadline(), Some(Duration::from_secs(30)));
        assert_eq!(config.game_cache_ttl(), Duration::from_secs(600));
    }

    #[test]
    fn test_zero_deadline_means_none() {
        let config = parse(&["--simulation-deadline-secs", "0"]);
        assert_eq!(config.simulation_deadline(), None);
    }

    #[test]
    fn test_default_trials_above_max_rejected() {
        let config = parse(&["--default-trials", "500", "--max-trials", "100"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_base_url_rejected() {
        let config = parse(&["--nflverse-base-url", "not a url"]);
        assert!(config.validate().is_err());
    }
}
