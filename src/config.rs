//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Leagues scraped for standings when `STANDINGS_LEAGUES` is unset.
pub const DEFAULT_STANDINGS_LEAGUES: &[&str] = &[
    "liga/argentina.html",
    "liga/premier-league.html",
    "liga/la-liga.html",
    "liga/bundesliga.html",
    "liga/primera-b-nacional.html",
    "liga/brasileirao.html",
    "liga/portugal.html",
    "liga/arabia-saudita.html",
    "liga/ligue-1.html",
    "liga/eredivisie.html",
    "liga/uruguay.html",
    "liga/paraguay.html",
    "liga/chile.html",
    "liga/colombia.html",
    "liga/ecuador.html",
    "liga/peru.html",
    "liga/liga-mx.html",
    "liga/mls.html",
    "liga/segunda-division-espana.html",
    "liga/turquia.html",
    "liga/championship.html",
];

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Directory holding one JSON record per resource, None = in-memory only
    pub data_dir: Option<PathBuf>,
    /// Seconds between frequent scheduler ticks
    pub frequent_interval: u64,
    /// Infrequent loop runs once every this many frequent ticks
    pub infrequent_every: u32,
    /// Per-attempt fetch timeout in seconds
    pub fetch_timeout: u64,
    /// Per-attempt timeout in seconds for the match details resources
    pub details_timeout: u64,
    /// Attempts per refresh before the refresh is reported as failed
    pub fetch_attempts: u32,
    /// Delay between attempts in milliseconds
    pub retry_delay_ms: u64,
    /// Limit in milliseconds on persisting one envelope
    pub store_timeout_ms: u64,
    /// Max age in seconds of yesterday's and tomorrow's fixtures
    pub day_max_age: u64,
    /// Max age in seconds of the standings
    pub standings_max_age: u64,
    /// Max age in seconds of the channel and event listings
    pub listing_max_age: u64,
    /// Base URL of the fixtures site
    pub promiedos_url: String,
    /// Base URL of the standings site
    pub promediosinfo_url: String,
    /// Base URL of the channels and events site
    pub la14hd_url: String,
    /// League page paths scraped for standings
    pub standings_leagues: Vec<String>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `DATA_DIR` - Record directory, empty disables persistence (default: data)
    /// - `FREQUENT_INTERVAL` - Frequent tick in seconds (default: 30)
    /// - `INFREQUENT_EVERY` - Frequent ticks per infrequent tick (default: 10)
    /// - `FETCH_TIMEOUT` - Fetch timeout in seconds (default: 20)
    /// - `DETAILS_TIMEOUT` - Match details timeout in seconds (default: 120)
    /// - `FETCH_ATTEMPTS` - Attempts per refresh (default: 2)
    /// - `RETRY_DELAY_MS` - Delay between attempts (default: 500)
    /// - `STORE_TIMEOUT_MS` - Limit on one envelope save (default: 5000)
    /// - `DAY_MAX_AGE`, `STANDINGS_MAX_AGE` - seconds (default: 3600)
    /// - `LISTING_MAX_AGE` - seconds (default: 300)
    /// - `PROMIEDOS_URL`, `PROMEDIOSINFO_URL`, `LA14HD_URL` - upstream sites
    /// - `STANDINGS_LEAGUES` - comma separated league paths
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            data_dir: match env::var("DATA_DIR") {
                Ok(dir) if dir.trim().is_empty() => None,
                Ok(dir) => Some(PathBuf::from(dir)),
                Err(_) => defaults.data_dir,
            },
            frequent_interval: parse_var("FREQUENT_INTERVAL")
                .filter(|&secs| secs > 0)
                .unwrap_or(defaults.frequent_interval),
            infrequent_every: parse_var("INFREQUENT_EVERY")
                .filter(|&every| every > 0)
                .unwrap_or(defaults.infrequent_every),
            fetch_timeout: parse_var("FETCH_TIMEOUT").unwrap_or(defaults.fetch_timeout),
            details_timeout: parse_var("DETAILS_TIMEOUT").unwrap_or(defaults.details_timeout),
            fetch_attempts: parse_var("FETCH_ATTEMPTS")
                .filter(|&attempts| attempts > 0)
                .unwrap_or(defaults.fetch_attempts),
            retry_delay_ms: parse_var("RETRY_DELAY_MS").unwrap_or(defaults.retry_delay_ms),
            store_timeout_ms: parse_var("STORE_TIMEOUT_MS")
                .filter(|&ms| ms > 0)
                .unwrap_or(defaults.store_timeout_ms),
            day_max_age: parse_var("DAY_MAX_AGE").unwrap_or(defaults.day_max_age),
            standings_max_age: parse_var("STANDINGS_MAX_AGE")
                .unwrap_or(defaults.standings_max_age),
            listing_max_age: parse_var("LISTING_MAX_AGE").unwrap_or(defaults.listing_max_age),
            promiedos_url: env::var("PROMIEDOS_URL").unwrap_or(defaults.promiedos_url),
            promediosinfo_url: env::var("PROMEDIOSINFO_URL")
                .unwrap_or(defaults.promediosinfo_url),
            la14hd_url: env::var("LA14HD_URL").unwrap_or(defaults.la14hd_url),
            standings_leagues: env::var("STANDINGS_LEAGUES")
                .ok()
                .map(|list| split_list(&list))
                .filter(|leagues| !leagues.is_empty())
                .unwrap_or(defaults.standings_leagues),
        }
    }

    /// Interval between frequent scheduler ticks.
    pub fn frequent_period(&self) -> Duration {
        Duration::from_secs(self.frequent_interval)
    }

    /// Timeout applied to each fetch attempt.
    pub fn fetch_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout)
    }

    /// Delay between fetch attempts of one refresh.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Limit on persisting one envelope after a refresh.
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            data_dir: Some(PathBuf::from("data")),
            frequent_interval: 30,
            infrequent_every: 10,
            fetch_timeout: 20,
            details_timeout: 120,
            fetch_attempts: 2,
            retry_delay_ms: 500,
            store_timeout_ms: 5000,
            day_max_age: 3600,
            standings_max_age: 3600,
            listing_max_age: 300,
            promiedos_url: "https://www.promiedos.com.ar/".to_string(),
            promediosinfo_url: "https://promediosinfo.com/".to_string(),
            la14hd_url: "https://la14hd.com/".to_string(),
            standings_leagues: DEFAULT_STANDINGS_LEAGUES
                .iter()
                .map(|league| league.to_string())
                .collect(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.frequent_interval, 30);
        assert_eq!(config.infrequent_every, 10);
        assert_eq!(config.day_max_age, 3600);
        assert_eq!(config.data_dir, Some(PathBuf::from("data")));
        assert_eq!(config.standings_leagues.len(), DEFAULT_STANDINGS_LEAGUES.len());
    }

    #[test]
    fn test_config_durations() {
        let config = Config::default();
        assert_eq!(config.frequent_period(), Duration::from_secs(30));
        assert_eq!(config.fetch_timeout_duration(), Duration::from_secs(20));
        assert_eq!(config.retry_delay(), Duration::from_millis(500));
        assert_eq!(config.store_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list(" liga/a.html, ,liga/b.html "),
            vec!["liga/a.html".to_string(), "liga/b.html".to_string()]
        );
        assert!(split_list(" , ").is_empty());
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        for name in [
            "SERVER_PORT",
            "DATA_DIR",
            "FREQUENT_INTERVAL",
            "INFREQUENT_EVERY",
            "FETCH_ATTEMPTS",
            "STANDINGS_LEAGUES",
        ] {
            env::remove_var(name);
        }

        let config = Config::from_env();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.frequent_interval, 30);
        assert_eq!(config.infrequent_every, 10);
        assert_eq!(config.fetch_attempts, 2);
    }
}
