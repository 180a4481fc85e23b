//! Feed Configuration Settings
//!
//! Configuration types for the feed server and the watch client, loaded from
//! environment variables.

use std::time::Duration;

/// Source of configuration values, keyed by variable name.
pub trait EnvLookup {
    /// Value of `key`, if set.
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvLookup for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl<F> EnvLookup for F
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        self(key)
    }
}

// =============================================================================
// Server Settings
// =============================================================================

/// Server port settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// HTTP port for the WebSocket feed and subscription API.
    pub api_port: u16,
    /// Health check HTTP port.
    pub health_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            api_port: 5000,
            health_port: 8082,
        }
    }
}

/// Tick scheduler settings.
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// Spacing between ticks.
    pub tick_interval: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(1000),
        }
    }
}

/// Broadcast hub settings.
#[derive(Debug, Clone)]
pub struct BroadcastSettings {
    /// Outbound queue depth per connection.
    pub connection_queue_capacity: usize,
}

impl Default for BroadcastSettings {
    fn default() -> Self {
        Self {
            connection_queue_capacity: 16,
        }
    }
}

/// Complete feed server configuration.
#[derive(Debug, Clone, Default)]
pub struct FeedConfig {
    /// Server port settings.
    pub server: ServerSettings,
    /// Tick scheduler settings.
    pub scheduler: SchedulerSettings,
    /// Broadcast hub settings.
    pub broadcast: BroadcastSettings,
    /// Users registered in the in-memory directory at startup.
    pub seed_users: Vec<String>,
}

impl FeedConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is present but unusable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&ProcessEnv)
    }

    /// Create configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns an error if the tick interval or queue capacity is zero.
    pub fn from_lookup(env: &impl EnvLookup) -> Result<Self, ConfigError> {
        let server = ServerSettings {
            api_port: parse_env(env, "TRADEPULSE_API_PORT", ServerSettings::default().api_port),
            health_port: parse_env(
                env,
                "TRADEPULSE_HEALTH_PORT",
                ServerSettings::default().health_port,
            ),
        };

        let tick_interval = parse_env_duration_millis(
            env,
            "TRADEPULSE_TICK_INTERVAL_MS",
            SchedulerSettings::default().tick_interval,
        );
        if tick_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "TRADEPULSE_TICK_INTERVAL_MS".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        let connection_queue_capacity = parse_env(
            env,
            "TRADEPULSE_CONNECTION_QUEUE",
            BroadcastSettings::default().connection_queue_capacity,
        );
        if connection_queue_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "TRADEPULSE_CONNECTION_QUEUE".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        let seed_users = env
            .get("TRADEPULSE_SEED_USERS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            server,
            scheduler: SchedulerSettings { tick_interval },
            broadcast: BroadcastSettings {
                connection_queue_capacity,
            },
            seed_users,
        })
    }
}

// =============================================================================
// Client Settings
// =============================================================================

/// Reconnection settings for the feed client.
#[derive(Debug, Clone)]
pub struct ReconnectSettings {
    /// Initial reconnection delay.
    pub delay_initial: Duration,
    /// Maximum reconnection delay.
    pub delay_max: Duration,
    /// Reconnection delay multiplier for exponential backoff.
    pub delay_multiplier: f64,
    /// Maximum reconnection attempts before giving up (0 = unlimited).
    pub max_attempts: u32,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            delay_initial: Duration::from_millis(500),
            delay_max: Duration::from_secs(30),
            delay_multiplier: 2.0,
            max_attempts: 0,
        }
    }
}

/// Watch client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket URL of the real-time channel.
    pub feed_url: String,
    /// Base URL of the subscription API.
    pub api_url: String,
    /// Reconnection settings.
    pub reconnect: ReconnectSettings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            feed_url: "ws://127.0.0.1:5000/ws".to_string(),
            api_url: "http://127.0.0.1:5000/api".to_string(),
            reconnect: ReconnectSettings::default(),
        }
    }
}

impl ClientConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a URL variable is set but empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&ProcessEnv)
    }

    /// Create configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns an error if a URL variable is set but empty.
    pub fn from_lookup(env: &impl EnvLookup) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let feed_url = parse_env_url(env, "TRADEPULSE_FEED_URL", defaults.feed_url)?;
        let api_url = parse_env_url(env, "TRADEPULSE_API_URL", defaults.api_url)?;

        let reconnect = ReconnectSettings {
            delay_initial: parse_env_duration_millis(
                env,
                "TRADEPULSE_RECONNECT_DELAY_INITIAL_MS",
                defaults.reconnect.delay_initial,
            ),
            delay_max: parse_env_duration_secs(
                env,
                "TRADEPULSE_RECONNECT_DELAY_MAX_SECS",
                defaults.reconnect.delay_max,
            ),
            delay_multiplier: parse_env(
                env,
                "TRADEPULSE_RECONNECT_DELAY_MULTIPLIER",
                defaults.reconnect.delay_multiplier,
            ),
            max_attempts: parse_env(
                env,
                "TRADEPULSE_MAX_RECONNECT_ATTEMPTS",
                defaults.reconnect.max_attempts,
            ),
        };

        Ok(Self {
            feed_url,
            api_url,
            reconnect,
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable has an unusable value.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// What is wrong with it.
        reason: String,
    },
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
}

fn parse_env<T: std::str::FromStr>(env: &impl EnvLookup, key: &str, default: T) -> T {
    env.get(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(env: &impl EnvLookup, key: &str, default: Duration) -> Duration {
    env.get(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_env_duration_millis(env: &impl EnvLookup, key: &str, default: Duration) -> Duration {
    env.get(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}

fn parse_env_url(env: &impl EnvLookup, key: &str, default: String) -> Result<String, ConfigError> {
    match env.get(key) {
        None => Ok(default),
        Some(v) if v.trim().is_empty() => Err(ConfigError::EmptyValue(key.to_string())),
        Some(v) => Ok(v.trim().trim_end_matches('/').to_string()),
    }
}
