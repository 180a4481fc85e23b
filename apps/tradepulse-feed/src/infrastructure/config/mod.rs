//! Configuration Module
//!
//! Configuration loading for the feed server and the watch client.

mod dotenv;
mod settings;

pub use dotenv::load_dotenv;

pub use settings::{
    BroadcastSettings, ClientConfig, ConfigError, EnvLookup, FeedConfig, ProcessEnv,
    ReconnectSettings, SchedulerSettings, ServerSettings,
};
