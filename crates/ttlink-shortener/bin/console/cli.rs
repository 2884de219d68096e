use clap::{Parser, ValueEnum};
use std::fmt::{Display, Formatter};
use ttlink_core::settings::{
    DEFAULT_ATTEMPTS_PER_LENGTH, DEFAULT_CLEANUP_INTERVAL_SECONDS, DEFAULT_INITIAL_KEY_LENGTH,
    DEFAULT_MAX_CLICKS, DEFAULT_MAX_KEY_LENGTH, DEFAULT_TTL_SECONDS,
};
use ttlink_core::LinkSettings;

pub const TTL_SECONDS_ENV: &str = "TTLINK_TTL_SECONDS";
pub const DEFAULT_MAX_CLICKS_ENV: &str = "TTLINK_DEFAULT_MAX_CLICKS";
pub const KEY_LENGTH_INITIAL_ENV: &str = "TTLINK_KEY_LENGTH_INITIAL";
pub const KEY_LENGTH_MAX_ENV: &str = "TTLINK_KEY_LENGTH_MAX";
pub const KEY_ATTEMPTS_PER_LENGTH_ENV: &str = "TTLINK_KEY_ATTEMPTS_PER_LENGTH";
pub const CLEANUP_INTERVAL_SECONDS_ENV: &str = "TTLINK_CLEANUP_INTERVAL_SECONDS";
pub const LOG_FORMAT_ENV: &str = "TTLINK_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[value(name = "text")]
    Text,
    #[value(name = "json")]
    Json,
}

impl Display for LogFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "ttlink", about = "Interactive URL shortener with expiring links")]
pub struct CLI {
    /// Lifetime of every new link, in seconds.
    #[arg(long, env = TTL_SECONDS_ENV, default_value_t = DEFAULT_TTL_SECONDS)]
    pub ttl_seconds: u64,

    /// Click quota used when `create` is given none.
    #[arg(long, env = DEFAULT_MAX_CLICKS_ENV, default_value_t = DEFAULT_MAX_CLICKS)]
    pub default_max_clicks: u32,

    #[arg(long, env = KEY_LENGTH_INITIAL_ENV, default_value_t = DEFAULT_INITIAL_KEY_LENGTH)]
    pub key_length_initial: usize,

    #[arg(long, env = KEY_LENGTH_MAX_ENV, default_value_t = DEFAULT_MAX_KEY_LENGTH)]
    pub key_length_max: usize,

    #[arg(
        long,
        env = KEY_ATTEMPTS_PER_LENGTH_ENV,
        default_value_t = DEFAULT_ATTEMPTS_PER_LENGTH
    )]
    pub key_attempts_per_length: u32,

    /// Seconds between expiry sweeps.
    #[arg(
        long,
        env = CLEANUP_INTERVAL_SECONDS_ENV,
        default_value_t = DEFAULT_CLEANUP_INTERVAL_SECONDS
    )]
    pub cleanup_interval_seconds: u64,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl CLI {
    pub fn settings(&self) -> LinkSettings {
        LinkSettings::builder()
            .ttl_seconds(self.ttl_seconds)
            .default_max_clicks(self.default_max_clicks)
            .initial_key_length(self.key_length_initial)
            .max_key_length(self.key_length_max)
            .attempts_per_length(self.key_attempts_per_length)
            .cleanup_interval_seconds(self.cleanup_interval_seconds)
            .build()
    }
}
