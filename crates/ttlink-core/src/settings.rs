use crate::error::ValidationError;
use jiff::SignedDuration;
use std::time::Duration;
use typed_builder::TypedBuilder;

pub const DEFAULT_TTL_SECONDS: u64 = 86_400;
pub const DEFAULT_MAX_CLICKS: u32 = 10;
pub const DEFAULT_INITIAL_KEY_LENGTH: usize = 6;
pub const DEFAULT_MAX_KEY_LENGTH: usize = 10;
pub const DEFAULT_ATTEMPTS_PER_LENGTH: u32 = 10;
pub const DEFAULT_CLEANUP_INTERVAL_SECONDS: u64 = 60;

/// Longest accepted TTL: 100 years, so `now + ttl` stays inside the
/// timestamp range for any current clock.
pub const MAX_TTL_SECONDS: u64 = 100 * 365 * 86_400;
/// Longest accepted sweep period: one week.
pub const MAX_CLEANUP_INTERVAL_SECONDS: u64 = 7 * 86_400;

/// Configures link lifetimes, key generation and the expiry sweep.
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct LinkSettings {
    /// Lifetime of every new link, in seconds.
    #[builder(default = DEFAULT_TTL_SECONDS)]
    pub ttl_seconds: u64,
    /// Click quota applied when `create` is called without one.
    #[builder(default = DEFAULT_MAX_CLICKS)]
    pub default_max_clicks: u32,
    /// Key length tried first.
    #[builder(default = DEFAULT_INITIAL_KEY_LENGTH)]
    pub initial_key_length: usize,
    /// Longest key length tried before giving up.
    #[builder(default = DEFAULT_MAX_KEY_LENGTH)]
    pub max_key_length: usize,
    /// Random candidates drawn at each length.
    #[builder(default = DEFAULT_ATTEMPTS_PER_LENGTH)]
    pub attempts_per_length: u32,
    /// Period of the expiry sweep, in seconds.
    #[builder(default = DEFAULT_CLEANUP_INTERVAL_SECONDS)]
    pub cleanup_interval_seconds: u64,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl LinkSettings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.ttl_seconds == 0 {
            return Err(invalid("ttl_seconds must be positive"));
        }
        if self.ttl_seconds > MAX_TTL_SECONDS {
            return Err(ValidationError::InvalidSettings(format!(
                "ttl_seconds must be at most {}",
                MAX_TTL_SECONDS
            )));
        }
        if self.default_max_clicks == 0 {
            return Err(invalid("default_max_clicks must be positive"));
        }
        if self.initial_key_length == 0 {
            return Err(invalid("initial_key_length must be positive"));
        }
        if self.max_key_length < self.initial_key_length {
            return Err(invalid("max_key_length must be >= initial_key_length"));
        }
        if self.attempts_per_length == 0 {
            return Err(invalid("attempts_per_length must be positive"));
        }
        if self.cleanup_interval_seconds == 0 {
            return Err(invalid("cleanup_interval_seconds must be positive"));
        }
        if self.cleanup_interval_seconds > MAX_CLEANUP_INTERVAL_SECONDS {
            return Err(ValidationError::InvalidSettings(format!(
                "cleanup_interval_seconds must be at most {}",
                MAX_CLEANUP_INTERVAL_SECONDS
            )));
        }
        Ok(())
    }

    pub fn ttl(&self) -> SignedDuration {
        SignedDuration::from_secs(self.ttl_seconds as i64)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_seconds)
    }
}

fn invalid(message: &str) -> ValidationError {
    ValidationError::InvalidSettings(message.to_string())
}
