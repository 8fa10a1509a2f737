use std::env;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_SLOT_GRANULARITY_MINUTES: u32 = 15;
pub const DEFAULT_MAX_HORIZON_WEEKS: u32 = 12;
pub const DEFAULT_NOTIFICATION_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_addr: String,
    pub jwt_secret: String,
    /// Smallest slot length; every slot duration must be a multiple of it.
    pub slot_granularity_minutes: u32,
    pub max_horizon_weeks: u32,
    pub notification_webhook_url: Option<String>,
    pub notification_queue_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_addr: DEFAULT_SERVER_ADDR.to_string(),
            jwt_secret: String::new(),
            slot_granularity_minutes: DEFAULT_SLOT_GRANULARITY_MINUTES,
            max_horizon_weeks: DEFAULT_MAX_HORIZON_WEEKS,
            notification_webhook_url: None,
            notification_queue_capacity: DEFAULT_NOTIFICATION_QUEUE_CAPACITY,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            server_addr: env::var("SERVER_ADDR")
                .unwrap_or_else(|_| {
                    warn!("SERVER_ADDR not set, using default {}", DEFAULT_SERVER_ADDR);
                    DEFAULT_SERVER_ADDR.to_string()
                }),
            jwt_secret: env::var("AUTH_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("AUTH_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            slot_granularity_minutes: parse_or_default(
                "SLOT_GRANULARITY_MINUTES",
                DEFAULT_SLOT_GRANULARITY_MINUTES,
            ),
            max_horizon_weeks: parse_or_default("MAX_HORIZON_WEEKS", DEFAULT_MAX_HORIZON_WEEKS),
            notification_webhook_url: env::var("NOTIFICATION_WEBHOOK_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            notification_queue_capacity: parse_or_default(
                "NOTIFICATION_QUEUE_CAPACITY",
                DEFAULT_NOTIFICATION_QUEUE_CAPACITY,
            ),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - authenticated routes will reject every request");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.jwt_secret.is_empty()
    }

    pub fn is_webhook_configured(&self) -> bool {
        self.notification_webhook_url.is_some()
    }
}

fn parse_or_default<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display + PartialOrd + Default,
{
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) if value > T::default() => value,
            _ => {
                warn!("{} has invalid value {:?}, using default {}", key, raw, default);
                default
            }
        },
        Err(_) => {
            warn!("{} not set, using default {}", key, default);
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_not_configured() {
        let config = AppConfig::default();
        assert!(!config.is_configured());
        assert!(!config.is_webhook_configured());
        assert_eq!(config.slot_granularity_minutes, 15);
        assert_eq!(config.max_horizon_weeks, 12);
    }

    #[test]
    fn secret_makes_config_usable() {
        let config = AppConfig {
            jwt_secret: "secret".to_string(),
            ..AppConfig::default()
        };
        assert!(config.is_configured());
    }
}
