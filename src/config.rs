use std::{env, fmt::Display, str::FromStr, time::Duration};

use tracing::{info, warn};

use crate::clients::GatewayCredentials;
use crate::error::ConfigError;

pub struct Config {
    pub port: u16,
    pub gateway: GatewayConfig,
}

/// Everything needed to build a gateway client for one request.
#[derive(Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub basic_auth: String,
    pub subscription_key: String,
    pub trace: String,
    pub timeout: Option<Duration>,
}

impl GatewayConfig {
    pub fn credentials(&self) -> GatewayCredentials {
        GatewayCredentials {
            authorization: self.basic_auth.clone(),
            subscription_key: self.subscription_key.clone(),
            trace: self.trace.clone(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let timeout_secs: u64 = try_load(&lookup, "APIM_TIMEOUT_SECS", "30")?;

        Ok(Self {
            port: try_load(&lookup, "PORT", "8080")?,
            gateway: GatewayConfig {
                base_url: require(&lookup, "APIM_BASE_URL")?,
                basic_auth: load_or_blank(&lookup, "APIM_BASIC_AUTH"),
                subscription_key: load_or_blank(&lookup, "APIM_SUBSCRIPTION_KEY"),
                trace: load_or_blank(&lookup, "APIM_TRACE"),
                timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            },
        })
    }
}

fn require(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String, ConfigError> {
    lookup(key)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::Missing(key.to_string()))
}

// Blank gateway values are still forwarded; the service decides whether to reject them.
fn load_or_blank(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> String {
    match lookup(key) {
        Some(value) if !value.is_empty() => value,
        _ => {
            warn!("{key} not set, requests will carry an empty value");
            String::new()
        }
    }
}

fn try_load<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    lookup(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| ConfigError::Invalid {
            key: key.to_string(),
            message: e.to_string(),
        })
}
