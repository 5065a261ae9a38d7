//! Client configuration.
//!
//! The Supabase project URL and anon key are public values; they are read
//! from the environment (or a `.env` file loaded by the caller) or from a
//! saved CLI profile. Secret credentials never belong here.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::remote::postgrest::DEFAULT_REQUEST_TIMEOUT;
use crate::util::{is_http_url, normalize_text_option};
use crate::{Error, Result};

/// Environment variables checked for the project URL, in priority order.
pub const URL_ENV_VARS: [&str; 3] = [
    "HABIT_SUPABASE_URL",
    "SUPABASE_URL",
    "EXPO_PUBLIC_SUPABASE_URL",
];

/// Environment variables checked for the anon key, in priority order.
pub const ANON_KEY_ENV_VARS: [&str; 3] = [
    "HABIT_SUPABASE_ANON_KEY",
    "SUPABASE_ANON_KEY",
    "EXPO_PUBLIC_SUPABASE_ANON_KEY",
];

const TIMEOUT_ENV_VAR: &str = "HABIT_REQUEST_TIMEOUT_SECS";

/// Connection settings for the hosted backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}

impl SupabaseConfig {
    /// Validate and normalize a URL/key pair.
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Result<Self> {
        let url = normalize_text_option(Some(url.into()))
            .ok_or_else(|| Error::InvalidInput("Supabase URL is required".to_string()))?;
        if !is_http_url(&url) {
            return Err(Error::InvalidInput(
                "Supabase URL must include http:// or https://".to_string(),
            ));
        }
        let anon_key = normalize_text_option(Some(anon_key.into()))
            .ok_or_else(|| Error::InvalidInput("Supabase anon key is required".to_string()))?;

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            anon_key,
            request_timeout_secs: default_timeout_secs(),
        })
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Read configuration from process environment variables.
    ///
    /// Returns `Ok(None)` when neither value is set and an error when only
    /// one of them is.
    pub fn from_env() -> Result<Option<Self>> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`Self::from_env`] with an injectable variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<Self>> {
        let first_set = |names: &[&str]| {
            names
                .iter()
                .copied()
                .find_map(|name| normalize_text_option(lookup(name)))
        };

        let mut config = match (first_set(&URL_ENV_VARS), first_set(&ANON_KEY_ENV_VARS)) {
            (None, None) => return Ok(None),
            (Some(url), Some(anon_key)) => Self::new(url, anon_key)?,
            (Some(_), None) => {
                return Err(Error::InvalidInput(format!(
                    "Missing Supabase anon key: set {}",
                    ANON_KEY_ENV_VARS[0]
                )))
            }
            (None, Some(_)) => {
                return Err(Error::InvalidInput(format!(
                    "Missing Supabase URL: set {}",
                    URL_ENV_VARS[0]
                )))
            }
        };

        if let Some(raw) = normalize_text_option(lookup(TIMEOUT_ENV_VAR)) {
            config.request_timeout_secs = raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "{TIMEOUT_ENV_VAR} must be a positive whole number of seconds"
                    ))
                })?;
        }

        Ok(Some(config))
    }
}
