// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Settings shared by the authenticator and the calls.
//!
//! `Settings::load` reads an optional configuration file (any format the `config` crate
//! understands, picked by extension) and then lets `BIRDCALL_*` environment variables override
//! it, so `BIRDCALL_CONSUMER_KEY` sets `consumer_key`:
//!
//! ```toml
//! consumer_key = "xvz1evFS4wEEPTGEFPHBog"
//! consumer_secret = "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw"
//! default_delay_seconds = 30
//! default_max_records = 100
//! search_text = "rustlang"
//! max_message = 10
//! ```
//!
//! Only the consumer key and secret are required. The streaming defaults have to be positive.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::auth::KeyPair;
use crate::error::Result;

const ENV_PREFIX: &str = "BIRDCALL";

fn default_delay_seconds() -> u64 {
    30
}

fn default_max_records() -> usize {
    100
}

/// Configuration values read at startup.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    /// The consumer key of the registered app.
    pub consumer_key: String,
    /// The consumer secret of the registered app.
    pub consumer_secret: String,
    /// How long a streaming call keeps reading when it wasn't given its own delay.
    #[serde(default = "default_delay_seconds")]
    pub default_delay_seconds: u64,
    /// How many records a streaming call collects when it wasn't given its own maximum.
    #[serde(default = "default_max_records")]
    pub default_max_records: usize,
    /// The query used by `search::search` and `stream::filter`.
    #[serde(default)]
    pub search_text: Option<String>,
    /// The page size used by `search::search`.
    #[serde(default)]
    pub max_message: Option<u32>,
}

impl Settings {
    /// Loads settings from the file at `path` (if it exists) and the `BIRDCALL_*` environment
    /// variables.
    pub fn load(path: &str) -> Result<Settings> {
        let config = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?;

        Settings::from_config(config)
    }

    /// Deserializes and validates settings from an already assembled `Config`.
    pub fn from_config(config: Config) -> Result<Settings> {
        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.default_delay_seconds == 0 {
            return Err(ConfigError::Message(
                "default_delay_seconds must be a positive number".into(),
            ));
        }
        if self.default_max_records == 0 {
            return Err(ConfigError::Message(
                "default_max_records must be a positive number".into(),
            ));
        }
        Ok(())
    }

    /// Returns the consumer key and secret as the pair used to sign requests.
    pub fn consumer_pair(&self) -> KeyPair {
        KeyPair::new(self.consumer_key.clone(), self.consumer_secret.clone())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::Error;
    use config::FileFormat;

    pub(crate) fn settings_from_toml(source: &str) -> Result<Settings> {
        let config = Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?;
        Settings::from_config(config)
    }

    #[test]
    fn defaults_are_applied() {
        let settings = settings_from_toml(
            r#"
            consumer_key = "CK"
            consumer_secret = "CS"
            "#,
        )
        .unwrap();

        assert_eq!(settings.default_delay_seconds, 30);
        assert_eq!(settings.default_max_records, 100);
        assert_eq!(settings.search_text, None);
        assert_eq!(settings.consumer_pair(), KeyPair::new("CK", "CS"));
    }

    #[test]
    fn everything_set() {
        let settings = settings_from_toml(
            r#"
            consumer_key = "CK"
            consumer_secret = "CS"
            default_delay_seconds = 5
            default_max_records = 20
            search_text = "hello"
            max_message = 10
            "#,
        )
        .unwrap();

        assert_eq!(settings.default_delay_seconds, 5);
        assert_eq!(settings.default_max_records, 20);
        assert_eq!(settings.search_text.as_deref(), Some("hello"));
        assert_eq!(settings.max_message, Some(10));
    }

    #[test]
    fn secret_is_required() {
        let err = settings_from_toml(r#"consumer_key = "CK""#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn zero_defaults_are_rejected() {
        let err = settings_from_toml(
            r#"
            consumer_key = "CK"
            consumer_secret = "CS"
            default_max_records = 0
            "#,
        )
        .unwrap_err();

        assert!(err.to_string().contains("default_max_records"));
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let config = Config::builder()
            .add_source(File::with_name("sample_payloads/does-not-exist").required(false))
            .add_source(File::from_str(
                "consumer_key = \"CK\"\nconsumer_secret = \"CS\"",
                FileFormat::Toml,
            ))
            .build()
            .unwrap();

        let settings = Settings::from_config(config).unwrap();
        assert_eq!(settings.consumer_key, "CK");
    }
}
