//! Environment configuration for different deployment stages

use std::env;
use std::fmt;
use std::time::Duration;

use blob_storage::ContainerName;

use crate::record_service::{
    AccessPolicySettings, RecordError, RecordResult, StorageSettings, DEFAULT_POLICY_ID,
    DEFAULT_POLICY_TTL, DEFAULT_STORAGE_TIMEOUT,
};

/// Connection string used in development when none is configured (local emulator)
const DEVELOPMENT_CONNECTION_STRING: &str = "UseDevelopmentStorage=true";

/// Container used in development when none is configured
const DEVELOPMENT_CONTAINER: &str = "patient-images";

/// Application environment configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Production environment
    Production,
    /// Staging environment
    Staging,
    /// Development environment (uses the local storage emulator)
    Development,
}

impl Environment {
    /// Creates an Environment from the `APP_ENV` environment variable
    ///
    /// Defaults to development when `APP_ENV` is not set.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::ConfigurationInvalid` if `APP_ENV` holds an unknown value
    pub fn from_env() -> RecordResult<Self> {
        let env = env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .trim()
            .to_lowercase();

        match env.as_str() {
            "production" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            "development" => Ok(Self::Development),
            _ => Err(RecordError::ConfigurationInvalid(format!(
                "Invalid environment: {env}"
            ))),
        }
    }

    /// Whether to show API docs
    #[must_use]
    pub const fn show_api_docs(&self) -> bool {
        matches!(self, Self::Development | Self::Staging)
    }

    /// Whether logs should be emitted as JSON
    #[must_use]
    pub const fn json_logs(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }

    /// Reads the storage settings for the environment
    ///
    /// Staging and production must configure the connection string and container
    /// explicitly; development falls back to the local emulator.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::ConfigurationInvalid` for missing required values,
    /// unparseable numbers or an invalid container name
    pub fn storage_settings(&self) -> RecordResult<StorageSettings> {
        let connection_string = self.required_or_default(
            "STORAGE_ACCOUNT_CONNECTION_STRING",
            DEVELOPMENT_CONNECTION_STRING,
        )?;
        let container = self.required_or_default("STORAGE_ACCOUNT_CONTAINER", DEVELOPMENT_CONTAINER)?;
        let container = ContainerName::parse(container)
            .map_err(|e| RecordError::ConfigurationInvalid(e.to_string()))?;

        let policy = AccessPolicySettings::new(
            optional("ACCESS_POLICY_ID").unwrap_or_else(|| DEFAULT_POLICY_ID.to_string()),
            secs("ACCESS_POLICY_TTL_SECS")?.unwrap_or(DEFAULT_POLICY_TTL),
            secs("ACCESS_POLICY_RENEWAL_SECS")?,
        )?;

        let request_timeout = secs("STORAGE_TIMEOUT_SECS")?.unwrap_or(DEFAULT_STORAGE_TIMEOUT);
        if request_timeout.is_zero() {
            return Err(RecordError::ConfigurationInvalid(
                "STORAGE_TIMEOUT_SECS must be positive".to_string(),
            ));
        }

        Ok(StorageSettings {
            connection_string,
            container,
            signing_account_name: optional("STORAGE_ACCOUNT_NAME"),
            signing_account_key: optional("STORAGE_ACCOUNT_KEY"),
            policy,
            request_timeout,
        })
    }

    fn required_or_default(&self, key: &str, development_default: &str) -> RecordResult<String> {
        match (optional(key), self) {
            (Some(value), _) => Ok(value),
            (None, Self::Development) => Ok(development_default.to_string()),
            (None, Self::Production | Self::Staging) => Err(RecordError::ConfigurationInvalid(
                format!("{key} environment variable is not set"),
            )),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Production => f.write_str("production"),
            Self::Staging => f.write_str("staging"),
            Self::Development => f.write_str("development"),
        }
    }
}

/// Non-empty value of an environment variable
fn optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn secs(key: &str) -> RecordResult<Option<Duration>> {
    optional(key)
        .map(|value| {
            value.parse::<u64>().map(Duration::from_secs).map_err(|e| {
                RecordError::ConfigurationInvalid(format!("{key} must be a number of seconds: {e}"))
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const STORAGE_VARS: [&str; 8] = [
        "STORAGE_ACCOUNT_CONNECTION_STRING",
        "STORAGE_ACCOUNT_CONTAINER",
        "STORAGE_ACCOUNT_NAME",
        "STORAGE_ACCOUNT_KEY",
        "ACCESS_POLICY_ID",
        "ACCESS_POLICY_TTL_SECS",
        "ACCESS_POLICY_RENEWAL_SECS",
        "STORAGE_TIMEOUT_SECS",
    ];

    fn clear_storage_vars() {
        for key in STORAGE_VARS {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_environment_from_env() {
        // Test development (default)
        env::remove_var("APP_ENV");
        assert_eq!(Environment::from_env().unwrap(), Environment::Development);

        env::set_var("APP_ENV", " Staging ");
        assert_eq!(Environment::from_env().unwrap(), Environment::Staging);

        env::set_var("APP_ENV", "production");
        assert_eq!(Environment::from_env().unwrap(), Environment::Production);

        env::set_var("APP_ENV", "invalid");
        assert!(matches!(
            Environment::from_env(),
            Err(RecordError::ConfigurationInvalid(msg)) if msg == "Invalid environment: invalid"
        ));

        env::remove_var("APP_ENV");
    }

    #[test]
    #[serial]
    fn test_development_storage_defaults() {
        clear_storage_vars();

        let settings = Environment::Development.storage_settings().unwrap();
        assert_eq!(settings.connection_string, "UseDevelopmentStorage=true");
        assert_eq!(settings.container.as_str(), "patient-images");
        assert_eq!(settings.signing_account_name, None);
        assert_eq!(settings.signing_account_key, None);
        assert_eq!(settings.policy, AccessPolicySettings::default());
        assert_eq!(settings.request_timeout, Duration::from_secs(10));
    }

    #[test]
    #[serial]
    fn test_production_requires_connection_settings() {
        clear_storage_vars();

        for environment in [Environment::Production, Environment::Staging] {
            assert!(matches!(
                environment.storage_settings(),
                Err(RecordError::ConfigurationInvalid(msg)) if msg.contains("STORAGE_ACCOUNT_CONNECTION_STRING")
            ));
        }

        env::set_var(
            "STORAGE_ACCOUNT_CONNECTION_STRING",
            "AccountName=records;AccountKey=c2VjcmV0",
        );
        assert!(matches!(
            Environment::Production.storage_settings(),
            Err(RecordError::ConfigurationInvalid(msg)) if msg.contains("STORAGE_ACCOUNT_CONTAINER")
        ));

        env::set_var("STORAGE_ACCOUNT_CONTAINER", "patient-images");
        let settings = Environment::Production.storage_settings().unwrap();
        assert_eq!(settings.container.as_str(), "patient-images");

        clear_storage_vars();
    }

    #[test]
    #[serial]
    fn test_storage_settings_overrides() {
        clear_storage_vars();
        env::set_var("STORAGE_ACCOUNT_NAME", "records");
        env::set_var("STORAGE_ACCOUNT_KEY", "c2VjcmV0");
        env::set_var("ACCESS_POLICY_ID", "viewer-policy");
        env::set_var("ACCESS_POLICY_TTL_SECS", "600");
        env::set_var("ACCESS_POLICY_RENEWAL_SECS", "120");
        env::set_var("STORAGE_TIMEOUT_SECS", "3");

        let settings = Environment::Development.storage_settings().unwrap();
        assert_eq!(settings.signing_account_name.as_deref(), Some("records"));
        assert_eq!(settings.signing_account_key.as_deref(), Some("c2VjcmV0"));
        assert_eq!(settings.policy.identifier, "viewer-policy");
        assert_eq!(settings.policy.ttl, Duration::from_secs(600));
        assert_eq!(settings.policy.renewal_interval, Some(Duration::from_secs(120)));
        assert_eq!(settings.request_timeout, Duration::from_secs(3));

        clear_storage_vars();
    }

    #[test]
    #[serial]
    fn test_storage_settings_rejects_invalid_values() {
        clear_storage_vars();

        env::set_var("STORAGE_ACCOUNT_CONTAINER", "Not_A_Container");
        assert!(Environment::Development.storage_settings().is_err());
        env::remove_var("STORAGE_ACCOUNT_CONTAINER");

        env::set_var("ACCESS_POLICY_TTL_SECS", "an hour");
        assert!(Environment::Development.storage_settings().is_err());
        env::remove_var("ACCESS_POLICY_TTL_SECS");

        env::set_var("STORAGE_TIMEOUT_SECS", "0");
        assert!(Environment::Development.storage_settings().is_err());

        clear_storage_vars();
    }

    #[test]
    #[serial]
    fn test_storage_settings_renewal_can_be_disabled() {
        clear_storage_vars();
        env::set_var("ACCESS_POLICY_RENEWAL_SECS", "0");

        let settings = Environment::Development.storage_settings().unwrap();
        assert_eq!(settings.policy.renewal_interval, None);
        assert_eq!(settings.policy.ttl, Duration::from_secs(3600));

        clear_storage_vars();
    }

    #[test]
    fn test_show_api_docs() {
        assert!(Environment::Development.show_api_docs());
        assert!(Environment::Staging.show_api_docs());
        assert!(!Environment::Production.show_api_docs());
    }
}
