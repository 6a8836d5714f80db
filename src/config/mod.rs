use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::twilio::DEFAULT_BASE_URL;

pub const ACCOUNT_SID_ENV: &str = "TWILIO_ACCOUNT_SID";
pub const AUTH_TOKEN_ENV: &str = "TWILIO_AUTH_TOKEN";
pub const BASE_URL_ENV: &str = "TWILIO_BASE_URL";

#[derive(Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub account_sid: String,
    pub auth_token: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Settings {
    /// Load `~/.twilio-usage/settings.json`, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be found or the file
    /// exists but cannot be read or parsed.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let path = Self::settings_path()?;
        Self::load_from(&path)
    }

    /// Load settings from `path` (defaults when it does not exist), then
    /// apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or is not
    /// valid settings JSON.
    pub fn load_from(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let mut settings = Self::read_file(path)?;
        settings.apply_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    fn read_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if !path.exists() {
            return Ok(Settings::default());
        }
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    /// Override fields with non-empty values returned by `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let Some(sid) = lookup(ACCOUNT_SID_ENV) {
            self.account_sid = sid;
        }
        if let Some(token) = lookup(AUTH_TOKEN_ENV) {
            self.auth_token = token;
        }
        if let Some(base_url) = lookup(BASE_URL_ENV) {
            self.base_url = base_url;
        }
    }

    fn settings_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        let home = dirs::home_dir().ok_or("HOME directory not found")?;
        Ok(home.join(".twilio-usage").join("settings.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::read_file(&dir.path().join("settings.json")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.timeout_secs, 30);
    }

    #[test]
    fn reads_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"account_sid": "AC123", "auth_token": "token", "timeout_secs": 5}}"#
        )
        .unwrap();

        let settings = Settings::read_file(file.path()).unwrap();
        assert_eq!(settings.account_sid, "AC123");
        assert_eq!(settings.auth_token, "token");
        assert_eq!(settings.timeout_secs, 5);
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(Settings::read_file(file.path()).is_err());
    }

    #[test]
    fn load_from_reports_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"timeout_secs": "soon"}}"#).unwrap();
        assert!(Settings::load_from(file.path()).is_err());
    }

    #[test]
    fn overrides_replace_non_empty_values_only() {
        let mut settings = Settings {
            account_sid: "ACfile".to_string(),
            auth_token: "filetoken".to_string(),
            ..Settings::default()
        };
        settings.apply_overrides(|key| match key {
            ACCOUNT_SID_ENV => Some("ACenv".to_string()),
            AUTH_TOKEN_ENV => Some(String::new()),
            BASE_URL_ENV => Some("http://localhost:4010/2010-04-01".to_string()),
            _ => None,
        });
        assert_eq!(settings.account_sid, "ACenv");
        assert_eq!(settings.auth_token, "filetoken");
        assert_eq!(settings.base_url, "http://localhost:4010/2010-04-01");
    }

    #[test]
    fn debug_redacts_auth_token() {
        let settings = Settings {
            auth_token: "s3cret".to_string(),
            ..Settings::default()
        };
        assert!(!format!("{settings:?}").contains("s3cret"));
    }
}
