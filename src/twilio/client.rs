use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use super::error::{Result, UsageError};
use super::exception::Exception;
use crate::config::Settings;

/// Twilio's REST root, including the date-versioned API prefix.
pub const DEFAULT_BASE_URL: &str = "https://api.twilio.com/2010-04-01";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("twilio-usage/", env!("CARGO_PKG_VERSION"));

/// Authenticated client for a single Twilio account.
#[derive(Clone)]
pub struct TwilioClient {
    client: reqwest::Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
}

impl TwilioClient {
    /// Create a client against the public Twilio API.
    ///
    /// # Errors
    ///
    /// Returns an error if either credential is empty or the HTTP client
    /// cannot be built.
    pub fn new(account_sid: impl Into<String>, auth_token: impl Into<String>) -> Result<Self> {
        let account_sid = account_sid.into();
        let auth_token = auth_token.into();
        if account_sid.is_empty() {
            return Err(UsageError::ConfigError(
                "account SID is required".to_string(),
            ));
        }
        if auth_token.is_empty() {
            return Err(UsageError::ConfigError(
                "auth token is required".to_string(),
            ));
        }

        Ok(Self {
            client: build_http_client(DEFAULT_TIMEOUT)?,
            base_url: DEFAULT_BASE_URL.to_string(),
            account_sid,
            auth_token,
        })
    }

    /// Create a client from loaded settings.
    ///
    /// # Errors
    ///
    /// Same as [`TwilioClient::new`].
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let client = Self::new(&settings.account_sid, &settings.auth_token)?
            .with_base_url(&settings.base_url)
            .with_timeout(Duration::from_secs(settings.timeout_secs))?;
        Ok(client)
    }

    /// Point the client at another API root (a proxy or a mock server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> Self {
        self.base_url = base_url.as_ref().trim_end_matches('/').to_string();
        self
    }

    /// Per-request deadline covering connect, send and body read.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be rebuilt.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = build_http_client(timeout)?;
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn account_sid(&self) -> &str {
        &self.account_sid
    }

    /// Issue an authenticated GET and return the body of a 200 response.
    ///
    /// Any other status is decoded into [`UsageError::Exception`]. Cancelling
    /// the token drops the in-flight request.
    pub(crate) async fn get(&self, url: &Url, cancel: &CancellationToken) -> Result<String> {
        if cancel.is_cancelled() {
            return Err(UsageError::Cancelled);
        }

        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!(url = %url, "Request cancelled");
                Err(UsageError::Cancelled)
            }

            result = self.send_get(url) => result,
        }
    }

    async fn send_get(&self, url: &Url) -> Result<String> {
        debug!(url = %url, "Making Twilio API request");

        let response = self
            .client
            .get(url.clone())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status != StatusCode::OK {
            return Err(UsageError::Exception(Exception::from_response(
                status.as_u16(),
                &body,
            )));
        }

        Ok(body)
    }
}

impl fmt::Debug for TwilioClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwilioClient")
            .field("base_url", &self.base_url)
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?;
    Ok(client)
}
