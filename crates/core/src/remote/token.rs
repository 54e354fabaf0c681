use crate::config::Settings;
use crate::error::LoadError;
use serde::Deserialize;
use std::fmt;

/// Bearer token for the booking API. `Debug` does not print the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(..)")
    }
}

#[async_trait::async_trait]
pub trait TokenSource: Send + Sync {
    /// Fetches a fresh token. Called once per load.
    async fn access_token(&self) -> Result<AccessToken, LoadError>;
}

/// `{status, accessToken}` on success, `{status: "error", message}` on failure.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl TokenResponse {
    pub fn into_token(self) -> Result<AccessToken, LoadError> {
        if self
            .status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("error"))
        {
            let message = self
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "token endpoint reported an error".to_string());
            return Err(LoadError::Auth(message));
        }

        self.access_token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .map(AccessToken)
            .ok_or_else(|| LoadError::Auth("no access token returned".to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct ScriptTokenClient {
    http: reqwest::Client,
    url: String,
}

impl ScriptTokenClient {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    pub fn from_settings(settings: &Settings, http: reqwest::Client) -> anyhow::Result<Self> {
        Ok(Self::new(http, settings.require_token_url()?))
    }
}

#[async_trait::async_trait]
impl TokenSource for ScriptTokenClient {
    async fn access_token(&self) -> Result<AccessToken, LoadError> {
        let res = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| LoadError::Auth(format!("token request failed: {e}")))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| LoadError::Auth(format!("failed to read token response: {e}")))?;
        if !status.is_success() {
            tracing::warn!(http_status = %status, "token endpoint returned an error status");
            return Err(LoadError::Auth(format!("token endpoint HTTP {status}")));
        }

        let parsed = serde_json::from_str::<TokenResponse>(&text)
            .map_err(|e| LoadError::Auth(format!("token response is not valid JSON: {e}")))?;
        parsed.into_token().inspect_err(|err| {
            tracing::warn!(error = %err, "token endpoint returned no usable token");
        })
    }
}
