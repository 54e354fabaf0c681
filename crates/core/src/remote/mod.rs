pub mod booking;
pub mod presets;
pub mod token;

use crate::config::Settings;
use anyhow::Context;
use std::time::Duration;

pub fn build_http_client(settings: &Settings) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.http_timeout_secs))
        .build()
        .context("failed to build http client")
}
