pub mod calendar;
pub mod classify;
pub mod domain;
pub mod error;
pub mod load;
pub mod remote;
pub mod time;

pub mod config {
    use anyhow::Context;

    pub const DEFAULT_TDMS_BASE_URL: &str = "https://tdms.websitetravel.com/apiv1";
    pub const DEFAULT_PRODUCT_LINK_BASE: &str = "https://tdms.websitetravel.com/#search/text/";
    pub const DEFAULT_PRESETS_PATH: &str = "presets.json";
    pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub tdms_base_url: String,
        pub token_url: Option<String>,
        pub product_link_base: String,
        pub presets_path: String,
        pub http_timeout_secs: u64,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let http_timeout_secs = match std::env::var("HTTP_TIMEOUT_SECS") {
                Ok(s) => s
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("HTTP_TIMEOUT_SECS must be an integer (got {s:?})"))?,
                Err(_) => DEFAULT_HTTP_TIMEOUT_SECS,
            };

            Ok(Self {
                tdms_base_url: non_empty_var("TDMS_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_TDMS_BASE_URL.to_string()),
                token_url: non_empty_var("TOKEN_URL"),
                product_link_base: non_empty_var("PRODUCT_LINK_BASE")
                    .unwrap_or_else(|| DEFAULT_PRODUCT_LINK_BASE.to_string()),
                presets_path: non_empty_var("PRESETS_PATH")
                    .unwrap_or_else(|| DEFAULT_PRESETS_PATH.to_string()),
                http_timeout_secs,
                sentry_dsn: non_empty_var("SENTRY_DSN"),
            })
        }

        pub fn require_token_url(&self) -> anyhow::Result<&str> {
            self.token_url.as_deref().context("TOKEN_URL is required")
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}
