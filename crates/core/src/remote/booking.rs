use crate::config::Settings;
use crate::domain::availability::{date_key, AvailabilityMap};
use crate::domain::product::{Product, ProductsResponse};
use crate::error::LoadError;
use crate::remote::token::AccessToken;
use crate::time::month::DayWindow;
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};

pub const FARE_IDS_PARAM: &str = "productPricesDetailsIds[]";

/// The booking API seen by a calendar load.
#[async_trait::async_trait]
pub trait BookingApi: Send + Sync {
    /// Product metadata for `product_ids`, in whatever order the API returns it.
    async fn fetch_products(
        &self,
        token: &AccessToken,
        product_ids: &[String],
    ) -> Result<Vec<Product>, LoadError>;

    /// Per-day availability of every fare of `product` inside `window`.
    async fn fetch_availability(
        &self,
        token: &AccessToken,
        product: &Product,
        window: DayWindow,
    ) -> anyhow::Result<AvailabilityMap>;
}

#[derive(Debug, Clone)]
pub struct TdmsClient {
    http: reqwest::Client,
    base_url: String,
}

impl TdmsClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    pub fn from_settings(settings: &Settings, http: reqwest::Client) -> Self {
        Self::new(http, settings.tdms_base_url.clone())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn headers(token: &AccessToken) -> anyhow::Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token.secret()))
                .context("access token is not a valid header value")?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

pub fn products_path(product_ids: &[String]) -> String {
    format!("product/{}", product_ids.join(","))
}

/// Query for `checkAvailability`: start date, day count, then one entry per fare id.
pub fn availability_query(product: &Product, window: DayWindow) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("startDate", date_key(window.start)),
        ("days", window.days.to_string()),
    ];
    params.extend(
        product
            .fare_ids()
            .into_iter()
            .map(|id| (FARE_IDS_PARAM, id.to_string())),
    );
    params
}

#[async_trait::async_trait]
impl BookingApi for TdmsClient {
    async fn fetch_products(
        &self,
        token: &AccessToken,
        product_ids: &[String],
    ) -> Result<Vec<Product>, LoadError> {
        let headers = Self::headers(token).map_err(|e| LoadError::Auth(format!("{e:#}")))?;
        let url = self.url(&products_path(product_ids));

        let res = self
            .http
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| LoadError::Fetch(format!("Products fetch failed: {e}")))?;

        let status = res.status();
        if !status.is_success() {
            tracing::warn!(http_status = %status, "products endpoint returned an error status");
            return Err(LoadError::Fetch(format!("Products fetch failed (HTTP {status}).")));
        }

        let text = res
            .text()
            .await
            .map_err(|e| LoadError::Fetch(format!("failed to read products response: {e}")))?;
        let parsed = serde_json::from_str::<ProductsResponse>(&text)
            .map_err(|e| LoadError::Fetch(format!("products response is not valid JSON: {e}")))?;

        Ok(parsed.results)
    }

    async fn fetch_availability(
        &self,
        token: &AccessToken,
        product: &Product,
        window: DayWindow,
    ) -> anyhow::Result<AvailabilityMap> {
        let headers = Self::headers(token)?;
        let params = availability_query(product, window);

        tracing::debug!(
            product_id = %product.product_id,
            start_date = %window.start,
            days = window.days,
            fares = product.fares.len(),
            "availability request"
        );

        let res = self
            .http
            .get(self.url("checkAvailability"))
            .headers(headers)
            .query(&params)
            .send()
            .await
            .context("availability request failed")?;

        let status = res.status();
        tracing::debug!(product = %product.name, http_status = %status, "availability response");
        let text = res
            .text()
            .await
            .context("failed to read availability response")?;
        if !status.is_success() {
            anyhow::bail!("availability HTTP {status}: {text}");
        }

        serde_json::from_str::<AvailabilityMap>(&text)
            .with_context(|| format!("availability response is not a date map: {text}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product::Fare;
    use chrono::NaiveDate;

    fn product_with_fares(ids: &[&str]) -> Product {
        Product {
            product_id: "77".to_string(),
            name: "Whale Safari".to_string(),
            fares: ids
                .iter()
                .map(|id| Fare {
                    product_prices_details_id: id.to_string(),
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn availability_query_repeats_fare_ids() {
        let window = DayWindow {
            start: NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
            days: 30,
        };
        let params = availability_query(&product_with_fares(&["5", "6"]), window);
        assert_eq!(
            params,
            vec![
                ("startDate", "2026-11-01".to_string()),
                ("days", "30".to_string()),
                (FARE_IDS_PARAM, "5".to_string()),
                (FARE_IDS_PARAM, "6".to_string()),
            ]
        );
    }

    #[test]
    fn products_path_joins_ids() {
        let ids = vec!["1".to_string(), "22".to_string(), "333".to_string()];
        assert_eq!(products_path(&ids), "product/1,22,333");
    }

    #[test]
    fn url_trims_trailing_slash() {
        let client = TdmsClient::new(reqwest::Client::new(), "https://example.test/apiv1/");
        assert_eq!(
            client.url("checkAvailability"),
            "https://example.test/apiv1/checkAvailability"
        );
    }

    mod http {
        use super::*;
        use crate::remote::testing::serve;
        use axum::extract::{Path, RawQuery};
        use axum::http::{HeaderMap as ReceivedHeaders, StatusCode};
        use axum::routing::get;
        use axum::{Json, Router};
        use serde_json::json;
        use std::sync::{Arc, Mutex};

        fn window() -> DayWindow {
            DayWindow {
                start: NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
                days: 30,
            }
        }

        fn token() -> AccessToken {
            AccessToken::new("t0k")
        }

        #[tokio::test]
        async fn products_are_fetched_by_joined_ids() {
            let app = Router::new().route(
                "/product/:ids",
                get(|Path(ids): Path<String>| async move {
                    let results: Vec<_> = ids
                        .split(',')
                        .map(|id| json!({"productId": id, "name": format!("Tour {id}")}))
                        .collect();
                    Json(json!({ "results": results }))
                }),
            );
            let client = TdmsClient::new(reqwest::Client::new(), serve(app).await);

            let ids = vec!["4".to_string(), "9".to_string()];
            let products = client.fetch_products(&token(), &ids).await.unwrap();
            let names: Vec<_> = products.iter().map(|p| p.name.as_str()).collect();
            assert_eq!(names, vec!["Tour 4", "Tour 9"]);
        }

        #[tokio::test]
        async fn products_error_status_is_fetch_error() {
            let app = Router::new().route(
                "/product/:ids",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            );
            let client = TdmsClient::new(reqwest::Client::new(), serve(app).await);

            let err = client
                .fetch_products(&token(), &["4".to_string()])
                .await
                .unwrap_err();
            assert!(matches!(err, LoadError::Fetch(ref msg) if msg.contains("500")));
        }

        #[tokio::test]
        async fn products_invalid_json_is_fetch_error() {
            let app = Router::new().route("/product/:ids", get(|| async { "<html>login</html>" }));
            let client = TdmsClient::new(reqwest::Client::new(), serve(app).await);

            let err = client
                .fetch_products(&token(), &["4".to_string()])
                .await
                .unwrap_err();
            assert!(matches!(err, LoadError::Fetch(_)));
        }

        #[tokio::test]
        async fn products_unreachable_is_fetch_error() {
            // Bind then drop to get a port nothing listens on.
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            drop(listener);

            let client = TdmsClient::new(reqwest::Client::new(), format!("http://{addr}"));
            let err = client
                .fetch_products(&token(), &["4".to_string()])
                .await
                .unwrap_err();
            assert!(matches!(err, LoadError::Fetch(_)));
        }

        #[tokio::test]
        async fn availability_sends_window_fares_and_bearer() {
            let seen: Arc<Mutex<Option<(String, String)>>> = Arc::default();
            let recorder = seen.clone();
            let app = Router::new().route(
                "/checkAvailability",
                get(move |RawQuery(query): RawQuery, headers: ReceivedHeaders| {
                    let recorder = recorder.clone();
                    async move {
                        let auth = headers
                            .get(AUTHORIZATION)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default()
                            .to_string();
                        *recorder.lock().unwrap() = Some((query.unwrap_or_default(), auth));
                        Json(json!({
                            "2026-11-02": [{"ProductPricesDetailsId": 5, "NumAvailable": 2}],
                            "2026-11-03": null
                        }))
                    }
                }),
            );
            let client = TdmsClient::new(reqwest::Client::new(), serve(app).await);

            let map = client
                .fetch_availability(&token(), &product_with_fares(&["5", "6"]), window())
                .await
                .unwrap();
            assert_eq!(map.len(), 1);
            assert_eq!(
                map.day(NaiveDate::from_ymd_opt(2026, 11, 2).unwrap())
                    .map(|d| d[0].num_available),
                Some(Some(2))
            );

            let (query, auth) = seen.lock().unwrap().clone().unwrap();
            assert_eq!(auth, "Bearer t0k");
            assert_eq!(
                query,
                "startDate=2026-11-01&days=30\
                 &productPricesDetailsIds%5B%5D=5&productPricesDetailsIds%5B%5D=6"
            );
        }

        #[tokio::test]
        async fn availability_error_status_is_an_error() {
            let app = Router::new().route(
                "/checkAvailability",
                get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
            );
            let client = TdmsClient::new(reqwest::Client::new(), serve(app).await);

            let err = client
                .fetch_availability(&token(), &product_with_fares(&["5"]), window())
                .await
                .unwrap_err();
            let msg = format!("{err:#}");
            assert!(msg.contains("503"), "{msg}");
            assert!(msg.contains("maintenance"), "{msg}");
        }

        #[tokio::test]
        async fn availability_non_map_body_is_an_error() {
            let app = Router::new().route(
                "/checkAvailability",
                get(|| async { Json(json!(["not", "a", "map"])) }),
            );
            let client = TdmsClient::new(reqwest::Client::new(), serve(app).await);

            assert!(client
                .fetch_availability(&token(), &product_with_fares(&["5"]), window())
                .await
                .is_err());
        }
    }

    #[test]
    fn headers_carry_bearer_token() {
        let headers = TdmsClient::headers(&AccessToken::new("t0k")).unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer t0k");
        assert_eq!(headers.get(ACCEPT).unwrap(), "application/json");
    }
}
