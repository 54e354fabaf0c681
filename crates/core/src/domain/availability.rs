use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::domain::wire;

/// One fare's availability result for one day, as returned by `checkAvailability`.
///
/// The remote API emits PascalCase keys; camelCase is accepted as well. Either of
/// `num_available` / `error` may be missing, and malformed input can carry both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FareAvailabilityResponse {
    #[serde(
        rename = "ProductPricesDetailsId",
        alias = "productPricesDetailsId",
        default,
        deserialize_with = "wire::id_string"
    )]
    pub product_prices_details_id: String,

    #[serde(
        rename = "NumAvailable",
        alias = "numAvailable",
        default,
        deserialize_with = "wire::lenient_i64",
        skip_serializing_if = "Option::is_none"
    )]
    pub num_available: Option<i64>,

    #[serde(
        rename = "Error",
        alias = "error",
        default,
        deserialize_with = "wire::lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub error: Option<String>,

    #[serde(
        rename = "FareName",
        alias = "fareName",
        default,
        deserialize_with = "wire::lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub fare_name: Option<String>,

    #[serde(
        rename = "ProductName",
        alias = "productName",
        default,
        deserialize_with = "wire::lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub product_name: Option<String>,
}

impl FareAvailabilityResponse {
    /// Error text exactly as sent, `None` when absent or blank.
    pub fn raw_error(&self) -> Option<&str> {
        self.error.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// Trimmed error text, `None` when absent or blank.
    pub fn error_text(&self) -> Option<&str> {
        self.error
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Wire keys and their camelCase aliases. When both spellings are present the
/// PascalCase one wins.
const FIELD_ALIASES: [(&str, &str); 5] = [
    ("ProductPricesDetailsId", "productPricesDetailsId"),
    ("NumAvailable", "numAvailable"),
    ("Error", "error"),
    ("FareName", "fareName"),
    ("ProductName", "productName"),
];

/// Per-day availability for one product, keyed by `YYYY-MM-DD`.
///
/// Decoding is lenient per day: a day that is not a list is treated as missing and
/// records that are not objects are dropped, so one bad entry never costs the month.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AvailabilityMap(pub BTreeMap<String, Vec<FareAvailabilityResponse>>);

impl<'de> Deserialize<'de> for AvailabilityMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
        let days = raw
            .into_iter()
            .filter_map(|(day, v)| day_records(v).map(|records| (day, records)))
            .collect();
        Ok(Self(days))
    }
}

fn day_records(v: Value) -> Option<Vec<FareAvailabilityResponse>> {
    let Value::Array(items) = v else {
        return None;
    };
    Some(
        items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(obj) => record(obj),
                _ => None,
            })
            .collect(),
    )
}

fn record(mut obj: Map<String, Value>) -> Option<FareAvailabilityResponse> {
    for (pascal, camel) in FIELD_ALIASES {
        if obj.contains_key(pascal) {
            obj.remove(camel);
        }
    }
    serde_json::from_value(Value::Object(obj)).ok()
}

impl AvailabilityMap {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Responses for `date`; `None` means the API returned nothing for that day.
    pub fn day(&self, date: NaiveDate) -> Option<&[FareAvailabilityResponse]> {
        self.0.get(&date_key(date)).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
