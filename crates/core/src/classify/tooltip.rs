use serde::Serialize;
use std::collections::HashMap;

use super::{error_bucket, CellState, ErrorBucket, NO_BOOKING_SYSTEM, WRONG_SEASON};
use crate::domain::availability::FareAvailabilityResponse;
use crate::domain::product::Product;

pub const UNSUPPORTED_MESSAGE: &str = "Caching not enabled / No BookingSystem";
pub const DEFAULT_SUPPLIER: &str = "Supplier";

/// Structured hover content. Text is raw; the renderer is responsible for escaping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TooltipModel {
    Message {
        text: String,
    },
    FareTable {
        header: Option<String>,
        rows: Vec<FareRow>,
    },
    ProductLink {
        supplier: String,
        name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FareRow {
    pub fare_id: String,
    pub fare_name: String,
    pub available: String,
}

impl TooltipModel {
    pub fn message(text: impl Into<String>) -> Self {
        Self::Message { text: text.into() }
    }

    /// Single-line form for terminals and logs.
    pub fn to_plain_text(&self) -> String {
        match self {
            Self::Message { text } => text.clone(),
            Self::ProductLink { supplier, name } => format!("{supplier} - {name}"),
            Self::FareTable { header, rows } => {
                let mut out = String::new();
                if let Some(h) = header {
                    out.push_str(h);
                    out.push('\n');
                }
                out.push_str("Fare Name\tAvailable");
                for row in rows {
                    out.push('\n');
                    out.push_str(&row.fare_name);
                    out.push('\t');
                    out.push_str(&row.available);
                }
                out
            }
        }
    }
}

pub(crate) fn cell_tooltip(
    state: CellState,
    responses: &[FareAvailabilityResponse],
) -> Option<TooltipModel> {
    if responses.is_empty() {
        return None;
    }

    match state {
        CellState::Unsupported | CellState::WrongSeason => {
            return error_bucket(responses).map(|bucket| match bucket {
                ErrorBucket::Unsupported => TooltipModel::message(UNSUPPORTED_MESSAGE),
                ErrorBucket::WrongSeason => TooltipModel::message(WRONG_SEASON),
            });
        }
        _ => {}
    }

    let rows = dedup_by_fare(responses);
    if rows.is_empty() {
        return None;
    }

    let header = responses
        .iter()
        .filter_map(|r| r.product_name.as_deref())
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string);

    Some(TooltipModel::FareTable {
        header,
        rows: rows
            .into_iter()
            .map(|r| FareRow {
                fare_id: r.product_prices_details_id.clone(),
                fare_name: r.fare_name.clone().unwrap_or_default(),
                available: r
                    .num_available
                    .map(|n| n.to_string())
                    .unwrap_or_default(),
            })
            .collect(),
    })
}

/// One response per fare id in first-seen order, skipping the noise errors.
fn dedup_by_fare(responses: &[FareAvailabilityResponse]) -> Vec<&FareAvailabilityResponse> {
    let mut out: Vec<&FareAvailabilityResponse> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for r in responses {
        if matches!(r.error_text(), Some(NO_BOOKING_SYSTEM | WRONG_SEASON)) {
            continue;
        }

        match index.get(r.product_prices_details_id.as_str()) {
            None => {
                index.insert(r.product_prices_details_id.as_str(), out.len());
                out.push(r);
            }
            Some(&i) => {
                if outranks(r, out[i]) {
                    out[i] = r;
                }
            }
        }
    }

    out
}

fn outranks(candidate: &FareAvailabilityResponse, current: &FareAvailabilityResponse) -> bool {
    match (candidate.num_available, current.num_available) {
        (Some(c), Some(k)) => c > k,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

pub fn product_link_tooltip(product: &Product) -> TooltipModel {
    let supplier = product
        .supplier_name
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SUPPLIER);
    TooltipModel::ProductLink {
        supplier: supplier.to_string(),
        name: product.name.clone(),
    }
}
