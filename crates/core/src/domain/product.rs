use serde::{Deserialize, Serialize};

use crate::domain::preset::SortingMethod;
use crate::domain::wire;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default, deserialize_with = "wire::id_string")]
    pub product_id: String,

    #[serde(default, deserialize_with = "wire::id_string")]
    pub name: String,

    #[serde(default, deserialize_with = "wire::lenient_string")]
    pub supplier_name: Option<String>,

    #[serde(default, deserialize_with = "wire::lenient_string")]
    pub duration_days: Option<String>,

    #[serde(default, deserialize_with = "wire::lenient_string")]
    pub duration_night: Option<String>,

    #[serde(rename = "faresprices", alias = "fares", default)]
    pub fares: Vec<Fare>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fare {
    #[serde(default, deserialize_with = "wire::id_string")]
    pub product_prices_details_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductsResponse {
    #[serde(default)]
    pub results: Vec<Product>,
}

impl Product {
    pub fn has_fares(&self) -> bool {
        !self.fares.is_empty()
    }

    pub fn fare_ids(&self) -> Vec<&str> {
        self.fares
            .iter()
            .map(|f| f.product_prices_details_id.as_str())
            .collect()
    }

    /// `"{days}/{nights}"`, with `0` standing in for missing or empty values.
    pub fn duration_label(&self) -> String {
        fn part(v: &Option<String>) -> &str {
            v.as_deref().filter(|s| !s.is_empty()).unwrap_or("0")
        }
        format!("{}/{}", part(&self.duration_days), part(&self.duration_night))
    }

    pub fn fare_ids_label(&self) -> String {
        if self.fares.is_empty() {
            return "N/A".to_string();
        }
        self.fare_ids().join(", ")
    }

    pub fn supplier_label(&self) -> &str {
        self.supplier_name.as_deref().unwrap_or("")
    }
}

/// Orders products in place. `list` ordering uses `preset_order` (product ids); products
/// missing from it go after the listed ones. Both orderings are stable.
pub fn sort_products(products: &mut [Product], method: SortingMethod, preset_order: &[String]) {
    match method {
        SortingMethod::Alphabetical => {
            products.sort_by_cached_key(|p| p.name.to_lowercase());
        }
        SortingMethod::List => {
            products.sort_by_key(|p| {
                preset_order
                    .iter()
                    .position(|id| *id == p.product_id)
                    .unwrap_or(usize::MAX)
            });
        }
    }
}
