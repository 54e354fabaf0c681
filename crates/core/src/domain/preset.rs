use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the availability table orders products.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortingMethod {
    #[default]
    Alphabetical,
    /// Keep the order in which the preset lists its product ids.
    List,
}

impl FromStr for SortingMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "alphabetical" => Ok(Self::Alphabetical),
            "list" => Ok(Self::List),
            other => Err(format!(
                "unknown sorting method {other:?} (expected \"alphabetical\" or \"list\")"
            )),
        }
    }
}

impl fmt::Display for SortingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alphabetical => f.write_str("alphabetical"),
            Self::List => f.write_str("list"),
        }
    }
}

// Unknown values fall back to alphabetical rather than rejecting the whole document.
impl<'de> Deserialize<'de> for SortingMethod {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = Option::<String>::deserialize(deserializer)?;
        Ok(s.and_then(|s| s.parse().ok()).unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub id: String,
    pub name: String,
    /// Comma-separated product ids, as written in the presets document.
    #[serde(default)]
    pub product_ids: String,
    #[serde(default)]
    pub sorting: SortingMethod,
}

impl Preset {
    pub fn product_id_list(&self) -> Vec<String> {
        parse_product_ids(&self.product_ids)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetsDocument {
    #[serde(default)]
    pub presets: Vec<Preset>,
}

impl PresetsDocument {
    pub fn find(&self, id: &str) -> Option<&Preset> {
        self.presets.iter().find(|p| p.id == id)
    }
}

/// Splits a comma-separated id list, trimming entries and dropping empty ones.
pub fn parse_product_ids(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}
