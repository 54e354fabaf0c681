//! Maps one day's fare availability responses to a cell state, display text and tooltip.
//!
//! Precedence, first match wins:
//!
//! | rule          | condition                                                           |
//! |---------------|---------------------------------------------------------------------|
//! | `Available`   | some `num_available >= 1`                                           |
//! | `SoldOut`     | some defined `num_available` (all of them `<= 0`)                   |
//! | `Unsupported` | no counts, every error from the infrastructure vocabulary           |
//! | `WrongSeason` | no counts, every error from either vocabulary, at least one seasonal |
//! | `Other`       | any non-empty error; the first one is shown verbatim                |
//! | `Unknown`     | empty input or nothing above matched                                |
//!
//! Responses with neither a count nor a non-empty error carry no signal and are skipped
//! by the error rules.

pub mod tooltip;

use serde::Serialize;

use crate::domain::availability::FareAvailabilityResponse;

pub use tooltip::{FareRow, TooltipModel};

pub const CACHING_NOT_ENABLED: &str = "Caching not enabled for this fare";
pub const NO_BOOKING_SYSTEM: &str = "No BookingSystem";
pub const WRONG_SEASON: &str = "Wrong Season";
pub const WRONG_SEASON_NO_BOOKING_SYSTEM: &str = "Wrong Season / No BookingSystem";
pub const WRONG_SEASON_CACHING_NOT_ENABLED: &str =
    "Wrong Season / Caching not enabled for this fare";
pub const CACHE_UNAVAILABLE: &str =
    "Unable to fetch cached availability. Use checkavailabilityrange to get availability.";

/// Errors meaning the fare cannot report availability at all (grey cells).
pub const UNSUPPORTED_ERRORS: [&str; 4] = [
    CACHING_NOT_ENABLED,
    NO_BOOKING_SYSTEM,
    WRONG_SEASON_NO_BOOKING_SYSTEM,
    WRONG_SEASON_CACHING_NOT_ENABLED,
];

/// Errors meaning the fare is outside its selling season (yellow cells).
pub const WRONG_SEASON_ERRORS: [&str; 2] = [WRONG_SEASON, CACHE_UNAVAILABLE];

pub const NO_DATA_TEXT: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellState {
    Available,
    SoldOut,
    Unsupported,
    WrongSeason,
    Other,
    Unknown,
}

impl CellState {
    /// Background colour used by the HTML calendar, if the state is coloured.
    pub fn color(self) -> Option<&'static str> {
        match self {
            Self::Available => Some("green"),
            Self::SoldOut => Some("#cc6666"),
            Self::Unsupported => Some("grey"),
            Self::WrongSeason => Some("#cccc66"),
            Self::Other | Self::Unknown => None,
        }
    }

    pub fn glyph(self) -> char {
        match self {
            Self::Available => '+',
            Self::SoldOut => 'x',
            Self::Unsupported => '.',
            Self::WrongSeason => 's',
            Self::Other => '!',
            Self::Unknown => '?',
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::SoldOut => "sold_out",
            Self::Unsupported => "unsupported",
            Self::WrongSeason => "wrong_season",
            Self::Other => "other",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub state: CellState,
    pub display_text: String,
    pub tooltip: Option<TooltipModel>,
}

impl Classification {
    /// The cell for a day the API returned nothing for.
    pub fn no_data() -> Self {
        Self {
            state: CellState::Unknown,
            display_text: NO_DATA_TEXT.to_string(),
            tooltip: None,
        }
    }
}

pub fn classify(responses: &[FareAvailabilityResponse]) -> Classification {
    if responses.is_empty() {
        return Classification::no_data();
    }

    let (state, display_text) = classify_state(responses);
    Classification {
        state,
        display_text,
        tooltip: tooltip::cell_tooltip(state, responses),
    }
}

fn classify_state(responses: &[FareAvailabilityResponse]) -> (CellState, String) {
    if responses
        .iter()
        .any(|r| r.num_available.is_some_and(|n| n >= 1))
    {
        return (CellState::Available, String::new());
    }

    if responses.iter().any(|r| r.num_available.is_some()) {
        return (CellState::SoldOut, String::new());
    }

    match error_bucket(responses) {
        Some(ErrorBucket::Unsupported) => return (CellState::Unsupported, String::new()),
        Some(ErrorBucket::WrongSeason) => return (CellState::WrongSeason, String::new()),
        None => {}
    }

    if let Some(err) = responses.iter().find_map(|r| r.raw_error()) {
        return (CellState::Other, err.to_string());
    }

    (CellState::Unknown, NO_DATA_TEXT.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorBucket {
    Unsupported,
    WrongSeason,
}

/// Recognised informational bucket when every signalling response is an error from the
/// known vocabularies. A mix of both vocabularies counts as wrong season.
pub(crate) fn error_bucket(responses: &[FareAvailabilityResponse]) -> Option<ErrorBucket> {
    if responses.iter().any(|r| r.num_available.is_some()) {
        return None;
    }

    let mut any_error = false;
    let mut any_seasonal = false;
    for err in responses.iter().filter_map(|r| r.error_text()) {
        any_error = true;
        if WRONG_SEASON_ERRORS.contains(&err) {
            any_seasonal = true;
        } else if !UNSUPPORTED_ERRORS.contains(&err) {
            return None;
        }
    }

    match (any_error, any_seasonal) {
        (false, _) => None,
        (true, true) => Some(ErrorBucket::WrongSeason),
        (true, false) => Some(ErrorBucket::Unsupported),
    }
}
