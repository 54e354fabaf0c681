use std::fmt;

/// Failures of one calendar load, each shown to the user as an inline message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// Token fetch failed or returned no token.
    Auth(String),
    /// Product metadata request failed.
    Fetch(String),
    /// No product ids were given, or none matched.
    NoData,
    /// The selected month has no future dates left.
    PastMonth,
    /// A newer load for the same session started before this one finished.
    Superseded,
}

impl LoadError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth",
            Self::Fetch(_) => "fetch",
            Self::NoData => "no_data",
            Self::PastMonth => "past_month",
            Self::Superseded => "superseded",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Auth(detail) => format!("Error: could not obtain an access token ({detail})."),
            Self::Fetch(detail) => format!("Error: {detail}"),
            Self::NoData => "No matching products found.".to_string(),
            Self::PastMonth => "No future dates available for the selected month.".to_string(),
            Self::Superseded => "Load cancelled by a newer request.".to_string(),
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auth(detail) => write!(f, "auth error: {detail}"),
            Self::Fetch(detail) => write!(f, "fetch error: {detail}"),
            Self::NoData => f.write_str("no matching products"),
            Self::PastMonth => f.write_str("selected month is in the past"),
            Self::Superseded => f.write_str("load superseded by a newer request"),
        }
    }
}

impl std::error::Error for LoadError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_user_facing() {
        assert_eq!(
            LoadError::PastMonth.user_message(),
            "No future dates available for the selected month."
        );
        assert_eq!(LoadError::NoData.user_message(), "No matching products found.");
        assert_eq!(
            LoadError::Fetch("Products fetch failed.".to_string()).user_message(),
            "Error: Products fetch failed."
        );
    }

    #[test]
    fn converts_into_anyhow() {
        let err: anyhow::Error = LoadError::Auth("empty token".to_string()).into();
        assert_eq!(
            err.downcast_ref::<LoadError>().map(LoadError::kind),
            Some("auth")
        );
    }
}
