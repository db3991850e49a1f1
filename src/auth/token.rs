use serde::{Deserialize, Serialize};

/// The delegated catalog credentials held for the single active session.
///
/// Both fields have independent lifecycles: a refresh token may be present
/// while the access token is absent (for example right after a forced clear
/// of the access token).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Bearer credential for the catalog API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Credential usable to mint a new access token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl TokenPair {
    /// Create a new token pair
    pub fn new(access_token: Option<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token,
            refresh_token,
        }
    }

    /// An empty pair, i.e. "not authenticated with the catalog"
    pub fn empty() -> Self {
        Self::default()
    }

    /// True iff the access token is present and non-empty
    pub fn has_access_token(&self) -> bool {
        self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// The access token, treating an empty string as absent
    pub fn usable_access_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }

    /// True when neither token is held
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}
