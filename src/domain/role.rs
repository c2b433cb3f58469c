//! The two fixed endpoint identities of a pairing session.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Role of a participant in a pairing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The initiating desktop client.
    Desktop,
    /// The companion mobile client.
    Mobile,
}

impl Role {
    /// Both roles, desktop first.
    pub const ALL: [Self; 2] = [Self::Desktop, Self::Mobile];

    /// Returns the opposite role.
    #[must_use]
    pub const fn peer(self) -> Self {
        match self {
            Self::Desktop => Self::Mobile,
            Self::Mobile => Self::Desktop,
        }
    }

    /// Lowercase wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Mobile => "mobile",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
