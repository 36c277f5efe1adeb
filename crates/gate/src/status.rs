use serde::{Deserialize, Serialize};

/// Platform user identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Chat a reply is delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatRef(pub i64);

impl std::fmt::Display for ChatRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user's standing in the gated channel, as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    Member,
    Administrator,
    Creator,
    Left,
    Kicked,
    Restricted,
    Unknown,
}

impl MembershipStatus {
    /// Parse the raw status string returned by the platform.
    ///
    /// Unrecognized strings map to [`MembershipStatus::Unknown`].
    #[must_use]
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "member" => Self::Member,
            "administrator" => Self::Administrator,
            "creator" => Self::Creator,
            "left" => Self::Left,
            "kicked" => Self::Kicked,
            "restricted" => Self::Restricted,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Administrator => "administrator",
            Self::Creator => "creator",
            Self::Left => "left",
            Self::Kicked => "kicked",
            Self::Restricted => "restricted",
            Self::Unknown => "unknown",
        }
    }

    #[must_use]
    pub fn verdict(self) -> MembershipVerdict {
        MembershipVerdict(matches!(
            self,
            Self::Member | Self::Administrator | Self::Creator
        ))
    }
}

impl std::fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a user counts as a member in good standing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MembershipVerdict(pub bool);

impl MembershipVerdict {
    pub const DENIED: Self = Self(false);
    pub const GRANTED: Self = Self(true);

    #[must_use]
    pub fn is_member(self) -> bool {
        self.0
    }
}
