use serde::{Deserialize, Serialize};

/// Identifier allocated to a team when it registers. Allocation is sequential
/// so a replayed match reproduces the same ids.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(pub String);

impl TeamId {
    /// The id of the `n`th registration.
    pub fn numbered(n: u64) -> Self {
        Self(format!("team-{n}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TeamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TeamId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A team connected to the match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: TeamId,
    /// Display name, as known to the organizer.
    pub external_name: String,
    /// Identifier in the organizer's system, reported with the results.
    pub external_id: String,
}

impl Team {
    pub fn new(
        id: TeamId,
        external_name: impl Into<String>,
        external_id: impl Into<String>,
    ) -> Self {
        Self {
            id,
            external_name: external_name.into(),
            external_id: external_id.into(),
        }
    }
}
