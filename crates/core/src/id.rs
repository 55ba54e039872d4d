//! Unique identifiers for queued progress updates.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique identifier for an update waiting in the sync outbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UpdateId(Ulid);

impl UpdateId {
    /// Generate a new UpdateId
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for UpdateId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UpdateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for UpdateId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_id_parse_display() {
        let id = UpdateId::new();
        let parsed: UpdateId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-ulid".parse::<UpdateId>().is_err());
    }
}
