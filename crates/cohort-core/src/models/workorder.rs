//! Work-order identifiers.

use std::{fmt, str::FromStr, sync::OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Accepted shape: `WO-<SLUG>-<NNN>`, slug in upper-case letters, digits and
/// dashes.
pub const WORKORDER_PATTERN: &str = r"^WO-[A-Z0-9-]+-\d{3}$";

fn workorder_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(WORKORDER_PATTERN).expect("work-order pattern is valid"))
}

/// Stable identifier of a unit of planned work, e.g. `WO-AUTH-REFACTOR-001`.
///
/// Construction always validates the format, so holding a `WorkorderId`
/// means the value is well formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkorderId(String);

impl WorkorderId {
    /// Returns true when `value` matches [`WORKORDER_PATTERN`].
    pub fn is_valid(value: &str) -> bool {
        workorder_regex().is_match(value)
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for WorkorderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if Self::is_valid(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(format!(
                "Invalid work-order id '{s}': expected WO-<SLUG>-<NNN>"
            ))
        }
    }
}

impl TryFrom<String> for WorkorderId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WorkorderId> for String {
    fn from(id: WorkorderId) -> Self {
        id.0
    }
}

impl fmt::Display for WorkorderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_well_formed_ids() {
        for id in ["WO-AUTH-001", "WO-AUTH-REFACTOR-042", "WO-V2-999"] {
            assert!(WorkorderId::is_valid(id), "{id} should be valid");
        }
    }

    #[test]
    fn test_rejects_malformed_ids() {
        for id in ["", "WO-001", "wo-auth-001", "WO-AUTH-01", "WO-AUTH-0001", "WO-auth-001"] {
            assert!(id.parse::<WorkorderId>().is_err(), "{id} should be rejected");
        }
    }

    #[test]
    fn test_serde_rejects_malformed_value() {
        let ok: WorkorderId = serde_json::from_str("\"WO-SYNC-003\"").unwrap();
        assert_eq!(ok.as_str(), "WO-SYNC-003");
        assert!(serde_json::from_str::<WorkorderId>("\"WO-SYNC\"").is_err());
    }
}
