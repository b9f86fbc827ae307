//! Collection wrapper types for displaying groups of records.

use std::{fmt, ops::Index};

use crate::models::{SessionSummary, StatusRecord, StoredPlan};

/// Newtype wrapper for displaying session listings.
///
/// # Examples
///
/// ```rust
/// use cohort_core::display::SessionSummaries;
///
/// let listing = SessionSummaries(Vec::new());
/// assert_eq!(listing.to_string(), "No sessions found.\n");
/// ```
pub struct SessionSummaries(pub Vec<SessionSummary>);

impl SessionSummaries {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SessionSummary> {
        self.0.iter()
    }
}

impl Index<usize> for SessionSummaries {
    type Output = SessionSummary;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl IntoIterator for SessionSummaries {
    type Item = SessionSummary;
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for SessionSummaries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            writeln!(f, "No sessions found.")
        } else {
            for session in &self.0 {
                write!(f, "{session}")?;
            }
            Ok(())
        }
    }
}

/// Newtype wrapper for displaying every status record of a session.
pub struct StatusRecords(pub Vec<StatusRecord>);

impl StatusRecords {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for StatusRecords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            writeln!(f, "No agents assigned.")
        } else {
            for record in &self.0 {
                write!(f, "{record}")?;
            }
            Ok(())
        }
    }
}

/// Compact listing of stored plans, one line each.
pub struct PlanListing(pub Vec<StoredPlan>);

impl PlanListing {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for PlanListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "No plans found.");
        }
        for stored in &self.0 {
            write!(f, "- **{}** {}", stored.workorder_id, stored.plan.title)?;
            match (stored.last_score, stored.last_decision) {
                (Some(score), Some(decision)) => write!(f, " ({score}/100, {decision})")?,
                _ => write!(f, " (not validated)")?,
            }
            if stored.locked {
                write!(f, " [locked]")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;

    use super::*;
    use crate::{fixtures::passing_plan, validator::GateDecision};

    fn stored_plan(locked: bool) -> StoredPlan {
        StoredPlan {
            workorder_id: "WO-AUTH-001".parse().unwrap(),
            plan: passing_plan(),
            last_score: Some(96),
            last_decision: Some(GateDecision::Pass),
            locked,
            created_at: Timestamp::from_second(1640995200).unwrap(),
            updated_at: Timestamp::from_second(1640995200).unwrap(),
        }
    }

    #[test]
    fn test_plan_listing_display() {
        let output = PlanListing(vec![stored_plan(true)]).to_string();
        assert!(output.contains("**WO-AUTH-001**"));
        assert!(output.contains("(96/100, pass)"));
        assert!(output.contains("[locked]"));

        assert_eq!(PlanListing(Vec::new()).to_string(), "No plans found.\n");
    }

    #[test]
    fn test_status_records_empty() {
        assert_eq!(StatusRecords(Vec::new()).to_string(), "No agents assigned.\n");
    }
}
