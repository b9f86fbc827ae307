//! Tunable thresholds for the plan quality gate.

use serde::{Deserialize, Serialize};

use crate::models::CANONICAL_SECTIONS;

/// Thresholds and rule inputs used by [`crate::validator::PlanValidator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Minimum score for a plan to pass the gate
    pub pass_score: u8,

    /// Scores at or above this (and below `pass_score`) may be auto-refined
    pub refine_floor: u8,

    /// Upper bound on fix-and-revalidate iterations
    pub max_refine_iterations: u8,

    /// Section bodies shorter than this (in characters, trimmed) are flagged
    pub min_section_length: usize,

    /// Section names every plan must contain
    pub required_sections: Vec<String>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            pass_score: 90,
            refine_floor: 70,
            max_refine_iterations: 3,
            min_section_length: 40,
            required_sections: CANONICAL_SECTIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ValidatorConfig {
    /// Overrides the minimum section body length.
    pub fn with_min_section_length(mut self, length: usize) -> Self {
        self.min_section_length = length;
        self
    }

    /// Overrides the refinement iteration cap.
    pub fn with_max_refine_iterations(mut self, iterations: u8) -> Self {
        self.max_refine_iterations = iterations;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_gate_thresholds() {
        let config = ValidatorConfig::default();
        assert_eq!(config.pass_score, 90);
        assert_eq!(config.refine_floor, 70);
        assert_eq!(config.max_refine_iterations, 3);
        assert_eq!(config.required_sections.len(), 10);
    }
}
