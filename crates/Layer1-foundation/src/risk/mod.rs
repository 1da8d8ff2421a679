//! Risk classification - command risk levels and the classification pipeline
//!
//! The classifier is a pure evaluation over (resolved binary path, arguments,
//! analysis options). Both execution modes consult the same classifier, so a
//! simulated run predicts exactly what the real run would refuse.

pub mod classifier;

pub use classifier::{classifier, RiskClassifier};

use serde::{Deserialize, Serialize};

// ============================================================
// Risk levels
// ============================================================

/// Command risk level, ordered from harmless to catastrophic.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// No risk factors matched
    #[default]
    None = 0,
    /// Information disclosure only (directory listing class)
    Low = 1,
    /// Permission widening, privilege requirement
    Medium = 2,
    /// Destructive or irreversible operations
    High = 3,
    /// Always refused
    Critical = 4,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Whether a command at this risk level may run under the given ceiling.
    pub fn within_ceiling(&self, ceiling: RiskLevel) -> bool {
        *self <= ceiling
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================
// Classification result
// ============================================================

/// Outcome of one classification pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Final risk level (highest-priority match)
    pub level: RiskLevel,

    /// Name of the rule that produced the level, if any matched
    pub rule: Option<String>,

    /// Human-readable reason
    pub reason: String,
}

impl RiskAssessment {
    pub fn baseline(level: RiskLevel, reason: impl Into<String>) -> Self {
        Self {
            level,
            rule: None,
            reason: reason.into(),
        }
    }
}

// ============================================================
// Analysis options
// ============================================================

/// Options threaded through one classification pass.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Maximum symlink chain length followed before the binary is inspected.
    /// Exceeding this is itself a high-risk finding, not a silent pass.
    pub max_symlink_depth: usize,

    /// Hint for the external verifier: skip hash verification of standard
    /// system paths. The classifier only carries it through.
    pub skip_standard_paths: bool,

    /// The command is explicitly marked as requiring privileges.
    pub privileged: bool,

    /// The command declares a run-as user or group.
    pub has_run_as: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            max_symlink_depth: 8,
            skip_standard_paths: false,
            privileged: false,
            has_run_as: false,
        }
    }
}

impl AnalysisOptions {
    pub fn privileged(mut self, privileged: bool) -> Self {
        self.privileged = privileged;
        self
    }

    pub fn run_as(mut self, has_run_as: bool) -> Self {
        self.has_run_as = has_run_as;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_ordering() {
        assert!(RiskLevel::None < RiskLevel::Low);
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
    }

    #[test]
    fn test_within_ceiling() {
        assert!(RiskLevel::Medium.within_ceiling(RiskLevel::Medium));
        assert!(RiskLevel::Low.within_ceiling(RiskLevel::High));
        assert!(!RiskLevel::High.within_ceiling(RiskLevel::Medium));
    }

    #[test]
    fn test_as_str() {
        assert_eq!(RiskLevel::High.as_str(), "high");
        assert_eq!(RiskLevel::None.to_string(), "none");
    }
}
