//! Resource ledger types
//!
//! Every simulated side effect becomes one `ResourceAnalysis` record. Records
//! are created once, appended in order, and may receive a debug-info
//! attachment exactly once afterwards via their `CommandToken`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use warden_foundation::{
    resolve_inheritance_at, DetailLevel, EnvSpec, InheritanceAnalysis, InheritanceMode, RiskLevel,
};

// Parameter keys the summary aggregation reads back out of entries.
pub(crate) const PARAM_GROUP: &str = "group";
pub(crate) const PARAM_COMMAND: &str = "command";

// ============================================================================
// Analysis ID
// ============================================================================

/// Unique id of a ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalysisId(pub String);

impl AnalysisId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for AnalysisId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AnalysisId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Kind / operation / status
// ============================================================================

/// Resource category an entry describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Command,
    Filesystem,
    Privilege,
    Network,
    Group,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Filesystem => "filesystem",
            Self::Privilege => "privilege",
            Self::Network => "network",
            Self::Group => "group",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation the entry records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceOperation {
    Create,
    Delete,
    Execute,
    Escalate,
    Send,
    Analyze,
}

impl ResourceOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Execute => "execute",
            Self::Escalate => "escalate",
            Self::Send => "send",
            Self::Analyze => "analyze",
        }
    }
}

/// Outcome recorded for the operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Success,
    Error,
}

impl AnalysisStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

// ============================================================================
// Parameter values
// ============================================================================

/// Closed parameter value union so redaction and formatting logic can
/// pattern-match exhaustively instead of type-switching at runtime.
///
/// Serialized with an explicit tag: `Str` and `Opaque` share a string
/// payload, and an untagged representation would collapse them on the way
/// back in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ParamValue {
    Str(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    List(Vec<String>),
    Map(BTreeMap<String, String>),
    /// Fallback rendering for values outside the closed set
    Opaque(String),
}

impl ParamValue {
    /// String payload, when this value carries one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) | Self::Opaque(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Str(s) | Self::Opaque(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::List(items) => write!(f, "[{}]", items.join(", ")),
            Self::Map(map) => {
                let rendered: Vec<String> =
                    map.iter().map(|(k, v)| format!("{k}={v}")).collect();
                write!(f, "{{{}}}", rendered.join(", "))
            }
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for ParamValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

// ============================================================================
// Impact
// ============================================================================

/// What running the operation would do to the system
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct ResourceImpact {
    /// The operation can be undone
    pub reversible: bool,

    /// Effects outlive the run
    pub persistent: bool,

    /// Security risk carried by the operation
    pub security_risk: RiskLevel,
}

impl ResourceImpact {
    pub fn new(reversible: bool, persistent: bool, security_risk: RiskLevel) -> Self {
        Self {
            reversible,
            persistent,
            security_risk,
        }
    }
}

// ============================================================================
// Debug info
// ============================================================================

/// Post-hoc annotation for a command-kind entry, attached at most once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandDebugInfo {
    /// Absolute path the binary resolved to
    pub resolved_path: String,

    /// Arguments after template expansion
    pub expanded_args: Vec<String>,

    /// Names (not values) of the environment variables passed through
    pub env_names: Vec<String>,

    /// Working directory in effect
    pub working_dir: Option<String>,
}

/// Annotation payload for a group-kind entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupDebugInfo {
    /// Group description
    pub description: Option<String>,

    /// Environment inheritance picture, absent below `Detailed`
    pub inheritance: Option<InheritanceAnalysis>,
}

impl GroupDebugInfo {
    /// Compute the inheritance analysis for a group at a detail level.
    pub fn from_specs(
        detail: DetailLevel,
        global: &EnvSpec,
        group: Option<&EnvSpec>,
        mode: InheritanceMode,
        description: Option<String>,
    ) -> Self {
        Self {
            description,
            inheritance: resolve_inheritance_at(detail, global, group, mode),
        }
    }
}

/// Debug-info attachment, one variant per entry kind that supports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DebugInfo {
    Command(CommandDebugInfo),
    Group(GroupDebugInfo),
}

// ============================================================================
// Ledger entry
// ============================================================================

/// One append-only record of a (simulated) side-effecting operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceAnalysis {
    /// Unique id
    pub id: AnalysisId,

    /// Resource category
    pub kind: ResourceKind,

    /// Operation
    pub operation: ResourceOperation,

    /// Target string (resolved command line, path, recipient, ...)
    pub target: String,

    /// Typed parameters
    pub parameters: BTreeMap<String, ParamValue>,

    /// Impact descriptor
    pub impact: ResourceImpact,

    /// Outcome
    pub status: AnalysisStatus,

    /// Set when the operation was skipped rather than performed
    pub skip_reason: Option<String>,

    /// Creation time
    pub timestamp: DateTime<Utc>,

    /// Attached at most once after creation
    pub debug_info: Option<DebugInfo>,
}

impl ResourceAnalysis {
    /// Create a new entry
    pub fn new(
        kind: ResourceKind,
        operation: ResourceOperation,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: AnalysisId::new(),
            kind,
            operation,
            target: target.into(),
            parameters: BTreeMap::new(),
            impact: ResourceImpact::default(),
            status: AnalysisStatus::Success,
            skip_reason: None,
            timestamp: Utc::now(),
            debug_info: None,
        }
    }

    /// Add a parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Set impact
    pub fn with_impact(mut self, impact: ResourceImpact) -> Self {
        self.impact = impact;
        self
    }

    /// Set status
    pub fn with_status(mut self, status: AnalysisStatus) -> Self {
        self.status = status;
        self
    }

    /// Mark the operation skipped
    pub fn with_skip_reason(mut self, reason: impl Into<String>) -> Self {
        self.skip_reason = Some(reason.into());
        self
    }

    /// Group attribution, read back by the summary
    pub fn for_group(self, group: impl Into<String>) -> Self {
        self.with_param(PARAM_GROUP, group.into())
    }

    /// Command attribution, read back by the summary
    pub fn for_command(self, command: impl Into<String>) -> Self {
        self.with_param(PARAM_COMMAND, command.into())
    }

    pub fn is_skipped(&self) -> bool {
        self.skip_reason.is_some()
    }
}

// ============================================================================
// Tokens
// ============================================================================

/// Opaque handle to exactly one ledger slot for the ledger's lifetime.
///
/// The generation stamp ties a token to the ledger that issued it, so token
/// validation is a generation comparison plus a bounds check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandToken {
    pub(crate) generation: u32,
    pub(crate) index: usize,
}

impl std::fmt::Display for CommandToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:08x}-{}", self.generation, self.index)
    }
}

// ============================================================================
// Summary
// ============================================================================

/// Success/failure/skip counts for one aggregation bucket
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StatusCounts {
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl StatusCounts {
    pub(crate) fn add(&mut self, entry: &ResourceAnalysis) {
        if entry.is_skipped() {
            self.skipped += 1;
        } else if entry.status.is_success() {
            self.successful += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.successful + self.failed + self.skipped
    }
}

/// Aggregated picture of the run, recomputed from a copied entry slice.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub totals: StatusCounts,
    pub by_group: BTreeMap<String, StatusCounts>,
    pub by_command: BTreeMap<String, StatusCounts>,
}

impl ExecutionSummary {
    /// Compute the summary over a slice of entries.
    pub fn compute(entries: &[ResourceAnalysis]) -> Self {
        let mut summary = Self::default();
        for entry in entries {
            summary.totals.add(entry);

            if let Some(group) = entry.parameters.get(PARAM_GROUP).and_then(ParamValue::as_str) {
                summary.by_group.entry(group.to_string()).or_default().add(entry);
            }
            if let Some(command) = entry
                .parameters
                .get(PARAM_COMMAND)
                .and_then(ParamValue::as_str)
            {
                summary
                    .by_command
                    .entry(command.to_string())
                    .or_default()
                    .add(entry);
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_builder() {
        let entry = ResourceAnalysis::new(ResourceKind::Command, ResourceOperation::Execute, "ls -la")
            .with_param("risk", "low")
            .with_impact(ResourceImpact::new(true, false, RiskLevel::Low))
            .for_group("maintenance")
            .for_command("list");

        assert_eq!(entry.kind, ResourceKind::Command);
        assert_eq!(entry.target, "ls -la");
        assert_eq!(
            entry.parameters.get(PARAM_GROUP).and_then(ParamValue::as_str),
            Some("maintenance")
        );
        assert!(entry.debug_info.is_none());
    }

    #[test]
    fn test_param_value_display() {
        assert_eq!(ParamValue::from("x").to_string(), "x");
        assert_eq!(ParamValue::Bool(true).to_string(), "true");
        assert_eq!(ParamValue::Int(-3).to_string(), "-3");
        assert_eq!(
            ParamValue::List(vec!["a".into(), "b".into()]).to_string(),
            "[a, b]"
        );

        let mut map = BTreeMap::new();
        map.insert("k".to_string(), "v".to_string());
        assert_eq!(ParamValue::Map(map).to_string(), "{k=v}");
    }

    #[test]
    fn test_summary_counts() {
        let entries = vec![
            ResourceAnalysis::new(ResourceKind::Command, ResourceOperation::Execute, "a")
                .for_group("g1")
                .for_command("a"),
            ResourceAnalysis::new(ResourceKind::Command, ResourceOperation::Execute, "b")
                .with_status(AnalysisStatus::Error)
                .for_group("g1")
                .for_command("b"),
            ResourceAnalysis::new(ResourceKind::Filesystem, ResourceOperation::Create, "/tmp/x")
                .with_skip_reason("standard path")
                .for_group("g2"),
        ];

        let summary = ExecutionSummary::compute(&entries);
        assert_eq!(summary.totals.successful, 1);
        assert_eq!(summary.totals.failed, 1);
        assert_eq!(summary.totals.skipped, 1);
        assert_eq!(summary.totals.total(), 3);
        assert_eq!(summary.by_group.get("g1").unwrap().total(), 2);
        assert_eq!(summary.by_command.get("a").unwrap().successful, 1);
    }

    #[test]
    fn test_entry_serializes_to_document() {
        let entry = ResourceAnalysis::new(ResourceKind::Privilege, ResourceOperation::Escalate, "root")
            .with_param("reason", "temp dir cleanup");
        let doc = serde_json::to_value(&entry).unwrap();

        assert_eq!(doc["kind"], "privilege");
        assert_eq!(doc["operation"], "escalate");
        assert_eq!(doc["target"], "root");
        assert_eq!(doc["parameters"]["reason"]["kind"], "str");
        assert_eq!(doc["parameters"]["reason"]["value"], "temp dir cleanup");
    }

    #[test]
    fn test_param_value_round_trip_keeps_variants_distinct() {
        for value in [
            ParamValue::Str("x".to_string()),
            ParamValue::Opaque("x".to_string()),
            ParamValue::Int(7),
            ParamValue::Bool(false),
        ] {
            let json = serde_json::to_value(&value).unwrap();
            let back: ParamValue = serde_json::from_value(json).unwrap();
            assert_eq!(back, value);
        }
    }
}
