//! Resource ledger
//!
//! Append-only, token-addressable record of every simulated operation:
//! - `types` - entry, parameter, impact, token, and summary types
//! - `store` - the concurrency-guarded ledger itself

pub mod store;
pub mod types;

pub use store::{LedgerSnapshot, ResourceLedger, RunStatus};
pub use types::{
    AnalysisId, AnalysisStatus, CommandDebugInfo, CommandToken, DebugInfo, ExecutionSummary,
    GroupDebugInfo, ParamValue, ResourceAnalysis, ResourceImpact, ResourceKind, ResourceOperation,
    StatusCounts,
};
