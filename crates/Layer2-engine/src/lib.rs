//! # warden-engine
//!
//! Privilege-aware command execution control:
//! - Command: command/group data model and the per-call phase machine
//! - Ledger: append-only, token-addressable record of simulated operations
//! - Collaborator: injected system primitives (paths, processes, privileges)
//! - Executor: real and simulation implementations of one controller surface
//! - Manager: the mode facade that routes every call
//!
//! Both execution modes share validation and risk policy from
//! `warden-foundation`, so a dry run is a trustworthy predictor of what the
//! real run would do or refuse to do.

pub mod collaborator;
pub mod command;
pub mod executor;
pub mod ledger;
pub mod manager;

// ============================================================================
// Command model
// ============================================================================
pub use command::{Command, CommandGroup, ExecutionPhase, ExecutionResult};

// ============================================================================
// Ledger
// ============================================================================
pub use ledger::{
    AnalysisId, AnalysisStatus, CommandDebugInfo, CommandToken, DebugInfo, ExecutionSummary,
    GroupDebugInfo, LedgerSnapshot, ParamValue, ResourceAnalysis, ResourceImpact, ResourceKind,
    ResourceLedger, ResourceOperation, RunStatus, StatusCounts,
};

// ============================================================================
// Collaborators
// ============================================================================
pub use collaborator::{
    DefaultOutputCaptureManager, ElevationContext, FileSystemOps, NotificationSender,
    OutputAnalysis, OutputCaptureManager, PathResolver, PrivilegeManager, PrivilegedFn,
    ProcessExecutor, ProcessOutput, StdFileSystemOps, TokioProcessExecutor,
    TracingNotificationSender, UnsupportedPrivilegeManager, WhichPathResolver,
};

// ============================================================================
// Executors and facade
// ============================================================================
pub use executor::{
    CommandExecution, ExecutionMode, RealExecutor, ResourceController, SimulationExecutor,
};
pub use manager::{ExecutionManager, ExecutionManagerBuilder};

// Foundation types callers need alongside the engine surface
pub use warden_foundation::{
    AnalysisOptions, DetailLevel, EnvImport, EnvSpec, Error, InheritanceAnalysis, InheritanceMode,
    Result, RiskAssessment, RiskLevel,
};
