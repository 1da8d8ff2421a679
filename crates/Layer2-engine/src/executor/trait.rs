//! Controller interface shared by both execution modes
//!
//! Every operation a scheduled command may trigger goes through this trait,
//! so callers cannot tell (and must not care) whether side effects are real
//! or recorded.

use crate::collaborator::{ElevationContext, PrivilegedFn};
use crate::command::{Command, CommandGroup, ExecutionResult};
use crate::ledger::{CommandDebugInfo, CommandToken, GroupDebugInfo, LedgerSnapshot};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use warden_foundation::Result;

/// Execution mode, fixed at facade construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Delegate to the real collaborators.
    Execute,
    /// Record every side effect in the ledger instead of performing it.
    DryRun,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Execute => "execute",
            Self::DryRun => "dry-run",
        }
    }

    pub fn is_dry_run(&self) -> bool {
        matches!(self, Self::DryRun)
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one `execute_command` call.
#[derive(Debug, Clone)]
pub struct CommandExecution {
    /// Ledger token for the command entry; absent in Execute mode.
    pub token: Option<CommandToken>,

    /// The execution (or simulation) result itself.
    pub result: ExecutionResult,
}

/// Mode-agnostic command execution surface.
///
/// Both executors apply identical validation and risk policy; only the
/// side-effecting tail differs.
#[async_trait]
pub trait ResourceController: Send + Sync {
    /// Short identifier for logs.
    fn name(&self) -> &'static str;

    /// Mode this controller implements.
    fn mode(&self) -> ExecutionMode;

    /// Validate, classify, and run (or simulate) one command.
    async fn execute_command(
        &self,
        command: &Command,
        group: &CommandGroup,
        env: &HashMap<String, String>,
    ) -> Result<CommandExecution>;

    /// Create (or simulate) a temp directory for a group.
    fn create_temp_dir(&self, group_name: &str) -> Result<PathBuf>;

    /// Remove (or simulate removing) one temp directory.
    fn cleanup_temp_dir(&self, path: &Path) -> Result<()>;

    /// Remove every temp directory created through this controller.
    fn cleanup_all_temp_dirs(&self) -> Result<()>;

    /// Run a function body under elevated privileges. The body runs in both
    /// modes; only the elevation itself is mode-dependent.
    fn with_privileges(&self, ctx: &ElevationContext, body: PrivilegedFn) -> Result<()>;

    /// Send (or record) a notification.
    async fn send_notification(&self, message: &str, details: &str) -> Result<()>;

    /// Validate a command output destination.
    fn validate_output_path(&self, path: &Path, work_dir: &Path) -> Result<()>;

    /// Ledger snapshot; `None` in Execute mode.
    fn results(&self) -> Option<LedgerSnapshot>;

    /// Record a group-kind ledger entry; no-op in Execute mode.
    fn record_group_analysis(&self, group_name: &str, info: GroupDebugInfo) -> Result<()>;

    /// Attach debug info to a command entry; no-op in Execute mode.
    fn update_command_debug_info(&self, token: &CommandToken, info: CommandDebugInfo)
        -> Result<()>;
}
