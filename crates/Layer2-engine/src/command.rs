//! Command and group definitions
//!
//! A `Command` is immutable once scheduled; the `with_*` builders configure
//! it before it is handed to the engine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use warden_foundation::{AnalysisOptions, EnvSpec, Error, InheritanceMode, Result, RiskLevel};

use crate::ledger::CommandToken;

/// A command scheduled for execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    /// Display name (unique within its group)
    pub name: String,

    /// Binary name or path, resolved through the path resolver before use
    pub binary: String,

    /// Argument list
    pub args: Vec<String>,

    /// Working directory
    pub working_dir: Option<PathBuf>,

    /// Execution timeout; zero means the executor default applies
    pub timeout: Duration,

    /// Run as a different user (requires privilege support)
    pub run_as_user: Option<String>,

    /// Run as a different group (requires privilege support)
    pub run_as_group: Option<String>,

    /// Explicitly marked as requiring privileges
    pub privileged: bool,

    /// Maximum risk level this command's configuration permits before real
    /// execution is refused
    pub max_risk_level: RiskLevel,
}

impl Command {
    /// Create a new command
    pub fn new(name: impl Into<String>, binary: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            binary: binary.into(),
            args: Vec::new(),
            working_dir: None,
            timeout: Duration::from_secs(120),
            run_as_user: None,
            run_as_group: None,
            privileged: false,
            max_risk_level: RiskLevel::Medium,
        }
    }

    /// Set arguments
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Set working directory
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set run-as user
    pub fn with_run_as_user(mut self, user: impl Into<String>) -> Self {
        self.run_as_user = Some(user.into());
        self
    }

    /// Set run-as group
    pub fn with_run_as_group(mut self, group: impl Into<String>) -> Self {
        self.run_as_group = Some(group.into());
        self
    }

    /// Mark as privileged
    pub fn with_privileged(mut self, privileged: bool) -> Self {
        self.privileged = privileged;
        self
    }

    /// Set the risk ceiling
    pub fn with_max_risk_level(mut self, level: RiskLevel) -> Self {
        self.max_risk_level = level;
        self
    }

    /// Whether the command declares a run-as user or group
    pub fn has_run_as(&self) -> bool {
        self.run_as_user.is_some() || self.run_as_group.is_some()
    }

    /// Classifier options derived from this command's configuration
    pub fn analysis_options(&self) -> AnalysisOptions {
        AnalysisOptions::default()
            .privileged(self.privileged)
            .run_as(self.has_run_as())
    }

    /// Pre-execution validation, identical across execution modes
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("command name is empty".to_string()));
        }
        if self.binary.trim().is_empty() {
            return Err(Error::Validation(format!(
                "command '{}' has an empty binary",
                self.name
            )));
        }
        Ok(())
    }
}

/// A named group of commands with its own environment policy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandGroup {
    /// Group name
    pub name: String,

    /// Description
    pub description: String,

    /// Declared environment surface (allowlist + imports)
    pub env: EnvSpec,

    /// How the group's allowlist relates to the global one
    pub inheritance_mode: InheritanceMode,

    /// Commands owned by this group
    pub commands: Vec<Command>,
}

impl CommandGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_env(mut self, env: EnvSpec) -> Self {
        self.env = env;
        self
    }

    pub fn with_inheritance_mode(mut self, mode: InheritanceMode) -> Self {
        self.inheritance_mode = mode;
        self
    }

    pub fn with_commands(mut self, commands: Vec<Command>) -> Self {
        self.commands = commands;
        self
    }

    /// Pre-execution validation, identical across execution modes
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("group name is empty".to_string()));
        }
        Ok(())
    }
}

/// Result of one command execution (real or simulated)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Process exit code
    pub exit_code: i32,

    /// Captured stdout (synthetic under dry-run)
    pub stdout: String,

    /// Captured stderr
    pub stderr: String,

    /// Wall-clock duration
    pub duration: Duration,

    /// Whether this result was produced without side effects
    pub dry_run: bool,

    /// Ledger entry produced for this execution, when one exists
    pub analysis: Option<CommandToken>,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Per-call execution phase. No phase is ever re-entered; a failure at any
/// stage is terminal for that call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionPhase {
    Received,
    Validated,
    Classified,
    Executed,
    Refused,
    Recorded,
}

impl ExecutionPhase {
    /// Advance to the next phase, rejecting transitions the state machine
    /// does not allow.
    pub fn advance(self, next: ExecutionPhase) -> Result<ExecutionPhase> {
        use ExecutionPhase::*;
        let allowed = matches!(
            (self, next),
            (Received, Validated)
                | (Validated, Classified)
                | (Classified, Executed)
                | (Classified, Refused)
                | (Classified, Recorded)
        );
        if allowed {
            Ok(next)
        } else {
            Err(Error::Internal(format!(
                "illegal phase transition {self:?} -> {next:?}"
            )))
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Executed | Self::Refused | Self::Recorded)
    }
}
