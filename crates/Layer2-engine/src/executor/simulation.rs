//! Simulation executor
//!
//! Applies the same validation and risk policy as the real executor, then
//! records what would happen instead of doing it. The only collaborators it
//! touches are pure or dry-run-safe: the path resolver, the privilege
//! manager's no-op elevation path, and the output-path validator. The real
//! process collaborator is never called.

use super::r#trait::{CommandExecution, ExecutionMode, ResourceController};
use super::{prepare_command, PreparedCommand};
use crate::collaborator::{
    ElevationContext, OutputCaptureManager, PathResolver, PrivilegeManager, PrivilegedFn,
};
use crate::command::{Command, CommandGroup, ExecutionPhase, ExecutionResult};
use crate::ledger::{
    AnalysisStatus, CommandDebugInfo, CommandToken, GroupDebugInfo, LedgerSnapshot, ParamValue,
    ResourceAnalysis, ResourceImpact, ResourceKind, ResourceLedger, ResourceOperation,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};
use warden_foundation::{Error, Result, RiskLevel};

pub struct SimulationExecutor {
    path_resolver: Arc<dyn PathResolver>,
    privilege_manager: Option<Arc<dyn PrivilegeManager>>,
    output_manager: Arc<dyn OutputCaptureManager>,
    ledger: Arc<ResourceLedger>,
    temp_base: PathBuf,
    /// Simulated temp dirs handed out so far, for cleanup_all.
    temp_dirs: Mutex<Vec<PathBuf>>,
    /// Sequence for deterministic simulated temp paths.
    temp_seq: AtomicU64,
}

impl SimulationExecutor {
    pub fn new(
        path_resolver: Arc<dyn PathResolver>,
        output_manager: Arc<dyn OutputCaptureManager>,
        ledger: Arc<ResourceLedger>,
    ) -> Self {
        Self {
            path_resolver,
            privilege_manager: None,
            output_manager,
            ledger,
            temp_base: std::env::temp_dir(),
            temp_dirs: Mutex::new(Vec::new()),
            temp_seq: AtomicU64::new(0),
        }
    }

    pub fn with_privilege_manager(mut self, manager: Arc<dyn PrivilegeManager>) -> Self {
        self.privilege_manager = Some(manager);
        self
    }

    pub fn with_temp_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.temp_base = base.into();
        self
    }

    /// Dry-run validation of a declared run-as configuration.
    ///
    /// Returns the annotation to record and, when elevation genuinely failed,
    /// forces the effective risk to High. An absent privilege manager is a
    /// recorded warning so the analysis can proceed; unsupported platforms
    /// annotate without escalating.
    fn validate_run_as(&self, command: &Command, level: &mut RiskLevel) -> String {
        let Some(manager) = &self.privilege_manager else {
            warn!(
                command = %command.name,
                "run-as declared but no privilege manager configured"
            );
            return "run-as declared but no privilege manager configured".to_string();
        };

        let ctx = ElevationContext::for_command(command, "run-as dry-run validation");
        match manager.with_privileges(&ctx, Box::new(|| Ok(()))) {
            Ok(()) => "run-as configuration validated".to_string(),
            Err(Error::PrivilegeUnsupported(reason)) => {
                format!("privileged execution not supported: {reason}")
            }
            Err(e) => {
                *level = RiskLevel::High;
                format!("run-as validation failed: {e}")
            }
        }
    }
}

#[async_trait]
impl ResourceController for SimulationExecutor {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn mode(&self) -> ExecutionMode {
        ExecutionMode::DryRun
    }

    async fn execute_command(
        &self,
        command: &Command,
        group: &CommandGroup,
        env: &HashMap<String, String>,
    ) -> Result<CommandExecution> {
        let started = Instant::now();
        let PreparedCommand {
            target,
            assessment,
            phase,
            ..
        } = prepare_command(self.path_resolver.as_ref(), command, group)?;

        let mut level = assessment.level;
        let mut annotations: Vec<String> = Vec::new();

        if command.has_run_as() {
            annotations.push(self.validate_run_as(command, &mut level));
        }

        // Ceiling violations are never fatal here; the run continues, but the
        // entry is escalated to high so report consumers filtering by risk
        // see exactly what the real executor would have refused.
        if !level.within_ceiling(command.max_risk_level) {
            annotations.push(format!(
                "risk {level} exceeds ceiling {}; real execution would be refused",
                command.max_risk_level
            ));
            level = level.max(RiskLevel::High);
        }

        let mut env_names: Vec<String> = env.keys().cloned().collect();
        env_names.sort();

        let mut entry = ResourceAnalysis::new(ResourceKind::Command, ResourceOperation::Execute, &target)
            .for_group(&group.name)
            .for_command(&command.name)
            .with_param("risk", level.as_str())
            .with_param("reason", assessment.reason.clone())
            .with_param("env", ParamValue::List(env_names))
            .with_impact(ResourceImpact::new(false, true, level));
        if let Some(rule) = &assessment.rule {
            entry = entry.with_param("rule", rule.clone());
        }
        if !annotations.is_empty() {
            entry = entry.with_param("annotations", ParamValue::List(annotations));
        }

        let token = self.ledger.record(entry);
        phase.advance(ExecutionPhase::Recorded)?;

        let working_dir = command
            .working_dir
            .as_deref()
            .unwrap_or_else(|| Path::new("."));
        let stdout = format!(
            "[dry-run] would execute '{target}' in '{}'",
            working_dir.display()
        );

        debug!(command = %command.name, %token, "simulated execution recorded");

        Ok(CommandExecution {
            token: Some(token),
            result: ExecutionResult {
                exit_code: 0,
                stdout,
                stderr: String::new(),
                duration: started.elapsed(),
                dry_run: true,
                analysis: Some(token),
            },
        })
    }

    fn create_temp_dir(&self, group_name: &str) -> Result<PathBuf> {
        let seq = self.temp_seq.fetch_add(1, Ordering::Relaxed);
        let path = self.temp_base.join(format!("warden-{group_name}-{seq}"));

        self.ledger.record(
            ResourceAnalysis::new(
                ResourceKind::Filesystem,
                ResourceOperation::Create,
                path.display().to_string(),
            )
            .for_group(group_name)
            .with_param("simulated", true)
            .with_impact(ResourceImpact::new(true, false, RiskLevel::None)),
        );

        self.temp_dirs.lock().push(path.clone());
        Ok(path)
    }

    fn cleanup_temp_dir(&self, path: &Path) -> Result<()> {
        self.ledger.record(
            ResourceAnalysis::new(
                ResourceKind::Filesystem,
                ResourceOperation::Delete,
                path.display().to_string(),
            )
            .with_param("simulated", true)
            .with_impact(ResourceImpact::new(false, false, RiskLevel::None)),
        );

        self.temp_dirs.lock().retain(|p| p != path);
        Ok(())
    }

    fn cleanup_all_temp_dirs(&self) -> Result<()> {
        let dirs: Vec<PathBuf> = std::mem::take(&mut *self.temp_dirs.lock());
        for path in dirs {
            self.ledger.record(
                ResourceAnalysis::new(
                    ResourceKind::Filesystem,
                    ResourceOperation::Delete,
                    path.display().to_string(),
                )
                .with_param("simulated", true)
                .with_impact(ResourceImpact::new(false, false, RiskLevel::None)),
            );
        }
        Ok(())
    }

    /// Records the elevation that would occur, then invokes the body
    /// directly: there is no privilege to actually hold, but the body's own
    /// side effects must still run so dependent logic behaves identically
    /// across modes.
    fn with_privileges(&self, ctx: &ElevationContext, body: PrivilegedFn) -> Result<()> {
        let target = ctx.run_as_user.as_deref().unwrap_or("root").to_string();
        let outcome = body();

        let status = if outcome.is_ok() {
            AnalysisStatus::Success
        } else {
            AnalysisStatus::Error
        };
        self.ledger.record(
            ResourceAnalysis::new(ResourceKind::Privilege, ResourceOperation::Escalate, target)
                .with_param("reason", ctx.reason.clone())
                .with_param("simulated", true)
                .with_status(status)
                .with_impact(ResourceImpact::new(true, false, RiskLevel::Medium)),
        );

        outcome
    }

    async fn send_notification(&self, message: &str, details: &str) -> Result<()> {
        self.ledger.record(
            ResourceAnalysis::new(ResourceKind::Network, ResourceOperation::Send, message)
                .with_param("details", details)
                .with_param("simulated", true)
                .with_impact(ResourceImpact::new(true, false, RiskLevel::None)),
        );
        Ok(())
    }

    fn validate_output_path(&self, path: &Path, work_dir: &Path) -> Result<()> {
        let outcome = self.output_manager.validate_output_path(path, work_dir);

        let status = if outcome.is_ok() {
            AnalysisStatus::Success
        } else {
            AnalysisStatus::Error
        };
        self.ledger.record(
            ResourceAnalysis::new(
                ResourceKind::Filesystem,
                ResourceOperation::Analyze,
                path.display().to_string(),
            )
            .with_param("working_dir", work_dir.display().to_string())
            .with_status(status)
            .with_impact(ResourceImpact::new(true, false, RiskLevel::None)),
        );

        outcome
    }

    fn results(&self) -> Option<LedgerSnapshot> {
        Some(self.ledger.snapshot())
    }

    fn record_group_analysis(&self, group_name: &str, info: GroupDebugInfo) -> Result<()> {
        self.ledger.record_group(group_name, info);
        Ok(())
    }

    fn update_command_debug_info(
        &self,
        token: &CommandToken,
        info: CommandDebugInfo,
    ) -> Result<()> {
        self.ledger.update_command_debug_info(token, info)
    }
}
