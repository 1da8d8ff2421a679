//! Execution manager - the mode facade
//!
//! Built once with concrete collaborators and a fixed mode. Both executors
//! are constructed eagerly over the same ledger, so the simulation side's
//! state exists regardless of which mode is active and no call path differs
//! in wiring between modes. Every operation routes to the executor matching
//! the configured mode; no call skips validation.

use crate::collaborator::{
    DefaultOutputCaptureManager, ElevationContext, FileSystemOps, NotificationSender,
    OutputCaptureManager, PathResolver, PrivilegeManager, PrivilegedFn, ProcessExecutor,
    StdFileSystemOps, TokioProcessExecutor, TracingNotificationSender, WhichPathResolver,
};
use crate::command::{Command, CommandGroup};
use crate::executor::{
    CommandExecution, ExecutionMode, RealExecutor, ResourceController, SimulationExecutor,
};
use crate::ledger::{
    CommandDebugInfo, CommandToken, GroupDebugInfo, LedgerSnapshot, ResourceLedger,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use warden_foundation::{Error, Result};

pub struct ExecutionManager {
    mode: ExecutionMode,
    real: RealExecutor,
    simulation: SimulationExecutor,
}

impl std::fmt::Debug for ExecutionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionManager")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl ExecutionManager {
    pub fn builder(mode: ExecutionMode) -> ExecutionManagerBuilder {
        ExecutionManagerBuilder::new(mode)
    }

    /// Manager wired with the production collaborators.
    pub fn production(mode: ExecutionMode) -> Result<Self> {
        Self::builder(mode)
            .path_resolver(Arc::new(WhichPathResolver))
            .process_executor(Arc::new(TokioProcessExecutor))
            .filesystem_ops(Arc::new(StdFileSystemOps))
            .build()
    }

    fn active(&self) -> &dyn ResourceController {
        match self.mode {
            ExecutionMode::Execute => &self.real,
            ExecutionMode::DryRun => &self.simulation,
        }
    }
}

#[async_trait]
impl ResourceController for ExecutionManager {
    fn name(&self) -> &'static str {
        "manager"
    }

    fn mode(&self) -> ExecutionMode {
        self.mode
    }

    async fn execute_command(
        &self,
        command: &Command,
        group: &CommandGroup,
        env: &HashMap<String, String>,
    ) -> Result<CommandExecution> {
        self.active().execute_command(command, group, env).await
    }

    fn create_temp_dir(&self, group_name: &str) -> Result<PathBuf> {
        self.active().create_temp_dir(group_name)
    }

    fn cleanup_temp_dir(&self, path: &Path) -> Result<()> {
        self.active().cleanup_temp_dir(path)
    }

    fn cleanup_all_temp_dirs(&self) -> Result<()> {
        self.active().cleanup_all_temp_dirs()
    }

    fn with_privileges(&self, ctx: &ElevationContext, body: PrivilegedFn) -> Result<()> {
        self.active().with_privileges(ctx, body)
    }

    async fn send_notification(&self, message: &str, details: &str) -> Result<()> {
        self.active().send_notification(message, details).await
    }

    fn validate_output_path(&self, path: &Path, work_dir: &Path) -> Result<()> {
        self.active().validate_output_path(path, work_dir)
    }

    fn results(&self) -> Option<LedgerSnapshot> {
        self.active().results()
    }

    fn record_group_analysis(&self, group_name: &str, info: GroupDebugInfo) -> Result<()> {
        self.active().record_group_analysis(group_name, info)
    }

    fn update_command_debug_info(
        &self,
        token: &CommandToken,
        info: CommandDebugInfo,
    ) -> Result<()> {
        self.active().update_command_debug_info(token, info)
    }
}

/// Builder for [`ExecutionManager`].
///
/// Required collaborators are checked at `build()`, not deferred to first
/// use: a misconfigured manager never exists.
pub struct ExecutionManagerBuilder {
    mode: ExecutionMode,
    path_resolver: Option<Arc<dyn PathResolver>>,
    process_executor: Option<Arc<dyn ProcessExecutor>>,
    fs_ops: Option<Arc<dyn FileSystemOps>>,
    privilege_manager: Option<Arc<dyn PrivilegeManager>>,
    output_manager: Option<Arc<dyn OutputCaptureManager>>,
    notifier: Option<Arc<dyn NotificationSender>>,
    temp_base: Option<PathBuf>,
}

impl ExecutionManagerBuilder {
    pub fn new(mode: ExecutionMode) -> Self {
        Self {
            mode,
            path_resolver: None,
            process_executor: None,
            fs_ops: None,
            privilege_manager: None,
            output_manager: None,
            notifier: None,
            temp_base: None,
        }
    }

    pub fn path_resolver(mut self, resolver: Arc<dyn PathResolver>) -> Self {
        self.path_resolver = Some(resolver);
        self
    }

    pub fn process_executor(mut self, executor: Arc<dyn ProcessExecutor>) -> Self {
        self.process_executor = Some(executor);
        self
    }

    pub fn filesystem_ops(mut self, ops: Arc<dyn FileSystemOps>) -> Self {
        self.fs_ops = Some(ops);
        self
    }

    pub fn privilege_manager(mut self, manager: Arc<dyn PrivilegeManager>) -> Self {
        self.privilege_manager = Some(manager);
        self
    }

    pub fn output_manager(mut self, manager: Arc<dyn OutputCaptureManager>) -> Self {
        self.output_manager = Some(manager);
        self
    }

    pub fn notification_sender(mut self, sender: Arc<dyn NotificationSender>) -> Self {
        self.notifier = Some(sender);
        self
    }

    pub fn temp_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.temp_base = Some(base.into());
        self
    }

    pub fn build(self) -> Result<ExecutionManager> {
        let path_resolver = self
            .path_resolver
            .ok_or_else(|| Error::CollaboratorMissing("path resolver".to_string()))?;
        let process_executor = self
            .process_executor
            .ok_or_else(|| Error::CollaboratorMissing("process executor".to_string()))?;
        let fs_ops = self
            .fs_ops
            .ok_or_else(|| Error::CollaboratorMissing("filesystem ops".to_string()))?;

        let output_manager = self
            .output_manager
            .unwrap_or_else(|| Arc::new(DefaultOutputCaptureManager));
        let notifier = self
            .notifier
            .unwrap_or_else(|| Arc::new(TracingNotificationSender));
        let temp_base = self.temp_base.unwrap_or_else(std::env::temp_dir);

        let mut real = RealExecutor::new(
            Arc::clone(&path_resolver),
            process_executor,
            fs_ops,
            Arc::clone(&output_manager),
            notifier,
        )
        .with_temp_base(temp_base.clone());

        let mut simulation = SimulationExecutor::new(
            path_resolver,
            output_manager,
            Arc::new(ResourceLedger::new()),
        )
        .with_temp_base(temp_base);

        if let Some(manager) = self.privilege_manager {
            real = real.with_privilege_manager(Arc::clone(&manager));
            simulation = simulation.with_privilege_manager(manager);
        }

        info!(mode = %self.mode, "execution manager built");
        Ok(ExecutionManager {
            mode: self.mode,
            real,
            simulation,
        })
    }
}
