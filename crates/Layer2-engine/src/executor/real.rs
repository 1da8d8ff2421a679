//! Real executor
//!
//! Same validation and classification as the simulation executor, then
//! fail-closed risk enforcement: a command whose effective risk exceeds its
//! declared ceiling is refused before any collaborator is touched. Everything
//! that passes is delegated to the live collaborators unmodified.

use super::r#trait::{CommandExecution, ExecutionMode, ResourceController};
use super::{prepare_command, PreparedCommand};
use crate::collaborator::{
    ElevationContext, FileSystemOps, NotificationSender, OutputCaptureManager, PathResolver,
    PrivilegeManager, PrivilegedFn, ProcessExecutor,
};
use crate::command::{Command, CommandGroup, ExecutionPhase, ExecutionResult};
use crate::ledger::{CommandDebugInfo, CommandToken, GroupDebugInfo, LedgerSnapshot};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};
use warden_foundation::{Error, Result};

pub struct RealExecutor {
    path_resolver: Arc<dyn PathResolver>,
    process_executor: Arc<dyn ProcessExecutor>,
    fs_ops: Arc<dyn FileSystemOps>,
    privilege_manager: Option<Arc<dyn PrivilegeManager>>,
    output_manager: Arc<dyn OutputCaptureManager>,
    notifier: Arc<dyn NotificationSender>,
    temp_base: PathBuf,
    /// Directories created through this executor, swept by cleanup_all.
    temp_dirs: Mutex<Vec<PathBuf>>,
}

impl RealExecutor {
    pub fn new(
        path_resolver: Arc<dyn PathResolver>,
        process_executor: Arc<dyn ProcessExecutor>,
        fs_ops: Arc<dyn FileSystemOps>,
        output_manager: Arc<dyn OutputCaptureManager>,
        notifier: Arc<dyn NotificationSender>,
    ) -> Self {
        Self {
            path_resolver,
            process_executor,
            fs_ops,
            privilege_manager: None,
            output_manager,
            notifier,
            temp_base: std::env::temp_dir(),
            temp_dirs: Mutex::new(Vec::new()),
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
}

#[async_trait]
impl ResourceController for RealExecutor {
    fn name(&self) -> &'static str {
        "real"
    }

    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Execute
    }

    async fn execute_command(
        &self,
        command: &Command,
        group: &CommandGroup,
        env: &HashMap<String, String>,
    ) -> Result<CommandExecution> {
        let started = Instant::now();
        let PreparedCommand {
            resolved,
            target,
            assessment,
            phase,
        } = prepare_command(self.path_resolver.as_ref(), command, group)?;

        // Fail closed: refusal happens before any collaborator delegation.
        if !assessment.level.within_ceiling(command.max_risk_level) {
            warn!(
                command = %command.name,
                risk = %assessment.level,
                ceiling = %command.max_risk_level,
                reason = %assessment.reason,
                "execution refused"
            );
            phase.advance(ExecutionPhase::Refused)?;
            return Err(Error::security_violation(
                &target,
                assessment.level.as_str(),
                command.max_risk_level.as_str(),
            ));
        }

        // Elevation requires a configured privilege manager here; in
        // simulation the same gap is only an annotation.
        if command.has_run_as() {
            let manager = self
                .privilege_manager
                .as_ref()
                .ok_or_else(|| Error::CollaboratorMissing("privilege manager".to_string()))?;
            if !manager.is_supported() {
                return Err(Error::PrivilegeUnsupported(format!(
                    "command '{}' declares run-as",
                    command.name
                )));
            }
        }

        let output = self
            .process_executor
            .execute(command, &resolved, env)
            .await?;
        phase.advance(ExecutionPhase::Executed)?;

        debug!(
            command = %command.name,
            exit_code = output.exit_code,
            "process finished"
        );

        Ok(CommandExecution {
            token: None,
            result: ExecutionResult {
                exit_code: output.exit_code,
                stdout: output.stdout,
                stderr: output.stderr,
                duration: started.elapsed(),
                dry_run: false,
                analysis: None,
            },
        })
    }

    fn create_temp_dir(&self, group_name: &str) -> Result<PathBuf> {
        let prefix = format!("warden-{group_name}");
        let path = self.fs_ops.create_temp_dir(&self.temp_base, &prefix)?;
        self.temp_dirs.lock().push(path.clone());
        Ok(path)
    }

    fn cleanup_temp_dir(&self, path: &Path) -> Result<()> {
        self.fs_ops.remove_all(path)?;
        self.temp_dirs.lock().retain(|p| p != path);
        Ok(())
    }

    fn cleanup_all_temp_dirs(&self) -> Result<()> {
        let dirs: Vec<PathBuf> = std::mem::take(&mut *self.temp_dirs.lock());
        let mut first_error = None;
        for path in dirs {
            if let Err(e) = self.fs_ops.remove_all(&path) {
                warn!(path = %path.display(), error = %e, "temp dir cleanup failed");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn with_privileges(&self, ctx: &ElevationContext, body: PrivilegedFn) -> Result<()> {
        let manager = self
            .privilege_manager
            .as_ref()
            .ok_or_else(|| Error::CollaboratorMissing("privilege manager".to_string()))?;
        manager.with_privileges(ctx, body)
    }

    async fn send_notification(&self, message: &str, details: &str) -> Result<()> {
        self.notifier.send(message, details).await
    }

    fn validate_output_path(&self, path: &Path, work_dir: &Path) -> Result<()> {
        self.output_manager.validate_output_path(path, work_dir)
    }

    fn results(&self) -> Option<LedgerSnapshot> {
        None
    }

    fn record_group_analysis(&self, _group_name: &str, _info: GroupDebugInfo) -> Result<()> {
        Ok(())
    }

    fn update_command_debug_info(
        &self,
        _token: &CommandToken,
        _info: CommandDebugInfo,
    ) -> Result<()> {
        Ok(())
    }
}
