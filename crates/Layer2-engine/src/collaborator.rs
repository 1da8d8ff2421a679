//! Collaborator interfaces
//!
//! The engine never touches the system directly; every side-effecting
//! primitive sits behind one of these constructor-injected traits. Production
//! implementations live next to the traits; tests substitute their own.

use crate::command::Command;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use warden_foundation::{Error, Result};

// ============================================================================
// Path resolution
// ============================================================================

/// Resolves a command name to an absolute binary path.
pub trait PathResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Result<PathBuf>;
}

/// PATH-based resolver.
pub struct WhichPathResolver;

impl PathResolver for WhichPathResolver {
    fn resolve(&self, name: &str) -> Result<PathBuf> {
        which::which(name).map_err(|e| Error::path_resolution(name, e.to_string()))
    }
}

// ============================================================================
// Privilege management
// ============================================================================

/// Why and as whom privileges are requested.
#[derive(Debug, Clone, Default)]
pub struct ElevationContext {
    pub reason: String,
    pub run_as_user: Option<String>,
    pub run_as_group: Option<String>,
}

impl ElevationContext {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            ..Default::default()
        }
    }

    pub fn for_command(command: &Command, reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            run_as_user: command.run_as_user.clone(),
            run_as_group: command.run_as_group.clone(),
        }
    }
}

/// Body executed while privileges are (nominally) held.
pub type PrivilegedFn = Box<dyn FnOnce() -> Result<()> + Send>;

/// Runs a function body under elevated privileges.
///
/// The engine performs no escalation syscalls itself; implementations own
/// that entirely.
pub trait PrivilegeManager: Send + Sync {
    fn with_privileges(&self, ctx: &ElevationContext, body: PrivilegedFn) -> Result<()>;

    fn is_supported(&self) -> bool;
}

/// Default manager for platforms/builds without privilege support. The body
/// is never invoked; callers see a distinct unsupported error.
pub struct UnsupportedPrivilegeManager;

impl PrivilegeManager for UnsupportedPrivilegeManager {
    fn with_privileges(&self, ctx: &ElevationContext, _body: PrivilegedFn) -> Result<()> {
        Err(Error::PrivilegeUnsupported(ctx.reason.clone()))
    }

    fn is_supported(&self) -> bool {
        false
    }
}

// ============================================================================
// Process execution
// ============================================================================

/// Captured output of a finished process.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Launches the real process. Cancellation is the caller's responsibility;
/// the command timeout is the only bound applied here.
#[async_trait]
pub trait ProcessExecutor: Send + Sync {
    async fn execute(
        &self,
        command: &Command,
        resolved: &Path,
        env: &HashMap<String, String>,
    ) -> Result<ProcessOutput>;
}

/// tokio-based process launcher.
pub struct TokioProcessExecutor;

#[async_trait]
impl ProcessExecutor for TokioProcessExecutor {
    async fn execute(
        &self,
        command: &Command,
        resolved: &Path,
        env: &HashMap<String, String>,
    ) -> Result<ProcessOutput> {
        let mut cmd = tokio::process::Command::new(resolved);
        cmd.args(&command.args)
            .env_clear()
            .envs(env)
            .kill_on_drop(true);

        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }

        debug!(command = %command.name, binary = %resolved.display(), "spawning process");

        let run = cmd.output();
        let output = if command.timeout > Duration::ZERO {
            match tokio::time::timeout(command.timeout, run).await {
                Ok(result) => result,
                Err(_) => {
                    return Err(Error::Timeout(format!(
                        "command '{}' exceeded {:.1}s",
                        command.name,
                        command.timeout.as_secs_f64()
                    )))
                }
            }
        } else {
            run.await
        };

        let output = output.map_err(|e| Error::Process(format!("failed to spawn process: {e}")))?;

        Ok(ProcessOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

// ============================================================================
// Filesystem
// ============================================================================

/// Temp-dir lifecycle and existence checks.
pub trait FileSystemOps: Send + Sync {
    fn create_temp_dir(&self, base: &Path, prefix: &str) -> Result<PathBuf>;

    fn remove_all(&self, path: &Path) -> Result<()>;

    fn file_exists(&self, path: &Path) -> Result<bool>;
}

/// std::fs-backed implementation with unique directory names.
pub struct StdFileSystemOps;

impl FileSystemOps for StdFileSystemOps {
    fn create_temp_dir(&self, base: &Path, prefix: &str) -> Result<PathBuf> {
        let unique = uuid::Uuid::new_v4().simple().to_string();
        let path = base.join(format!("{prefix}-{unique}"));
        std::fs::create_dir_all(&path)
            .map_err(|e| Error::Filesystem(format!("create {}: {e}", path.display())))?;
        Ok(path)
    }

    fn remove_all(&self, path: &Path) -> Result<()> {
        std::fs::remove_dir_all(path)
            .map_err(|e| Error::Filesystem(format!("remove {}: {e}", path.display())))
    }

    fn file_exists(&self, path: &Path) -> Result<bool> {
        path.try_exists()
            .map_err(|e| Error::Filesystem(format!("stat {}: {e}", path.display())))
    }
}

// ============================================================================
// Output capture
// ============================================================================

/// What output-path preparation found.
#[derive(Debug, Clone)]
pub struct OutputAnalysis {
    pub path: PathBuf,
    pub directory: PathBuf,
    pub directory_exists: bool,
}

/// Validates and analyzes command output destinations.
pub trait OutputCaptureManager: Send + Sync {
    fn validate_output_path(&self, path: &Path, work_dir: &Path) -> Result<()>;

    fn analyze_output(&self, path: &Path, work_dir: &Path) -> OutputAnalysis;
}

/// Default manager: keeps output inside the working directory.
pub struct DefaultOutputCaptureManager;

impl OutputCaptureManager for DefaultOutputCaptureManager {
    fn validate_output_path(&self, path: &Path, work_dir: &Path) -> Result<()> {
        if path.as_os_str().is_empty() {
            return Err(Error::Validation("output path is empty".to_string()));
        }
        if path
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(Error::Validation(format!(
                "output path '{}' escapes the working directory",
                path.display()
            )));
        }
        if path.is_absolute() && !path.starts_with(work_dir) {
            return Err(Error::Validation(format!(
                "output path '{}' is outside '{}'",
                path.display(),
                work_dir.display()
            )));
        }
        Ok(())
    }

    fn analyze_output(&self, path: &Path, work_dir: &Path) -> OutputAnalysis {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            work_dir.join(path)
        };
        let directory = absolute
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| work_dir.to_path_buf());
        let directory_exists = directory.exists();
        OutputAnalysis {
            path: absolute,
            directory,
            directory_exists,
        }
    }
}

// ============================================================================
// Notification
// ============================================================================

/// Pushes a human-facing message to an external channel.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, message: &str, details: &str) -> Result<()>;
}

/// Default sender: structured log line, no external delivery.
pub struct TracingNotificationSender;

#[async_trait]
impl NotificationSender for TracingNotificationSender {
    async fn send(&self, message: &str, details: &str) -> Result<()> {
        info!(message, details, "notification");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_privilege_manager() {
        let pm = UnsupportedPrivilegeManager;
        assert!(!pm.is_supported());

        let err = pm
            .with_privileges(&ElevationContext::new("test"), Box::new(|| Ok(())))
            .unwrap_err();
        assert!(matches!(err, Error::PrivilegeUnsupported(_)));
    }

    #[test]
    fn test_output_path_validation() {
        let mgr = DefaultOutputCaptureManager;
        let work = Path::new("/work");

        assert!(mgr.validate_output_path(Path::new("logs/out.txt"), work).is_ok());
        assert!(mgr.validate_output_path(Path::new(""), work).is_err());
        assert!(mgr
            .validate_output_path(Path::new("../escape.txt"), work)
            .is_err());
        assert!(mgr
            .validate_output_path(Path::new("/etc/passwd"), work)
            .is_err());
        assert!(mgr
            .validate_output_path(Path::new("/work/out.txt"), work)
            .is_ok());
    }

    #[test]
    fn test_analyze_output_resolves_relative_paths() {
        let mgr = DefaultOutputCaptureManager;
        let analysis = mgr.analyze_output(Path::new("logs/out.txt"), Path::new("/work"));
        assert_eq!(analysis.path, Path::new("/work/logs/out.txt"));
        assert_eq!(analysis.directory, Path::new("/work/logs"));
    }

    #[test]
    fn test_std_fs_temp_dir_roundtrip() {
        let fs = StdFileSystemOps;
        let base = std::env::temp_dir();
        let dir = fs.create_temp_dir(&base, "warden-test").unwrap();

        assert!(fs.file_exists(&dir).unwrap());
        fs.remove_all(&dir).unwrap();
        assert!(!fs.file_exists(&dir).unwrap());
    }

    #[tokio::test]
    async fn test_tokio_process_executor() {
        let exec = TokioProcessExecutor;
        let command = crate::command::Command::new("echo", "echo")
            .with_args(vec!["hello".to_string()]);
        let mut env = HashMap::new();
        env.insert("PATH".to_string(), "/usr/bin:/bin".to_string());

        let output = exec
            .execute(&command, Path::new("/bin/echo"), &env)
            .await
            .unwrap();
        assert_eq!(output.exit_code, 0);
        assert!(output.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn test_process_timeout() {
        let exec = TokioProcessExecutor;
        let command = crate::command::Command::new("sleeper", "sleep")
            .with_args(vec!["5".to_string()])
            .with_timeout(Duration::from_millis(100));

        let err = exec
            .execute(&command, Path::new("/bin/sleep"), &HashMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }
}
