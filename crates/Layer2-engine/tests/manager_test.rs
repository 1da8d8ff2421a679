//! End-to-end tests of the execution manager facade.
//!
//! Stub collaborators keep the runs deterministic; the path resolver pins
//! every binary to /bin/ls so classification sees a stable target.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use warden_engine::{
    Command, CommandDebugInfo, CommandGroup, DetailLevel, EnvSpec, Error, ExecutionManager,
    ExecutionMode, FileSystemOps, GroupDebugInfo, InheritanceMode, ParamValue, PathResolver,
    ProcessExecutor, ProcessOutput, ResourceController, ResourceKind, Result, RiskLevel,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

struct FixedPathResolver;

impl PathResolver for FixedPathResolver {
    fn resolve(&self, _name: &str) -> Result<PathBuf> {
        Ok(PathBuf::from("/bin/ls"))
    }
}

struct CountingProcessExecutor(Arc<AtomicUsize>);

#[async_trait]
impl ProcessExecutor for CountingProcessExecutor {
    async fn execute(
        &self,
        _command: &Command,
        _resolved: &Path,
        _env: &HashMap<String, String>,
    ) -> Result<ProcessOutput> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(ProcessOutput {
            exit_code: 0,
            stdout: "real output".to_string(),
            stderr: String::new(),
        })
    }
}

struct NoopFileSystemOps;

impl FileSystemOps for NoopFileSystemOps {
    fn create_temp_dir(&self, base: &Path, prefix: &str) -> Result<PathBuf> {
        Ok(base.join(prefix))
    }

    fn remove_all(&self, _path: &Path) -> Result<()> {
        Ok(())
    }

    fn file_exists(&self, _path: &Path) -> Result<bool> {
        Ok(true)
    }
}

fn manager(mode: ExecutionMode, process_calls: Arc<AtomicUsize>) -> ExecutionManager {
    ExecutionManager::builder(mode)
        .path_resolver(Arc::new(FixedPathResolver))
        .process_executor(Arc::new(CountingProcessExecutor(process_calls)))
        .filesystem_ops(Arc::new(NoopFileSystemOps))
        .build()
        .unwrap()
}

#[tokio::test]
async fn dry_run_records_group_and_command_entries() {
    init_tracing();
    let calls = Arc::new(AtomicUsize::new(0));
    let mgr = manager(ExecutionMode::DryRun, Arc::clone(&calls));

    let global = EnvSpec::new().with_allowed(vec!["PATH".into(), "HOME".into()]);
    let group = CommandGroup::new("maintenance").with_description("nightly jobs");
    let info = GroupDebugInfo::from_specs(
        DetailLevel::Detailed,
        &global,
        Some(&group.env),
        InheritanceMode::Inherit,
        Some(group.description.clone()),
    );
    mgr.record_group_analysis(&group.name, info).unwrap();

    let command = Command::new("list", "ls").with_args(vec!["-la".to_string(), "/var".to_string()]);
    let execution = mgr
        .execute_command(&command, &group, &HashMap::new())
        .await
        .unwrap();

    assert!(execution.result.dry_run);
    assert_eq!(execution.result.exit_code, 0);
    assert!(execution.result.stdout.contains("[dry-run]"));
    // Simulation never reaches the process collaborator
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let snapshot = mgr.results().unwrap();
    assert_eq!(snapshot.entries.len(), 2);
    assert_eq!(snapshot.entries[0].kind, ResourceKind::Group);
    assert_eq!(snapshot.entries[1].kind, ResourceKind::Command);
    assert_eq!(snapshot.entries[1].target, "/bin/ls -la /var");
    assert_eq!(snapshot.summary.by_command.get("list").unwrap().successful, 1);
}

#[tokio::test]
async fn debug_info_attaches_exactly_once() {
    init_tracing();
    let mgr = manager(ExecutionMode::DryRun, Arc::new(AtomicUsize::new(0)));
    let command = Command::new("list", "ls");
    let group = CommandGroup::new("g");

    let execution = mgr
        .execute_command(&command, &group, &HashMap::new())
        .await
        .unwrap();
    let token = execution.token.unwrap();

    let info = CommandDebugInfo {
        resolved_path: "/bin/ls".to_string(),
        expanded_args: vec![],
        env_names: vec!["PATH".to_string()],
        working_dir: None,
    };
    mgr.update_command_debug_info(&token, info.clone()).unwrap();

    let err = mgr.update_command_debug_info(&token, info).unwrap_err();
    assert!(err.is_token_error());

    // First attachment survives the failed second attempt
    let snapshot = mgr.results().unwrap();
    assert!(snapshot.entries[0].debug_info.is_some());
}

#[tokio::test]
async fn execute_mode_delegates_and_hides_the_ledger() {
    init_tracing();
    let calls = Arc::new(AtomicUsize::new(0));
    let mgr = manager(ExecutionMode::Execute, Arc::clone(&calls));
    let command = Command::new("list", "ls");
    let group = CommandGroup::new("g");

    let execution = mgr
        .execute_command(&command, &group, &HashMap::new())
        .await
        .unwrap();

    assert!(!execution.result.dry_run);
    assert_eq!(execution.result.stdout, "real output");
    assert!(execution.token.is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert!(mgr.results().is_none());
    assert!(mgr
        .record_group_analysis(
            "g",
            GroupDebugInfo {
                description: None,
                inheritance: None
            }
        )
        .is_ok());
}

#[tokio::test]
async fn execute_mode_refuses_over_ceiling_before_delegation() {
    init_tracing();
    let calls = Arc::new(AtomicUsize::new(0));
    let mgr = manager(ExecutionMode::Execute, Arc::clone(&calls));
    // Privileged commands classify at least Medium; a Low ceiling refuses.
    let command = Command::new("admin", "ls")
        .with_privileged(true)
        .with_max_risk_level(RiskLevel::Low);
    let group = CommandGroup::new("g");

    let err = mgr
        .execute_command(&command, &group, &HashMap::new())
        .await
        .unwrap_err();
    assert!(err.is_security_violation());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn dry_run_continues_over_ceiling_and_annotates() {
    init_tracing();
    let mgr = manager(ExecutionMode::DryRun, Arc::new(AtomicUsize::new(0)));
    let command = Command::new("admin", "ls")
        .with_privileged(true)
        .with_max_risk_level(RiskLevel::Low);
    let group = CommandGroup::new("g");

    let execution = mgr
        .execute_command(&command, &group, &HashMap::new())
        .await
        .unwrap();
    assert!(execution.result.dry_run);

    // Recorded as high risk so the simulated run predicts the real refusal
    let snapshot = mgr.results().unwrap();
    let entry = &snapshot.entries[0];
    assert_eq!(
        entry.parameters.get("risk").and_then(ParamValue::as_str),
        Some("high")
    );
    assert_eq!(entry.impact.security_risk, RiskLevel::High);
    match entry.parameters.get("annotations") {
        Some(ParamValue::List(items)) => {
            assert!(items.iter().any(|a| a.contains("refused")));
        }
        other => panic!("expected annotations, got {other:?}"),
    }
}

#[tokio::test]
async fn validation_failure_writes_no_ledger_entry() {
    init_tracing();
    let mgr = manager(ExecutionMode::DryRun, Arc::new(AtomicUsize::new(0)));
    let command = Command::new("broken", "");
    let group = CommandGroup::new("g");

    let err = mgr
        .execute_command(&command, &group, &HashMap::new())
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert!(mgr.results().unwrap().entries.is_empty());
}

#[tokio::test]
async fn group_analysis_respects_detail_level() {
    init_tracing();
    let mgr = manager(ExecutionMode::DryRun, Arc::new(AtomicUsize::new(0)));
    let global = EnvSpec::new().with_allowed(vec!["PATH".into()]);

    let shallow = GroupDebugInfo::from_specs(
        DetailLevel::Standard,
        &global,
        None,
        InheritanceMode::Inherit,
        None,
    );
    assert!(shallow.inheritance.is_none());

    let detailed = GroupDebugInfo::from_specs(
        DetailLevel::Detailed,
        &global,
        None,
        InheritanceMode::Inherit,
        None,
    );
    let analysis = detailed.inheritance.as_ref().unwrap();
    assert_eq!(analysis.inherited, vec!["PATH".to_string()]);

    mgr.record_group_analysis("g", detailed).unwrap();
    assert_eq!(mgr.results().unwrap().entries.len(), 1);
}

#[tokio::test]
async fn missing_required_collaborator_fails_construction() {
    init_tracing();
    let err = ExecutionManager::builder(ExecutionMode::DryRun)
        .path_resolver(Arc::new(FixedPathResolver))
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::CollaboratorMissing(_)));
}

#[tokio::test]
async fn temp_dirs_flow_through_the_active_mode() {
    init_tracing();
    let mgr = manager(ExecutionMode::DryRun, Arc::new(AtomicUsize::new(0)));

    let dir = mgr.create_temp_dir("maintenance").unwrap();
    mgr.cleanup_temp_dir(&dir).unwrap();
    mgr.cleanup_all_temp_dirs().unwrap();

    let snapshot = mgr.results().unwrap();
    assert!(snapshot
        .entries
        .iter()
        .all(|e| e.kind == ResourceKind::Filesystem));
    assert_eq!(snapshot.entries.len(), 2);
}
