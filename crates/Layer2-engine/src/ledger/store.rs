//! Append-only resource ledger
//!
//! The only stateful, concurrency-guarded component of the engine. Entries
//! are appended under an exclusive lock and never deleted or reordered, so a
//! token stays valid for the ledger's lifetime. Readers get copies, never a
//! live-mutable view.

use super::types::{
    CommandDebugInfo, CommandToken, DebugInfo, ExecutionSummary, GroupDebugInfo, ResourceAnalysis,
    ResourceKind, ResourceOperation,
};
use parking_lot::RwLock;
use tracing::{debug, warn};
use warden_foundation::{Error, Result};

/// Overall status of the run the ledger describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Running,
    Completed,
    Failed,
}

/// Copied view of the ledger at one point in time
#[derive(Debug, Clone, serde::Serialize)]
pub struct LedgerSnapshot {
    pub entries: Vec<ResourceAnalysis>,
    pub summary: ExecutionSummary,
    pub status: RunStatus,
}

struct LedgerInner {
    entries: Vec<ResourceAnalysis>,
    status: RunStatus,
}

/// Append-only, token-addressable store of resource analyses.
pub struct ResourceLedger {
    /// Random per-instance stamp; a token from another ledger fails the
    /// generation comparison before any index is touched.
    generation: u32,
    inner: RwLock<LedgerInner>,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self {
            generation: rand::random(),
            inner: RwLock::new(LedgerInner {
                entries: Vec::new(),
                status: RunStatus::default(),
            }),
        }
    }

    /// Append an entry and return its token.
    ///
    /// The token's index is the entry's position; because entries are never
    /// deleted or reordered, the mapping holds for the ledger's lifetime.
    pub fn record(&self, entry: ResourceAnalysis) -> CommandToken {
        let mut inner = self.inner.write();
        let index = inner.entries.len();
        debug!(kind = %entry.kind, target = %entry.target, index, "ledger append");
        inner.entries.push(entry);
        CommandToken {
            generation: self.generation,
            index,
        }
    }

    /// Append a group-kind entry directly. Group entries are not amended
    /// later, so no token is issued.
    pub fn record_group(&self, group_name: &str, info: GroupDebugInfo) {
        let mut entry =
            ResourceAnalysis::new(ResourceKind::Group, ResourceOperation::Analyze, group_name)
                .for_group(group_name);
        entry.debug_info = Some(DebugInfo::Group(info));
        let mut inner = self.inner.write();
        inner.entries.push(entry);
    }

    /// Attach debug info to the command-kind entry behind `token`.
    ///
    /// Every contract violation is a distinct error: invalid token,
    /// out-of-range index, wrong entry kind, duplicate update. Nothing is
    /// silently merged.
    pub fn update_command_debug_info(
        &self,
        token: &CommandToken,
        info: CommandDebugInfo,
    ) -> Result<()> {
        if token.generation != self.generation {
            warn!(%token, "token from a different ledger");
            return Err(Error::InvalidToken(format!(
                "token {token} was not issued by this ledger"
            )));
        }

        let mut inner = self.inner.write();
        let len = inner.entries.len();
        let entry = inner
            .entries
            .get_mut(token.index)
            .ok_or(Error::TokenOutOfRange {
                index: token.index,
                len,
            })?;

        if entry.kind != ResourceKind::Command {
            return Err(Error::WrongEntryKind {
                expected: ResourceKind::Command.as_str().to_string(),
                actual: entry.kind.as_str().to_string(),
            });
        }

        if entry.debug_info.is_some() {
            return Err(Error::DuplicateDebugInfo(token.index));
        }

        entry.debug_info = Some(DebugInfo::Command(info));
        Ok(())
    }

    /// Mark the overall run status.
    pub fn set_status(&self, status: RunStatus) {
        self.inner.write().status = status;
    }

    /// Copy out the current entries and recompute the summary from the copy.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let inner = self.inner.read();
        let entries = inner.entries.clone();
        let summary = ExecutionSummary::compute(&entries);
        LedgerSnapshot {
            entries,
            summary,
            status: inner.status,
        }
    }

    /// Number of entries appended so far.
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ResourceLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::ResourceOperation;

    fn command_entry(target: &str) -> ResourceAnalysis {
        ResourceAnalysis::new(ResourceKind::Command, ResourceOperation::Execute, target)
    }

    fn debug_info() -> CommandDebugInfo {
        CommandDebugInfo {
            resolved_path: "/bin/ls".to_string(),
            expanded_args: vec!["-la".to_string()],
            env_names: vec!["PATH".to_string()],
            working_dir: None,
        }
    }

    #[test]
    fn test_token_stability_across_appends() {
        let ledger = ResourceLedger::new();
        let token = ledger.record(command_entry("first"));

        for i in 0..50 {
            ledger.record(command_entry(&format!("later-{i}")));
        }

        ledger.update_command_debug_info(&token, debug_info()).unwrap();
        let snapshot = ledger.snapshot();
        assert_eq!(snapshot.entries[0].target, "first");
        assert!(snapshot.entries[0].debug_info.is_some());
        assert_eq!(snapshot.entries.len(), 51);
    }

    #[test]
    fn test_duplicate_debug_info_is_rejected() {
        let ledger = ResourceLedger::new();
        let token = ledger.record(command_entry("ls"));

        ledger.update_command_debug_info(&token, debug_info()).unwrap();
        let err = ledger
            .update_command_debug_info(&token, debug_info())
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateDebugInfo(0)));

        // First attachment untouched
        let snapshot = ledger.snapshot();
        match snapshot.entries[0].debug_info.as_ref().unwrap() {
            DebugInfo::Command(info) => assert_eq!(info.resolved_path, "/bin/ls"),
            other => panic!("unexpected debug info: {other:?}"),
        }
    }

    #[test]
    fn test_foreign_token_is_invalid() {
        let ledger_a = ResourceLedger::new();
        let ledger_b = ResourceLedger::new();
        let token = ledger_a.record(command_entry("ls"));

        let err = ledger_b
            .update_command_debug_info(&token, debug_info())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidToken(_)));
    }

    #[test]
    fn test_wrong_kind_is_rejected() {
        let ledger = ResourceLedger::new();
        let token = ledger.record(ResourceAnalysis::new(
            ResourceKind::Filesystem,
            ResourceOperation::Create,
            "/tmp/x",
        ));

        let err = ledger
            .update_command_debug_info(&token, debug_info())
            .unwrap_err();
        assert!(matches!(err, Error::WrongEntryKind { .. }));
    }

    #[test]
    fn test_group_entries_take_no_token() {
        let ledger = ResourceLedger::new();
        ledger.record_group(
            "maintenance",
            GroupDebugInfo {
                description: Some("nightly".to_string()),
                inheritance: None,
            },
        );

        let snapshot = ledger.snapshot();
        assert_eq!(snapshot.entries.len(), 1);
        assert_eq!(snapshot.entries[0].kind, ResourceKind::Group);
        assert!(snapshot.entries[0].debug_info.is_some());
    }

    #[test]
    fn test_snapshot_is_isolated() {
        let ledger = ResourceLedger::new();
        ledger.record(command_entry("ls"));
        let snapshot = ledger.snapshot();

        ledger.record(command_entry("pwd"));
        assert_eq!(snapshot.entries.len(), 1);
        assert_eq!(ledger.snapshot().entries.len(), 2);
    }

    #[test]
    fn test_concurrent_appends_and_reads() {
        use std::sync::Arc;
        let ledger = Arc::new(ResourceLedger::new());
        let mut handles = Vec::new();

        for t in 0..4 {
            let ledger = Arc::clone(&ledger);
            handles.push(std::thread::spawn(move || {
                for i in 0..25 {
                    let token = ledger.record(command_entry(&format!("t{t}-{i}")));
                    // Every issued token must stay resolvable
                    ledger
                        .update_command_debug_info(&token, debug_info())
                        .unwrap();
                    let _ = ledger.snapshot();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = ledger.snapshot();
        assert_eq!(snapshot.entries.len(), 100);
        assert!(snapshot.entries.iter().all(|e| e.debug_info.is_some()));
    }
}
