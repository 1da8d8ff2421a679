//! Risk classifier - ordered rule table with fixed priorities
//!
//! Each rule yields (risk, reason, fixed priority) and the final verdict is
//! the highest-priority match. A lower-priority rule can never downgrade a
//! higher-priority finding:
//!
//! 1. setuid/setgid bit on the resolved binary (incl. symlink-depth overflow)
//! 2. dangerous literal/pattern match (fixed table)
//! 3. privilege requirement (flag, sudo-equivalent binary, run-as declaration)
//! 4. baseline (directory-listing class resolves to `low`, everything else `none`)

use super::{AnalysisOptions, RiskAssessment, RiskLevel};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

// Rule priorities. Higher wins; ties resolve to the earlier table entry.
const PRIORITY_SETUID: u8 = 40;
const PRIORITY_PATTERN: u8 = 30;
const PRIORITY_PRIVILEGE: u8 = 20;
const PRIORITY_BASELINE: u8 = 10;

/// Binaries that elevate privileges for the invoked command.
const SUDO_EQUIVALENTS: &[&str] = &["sudo", "doas", "su", "pkexec"];

/// Read-only commands that still disclose filesystem structure.
const LISTING_COMMANDS: &[&str] = &["ls", "dir", "find", "tree", "du", "df", "stat"];

// ============================================================
// Dangerous pattern table
// ============================================================

/// One entry in the fixed dangerous-pattern table.
struct DangerousPattern {
    name: &'static str,
    regex: Regex,
    level: RiskLevel,
    reason: &'static str,
}

fn dangerous_patterns() -> Vec<DangerousPattern> {
    // Patterns match against "<binary basename> <args...>". An invalid regex
    // would silently drop a security rule, so compilation failures abort
    // table construction instead of being skipped.
    let table: &[(&str, &str, RiskLevel, &str)] = &[
        (
            "recursive-delete",
            r"^rm\s+(\S+\s+)*(-[a-zA-Z]*r[a-zA-Z]*|--recursive)(\s|$)",
            RiskLevel::High,
            "Recursive file removal - destructive and irreversible",
        ),
        (
            "disk-device-write",
            r"(^dd\s.*\bof=/dev/|^mkfs(\.\S+)?(\s|$)|^shred\s.*/dev/)",
            RiskLevel::High,
            "Low-level disk device access",
        ),
        (
            "permissive-chmod",
            r"^chmod\s+(\S+\s+)*(0?777|a\+rwx|\+s)(\s|$)",
            RiskLevel::Medium,
            "Overly permissive file mode change",
        ),
        (
            "ownership-change",
            r"^chown\s+(\S+\s+)*(root|0)(:|\s|$)",
            RiskLevel::Medium,
            "Privileged file ownership change",
        ),
        (
            "raw-network-tool",
            r"^(nc|ncat|netcat|socat|telnet)(\s|$)",
            RiskLevel::Medium,
            "Raw network tool invocation",
        ),
    ];

    table
        .iter()
        .map(|(name, pattern, level, reason)| DangerousPattern {
            name,
            regex: Regex::new(pattern)
                .unwrap_or_else(|e| panic!("dangerous pattern '{name}' failed to compile: {e}")),
            level: *level,
            reason,
        })
        .collect()
}

// ============================================================
// Classifier
// ============================================================

/// Matched rule candidate before priority resolution.
struct RuleMatch {
    priority: u8,
    level: RiskLevel,
    rule: &'static str,
    reason: String,
}

/// Command risk classifier with a pre-compiled pattern table.
pub struct RiskClassifier {
    patterns: Vec<DangerousPattern>,
}

static CLASSIFIER: OnceLock<RiskClassifier> = OnceLock::new();

/// Shared classifier with the fixed rule table.
pub fn classifier() -> &'static RiskClassifier {
    CLASSIFIER.get_or_init(RiskClassifier::new)
}

impl RiskClassifier {
    pub fn new() -> Self {
        Self {
            patterns: dangerous_patterns(),
        }
    }

    /// Classify a resolved binary with its arguments.
    ///
    /// Pure over its inputs except for metadata reads on `resolved` needed
    /// to inspect mode bits.
    pub fn classify(
        &self,
        resolved: &Path,
        args: &[String],
        options: &AnalysisOptions,
    ) -> RiskAssessment {
        let mut best: Option<RuleMatch> = None;
        let mut consider = |candidate: RuleMatch| {
            let replace = match &best {
                Some(current) => candidate.priority > current.priority,
                None => true,
            };
            if replace {
                best = Some(candidate);
            }
        };

        // Rule 1: binary mode bits (and the symlink bound guarding them)
        if let Some(m) = self.inspect_binary(resolved, options) {
            consider(m);
        }

        // Rule 2: dangerous pattern table
        let line = command_line(resolved, args);
        for pattern in &self.patterns {
            if pattern.regex.is_match(&line) {
                debug!(rule = pattern.name, command = %line, "dangerous pattern matched");
                consider(RuleMatch {
                    priority: PRIORITY_PATTERN,
                    level: pattern.level,
                    rule: pattern.name,
                    reason: pattern.reason.to_string(),
                });
                break; // table entries share a priority; first match stands
            }
        }

        // Rule 3: privilege requirement
        if let Some(m) = privilege_requirement(resolved, options) {
            consider(m);
        }

        // Rule 4: baseline
        let base = basename(resolved);
        if LISTING_COMMANDS.contains(&base.as_str()) {
            consider(RuleMatch {
                priority: PRIORITY_BASELINE,
                level: RiskLevel::Low,
                rule: "directory-listing",
                reason: "Directory listing discloses filesystem structure".to_string(),
            });
        }

        match best {
            Some(m) => RiskAssessment {
                level: m.level,
                rule: Some(m.rule.to_string()),
                reason: m.reason,
            },
            None => RiskAssessment::baseline(RiskLevel::None, "No risk factors matched"),
        }
    }

    /// Resolve symlinks up to the configured bound, then inspect mode bits.
    fn inspect_binary(&self, resolved: &Path, options: &AnalysisOptions) -> Option<RuleMatch> {
        let target = match follow_symlinks(resolved, options.max_symlink_depth) {
            Ok(target) => target,
            Err(depth) => {
                return Some(RuleMatch {
                    priority: PRIORITY_SETUID,
                    level: RiskLevel::High,
                    rule: "symlink-depth",
                    reason: format!("symlink depth exceeded ({depth} links followed)"),
                });
            }
        };

        if has_setid_bit(&target) {
            return Some(RuleMatch {
                priority: PRIORITY_SETUID,
                level: RiskLevel::High,
                rule: "setuid-binary",
                reason: "setuid binary - executes with elevated file-owner privileges".to_string(),
            });
        }

        None
    }
}

impl Default for RiskClassifier {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================
// Rule helpers
// ============================================================

fn privilege_requirement(resolved: &Path, options: &AnalysisOptions) -> Option<RuleMatch> {
    let base = basename(resolved);

    let reason = if options.privileged {
        "Command is marked as privileged"
    } else if SUDO_EQUIVALENTS.contains(&base.as_str()) {
        "Invokes a privilege elevation binary"
    } else if options.has_run_as {
        "Command declares a run-as user or group"
    } else {
        return None;
    };

    Some(RuleMatch {
        priority: PRIORITY_PRIVILEGE,
        level: RiskLevel::Medium,
        rule: "privilege-requirement",
        reason: reason.to_string(),
    })
}

/// Rendered "<basename> <args...>" line the pattern table matches against.
fn command_line(resolved: &Path, args: &[String]) -> String {
    let base = basename(resolved);
    if args.is_empty() {
        base
    } else {
        format!("{} {}", base, args.join(" "))
    }
}

fn basename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Follow a symlink chain up to `max_depth` links. Returns the final target,
/// or Err(depth) when the bound is exceeded.
fn follow_symlinks(path: &Path, max_depth: usize) -> std::result::Result<PathBuf, usize> {
    let mut current = path.to_path_buf();
    for _ in 0..=max_depth {
        match std::fs::read_link(&current) {
            Ok(target) => {
                current = if target.is_absolute() {
                    target
                } else {
                    current.parent().unwrap_or(Path::new("/")).join(target)
                };
            }
            // Not a symlink (or unreadable): chain ends here
            Err(_) => return Ok(current),
        }
    }
    Err(max_depth)
}

#[cfg(unix)]
fn has_setid_bit(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    match std::fs::metadata(path) {
        Ok(meta) => meta.permissions().mode() & 0o6000 != 0,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn has_setid_bit(_path: &Path) -> bool {
    false
}
