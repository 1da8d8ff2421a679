//! Environment inheritance resolver
//!
//! Pure resolution of which environment variables a command group may see,
//! given the globally allowed set, the group's own declarations, and the
//! group's inheritance mode. Produces the effective allowlist plus the
//! inherited/removed/unavailable diffs used for group-level reporting.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

// ============================================================
// Inheritance mode
// ============================================================

/// Policy relating a group's allowed variables to the global allowlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InheritanceMode {
    /// Effective allowlist = global ∪ group
    #[default]
    Inherit,
    /// Effective allowlist = group only; nothing carried over implicitly
    Explicit,
    /// Effective allowlist = group only; the global list is fully withdrawn,
    /// reported as removed even when the group re-declares the same names
    Reject,
}

impl InheritanceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inherit => "inherit",
            Self::Explicit => "explicit",
            Self::Reject => "reject",
        }
    }
}

impl std::fmt::Display for InheritanceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================
// Env specs
// ============================================================

/// An import mapping `name=SOURCE_VAR`: the variable `name` is populated from
/// the source variable `SOURCE_VAR`, which must survive the inheritance step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvImport {
    /// Target name declared by the import
    pub name: String,
    /// Source environment variable the value is read from
    pub source: String,
}

impl EnvImport {
    /// Parse a `name=SOURCE` mapping. Both sides must be non-empty.
    pub fn parse(raw: &str) -> Result<Self> {
        let (name, source) = raw
            .split_once('=')
            .ok_or_else(|| Error::EnvFormat(raw.to_string()))?;
        if name.is_empty() || source.is_empty() {
            return Err(Error::EnvFormat(raw.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            source: source.to_string(),
        })
    }
}

impl std::fmt::Display for EnvImport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.name, self.source)
    }
}

/// Declared environment surface of either the global scope or one group.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvSpec {
    /// Variables allowed to pass through to executed commands
    pub allowed: Vec<String>,

    /// Import mappings (`name=SOURCE_VAR`)
    pub imports: Vec<EnvImport>,
}

impl EnvSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_allowed(mut self, allowed: Vec<String>) -> Self {
        self.allowed = allowed;
        self
    }

    pub fn with_imports(mut self, imports: Vec<EnvImport>) -> Self {
        self.imports = imports;
        self
    }

    /// Parse raw `name=SOURCE` import strings into the spec.
    pub fn with_raw_imports(mut self, raw: &[&str]) -> Result<Self> {
        self.imports = raw.iter().map(|s| EnvImport::parse(s)).collect::<Result<_>>()?;
        Ok(self)
    }
}

// ============================================================
// Detail level
// ============================================================

/// How much of the analysis the caller wants materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    Minimal,
    #[default]
    Standard,
    Detailed,
}

// ============================================================
// Analysis result
// ============================================================

/// Full inheritance picture for one group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InheritanceAnalysis {
    pub global_allowed: Vec<String>,
    pub global_imports: Vec<EnvImport>,
    pub group_allowed: Vec<String>,
    pub group_imports: Vec<EnvImport>,
    pub mode: InheritanceMode,

    /// Allowlist the group effectively sees after inheritance
    pub effective_allowed: Vec<String>,

    /// Global entries carried over that the group did not declare itself
    pub inherited: Vec<String>,

    /// Global entries withdrawn from the group
    pub removed: Vec<String>,

    /// Import targets whose source variable is absent from the effective
    /// allowlist after inheritance
    pub unavailable_imports: Vec<String>,
}

// ============================================================
// Resolution
// ============================================================

/// Resolve the effective environment allowlist for one group.
///
/// `group` may be absent; missing specs and empty lists are normalized to
/// empty collections before any comparison.
pub fn resolve(
    global: &EnvSpec,
    group: Option<&EnvSpec>,
    mode: InheritanceMode,
) -> InheritanceAnalysis {
    let empty = EnvSpec::default();
    let group = group.unwrap_or(&empty);

    let global_set: BTreeSet<&str> = global.allowed.iter().map(String::as_str).collect();
    let group_set: BTreeSet<&str> = group.allowed.iter().map(String::as_str).collect();

    let (effective, inherited, removed): (BTreeSet<&str>, Vec<String>, Vec<String>) = match mode {
        InheritanceMode::Inherit => {
            let effective: BTreeSet<&str> = global_set.union(&group_set).copied().collect();
            let inherited = global_set
                .difference(&group_set)
                .map(|s| s.to_string())
                .collect();
            (effective, inherited, Vec::new())
        }
        InheritanceMode::Explicit => {
            let removed = global_set
                .difference(&group_set)
                .map(|s| s.to_string())
                .collect();
            (group_set.clone(), Vec::new(), removed)
        }
        InheritanceMode::Reject => {
            // Rejection is explicit, not set-based: every global entry is
            // reported removed even when the group re-declares the name.
            let removed = global_set.iter().map(|s| s.to_string()).collect();
            (group_set.clone(), Vec::new(), removed)
        }
    };

    // Imports visible to the group: its own, plus global ones under Inherit.
    let mut imports: Vec<&EnvImport> = group.imports.iter().collect();
    if mode == InheritanceMode::Inherit {
        for import in &global.imports {
            if !imports.iter().any(|i| i.name == import.name) {
                imports.push(import);
            }
        }
    }

    // A source is satisfied by the effective allowlist, or by the global
    // import layer having already declared the same source variable.
    let global_sources: BTreeSet<&str> = global.imports.iter().map(|i| i.source.as_str()).collect();
    let unavailable_imports: Vec<String> = imports
        .iter()
        .filter(|i| !effective.contains(i.source.as_str()) && !global_sources.contains(i.source.as_str()))
        .map(|i| i.name.clone())
        .collect();

    debug!(
        mode = %mode,
        effective = effective.len(),
        inherited = inherited.len(),
        removed = removed.len(),
        unavailable = unavailable_imports.len(),
        "environment inheritance resolved"
    );

    InheritanceAnalysis {
        global_allowed: global.allowed.clone(),
        global_imports: global.imports.clone(),
        group_allowed: group.allowed.clone(),
        group_imports: group.imports.clone(),
        mode,
        effective_allowed: effective.into_iter().map(String::from).collect(),
        inherited,
        removed,
        unavailable_imports,
    }
}

/// Detail-gated resolution: below `Detailed` the structure is suppressed
/// entirely (absent, not empty).
pub fn resolve_at(
    detail: DetailLevel,
    global: &EnvSpec,
    group: Option<&EnvSpec>,
    mode: InheritanceMode,
) -> Option<InheritanceAnalysis> {
    if detail < DetailLevel::Detailed {
        return None;
    }
    Some(resolve(global, group, mode))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_inherit_with_empty_group() {
        let global = EnvSpec::new().with_allowed(names(&["PATH", "HOME"]));
        let analysis = resolve(&global, None, InheritanceMode::Inherit);

        assert_eq!(analysis.inherited, names(&["HOME", "PATH"]));
        assert!(analysis.removed.is_empty());
        assert!(analysis.unavailable_imports.is_empty());
        assert_eq!(analysis.effective_allowed, names(&["HOME", "PATH"]));
    }

    #[test]
    fn test_inherit_union_and_diff() {
        let global = EnvSpec::new().with_allowed(names(&["PATH", "HOME"]));
        let group = EnvSpec::new().with_allowed(names(&["HOME", "LANG"]));
        let analysis = resolve(&global, Some(&group), InheritanceMode::Inherit);

        assert_eq!(analysis.effective_allowed, names(&["HOME", "LANG", "PATH"]));
        assert_eq!(analysis.inherited, names(&["PATH"]));
        assert!(analysis.removed.is_empty());
    }

    #[test]
    fn test_explicit_mode() {
        let global = EnvSpec::new()
            .with_allowed(names(&["PATH", "HOME", "USER"]))
            .with_raw_imports(&["db_host=DB_HOST"])
            .unwrap();
        let group = EnvSpec::new()
            .with_allowed(names(&["PATH"]))
            .with_raw_imports(&["db_host=DB_HOST"])
            .unwrap();
        let analysis = resolve(&global, Some(&group), InheritanceMode::Explicit);

        assert_eq!(analysis.removed, names(&["HOME", "USER"]));
        assert!(analysis.inherited.is_empty());
        // DB_HOST is satisfied by the global import layer, so the group's
        // identical import is not unavailable.
        assert!(analysis.unavailable_imports.is_empty());
        assert_eq!(analysis.effective_allowed, names(&["PATH"]));
    }

    #[test]
    fn test_reject_reports_all_globals_removed() {
        let global = EnvSpec::new().with_allowed(names(&["PATH", "HOME"]));
        let group = EnvSpec::new().with_allowed(names(&["PATH"]));
        let analysis = resolve(&global, Some(&group), InheritanceMode::Reject);

        // PATH re-declared by the group is still reported removed
        assert_eq!(analysis.removed, names(&["HOME", "PATH"]));
        assert!(analysis.inherited.is_empty());
        assert_eq!(analysis.effective_allowed, names(&["PATH"]));
    }

    #[test]
    fn test_reject_with_empty_group() {
        let global = EnvSpec::new().with_allowed(names(&["PATH", "HOME"]));
        let analysis = resolve(&global, None, InheritanceMode::Reject);

        assert_eq!(analysis.removed, names(&["HOME", "PATH"]));
        assert!(analysis.inherited.is_empty());
        assert!(analysis.effective_allowed.is_empty());
    }

    #[test]
    fn test_unavailable_import_source() {
        let global = EnvSpec::new().with_allowed(names(&["PATH"]));
        let group = EnvSpec::new()
            .with_raw_imports(&["token=API_TOKEN"])
            .unwrap();
        let analysis = resolve(&global, Some(&group), InheritanceMode::Inherit);

        assert_eq!(analysis.unavailable_imports, names(&["token"]));
    }

    #[test]
    fn test_available_import_source() {
        let global = EnvSpec::new().with_allowed(names(&["DB_HOST", "PATH"]));
        let group = EnvSpec::new()
            .with_raw_imports(&["db_host=DB_HOST"])
            .unwrap();
        let analysis = resolve(&global, Some(&group), InheritanceMode::Inherit);

        assert!(analysis.unavailable_imports.is_empty());
    }

    #[test]
    fn test_import_parse_rejects_bad_format() {
        assert!(EnvImport::parse("no_equals").is_err());
        assert!(EnvImport::parse("=SOURCE").is_err());
        assert!(EnvImport::parse("name=").is_err());

        let ok = EnvImport::parse("db_host=DB_HOST").unwrap();
        assert_eq!(ok.name, "db_host");
        assert_eq!(ok.source, "DB_HOST");
    }

    #[test]
    fn test_detail_gate_suppresses_structure() {
        let global = EnvSpec::new().with_allowed(names(&["PATH"]));

        assert!(resolve_at(DetailLevel::Minimal, &global, None, InheritanceMode::Inherit).is_none());
        assert!(resolve_at(DetailLevel::Standard, &global, None, InheritanceMode::Inherit).is_none());
        assert!(resolve_at(DetailLevel::Detailed, &global, None, InheritanceMode::Inherit).is_some());
    }
}
