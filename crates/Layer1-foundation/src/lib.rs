//! # warden-foundation
//!
//! Foundation layer for Warden:
//! - Error: central error taxonomy shared by every layer
//! - Risk: ordered-priority command risk classification
//! - Envres: environment allowlist inheritance resolution
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Execution Manager (mode facade)                        │
//! │  ├── Real Executor ── fail-closed risk ceiling          │
//! │  └── Simulation Executor ── resource ledger             │
//! │                     │                                   │
//! │          ┌─────────┴─────────┐                          │
//! │          ▼                   ▼                          │
//! │   Risk Classifier     Env Inheritance Resolver          │
//! │   (this crate)        (this crate)                      │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod envres;
pub mod error;
pub mod risk;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Risk (classification)
// ============================================================================
pub use risk::{classifier, AnalysisOptions, RiskAssessment, RiskClassifier, RiskLevel};

// ============================================================================
// Environment inheritance
// ============================================================================
pub use envres::{
    resolve as resolve_inheritance,
    resolve_at as resolve_inheritance_at,
    DetailLevel,
    EnvImport,
    EnvSpec,
    InheritanceAnalysis,
    InheritanceMode,
};
