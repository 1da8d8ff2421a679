//! Executors
//!
//! Two implementations of the same controller interface:
//! - `real` - delegates to the live collaborators, fail-closed on risk
//! - `simulation` - records what would happen, never touches the system
//!
//! Validation, path resolution, and classification are shared so that a
//! simulated run predicts exactly what the real run would do or refuse.

pub mod real;
pub mod simulation;
pub mod r#trait;

pub use r#trait::{CommandExecution, ExecutionMode, ResourceController};
pub use real::RealExecutor;
pub use simulation::SimulationExecutor;

use crate::collaborator::PathResolver;
use crate::command::{Command, CommandGroup, ExecutionPhase};
use std::path::PathBuf;
use tracing::debug;
use warden_foundation::{classifier, Error, Result, RiskAssessment};

/// Output of the mode-independent front half of `execute_command`.
pub(crate) struct PreparedCommand {
    pub resolved: PathBuf,
    /// Shell-quoted resolved command line, used as the ledger target.
    pub target: String,
    pub assessment: RiskAssessment,
    pub phase: ExecutionPhase,
}

/// Validate, resolve, and classify a command. Identical across modes.
///
/// Validation failures surface before any ledger write; a path resolution
/// failure fails the whole call rather than just the risk step.
pub(crate) fn prepare_command(
    resolver: &dyn PathResolver,
    command: &Command,
    group: &CommandGroup,
) -> Result<PreparedCommand> {
    let phase = ExecutionPhase::Received;

    command.validate()?;
    group.validate()?;
    let phase = phase.advance(ExecutionPhase::Validated)?;

    let resolved = resolver.resolve(&command.binary)?;
    let assessment = classifier().classify(&resolved, &command.args, &command.analysis_options());
    let phase = phase.advance(ExecutionPhase::Classified)?;

    debug!(
        command = %command.name,
        group = %group.name,
        binary = %resolved.display(),
        risk = %assessment.level,
        "command classified"
    );

    let target = render_command_line(&resolved, &command.args)?;
    Ok(PreparedCommand {
        resolved,
        target,
        assessment,
        phase,
    })
}

/// Render a resolved command line as an unambiguous shell string.
pub(crate) fn render_command_line(resolved: &std::path::Path, args: &[String]) -> Result<String> {
    let mut words: Vec<&str> = Vec::with_capacity(args.len() + 1);
    let binary = resolved
        .to_str()
        .ok_or_else(|| Error::Validation(format!("non-UTF-8 path: {}", resolved.display())))?;
    words.push(binary);
    words.extend(args.iter().map(String::as_str));
    shlex::try_join(words)
        .map_err(|e| Error::Internal(format!("failed to render command line: {e}")))
}
