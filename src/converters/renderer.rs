//! Running external synthesizers.

use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("'{program}' exited with {status}")]
    RendererFailed { program: String, status: ExitStatus },
    #[error("failed to remove score file: {0}")]
    RemoveScore(#[source] io::Error),
}

/// Runs `program` with `args` and waits for it to exit.
///
/// A non-zero exit status is an error.
pub fn run(program: &str, args: &[String]) -> Result<(), RenderError> {
    info!(program, ?args, "starting renderer");
    let status = Command::new(program)
        .args(args)
        .spawn()
        .and_then(|mut child| child.wait())
        .map_err(|source| RenderError::Spawn {
            program: program.to_string(),
            source,
        })?;

    if status.success() {
        Ok(())
    } else {
        warn!(program, %status, "renderer failed");
        Err(RenderError::RendererFailed {
            program: program.to_string(),
            status,
        })
    }
}

/// Runs the renderer, then deletes `score_path` if asked to, whatever the
/// renderer's outcome. A render failure takes precedence over a removal failure.
pub fn run_and_clean_up(
    program: &str,
    args: &[String],
    score_path: &Path,
    remove_score_file: bool,
) -> Result<(), RenderError> {
    let result = run(program, args);
    if remove_score_file {
        let removed = std::fs::remove_file(score_path).map_err(RenderError::RemoveScore);
        result?;
        removed?;
        return Ok(());
    }
    result
}
