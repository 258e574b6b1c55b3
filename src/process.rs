use std::{
    ffi::OsStr,
    io,
    process::{Command, ExitStatus, Output},
};

use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Failed to launch `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("`{program}` failed with {status}:\n{diagnostics}")]
    Failed {
        program: String,
        status: ExitStatus,
        diagnostics: String,
    },
}

impl ToolError {
    /// Whether the program could not be found on this host.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Spawn { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

/// Runs a command to completion and returns its standard output.
///
/// Arguments are never logged as some tools are passed passwords.
pub fn run(command: &mut Command) -> Result<Vec<u8>, ToolError> {
    let program = program_name(command.get_program());
    debug!("Running `{program}`");
    let output = command.output().map_err(|source| ToolError::Spawn {
        program: program.clone(),
        source,
    })?;
    check(program, output)
}

pub async fn run_async(command: &mut tokio::process::Command) -> Result<Vec<u8>, ToolError> {
    let program = program_name(command.as_std().get_program());
    debug!("Running `{program}`");
    let output = command.output().await.map_err(|source| ToolError::Spawn {
        program: program.clone(),
        source,
    })?;
    check(program, output)
}

fn program_name(program: &OsStr) -> String {
    program.to_string_lossy().into_owned()
}

fn check(program: String, output: Output) -> Result<Vec<u8>, ToolError> {
    if output.status.success() {
        return Ok(output.stdout);
    }

    let diagnostics = [&output.stderr, &output.stdout]
        .into_iter()
        .map(|stream| String::from_utf8_lossy(stream).trim().to_owned())
        .filter(|stream| !stream.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    error!(status = %output.status, "`{program}` failed:\n{diagnostics}");

    Err(ToolError::Failed {
        program,
        status: output.status,
        diagnostics,
    })
}
