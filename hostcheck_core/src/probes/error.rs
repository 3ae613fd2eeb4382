//! Probe error taxonomy.
//!
//! A probe that cannot run is a compliance signal in its own right: these
//! errors surface as hard case failures, never silent skips.

use crate::host::CommandError;

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// The underlying command could not be executed at all
    #[error(transparent)]
    Command(#[from] CommandError),

    /// The command ran but exited non-zero where success was required
    #[error("Command failed (rc={exit_code}): {command}: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// The inspected path does not exist
    #[error("No such file: {path}")]
    Missing { path: String },

    /// The inspected path exists but could not be read
    #[error("Unreadable: {path}: {reason}")]
    Unreadable { path: String, reason: String },

    /// Probe output did not match the fixed format the probe expects
    #[error("Unexpected output for {what}: {output:?}")]
    UnexpectedOutput { what: String, output: String },

    /// An expectation pattern failed to compile
    #[error("Invalid expectation pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl ProbeError {
    /// Fail out of a non-zero exit, capturing diagnostics
    pub fn from_output(command: &str, output: &crate::host::CommandOutput) -> Self {
        Self::CommandFailed {
            command: command.to_string(),
            exit_code: output.exit_code,
            stderr: output.stderr.trim().to_string(),
        }
    }
}
