//! # Read-only host probes
//!
//! Each probe issues one inspection command through a `CommandRunner` and
//! normalizes its output. Probes never mutate host state and carry no retry
//! logic: a probe that cannot run is a hard failure.

pub mod error;
pub mod file;
pub mod package;
pub mod service;
pub mod sysctl;

pub use error::ProbeError;
pub use file::{FileKind, FileState};
pub use service::{EnabledState, ServiceState};
pub use sysctl::SysctlValue;

use crate::host::CommandRunner;

/// Run a command and return trimmed stdout, failing on non-zero exit.
pub fn check_output(runner: &dyn CommandRunner, command: &str) -> Result<String, ProbeError> {
    let output = runner.run(command)?;
    if !output.succeeded() {
        return Err(ProbeError::from_output(command, &output));
    }
    Ok(output.stdout_trimmed().to_string())
}

/// Run a command and report whether it exited zero.
pub fn succeeds(runner: &dyn CommandRunner, command: &str) -> Result<bool, ProbeError> {
    Ok(runner.run(command)?.succeeded())
}
