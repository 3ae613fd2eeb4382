//! Canned transport for exercising suites without a live host.
//!
//! Probes are pure functions of transport output, so a scripted transport is
//! enough to drive every suite end to end in tests. Unscripted commands come
//! back as execution errors, which is exactly how an absent binary surfaces
//! on a real host.

use std::collections::HashMap;
use std::time::Duration;

use super::error::CommandError;
use super::executor::{CommandOutput, CommandTransport};

/// Transport that replays pre-recorded command output
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: HashMap<(String, bool), CommandOutput>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a full command result
    pub fn insert(
        &mut self,
        command: impl Into<String>,
        elevated: bool,
        exit_code: i32,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) {
        self.responses.insert(
            (command.into(), elevated),
            CommandOutput {
                stdout: stdout.into(),
                stderr: stderr.into(),
                exit_code,
                duration: Duration::ZERO,
            },
        );
    }

    /// Script a successful command with the given stdout
    pub fn ok(&mut self, command: impl Into<String>, elevated: bool, stdout: impl Into<String>) {
        self.insert(command, elevated, 0, stdout, "");
    }

    /// Script a failing command with the given exit code and stderr
    pub fn fail(
        &mut self,
        command: impl Into<String>,
        elevated: bool,
        exit_code: i32,
        stderr: impl Into<String>,
    ) {
        self.insert(command, elevated, exit_code, "", stderr);
    }
}

impl CommandTransport for ScriptedTransport {
    fn execute(
        &self,
        command: &str,
        elevated: bool,
        _timeout: Duration,
    ) -> Result<CommandOutput, CommandError> {
        self.responses
            .get(&(command.to_string(), elevated))
            .cloned()
            .ok_or_else(|| CommandError::ProgramNotFound {
                program: format!("unscripted command: {command} (elevated={elevated})"),
            })
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}
