//! Command transports with security controls for host state collection

use std::collections::HashSet;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use super::error::CommandError;

/// Output of one probe command execution
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration: Duration,
}

impl CommandOutput {
    /// Whether the command exited zero
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }

    /// Stdout with the trailing newline stripped
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim_end_matches('\n')
    }
}

/// Executes a probe command line against a concrete host.
///
/// Implementations carry the connection mechanics; elevation wrapping and
/// timeout enforcement are uniform across them. A single execution per call,
/// no retries: a transient transport failure surfaces as an error.
pub trait CommandTransport {
    fn execute(
        &self,
        command: &str,
        elevated: bool,
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError>;

    /// Human-readable target description for logging and reports
    fn describe(&self) -> String;
}

/// Allowlist of read-only inspection programs.
///
/// Probes never mutate host state; the allowlist is checked against the first
/// token of every command line before it reaches a transport.
#[derive(Debug, Clone)]
pub struct ProbeAllowlist {
    allowed: HashSet<String>,
}

impl ProbeAllowlist {
    /// Create an empty allowlist - must be configured before use
    pub fn new() -> Self {
        Self {
            allowed: HashSet::new(),
        }
    }

    /// Allowlist covering the inspection programs the compliance suites use
    pub fn standard() -> Self {
        let mut list = Self::new();
        list.allow_programs(&[
            "dpkg-query",  // Package database queries
            "dpkg",        // Package listing (pattern-capable)
            "apt-mark",    // Manual-install markers
            "apt-get",     // Dry-run autoremove check
            "stat",        // File metadata
            "cat",         // File content
            "readlink",    // Symlink targets
            "find",        // Runlevel symlink discovery
            "test",        // Path existence checks
            "sysctl",      // Kernel parameters
            "systemctl",   // systemd service state
            "service",     // SysV service state
            "aa-status",   // AppArmor profile status
            "uname",       // Running kernel identity
            "lsb_release", // OS codename
            "paxtest",     // PaX regression gauntlet
            "paxctl",      // PaX flags on binaries
        ]);
        list
    }

    /// Add a program to the allowlist
    pub fn allow_program(&mut self, program: impl Into<String>) {
        self.allowed.insert(program.into());
    }

    /// Add multiple programs to the allowlist
    pub fn allow_programs(&mut self, programs: &[&str]) {
        for program in programs {
            self.allowed.insert(program.to_string());
        }
    }

    /// Check whether a full command line starts with an allowed program
    pub fn permits(&self, command: &str) -> bool {
        command
            .split_whitespace()
            .next()
            .is_some_and(|program| self.allowed.contains(program))
    }
}

impl Default for ProbeAllowlist {
    fn default() -> Self {
        Self::standard()
    }
}

/// Quote a string for safe interpolation into a POSIX shell command line
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

fn spawn_and_wait(
    mut cmd: Command,
    program: &str,
    timeout: Duration,
) -> Result<CommandOutput, CommandError> {
    let start = Instant::now();

    cmd.env_clear()
        .env("PATH", "/usr/bin:/bin:/usr/sbin:/sbin")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            CommandError::ProgramNotFound {
                program: program.to_string(),
            }
        } else if e.kind() == std::io::ErrorKind::PermissionDenied {
            CommandError::PermissionDenied {
                program: program.to_string(),
            }
        } else {
            CommandError::ExecutionFailed {
                program: program.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    let status = wait_timeout::ChildExt::wait_timeout(&mut child, timeout).map_err(|e| {
        CommandError::ExecutionFailed {
            program: program.to_string(),
            reason: e.to_string(),
        }
    })?;

    match status {
        Some(status) => {
            let output = child
                .wait_with_output()
                .map_err(|e| CommandError::ExecutionFailed {
                    program: program.to_string(),
                    reason: e.to_string(),
                })?;

            Ok(CommandOutput {
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                exit_code: status.code().unwrap_or(-1),
                duration: start.elapsed(),
            })
        }
        None => {
            let _ = child.kill();
            Err(CommandError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            })
        }
    }
}

/// Runs probe commands on the machine hosting the suite itself
#[derive(Debug, Clone, Default)]
pub struct LocalTransport;

impl LocalTransport {
    pub fn new() -> Self {
        Self
    }
}

impl CommandTransport for LocalTransport {
    fn execute(
        &self,
        command: &str,
        elevated: bool,
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError> {
        let mut cmd;
        let program;
        if elevated {
            // -n: never prompt; elevation must already be provisioned
            program = "sudo";
            cmd = Command::new(program);
            cmd.args(["-n", "--", "sh", "-c", command]);
        } else {
            program = "sh";
            cmd = Command::new(program);
            cmd.args(["-c", command]);
        }
        spawn_and_wait(cmd, program, timeout)
    }

    fn describe(&self) -> String {
        "local".to_string()
    }
}

/// Runs probe commands over an existing SSH trust relationship.
///
/// The SSH transport is deliberately thin: it hands the command line to the
/// remote login shell and maps the client's own failure exit code (255) to a
/// hard unreachable error rather than a probe result.
#[derive(Debug, Clone)]
pub struct SshTransport {
    user: Option<String>,
    host: String,
    port: Option<u16>,
}

impl SshTransport {
    pub fn new(user: Option<String>, host: impl Into<String>, port: Option<u16>) -> Self {
        Self {
            user,
            host: host.into(),
            port,
        }
    }

    fn destination(&self) -> String {
        match &self.user {
            Some(user) => format!("{}@{}", user, self.host),
            None => self.host.clone(),
        }
    }
}

impl CommandTransport for SshTransport {
    fn execute(
        &self,
        command: &str,
        elevated: bool,
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError> {
        let remote = if elevated {
            format!("sudo -n -- sh -c {}", shell_quote(command))
        } else {
            command.to_string()
        };

        let mut cmd = Command::new("ssh");
        cmd.arg("-o").arg("BatchMode=yes");
        if let Some(port) = self.port {
            cmd.arg("-p").arg(port.to_string());
        }
        cmd.arg(self.destination());
        cmd.arg(remote);

        let output = spawn_and_wait(cmd, "ssh", timeout)?;

        // ssh reserves 255 for its own connection failures
        if output.exit_code == 255 {
            return Err(CommandError::HostUnreachable {
                detail: output.stderr.trim().to_string(),
            });
        }

        Ok(output)
    }

    fn describe(&self) -> String {
        format!("ssh://{}", self.destination())
    }
}
