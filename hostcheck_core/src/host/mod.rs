//! # Host handle
//!
//! One `Host` per test session and target: a role name, a command transport,
//! and the host-identity facts probed once and cached. Tests never mutate the
//! host; every command issued through the handle is vetted against the
//! read-only probe allowlist.

pub mod error;
pub mod executor;
pub mod identity;
pub mod scripted;

use std::cell::RefCell;
use std::time::Duration;

pub use error::CommandError;
pub use executor::{
    shell_quote, CommandOutput, CommandTransport, LocalTransport, ProbeAllowlist, SshTransport,
};
pub use identity::{HostIdentity, InitSystem};
pub use scripted::ScriptedTransport;

const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Uniform interface for issuing one read-only inspection command.
///
/// Implemented by `Host` (unprivileged) and `Elevated` (sudo scope), so a
/// probe works identically in either privilege context.
pub trait CommandRunner {
    fn run(&self, command: &str) -> Result<CommandOutput, CommandError>;
}

/// Handle to one reachable machine under test
pub struct Host {
    role: String,
    transport: Box<dyn CommandTransport>,
    allowlist: ProbeAllowlist,
    timeout: Duration,
    identity: RefCell<Option<HostIdentity>>,
}

impl Host {
    /// Create a host handle with the standard probe allowlist
    pub fn new(role: impl Into<String>, transport: Box<dyn CommandTransport>) -> Self {
        Self {
            role: role.into(),
            transport,
            allowlist: ProbeAllowlist::standard(),
            timeout: DEFAULT_PROBE_TIMEOUT,
            identity: RefCell::new(None),
        }
    }

    /// Replace the probe allowlist
    pub fn with_allowlist(mut self, allowlist: ProbeAllowlist) -> Self {
        self.allowlist = allowlist;
        self
    }

    /// Replace the per-command timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Declared inventory role of this host (e.g. "app-staging")
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Transport target description for logging and reports
    pub fn target(&self) -> String {
        self.transport.describe()
    }

    /// Enter a scoped elevated (sudo) context.
    ///
    /// Elevation exists only for the lifetime of the returned guard; commands
    /// issued through it are wrapped individually, so no elevated state can
    /// outlive the scope regardless of outcome.
    pub fn sudo(&self) -> Elevated<'_> {
        Elevated { host: self }
    }

    fn dispatch(&self, command: &str, elevated: bool) -> Result<CommandOutput, CommandError> {
        if !self.allowlist.permits(command) {
            let program = command
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_string();
            return Err(CommandError::ProbeNotAllowed { program });
        }

        log::debug!(
            "probe [{}] elevated={} command={:?}",
            self.role,
            elevated,
            command
        );
        let output = self.transport.execute(command, elevated, self.timeout)?;
        log::debug!(
            "probe [{}] rc={} stdout_bytes={} stderr_bytes={}",
            self.role,
            output.exit_code,
            output.stdout.len(),
            output.stderr.len()
        );
        Ok(output)
    }
}

impl CommandRunner for Host {
    fn run(&self, command: &str) -> Result<CommandOutput, CommandError> {
        self.dispatch(command, false)
    }
}

/// Scoped privilege-elevation wrapper around a `Host`
pub struct Elevated<'h> {
    host: &'h Host,
}

impl<'h> Elevated<'h> {
    /// The host this scope elevates
    pub fn host(&self) -> &'h Host {
        self.host
    }
}

impl CommandRunner for Elevated<'_> {
    fn run(&self, command: &str) -> Result<CommandOutput, CommandError> {
        self.host.dispatch(command, true)
    }
}
