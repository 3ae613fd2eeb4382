//! Service state probes with init-system dispatch.
//!
//! systemd exposes uniform running/enabled queries. SysV-style init has no
//! service-manager notion of "enabled", so the probe falls back to inspecting
//! runlevel start symlinks; finding none is an indeterminate outcome, kept
//! distinct from an explicit "disabled".

use crate::host::{CommandRunner, InitSystem};

use super::ProbeError;

/// Boot-enablement state of a service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnabledState {
    Enabled,
    Disabled,
    /// The probe found no evidence either way (e.g. no runlevel symlinks
    /// at all on a SysV host)
    Indeterminate,
}

impl std::fmt::Display for EnabledState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
            Self::Indeterminate => "indeterminate",
        };
        write!(f, "{s}")
    }
}

/// Observed service state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceState {
    pub is_running: bool,
    pub is_enabled: EnabledState,
}

/// Probe running/enabled state of a service, dispatching on the host's init
/// system (resolved once per host, never per call).
pub fn state(
    runner: &dyn CommandRunner,
    name: &str,
    init: InitSystem,
) -> Result<ServiceState, ProbeError> {
    match init {
        InitSystem::Systemd => systemd_state(runner, name),
        InitSystem::SysV => sysv_state(runner, name),
    }
}

fn systemd_state(runner: &dyn CommandRunner, name: &str) -> Result<ServiceState, ProbeError> {
    let active = runner.run(&format!("systemctl is-active {name}"))?;
    let is_running = active.succeeded() && active.stdout_trimmed() == "active";

    let enabled = runner.run(&format!("systemctl is-enabled {name}"))?;
    let is_enabled = match enabled.stdout_trimmed() {
        "enabled" | "enabled-runtime" | "static" => EnabledState::Enabled,
        "disabled" => EnabledState::Disabled,
        _ => EnabledState::Indeterminate,
    };

    Ok(ServiceState {
        is_running,
        is_enabled,
    })
}

fn sysv_state(runner: &dyn CommandRunner, name: &str) -> Result<ServiceState, ProbeError> {
    let status = runner.run(&format!("service {name} status"))?;
    let is_running = status.succeeded();

    let start_links = runlevel_links(runner, name)?;
    let is_enabled = if !start_links.is_empty() {
        EnabledState::Enabled
    } else {
        let kill = runner.run(&format!("find /etc/rc?.d -name K??{name}"))?;
        if kill.succeeded() && !kill.stdout_trimmed().is_empty() {
            EnabledState::Disabled
        } else {
            EnabledState::Indeterminate
        }
    };

    Ok(ServiceState {
        is_running,
        is_enabled,
    })
}

/// Runlevel start symlinks (`S??<name>`) for a SysV-managed service.
pub fn runlevel_links(runner: &dyn CommandRunner, name: &str) -> Result<Vec<String>, ProbeError> {
    let command = format!("find /etc/rc?.d -name S??{name}");
    let output = runner.run(&command)?;
    if !output.succeeded() {
        return Err(ProbeError::from_output(&command, &output));
    }
    Ok(output
        .stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}
