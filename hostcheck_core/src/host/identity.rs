//! Host identity facts and init-system dispatch.
//!
//! Identity is probed exactly once per host handle and cached; platform
//! branches key on these fixed facts, never on per-call detection.

use crate::probes::ProbeError;

use super::{CommandRunner, Host};

/// Init system family governing how service state is queried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InitSystem {
    /// systemd: uniform is-active / is-enabled queries
    Systemd,
    /// SysV-style init: "enabled" has no service-manager query and falls back
    /// to runlevel symlink inspection
    SysV,
}

impl InitSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Systemd => "systemd",
            Self::SysV => "sysv",
        }
    }
}

impl std::fmt::Display for InitSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Facts about the target host resolved once per session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostIdentity {
    /// OS release codename (e.g. "trusty", "xenial")
    pub codename: String,
    /// Detected init system family
    pub init: InitSystem,
}

impl Host {
    /// Identity facts for this host, probed on first use and cached.
    pub fn identity(&self) -> Result<HostIdentity, ProbeError> {
        if let Some(identity) = self.identity.borrow().as_ref() {
            return Ok(identity.clone());
        }

        let identity = HostIdentity {
            codename: probe_codename(self)?,
            init: probe_init_system(self)?,
        };
        log::info!(
            "host [{}] identity: codename={} init={}",
            self.role(),
            identity.codename,
            identity.init
        );

        *self.identity.borrow_mut() = Some(identity.clone());
        Ok(identity)
    }
}

fn probe_codename(host: &Host) -> Result<String, ProbeError> {
    let lsb = host.run("lsb_release -sc");
    if let Ok(output) = lsb {
        if output.succeeded() {
            let codename = output.stdout_trimmed().trim().to_string();
            if !codename.is_empty() {
                return Ok(codename);
            }
        }
    }

    let output = host.run("cat /etc/os-release")?;
    if !output.succeeded() {
        return Err(ProbeError::Unreadable {
            path: "/etc/os-release".to_string(),
            reason: output.stderr.trim().to_string(),
        });
    }

    parse_os_release_codename(&output.stdout).ok_or_else(|| ProbeError::UnexpectedOutput {
        what: "OS codename".to_string(),
        output: output.stdout.clone(),
    })
}

fn parse_os_release_codename(os_release: &str) -> Option<String> {
    for key in ["VERSION_CODENAME", "UBUNTU_CODENAME"] {
        for line in os_release.lines() {
            if let Some(value) = line.strip_prefix(&format!("{key}=")) {
                let value = value.trim().trim_matches('"');
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

fn probe_init_system(host: &Host) -> Result<InitSystem, ProbeError> {
    let output = host.run("test -d /run/systemd/system")?;
    if output.succeeded() {
        Ok(InitSystem::Systemd)
    } else {
        Ok(InitSystem::SysV)
    }
}
