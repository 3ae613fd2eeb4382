//! # Inventory
//!
//! Resolves a named host role (e.g. the staging "app" role) to a concrete
//! connection target. Producing the inventory is the provisioning system's
//! responsibility; this module only consumes it.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::host::{CommandTransport, Host, LocalTransport, SshTransport};

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Failed to read inventory '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse inventory '{path}': {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("Unknown host role: {role}")]
    UnknownRole { role: String },

    #[error("Malformed target '{target}' for role '{role}'")]
    MalformedTarget { role: String, target: String },
}

/// Concrete connection target for one host role
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Local,
    Ssh {
        user: Option<String>,
        host: String,
        port: Option<u16>,
    },
}

impl Target {
    /// Parse a target string: `local`, or `ssh://[user@]host[:port]`
    pub fn parse(s: &str) -> Option<Self> {
        if s == "local" {
            return Some(Self::Local);
        }

        let rest = s.strip_prefix("ssh://")?;
        if rest.is_empty() {
            return None;
        }

        let (user, hostport) = match rest.split_once('@') {
            Some((user, hostport)) if !user.is_empty() => (Some(user.to_string()), hostport),
            Some(_) => return None,
            None => (None, rest),
        };

        let (host, port) = match hostport.rsplit_once(':') {
            Some((host, port)) => (host, Some(port.parse::<u16>().ok()?)),
            None => (hostport, None),
        };
        if host.is_empty() {
            return None;
        }

        Some(Self::Ssh {
            user,
            host: host.to_string(),
            port,
        })
    }

    fn transport(&self) -> Box<dyn CommandTransport> {
        match self {
            Self::Local => Box::new(LocalTransport::new()),
            Self::Ssh { user, host, port } => {
                Box::new(SshTransport::new(user.clone(), host.clone(), *port))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    target: String,
}

#[derive(Debug, Deserialize)]
struct RawInventory {
    hosts: HashMap<String, RawEntry>,
}

/// Mapping of host roles to connection targets
#[derive(Debug)]
pub struct Inventory {
    hosts: HashMap<String, Target>,
}

impl Inventory {
    /// Load an inventory from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, InventoryError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| InventoryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|source| match source {
            ParseFailure::Toml(source) => InventoryError::Parse {
                path: path.display().to_string(),
                source,
            },
            ParseFailure::Target { role, target } => {
                InventoryError::MalformedTarget { role, target }
            }
        })
    }

    /// Parse an inventory from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ParseFailure> {
        let raw: RawInventory = toml::from_str(text).map_err(ParseFailure::Toml)?;

        let mut hosts = HashMap::new();
        for (role, entry) in raw.hosts {
            let target = Target::parse(&entry.target).ok_or_else(|| ParseFailure::Target {
                role: role.clone(),
                target: entry.target.clone(),
            })?;
            hosts.insert(role, target);
        }
        Ok(Self { hosts })
    }

    /// Resolve a role to its declared target
    pub fn resolve(&self, role: &str) -> Result<&Target, InventoryError> {
        self.hosts.get(role).ok_or_else(|| InventoryError::UnknownRole {
            role: role.to_string(),
        })
    }

    /// Resolve a role and open a host handle to it
    pub fn connect(&self, role: &str) -> Result<Host, InventoryError> {
        let target = self.resolve(role)?;
        Ok(Host::new(role, target.transport()))
    }

    /// Declared roles, for diagnostics
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.hosts.keys().map(String::as_str)
    }
}

/// Internal parse failure carrier for `from_toml_str`
#[derive(Debug)]
pub enum ParseFailure {
    Toml(toml::de::Error),
    Target { role: String, target: String },
}
