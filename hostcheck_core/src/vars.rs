//! # Expectation variables
//!
//! Environment-specific expected values (profile-mode lists, kernel version,
//! capability lists) loaded from a TOML document and consumed as an immutable
//! lookup. Lists with stable, role-independent contents carry defaults so a
//! vars file only has to state what differs per environment.

use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum VarsError {
    #[error("Failed to read vars file '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse vars file '{path}': {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// Declarative expected state for one environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestVars {
    /// Hardened kernel version string (the running kernel must be
    /// `<grsec_version>-grsec`)
    pub grsec_version: String,

    /// AppArmor profiles expected in enforce mode
    pub apparmor_enforce: Vec<String>,

    /// AppArmor profiles expected in complain mode (staging relaxation)
    pub apparmor_complain: Vec<String>,

    /// Hardened-kernel metapackage expected on every host
    #[serde(default = "default_grsec_metapackage")]
    pub grsec_metapackage: String,

    /// Exact capability set the apache2 profile may declare
    #[serde(default = "default_apache2_capabilities")]
    pub apache2_capabilities: Vec<String>,

    /// Exact capability set the tor profile may declare
    #[serde(default = "default_tor_capabilities")]
    pub tor_capabilities: Vec<String>,

    /// Profiles that must never appear under /etc/apparmor.d/disabled
    #[serde(default = "default_enforced_profiles")]
    pub enforced_profiles: Vec<String>,

    /// torrc option lines required verbatim
    #[serde(default = "default_torrc_options")]
    pub torrc_options: Vec<String>,
}

fn default_grsec_metapackage() -> String {
    "securedrop-grsec".to_string()
}

fn default_apache2_capabilities() -> Vec<String> {
    ["dac_override", "kill", "net_bind_service", "sys_ptrace"]
        .map(String::from)
        .to_vec()
}

fn default_tor_capabilities() -> Vec<String> {
    vec!["setgid".to_string()]
}

fn default_enforced_profiles() -> Vec<String> {
    ["ntpd", "apache2", "tcpdump", "tor"].map(String::from).to_vec()
}

fn default_torrc_options() -> Vec<String> {
    ["SocksPort 0", "SafeLogging 1", "RunAsDaemon 1"]
        .map(String::from)
        .to_vec()
}

impl TestVars {
    /// Load vars from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, VarsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| VarsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|source| VarsError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Parse vars from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Expected total profile count: sum of the declared mode lists
    pub fn expected_profile_total(&self) -> usize {
        self.apparmor_enforce.len() + self.apparmor_complain.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const STAGING: &str = r#"
grsec_version = "4.4.144"
apparmor_enforce = ["/usr/sbin/ntpd", "/usr/sbin/apache2", "/usr/sbin/tcpdump", "/usr/sbin/tor"]
apparmor_complain = ["/usr/sbin/haveged"]
"#;

    #[test]
    fn test_parse_with_defaults() {
        let vars = TestVars::from_toml_str(STAGING).unwrap();
        assert_eq!(vars.grsec_version, "4.4.144");
        assert_eq!(vars.expected_profile_total(), 5);
        assert_eq!(vars.tor_capabilities, vec!["setgid"]);
        assert_eq!(vars.apache2_capabilities.len(), 4);
        assert_eq!(vars.torrc_options.len(), 3);
    }

    #[test]
    fn test_defaults_can_be_overridden() {
        let text = format!("{STAGING}\ntor_capabilities = [\"setgid\", \"setuid\"]\n");
        let vars = TestVars::from_toml_str(&text).unwrap();
        assert_eq!(vars.tor_capabilities.len(), 2);
    }

    #[test]
    fn test_missing_required_field_is_a_parse_error() {
        assert!(TestVars::from_toml_str("apparmor_enforce = []\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(STAGING.as_bytes()).unwrap();

        let vars = TestVars::load(file.path()).unwrap();
        assert_eq!(vars.apparmor_complain, vec!["/usr/sbin/haveged"]);

        assert!(matches!(
            TestVars::load("/nonexistent/vars.toml").unwrap_err(),
            VarsError::Io { .. }
        ));
    }
}
