//! Debian package database probes.
//!
//! Installation checks go through `dpkg-query`; absence checks shell out to
//! `dpkg -l`, which honors simple regex in package names and is therefore the
//! probe of choice for asserting whole families of packages are gone.

use crate::host::CommandRunner;

use super::ProbeError;

/// Whether a package is installed (literal name).
pub fn installed(runner: &dyn CommandRunner, name: &str) -> Result<bool, ProbeError> {
    let command = format!("dpkg-query -W -f='${{Status}}' {name}");
    let output = runner.run(&command)?;

    if output.succeeded() {
        return Ok(output.stdout.contains("install ok installed"));
    }
    if output.stderr.contains("no packages found matching") {
        return Ok(false);
    }
    Err(ProbeError::from_output(&command, &output))
}

/// Whether no package matching `pattern` is known to dpkg at all (literal
/// name or simple dpkg regex such as `^linux-image-.*generic$`).
///
/// True only on the exact dpkg "not found" contract (rc 1 plus the matching
/// stderr line). A zero exit means dpkg still carries state for the pattern,
/// removed-but-configured (`rc`) rows included, and that counts as present.
/// Any other failure is a probe error, keeping "not found" distinguishable
/// from "probe errored".
pub fn absent(runner: &dyn CommandRunner, pattern: &str) -> Result<bool, ProbeError> {
    let command = format!("dpkg -l {pattern}");
    let output = runner.run(&command)?;

    if output.exit_code == 1 {
        let expected = format!("dpkg-query: no packages found matching {pattern}");
        if output.stderr.trim() == expected {
            return Ok(true);
        }
        return Err(ProbeError::UnexpectedOutput {
            what: format!("dpkg -l {pattern} stderr"),
            output: output.stderr.clone(),
        });
    }
    if output.succeeded() {
        return Ok(false);
    }
    Err(ProbeError::from_output(&command, &output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Host, ScriptedTransport};

    fn host(script: impl FnOnce(&mut ScriptedTransport)) -> Host {
        let mut t = ScriptedTransport::new();
        script(&mut t);
        Host::new("app-staging", Box::new(t))
    }

    #[test]
    fn test_installed() {
        let host = host(|t| {
            t.ok(
                "dpkg-query -W -f='${Status}' apparmor",
                false,
                "install ok installed",
            );
            t.fail(
                "dpkg-query -W -f='${Status}' wpasupplicant",
                false,
                1,
                "dpkg-query: no packages found matching wpasupplicant",
            );
        });

        assert!(installed(&host, "apparmor").unwrap());
        assert!(!installed(&host, "wpasupplicant").unwrap());
    }

    #[test]
    fn test_absent_honors_dpkg_not_found_contract() {
        let pattern = "^linux-image-.*generic$";
        let host = host(|t| {
            t.fail(
                format!("dpkg -l {pattern}"),
                false,
                1,
                format!("dpkg-query: no packages found matching {pattern}\n"),
            );
        });

        assert!(absent(&host, pattern).unwrap());
    }

    #[test]
    fn test_absent_finds_installed_family() {
        let host = host(|t| {
            t.ok(
                "dpkg -l linux-signed-generic",
                false,
                "Desired=Unknown/Install/Remove/Purge/Hold\n\
                 ii  linux-signed-generic  4.4.0.21  amd64  Complete Signed Generic Linux kernel\n",
            );
        });

        assert!(!absent(&host, "linux-signed-generic").unwrap());
    }

    #[test]
    fn test_absent_rejects_removed_but_configured_package() {
        // dpkg exits 0 for an `rc` row; leftover config state is not absence
        let host = host(|t| {
            t.ok(
                "dpkg -l linux-signed-generic",
                false,
                "Desired=Unknown/Install/Remove/Purge/Hold\n\
                 rc  linux-signed-generic  4.4.0.21  amd64  Complete Signed Generic Linux kernel\n",
            );
        });

        assert!(!absent(&host, "linux-signed-generic").unwrap());
    }

    #[test]
    fn test_absent_distinguishes_probe_error_from_not_found() {
        let host = host(|t| {
            t.fail("dpkg -l paxctl", false, 2, "dpkg-query: failed to open database");
        });

        // rc 2 is neither "found" nor the not-found contract: hard error
        assert!(absent(&host, "paxctl").is_err());
    }

    #[test]
    fn test_absent_with_unexpected_stderr_is_error() {
        let host = host(|t| {
            t.fail("dpkg -l paxctl", false, 1, "dpkg-query: cannot read lock file");
        });
        assert!(matches!(
            absent(&host, "paxctl").unwrap_err(),
            ProbeError::UnexpectedOutput { .. }
        ));
    }
}
