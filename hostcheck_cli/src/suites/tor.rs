//! Tor daemon compliance suite for the app role.
//!
//! Tor carries SSH access, so it must be running and enabled at boot. The
//! running/enabled check dispatches on the init system detected once per
//! host: systemd answers directly, SysV-style init is verified through the
//! status command and runlevel start symlinks.

use hostcheck_core::expect::Expected;
use hostcheck_core::prelude::*;
use hostcheck_core::probes::{check_output, file, package, service};

pub const NAME: &str = "tor";

const TORRC: &str = "/etc/tor/torrc";

pub fn run(host: &Host, vars: &TestVars) -> CaseSet {
    let mut cases = CaseSet::new(NAME);

    // Only the bare tor package: the keyring package is deliberately not
    // installed, so that a single release signing key covers tor updates too.
    cases.record(
        "package_installed[tor]",
        package::installed(host, "tor").map(|ok| {
            Checked::is_true(ok, "installed", if ok { "installed" } else { "not installed" })
        }),
    );

    match host.identity() {
        Ok(identity) => match identity.init {
            InitSystem::Systemd => systemd_service_cases(&mut cases, host),
            InitSystem::SysV => sysv_service_cases(&mut cases, host),
        },
        Err(e) => cases.error("tor_service_state", format!("probe failed: {e}")),
    }

    torrc_cases(&mut cases, host, vars);

    cases
}

fn systemd_service_cases(cases: &mut CaseSet, host: &Host) {
    match service::state(host, "tor", InitSystem::Systemd) {
        Ok(st) => {
            cases.record(
                "tor_service_running",
                Ok(Checked::is_true(
                    st.is_running,
                    "running",
                    if st.is_running { "running" } else { "not running" },
                )),
            );
            cases.record(
                "tor_service_enabled",
                Ok(Checked::new(
                    st.is_enabled == EnabledState::Enabled,
                    "enabled",
                    st.is_enabled.to_string(),
                )),
            );
        }
        Err(e) => {
            let message = format!("probe failed: {e}");
            cases.error("tor_service_running", message.as_str());
            cases.error("tor_service_enabled", message.as_str());
        }
    }
}

/// SysV hosts misreport tor under service managers that guess upstart, so
/// running and enabled states are verified explicitly: the init script's
/// status line, and one start symlink per multi-user runlevel, each pointing
/// at the init script.
fn sysv_service_cases(cases: &mut CaseSet, host: &Host) {
    cases.record_cmp(
        "tor_sysv_status",
        check_output(&host.sudo(), "service tor status"),
        &Expected::Exact(" * tor is running".to_string()),
    );

    match service::runlevel_links(&host.sudo(), "tor") {
        Ok(links) if links.is_empty() => {
            // Distinct from "disabled": the probe found no evidence at all
            cases.record(
                "tor_runlevel_links",
                Ok(Checked::new(
                    false,
                    "start symlinks in /etc/rc?.d",
                    "no runlevel symlinks found",
                )),
            );
        }
        Ok(links) => {
            cases.record(
                "tor_runlevel_links",
                Ok(Checked::new(
                    links.len() == 4,
                    "4 start symlinks",
                    format!("{} start symlinks", links.len()),
                )),
            );

            for link in &links {
                cases.record(
                    format!("runlevel_symlink[{link}]"),
                    file::state(host, link).map(|st| {
                        Checked::is_true(
                            st.is_symlink(),
                            "symlink",
                            if st.exists { "not a symlink" } else { "missing" },
                        )
                    }),
                );
                cases.record_cmp(
                    format!("runlevel_target[{link}]"),
                    file::link_target(host, link),
                    &Expected::Exact("/etc/init.d/tor".to_string()),
                );
            }
        }
        Err(e) => cases.error("tor_runlevel_links", format!("probe failed: {e}")),
    }
}

fn torrc_cases(cases: &mut CaseSet, host: &Host, vars: &TestVars) {
    match file::state(host, TORRC) {
        Ok(st) => {
            cases.record(
                "torrc_is_file",
                Ok(Checked::is_true(
                    st.is_file(),
                    "regular file",
                    if st.exists { "not a regular file" } else { "missing" },
                )),
            );
            cases.record(
                "torrc_owner",
                Ok(Checked::new(
                    st.owner.as_deref() == Some("debian-tor"),
                    "debian-tor",
                    st.owner.unwrap_or_default(),
                )),
            );
            cases.record(
                "torrc_mode",
                Ok(Checked::new(
                    st.mode.as_deref() == Some("0644"),
                    "0644",
                    st.mode.unwrap_or_default(),
                )),
            );
        }
        Err(e) => {
            let message = format!("probe failed: {e}");
            for name in ["torrc_is_file", "torrc_owner", "torrc_mode"] {
                cases.error(name, message.as_str());
            }
        }
    }

    for option in &vars.torrc_options {
        cases.record(
            format!("torrc_option[{option}]"),
            file::contains(host, TORRC, &format!("^{}$", regex::escape(option))).map(|found| {
                Checked::is_true(
                    found,
                    "option line present",
                    if found { "present" } else { "missing" },
                )
            }),
        );
    }

    // Sandbox is still experimental on servers; zero occurrences of the word
    // anywhere, not just the enabling declaration, or a regression slipped in.
    cases.record(
        "torrc_no_sandbox",
        file::contains(host, TORRC, "Sandbox").map(|found| {
            Checked::is_true(
                !found,
                "zero occurrences of Sandbox",
                if found { "Sandbox present" } else { "absent" },
            )
        }),
    );
}
