//! AppArmor compliance suite for the app role.
//!
//! Asserts the mandatory-access-control posture: packages present, the module
//! enabled, profile capability sets exact, enforced profiles not disabled on
//! disk, and the enforce/complain mode split matching the declared staging
//! expectations.

use hostcheck_core::expect::{extract, Expected};
use hostcheck_core::prelude::*;
use hostcheck_core::probes::{check_output, file, package, succeeds};

pub const NAME: &str = "apparmor";

pub fn run(host: &Host, vars: &TestVars) -> CaseSet {
    let mut cases = CaseSet::new(NAME);

    for pkg in ["apparmor", "apparmor-utils"] {
        cases.record(
            format!("package_installed[{pkg}]"),
            package::installed(host, pkg).map(|ok| {
                Checked::is_true(ok, "installed", if ok { "installed" } else { "not installed" })
            }),
        );
    }

    cases.record(
        "apparmor_enabled",
        succeeds(&host.sudo(), "aa-status --enabled").map(|ok| {
            Checked::is_true(ok, "rc == 0", if ok { "rc == 0" } else { "rc != 0" })
        }),
    );

    profile_capabilities(
        &mut cases,
        host,
        "apache2",
        "/etc/apparmor.d/usr.sbin.apache2",
        &vars.apache2_capabilities,
    );
    profile_capabilities(
        &mut cases,
        host,
        "tor",
        "/etc/apparmor.d/usr.sbin.tor",
        &vars.tor_capabilities,
    );

    // aa-status only reflects the last loaded config; the on-disk disable
    // directory is what guarantees a profile survives reboot.
    for profile in &vars.enforced_profiles {
        let path = format!("/etc/apparmor.d/disabled/usr.sbin.{profile}");
        cases.record(
            format!("profile_not_disabled[{profile}]"),
            file::state(&host.sudo(), &path).map(|st| {
                Checked::is_true(
                    !st.exists,
                    "absent from disable directory",
                    if st.exists { "present" } else { "absent" },
                )
            }),
        );
    }

    // One aa-status fetch backs the mode-membership and unconfined checks
    match check_output(&host.sudo(), "aa-status") {
        Ok(status) => {
            let complaining = extract::profiles_in_mode(&status, "complain");
            for profile in &vars.apparmor_complain {
                cases.record(
                    format!("complain_mode[{profile}]"),
                    Ok(Checked::is_true(
                        complaining.iter().any(|p| p.contains(profile.as_str())),
                        "listed in complain section",
                        format!("complain section: {complaining:?}"),
                    )),
                );
            }

            let enforced = extract::profiles_in_mode(&status, "enforce");
            for profile in &vars.apparmor_enforce {
                cases.record(
                    format!("enforce_mode[{profile}]"),
                    Ok(Checked::is_true(
                        enforced.iter().any(|p| p.contains(profile.as_str())),
                        "listed in enforce section",
                        format!("enforce section: {enforced:?}"),
                    )),
                );
            }

            unconfined_case(&mut cases, host, &status);
        }
        Err(e) => {
            let message = format!("probe failed: {e}");
            for profile in &vars.apparmor_complain {
                cases.error(format!("complain_mode[{profile}]"), message.as_str());
            }
            for profile in &vars.apparmor_enforce {
                cases.error(format!("enforce_mode[{profile}]"), message.as_str());
            }
            cases.error("unconfined_processes", message.as_str());
        }
    }

    cases.record_cmp(
        "complain_count",
        check_output(&host.sudo(), "aa-status --complaining"),
        &Expected::Count(vars.apparmor_complain.len()),
    );

    // Distros ship extra profiles on top of ours, so the total is a floor
    cases.record_cmp(
        "total_profiles",
        check_output(&host.sudo(), "aa-status --profiled"),
        &Expected::AtLeast(vars.expected_profile_total() as i64),
    );

    cases.record(
        "no_denials_in_syslog",
        file::content(&host.sudo(), "/var/log/syslog").map(|text| {
            let denied = text.contains("apparmor=\"DENIED\"");
            Checked::is_true(
                !denied,
                "no apparmor=\"DENIED\" entries",
                if denied { "denial entries found" } else { "no denials" },
            )
        }),
    );

    cases
}

/// Exact-set check for one profile's capabilities: membership of every
/// declared token plus a literal line-count match, so both missing and
/// unexpectedly-added capabilities are caught.
fn profile_capabilities(
    cases: &mut CaseSet,
    host: &Host,
    label: &str,
    path: &str,
    expected: &[String],
) {
    match file::content(&host.sudo(), path) {
        Ok(text) => {
            let tokens = extract::capability_tokens(&text);
            for cap in expected {
                cases.record(
                    format!("{label}_capability[{cap}]"),
                    Ok(Checked::is_true(
                        tokens.contains(cap),
                        "declared in profile",
                        format!("declared: {tokens:?}"),
                    )),
                );
            }

            let count = extract::capability_line_count(&text);
            cases.record(
                format!("{label}_capability_count"),
                Ok(Checked::new(
                    count == expected.len(),
                    expected.len().to_string(),
                    count.to_string(),
                )),
            );
        }
        Err(e) => {
            let message = format!("probe failed: {e}");
            for cap in expected {
                cases.error(format!("{label}_capability[{cap}]"), message.as_str());
            }
            cases.error(format!("{label}_capability_count"), message.as_str());
        }
    }
}

/// Unconfined-process expectation branches once on the host codename:
/// xenial introduced an unconfined-by-default haveged profile.
fn unconfined_case(cases: &mut CaseSet, host: &Host, status: &str) {
    match host.identity() {
        Ok(identity) => {
            let expected_unconfined = if identity.codename == "xenial" { 1 } else { 0 };
            let needle = format!(
                "{expected_unconfined} processes are unconfined but have a profile defined"
            );
            cases.record_cmp(
                "unconfined_processes",
                Ok(status.to_string()),
                &Expected::Contains(needle),
            );
        }
        Err(e) => cases.error("unconfined_processes", format!("probe failed: {e}")),
    }
}
