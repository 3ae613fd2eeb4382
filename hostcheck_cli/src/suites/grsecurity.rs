//! Hardened-kernel (grsecurity) compliance suite, applicable to every role.
//!
//! Asserts the host boots and runs the hardened kernel: grsec packages
//! present, vendor kernels purged, the grsec lock engaged, PaX holding, and
//! wireless stacks compiled out.

use hostcheck_core::expect::Expected;
use hostcheck_core::prelude::*;
use hostcheck_core::probes::{check_output, file, package, sysctl};

pub const NAME: &str = "grsecurity";

/// Memory-protection checks paxtest must report as Killed
const PAXTEST_CHECKS: [&str; 17] = [
    "Executable anonymous mapping",
    "Executable bss",
    "Executable data",
    "Executable heap",
    "Executable stack",
    "Executable shared library bss",
    "Executable shared library data",
    "Executable anonymous mapping (mprotect)",
    "Executable bss (mprotect)",
    "Executable data (mprotect)",
    "Executable heap (mprotect)",
    "Executable stack (mprotect)",
    "Executable shared library bss (mprotect)",
    "Executable shared library data (mprotect)",
    "Writable text segments",
    "Return to function (memcpy)",
    "Return to function (memcpy, PIE)",
];

/// Kernel config families that must be compiled out, not just blacklisted
const WIRELESS_KERNEL_OPTS: [&str; 7] =
    ["WLAN", "NFC", "WIMAX", "WIRELESS", "HAMRADIO", "IRDA", "BT"];

/// Grub binaries whose PaX flags the postinst hook maintains
const PAX_FLAGGED_BINARIES: [&str; 3] = [
    "/usr/sbin/grub-probe",
    "/usr/sbin/grub-mkdevicemap",
    "/usr/bin/grub-script-check",
];

pub fn run(host: &Host, vars: &TestVars) -> CaseSet {
    let mut cases = CaseSet::new(NAME);
    let version = &vars.grsec_version;

    // Grsecurity balks at the default Ubuntu MOTD
    cases.record(
        "sshd_pam_is_file",
        file::state(host, "/etc/pam.d/sshd").map(|st| {
            Checked::is_true(
                st.is_file(),
                "regular file",
                if st.exists { "not a regular file" } else { "missing" },
            )
        }),
    );
    cases.record(
        "sshd_motd_disabled",
        file::contains(host, "/etc/pam.d/sshd", r"pam\.motd").map(|found| {
            Checked::is_true(
                !found,
                "no pam.motd reference",
                if found { "pam.motd referenced" } else { "absent" },
            )
        }),
    );

    for pkg in [
        format!("linux-firmware-image-{version}-grsec"),
        format!("linux-image-{version}-grsec"),
        "paxctl".to_string(),
        vars.grsec_metapackage.clone(),
    ] {
        cases.record(
            format!("package_installed[{pkg}]"),
            package::installed(host, &pkg).map(|ok| {
                Checked::is_true(ok, "installed", if ok { "installed" } else { "not installed" })
            }),
        );
    }

    // Conflicting vendor kernel versions have rebooted machines into
    // non-grsec kernels before; whole package families must be gone.
    for pattern in [
        "linux-signed-image-generic-lts-utopic",
        "linux-signed-image-generic",
        "linux-signed-generic-lts-utopic",
        "linux-signed-generic",
        "^linux-image-.*generic$",
        "^linux-headers-.*",
    ] {
        cases.record(
            format!("package_absent[{pattern}]"),
            package::absent(host, pattern).map(|gone| {
                Checked::is_true(gone, "absent", if gone { "absent" } else { "installed" })
            }),
        );
    }

    lock_file_cases(&mut cases, host);
    running_kernel_cases(&mut cases, host, version);

    // RWX logging is off in production to reduce log noise
    for (key, expected) in [
        ("kernel.grsecurity.grsec_lock", 1),
        ("kernel.grsecurity.rwxmap_logging", 0),
        ("vm.heap_stack_gap", 1_048_576),
    ] {
        cases.record(
            format!("sysctl[{key}]"),
            sysctl::value(&host.sudo(), key).map(|value| {
                Checked::new(
                    value == SysctlValue::Int(expected),
                    expected.to_string(),
                    value.to_string(),
                )
            }),
        );
    }

    paxtest_cases(&mut cases, host);

    // Keeps VirtualBox/Vagrant from autoremoving grub-pc
    cases.record_cmp(
        "grub_pc_marked_manual",
        check_output(host, "apt-mark showmanual grub-pc"),
        &Expected::Exact("grub-pc".to_string()),
    );

    cases.record(
        "apt_autoremove_clean",
        check_output(host, "apt-get --dry-run autoremove").map(|out| {
            let pending = out.contains("The following packages will be REMOVED");
            Checked::is_true(
                !pending,
                "nothing pending autoremoval",
                if pending { "packages pending removal" } else { "clean" },
            )
        }),
    );

    // Tracked regression: flags are unset at install time. A pass here means
    // the install hook changed and the tracking must be revisited.
    for binary in PAX_FLAGGED_BINARIES {
        cases.record_xfail(
            format!("pax_flags[{binary}]"),
            "PaX flags unset at install time",
            pax_flags_check(host, binary),
        );
    }

    wireless_config_cases(&mut cases, host, version);

    cases
}

/// The grsec_lock proc file only exists under a grsecurity kernel
fn lock_file_cases(cases: &mut CaseSet, host: &Host) {
    match file::state(host, "/proc/sys/kernel/grsecurity/grsec_lock") {
        Ok(st) => {
            cases.record(
                "grsec_lock_mode",
                Ok(Checked::new(
                    st.mode.as_deref() == Some("0600"),
                    "0600",
                    st.mode.unwrap_or_else(|| "missing".to_string()),
                )),
            );
            cases.record(
                "grsec_lock_owner",
                Ok(Checked::new(
                    st.owner.as_deref() == Some("root"),
                    "root",
                    st.owner.unwrap_or_else(|| "missing".to_string()),
                )),
            );
            cases.record(
                "grsec_lock_size",
                Ok(Checked::new(
                    st.size == Some(0),
                    "0",
                    st.size.map_or_else(|| "missing".to_string(), |s| s.to_string()),
                )),
            );
        }
        Err(e) => {
            let message = format!("probe failed: {e}");
            for name in ["grsec_lock_mode", "grsec_lock_owner", "grsec_lock_size"] {
                cases.error(name, message.as_str());
            }
        }
    }
}

fn running_kernel_cases(cases: &mut CaseSet, host: &Host, version: &str) {
    match check_output(host, "uname -r") {
        Ok(kernel) => {
            cases.record(
                "kernel_is_grsec",
                Ok(Checked::is_true(
                    kernel.ends_with("-grsec"),
                    "ends with -grsec",
                    kernel.clone(),
                )),
            );
            cases.record_cmp(
                "kernel_version",
                Ok(kernel),
                &Expected::Exact(format!("{version}-grsec")),
            );
        }
        Err(e) => {
            let message = format!("probe failed: {e}");
            cases.error("kernel_is_grsec", message.as_str());
            cases.error("kernel_version", message.as_str());
        }
    }
}

/// Paxtest is installed by a separate test role; when it is missing the
/// gauntlet is not applicable and emits no cases.
fn paxtest_cases(cases: &mut CaseSet, host: &Host) {
    match file::state(host, "/usr/bin/paxtest") {
        Ok(st) if st.exists => match host.sudo().run("paxtest blackhat") {
            Ok(output) => {
                cases.record(
                    "paxtest_rc",
                    Ok(Checked::is_true(
                        output.succeeded(),
                        "rc == 0",
                        format!("rc == {}", output.exit_code),
                    )),
                );
                cases.record(
                    "paxtest_nothing_vulnerable",
                    Ok(Checked::is_true(
                        !output.stdout.contains("Vulnerable"),
                        "no Vulnerable verdicts",
                        if output.stdout.contains("Vulnerable") {
                            "Vulnerable verdict reported"
                        } else {
                            "all killed"
                        },
                    )),
                );
                for check in PAXTEST_CHECKS {
                    cases.record_cmp(
                        format!("paxtest[{check}]"),
                        Ok(output.stdout.clone()),
                        &Expected::Regex(format!(r"^{}\s*:\sKilled$", regex::escape(check))),
                    );
                }
            }
            Err(e) => cases.error("paxtest_rc", format!("probe failed: {e}")),
        },
        Ok(_) => {}
        Err(e) => cases.error("paxtest_rc", format!("probe failed: {e}")),
    }
}

/// Composite PaX-flag verification for one grub binary: the postinst hook
/// declares the flags and paxctl reports them live. Evaluated as one case so
/// the strict expected-failure marker covers the whole sequence.
fn pax_flags_check(host: &Host, binary: &str) -> Result<Checked, ProbeError> {
    let hook_line = format!("^paxctl -zCE {}", regex::escape(binary));
    if !file::contains(host, "/etc/kernel/postinst.d/paxctl-grub", &hook_line)? {
        return Ok(Checked::new(
            false,
            "postinst hook sets flags",
            "hook line missing",
        ));
    }

    let command = format!("paxctl -v {binary}");
    let output = host.run(&command)?;
    if !output.succeeded() {
        return Ok(Checked::new(
            false,
            "paxctl -v rc == 0",
            format!("rc == {}", output.exit_code),
        ));
    }

    let flags_line = format!("- PaX flags: --------E--- [{binary}]");
    if !output.stdout.contains(&flags_line) || !output.stdout.contains("EMUTRAMP is enabled") {
        return Ok(Checked::new(
            false,
            "EMUTRAMP enabled and flag line present",
            "flags not reported",
        ));
    }

    // Earlier configs set the "p" and "m" flags; neither may read disabled
    if output.stdout.contains("PAGEEXEC is disabled")
        || output.stdout.contains("MPROTECT is disabled")
    {
        return Ok(Checked::new(
            false,
            "PAGEEXEC and MPROTECT not disabled",
            "a protection reads disabled",
        ));
    }

    Ok(Checked::new(true, "PaX flags set", "PaX flags set"))
}

fn wireless_config_cases(cases: &mut CaseSet, host: &Host, version: &str) {
    let config_path = format!("/boot/config-{version}-grsec");
    match file::content(host, &config_path) {
        Ok(config) => {
            for opt in WIRELESS_KERNEL_OPTS {
                let line = format!("# CONFIG_{opt} is not set");
                let found = config.contains(&line);
                cases.record(
                    format!("wireless_disabled[{opt}]"),
                    Ok(Checked::is_true(
                        found,
                        line.clone(),
                        if found { "unset" } else { "line missing" },
                    )),
                );
            }
        }
        Err(e) => {
            let message = format!("probe failed: {e}");
            for opt in WIRELESS_KERNEL_OPTS {
                cases.error(format!("wireless_disabled[{opt}]"), message.as_str());
            }
        }
    }
}
