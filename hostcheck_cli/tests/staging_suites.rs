//! End-to-end suite runs against scripted transports: one fully compliant
//! fixture per suite, plus the drift scenarios that must surface as
//! individual case failures without aborting their siblings.

use hostcheck_cli::suites::{apparmor, grsecurity, tor};
use hostcheck_core::prelude::*;

const STAGING_VARS: &str = r#"
grsec_version = "4.4.144"
apparmor_enforce = ["/usr/sbin/ntpd", "/usr/sbin/apache2", "/usr/sbin/tcpdump", "/usr/sbin/tor"]
apparmor_complain = ["/usr/sbin/haveged"]
"#;

fn vars() -> TestVars {
    TestVars::from_toml_str(STAGING_VARS).unwrap()
}

fn host(transport: ScriptedTransport) -> Host {
    Host::new("app-staging", Box::new(transport))
}

fn find<'a>(cases: &'a CaseSet, name: &str) -> &'a CaseRecord {
    cases
        .records()
        .iter()
        .find(|r| r.name == name)
        .unwrap_or_else(|| panic!("no case named {name}"))
}

// ---------------------------------------------------------------- apparmor

const AA_STATUS: &str = "\
apparmor module is loaded.
5 profiles are loaded.
4 profiles are in enforce mode.
   /usr/sbin/ntpd
   /usr/sbin/apache2
   /usr/sbin/tcpdump
   /usr/sbin/tor
1 profiles are in complain mode.
   /usr/sbin/haveged
5 processes have profiles defined.
5 processes are in enforce mode.
0 processes are in complain mode.
0 processes are unconfined but have a profile defined.
";

const APACHE2_PROFILE: &str = "\
/usr/sbin/apache2 {
  capability dac_override,
  capability kill,
  capability net_bind_service,
  capability sys_ptrace,
}
";

fn apparmor_transport() -> ScriptedTransport {
    let mut t = ScriptedTransport::new();
    for pkg in ["apparmor", "apparmor-utils"] {
        t.ok(
            format!("dpkg-query -W -f='${{Status}}' {pkg}"),
            false,
            "install ok installed",
        );
    }
    t.ok("aa-status --enabled", true, "");

    t.ok("cat /etc/apparmor.d/usr.sbin.apache2", true, APACHE2_PROFILE);
    t.ok(
        "cat /etc/apparmor.d/usr.sbin.tor",
        true,
        "/usr/sbin/tor {\n  capability setgid,\n}\n",
    );

    for profile in ["ntpd", "apache2", "tcpdump", "tor"] {
        t.fail(
            format!("stat -c '%F|%a|%U|%s' /etc/apparmor.d/disabled/usr.sbin.{profile}"),
            true,
            1,
            format!(
                "stat: cannot stat '/etc/apparmor.d/disabled/usr.sbin.{profile}': \
                 No such file or directory"
            ),
        );
    }

    t.ok("aa-status", true, AA_STATUS);
    t.ok("lsb_release -sc", false, "trusty\n");
    t.fail("test -d /run/systemd/system", false, 1, "");
    t.ok("aa-status --complaining", true, "1\n");
    t.ok("aa-status --profiled", true, "8\n");
    t.ok(
        "cat /var/log/syslog",
        true,
        "Jan 1 00:00:01 app kernel: [ 1.0] audit: type=1400 apparmor=\"STATUS\"\n",
    );
    t
}

#[test]
fn apparmor_compliant_host_passes() {
    let cases = apparmor::run(&host(apparmor_transport()), &vars());

    assert!(!cases.failed(), "failures: {:?}", cases.records());
    assert_eq!(find(&cases, "apache2_capability_count").outcome, Outcome::Pass);
    assert_eq!(find(&cases, "unconfined_processes").outcome, Outcome::Pass);
    assert_eq!(find(&cases, "total_profiles").outcome, Outcome::Pass);
}

#[test]
fn apparmor_extra_capability_breaks_exact_set() {
    let mut t = apparmor_transport();
    // Membership of the declared token still holds; only the count drifts
    t.ok(
        "cat /etc/apparmor.d/usr.sbin.tor",
        true,
        "/usr/sbin/tor {\n  capability setgid,\n  capability setuid,\n}\n",
    );

    let cases = apparmor::run(&host(t), &vars());

    assert_eq!(find(&cases, "tor_capability[setgid]").outcome, Outcome::Pass);
    let count = find(&cases, "tor_capability_count");
    assert_eq!(count.outcome, Outcome::Fail);
    assert_eq!(count.actual.as_deref(), Some("2"));
    assert!(cases.failed());
}

#[test]
fn apparmor_probe_error_marks_dependent_cases_only() {
    let mut t = apparmor_transport();
    t.fail(
        "cat /var/log/syslog",
        true,
        1,
        "cat: /var/log/syslog: Permission denied",
    );

    let cases = apparmor::run(&host(t), &vars());

    assert_eq!(find(&cases, "no_denials_in_syslog").outcome, Outcome::Error);
    assert_eq!(find(&cases, "apparmor_enabled").outcome, Outcome::Pass);
}

// --------------------------------------------------------------------- tor

const TORRC: &str = "SocksPort 0\nSafeLogging 1\nRunAsDaemon 1\n";

fn torrc_script(t: &mut ScriptedTransport) {
    t.ok(
        "dpkg-query -W -f='${Status}' tor",
        false,
        "install ok installed",
    );
    t.ok(
        "stat -c '%F|%a|%U|%s' /etc/tor/torrc",
        false,
        "regular file|644|debian-tor|1350\n",
    );
    t.ok("cat /etc/tor/torrc", false, TORRC);
}

fn tor_systemd_transport() -> ScriptedTransport {
    let mut t = ScriptedTransport::new();
    torrc_script(&mut t);
    t.ok("lsb_release -sc", false, "xenial\n");
    t.ok("test -d /run/systemd/system", false, "");
    t.ok("systemctl is-active tor", false, "active\n");
    t.ok("systemctl is-enabled tor", false, "enabled\n");
    t
}

fn tor_sysv_transport() -> ScriptedTransport {
    let mut t = ScriptedTransport::new();
    torrc_script(&mut t);
    t.ok("lsb_release -sc", false, "trusty\n");
    t.fail("test -d /run/systemd/system", false, 1, "");
    t.ok("service tor status", true, " * tor is running\n");
    t.ok(
        "find /etc/rc?.d -name S??tor",
        true,
        "/etc/rc2.d/S20tor\n/etc/rc3.d/S20tor\n/etc/rc4.d/S20tor\n/etc/rc5.d/S20tor\n",
    );
    for level in 2..=5 {
        t.ok(
            format!("stat -c '%F|%a|%U|%s' /etc/rc{level}.d/S20tor"),
            false,
            "symbolic link|777|root|15\n",
        );
        t.ok(
            format!("readlink /etc/rc{level}.d/S20tor"),
            false,
            "/etc/init.d/tor\n",
        );
    }
    t
}

#[test]
fn tor_systemd_host_passes() {
    let cases = tor::run(&host(tor_systemd_transport()), &vars());

    assert!(!cases.failed(), "failures: {:?}", cases.records());
    assert_eq!(find(&cases, "tor_service_running").outcome, Outcome::Pass);
    assert_eq!(find(&cases, "tor_service_enabled").outcome, Outcome::Pass);
}

#[test]
fn tor_sysv_host_passes_via_runlevel_links() {
    let cases = tor::run(&host(tor_sysv_transport()), &vars());

    assert!(!cases.failed(), "failures: {:?}", cases.records());
    assert_eq!(find(&cases, "tor_sysv_status").outcome, Outcome::Pass);
    assert_eq!(find(&cases, "tor_runlevel_links").outcome, Outcome::Pass);
    assert_eq!(
        find(&cases, "runlevel_target[/etc/rc2.d/S20tor]").outcome,
        Outcome::Pass
    );
}

#[test]
fn tor_sysv_without_runlevel_links_fails_distinctly() {
    let mut t = tor_sysv_transport();
    t.ok("find /etc/rc?.d -name S??tor", true, "");

    let cases = tor::run(&host(t), &vars());

    let links = find(&cases, "tor_runlevel_links");
    assert_eq!(links.outcome, Outcome::Fail);
    assert_eq!(links.actual.as_deref(), Some("no runlevel symlinks found"));
    // The rest of the suite still ran
    assert_eq!(find(&cases, "torrc_mode").outcome, Outcome::Pass);
}

#[test]
fn tor_sandbox_regression_is_caught() {
    let mut t = tor_systemd_transport();
    t.ok(
        "cat /etc/tor/torrc",
        false,
        format!("{TORRC}Sandbox 1\n"),
    );

    let cases = tor::run(&host(t), &vars());
    assert_eq!(find(&cases, "torrc_no_sandbox").outcome, Outcome::Fail);
    // Option lines are unaffected by the extra line
    assert_eq!(find(&cases, "torrc_option[SocksPort 0]").outcome, Outcome::Pass);
}

// -------------------------------------------------------------- grsecurity

const GRSEC_VERSION: &str = "4.4.144";

const ABSENT_PATTERNS: [&str; 6] = [
    "linux-signed-image-generic-lts-utopic",
    "linux-signed-image-generic",
    "linux-signed-generic-lts-utopic",
    "linux-signed-generic",
    "^linux-image-.*generic$",
    "^linux-headers-.*",
];

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

fn paxtest_output() -> String {
    let mut out = String::from("PaXtest - Copyright(c) 2003-2014\nMode: Blackhat\n");
    for check in PAXTEST_CHECKS {
        out.push_str(&format!("{check} : Killed\n"));
    }
    out
}

fn wireless_config() -> String {
    ["WLAN", "NFC", "WIMAX", "WIRELESS", "HAMRADIO", "IRDA", "BT"]
        .iter()
        .map(|opt| format!("# CONFIG_{opt} is not set\n"))
        .collect()
}

fn grsec_transport() -> ScriptedTransport {
    let mut t = ScriptedTransport::new();
    t.ok(
        "stat -c '%F|%a|%U|%s' /etc/pam.d/sshd",
        false,
        "regular file|644|root|2133\n",
    );
    t.ok(
        "cat /etc/pam.d/sshd",
        false,
        "@include common-auth\nsession    required     pam_env.so\n",
    );

    for pkg in [
        format!("linux-firmware-image-{GRSEC_VERSION}-grsec"),
        format!("linux-image-{GRSEC_VERSION}-grsec"),
        "paxctl".to_string(),
        "securedrop-grsec".to_string(),
    ] {
        t.ok(
            format!("dpkg-query -W -f='${{Status}}' {pkg}"),
            false,
            "install ok installed",
        );
    }
    for pattern in ABSENT_PATTERNS {
        t.fail(
            format!("dpkg -l {pattern}"),
            false,
            1,
            format!("dpkg-query: no packages found matching {pattern}\n"),
        );
    }

    t.ok(
        "stat -c '%F|%a|%U|%s' /proc/sys/kernel/grsecurity/grsec_lock",
        false,
        "regular empty file|600|root|0\n",
    );
    t.ok("uname -r", false, format!("{GRSEC_VERSION}-grsec\n"));

    t.ok("sysctl -n kernel.grsecurity.grsec_lock", true, "1\n");
    t.ok("sysctl -n kernel.grsecurity.rwxmap_logging", true, "0\n");
    t.ok("sysctl -n vm.heap_stack_gap", true, "1048576\n");

    t.ok(
        "stat -c '%F|%a|%U|%s' /usr/bin/paxtest",
        false,
        "regular file|755|root|13000\n",
    );
    t.ok("paxtest blackhat", true, paxtest_output());

    t.ok("apt-mark showmanual grub-pc", false, "grub-pc\n");
    t.ok(
        "apt-get --dry-run autoremove",
        false,
        "Reading package lists...\nBuilding dependency tree...\n\
         0 upgraded, 0 newly installed, 0 to remove and 0 not upgraded.\n",
    );

    t.ok(
        "cat /etc/kernel/postinst.d/paxctl-grub",
        false,
        "#!/bin/sh\n\
         paxctl -zCE /usr/sbin/grub-probe\n\
         paxctl -zCE /usr/sbin/grub-mkdevicemap\n\
         paxctl -zCE /usr/bin/grub-script-check\n",
    );
    for binary in [
        "/usr/sbin/grub-probe",
        "/usr/sbin/grub-mkdevicemap",
        "/usr/bin/grub-script-check",
    ] {
        t.fail(
            format!("paxctl -v {binary}"),
            false,
            1,
            format!("file {binary} does not have a PT_PAX_FLAGS program header\n"),
        );
    }

    t.ok(
        format!("cat /boot/config-{GRSEC_VERSION}-grsec"),
        false,
        wireless_config(),
    );
    t
}

#[test]
fn grsecurity_compliant_host_passes() {
    let cases = grsecurity::run(&host(grsec_transport()), &vars());

    assert!(!cases.failed(), "failures: {:?}", cases.records());

    let expected_failures = cases
        .records()
        .iter()
        .filter(|r| r.outcome == Outcome::ExpectedFail)
        .count();
    assert_eq!(expected_failures, 3);

    assert_eq!(find(&cases, "kernel_version").outcome, Outcome::Pass);
    assert_eq!(find(&cases, "paxtest[Writable text segments]").outcome, Outcome::Pass);
    assert_eq!(find(&cases, "wireless_disabled[BT]").outcome, Outcome::Pass);
}

#[test]
fn grsecurity_unlocked_sysctl_fails() {
    let mut t = grsec_transport();
    t.ok("sysctl -n kernel.grsecurity.grsec_lock", true, "0\n");

    let cases = grsecurity::run(&host(t), &vars());

    let lock = find(&cases, "sysctl[kernel.grsecurity.grsec_lock]");
    assert_eq!(lock.outcome, Outcome::Fail);
    assert_eq!(lock.actual.as_deref(), Some("0"));
    assert_eq!(lock.expected.as_deref(), Some("1"));
    // The other sysctl cases are unaffected
    assert_eq!(find(&cases, "sysctl[vm.heap_stack_gap]").outcome, Outcome::Pass);
}

#[test]
fn grsecurity_pax_flags_fixed_is_an_unexpected_pass() {
    let mut t = grsec_transport();
    t.ok(
        "paxctl -v /usr/sbin/grub-probe",
        false,
        "PaX control v0.9\n\
         - PaX flags: --------E--- [/usr/sbin/grub-probe]\n\
         \tEMUTRAMP is enabled\n",
    );

    let cases = grsecurity::run(&host(t), &vars());

    assert_eq!(
        find(&cases, "pax_flags[/usr/sbin/grub-probe]").outcome,
        Outcome::UnexpectedPass
    );
    assert_eq!(
        find(&cases, "pax_flags[/usr/sbin/grub-mkdevicemap]").outcome,
        Outcome::ExpectedFail
    );
    assert!(cases.failed());
}

#[test]
fn grsecurity_missing_paxtest_emits_no_paxtest_cases() {
    let mut t = grsec_transport();
    t.fail(
        "stat -c '%F|%a|%U|%s' /usr/bin/paxtest",
        false,
        1,
        "stat: cannot stat '/usr/bin/paxtest': No such file or directory",
    );

    let cases = grsecurity::run(&host(t), &vars());

    assert!(!cases.records().iter().any(|r| r.name.starts_with("paxtest")));
    assert!(!cases.failed(), "failures: {:?}", cases.records());
}

// ------------------------------------------------------------------ report

#[test]
fn full_run_report_is_compliant() {
    let mut report = RunReport::new("app-staging", "scripted");

    let vars = vars();
    report.push_set(apparmor::run(&host(apparmor_transport()), &vars));
    report.push_set(grsecurity::run(&host(grsec_transport()), &vars));
    report.push_set(tor::run(&host(tor_sysv_transport()), &vars));
    report.finalize();

    assert_eq!(report.summary.status, RunStatus::Compliant);
    assert_eq!(report.summary.expected_failures, 3);
    assert_eq!(report.summary.failed, 0);
    assert!(report.passed());

    let json = report.to_json().unwrap();
    assert!(json.contains("\"status\": \"compliant\""));
}
