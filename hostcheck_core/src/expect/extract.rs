//! Fixed-format extraction from probe output.
//!
//! These are not general parsers: the formats (`aa-status` sections, AppArmor
//! profile capability declarations) are assumed stable, and a deviation shows
//! up as a failed assertion rather than a recoverable condition.

use regex::Regex;

/// Profile names listed under the "N profiles are in <mode> mode." section of
/// `aa-status` output.
pub fn profiles_in_mode(aa_status: &str, mode: &str) -> Vec<String> {
    let header = Regex::new(r"^(\d+) profiles are in (\w+) mode").expect("static regex");

    let mut in_section = false;
    let mut profiles = Vec::new();

    for line in aa_status.lines() {
        if let Some(caps) = header.captures(line) {
            in_section = &caps[2] == mode;
            continue;
        }
        // Any other counter line ("N processes ...") ends the section
        if line.starts_with(|c: char| c.is_ascii_digit()) {
            in_section = false;
            continue;
        }
        if in_section {
            let name = line.trim();
            if !name.is_empty() {
                profiles.push(name.to_string());
            }
        }
    }

    profiles
}

/// Capability tokens declared in an AppArmor profile
/// (lines of the form `  capability dac_override,`).
pub fn capability_tokens(profile_text: &str) -> Vec<String> {
    let re = Regex::new(r"^\s+capability\s+(\w+),$").expect("static regex");
    profile_text
        .lines()
        .filter_map(|line| re.captures(line))
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Literal case-insensitive count of lines containing the word "capability".
///
/// This is the `grep -ic capability` contract: comment lines containing the
/// word count too. Paired with per-token membership it forms the exact-set
/// check for a profile's capabilities.
pub fn capability_line_count(profile_text: &str) -> usize {
    profile_text
        .lines()
        .filter(|line| line.to_lowercase().contains("capability"))
        .count()
}
