//! File state probes.
//!
//! Collects existence, kind, permissions, owner and size via `stat`, and
//! content via `cat`. A missing file is a distinct, assertable state; an
//! unreadable file is a probe error.

use regex::Regex;

use crate::host::CommandRunner;

use super::ProbeError;

/// File type as reported by stat %F
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileKind {
    Regular,
    Symlink,
    Directory,
    Other(String),
}

impl FileKind {
    fn from_stat(kind: &str) -> Self {
        match kind {
            "regular file" | "regular empty file" => Self::Regular,
            "symbolic link" => Self::Symlink,
            "directory" => Self::Directory,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Observed state of one path on the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileState {
    pub path: String,
    pub exists: bool,
    pub kind: Option<FileKind>,
    /// Four-digit octal mode string (e.g. "0644")
    pub mode: Option<String>,
    /// Owning user name
    pub owner: Option<String>,
    pub size: Option<u64>,
}

impl FileState {
    fn missing(path: &str) -> Self {
        Self {
            path: path.to_string(),
            exists: false,
            kind: None,
            mode: None,
            owner: None,
            size: None,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, Some(FileKind::Regular))
    }

    pub fn is_symlink(&self) -> bool {
        matches!(self.kind, Some(FileKind::Symlink))
    }
}

/// Probe the state of one path.
pub fn state(runner: &dyn CommandRunner, path: &str) -> Result<FileState, ProbeError> {
    let command = format!("stat -c '%F|%a|%U|%s' {path}");
    let output = runner.run(&command)?;

    if !output.succeeded() {
        if output.stderr.contains("No such file or directory") {
            return Ok(FileState::missing(path));
        }
        return Err(ProbeError::Unreadable {
            path: path.to_string(),
            reason: output.stderr.trim().to_string(),
        });
    }

    let line = output.stdout_trimmed();
    let fields: Vec<&str> = line.split('|').collect();
    if fields.len() != 4 {
        return Err(ProbeError::UnexpectedOutput {
            what: format!("stat of {path}"),
            output: line.to_string(),
        });
    }

    let size = fields[3]
        .parse::<u64>()
        .map_err(|_| ProbeError::UnexpectedOutput {
            what: format!("stat size of {path}"),
            output: fields[3].to_string(),
        })?;

    Ok(FileState {
        path: path.to_string(),
        exists: true,
        kind: Some(FileKind::from_stat(fields[0])),
        // stat %a drops leading zeros; normalize to the four-digit octal form
        mode: Some(format!("{:0>4}", fields[1])),
        owner: Some(fields[2].to_string()),
        size: Some(size),
    })
}

/// Fetch full file content.
pub fn content(runner: &dyn CommandRunner, path: &str) -> Result<String, ProbeError> {
    let command = format!("cat {path}");
    let output = runner.run(&command)?;

    if output.succeeded() {
        return Ok(output.stdout);
    }
    if output.stderr.contains("No such file or directory") {
        return Err(ProbeError::Missing {
            path: path.to_string(),
        });
    }
    Err(ProbeError::Unreadable {
        path: path.to_string(),
        reason: output.stderr.trim().to_string(),
    })
}

/// Whether any line of the file matches `pattern` (anchored per line, the
/// `grep -E` contract).
pub fn contains(
    runner: &dyn CommandRunner,
    path: &str,
    pattern: &str,
) -> Result<bool, ProbeError> {
    let re = Regex::new(pattern)?;
    let text = content(runner, path)?;
    Ok(text.lines().any(|line| re.is_match(line)))
}

/// Resolve a symlink's target.
pub fn link_target(runner: &dyn CommandRunner, path: &str) -> Result<String, ProbeError> {
    let command = format!("readlink {path}");
    let output = runner.run(&command)?;
    if !output.succeeded() {
        return Err(ProbeError::from_output(&command, &output));
    }
    Ok(output.stdout_trimmed().to_string())
}
