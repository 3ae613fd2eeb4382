//! Kernel parameter probes with typed values.

use crate::host::CommandRunner;

use super::ProbeError;

/// A sysctl value, numeric where the kernel reports a number
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SysctlValue {
    Int(i64),
    Str(String),
}

impl SysctlValue {
    fn parse(raw: &str) -> Self {
        match raw.parse::<i64>() {
            Ok(n) => Self::Int(n),
            Err(_) => Self::Str(raw.to_string()),
        }
    }
}

impl std::fmt::Display for SysctlValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "{s}"),
        }
    }
}

/// Read one sysctl key.
pub fn value(runner: &dyn CommandRunner, key: &str) -> Result<SysctlValue, ProbeError> {
    let command = format!("sysctl -n {key}");
    let output = runner.run(&command)?;
    if !output.succeeded() {
        return Err(ProbeError::from_output(&command, &output));
    }
    Ok(SysctlValue::parse(output.stdout_trimmed().trim()))
}
