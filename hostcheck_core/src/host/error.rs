//! Command transport errors

/// Errors raised while executing a probe command against a host
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Program not found: {program}")]
    ProgramNotFound { program: String },

    #[error("Execution failed for '{program}': {reason}")]
    ExecutionFailed { program: String, reason: String },

    #[error("Command timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Permission denied: {program}")]
    PermissionDenied { program: String },

    #[error("Probe not allowed: '{program}' is not on the read-only probe allowlist")]
    ProbeNotAllowed { program: String },

    #[error("Host unreachable: {detail}")]
    HostUnreachable { detail: String },
}
