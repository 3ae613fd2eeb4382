//! # hostcheck - Host Assertion Runner
//!
//! A uniform interface for running read-only inspections against a local or
//! remote host and comparing the results to declared expectations. Probes are
//! pure observations; expectations are pure data; every assertion records an
//! independent pass/fail with full diagnostic context.

pub mod expect;
pub mod host;
pub mod inventory;
pub mod probes;
pub mod runner;
pub mod vars;

// Convenience re-exports
pub use host::{CommandRunner, Host};
pub use runner::{CaseSet, Checked, Outcome};

pub mod prelude {
    pub use crate::expect::{compare, extract, Comparison, Expected};
    pub use crate::host::{
        CommandError, CommandOutput, CommandRunner, CommandTransport, Elevated, Host,
        HostIdentity, InitSystem, LocalTransport, ProbeAllowlist, ScriptedTransport, SshTransport,
    };
    pub use crate::inventory::{Inventory, InventoryError, Target};
    pub use crate::probes::{
        self, EnabledState, FileKind, FileState, ProbeError, ServiceState, SysctlValue,
    };
    pub use crate::runner::report::{RunReport, RunStatus, ScannerContext, Summary};
    pub use crate::runner::{CaseRecord, CaseSet, Checked, Outcome};
    pub use crate::vars::{TestVars, VarsError};
}
