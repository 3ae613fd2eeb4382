//! Suite registry.
//!
//! Each suite is a plain function from a connected host plus declared
//! expectations to an independent set of case records. The registry maps
//! suites to the roles they apply to; selection happens here so the runner
//! stays a dumb loop.

use hostcheck_core::prelude::*;

pub mod apparmor;
pub mod grsecurity;
pub mod tor;

pub type SuiteFn = fn(&Host, &TestVars) -> CaseSet;

pub struct SuiteDef {
    pub name: &'static str,
    /// Roles the suite applies to; empty means every role
    pub roles: &'static [&'static str],
    pub run: SuiteFn,
}

impl SuiteDef {
    pub fn applies_to(&self, role: &str) -> bool {
        self.roles.is_empty() || self.roles.contains(&role)
    }
}

pub const SUITES: &[SuiteDef] = &[
    SuiteDef {
        name: apparmor::NAME,
        roles: &["app-staging"],
        run: apparmor::run,
    },
    SuiteDef {
        name: grsecurity::NAME,
        roles: &[],
        run: grsecurity::run,
    },
    SuiteDef {
        name: tor::NAME,
        roles: &["app-staging"],
        run: tor::run,
    },
];

/// Suites applicable to `role`, narrowed to `filter` names when non-empty.
/// Registry order is preserved so runs are deterministic.
pub fn suites_for<'a>(role: &str, filter: &[String]) -> Vec<&'a SuiteDef> {
    SUITES
        .iter()
        .filter(|s| s.applies_to(role))
        .filter(|s| filter.is_empty() || filter.iter().any(|f| f == s.name))
        .collect()
}
