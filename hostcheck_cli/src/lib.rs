//! Compliance suites for staging hosts, exposed as a library so integration
//! tests can drive them against scripted transports.

pub mod suites;
