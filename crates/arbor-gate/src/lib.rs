//! Arbor Integration Gate
//!
//! A pseudo-compiler that decides whether a new component may join a
//! running system. Four mandatory stages, each able to reject:
//!
//! 1. Specification validation (required fields, tree shape, dependency resolution)
//! 2. Hierarchical testing of every leaf
//! 3. Compatibility with the existing dependency graph
//! 4. Quality gates (coverage, documentation, security scan)
//!
//! Unlike the tree tester, the gate is a one-time admission check.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod compat;
mod gate;
mod report;
mod rules;
mod security;

pub use compat::{Conflict, SUPERVISION_STRATEGIES};
pub use gate::IntegrationGate;
pub use report::{Approval, GateStage, LeafFailure, Rejection, Violation};
pub use rules::{GateOptions, IntegrationRules, DEFAULT_MIN_COVERAGE};
pub use security::{ScanReport, SecurityFinding, SecurityRule, SecurityScanner};
