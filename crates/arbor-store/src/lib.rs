//! Arbor Specification Store
//!
//! The trusted boundary between specification files and the rest of the
//! engine:
//! - Name → file resolution ([`SpecLocator`])
//! - YAML parsing and checksum stamping ([`parse_specification`])
//! - Concurrent TTL cache ([`SpecCache`])
//! - Deep validation with classified findings ([`Validator`])
//!
//! # Example
//!
//! ```rust,ignore
//! use arbor_store::SpecStore;
//!
//! let store = SpecStore::new("specs/");
//! let spec = store.load("auth").await?;          // specs/auth.yaml
//! let report = store.validate("auth").await?;
//! assert!(report.is_valid());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod cache;
mod error;
mod locator;
mod parser;
mod resolver;
mod store;
mod validate;

pub use cache::{CacheStats, SpecCache, DEFAULT_CAPACITY, DEFAULT_TTL};
pub use error::LoadError;
pub use locator::{SpecLocator, DEFAULT_EXTENSION};
pub use parser::{parse_document, parse_specification};
pub use resolver::{KnownModules, ModuleResolver, Resolution};
pub use store::{SpecStore, DEFAULT_MAX_FILE_SIZE};
pub use validate::{
    check_code_ref, Check, CodeRefProblem, Finding, Severity, ValidationReport, Validator,
};
