//! Arbor Coordinating Engine
//!
//! Thin façade over the arbor components:
//! - [`EngineConfig`]: TOML configuration with validation
//! - [`Engine`]: load, validate, tree-test, debug and gate specifications,
//!   with per-specification request serialization and session tracking
//! - [`EngineError`]: one tagged error for every entry point
//!
//! # Example
//!
//! ```rust,ignore
//! use arbor_core::{Engine, EngineConfig};
//!
//! let config = EngineConfig::from_toml_file("arbor.toml")?;
//! let engine = Engine::new(config)?;
//! let results = engine.run_tree_tests("auth").await?;
//! let approval = engine.analyze_integration("billing").await?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod config;
mod engine;
mod error;
mod session;
mod source;

pub use config::{
    ConfigError, DebugConfig, EngineConfig, GateConfig, StoreConfig, SyncConfig, TreeTestConfig,
};
pub use engine::Engine;
pub use error::{EngineError, PipelineStage};
pub use session::{SessionGuard, SessionInfo, SessionKind, SessionRegistry, SpecLocks};
pub use source::StoreSpecSource;
