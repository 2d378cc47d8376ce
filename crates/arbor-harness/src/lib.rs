//! Arbor Test Harness
//!
//! Exercises the components a specification describes.
//!
//! - [`ComponentProbe`] / [`ProbeRunner`]: timeout-bounded component checks
//! - [`MockGenerator`]: behavioral mocks synthesized from declared functions
//! - [`TreeTester`]: breadth-first coverage, depth-first isolation, performance
//! - [`DebugEngine`]: classification, isolation and root-cause analysis of a
//!   reported failure
//!
//! # Example
//!
//! ```rust,ignore
//! use arbor_harness::{ProbeRunner, StructuralProbe, TreeTester, TreeTestOptions};
//!
//! let probe = StructuralProbe::new("src/", resolver);
//! let tester = TreeTester::new(ProbeRunner::new(Arc::new(probe)));
//! let results = tester.run(&spec, &TreeTestOptions::default()).await?;
//! println!("coverage {:.1}%", results.coverage.coverage * 100.0);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod classify;
pub mod debug;
mod mock;
mod probe;
pub mod tree;

pub use classify::FailureType;
pub use debug::{
    DebugEngine, DebugError, DebugFailure, DebugOptions, DebugResults, DebugStage, FailureContext,
};
pub use mock::{BehavioralMock, MockBehavior, MockFunction, MockGenerator, MockSet};
pub use probe::{
    ComponentProbe, Measurements, ProbeMode, ProbeOutcome, ProbeRequest, ProbeRunner,
    StructuralProbe, DEFAULT_PROBE_TIMEOUT,
};
pub use tree::{
    quality_score, CoverageReport, TreeFailure, TreeStage, TreeTestError, TreeTestOptions,
    TreeTestResults, TreeTester,
};
