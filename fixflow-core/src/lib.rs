//! Embeddable core library for fixflow.
//!
//! Provides a clap-free, I/O-abstracted entry point suitable for linking into an editor
//! integration, a build tool or the `fixflow` CLI.
//!
//! # Port traits
//!
//! All I/O is abstracted behind port traits in [`ports`]:
//! - [`UnitSource`](ports::UnitSource): enumerate projects and their source units
//! - [`PersistenceSink`](ports::PersistenceSink): receive final unit text
//! - [`ReportSink`](ports::ReportSink): receive structured pipeline events
//!
//! The [`adapters`] module provides default filesystem, in-memory and `tracing`
//! implementations.
//!
//! # Entry points
//!
//! - [`Pipeline::run`](pipeline::Pipeline::run): drive projects through every pass
//! - [`run_format`](format::run_format): settings-driven run (format or check)

pub mod adapters;
pub mod error;
pub mod events;
pub mod format;
pub mod pipeline;
pub mod ports;
pub mod settings;

pub use error::PipelineError;
pub use pipeline::{ConfigurationDiagnostics, Pipeline};

// Re-export the plug-in surface so embedders don't need fixflow-rule-api directly.
pub use fixflow_domain::RuleRegistry;
pub use fixflow_rule_api::{AnalysisProvider, CancellationToken};
