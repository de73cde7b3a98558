//! # Lumen Plugin Runtime
//!
//! Plugin registry for the Lumen application shell.
//! Resolves token dependencies between plugins, activates each plugin at
//! most once, and runs the bulk and deferred activation passes used at
//! bootstrap.

pub mod diagnostics;
pub mod filter;
pub mod metrics;
pub mod registry;
pub mod report;
mod scope;

pub use diagnostics::{EdgeKind, MissingProvider, RegistryDiagnostics};
pub use filter::PatternFilter;
pub use registry::PluginRegistry;
pub use report::{ActivationReport, PluginFailure};
