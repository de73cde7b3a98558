//! # Lumen Core
//!
//! Core types and error definitions for the Lumen application shell.
//! This crate provides the identifiers, the unified error type, and the
//! logging bootstrap shared by the plugin runtime and the server.

pub mod error;
pub mod id;
pub mod result;
pub mod telemetry;

pub use error::*;
pub use id::*;
pub use result::*;
