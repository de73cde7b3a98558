//! # Lumen Server Library
//!
//! The application shell, the plugins that ship with it, and the bootstrap
//! that registers and activates them according to configuration.

pub mod app;
pub mod plugins;
pub mod shell;
pub mod startup;

pub use app::{Application, StartupSummary};
pub use shell::{Area, Shell, Widget};
