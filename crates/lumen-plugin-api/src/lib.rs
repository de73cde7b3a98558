//! # Lumen Plugin API
//!
//! Plugin API for the Lumen application shell.
//! Defines what a plugin declares about itself: the capability tokens it
//! requires, optionally consumes, and provides, together with its
//! activation function. The registry that resolves these declarations lives
//! in `lumen-plugin-runtime`.

pub mod dependencies;
pub mod descriptor;
pub mod error;
pub mod filter;
pub mod state;
pub mod token;

pub use dependencies::Dependencies;
pub use descriptor::{ActivateFn, AutoStart, PluginBuilder, PluginDescriptor, Service};
pub use error::{PluginError, PluginResult};
pub use filter::{AllowAll, FilterDecision, PluginFilter};
pub use state::{PluginInfo, PluginState};
pub use token::{Token, TokenRef};

pub use lumen_core::{PluginId, TokenId};
