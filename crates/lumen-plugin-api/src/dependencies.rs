//! Resolved services handed to an activation function.

use crate::{PluginError, Service, Token, TokenRef};
use lumen_core::TokenId;
use std::collections::HashMap;
use std::sync::Arc;

/// The services a plugin asked for, keyed by token identity.
///
/// Required tokens are always present when an activation function runs.
/// Optional tokens are present only when their provider activated; a
/// missing optional token reads as `None`.
#[derive(Clone, Default)]
pub struct Dependencies {
    services: HashMap<TokenId, Service>,
}

impl Dependencies {
    /// Creates an empty set of dependencies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the service resolved for `token`.
    pub fn insert(&mut self, token: &TokenRef, service: Service) {
        self.services.insert(token.id(), service);
    }

    /// Returns a required service.
    ///
    /// Fails with [`PluginError::NoProvider`] if the token was not resolved
    /// or the stored service is not a `T`.
    pub fn required<T: Send + Sync + 'static>(&self, token: &Token<T>) -> Result<Arc<T>, PluginError> {
        self.optional(token).ok_or_else(|| PluginError::NoProvider {
            token: token.name().to_string(),
        })
    }

    /// Returns an optional service, or `None` when it is unavailable.
    #[must_use]
    pub fn optional<T: Send + Sync + 'static>(&self, token: &Token<T>) -> Option<Arc<T>> {
        self.services
            .get(&token.id())
            .cloned()
            .and_then(|service| service.downcast::<T>().ok())
    }

    /// Returns true if a service was resolved for `token`.
    #[must_use]
    pub fn is_available(&self, token: &TokenRef) -> bool {
        self.services.contains_key(&token.id())
    }

    /// Number of resolved services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns true if nothing was resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl std::fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dependencies")
            .field("resolved", &self.services.len())
            .finish()
    }
}
