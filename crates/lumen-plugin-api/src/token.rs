//! Capability tokens.

use lumen_core::TokenId;
use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

/// Type-erased view of a [`Token`].
///
/// Equality and hashing use the token identity only, never the name.
#[derive(Clone)]
pub struct TokenRef {
    id: TokenId,
    name: Arc<str>,
    type_id: TypeId,
    type_name: &'static str,
}

impl TokenRef {
    /// Returns the token identity.
    #[must_use]
    pub const fn id(&self) -> TokenId {
        self.id
    }

    /// Returns the human-readable token name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the `TypeId` of the service this token stands for.
    #[must_use]
    pub const fn service_type(&self) -> TypeId {
        self.type_id
    }

    /// Returns the type name of the service this token stands for.
    #[must_use]
    pub const fn service_type_name(&self) -> &'static str {
        self.type_name
    }
}

impl PartialEq for TokenRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TokenRef {}

impl Hash for TokenRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TokenRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRef")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("type", &self.type_name)
            .finish()
    }
}

impl fmt::Display for TokenRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A capability token naming a service of type `T`.
///
/// Tokens are compared by identity: each call to [`Token::new`] creates a
/// distinct capability, even when the names collide. Clones share identity.
///
/// ```
/// use lumen_plugin_api::Token;
///
/// struct Settings;
///
/// let a = Token::<Settings>::new("@lumen/settings:ISettings");
/// let b = Token::<Settings>::new("@lumen/settings:ISettings");
/// assert_ne!(a, b);
/// assert_eq!(a, a.clone());
/// ```
pub struct Token<T> {
    inner: TokenRef,
    _service: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> Token<T> {
    /// Creates a new, globally unique token.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: TokenRef {
                id: TokenId::new(),
                name: Arc::from(name.into()),
                type_id: TypeId::of::<T>(),
                type_name: std::any::type_name::<T>(),
            },
            _service: PhantomData,
        }
    }
}

impl<T> Token<T> {
    /// Returns the type-erased token.
    #[must_use]
    pub const fn erased(&self) -> &TokenRef {
        &self.inner
    }

    /// Returns the token identity.
    #[must_use]
    pub const fn id(&self) -> TokenId {
        self.inner.id
    }

    /// Returns the token name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.inner.name()
    }
}

impl<T> Clone for Token<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _service: PhantomData,
        }
    }
}

impl<T> PartialEq for Token<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<T> Eq for Token<T> {}

impl<T> fmt::Debug for Token<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}

impl<T> From<&Token<T>> for TokenRef {
    fn from(token: &Token<T>) -> Self {
        token.inner.clone()
    }
}
