//! Plugin descriptors and their builder.

use crate::{Dependencies, PluginError, Token, TokenRef};
use futures::future::BoxFuture;
use lumen_core::PluginId;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// A type-erased service produced by an activation function.
pub type Service = Arc<dyn Any + Send + Sync>;

/// Type-erased activation function.
pub type ActivateFn<A> =
    Arc<dyn Fn(Arc<A>, Dependencies) -> BoxFuture<'static, anyhow::Result<Service>> + Send + Sync>;

/// When a plugin is activated without anyone asking for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoStart {
    /// Only on demand.
    #[default]
    Never,
    /// During bootstrap.
    Always,
    /// In the deferred phase that follows bootstrap.
    Defer,
}

impl From<bool> for AutoStart {
    fn from(auto_start: bool) -> Self {
        if auto_start {
            Self::Always
        } else {
            Self::Never
        }
    }
}

/// Static declaration of a plugin, generic over the application handle `A`.
pub struct PluginDescriptor<A> {
    id: PluginId,
    description: Option<String>,
    requires: Vec<TokenRef>,
    optional: Vec<TokenRef>,
    provides: Option<TokenRef>,
    auto_start: AutoStart,
    activate: ActivateFn<A>,
}

impl<A: Send + Sync + 'static> PluginDescriptor<A> {
    /// Starts building a descriptor for `id`.
    pub fn builder(id: impl Into<PluginId>) -> PluginBuilder<A> {
        PluginBuilder::new(id.into())
    }
}

impl<A> PluginDescriptor<A> {
    #[must_use]
    pub const fn id(&self) -> &PluginId {
        &self.id
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Required tokens, in declaration order.
    #[must_use]
    pub fn requires(&self) -> &[TokenRef] {
        &self.requires
    }

    #[must_use]
    pub fn optional(&self) -> &[TokenRef] {
        &self.optional
    }

    #[must_use]
    pub const fn provides(&self) -> Option<&TokenRef> {
        self.provides.as_ref()
    }

    #[must_use]
    pub const fn auto_start(&self) -> AutoStart {
        self.auto_start
    }

    /// Invokes the activation function. The registry calls this exactly once.
    pub fn invoke(&self, app: Arc<A>, deps: Dependencies) -> BoxFuture<'static, anyhow::Result<Service>> {
        (self.activate)(app, deps)
    }
}

impl<A> Clone for PluginDescriptor<A> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            description: self.description.clone(),
            requires: self.requires.clone(),
            optional: self.optional.clone(),
            provides: self.provides.clone(),
            auto_start: self.auto_start,
            activate: Arc::clone(&self.activate),
        }
    }
}

impl<A> fmt::Debug for PluginDescriptor<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("id", &self.id)
            .field("requires", &self.requires)
            .field("optional", &self.optional)
            .field("provides", &self.provides)
            .field("auto_start", &self.auto_start)
            .finish_non_exhaustive()
    }
}

/// Builder for [`PluginDescriptor`].
///
/// ```
/// use lumen_plugin_api::{AutoStart, PluginDescriptor, Token};
///
/// struct Shell;
/// struct Settings { theme: String }
///
/// let settings = Token::<Settings>::new("@lumen/settings:ISettings");
///
/// let plugin = PluginDescriptor::<Shell>::builder("@lumen/settings:plugin")
///     .description("Settings registry")
///     .provides(&settings)
///     .auto_start(AutoStart::Always)
///     .activate(|_app, _deps| async { Ok(Settings { theme: "dark".into() }) })
///     .build()
///     .unwrap();
///
/// assert_eq!(plugin.provides(), Some(settings.erased()));
/// ```
pub struct PluginBuilder<A> {
    id: PluginId,
    description: Option<String>,
    requires: Vec<TokenRef>,
    optional: Vec<TokenRef>,
    provides: Option<TokenRef>,
    auto_start: AutoStart,
    activate: Option<ActivateFn<A>>,
}

impl<A: Send + Sync + 'static> PluginBuilder<A> {
    fn new(id: PluginId) -> Self {
        Self {
            id,
            description: None,
            requires: Vec::new(),
            optional: Vec::new(),
            provides: None,
            auto_start: AutoStart::Never,
            activate: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a required token. Required tokens resolve in the order they are added.
    #[must_use]
    pub fn requires<T>(mut self, token: &Token<T>) -> Self {
        self.requires.push(token.into());
        self
    }

    /// Adds an optional token.
    #[must_use]
    pub fn optional<T>(mut self, token: &Token<T>) -> Self {
        self.optional.push(token.into());
        self
    }

    /// Sets the token this plugin's service satisfies.
    #[must_use]
    pub fn provides<T>(mut self, token: &Token<T>) -> Self {
        self.provides = Some(token.into());
        self
    }

    #[must_use]
    pub fn auto_start(mut self, auto_start: impl Into<AutoStart>) -> Self {
        self.auto_start = auto_start.into();
        self
    }

    /// Sets the activation function.
    ///
    /// The returned value becomes the plugin's service. Plugins that provide
    /// nothing usually return `()`.
    #[must_use]
    pub fn activate<F, Fut, S>(mut self, activate: F) -> Self
    where
        F: Fn(Arc<A>, Dependencies) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<S>> + Send + 'static,
        S: Send + Sync + 'static,
    {
        let erased: ActivateFn<A> = Arc::new(
            move |app: Arc<A>, deps: Dependencies| -> BoxFuture<'static, anyhow::Result<Service>> {
                let fut = activate(app, deps);
                Box::pin(async move {
                    let service = fut.await?;
                    Ok(Arc::new(service) as Service)
                })
            },
        );
        self.activate = Some(erased);
        self
    }

    /// Validates and builds the descriptor.
    pub fn build(self) -> Result<PluginDescriptor<A>, PluginError> {
        let invalid = |reason: &str| PluginError::InvalidDescriptor {
            id: self.id.clone(),
            reason: reason.to_string(),
        };

        if self.id.as_str().trim().is_empty() {
            return Err(invalid("plugin id must not be empty"));
        }

        let mut seen = HashSet::new();
        for token in self.requires.iter().chain(&self.optional) {
            if !seen.insert(token.id()) {
                return Err(invalid(&format!("token '{}' is listed more than once", token)));
            }
        }

        if let Some(provided) = &self.provides {
            if seen.contains(&provided.id()) {
                return Err(invalid(&format!("plugin depends on the token it provides ('{}')", provided)));
            }
        }

        let Some(activate) = self.activate.clone() else {
            return Err(invalid("missing activation function"));
        };

        Ok(PluginDescriptor {
            id: self.id,
            description: self.description,
            requires: self.requires,
            optional: self.optional,
            provides: self.provides,
            auto_start: self.auto_start,
            activate,
        })
    }
}
