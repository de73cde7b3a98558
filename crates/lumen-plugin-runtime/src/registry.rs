//! Plugin registry: registration, dependency planning, and memoized activation.
//!
//! Activation is planned synchronously under the registry lock. Planning walks
//! the `requires` and `optional` edges depth-first, detects cycles, and builds
//! one shared future per plugin. The futures are awaited after the lock is
//! released, so an activation body may call back into the registry.

use crate::metrics::PluginMetrics;
use crate::report::ActivationReport;
use crate::scope::{self, ActivationScope};
use chrono::{DateTime, Utc};
use futures::future::{self, BoxFuture, FutureExt, Shared};
use indexmap::{IndexMap, IndexSet};
use lumen_core::TokenId;
use lumen_plugin_api::{
    AllowAll, AutoStart, Dependencies, FilterDecision, PluginDescriptor, PluginError, PluginFilter,
    PluginId, PluginInfo, PluginResult, PluginState, Service, Token, TokenRef,
};
use parking_lot::RwLock;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Memoized activation shared by every caller that asks for a plugin.
type Activation = Shared<BoxFuture<'static, PluginResult<Service>>>;

/// A planned dependency edge: the token, its provider, and the provider's activation.
type Edge = (TokenRef, PluginId, Activation);

type StateRef<A> = Weak<RwLock<RegistryState<A>>>;

struct PluginEntry<A> {
    descriptor: Arc<PluginDescriptor<A>>,
    /// Identity of this registration. A re-registered plugin gets a new one,
    /// and activations of the old registration no longer write back.
    generation: u64,
    state: PluginState,
    activation: Option<Activation>,
    error: Option<PluginError>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    started_seq: Option<u64>,
    finished_seq: Option<u64>,
}

impl<A> PluginEntry<A> {
    fn new(descriptor: PluginDescriptor<A>, generation: u64) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            generation,
            state: PluginState::Pending,
            activation: None,
            error: None,
            started_at: None,
            finished_at: None,
            started_seq: None,
            finished_seq: None,
        }
    }

    fn info(&self) -> PluginInfo {
        let descriptor = &self.descriptor;
        let names = |tokens: &[TokenRef]| -> Vec<String> {
            tokens.iter().map(|t| t.name().to_string()).collect()
        };

        PluginInfo {
            id: descriptor.id().clone(),
            description: descriptor.description().map(str::to_string),
            state: self.state,
            auto_start: descriptor.auto_start(),
            provides: descriptor.provides().map(|t| t.name().to_string()),
            requires: names(descriptor.requires()),
            optional: names(descriptor.optional()),
            started_at: self.started_at,
            finished_at: self.finished_at,
            started_seq: self.started_seq,
            finished_seq: self.finished_seq,
            error: self.error.as_ref().map(ToString::to_string),
        }
    }
}

struct RegistryState<A> {
    /// Registered plugins in registration order.
    plugins: IndexMap<PluginId, PluginEntry<A>>,
    /// Token identity to the id of the plugin that provides it.
    providers: HashMap<TokenId, PluginId>,
    /// Plugins held back for `activate_deferred`.
    deferred: IndexSet<PluginId>,
    /// Unfinished plugins to the plugins whose activations they await,
    /// both planned edges and re-entrant requests from activation bodies.
    waits_on: HashMap<PluginId, Vec<PluginId>>,
    generations: u64,
    sequence: u64,
}

impl<A> RegistryState<A> {
    fn new() -> Self {
        Self {
            plugins: IndexMap::new(),
            providers: HashMap::new(),
            deferred: IndexSet::new(),
            waits_on: HashMap::new(),
            generations: 0,
            sequence: 0,
        }
    }

    fn entry_mut(&mut self, id: &PluginId, generation: u64) -> Option<&mut PluginEntry<A>> {
        self.plugins
            .get_mut(id)
            .filter(|entry| entry.generation == generation)
    }

    fn record_wait(&mut self, waiter: &PluginId, target: &PluginId) {
        let targets = self.waits_on.entry(waiter.clone()).or_default();
        if !targets.contains(target) {
            targets.push(target.clone());
        }
    }

    /// Path `from -> .. -> to` through unfinished activations, if `from` waits on `to`.
    fn wait_path(&self, from: &PluginId, to: &PluginId) -> Option<Vec<PluginId>> {
        let mut visited = HashSet::new();
        let mut stack = vec![vec![from.clone()]];

        while let Some(path) = stack.pop() {
            let Some(last) = path.last() else { continue };
            if last == to {
                return Some(path);
            }
            if !visited.insert(last.clone()) {
                continue;
            }
            for next in self.waits_on.get(last).into_iter().flatten() {
                let mut extended = path.clone();
                extended.push(next.clone());
                stack.push(extended);
            }
        }
        None
    }

    fn mark_activating(&mut self, id: &PluginId, generation: u64) {
        if let Some(entry) = self.entry_mut(id, generation) {
            if entry.state == PluginState::Pending {
                entry.state = PluginState::Activating;
                debug!(plugin_id = %id, "Plugin activating");
            }
        }
    }

    fn mark_body_started(&mut self, id: &PluginId, generation: u64) {
        let seq = self.sequence + 1;
        if let Some(entry) = self.entry_mut(id, generation) {
            entry.started_seq = Some(seq);
            entry.started_at = Some(Utc::now());
            self.sequence = seq;
        }
    }

    fn finish(&mut self, id: &PluginId, generation: u64, result: &PluginResult<Service>, elapsed: Duration) {
        let seq = self.sequence + 1;
        let Some(entry) = self.entry_mut(id, generation) else {
            debug!(plugin_id = %id, "Discarding activation result of a replaced registration");
            return;
        };

        entry.finished_seq = Some(seq);
        entry.finished_at = Some(Utc::now());

        match result {
            Ok(_) => {
                entry.state = PluginState::Activated;
                info!(
                    plugin_id = %id,
                    duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                    "Plugin activated"
                );
                PluginMetrics::activated(id.as_str(), elapsed);
            }
            Err(error) => {
                entry.state = PluginState::Failed;
                entry.error = Some(error.clone());
                warn!(
                    plugin_id = %id,
                    error_code = error.error_code(),
                    error = %error,
                    "Plugin activation failed"
                );
                PluginMetrics::failed(id.as_str(), error.error_code(), elapsed);
            }
        }

        self.sequence = seq;
        self.waits_on.remove(id);
    }
}

fn update_state<A>(state: &StateRef<A>, update: impl FnOnce(&mut RegistryState<A>)) {
    if let Some(state) = state.upgrade() {
        update(&mut state.write());
    }
}

/// Static view of one plugin's edges, used by diagnostics.
#[derive(Debug, Clone)]
pub(crate) struct PluginNode {
    pub id: PluginId,
    pub requires: Vec<TokenRef>,
    pub optional: Vec<TokenRef>,
}

/// Registry of plugins for an application handle of type `A`.
///
/// Cloning is cheap; clones share the same plugins and activation state.
pub struct PluginRegistry<A> {
    app: Arc<A>,
    state: Arc<RwLock<RegistryState<A>>>,
}

impl<A> Clone for PluginRegistry<A> {
    fn clone(&self) -> Self {
        Self {
            app: Arc::clone(&self.app),
            state: Arc::clone(&self.state),
        }
    }
}

impl<A: Send + Sync + 'static> PluginRegistry<A> {
    /// Creates an empty registry around the application handle.
    pub fn new(app: Arc<A>) -> Self {
        Self {
            app,
            state: Arc::new(RwLock::new(RegistryState::new())),
        }
    }

    /// The application handle passed to every activation function.
    pub fn app(&self) -> &Arc<A> {
        &self.app
    }

    /// Registers a plugin. Nothing is activated.
    pub fn register(&self, descriptor: PluginDescriptor<A>) -> PluginResult<()> {
        let mut state = self.state.write();
        let id = descriptor.id().clone();

        if state.plugins.contains_key(&id) {
            return Err(PluginError::DuplicateId { id });
        }

        let provided = descriptor.provides().map(|token| (token.id(), token.name().to_string()));
        if let Some((token_id, token_name)) = &provided {
            if let Some(existing) = state.providers.get(token_id) {
                return Err(PluginError::DuplicateProvider {
                    token: token_name.clone(),
                    existing: existing.clone(),
                    rejected: id,
                });
            }
        }

        if let Some((token_id, _)) = provided {
            state.providers.insert(token_id, id.clone());
        }

        state.generations += 1;
        let generation = state.generations;
        let auto_start = descriptor.auto_start();
        state.plugins.insert(id.clone(), PluginEntry::new(descriptor, generation));

        debug!(plugin_id = %id, auto_start = ?auto_start, "Plugin registered");
        PluginMetrics::registered(id.as_str(), state.plugins.len());

        Ok(())
    }

    /// Registers every descriptor in order, collecting the errors.
    pub fn register_all(&self, descriptors: impl IntoIterator<Item = PluginDescriptor<A>>) -> Vec<PluginError> {
        descriptors
            .into_iter()
            .filter_map(|descriptor| self.register(descriptor).err())
            .collect()
    }

    /// Removes a plugin and its provider index.
    ///
    /// Activated or activating plugins are only removed with `force`.
    /// Dependents that already hold the plugin's service keep it.
    pub fn deregister(&self, id: &PluginId, force: bool) -> PluginResult<PluginDescriptor<A>> {
        let mut state = self.state.write();

        let entry_state = state
            .plugins
            .get(id)
            .map(|entry| entry.state)
            .ok_or_else(|| PluginError::UnknownPlugin { id: id.clone() })?;

        if !force && matches!(entry_state, PluginState::Activated | PluginState::Activating) {
            return Err(PluginError::StillActivated { id: id.clone() });
        }

        let Some(entry) = state.plugins.shift_remove(id) else {
            return Err(PluginError::UnknownPlugin { id: id.clone() });
        };

        if let Some(token) = entry.descriptor.provides() {
            if state.providers.get(&token.id()) == Some(id) {
                state.providers.remove(&token.id());
            }
        }
        state.deferred.shift_remove(id);
        state.waits_on.remove(id);

        info!(plugin_id = %id, state = %entry_state, force, "Plugin deregistered");
        PluginMetrics::deregistered(id.as_str(), state.plugins.len());

        Ok(PluginDescriptor::clone(&entry.descriptor))
    }

    /// Activates a plugin and, first, everything it depends on.
    ///
    /// Returns the plugin's service if it provides a token, `None` otherwise.
    /// Results are cached: a second call returns the same service or error
    /// without running anything.
    pub async fn activate(&self, id: &PluginId) -> PluginResult<Option<Service>> {
        let (activation, provides) = {
            let mut state = self.state.write();
            let activation = self.plan_root(&mut state, id)?;
            let provides = state
                .plugins
                .get(id)
                .map_or(false, |entry| entry.descriptor.provides().is_some());
            (activation, provides)
        };

        let service = activation.await?;
        Ok(provides.then_some(service))
    }

    /// Activates auto-start plugins, or every plugin when `auto_start_only` is false.
    pub async fn activate_all(&self, auto_start_only: bool) -> ActivationReport {
        self.activate_all_with(auto_start_only, &AllowAll).await
    }

    /// Like [`activate_all`](Self::activate_all), with a filter deciding per plugin.
    ///
    /// Independent plugins activate concurrently. Failures are collected in
    /// the report and never abort the pass.
    pub async fn activate_all_with(&self, auto_start_only: bool, filter: &dyn PluginFilter) -> ActivationReport {
        let mut report = ActivationReport::default();

        let planned = {
            let mut state = self.state.write();
            let candidates: Vec<(PluginId, AutoStart)> = state
                .plugins
                .iter()
                .map(|(id, entry)| (id.clone(), entry.descriptor.auto_start()))
                .collect();

            let mut planned = Vec::with_capacity(candidates.len());
            for (id, auto_start) in candidates {
                let eager = match auto_start {
                    AutoStart::Always => true,
                    AutoStart::Defer => !auto_start_only,
                    AutoStart::Never if auto_start_only => continue,
                    AutoStart::Never => true,
                };

                let decision = match filter.decide(&id) {
                    FilterDecision::Enabled if !eager => FilterDecision::Deferred,
                    decision => decision,
                };

                match decision {
                    FilterDecision::Disabled => {
                        debug!(plugin_id = %id, "Plugin disabled by filter");
                        report.skipped.push(id);
                    }
                    FilterDecision::Deferred => {
                        debug!(plugin_id = %id, "Plugin deferred");
                        state.deferred.insert(id.clone());
                        report.deferred.push(id);
                    }
                    FilterDecision::Enabled => match self.plan_root(&mut state, &id) {
                        Ok(activation) => planned.push((id, activation)),
                        Err(error) => report.record(id, Err(error)),
                    },
                }
            }
            planned
        };

        await_all(planned, &mut report).await;
        info!(%report, "Plugin activation pass finished");
        report
    }

    /// Activates every plugin held back by earlier bulk passes and clears the list.
    pub async fn activate_deferred(&self) -> ActivationReport {
        let mut report = ActivationReport::default();

        let planned = {
            let mut state = self.state.write();
            let ids: Vec<PluginId> = state.deferred.drain(..).collect();

            let mut planned = Vec::with_capacity(ids.len());
            for id in ids {
                match self.plan_root(&mut state, &id) {
                    Ok(activation) => planned.push((id, activation)),
                    Err(error) => report.record(id, Err(error)),
                }
            }
            planned
        };

        await_all(planned, &mut report).await;
        info!(%report, "Deferred plugin activation finished");
        report
    }

    /// Activates the provider of `token` and returns its service.
    pub async fn resolve<T: Send + Sync + 'static>(&self, token: &Token<T>) -> PluginResult<Arc<T>> {
        let no_provider = || PluginError::NoProvider {
            token: token.name().to_string(),
        };

        let provider = self.provider_of(token.erased()).ok_or_else(no_provider)?;
        let service = self.activate(&provider).await?.ok_or_else(no_provider)?;

        service.downcast::<T>().map_err(|_| {
            PluginError::activation(
                provider,
                anyhow::anyhow!(
                    "service for '{}' is not a {}",
                    token.name(),
                    std::any::type_name::<T>()
                ),
            )
        })
    }

    /// Like [`resolve`](Self::resolve), returning `None` instead of an error.
    pub async fn resolve_optional<T: Send + Sync + 'static>(&self, token: &Token<T>) -> Option<Arc<T>> {
        match self.resolve(token).await {
            Ok(service) => Some(service),
            Err(error) => {
                debug!(token = %token.name(), error = %error, "Optional service unavailable");
                None
            }
        }
    }

    /// Plans `id` on behalf of whoever asked.
    ///
    /// A request made from inside an activation body is a dependency of that
    /// plugin, so it goes through the same cycle checks as a planned edge.
    fn plan_root(&self, state: &mut RegistryState<A>, id: &PluginId) -> PluginResult<Activation> {
        let Some(caller) = scope::current(self.key()) else {
            return self.plan(state, id, &mut Vec::new());
        };

        state.record_wait(&caller, id);
        self.plan_edge(state, id, &mut vec![caller])
    }

    /// Builds (or reuses) the activation future for `id`.
    fn plan(
        &self,
        state: &mut RegistryState<A>,
        id: &PluginId,
        chain: &mut Vec<PluginId>,
    ) -> PluginResult<Activation> {
        let entry = state
            .plugins
            .get(id)
            .ok_or_else(|| PluginError::UnknownPlugin { id: id.clone() })?;

        if let Some(activation) = &entry.activation {
            return Ok(activation.clone());
        }

        let descriptor = Arc::clone(&entry.descriptor);
        let generation = entry.generation;

        chain.push(id.clone());
        let edges = self.plan_edges(state, &descriptor, chain);
        chain.pop();

        let activation = match edges {
            Ok((required, optional)) => {
                for (_, provider, _) in required.iter().chain(&optional) {
                    state.record_wait(id, provider);
                }
                self.activation_future(descriptor, generation, required, optional)
            }
            Err(error) => {
                // Failures found while planning never reach the activation body.
                state.finish(id, generation, &Err(error.clone()), Duration::ZERO);
                future::ready(Err::<Service, _>(error)).boxed().shared()
            }
        };

        if let Some(entry) = state.entry_mut(id, generation) {
            entry.activation = Some(activation.clone());
        }
        Ok(activation)
    }

    fn plan_edges(
        &self,
        state: &mut RegistryState<A>,
        descriptor: &PluginDescriptor<A>,
        chain: &mut Vec<PluginId>,
    ) -> PluginResult<(Vec<Edge>, Vec<Edge>)> {
        let plugin = descriptor.id();

        let mut required = Vec::with_capacity(descriptor.requires().len());
        for token in descriptor.requires() {
            let Some(provider) = state.providers.get(&token.id()).cloned() else {
                return Err(PluginError::dependency_failed(
                    plugin.clone(),
                    token.name(),
                    PluginError::NoProvider {
                        token: token.name().to_string(),
                    },
                ));
            };
            let activation = self.plan_edge(state, &provider, chain)?;
            required.push((token.clone(), provider, activation));
        }

        let mut optional = Vec::with_capacity(descriptor.optional().len());
        for token in descriptor.optional() {
            let Some(provider) = state.providers.get(&token.id()).cloned() else {
                debug!(plugin_id = %plugin, token = %token, "Optional token has no provider");
                continue;
            };
            let activation = self.plan_edge(state, &provider, chain)?;
            optional.push((token.clone(), provider, activation));
        }

        Ok((required, optional))
    }

    fn plan_edge(
        &self,
        state: &mut RegistryState<A>,
        provider: &PluginId,
        chain: &mut Vec<PluginId>,
    ) -> PluginResult<Activation> {
        if let Some(start) = chain.iter().position(|id| id == provider) {
            let mut cycle = chain[start..].to_vec();
            cycle.push(provider.clone());
            return Err(PluginError::CyclicDependency { cycle });
        }

        // An activation already in flight that waits on the dependent.
        if let Some(dependent) = chain.last() {
            if let Some(path) = state.wait_path(provider, dependent) {
                let mut cycle = vec![dependent.clone()];
                cycle.extend(path);
                return Err(PluginError::CyclicDependency { cycle });
            }
        }

        self.plan(state, provider, chain)
    }

    fn activation_future(
        &self,
        descriptor: Arc<PluginDescriptor<A>>,
        generation: u64,
        required: Vec<Edge>,
        optional: Vec<Edge>,
    ) -> Activation {
        let state = Arc::downgrade(&self.state);
        let app = Arc::clone(&self.app);
        let plugin = descriptor.id().clone();

        let activation = async move {
            let id = descriptor.id().clone();
            let started = Instant::now();
            update_state(&state, |s| s.mark_activating(&id, generation));

            let result = run_activation(app, &state, &descriptor, generation, required, optional).await;

            update_state(&state, |s| s.finish(&id, generation, &result, started.elapsed()));
            result
        }
        .boxed();

        ActivationScope::new(self.key(), plugin, activation).boxed().shared()
    }

    /// Identifies this registry's activations on the polling stack.
    fn key(&self) -> usize {
        Arc::as_ptr(&self.state) as usize
    }
}

impl<A> PluginRegistry<A> {
    /// Returns true if a plugin with this id is registered.
    pub fn has_plugin(&self, id: &PluginId) -> bool {
        self.state.read().plugins.contains_key(id)
    }

    /// Returns true if the plugin finished activating successfully.
    pub fn is_activated(&self, id: &PluginId) -> bool {
        self.state(id) == Some(PluginState::Activated)
    }

    /// Lifecycle state of a plugin.
    pub fn state(&self, id: &PluginId) -> Option<PluginState> {
        self.state.read().plugins.get(id).map(|entry| entry.state)
    }

    /// Snapshot of a single plugin.
    pub fn plugin_info(&self, id: &PluginId) -> Option<PluginInfo> {
        self.state.read().plugins.get(id).map(PluginEntry::info)
    }

    /// Snapshots of every plugin, in registration order.
    pub fn plugins_info(&self) -> Vec<PluginInfo> {
        self.state.read().plugins.values().map(PluginEntry::info).collect()
    }

    /// Registered plugin ids, in registration order.
    pub fn list_plugins(&self) -> Vec<PluginId> {
        self.state.read().plugins.keys().cloned().collect()
    }

    /// Id of the plugin providing `token`.
    pub fn provider_of(&self, token: &TokenRef) -> Option<PluginId> {
        self.state.read().providers.get(&token.id()).cloned()
    }

    /// Plugins waiting for `activate_deferred`.
    pub fn deferred_plugins(&self) -> Vec<PluginId> {
        self.state.read().deferred.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().plugins.is_empty()
    }

    pub(crate) fn graph_snapshot(&self) -> (Vec<PluginNode>, HashMap<TokenId, PluginId>) {
        let state = self.state.read();
        let nodes = state
            .plugins
            .values()
            .map(|entry| PluginNode {
                id: entry.descriptor.id().clone(),
                requires: entry.descriptor.requires().to_vec(),
                optional: entry.descriptor.optional().to_vec(),
            })
            .collect();
        (nodes, state.providers.clone())
    }
}

impl<A> fmt::Debug for PluginRegistry<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("PluginRegistry")
            .field("plugins", &state.plugins.len())
            .field("providers", &state.providers.len())
            .field("deferred", &state.deferred.len())
            .finish()
    }
}

/// Waits for a dependency, then runs the plugin's own activation body.
async fn run_activation<A: Send + Sync + 'static>(
    app: Arc<A>,
    state: &StateRef<A>,
    descriptor: &PluginDescriptor<A>,
    generation: u64,
    required: Vec<Edge>,
    optional: Vec<Edge>,
) -> PluginResult<Service> {
    let plugin = descriptor.id();
    let mut deps = Dependencies::new();

    for (token, provider, activation) in required {
        let service = activation
            .await
            .map_err(|error| dependency_error(plugin, &provider, error))?;
        deps.insert(&token, service);
    }

    for (token, provider, activation) in optional {
        match activation.await {
            Ok(service) => deps.insert(&token, service),
            Err(error) if closes_cycle(&error, plugin) => return Err(error),
            Err(error) => {
                debug!(
                    plugin_id = %plugin,
                    provider = %provider,
                    error = %error,
                    "Optional dependency unavailable"
                );
            }
        }
    }

    update_state(state, |s| s.mark_body_started(plugin, generation));
    debug!(plugin_id = %plugin, resolved = deps.len(), "Running activation function");

    let service = descriptor
        .invoke(app, deps)
        .await
        .map_err(|error| match error.downcast_ref::<PluginError>() {
            // A body that failed on a cycle through its own plugin reports the cycle.
            Some(cycle) if closes_cycle(cycle, plugin) => cycle.clone(),
            _ => PluginError::activation(plugin.clone(), error),
        })?;

    if let Some(token) = descriptor.provides() {
        let value: &dyn Any = &*service;
        if value.type_id() != token.service_type() {
            return Err(PluginError::activation(
                plugin.clone(),
                anyhow::anyhow!(
                    "activation returned a service that is not a {} (token '{}')",
                    token.service_type_name(),
                    token
                ),
            ));
        }
    }

    Ok(service)
}

/// True if `error` is a cycle that runs through `plugin`.
fn closes_cycle(error: &PluginError, plugin: &PluginId) -> bool {
    matches!(error, PluginError::CyclicDependency { cycle } if cycle.contains(plugin))
}

/// Members of a cycle fail with the cycle itself; everyone else wraps it.
fn dependency_error(plugin: &PluginId, provider: &PluginId, error: PluginError) -> PluginError {
    if closes_cycle(&error, plugin) {
        error
    } else {
        PluginError::dependency_failed(plugin.clone(), provider.as_str(), error)
    }
}

async fn await_all(planned: Vec<(PluginId, Activation)>, report: &mut ActivationReport) {
    let results = future::join_all(
        planned
            .into_iter()
            .map(|(id, activation)| async move { (id, activation.await.map(|_| ())) }),
    )
    .await;

    for (id, result) in results {
        report.record(id, result);
    }
}
