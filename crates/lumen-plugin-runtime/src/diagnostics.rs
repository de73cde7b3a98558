//! Static analysis of the registered dependency graph.
//!
//! Nothing here activates plugins. The bootstrap logs the result before the
//! first activation pass so broken wiring shows up early.

use crate::registry::{PluginNode, PluginRegistry};
use lumen_core::TokenId;
use lumen_plugin_api::PluginId;
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};

/// Kind of dependency edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Required,
    Optional,
}

/// A required token nobody provides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingProvider {
    pub plugin: PluginId,
    pub token: String,
}

/// Result of [`PluginRegistry::diagnose`].
#[derive(Debug, Clone, Default)]
pub struct RegistryDiagnostics {
    /// Required tokens without a provider.
    pub missing: Vec<MissingProvider>,
    /// Optional tokens without a provider, as (plugin, token).
    pub unavailable_optional: Vec<(PluginId, String)>,
    /// Groups of plugins that depend on each other, each in registration order.
    pub cycles: Vec<Vec<PluginId>>,
    /// Dependencies-first order of the plugins outside any cycle.
    pub activation_order: Vec<PluginId>,
}

impl RegistryDiagnostics {
    /// Returns true if every required token has a provider and there are no cycles.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.missing.is_empty() && self.cycles.is_empty()
    }
}

impl<A> PluginRegistry<A> {
    /// Analyzes the registered plugins without activating anything.
    pub fn diagnose(&self) -> RegistryDiagnostics {
        let (nodes, providers) = self.graph_snapshot();
        analyze(&nodes, &providers)
    }
}

pub(crate) fn analyze(nodes: &[PluginNode], providers: &HashMap<TokenId, PluginId>) -> RegistryDiagnostics {
    let mut diagnostics = RegistryDiagnostics::default();

    // Edges point from provider to dependent, so a topological sort yields
    // an activation order.
    let mut graph: DiGraph<PluginId, EdgeKind> = DiGraph::with_capacity(nodes.len(), nodes.len());
    let index: HashMap<&PluginId, NodeIndex> = nodes
        .iter()
        .map(|node| (&node.id, graph.add_node(node.id.clone())))
        .collect();

    for node in nodes {
        let dependent = index[&node.id];
        let edges = node
            .requires
            .iter()
            .map(|token| (token, EdgeKind::Required))
            .chain(node.optional.iter().map(|token| (token, EdgeKind::Optional)));

        for (token, kind) in edges {
            match providers.get(&token.id()).and_then(|provider| index.get(provider)) {
                Some(&provider) => {
                    graph.add_edge(provider, dependent, kind);
                }
                None if kind == EdgeKind::Required => diagnostics.missing.push(MissingProvider {
                    plugin: node.id.clone(),
                    token: token.name().to_string(),
                }),
                None => diagnostics
                    .unavailable_optional
                    .push((node.id.clone(), token.name().to_string())),
            }
        }
    }

    let mut cyclic = HashSet::new();
    for component in tarjan_scc(&graph) {
        let is_cycle = component.len() > 1 || graph.contains_edge(component[0], component[0]);
        if !is_cycle {
            continue;
        }
        let mut members = component;
        members.sort_unstable();
        cyclic.extend(members.iter().copied());
        diagnostics
            .cycles
            .push(members.into_iter().map(|idx| graph[idx].clone()).collect());
    }
    diagnostics.cycles.sort();

    let acyclic = graph.filter_map(
        |idx, id| (!cyclic.contains(&idx)).then(|| id.clone()),
        |_, kind| Some(*kind),
    );
    // Removing every cyclic component leaves a DAG.
    if let Ok(order) = toposort(&acyclic, None) {
        diagnostics.activation_order = order.into_iter().map(|idx| acyclic[idx].clone()).collect();
    }

    diagnostics
}
