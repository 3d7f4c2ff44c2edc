//! Dependency graph builder.
//!
//! This module provides the `DependencyGraphBuilder` which scans rendered
//! variable snippets for cross-module references and turns them into
//! per-module `DependencyRecord`s and a `ModuleGraph`.

use crate::config::PolicyOptions;
use crate::error::Result;
use crate::graph::types::{EdgeType, ModuleGraph};
use crate::types::{Catalog, DependencyRecord, VariableEntry};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

/// Builder for module dependency graphs.
///
/// # Algorithm
///
/// 1. **Scan Phase**: every rendered snippet is searched for
///    `module.<canonical prefix><rest>.`; each hit names one module.
/// 2. **Record Phase**: per module, required variables feed
///    `required_depends_on`, every variable feeds `avm_depends_on`.
///    Self references are stripped and the resource group module is forced
///    to depend on nothing.
/// 3. **Graph Phase**: one node per catalog module, one edge per dependency.
/// 4. **Ordering Phase**: Kahn's algorithm assigns priorities.
///
/// # Example
///
/// ```rust
/// use varsmith::config::PolicyOptions;
/// use varsmith::graph::DependencyGraphBuilder;
///
/// let policy = PolicyOptions::default();
/// let builder = DependencyGraphBuilder::new(&policy);
/// let found = builder.scan_references("subnet_id = module.avm_res_network_virtualnetwork.subnets");
/// assert!(found.contains("avm-res-network-virtualnetwork"));
/// ```
pub struct DependencyGraphBuilder<'p> {
    policy: &'p PolicyOptions,
    reference: Regex,
}

impl<'p> DependencyGraphBuilder<'p> {
    /// Create a builder for the given naming policy.
    #[must_use]
    pub fn new(policy: &'p PolicyOptions) -> Self {
        let pattern = format!(r"{}([A-Za-z0-9_]*)\.", regex::escape(&policy.reference_marker()));
        let reference = Regex::new(&pattern).expect("escaped marker is a valid regex");
        Self { policy, reference }
    }

    /// Module names referenced from one snippet.
    #[must_use]
    pub fn scan_references(&self, text: &str) -> BTreeSet<String> {
        self.reference
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?.as_str();
                let canonical = whole.strip_prefix("module.")?.strip_suffix('.')?;
                Some(canonical.replace('_', "-"))
            })
            .collect()
    }

    /// Dependency record of one module from its rendered variables.
    #[must_use]
    pub fn dependency_record(&self, module: &str, variables: &BTreeMap<String, VariableEntry>) -> DependencyRecord {
        let mut record = DependencyRecord::default();

        for (name, variable) in variables {
            let deps = self.scan_references(&variable.schema);
            record.avm_depends_on.extend(deps.iter().cloned());
            if variable.required {
                record.required_depends_on.extend(deps.iter().cloned());
                record.required.insert(name.clone(), deps);
            } else {
                record.optional.insert(name.clone(), deps);
            }
        }

        record.remove(module);
        if module == self.policy.resource_group_module {
            record.clear();
        }

        tracing::debug!(
            module = %module,
            dependencies = record.avm_depends_on.len(),
            required = record.required_depends_on.len(),
            "Dependency record built"
        );
        record
    }

    /// Build the module graph from dependency records.
    ///
    /// Every catalog module becomes a node, including modules without a
    /// record. Dependencies on modules outside the catalog are ignored.
    #[must_use]
    pub fn build(&self, catalog: &Catalog, records: &BTreeMap<String, DependencyRecord>) -> ModuleGraph {
        tracing::debug!(modules = catalog.len(), records = records.len(), "Starting graph construction");
        let mut graph = ModuleGraph::new();

        for name in catalog.names() {
            graph.add_module(name);
        }

        for (module, record) in records {
            if catalog.get(module).is_none() {
                tracing::warn!(module = %module, "Dependency record for module outside the catalog, ignoring");
                continue;
            }
            for dep in &record.avm_depends_on {
                if catalog.get(dep).is_none() {
                    tracing::warn!(module = %module, dependency = %dep, "Dependency not in catalog, ignoring for priorities");
                    continue;
                }
                let edge_type = if record.required_depends_on.contains(dep) {
                    EdgeType::Required
                } else {
                    EdgeType::Optional
                };
                graph.add_dependency(module, dep, edge_type);
            }
        }

        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Graph construction complete"
        );
        graph
    }

    /// Build the graph and assign module priorities.
    ///
    /// # Errors
    ///
    /// Returns `CycleDetected` or `MissingPriority`; both abort the run.
    pub fn assign_priorities(
        &self,
        catalog: &Catalog,
        records: &BTreeMap<String, DependencyRecord>,
    ) -> Result<(ModuleGraph, BTreeMap<String, usize>)> {
        let mut graph = self.build(catalog, records);
        let priorities = graph.topological_priorities()?;
        graph.set_priorities(&priorities);
        tracing::info!(modules = priorities.len(), "No cycles detected in module dependencies");
        Ok((graph, priorities))
    }
}
