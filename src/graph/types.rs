//! Graph type definitions.
//!
//! This module defines the module dependency graph:
//! - `ModuleGraph`: the graph structure and its topological ordering
//! - `ModuleNode`: one catalog module
//! - `EdgeType`: how strongly one module depends on another

use crate::error::Result;
use crate::types::Document;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

/// The module dependency graph.
///
/// Edges point from a module to the module it depends on.
///
/// # Structure
///
/// ```text
/// ModuleGraph
/// ├── inner: DiGraph<ModuleNode, EdgeType>   // The actual graph
/// └── node_index: HashMap<String, NodeIndex> // Fast lookup by module name
/// ```
#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    /// The underlying petgraph directed graph
    inner: DiGraph<ModuleNode, EdgeType>,

    /// Index from module name to petgraph NodeIndex
    node_index: HashMap<String, NodeIndex>,
}

impl ModuleGraph {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module node. Adding a known module is a no-op.
    pub fn add_module(&mut self, name: &str) {
        if self.node_index.contains_key(name) {
            return;
        }
        let idx = self.inner.add_node(ModuleNode {
            name: name.to_string(),
            priority: None,
        });
        self.node_index.insert(name.to_string(), idx);
    }

    /// Add an edge `from -> to`.
    ///
    /// Returns false if the edge already exists or either module is unknown.
    /// A required edge replaces an optional one.
    pub fn add_dependency(&mut self, from: &str, to: &str, edge_type: EdgeType) -> bool {
        let (Some(&from_idx), Some(&to_idx)) = (self.node_index.get(from), self.node_index.get(to)) else {
            return false;
        };

        if let Some(edge) = self.inner.find_edge(from_idx, to_idx) {
            if edge_type == EdgeType::Required {
                self.inner[edge] = EdgeType::Required;
            }
            return false;
        }

        self.inner.add_edge(from_idx, to_idx, edge_type);
        true
    }

    /// Rebuild the graph recorded in a generated document.
    ///
    /// Nodes carry the document's priorities. Dependencies on modules absent
    /// from the document are skipped.
    #[must_use]
    pub fn from_document(document: &Document) -> Self {
        let mut graph = Self::new();
        for name in document.modules.keys() {
            graph.add_module(name);
        }
        for (name, entry) in &document.modules {
            let idx = graph.node_index[name];
            graph.inner[idx].priority = Some(entry.priority);
            for dep in &entry.depends_on.avm_depends_on {
                let edge_type = if entry.depends_on.required_depends_on.contains(dep) {
                    EdgeType::Required
                } else {
                    EdgeType::Optional
                };
                graph.add_dependency(name, dep, edge_type);
            }
        }
        graph
    }

    /// Record assigned priorities on the nodes.
    pub fn set_priorities(&mut self, priorities: &BTreeMap<String, usize>) {
        for (name, &priority) in priorities {
            if let Some(&idx) = self.node_index.get(name) {
                self.inner[idx].priority = Some(priority);
            }
        }
    }

    /// Get a node by module name.
    #[must_use]
    pub fn get_node(&self, name: &str) -> Option<&ModuleNode> {
        self.node_index.get(name).map(|&idx| &self.inner[idx])
    }

    /// Get the number of nodes in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Get the number of edges in the graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Modules this module depends on, sorted.
    #[must_use]
    pub fn dependencies_of(&self, name: &str) -> BTreeSet<&str> {
        self.neighbors(name, petgraph::Direction::Outgoing)
    }

    fn neighbors(&self, name: &str, direction: petgraph::Direction) -> BTreeSet<&str> {
        let Some(&idx) = self.node_index.get(name) else {
            return BTreeSet::new();
        };
        self.inner
            .neighbors_directed(idx, direction)
            .map(|neighbor| self.inner[neighbor].name.as_str())
            .collect()
    }

    /// Nodes sorted by name.
    pub fn nodes(&self) -> impl Iterator<Item = &ModuleNode> {
        let mut nodes: Vec<_> = self.inner.node_weights().collect();
        nodes.sort_by(|a, b| a.name.cmp(&b.name));
        nodes.into_iter()
    }

    /// Edges as `(from, to, type)`, sorted.
    pub fn edges(&self) -> impl Iterator<Item = (&ModuleNode, &ModuleNode, &EdgeType)> {
        let mut edges: Vec<_> = self
            .inner
            .edge_references()
            .map(|edge| (&self.inner[edge.source()], &self.inner[edge.target()], edge.weight()))
            .collect();
        edges.sort_by(|a, b| (&a.0.name, &a.1.name).cmp(&(&b.0.name, &b.1.name)));
        edges.into_iter()
    }

    /// Groups of modules that depend on each other, each sorted, largest
    /// first. Self loops count as a cycle of one.
    #[must_use]
    pub fn find_cycles(&self) -> Vec<Vec<String>> {
        let mut cycles: Vec<Vec<String>> = tarjan_scc(&self.inner)
            .into_iter()
            .filter(|scc| scc.len() > 1 || self.inner.find_edge(scc[0], scc[0]).is_some())
            .map(|scc| {
                let mut names: Vec<_> = scc.into_iter().map(|idx| self.inner[idx].name.clone()).collect();
                names.sort();
                names
            })
            .collect();
        cycles.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        cycles
    }

    /// Assign ascending priorities, dependencies first.
    ///
    /// Kahn's algorithm over a sorted adjacency map: the queue starts with
    /// every module without dependencies in name order, and modules freed by
    /// an extraction are queued in name order too, so the result depends only
    /// on the graph.
    ///
    /// # Errors
    ///
    /// Returns `CycleDetected` if some modules can never be extracted, and
    /// `MissingPriority` if a module ends without a priority.
    pub fn topological_priorities(&self) -> Result<BTreeMap<String, usize>> {
        let mut remaining: BTreeMap<&str, BTreeSet<&str>> = self
            .inner
            .node_weights()
            .map(|node| (node.name.as_str(), self.dependencies_of(&node.name)))
            .collect();

        let mut queue: VecDeque<&str> = remaining
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(name, _)| *name)
            .collect();
        for name in &queue {
            remaining.remove(name);
        }

        let mut priorities = BTreeMap::new();
        while let Some(module) = queue.pop_front() {
            priorities.insert(module.to_string(), priorities.len());

            let mut freed = Vec::new();
            for (name, deps) in &mut remaining {
                if deps.remove(module) && deps.is_empty() {
                    freed.push(*name);
                }
            }
            for name in freed {
                remaining.remove(name);
                queue.push_back(name);
            }
        }

        if !remaining.is_empty() {
            let unresolved: Vec<String> = remaining.keys().map(ToString::to_string).collect();
            let mut members: Vec<String> = self.find_cycles().into_iter().flatten().collect();
            if members.is_empty() {
                members.clone_from(&unresolved);
            }
            members.sort();
            members.dedup();
            tracing::error!(cycle = ?members, unresolved = ?unresolved, "Dependency cycle detected");
            return Err(crate::err!(CycleDetected { members }));
        }

        for node in self.inner.node_weights() {
            if !priorities.contains_key(&node.name) {
                return Err(crate::err!(MissingPriority {
                    module: node.name.clone(),
                }));
            }
        }

        Ok(priorities)
    }
}

/// A module node in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleNode {
    /// Catalog module name
    pub name: String,
    /// Assigned priority, once known
    pub priority: Option<usize>,
}

/// Type of edge in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    /// Referenced from a required variable
    Required,
    /// Referenced from optional variables only
    Optional,
}

impl std::fmt::Display for EdgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Required => write!(f, "required"),
            Self::Optional => write!(f, "optional"),
        }
    }
}
