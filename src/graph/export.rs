//! Export of the module graph.
//!
//! This module renders the module dependency graph for visualization and
//! for tooling that wants the ordering without reading the whole document.

use crate::error::Result;
use crate::graph::types::{EdgeType, ModuleGraph};
use crate::types::GraphFormat;
use serde::Serialize;

/// Renders the module graph, priorities included, as text.
///
/// # Supported Formats
///
/// - **DOT**: Graphviz digraph, left to right
/// - **JSON**: nodes with priority and dependencies, edges, counts
/// - **Mermaid**: `graph LR` flowchart
///
/// # Example
///
/// ```rust
/// use varsmith::graph::{export_graph, ModuleGraph};
/// use varsmith::types::GraphFormat;
///
/// let graph = ModuleGraph::new();
/// let dot = export_graph(&graph, GraphFormat::Dot).unwrap();
/// assert!(dot.starts_with("digraph Varsmith"));
/// ```
///
/// # Errors
///
/// Returns `Internal` if JSON serialization fails.
pub fn export_graph(graph: &ModuleGraph, format: GraphFormat) -> Result<String> {
    match format {
        GraphFormat::Dot => Ok(export_dot(graph)),
        GraphFormat::Json => export_json(graph),
        GraphFormat::Mermaid => Ok(export_mermaid(graph)),
    }
}

fn node_label(name: &str, priority: Option<usize>) -> String {
    match priority {
        Some(priority) => format!("{name}\n#{priority}"),
        None => name.to_string(),
    }
}

fn export_dot(graph: &ModuleGraph) -> String {
    let mut dot = String::new();
    dot.push_str("digraph Varsmith {\n");
    dot.push_str("    rankdir=LR;\n");
    dot.push_str("    node [shape=box, style=\"rounded,filled\", fillcolor=lightblue];\n");
    dot.push('\n');

    for node in graph.nodes() {
        let node_id = escape_dot_id(&node.name);
        let label = escape_dot_string(&node_label(&node.name, node.priority));
        dot.push_str(&format!("    \"{node_id}\" [label=\"{label}\"];\n"));
    }
    dot.push('\n');

    for (from, to, edge_type) in graph.edges() {
        let from_id = escape_dot_id(&from.name);
        let to_id = escape_dot_id(&to.name);
        let style = match edge_type {
            EdgeType::Required => "style=solid, color=blue",
            EdgeType::Optional => "style=dashed, color=gray",
        };
        dot.push_str(&format!(
            "    \"{from_id}\" -> \"{to_id}\" [{style}, label=\"{edge_type}\"];\n"
        ));
    }

    dot.push_str("}\n");
    dot
}

fn export_json(graph: &ModuleGraph) -> Result<String> {
    #[derive(Serialize)]
    struct JsonGraph<'a> {
        nodes: Vec<JsonNode<'a>>,
        edges: Vec<JsonEdge<'a>>,
        metadata: JsonMetadata,
    }

    #[derive(Serialize)]
    struct JsonNode<'a> {
        name: &'a str,
        priority: Option<usize>,
        depends_on: Vec<&'a str>,
    }

    #[derive(Serialize)]
    struct JsonEdge<'a> {
        from: &'a str,
        to: &'a str,
        #[serde(rename = "type")]
        edge_type: EdgeType,
    }

    #[derive(Serialize)]
    struct JsonMetadata {
        total_nodes: usize,
        total_edges: usize,
        required_edges: usize,
    }

    let nodes: Vec<JsonNode<'_>> = graph
        .nodes()
        .map(|node| JsonNode {
            name: &node.name,
            priority: node.priority,
            depends_on: graph.dependencies_of(&node.name).into_iter().collect(),
        })
        .collect();

    let edges: Vec<JsonEdge<'_>> = graph
        .edges()
        .map(|(from, to, edge_type)| JsonEdge {
            from: &from.name,
            to: &to.name,
            edge_type: *edge_type,
        })
        .collect();

    let json_graph = JsonGraph {
        metadata: JsonMetadata {
            total_nodes: nodes.len(),
            total_edges: edges.len(),
            required_edges: edges.iter().filter(|e| e.edge_type == EdgeType::Required).count(),
        },
        nodes,
        edges,
    };

    serde_json::to_string_pretty(&json_graph).map_err(|e| {
        crate::err!(Internal {
            message: format!("Failed to serialize graph to JSON: {e}"),
        })
    })
}

fn export_mermaid(graph: &ModuleGraph) -> String {
    let mut mermaid = String::new();
    mermaid.push_str("graph LR\n");
    mermaid.push_str("    %% Varsmith module dependencies\n\n");

    for node in graph.nodes() {
        let id = sanitize_mermaid_id(&node.name);
        let label = escape_mermaid_string(&node_label(&node.name, node.priority));
        mermaid.push_str(&format!("    {id}[\"{label}\"]\n"));
    }

    mermaid.push('\n');

    for (from, to, edge_type) in graph.edges() {
        let from_id = sanitize_mermaid_id(&from.name);
        let to_id = sanitize_mermaid_id(&to.name);
        let arrow = match edge_type {
            EdgeType::Required => "-->",
            EdgeType::Optional => "-.->",
        };
        mermaid.push_str(&format!("    {from_id} {arrow} {to_id}\n"));
    }

    mermaid
}

fn escape_dot_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Node ids use the canonical module name.
fn escape_dot_id(s: &str) -> String {
    s.replace(['/', '.', '-'], "_")
}

fn sanitize_mermaid_id(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

fn escape_mermaid_string(s: &str) -> String {
    s.replace('"', "'").replace('\n', " ")
}
