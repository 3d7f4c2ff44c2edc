//! Module Dependency Graph
//!
//! This module turns rendered variable snippets into a directed graph of
//! catalog modules and derives the global generation order from it.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌──────────────────┐    ┌────────────────────────┐    ┌──────────────────┐
//! │ rendered schemas │───▶│ DependencyGraphBuilder │───▶│ DependencyRecord │
//! │ (per module)     │    │   scan_references      │    │ (per module)     │
//! └──────────────────┘    └────────────────────────┘    └──────────────────┘
//!                                                                │
//!                                                                ▼
//!                         ┌────────────────────────┐    ┌──────────────────┐
//!                         │ priorities (Kahn)      │◀───│   ModuleGraph    │
//!                         │ cycles (Tarjan SCC)    │    │ (petgraph)       │
//!                         └────────────────────────┘    └──────────────────┘
//! ```
//!
//! # Edges
//!
//! An edge `A -> B` means a rendered variable of `A` references an output of
//! `B`, so `B` must be generated first.
//!
//! - **Required**: at least one required variable of `A` references `B`
//! - **Optional**: only optional variables do
//!
//! Both kinds constrain the ordering.
//!
//! # Example
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use varsmith::config::PolicyOptions;
//! use varsmith::graph::{export_graph, DependencyGraphBuilder};
//! use varsmith::types::{Catalog, GraphFormat};
//!
//! let policy = PolicyOptions::default();
//! let builder = DependencyGraphBuilder::new(&policy);
//! let (graph, priorities) = builder
//!     .assign_priorities(&Catalog::default(), &BTreeMap::new())
//!     .unwrap();
//! assert!(priorities.is_empty());
//!
//! let mermaid = export_graph(&graph, GraphFormat::Mermaid).unwrap();
//! assert!(mermaid.starts_with("graph LR"));
//! ```

mod builder;
mod export;
mod types;

pub use builder::DependencyGraphBuilder;
pub use export::export_graph;
pub use types::{EdgeType, ModuleGraph, ModuleNode};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PolicyOptions;
    use crate::error::VarsmithError;
    use crate::types::{Catalog, GraphFormat, ModuleInfo, VariableEntry};
    use std::collections::BTreeMap;

    fn catalog(names: &[&str]) -> Catalog {
        Catalog {
            modules: names
                .iter()
                .map(|n| {
                    let info = ModuleInfo {
                        module_name: (*n).to_string(),
                        ..Default::default()
                    };
                    ((*n).to_string(), info)
                })
                .collect(),
        }
    }

    fn variables(entries: &[(&str, bool, &str)]) -> BTreeMap<String, VariableEntry> {
        entries
            .iter()
            .map(|(name, required, schema)| {
                (
                    (*name).to_string(),
                    VariableEntry {
                        required: *required,
                        description: String::new(),
                        priority: 0,
                        schema: (*schema).to_string(),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_rendered_snippets_to_priorities() {
        let policy = PolicyOptions::default();
        let builder = DependencyGraphBuilder::new(&policy);
        let rg = policy.resource_group_module.clone();

        let rendered = BTreeMap::from([
            (
                rg.clone(),
                variables(&[("name", true, "name = \"example1\"\n")]),
            ),
            (
                "avm-res-network-vnet".to_string(),
                variables(&[(
                    "resource_group_name",
                    true,
                    "resource_group_name = module.avm_res_resources_resourcegroup.name\n",
                )]),
            ),
            (
                "avm-res-web-site".to_string(),
                variables(&[
                    ("subnet_id", true, "subnet_id = module.avm_res_network_vnet.subnets.a.resource_id\n"),
                    ("parent_id", false, "parent_id = module.avm_res_resources_resourcegroup.resource_id\n"),
                ]),
            ),
        ]);

        let records: BTreeMap<_, _> = rendered
            .iter()
            .map(|(module, vars)| (module.clone(), builder.dependency_record(module, vars)))
            .collect();

        let catalog = catalog(&["avm-res-web-site", "avm-res-network-vnet", rg.as_str()]);
        let (graph, priorities) = builder.assign_priorities(&catalog, &records).unwrap();

        assert_eq!(priorities[&rg], 0);
        assert_eq!(priorities["avm-res-network-vnet"], 1);
        assert_eq!(priorities["avm-res-web-site"], 2);
        assert_eq!(graph.edge_count(), 3);

        let dot = export_graph(&graph, GraphFormat::Dot).unwrap();
        assert!(dot.contains("\"avm_res_web_site\" -> \"avm_res_resources_resourcegroup\" [style=dashed"));
    }

    #[test]
    fn test_mutual_references_abort() {
        let policy = PolicyOptions::default();
        let builder = DependencyGraphBuilder::new(&policy);
        let records = BTreeMap::from([
            (
                "avm-res-a".to_string(),
                builder.dependency_record("avm-res-a", &variables(&[("b", true, "b = module.avm_res_b.id")])),
            ),
            (
                "avm-res-b".to_string(),
                builder.dependency_record("avm-res-b", &variables(&[("a", false, "a = module.avm_res_a.id")])),
            ),
        ]);

        let err = builder
            .assign_priorities(&catalog(&["avm-res-a", "avm-res-b"]), &records)
            .unwrap_err();
        match err {
            VarsmithError::CycleDetected { members, .. } => {
                assert_eq!(members, vec!["avm-res-a", "avm-res-b"]);
            }
            other => panic!("Expected CycleDetected, got {other:?}"),
        }
    }
}
