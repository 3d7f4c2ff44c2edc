//! Core data types used throughout Varsmith.
//!
//! This module defines the records that cross phase boundaries:
//! - the module catalog and the provider lookup table (inputs)
//! - per-variable and per-module results (outputs)
//! - the aggregated document consumers read
//!
//! Field names of the serialized records are a contract with downstream
//! generators and must not be renamed.

use crate::error::{Result, VarsmithError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// One catalog entry describing a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ModuleInfo {
    /// Catalog name, e.g. `avm-res-network-virtualnetwork`
    pub module_name: String,

    /// Human readable name
    pub display_name: String,

    /// Canonical registry source, e.g. `Azure/avm-res-network-virtualnetwork/azurerm`
    pub source: String,

    /// Repository URL the module was published from
    pub git_hub_url: String,

    /// Short description
    pub description: String,
}

impl ModuleInfo {
    /// Fill fields a hand-written catalog may leave out.
    fn complete(&mut self, key: &str) {
        if self.module_name.is_empty() {
            self.module_name = key.to_string();
        }
        if self.source.is_empty() {
            if let Some(source) = source_from_repo_url(&self.git_hub_url) {
                self.source = source;
            }
        }
        if self.description.is_empty() && !self.display_name.is_empty() {
            self.description = format!("Manages {}.", self.display_name);
        }
    }
}

/// Derive a registry source from a `terraform-<provider>-<name>` repository URL.
///
/// `https://github.com/Azure/terraform-azurerm-avm-res-a-b` becomes
/// `Azure/avm-res-a-b/azurerm`.
#[must_use]
pub fn source_from_repo_url(url: &str) -> Option<String> {
    let mut parts = url.trim_end_matches('/').rsplitn(3, '/');
    let repo = parts.next()?;
    let org = parts.next()?;
    parts.next()?;

    let mut pieces = repo.splitn(3, '-');
    pieces.next()?;
    let provider = pieces.next()?;
    let name = pieces.next()?;
    Some(format!("{org}/{name}/{provider}"))
}

/// The module catalog, keyed by module name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    /// Entries keyed by module name
    pub modules: BTreeMap<String, ModuleInfo>,
}

impl Catalog {
    /// Parse a catalog from JSON and complete missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is not a map of module records.
    pub fn from_json(content: &str) -> Result<Self> {
        let mut catalog: Catalog = serde_json::from_str(content)?;
        for (key, info) in &mut catalog.modules {
            info.complete(key);
        }
        Ok(catalog)
    }

    /// Read a catalog file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| VarsmithError::io(path, e, file!(), line!()))?;
        Self::from_json(&content)
    }

    /// Look up a module.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ModuleInfo> {
        self.modules.get(name)
    }

    /// Module names in catalog order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    /// Number of modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Provider resource type -> module name, e.g.
/// `azurerm_resource_group` -> `avm-res-resources-resourcegroup`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderTable {
    /// Resource type to module name
    pub entries: BTreeMap<String, String>,
}

impl ProviderTable {
    /// Read a provider table file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a JSON string map.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| VarsmithError::io(path, e, file!(), line!()))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Module implementing a resource type.
    #[must_use]
    pub fn module_for(&self, resource_type: &str) -> Option<&str> {
        self.entries.get(resource_type).map(String::as_str)
    }
}

impl FromIterator<(String, String)> for ProviderTable {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Output names per module, in declaration order.
pub type OutputIndex = BTreeMap<String, Vec<String>>;

/// Rendered result for one module variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableEntry {
    /// Whether the variable must be set by callers
    pub required: bool,
    /// Declared description
    pub description: String,
    /// Position of the variable in generated snippets
    pub priority: usize,
    /// Canonical declaration snippet
    pub schema: String,
}

/// Modules referenced from a module's rendered variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DependencyRecord {
    /// Union over every variable
    pub avm_depends_on: BTreeSet<String>,
    /// Union over required variables
    pub required_depends_on: BTreeSet<String>,
    /// Per required variable
    pub required: BTreeMap<String, BTreeSet<String>>,
    /// Per optional variable
    pub optional: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyRecord {
    /// Remove a module from every set.
    pub fn remove(&mut self, module: &str) {
        self.avm_depends_on.remove(module);
        self.required_depends_on.remove(module);
        for deps in self.required.values_mut().chain(self.optional.values_mut()) {
            deps.remove(module);
        }
    }

    /// Drop every dependency. Variables stay listed with empty sets.
    pub fn clear(&mut self) {
        self.avm_depends_on.clear();
        self.required_depends_on.clear();
        for deps in self.required.values_mut().chain(self.optional.values_mut()) {
            deps.clear();
        }
    }

    /// Whether the module depends on nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.avm_depends_on.is_empty()
    }
}

/// Everything the document records about one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleEntry {
    /// Catalog record
    #[serde(flatten)]
    pub info: ModuleInfo,
    /// Declared output names
    pub outputs: Vec<String>,
    /// Rendered variables keyed by name
    pub variables: BTreeMap<String, VariableEntry>,
    /// Dependency map
    #[serde(default, alias = "denpends_on")]
    pub depends_on: DependencyRecord,
    /// Global generation order, dependencies first
    pub priority: usize,
}

/// The aggregated document, keyed by module name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    /// Entries keyed by module name
    pub modules: BTreeMap<String, ModuleEntry>,
}

impl Document {
    /// Serialize as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a previously written document.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| VarsmithError::io(path, e, file!(), line!()))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Modules ordered by ascending priority.
    #[must_use]
    pub fn in_priority_order(&self) -> Vec<&ModuleEntry> {
        let mut entries: Vec<_> = self.modules.values().collect();
        entries.sort_by_key(|e| e.priority);
        entries
    }
}

/// Snippet formatter selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FormatterKind {
    /// `terraform fmt -`
    Terraform,
    /// In-process `hcl-rs` formatter
    Hcl,
    /// Leave snippets as rendered
    None,
}

/// Graph output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GraphFormat {
    /// Graphviz DOT format
    #[default]
    Dot,
    /// JSON adjacency format
    Json,
    /// Mermaid diagram format
    Mermaid,
}
