//! # Varsmith
//!
//! A Terraform module variable cataloguer.
//!
//! Varsmith reads the variable declarations of every module in a catalog,
//! infers realistic defaults from the modules' own usage examples, renders a
//! canonical declaration snippet per variable, and orders the modules so
//! that a module is always generated after the modules it references.
//!
//! ## Features
//!
//! - **Type constraints**: recursive-descent parser for `list`, `set`, `map`,
//!   `object` and `optional(type, default)` constraints
//! - **Example mining**: example `module` blocks are projected into values,
//!   cross-module interpolations are rewritten to canonical references
//! - **Canonical snippets**: one commented `name = value` snippet per
//!   variable, with placeholder defaults where no example applies
//! - **Dependency ordering**: references between modules form a graph that
//!   is topologically sorted, cycles abort the run
//!
//! ## Example
//!
//! ```rust,no_run
//! use varsmith::{Config, Generator};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let generator = Generator::new(config);
//!
//!     let report = generator.run()?;
//!     generator.write(&report.document)?;
//!
//!     println!("Generated {} modules", report.document.modules.len());
//!     Ok(())
//! }
//! ```

#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

pub mod cli;
pub mod config;
pub mod error;
pub mod example;
pub mod format;
pub mod graph;
pub mod parser;
pub mod schema;
pub mod types;

// Re-export commonly used types at crate root
pub use config::Config;
pub use error::{Result, VarsmithError};
pub use types::{Catalog, DependencyRecord, Document, ModuleEntry, ModuleInfo, ProviderTable, VariableEntry};

use example::ExampleInterpreter;
use format::{create_formatter, format_module, SnippetFormatter};
use graph::{DependencyGraphBuilder, ModuleGraph};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use parser::HclParser;
use rayon::prelude::*;
use schema::SchemaTree;
use std::collections::BTreeMap;
use types::OutputIndex;

/// Result of a generation run.
#[derive(Debug, Clone)]
pub struct GenerationReport {
    /// The aggregated document
    pub document: Document,

    /// Module dependency graph with priorities assigned
    pub graph: ModuleGraph,

    /// Modules dropped because of a module-fatal error
    pub failed: Vec<String>,
}

/// Orchestrates a generation run.
///
/// The run has three phases separated by barriers:
///
/// 1. **Outputs**: every module's output names are read in parallel
/// 2. **Variables**: every module is decoded, examples are applied and
///    its variables rendered in parallel; each worker only reads the
///    output index built in phase 1
/// 3. **Dependencies**: dependency records and priorities are computed
///    sequentially from the rendered text
///
/// # Example
///
/// ```rust,no_run
/// use varsmith::{Catalog, Config, Generator, ProviderTable};
///
/// let generator = Generator::new(Config::default()).with_progress(false);
/// let catalog = Catalog::load("catalog.json".as_ref())?;
/// let providers = ProviderTable::load("azurerm_to_avm.json".as_ref())?;
///
/// let report = generator.generate(&catalog, &providers)?;
/// println!("{}", report.document.to_json()?);
/// # Ok::<(), varsmith::VarsmithError>(())
/// ```
pub struct Generator {
    config: Config,
    show_progress: bool,
}

impl Generator {
    /// Create a new generator with the given configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            show_progress: true,
        }
    }

    /// Enable or disable the progress bar.
    #[must_use]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Load the configured inputs and generate the document.
    ///
    /// # Errors
    ///
    /// Returns an error if an input cannot be read, if a module fails and
    /// `continue_on_error` is off, or if the dependency graph has a cycle.
    pub fn run(&self) -> Result<GenerationReport> {
        let paths = &self.config.paths;
        tracing::info!(catalog = %paths.catalog.display(), "Loading module catalog");
        let catalog = Catalog::load(&paths.catalog)?;
        tracing::info!(table = %paths.provider_table.display(), "Loading provider table");
        let providers = ProviderTable::load(&paths.provider_table)?;
        self.generate(&catalog, &providers)
    }

    /// Generate the document for an already loaded catalog.
    ///
    /// # Errors
    ///
    /// See [`Generator::run`].
    pub fn generate(&self, catalog: &Catalog, providers: &ProviderTable) -> Result<GenerationReport> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.run.workers)
            .thread_name(|i| format!("varsmith-worker-{i}"))
            .build()
            .map_err(|e| {
                crate::err!(Internal {
                    message: format!("Failed to build worker pool: {e}"),
                })
            })?;
        let parser = HclParser::new(&self.config);
        let mut failed = Vec::new();

        // Phase 1: outputs
        tracing::info!(modules = catalog.len(), workers = self.config.run.workers, "Reading module outputs");
        let results: Vec<_> = pool.install(|| {
            catalog
                .modules
                .par_iter()
                .map(|(name, _)| (name.as_str(), parser.read_outputs(name)))
                .collect()
        });
        let outputs: OutputIndex = self.collect_phase(results, &mut failed)?;

        // Phase 2: variables
        tracing::info!(modules = outputs.len(), "Rendering module variables");
        let interpreter = ExampleInterpreter::new(catalog, providers, &outputs, &self.config.policy);
        let formatter = create_formatter(&self.config.formatter);
        let progress = self.progress_bar(outputs.len());
        let results: Vec<_> = pool.install(|| {
            catalog
                .modules
                .par_iter()
                .filter(|(name, _)| outputs.contains_key(*name))
                .map(|(name, info)| {
                    progress.set_message(name.clone());
                    let result = self.process_module(info, &parser, &interpreter, formatter.as_ref());
                    progress.inc(1);
                    (name.as_str(), result)
                })
                .collect()
        });
        progress.finish_and_clear();
        let variables: BTreeMap<String, BTreeMap<String, VariableEntry>> = self.collect_phase(results, &mut failed)?;

        // Phase 3: dependencies
        tracing::info!(modules = variables.len(), "Computing module dependencies");
        let builder = DependencyGraphBuilder::new(&self.config.policy);
        let records: BTreeMap<String, DependencyRecord> = variables
            .iter()
            .map(|(name, vars)| (name.clone(), builder.dependency_record(name, vars)))
            .collect();

        let generated = Catalog {
            modules: catalog
                .modules
                .iter()
                .filter(|(name, _)| variables.contains_key(*name))
                .map(|(name, info)| (name.clone(), info.clone()))
                .collect(),
        };
        let (graph, priorities) = builder.assign_priorities(&generated, &records)?;

        let mut document = Document::default();
        for (name, info) in generated.modules {
            let priority = priorities.get(&name).copied().ok_or_else(|| {
                crate::err!(MissingPriority {
                    module: name.clone(),
                })
            })?;
            let entry = ModuleEntry {
                info,
                outputs: outputs.get(&name).cloned().unwrap_or_default(),
                variables: variables.get(&name).cloned().unwrap_or_default(),
                depends_on: records.get(&name).cloned().unwrap_or_default(),
                priority,
            };
            document.modules.insert(name, entry);
        }

        if !failed.is_empty() {
            tracing::warn!(failed = ?failed, "Some modules were dropped from the document");
        }
        tracing::info!(modules = document.modules.len(), "Generation complete");

        Ok(GenerationReport {
            document,
            graph,
            failed,
        })
    }

    /// Write the document to the configured output path.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn write(&self, document: &Document) -> Result<()> {
        let path = &self.config.paths.output;
        let json = document.to_json()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| VarsmithError::io(parent, e, file!(), line!()))?;
        }
        std::fs::write(path, json).map_err(|e| VarsmithError::io(path, e, file!(), line!()))?;
        tracing::info!(path = %path.display(), "Document written");
        Ok(())
    }

    /// Decode, apply examples, render, format and prioritize one module.
    fn process_module(
        &self,
        info: &ModuleInfo,
        parser: &HclParser,
        interpreter: &ExampleInterpreter<'_>,
        formatter: &dyn SnippetFormatter,
    ) -> Result<BTreeMap<String, VariableEntry>> {
        let module = info.module_name.as_str();
        let policy = &self.config.policy;

        let declared = parser.read_variables(module)?;
        let mut tree = SchemaTree::decode(module, &declared, policy)?;

        let examples = parser.read_examples(module)?;
        for example in interpreter.interpret(info, &examples)? {
            tracing::debug!(module = %module, example = %example.key, "Applying example values");
            tree.apply_example(&example.values)?;
        }

        let rendered = tree.render_variables()?;
        let formatted = format_module(formatter, module, rendered);
        Ok(schema::assign_priorities(formatted, policy.optional_priority_base))
    }

    /// Merge per-module results at a phase barrier.
    ///
    /// Results arrive in catalog order, so the first error reported is the
    /// same on every run.
    fn collect_phase<T>(&self, results: Vec<(&str, Result<T>)>, failed: &mut Vec<String>) -> Result<BTreeMap<String, T>> {
        let mut collected = BTreeMap::new();
        for (name, result) in results {
            match result {
                Ok(value) => {
                    collected.insert(name.to_string(), value);
                }
                Err(e) => {
                    let e = e.in_module(name);
                    if e.is_fatal_for_run() || !self.config.run.continue_on_error {
                        return Err(e);
                    }
                    tracing::warn!(module = %name, "Dropping module: {}", e);
                    failed.push(name.to_string());
                }
            }
        }
        Ok(collected)
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let progress = ProgressBar::with_draw_target(Some(len as u64), ProgressDrawTarget::stderr());
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        progress.set_style(style);
        progress
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FormatterKind;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn catalog(names: &[&str]) -> Catalog {
        let json = names
            .iter()
            .map(|n| format!(r#""{n}": {{ "source": "Azure/{n}/azurerm" }}"#))
            .collect::<Vec<_>>()
            .join(",");
        Catalog::from_json(&format!("{{{json}}}")).unwrap()
    }

    fn generator(modules_dir: &Path, continue_on_error: bool) -> Generator {
        let mut config = Config::default();
        config.paths.modules_dir = modules_dir.to_path_buf();
        config.formatter.kind = FormatterKind::None;
        config.run.workers = 2;
        config.run.continue_on_error = continue_on_error;
        Generator::new(config).with_progress(false)
    }

    fn setup() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(
            &dir.path().join("avm-res-resources-resourcegroup/variables.tf"),
            "variable \"name\" {\n  type = string\n}\nvariable \"location\" {\n  type = string\n}\n",
        );
        write(
            &dir.path().join("avm-res-resources-resourcegroup/outputs.tf"),
            "output \"name\" {\n  value = 1\n}\noutput \"resource_id\" {\n  value = 1\n}\n",
        );
        write(
            &dir.path().join("avm-res-web-site/variables.tf"),
            "variable \"name\" {\n  type = string\n}\nvariable \"resource_group_name\" {\n  type = string\n}\n",
        );
        dir
    }

    #[test]
    fn test_generate_orders_dependencies_first() {
        let dir = setup();
        let generator = generator(dir.path(), false);
        let report = generator
            .generate(
                &catalog(&["avm-res-web-site", "avm-res-resources-resourcegroup"]),
                &ProviderTable::default(),
            )
            .unwrap();

        let document = &report.document;
        assert!(report.failed.is_empty());
        assert_eq!(document.modules["avm-res-resources-resourcegroup"].priority, 0);
        assert_eq!(document.modules["avm-res-web-site"].priority, 1);

        let site = &document.modules["avm-res-web-site"];
        assert!(site.depends_on.required_depends_on.contains("avm-res-resources-resourcegroup"));
        assert_eq!(site.variables["name"].priority, 0);
        assert!(site.variables["resource_group_name"]
            .schema
            .ends_with("resource_group_name = module.avm_res_resources_resourcegroup.resource.name\n"));

        let rg = &document.modules["avm-res-resources-resourcegroup"];
        assert_eq!(rg.outputs, vec!["name", "resource_id"]);
        assert!(rg.depends_on.is_empty());
    }

    #[test]
    fn test_missing_module_aborts_by_default() {
        let dir = setup();
        let generator = generator(dir.path(), false);
        let err = generator
            .generate(&catalog(&["avm-res-missing", "avm-res-web-site"]), &ProviderTable::default())
            .unwrap_err();
        assert!(matches!(err, VarsmithError::Module { ref module, .. } if module == "avm-res-missing"));
    }

    #[test]
    fn test_continue_on_error_drops_module() {
        let dir = setup();
        write(
            &dir.path().join("avm-res-broken/variables.tf"),
            "variable \"x\" {\n  type = frobnicate(string)\n}\n",
        );
        let generator = generator(dir.path(), true);
        let report = generator
            .generate(
                &catalog(&["avm-res-broken", "avm-res-resources-resourcegroup"]),
                &ProviderTable::default(),
            )
            .unwrap();
        assert_eq!(report.failed, vec!["avm-res-broken"]);
        assert_eq!(report.document.modules.len(), 1);
    }

    #[test]
    fn test_write_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.paths.output = dir.path().join("nested/out.json");
        let generator = Generator::new(config);

        generator.write(&Document::default()).unwrap();
        let written = fs::read_to_string(dir.path().join("nested/out.json")).unwrap();
        assert_eq!(written.trim(), "{}");
    }
}
