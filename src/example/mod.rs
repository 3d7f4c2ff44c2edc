//! Example interpreter.
//!
//! Mines a module's usage examples for realistic values. Only the `module`
//! blocks that instantiate the module itself are kept; their values are
//! projected so that every cross-module interpolation becomes a canonical
//! `module.<name>.<path>` reference, or an empty string when it cannot be
//! expressed that way.

mod resolve;

use crate::config::PolicyOptions;
use crate::error::Result;
use crate::parser::{parse_module_source, ExampleFile, ExampleModule};
use crate::types::{Catalog, ModuleInfo, OutputIndex, ProviderTable};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Attributes that only steer Terraform and never describe a variable.
const META_ARGUMENTS: &[&str] = &["source", "version", "depends_on", "providers", "count", "for_each"];

/// Projected values of one example module block.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedExample {
    /// `<example>.<block label>`
    pub key: String,
    /// Variable values keyed by variable name
    pub values: Map<String, Value>,
}

/// Resolves example values against the catalog.
pub struct ExampleInterpreter<'a> {
    catalog: &'a Catalog,
    providers: &'a ProviderTable,
    outputs: &'a OutputIndex,
    policy: &'a PolicyOptions,
}

/// What a single example file knows while its values are projected.
struct FileContext<'a> {
    module: &'a ModuleInfo,
    /// Label -> declared source of every module block in the file
    sources: BTreeMap<&'a str, &'a str>,
}

impl<'a> ExampleInterpreter<'a> {
    #[must_use]
    pub fn new(
        catalog: &'a Catalog,
        providers: &'a ProviderTable,
        outputs: &'a OutputIndex,
        policy: &'a PolicyOptions,
    ) -> Self {
        Self {
            catalog,
            providers,
            outputs,
            policy,
        }
    }

    /// Project every block of `examples` that instantiates `module`.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedValueForm` when an interpolation has no canonical
    /// form.
    pub fn interpret(&self, module: &ModuleInfo, examples: &[ExampleFile]) -> Result<Vec<ResolvedExample>> {
        let mut resolved = Vec::new();
        for file in examples {
            let context = FileContext {
                module,
                sources: file
                    .modules
                    .iter()
                    .map(|m| (m.label.as_str(), m.source.as_str()))
                    .collect(),
            };

            for block in file.modules.iter().filter(|b| is_module_under_test(b, module)) {
                let mut values = Map::new();
                for (key, value) in &block.values {
                    if META_ARGUMENTS.contains(&key.as_str()) {
                        continue;
                    }
                    values.insert(key.clone(), self.project(value, &context)?);
                }
                tracing::debug!(
                    module = %module.module_name,
                    example = %file.name,
                    label = %block.label,
                    values = values.len(),
                    "Resolved example block"
                );
                resolved.push(ResolvedExample {
                    key: format!("{}.{}", file.name, block.label),
                    values,
                });
            }
        }
        Ok(resolved)
    }

    /// Recursively project a lowered value.
    fn project(&self, value: &Value, context: &FileContext<'_>) -> Result<Value> {
        match value {
            Value::String(text) => self.project_string(text, context),
            Value::Array(items) => items
                .iter()
                .map(|item| self.project(item, context))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            Value::Object(entries) => {
                let mut projected = Map::new();
                for (key, item) in entries {
                    projected.insert(key.clone(), self.project(item, context)?);
                }
                Ok(Value::Object(projected))
            }
            other => Ok(other.clone()),
        }
    }

    /// Whether a module name is known to the catalog.
    fn is_catalog_module(&self, name: &str) -> bool {
        self.catalog.get(name).is_some()
    }
}

fn is_module_under_test(block: &ExampleModule, module: &ModuleInfo) -> bool {
    let source = block.source.trim();
    source == module.source || parse_module_source(source).refers_to(&module.source)
}
