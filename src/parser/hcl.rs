//! Module tree reader built on `hcl-rs`.
//!
//! A materialized module directory looks like:
//!
//! ```text
//! <modules_dir>/<module>/
//!   variables.tf, variables.*.tf   # `variable` blocks
//!   outputs.tf                     # `output` blocks
//!   examples/<name>/main.tf        # usage examples
//! ```
//!
//! Example expressions are lowered into JSON-like values: literals map
//! directly, quoted templates keep their raw template text, and any other
//! expression becomes the string `${<expression>}`.

use crate::config::Config;
use crate::error::{Result, VarsmithError};

use hcl::expr::{ObjectKey, TemplateExpr};
use hcl::{Block, Body, Expression};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One `variable` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawVariable {
    /// Block label
    pub name: String,
    /// Type constraint as text; `unknown` when the block has no `type`
    pub type_expr: String,
    /// Whether a `default` attribute is present (even `null`)
    pub has_default: bool,
    /// `nullable = true`
    pub nullable: bool,
    /// Declared description
    pub description: String,
}

impl RawVariable {
    /// Callers must set the variable.
    #[must_use]
    pub fn is_required(&self) -> bool {
        !self.has_default && !self.nullable
    }
}

/// One `module` block found in an example file.
#[derive(Debug, Clone, PartialEq)]
pub struct ExampleModule {
    /// Block label
    pub label: String,
    /// Declared `source`
    pub source: String,
    /// Every attribute, lowered
    pub values: Map<String, Value>,
}

/// The module blocks of one `examples/<name>/main.tf`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExampleFile {
    /// Example directory name
    pub name: String,
    /// Module blocks in declaration order
    pub modules: Vec<ExampleModule>,
}

/// Reads module trees below `paths.modules_dir`.
pub struct HclParser {
    modules_dir: PathBuf,
}

impl HclParser {
    /// Create a reader rooted at the configured modules directory.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            modules_dir: config.paths.modules_dir.clone(),
        }
    }

    /// Directory of one module's source tree.
    #[must_use]
    pub fn module_dir(&self, module: &str) -> PathBuf {
        self.modules_dir.join(module)
    }

    /// Read every variable declared in the module's `variable*.tf` files,
    /// files taken in name order.
    ///
    /// # Errors
    ///
    /// Returns an error if the module directory cannot be read. Unparseable
    /// variable files are logged and skipped.
    pub fn read_variables(&self, module: &str) -> Result<Vec<RawVariable>> {
        let dir = self.module_dir(module);
        if !dir.is_dir() {
            return Err(VarsmithError::io(
                &dir,
                std::io::Error::new(std::io::ErrorKind::NotFound, "module directory not found"),
                file!(),
                line!(),
            ));
        }

        let mut variables = Vec::new();
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read directory entry");
                    continue;
                }
            };
            if !is_variable_file(entry.path()) {
                continue;
            }

            tracing::debug!(file = %entry.path().display(), "Parsing variable file");
            let content = read_file(entry.path())?;
            match parse_variables(&content, entry.path()) {
                Ok(parsed) => variables.extend(parsed),
                Err(e) => {
                    tracing::warn!(module = %module, file = %entry.path().display(), "skipping variable file: {}", e);
                }
            }
        }
        Ok(variables)
    }

    /// Output names from `outputs.tf`; a module without the file has none.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn read_outputs(&self, module: &str) -> Result<Vec<String>> {
        let path = self.module_dir(module).join("outputs.tf");
        if !path.is_file() {
            tracing::debug!(module = %module, "No outputs.tf");
            return Ok(Vec::new());
        }
        parse_outputs(&read_file(&path)?, &path)
    }

    /// Module blocks of every `examples/<name>/main.tf`, in directory order.
    ///
    /// # Errors
    ///
    /// Returns an error if an example file cannot be read. Example files that
    /// are not valid HCL are logged and skipped.
    pub fn read_examples(&self, module: &str) -> Result<Vec<ExampleFile>> {
        let examples_dir = self.module_dir(module).join("examples");
        if !examples_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&examples_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_type().is_dir())
        {
            let main = entry.path().join("main.tf");
            if !main.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            match parse_example(&read_file(&main)?, &main) {
                Ok(modules) => files.push(ExampleFile { name, modules }),
                Err(e) => {
                    tracing::warn!(module = %module, example = %name, "skipping example: {}", e);
                }
            }
        }
        Ok(files)
    }
}

fn is_variable_file(path: &Path) -> bool {
    path.is_file()
        && path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("variable") && n.ends_with(".tf"))
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| VarsmithError::io(path, e, file!(), line!()))
}

fn parse_body(content: &str, file: &Path) -> Result<Body> {
    hcl::parse(content).map_err(|e| VarsmithError::hcl_parse(file, e.to_string(), file!(), line!()))
}

/// Extract `variable` blocks.
///
/// # Errors
///
/// Returns `HclParse` if the content is not valid HCL.
pub fn parse_variables(content: &str, file: &Path) -> Result<Vec<RawVariable>> {
    let body = parse_body(content, file)?;
    Ok(body
        .blocks()
        .filter(|b| b.identifier.as_str() == "variable")
        .filter_map(variable_from_block)
        .collect())
}

fn variable_from_block(block: &Block) -> Option<RawVariable> {
    let name = block.labels.first()?.as_str().to_string();
    let mut variable = RawVariable {
        name,
        type_expr: "unknown".to_string(),
        has_default: false,
        nullable: false,
        description: String::new(),
    };

    for attr in block.body.attributes() {
        match attr.key.as_str() {
            "type" => variable.type_expr = expression_text(&attr.expr),
            "default" => variable.has_default = true,
            "nullable" => variable.nullable = matches!(attr.expr, Expression::Bool(true)),
            "description" => {
                variable.description = literal_text(&attr.expr)
                    .map(|d| d.trim_end().to_string())
                    .unwrap_or_default();
            }
            _ => {}
        }
    }
    Some(variable)
}

/// Output names in declaration order.
///
/// # Errors
///
/// Returns `HclParse` if the content is not valid HCL.
pub fn parse_outputs(content: &str, file: &Path) -> Result<Vec<String>> {
    let body = parse_body(content, file)?;
    Ok(body
        .blocks()
        .filter(|b| b.identifier.as_str() == "output")
        .filter_map(|b| b.labels.first().map(|l| l.as_str().to_string()))
        .collect())
}

/// Extract `module` blocks with their attributes lowered.
///
/// # Errors
///
/// Returns `HclParse` if the content is not valid HCL.
pub fn parse_example(content: &str, file: &Path) -> Result<Vec<ExampleModule>> {
    let body = parse_body(content, file)?;
    let mut modules = Vec::new();

    for block in body.blocks().filter(|b| b.identifier.as_str() == "module") {
        let Some(label) = block.labels.first().map(|l| l.as_str().to_string()) else {
            continue;
        };

        let mut source = String::new();
        let mut values = Map::new();
        for attr in block.body.attributes() {
            if attr.key.as_str() == "source" {
                source = literal_text(&attr.expr).unwrap_or_default();
            }
            values.insert(attr.key.as_str().to_string(), lower_expression(&attr.expr));
        }

        if source.is_empty() {
            tracing::warn!(module = %label, file = %file.display(), "Module block missing source attribute");
        }
        modules.push(ExampleModule { label, source, values });
    }
    Ok(modules)
}

/// Project an HCL expression onto a JSON-like value.
#[must_use]
pub fn lower_expression(expr: &Expression) -> Value {
    match expr {
        Expression::Null => Value::Null,
        Expression::Bool(b) => Value::Bool(*b),
        Expression::Number(n) => serde_json::to_value(n).unwrap_or(Value::Null),
        Expression::String(s) => Value::String(s.clone()),
        Expression::Array(items) => Value::Array(items.iter().map(lower_expression).collect()),
        Expression::Object(object) => Value::Object(
            object
                .iter()
                .map(|(key, value)| (object_key_to_string(key), lower_expression(value)))
                .collect(),
        ),
        Expression::TemplateExpr(template) => Value::String(template_text(template)),
        other => Value::String(format!("${{{}}}", expression_text(other))),
    }
}

/// Decode a literal embedded in an interpolation: JSON first, HCL second.
#[must_use]
pub fn decode_literal(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Some(value);
    }
    let body = hcl::parse(&format!("value = {text}\n")).ok()?;
    let attr = body.attributes().next()?;
    Some(lower_expression(&attr.expr))
}

/// A string or template literal as plain text.
fn literal_text(expr: &Expression) -> Option<String> {
    match expr {
        Expression::String(s) => Some(s.clone()),
        Expression::TemplateExpr(template) => Some(template_text(template)),
        _ => None,
    }
}

fn template_text(template: &TemplateExpr) -> String {
    match template {
        TemplateExpr::QuotedString(s) => s.clone(),
        TemplateExpr::Heredoc(heredoc) => heredoc.template.trim_end().to_string(),
    }
}

/// Render an expression back to HCL source text.
fn expression_text(expr: &Expression) -> String {
    hcl::format::to_string(expr).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "Failed to format expression");
        format!("{expr:?}")
    })
}

/// Convert an object key to a string.
fn object_key_to_string(key: &ObjectKey) -> String {
    match key {
        ObjectKey::Identifier(id) => id.as_str().to_string(),
        ObjectKey::Expression(expr) => {
            literal_text(expr).unwrap_or_else(|| expression_text(expr).trim_matches('"').to_string())
        }
        _ => String::new(),
    }
}
