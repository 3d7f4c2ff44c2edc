//! Snippet normalization.
//!
//! Rendered snippets are passed through a formatter before they are stored.
//! A formatter failure is never fatal: the whole module keeps its
//! unformatted text.

use crate::config::FormatterOptions;
use crate::error::Result;
use crate::schema::RenderedVariable;
use crate::types::FormatterKind;
use std::io::Write;
use std::process::{Command, Stdio};

/// Trait for snippet formatters.
///
/// Implementations are called from worker threads.
pub trait SnippetFormatter: Send + Sync {
    /// Human-readable name for logs.
    fn name(&self) -> &'static str;

    /// Format one snippet.
    ///
    /// # Errors
    ///
    /// Returns `Formatter` if the snippet cannot be formatted.
    fn format(&self, snippet: &str) -> Result<String>;

    /// Format all snippets of one module, in order.
    ///
    /// # Errors
    ///
    /// Returns `Formatter` if any snippet cannot be formatted.
    fn format_all(&self, snippets: &[&str]) -> Result<Vec<String>> {
        snippets.iter().map(|snippet| self.format(snippet)).collect()
    }
}

/// Comment line placed between snippets sent in one formatter call.
const SNIPPET_SEPARATOR: &str = "# ---- varsmith snippet ----";

/// Create the formatter selected in the configuration.
#[must_use]
pub fn create_formatter(options: &FormatterOptions) -> Box<dyn SnippetFormatter> {
    match options.kind {
        FormatterKind::Terraform => Box::new(TerraformFormatter::new(&options.command)),
        FormatterKind::Hcl => Box::new(HclFormatter),
        FormatterKind::None => Box::new(NoopFormatter),
    }
}

/// Format every snippet of a module, or none of them.
#[must_use]
pub fn format_module(
    formatter: &dyn SnippetFormatter,
    module: &str,
    rendered: Vec<RenderedVariable>,
) -> Vec<RenderedVariable> {
    let snippets: Vec<&str> = rendered.iter().map(|v| v.schema.as_str()).collect();
    match formatter.format_all(&snippets) {
        Ok(formatted) => rendered
            .iter()
            .zip(formatted)
            .map(|(variable, schema)| RenderedVariable {
                schema,
                ..variable.clone()
            })
            .collect(),
        Err(e) => {
            tracing::warn!(
                module = %module,
                formatter = formatter.name(),
                "Formatting failed, keeping unformatted text: {}",
                e
            );
            rendered
        }
    }
}

/// Joins snippets into one document, a blank line either side of each
/// separator so alignment groups never span two snippets.
fn join_snippets(snippets: &[&str]) -> String {
    snippets.join(&format!("\n{SNIPPET_SEPARATOR}\n\n"))
}

fn split_snippets(formatted: &str, expected: usize) -> Result<Vec<String>> {
    let parts: Vec<String> = formatted
        .split(SNIPPET_SEPARATOR)
        .map(|part| format!("{}\n", part.trim_matches('\n')))
        .collect();
    if parts.len() != expected {
        return Err(formatter_error(format!(
            "expected {expected} snippets back, got {}",
            parts.len()
        )));
    }
    Ok(parts)
}

/// Pipes snippets through `<command> fmt -`.
pub struct TerraformFormatter {
    command: String,
}

impl TerraformFormatter {
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
        }
    }
}

impl SnippetFormatter for TerraformFormatter {
    fn name(&self) -> &'static str {
        "terraform"
    }

    fn format(&self, snippet: &str) -> Result<String> {
        let mut child = Command::new(&self.command)
            .args(["fmt", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| formatter_error(format!("failed to spawn '{}': {e}", self.command)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(snippet.as_bytes())
                .map_err(|e| formatter_error(format!("failed to write to '{}': {e}", self.command)))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| formatter_error(format!("failed to wait for '{}': {e}", self.command)))?;
        if !output.status.success() {
            return Err(formatter_error(format!(
                "'{} fmt' exited with {}: {}",
                self.command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        String::from_utf8(output.stdout).map_err(|e| formatter_error(format!("non UTF-8 output: {e}")))
    }

    /// One `fmt` process per module.
    fn format_all(&self, snippets: &[&str]) -> Result<Vec<String>> {
        if snippets.is_empty() {
            return Ok(Vec::new());
        }
        let formatted = self.format(&join_snippets(snippets))?;
        split_snippets(&formatted, snippets.len())
    }
}

/// In-process formatter built on `hcl-rs`.
///
/// The leading comment lines of a snippet are kept; comments nested inside
/// values do not survive the round trip.
pub struct HclFormatter;

impl SnippetFormatter for HclFormatter {
    fn name(&self) -> &'static str {
        "hcl"
    }

    fn format(&self, snippet: &str) -> Result<String> {
        let body = hcl::parse(snippet).map_err(|e| formatter_error(e.to_string()))?;
        let formatted = hcl::format::to_string(&body).map_err(|e| formatter_error(e.to_string()))?;

        let mut out: String = snippet
            .lines()
            .take_while(|line| line.trim_start().starts_with('#'))
            .map(|line| format!("{line}\n"))
            .collect();
        out.push_str(&formatted);
        Ok(out)
    }
}

/// Leaves snippets untouched.
pub struct NoopFormatter;

impl SnippetFormatter for NoopFormatter {
    fn name(&self) -> &'static str {
        "none"
    }

    fn format(&self, snippet: &str) -> Result<String> {
        Ok(snippet.to_string())
    }
}

fn formatter_error(message: String) -> crate::error::VarsmithError {
    crate::err!(Formatter { message })
}
