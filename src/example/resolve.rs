//! String projection and `${...}` resolution.

use super::{ExampleInterpreter, FileContext};
use crate::config::PolicyOptions;
use crate::error::Result;
use crate::parser::{decode_literal, parse_module_source};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static CALL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]+\(").expect("Invalid regex"));

impl ExampleInterpreter<'_> {
    /// Project one string leaf.
    pub(super) fn project_string(&self, text: &str, context: &FileContext<'_>) -> Result<Value> {
        if let Some(rest) = text.strip_prefix("${toset(") {
            return Ok(match self.unwrap_literal(rest, context) {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(module = %context.module.module_name, value = %text, "Failed to unwrap toset: {}", e);
                    Value::String(String::new())
                }
            });
        }
        if let Some(rest) = text.strip_prefix("${(") {
            if rest.starts_with('{') {
                return self.unwrap_literal(rest, context);
            }
        }
        if text.contains('\n') {
            return Ok(Value::String(String::new()));
        }
        let interpolated = text.contains("${");
        if interpolated && !self.is_resolvable(text) {
            return Ok(Value::String(String::new()));
        }
        if text.contains("[*]") {
            let flattened = Value::String(text.replace("[*]", ""));
            return self.project(&Value::Array(vec![flattened]), context);
        }
        if !interpolated {
            return Ok(Value::String(text.trim_matches('"').to_string()));
        }

        self.replace_interpolations(text, context).map(Value::String)
    }

    /// Interpolated text worth resolving: no dynamic marker, and at least one
    /// `data.`, `module.` or provider resource qualifier.
    fn is_resolvable(&self, text: &str) -> bool {
        let policy = self.policy;
        if policy.dynamic_markers.iter().any(|m| text.contains(m.as_str())) {
            return false;
        }
        text.contains("data.")
            || text.contains("module.")
            || policy.provider_prefixes.iter().any(|p| text.contains(p.as_str()))
    }

    /// Decode the literal of `${toset(<lit>)}` or `${({...})}` and project it.
    fn unwrap_literal(&self, rest: &str, context: &FileContext<'_>) -> Result<Value> {
        let literal = rest
            .strip_suffix(")}")
            .ok_or_else(|| unsupported(rest))?;
        let decoded = decode_literal(literal).ok_or_else(|| unsupported(literal))?;
        self.project(&decoded, context)
    }

    /// Replace every balanced `${...}` segment by its resolution.
    fn replace_interpolations(&self, text: &str, context: &FileContext<'_>) -> Result<String> {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let body_start = start + 2;
            let end = matching_brace(&rest[body_start..]).ok_or_else(|| unsupported(text))?;
            let inner = &rest[body_start..body_start + end];
            out.push_str(&self.resolve_dollar(inner.trim(), context)?);
            rest = &rest[body_start + end + 1..];
        }
        out.push_str(rest);
        Ok(out.trim_matches('"').to_string())
    }

    /// Resolve the body of one interpolation.
    fn resolve_dollar(&self, expr: &str, context: &FileContext<'_>) -> Result<String> {
        let policy = self.policy;
        if context.module.module_name == policy.resource_group_module {
            return Ok(String::new());
        }

        let expr = expr.strip_prefix("data.").unwrap_or(expr);
        if policy.is_provider_resource(expr) {
            return self.resolve_provider_resource(expr, context);
        }
        if let Some(reference) = expr.strip_prefix("module.") {
            return Ok(self.resolve_module_reference(expr, reference, context));
        }
        if CALL_PATTERN.is_match(expr) {
            return Ok(String::new());
        }
        Err(unsupported(expr))
    }

    /// `<resource type>.<name>.<path>` through the provider table.
    fn resolve_provider_resource(&self, expr: &str, context: &FileContext<'_>) -> Result<String> {
        let mut parts = expr.splitn(3, '.');
        let resource_type = parts.next().unwrap_or_default();
        let path = match (parts.next(), parts.next()) {
            (Some(_), Some(path)) if !path.is_empty() => path,
            _ => return Err(unsupported(expr)),
        };

        let Some(target) = self.providers.module_for(resource_type) else {
            tracing::debug!(resource_type = %resource_type, "Resource type not in provider table");
            return Ok(String::new());
        };
        if target == context.module.module_name {
            return Ok(String::new());
        }
        if !self.is_catalog_module(target) {
            tracing::debug!(module = %target, "Provider table points outside the catalog");
        }

        let outputs = self.outputs.get(target).map(Vec::as_slice).unwrap_or_default();
        if outputs.iter().any(|o| o == "resource") {
            return Ok(PolicyOptions::module_reference(target, &format!("resource.{path}")));
        }
        if path == "id" && outputs.iter().any(|o| o == "resource_id") {
            return Ok(PolicyOptions::module_reference(target, "resource_id"));
        }

        let last_segment = path.rsplit('.').next().unwrap_or(path);
        let suffix = last_segment.rsplit('_').next().unwrap_or(last_segment);
        Ok(outputs
            .iter()
            .find(|o| o.ends_with(suffix))
            .map(|o| PolicyOptions::module_reference(target, o))
            .unwrap_or_default())
    }

    /// `module.<label>.<path>` through the label's declared source.
    fn resolve_module_reference(&self, expr: &str, reference: &str, context: &FileContext<'_>) -> String {
        let policy = self.policy;
        let (label, path) = reference.split_once('.').unwrap_or((reference, ""));

        let Some(source) = context.sources.get(label) else {
            tracing::debug!(label = %label, "Module label not declared in example");
            return String::new();
        };
        if *source == policy.sku_finder_source && expr.ends_with(".sku") {
            return policy.sku_literal.clone();
        }
        let Some(name) = parse_module_source(source).catalog_name(&policy.module_prefix) else {
            return String::new();
        };

        let path = if *source == policy.key_vault_source && path == "resource.id" {
            "resource_id"
        } else {
            path
        };
        if path.is_empty() {
            format!("module.{}", PolicyOptions::canonical_name(&name))
        } else {
            PolicyOptions::module_reference(&name, path)
        }
    }
}

/// Offset of the `}` closing an already opened brace.
fn matching_brace(text: &str) -> Option<usize> {
    let mut depth = 1usize;
    for (idx, ch) in text.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

fn unsupported(value: &str) -> crate::error::VarsmithError {
    crate::err!(UnsupportedValueForm {
        value: value.to_string(),
    })
}
