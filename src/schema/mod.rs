//! Per-module variable tree: decode, apply example values, render.
//!
//! The tree is an arena. Ownership runs strictly parent to child; each node
//! also records its parent index, which is only read to find the enclosing
//! attribute's name while rendering.
//!
//! # Example
//!
//! ```rust
//! use varsmith::config::PolicyOptions;
//! use varsmith::parser::parse_type_expression;
//! use varsmith::schema::SchemaTree;
//!
//! let policy = PolicyOptions::default();
//! let mut tree = SchemaTree::new("avm-res-a", &policy);
//! let descriptor = parse_type_expression("string").unwrap();
//! tree.add_variable("name", true, "", &descriptor);
//! let rendered = tree.render_variables().unwrap();
//! assert!(rendered[0].schema.contains("name = \"example1\""));
//! ```

mod defaults;
mod node;

pub use node::{AttributeNode, MapValue, NodeId, ObjectValue, Scalar, Sequence, ValueNode};

use crate::config::PolicyOptions;
use crate::error::Result;
use crate::parser::{parse_type_expression, RawVariable, TypeDescriptor};
use crate::types::VariableEntry;
use node::{Node, NodeKind};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Placeholder key for a map no example populated.
const PLACEHOLDER_KEY: &str = "example_key";

/// A rendered top-level variable, before priorities are assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedVariable {
    pub name: String,
    pub required: bool,
    pub description: String,
    pub schema: String,
}

/// The variables of one module.
#[derive(Debug)]
pub struct SchemaTree<'p> {
    module: String,
    policy: &'p PolicyOptions,
    nodes: Vec<Node>,
    variables: Vec<NodeId>,
}

impl<'p> SchemaTree<'p> {
    /// Empty tree for a module.
    #[must_use]
    pub fn new(module: &str, policy: &'p PolicyOptions) -> Self {
        Self {
            module: module.to_string(),
            policy,
            nodes: Vec::new(),
            variables: Vec::new(),
        }
    }

    /// Build the tree from variable declarations.
    ///
    /// # Errors
    ///
    /// Returns `MalformedExpression` if any type constraint cannot be parsed.
    pub fn decode(
        module: &str,
        variables: &[RawVariable],
        policy: &'p PolicyOptions,
    ) -> Result<Self> {
        let mut tree = Self::new(module, policy);
        for variable in variables {
            let descriptor = parse_type_expression(&variable.type_expr)?;
            tree.add_variable(&variable.name, variable.is_required(), &variable.description, &descriptor);
        }
        tracing::debug!(module = %module, variables = tree.variables.len(), "Decoded variables");
        Ok(tree)
    }

    /// Top-level attribute ids in declaration order.
    #[must_use]
    pub fn variables(&self) -> &[NodeId] {
        &self.variables
    }

    /// Add a top-level variable.
    pub fn add_variable(
        &mut self,
        name: &str,
        required: bool,
        description: &str,
        descriptor: &TypeDescriptor,
    ) -> NodeId {
        let id = self.add_attribute(None, name, required, description, descriptor, None);
        self.variables.push(id);
        id
    }

    #[must_use]
    pub fn attribute(&self, id: NodeId) -> Option<&AttributeNode> {
        match &self.nodes.get(id.0)?.kind {
            NodeKind::Attribute(attr) => Some(attr),
            NodeKind::Value(_) => None,
        }
    }

    #[must_use]
    pub fn value(&self, id: NodeId) -> Option<&ValueNode> {
        match &self.nodes.get(id.0)?.kind {
            NodeKind::Value(value) => Some(value),
            NodeKind::Attribute(_) => None,
        }
    }

    /// Top-level variable by name.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&AttributeNode> {
        self.variables
            .iter()
            .filter_map(|id| self.attribute(*id))
            .find(|attr| attr.name == name)
    }

    // =========================================================================
    // Construction
    // =========================================================================

    fn push(&mut self, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node { parent, kind });
        id
    }

    fn add_attribute(
        &mut self,
        parent: Option<NodeId>,
        name: &str,
        required: bool,
        description: &str,
        descriptor: &TypeDescriptor,
        default: Option<&str>,
    ) -> NodeId {
        let attr = self.push(
            parent,
            NodeKind::Attribute(AttributeNode {
                name: name.to_string(),
                required,
                description: description.to_string(),
                value: NodeId(0),
            }),
        );
        let value = self.build_value(descriptor, Some(attr), default);
        if let NodeKind::Attribute(node) = &mut self.nodes[attr.0].kind {
            node.value = value;
        }
        attr
    }

    fn build_value(&mut self, descriptor: &TypeDescriptor, parent: Option<NodeId>, default: Option<&str>) -> NodeId {
        match descriptor {
            TypeDescriptor::Primitive(kind) => {
                let default = default.filter(|d| *d != "null").map(unquote);
                self.push(parent, NodeKind::Value(ValueNode::primitive(*kind, default)))
            }
            TypeDescriptor::List(element) => self.push(
                parent,
                NodeKind::Value(ValueNode::List(Sequence {
                    element: (**element).clone(),
                    child: None,
                    reference: None,
                })),
            ),
            TypeDescriptor::Set(element) => self.push(
                parent,
                NodeKind::Value(ValueNode::Set(Sequence {
                    element: (**element).clone(),
                    child: None,
                    reference: None,
                })),
            ),
            TypeDescriptor::Map(element) => self.push(
                parent,
                NodeKind::Value(ValueNode::Map(MapValue {
                    element: (**element).clone(),
                    key: None,
                    child: None,
                    reference: None,
                })),
            ),
            TypeDescriptor::Object(fields) => {
                let object = self.push(parent, NodeKind::Value(ValueNode::Object(ObjectValue::default())));
                let ordered = fields
                    .iter()
                    .filter(|f| !f.is_optional())
                    .chain(fields.iter().filter(|f| f.is_optional()));
                let mut children = Vec::with_capacity(fields.len());
                for field in ordered {
                    children.push(self.add_attribute(
                        Some(object),
                        &field.name,
                        !field.is_optional(),
                        "",
                        field.value_type(),
                        field.default(),
                    ));
                }
                if let NodeKind::Value(ValueNode::Object(node)) = &mut self.nodes[object.0].kind {
                    node.children = children;
                }
                object
            }
            TypeDescriptor::Optional { inner, default: own } => {
                self.build_value(inner, parent, own.as_deref().or(default))
            }
        }
    }

    /// The representative element of a list, set or map, created on demand.
    fn ensure_child(&mut self, id: NodeId) -> Result<NodeId> {
        let (existing, element) = match self.value(id) {
            Some(ValueNode::List(seq) | ValueNode::Set(seq)) => (seq.child, seq.element.clone()),
            Some(ValueNode::Map(map)) => (map.child, map.element.clone()),
            _ => return Err(self.missing_node(id, "collection")),
        };
        if let Some(child) = existing {
            return Ok(child);
        }

        let child = self.build_value(&element, Some(id), None);
        match self.value_mut(id)? {
            ValueNode::List(seq) | ValueNode::Set(seq) => seq.child = Some(child),
            ValueNode::Map(map) => map.child = Some(child),
            _ => {}
        }
        Ok(child)
    }

    fn value_mut(&mut self, id: NodeId) -> Result<&mut ValueNode> {
        match self.nodes.get_mut(id.0).map(|n| &mut n.kind) {
            Some(NodeKind::Value(value)) => Ok(value),
            _ => Err(crate::err!(Internal {
                message: format!("node {} is not a value", id.0),
            })),
        }
    }

    fn missing_node(&self, id: NodeId, expected: &str) -> crate::error::VarsmithError {
        crate::err!(Internal {
            message: format!("node {} of module '{}' is not a {expected}", id.0, self.module),
        })
    }

    // =========================================================================
    // Upward lookups
    // =========================================================================

    /// Nearest attribute at or above `id`.
    fn owner(&self, id: NodeId) -> Option<&AttributeNode> {
        let mut current = Some(id);
        while let Some(node_id) = current {
            if let Some(attr) = self.attribute(node_id) {
                return Some(attr);
            }
            current = self.nodes.get(node_id.0).and_then(|n| n.parent);
        }
        None
    }

    /// Nearest attribute strictly above attribute `id`.
    fn enclosing(&self, id: NodeId) -> Option<&AttributeNode> {
        let parent = self.nodes.get(id.0)?.parent?;
        self.owner(parent)
    }

    fn owner_id(&self, id: NodeId) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node_id) = current {
            if self.attribute(node_id).is_some() {
                return Some(node_id);
            }
            current = self.nodes.get(node_id.0).and_then(|n| n.parent);
        }
        None
    }

    // =========================================================================
    // Example values
    // =========================================================================

    /// Apply one example module block's values onto the matching variables.
    /// Variables the example does not set are left alone.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` or `MissingRequiredField` when a value does not
    /// fit its declaration.
    pub fn apply_example(&mut self, values: &Map<String, Value>) -> Result<()> {
        for id in self.variables.clone() {
            let Some(attr) = self.attribute(id) else { continue };
            let value_id = attr.value;
            if let Some(value) = values.get(&attr.name) {
                tracing::trace!(module = %self.module, variable = %attr.name, "Applying example value");
                self.apply_value(value_id, value)?;
            }
        }
        Ok(())
    }

    /// Apply an example value to a value node.
    ///
    /// Null and blank strings are ignored. A string carrying a cross-module
    /// reference is stored verbatim whatever the declared kind.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` or `MissingRequiredField`.
    pub fn apply_value(&mut self, id: NodeId, value: &Value) -> Result<()> {
        if is_blank(value) {
            return Ok(());
        }
        if let Value::String(text) = value {
            if text.starts_with(&self.policy.reference_marker()) {
                self.store_reference(id, text)?;
                return Ok(());
            }
        }

        let attribute = self.owner(id).map(|a| a.name.clone()).unwrap_or_default();
        let mismatch = |expected: &str| {
            crate::err!(TypeMismatch {
                attribute: attribute.clone(),
                expected: expected.to_string(),
                value: value.to_string(),
            })
        };

        match self.value(id) {
            Some(ValueNode::Number(_)) => {
                let text = number_text(value).ok_or_else(|| mismatch("number"))?;
                self.store_scalar(id, text)
            }
            Some(ValueNode::Bool(_)) => {
                let text = bool_text(value).ok_or_else(|| mismatch("bool"))?;
                self.store_scalar(id, text)
            }
            Some(node @ (ValueNode::String(_) | ValueNode::Any(_) | ValueNode::Unknown(_))) => {
                match string_text(value) {
                    Some(text) => self.store_scalar(id, text),
                    None => {
                        tracing::debug!(attribute = %attribute, kind = node.kind_name(), "Skipping container value");
                        Ok(())
                    }
                }
            }
            Some(node @ (ValueNode::List(_) | ValueNode::Set(_))) => {
                let Value::Array(items) = value else {
                    tracing::debug!(attribute = %attribute, kind = node.kind_name(), "Skipping non-sequence value");
                    return Ok(());
                };
                for item in items {
                    let child = self.ensure_child(id)?;
                    self.apply_value(child, item)?;
                }
                Ok(())
            }
            Some(ValueNode::Map(_)) => {
                let Value::Object(entries) = value else {
                    tracing::debug!(attribute = %attribute, "Skipping non-object value for map");
                    return Ok(());
                };
                for (key, item) in entries {
                    if let ValueNode::Map(map) = self.value_mut(id)? {
                        map.key.get_or_insert_with(|| key.clone());
                    }
                    let child = self.ensure_child(id)?;
                    self.apply_value(child, item)?;
                }
                Ok(())
            }
            Some(ValueNode::Object(object)) => {
                let Value::Object(entries) = value else {
                    return Err(mismatch("object"));
                };
                let children = object.children.clone();
                for child in children {
                    let Some(attr) = self.attribute(child) else { continue };
                    let (name, required, value_id) = (attr.name.clone(), attr.required, attr.value);
                    match entries.get(&name) {
                        Some(item) => self.apply_value(value_id, item)?,
                        None if required => {
                            return Err(crate::err!(MissingRequiredField { field: name }));
                        }
                        None => {}
                    }
                }
                Ok(())
            }
            None => Err(self.missing_node(id, "value")),
        }
    }

    fn store_scalar(&mut self, id: NodeId, text: String) -> Result<()> {
        match self.value_mut(id)? {
            ValueNode::String(s)
            | ValueNode::Number(s)
            | ValueNode::Bool(s)
            | ValueNode::Any(s)
            | ValueNode::Unknown(s) => {
                s.observed.insert(text.clone());
                s.default = Some(text);
            }
            _ => {}
        }
        Ok(())
    }

    fn store_reference(&mut self, id: NodeId, text: &str) -> Result<()> {
        match self.value_mut(id)? {
            ValueNode::List(seq) | ValueNode::Set(seq) => seq.reference = Some(text.to_string()),
            ValueNode::Map(map) => map.reference = Some(text.to_string()),
            ValueNode::Object(object) => object.reference = Some(text.to_string()),
            _ => return self.store_scalar(id, text.to_string()),
        }
        Ok(())
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Render every top-level variable in declaration order.
    ///
    /// # Errors
    ///
    /// Returns `Internal` only if the arena is inconsistent.
    pub fn render_variables(&mut self) -> Result<Vec<RenderedVariable>> {
        let mut rendered = Vec::with_capacity(self.variables.len());
        for id in self.variables.clone() {
            let schema = self.render_attribute(id)?;
            let Some(attr) = self.attribute(id) else { continue };
            rendered.push(RenderedVariable {
                name: attr.name.clone(),
                required: attr.required,
                description: attr.description.clone(),
                schema,
            });
        }
        Ok(rendered)
    }

    /// Comment line plus `name = value`.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if `id` is not an attribute.
    pub fn render_attribute(&mut self, id: NodeId) -> Result<String> {
        let Some(attr) = self.attribute(id) else {
            return Err(self.missing_node(id, "attribute"));
        };
        let (name, required, value) = (attr.name.clone(), attr.required, attr.value);
        let scope = self
            .enclosing(id)
            .map_or_else(|| "module".to_string(), |parent| format!("`{}`", parent.name));
        let status = if required { "Required" } else { "Optional" };

        let rendered = self.render_value(value)?;
        Ok(format!("# `{name}` is {status} in {scope}\n{name} = {}\n", rendered.trim_end()))
    }

    fn render_value(&mut self, id: NodeId) -> Result<String> {
        match self.value(id) {
            Some(ValueNode::String(s) | ValueNode::Any(s) | ValueNode::Unknown(s)) => {
                let default = s.default.clone();
                Ok(self.render_string(id, default))
            }
            Some(ValueNode::Number(s)) => Ok(s.default.clone().unwrap_or_else(|| "0".to_string())),
            Some(ValueNode::Bool(s)) => Ok(s.default.clone().unwrap_or_else(|| "false".to_string())),
            Some(ValueNode::List(seq) | ValueNode::Set(seq)) => {
                if let Some(reference) = &seq.reference {
                    return Ok(reference.clone());
                }
                if seq.child.is_none() && seq.element.is_primitive() {
                    return Ok("[]".to_string());
                }
                let child = self.ensure_child(id)?;
                let item = self.render_value(child)?;
                Ok(format!("[{}]", item.trim_end()))
            }
            Some(ValueNode::Map(map)) => {
                if let Some(reference) = &map.reference {
                    return Ok(reference.clone());
                }
                let key = map.key.clone().unwrap_or_else(|| PLACEHOLDER_KEY.to_string());
                let child = self.ensure_child(id)?;
                let item = self.render_value(child)?;
                Ok(format!(
                    "{{\n  {} = {}\n}}\n",
                    quote_key(&key),
                    indent_tail(item.trim_end())
                ))
            }
            Some(ValueNode::Object(object)) => {
                if let Some(reference) = &object.reference {
                    return Ok(reference.clone());
                }
                let children = object.children.clone();
                let mut out = String::from("{\n");
                for child in children {
                    out.push_str(&indent_all(&self.render_attribute(child)?));
                }
                out.push_str("}\n");
                Ok(out)
            }
            None => Err(self.missing_node(id, "value")),
        }
    }

    fn render_string(&self, id: NodeId, default: Option<String>) -> String {
        if let Some(text) = default.filter(|d| !d.is_empty() && d != "null") {
            if text.starts_with(&self.policy.reference_marker()) {
                return text;
            }
            return quote(&text);
        }

        let Some(owner) = self.owner_id(id) else {
            return "\"\"".to_string();
        };
        match self.attribute(owner) {
            Some(attr) if attr.required => {
                let parent = self.enclosing(owner).map(|p| p.name.as_str());
                defaults::required_string(self.policy, &attr.name, parent)
            }
            _ => "\"\"".to_string(),
        }
    }
}

/// Turn rendered variables into document entries.
///
/// Required variables come first, shortest snippet first, with `name` pinned
/// to 0 and `location` to 1. Optional variables are ordered the same way from
/// `optional_base` upward. Ties keep declaration order.
#[must_use]
pub fn assign_priorities(rendered: Vec<RenderedVariable>, optional_base: usize) -> BTreeMap<String, VariableEntry> {
    let (mut required, mut optional): (Vec<_>, Vec<_>) = rendered.into_iter().partition(|v| v.required);
    required.sort_by_key(|v| v.schema.lines().count());
    optional.sort_by_key(|v| v.schema.lines().count());

    let mut entries = BTreeMap::new();
    let mut next = 2;
    for variable in required {
        let priority = if variable.name.eq_ignore_ascii_case("name") {
            0
        } else if variable.name.eq_ignore_ascii_case("location") {
            1
        } else {
            let priority = next;
            next += 1;
            priority
        };
        entries.insert(variable.name.clone(), entry(variable, priority));
    }
    for (offset, variable) in optional.into_iter().enumerate() {
        entries.insert(variable.name.clone(), entry(variable, optional_base + offset));
    }
    entries
}

fn entry(variable: RenderedVariable, priority: usize) -> VariableEntry {
    VariableEntry {
        required: variable.required,
        description: variable.description,
        priority,
        schema: variable.schema,
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn number_text(value: &Value) -> Option<String> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    Some(number.to_string())
}

fn bool_text(value: &Value) -> Option<String> {
    match value {
        Value::Bool(b) => Some(b.to_string()),
        Value::String(s) => {
            let s = s.trim();
            (s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false")).then(|| s.to_ascii_lowercase())
        }
        _ => None,
    }
}

fn string_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn unquote(text: &str) -> String {
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
        .to_string()
}

fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn quote_key(key: &str) -> String {
    if key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        key.to_string()
    } else {
        quote(key)
    }
}

fn indent_all(text: &str) -> String {
    let mut out = String::new();
    for line in text.lines() {
        if !line.is_empty() {
            out.push_str("  ");
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Indent every line but the first.
fn indent_tail(text: &str) -> String {
    text.replace('\n', "\n  ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VarsmithError;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn variable(name: &str, type_expr: &str, has_default: bool) -> RawVariable {
        RawVariable {
            name: name.to_string(),
            type_expr: type_expr.to_string(),
            has_default,
            nullable: false,
            description: format!("The {name}."),
        }
    }

    fn tree<'p>(policy: &'p PolicyOptions, variables: &[RawVariable]) -> SchemaTree<'p> {
        SchemaTree::decode("avm-res-test", variables, policy).unwrap()
    }

    fn schema_of(tree: &mut SchemaTree<'_>, name: &str) -> String {
        tree.render_variables()
            .unwrap()
            .into_iter()
            .find(|v| v.name == name)
            .map(|v| v.schema)
            .unwrap()
    }

    #[test]
    fn test_object_children_split_required_first() {
        let policy = PolicyOptions::default();
        let tree = tree(
            &policy,
            &[variable("settings", "object({ a = string, b = optional(number), c = bool })", false)],
        );
        let attr = tree.variable("settings").unwrap();
        let Some(ValueNode::Object(object)) = tree.value(attr.value) else {
            panic!("Expected object");
        };
        let children: Vec<_> = object
            .children
            .iter()
            .map(|id| {
                let child = tree.attribute(*id).unwrap();
                (child.name.as_str(), child.required)
            })
            .collect();
        assert_eq!(children, vec![("a", true), ("c", true), ("b", false)]);
    }

    #[test]
    fn test_name_and_location_defaults_sorted_first() {
        let policy = PolicyOptions::default();
        let mut tree = tree(
            &policy,
            &[
                variable("network", "object({ subnet = string, cidr = string })", false),
                variable("location", "string", false),
                variable("sku_name", "string", false),
                variable("name", "string", false),
                variable("tags", "map(string)", true),
            ],
        );
        let rendered = tree.render_variables().unwrap();
        let name = rendered.iter().find(|v| v.name == "name").unwrap();
        assert_eq!(name.schema, "# `name` is Required in module\nname = \"example1\"\n");
        let location = rendered.iter().find(|v| v.name == "location").unwrap();
        assert_eq!(location.schema, "# `location` is Required in module\nlocation = \"westeurope\"\n");

        let entries = assign_priorities(rendered, policy.optional_priority_base);
        assert_eq!(entries["name"].priority, 0);
        assert_eq!(entries["location"].priority, 1);
        assert_eq!(entries["sku_name"].priority, 2);
        assert_eq!(entries["network"].priority, 3);
        assert_eq!(entries["tags"].priority, 10_000);
        assert_eq!(entries["name"].description, "The name.");
    }

    #[test]
    fn test_number_conformance() {
        let policy = PolicyOptions::default();
        let mut tree = tree(&policy, &[variable("capacity", "number", false)]);
        tree.apply_example(json!({"capacity": 42}).as_object().unwrap()).unwrap();
        assert!(schema_of(&mut tree, "capacity").ends_with("capacity = 42\n"));

        let err = tree
            .apply_example(json!({"capacity": "abc"}).as_object().unwrap())
            .unwrap_err();
        assert!(matches!(err, VarsmithError::TypeMismatch { .. }));
    }

    #[test]
    fn test_numeric_string_and_bool_spellings() {
        let policy = PolicyOptions::default();
        let mut tree = tree(&policy, &[variable("count", "number", false), variable("enabled", "bool", false)]);
        tree.apply_example(json!({"count": "3", "enabled": " TRUE "}).as_object().unwrap())
            .unwrap();
        assert!(schema_of(&mut tree, "count").ends_with("count = 3\n"));
        assert!(schema_of(&mut tree, "enabled").ends_with("enabled = true\n"));

        let err = tree
            .apply_example(json!({"enabled": "yes"}).as_object().unwrap())
            .unwrap_err();
        assert!(matches!(err, VarsmithError::TypeMismatch { .. }));
    }

    #[test]
    fn test_empty_example_values_fall_through() {
        let policy = PolicyOptions::default();
        let mut tree = tree(
            &policy,
            &[variable("name", "string", false), variable("sku_name", "string", false)],
        );
        tree.apply_example(json!({"name": "", "sku_name": null}).as_object().unwrap())
            .unwrap();
        assert!(schema_of(&mut tree, "name").ends_with("name = \"example1\"\n"));
        assert!(schema_of(&mut tree, "sku_name").ends_with("sku_name = var.string_sku_name\n"));
    }

    #[test]
    fn test_references_are_verbatim() {
        let policy = PolicyOptions::default();
        let mut tree = tree(
            &policy,
            &[variable("subnet_id", "string", false), variable("subnet_ids", "list(string)", false)],
        );
        tree.apply_example(
            json!({
                "subnet_id": "module.avm_res_network_virtualnetwork.subnets.a.resource_id",
                "subnet_ids": "module.avm_res_network_virtualnetwork.subnet_ids",
            })
            .as_object()
            .unwrap(),
        )
        .unwrap();
        assert!(schema_of(&mut tree, "subnet_id")
            .ends_with("subnet_id = module.avm_res_network_virtualnetwork.subnets.a.resource_id\n"));
        assert!(schema_of(&mut tree, "subnet_ids")
            .ends_with("subnet_ids = module.avm_res_network_virtualnetwork.subnet_ids\n"));
    }

    #[test]
    fn test_object_missing_required_key() {
        let policy = PolicyOptions::default();
        let mut tree = tree(&policy, &[variable("identity", "object({ type = string, ids = optional(list(string)) })", false)]);
        let err = tree
            .apply_example(json!({"identity": {"ids": []}}).as_object().unwrap())
            .unwrap_err();
        match err {
            VarsmithError::MissingRequiredField { field, .. } => assert_eq!(field, "type"),
            other => panic!("Expected MissingRequiredField, got {other:?}"),
        }
    }

    #[test]
    fn test_nested_object_render() {
        let policy = PolicyOptions::default();
        let mut tree = tree(
            &policy,
            &[variable(
                "ip_configuration",
                "object({ subnet_id = string, size = optional(number, 3), label = optional(string, \"web\") })",
                false,
            )],
        );
        assert_eq!(
            schema_of(&mut tree, "ip_configuration"),
            "# `ip_configuration` is Required in module\n\
             ip_configuration = {\n  \
             # `subnet_id` is Required in `ip_configuration`\n  \
             subnet_id = var.string_ip_configuration_subnet_id\n  \
             # `size` is Optional in `ip_configuration`\n  \
             size = 3\n  \
             # `label` is Optional in `ip_configuration`\n  \
             label = \"web\"\n\
             }\n"
        );
    }

    #[test]
    fn test_collections_render() {
        let policy = PolicyOptions::default();
        let mut tree = tree(
            &policy,
            &[
                variable("zones", "set(string)", true),
                variable("rules", "list(object({ port = number }))", true),
                variable("tags", "map(string)", true),
            ],
        );
        assert!(schema_of(&mut tree, "zones").ends_with("zones = []\n"));
        assert!(schema_of(&mut tree, "rules").ends_with("rules = [{\n  # `port` is Required in `rules`\n  port = 0\n}]\n"));
        assert!(schema_of(&mut tree, "tags").ends_with("tags = {\n  example_key = \"\"\n}\n"));
    }

    #[test]
    fn test_map_folds_keys_into_one_child() {
        let policy = PolicyOptions::default();
        let mut tree = tree(&policy, &[variable("tags", "map(string)", true)]);
        tree.apply_example(json!({"tags": {"env": "dev", "owner.team": "core"}}).as_object().unwrap())
            .unwrap();
        assert!(schema_of(&mut tree, "tags").ends_with("tags = {\n  env = \"core\"\n}\n"));

        let attr = tree.variable("tags").unwrap();
        let Some(ValueNode::Map(map)) = tree.value(attr.value) else {
            panic!("Expected map");
        };
        let observed = &tree.value(map.child.unwrap()).unwrap().scalar().unwrap().observed;
        assert_eq!(observed.len(), 2);
    }

    #[test]
    fn test_list_items_fold_into_representative() {
        let policy = PolicyOptions::default();
        let mut tree = tree(&policy, &[variable("address_space", "list(string)", false)]);
        tree.apply_example(json!({"address_space": ["10.0.0.0/16", "10.1.0.0/16"]}).as_object().unwrap())
            .unwrap();
        assert!(schema_of(&mut tree, "address_space").ends_with("address_space = [\"10.1.0.0/16\"]\n"));
    }

    #[test]
    fn test_mismatched_container_values_are_skipped() {
        let policy = PolicyOptions::default();
        let mut tree = tree(
            &policy,
            &[
                variable("subnet_id", "string", false),
                variable("settings", "any", true),
                variable("zones", "list(string)", true),
                variable("tags", "map(string)", true),
            ],
        );
        tree.apply_example(
            json!({
                "subnet_id": [""],
                "settings": {"a": 1},
                "zones": "1",
                "tags": "x",
            })
            .as_object()
            .unwrap(),
        )
        .unwrap();
        assert!(schema_of(&mut tree, "subnet_id").ends_with("subnet_id = var.string_subnet_id\n"));
        assert!(schema_of(&mut tree, "zones").ends_with("zones = []\n"));
        assert!(schema_of(&mut tree, "tags").ends_with("tags = {\n  example_key = \"\"\n}\n"));
    }

    #[test]
    fn test_object_rejects_scalar_value() {
        let policy = PolicyOptions::default();
        let mut tree = tree(&policy, &[variable("identity", "object({ type = string })", true)]);
        let err = tree
            .apply_example(json!({"identity": "SystemAssigned"}).as_object().unwrap())
            .unwrap_err();
        assert!(matches!(err, VarsmithError::TypeMismatch { .. }));
    }

    #[test]
    fn test_malformed_type_aborts_decode() {
        let policy = PolicyOptions::default();
        let result = SchemaTree::decode("m", &[variable("x", "tuple([string])", false)], &policy);
        assert!(matches!(result, Err(VarsmithError::MalformedExpression { .. })));
    }
}
