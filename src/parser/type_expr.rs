//! Type constraint expression parser.
//!
//! Parses the subset of the Terraform type-constraint language used by
//! module variables into a [`TypeDescriptor`]:
//!
//! ```text
//! expr     := "${" expr "}" | '"' expr '"'
//!           | "optional" "(" expr [ "," literal ] ")"
//!           | "string" | "number" | "bool" | "any" | "unknown"
//!           | ("list" | "set" | "map") "(" expr ")"
//!           | "object" "(" "{" { key (":" | "=") expr [","] } "}" ")"
//! key      := quoted string | identifier
//! literal  := balanced {...} / [...] | quoted string | null | bare token
//! ```
//!
//! Both the JSON-flavoured rendering (`object({"a": "string"})`) and the
//! native HCL rendering (`object({ a = string })`) are accepted, so the
//! canonical [`Display`](std::fmt::Display) output of a descriptor parses
//! back to the same descriptor.

use super::cursor::Cursor;
use crate::error::Result;
use std::fmt;

/// Primitive type keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    String,
    Number,
    Bool,
    Any,
    Unknown,
}

impl PrimitiveKind {
    pub const ALL: [Self; 5] = [Self::String, Self::Number, Self::Bool, Self::Any, Self::Unknown];

    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Bool => "bool",
            Self::Any => "any",
            Self::Unknown => "unknown",
        }
    }
}

/// Structured form of a type constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    Primitive(PrimitiveKind),
    List(Box<TypeDescriptor>),
    Set(Box<TypeDescriptor>),
    Map(Box<TypeDescriptor>),
    /// Attributes in declaration order.
    Object(Vec<ObjectField>),
    /// `optional(inner[, default])`, only meaningful as an object attribute.
    Optional {
        inner: Box<TypeDescriptor>,
        /// Raw default literal text.
        default: Option<String>,
    },
}

/// One attribute of an `object({...})` constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectField {
    pub name: String,
    pub descriptor: TypeDescriptor,
}

impl ObjectField {
    /// Declared with `optional(...)`.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        matches!(self.descriptor, TypeDescriptor::Optional { .. })
    }

    /// The attribute's type with any `optional(...)` wrapper removed.
    #[must_use]
    pub fn value_type(&self) -> &TypeDescriptor {
        match &self.descriptor {
            TypeDescriptor::Optional { inner, .. } => inner,
            other => other,
        }
    }

    /// Raw default text from `optional(T, default)`.
    #[must_use]
    pub fn default(&self) -> Option<&str> {
        match &self.descriptor {
            TypeDescriptor::Optional { default, .. } => default.as_deref(),
            _ => None,
        }
    }
}

impl TypeDescriptor {
    /// Whether this is a primitive (after unwrapping `optional`).
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        match self {
            Self::Primitive(_) => true,
            Self::Optional { inner, .. } => inner.is_primitive(),
            _ => false,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(kind) => f.write_str(kind.keyword()),
            Self::List(inner) => write!(f, "list({inner})"),
            Self::Set(inner) => write!(f, "set({inner})"),
            Self::Map(inner) => write!(f, "map({inner})"),
            Self::Object(fields) => {
                f.write_str("object({")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{:?}: {}", field.name, field.descriptor)?;
                }
                f.write_str("})")
            }
            Self::Optional { inner, default: Some(default) } => write!(f, "optional({inner}, {default})"),
            Self::Optional { inner, default: None } => write!(f, "optional({inner})"),
        }
    }
}

/// Parse a complete constraint expression.
///
/// # Errors
///
/// Returns `MalformedExpression` with the offending offset if the text is not
/// a single valid expression.
pub fn parse_type_expression(text: &str) -> Result<TypeDescriptor> {
    let (end, descriptor) = parse_type_expression_at(text, 0)?;
    let mut cursor = Cursor::new(text, end);
    cursor.skip_ws();
    if !cursor.is_eof() {
        return Err(cursor.error("unexpected trailing input".to_string()));
    }
    Ok(descriptor)
}

/// Parse one expression starting at `start`; returns the end offset.
///
/// # Errors
///
/// Returns `MalformedExpression` on an unrecognized token or unterminated
/// bracket.
pub fn parse_type_expression_at(text: &str, start: usize) -> Result<(usize, TypeDescriptor)> {
    let mut cursor = Cursor::new(text, start);
    let descriptor = parse_expression(&mut cursor)?;
    Ok((cursor.pos(), descriptor))
}

fn parse_expression(cursor: &mut Cursor<'_>) -> Result<TypeDescriptor> {
    cursor.skip_ws();

    if cursor.eat("${") {
        let inner = parse_expression(cursor)?;
        cursor.skip_ws();
        cursor.expect("}")?;
        return Ok(inner);
    }
    if cursor.eat("\"") {
        let inner = parse_expression(cursor)?;
        cursor.skip_ws();
        cursor.expect("\"")?;
        return Ok(inner);
    }
    if cursor.at_keyword("optional") {
        return parse_optional(cursor);
    }
    for kind in PrimitiveKind::ALL {
        if cursor.at_keyword(kind.keyword()) {
            cursor.eat(kind.keyword());
            return Ok(TypeDescriptor::Primitive(kind));
        }
    }
    if cursor.at_keyword("list") {
        return parse_container(cursor, "list").map(TypeDescriptor::List);
    }
    if cursor.at_keyword("set") {
        return parse_container(cursor, "set").map(TypeDescriptor::Set);
    }
    if cursor.at_keyword("map") {
        return parse_container(cursor, "map").map(TypeDescriptor::Map);
    }
    if cursor.at_keyword("object") {
        return parse_object(cursor);
    }

    Err(if cursor.is_eof() {
        cursor.error("expected a type expression, found end of input".to_string())
    } else {
        cursor.error("unrecognized type expression".to_string())
    })
}

/// `keyword(expr)` for list, set and map.
fn parse_container(cursor: &mut Cursor<'_>, keyword: &str) -> Result<Box<TypeDescriptor>> {
    cursor.eat(keyword);
    cursor.skip_ws();
    cursor.expect("(")?;
    let inner = parse_expression(cursor)?;
    cursor.skip_ws();
    cursor.expect(")")?;
    Ok(Box::new(inner))
}

fn parse_optional(cursor: &mut Cursor<'_>) -> Result<TypeDescriptor> {
    cursor.eat("optional");
    cursor.skip_ws();
    cursor.expect("(")?;
    let inner = parse_expression(cursor)?;
    cursor.skip_ws();

    let default = if cursor.eat(",") {
        cursor.skip_ws();
        Some(cursor.skip_literal()?.trim().to_string())
    } else {
        None
    };

    cursor.skip_ws();
    cursor.expect(")")?;
    Ok(TypeDescriptor::Optional {
        inner: Box::new(inner),
        default,
    })
}

fn parse_object(cursor: &mut Cursor<'_>) -> Result<TypeDescriptor> {
    cursor.eat("object");
    cursor.skip_ws();
    cursor.expect("(")?;
    cursor.skip_ws();
    cursor.expect("{")?;

    let mut fields = Vec::new();
    loop {
        cursor.skip_ws();
        if cursor.eat("}") {
            break;
        }

        let name = match cursor.peek() {
            Some('"') => cursor.quoted()?,
            _ => cursor
                .ident()
                .map(str::to_string)
                .ok_or_else(|| cursor.error("expected an attribute name".to_string()))?,
        };

        cursor.skip_ws();
        if !cursor.eat(":") && !cursor.eat("=") {
            return Err(cursor.error(format!("expected ':' or '=' after attribute '{name}'")));
        }

        let descriptor = parse_expression(cursor)?;
        fields.push(ObjectField { name, descriptor });

        cursor.skip_ws();
        cursor.eat(",");
    }

    cursor.skip_ws();
    cursor.expect(")")?;
    Ok(TypeDescriptor::Object(fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VarsmithError;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn object_field_names(descriptor: &TypeDescriptor) -> Vec<(&str, bool)> {
        match descriptor {
            TypeDescriptor::Object(fields) => fields
                .iter()
                .map(|f| (f.name.as_str(), f.is_optional()))
                .collect(),
            other => panic!("Expected object, got {other:?}"),
        }
    }

    #[test_case("string" ; "primitive")]
    #[test_case("list(map(number))" ; "nested containers")]
    #[test_case("set(object({\"a\": string}))" ; "set of objects")]
    #[test_case("object({\"a\": string, \"b\": optional(number, 5), \"c\": optional(list(string), [\"x\", \"y\"])})" ; "object with defaults")]
    #[test_case("object({\"a\": optional(object({\"b\": optional(map(string), {})}), { b = { k = \"v\" } })})" ; "nested braced default")]
    fn test_render_then_reparse_is_identical(text: &str) {
        let parsed = parse_type_expression(text).unwrap();
        let rendered = parsed.to_string();
        assert_eq!(parse_type_expression(&rendered).unwrap(), parsed);
    }

    #[test]
    fn test_python_style_quoted_object() {
        let parsed = parse_type_expression(
            r#"object({"name": "string", "capacity": "${optional(number, 3)}", "zones": "${optional(set(string))}"})"#,
        )
        .unwrap();
        assert_eq!(
            object_field_names(&parsed),
            vec![("name", false), ("capacity", true), ("zones", true)]
        );
        let TypeDescriptor::Object(fields) = &parsed else { unreachable!() };
        assert_eq!(fields[1].default(), Some("3"));
        assert_eq!(fields[2].value_type(), &TypeDescriptor::Set(Box::new(TypeDescriptor::Primitive(PrimitiveKind::String))));
    }

    #[test]
    fn test_hcl_style_multiline_object() {
        let text = "object({\n  name     = string\n  tags     = optional(map(string), {})\n  capacity = optional(number, 2)\n  enabled  = bool\n})";
        let parsed = parse_type_expression(text).unwrap();
        assert_eq!(
            object_field_names(&parsed),
            vec![("name", false), ("tags", true), ("capacity", true), ("enabled", false)]
        );
    }

    #[test]
    fn test_dollar_wrapped() {
        assert_eq!(
            parse_type_expression("${map(bool)}").unwrap(),
            TypeDescriptor::Map(Box::new(TypeDescriptor::Primitive(PrimitiveKind::Bool)))
        );
    }

    #[test]
    fn test_end_offset_is_returned() {
        let (end, descriptor) = parse_type_expression_at("list(string), trailing", 0).unwrap();
        assert_eq!(end, "list(string)".len());
        assert!(matches!(descriptor, TypeDescriptor::List(_)));
    }

    #[test]
    fn test_null_default() {
        let parsed = parse_type_expression("object({ a = optional(string, null) })").unwrap();
        let TypeDescriptor::Object(fields) = &parsed else { unreachable!() };
        assert_eq!(fields[0].default(), Some("null"));
    }

    #[test_case("tuple([string])", 0 ; "unsupported keyword")]
    #[test_case("list(string", 11 ; "unterminated container")]
    #[test_case("object({ a = string ", 20 ; "unterminated object")]
    #[test_case("optional(list(string), [1, 2)", 28 ; "unbalanced default")]
    fn test_malformed(text: &str, expected_position: usize) {
        match parse_type_expression(text).unwrap_err() {
            VarsmithError::MalformedExpression { position, source_text, .. } => {
                assert_eq!(position, expected_position);
                assert_eq!(source_text, text);
            }
            other => panic!("Expected MalformedExpression, got {other:?}"),
        }
    }
}
