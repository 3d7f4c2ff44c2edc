//! Node types stored in the [`SchemaTree`](super::SchemaTree) arena.

use crate::parser::{PrimitiveKind, TypeDescriptor};
use std::collections::BTreeSet;

/// Index of a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// An arena slot. `parent` is only used for upward name lookups.
#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) kind: NodeKind,
}

#[derive(Debug, Clone)]
pub(crate) enum NodeKind {
    Attribute(AttributeNode),
    Value(ValueNode),
}

/// A named field: a top-level variable or an object attribute.
#[derive(Debug, Clone)]
pub struct AttributeNode {
    pub name: String,
    pub required: bool,
    pub description: String,
    /// The one value this attribute owns.
    pub value: NodeId,
}

/// One value in the tree, by declared kind.
#[derive(Debug, Clone)]
pub enum ValueNode {
    String(Scalar),
    Number(Scalar),
    Bool(Scalar),
    Any(Scalar),
    Unknown(Scalar),
    List(Sequence),
    Set(Sequence),
    Map(MapValue),
    Object(ObjectValue),
}

/// State shared by the primitive kinds.
#[derive(Debug, Clone, Default)]
pub struct Scalar {
    /// Text rendered for this value; example values replace it.
    pub default: Option<String>,
    /// Every distinct value applied from examples.
    pub observed: BTreeSet<String>,
}

/// `list(T)` or `set(T)` with one lazily created representative element.
#[derive(Debug, Clone)]
pub struct Sequence {
    pub element: TypeDescriptor,
    pub child: Option<NodeId>,
    /// Cross-module reference standing for the whole collection.
    pub reference: Option<String>,
}

/// `map(T)`: every observed key folds into one representative child.
#[derive(Debug, Clone)]
pub struct MapValue {
    pub element: TypeDescriptor,
    pub key: Option<String>,
    pub child: Option<NodeId>,
    pub reference: Option<String>,
}

/// `object({...})`: attribute children, required first.
#[derive(Debug, Clone, Default)]
pub struct ObjectValue {
    pub children: Vec<NodeId>,
    pub reference: Option<String>,
}

impl ValueNode {
    /// Empty node for a primitive kind.
    #[must_use]
    pub fn primitive(kind: PrimitiveKind, default: Option<String>) -> Self {
        let scalar = Scalar {
            default,
            observed: BTreeSet::new(),
        };
        match kind {
            PrimitiveKind::String => Self::String(scalar),
            PrimitiveKind::Number => Self::Number(scalar),
            PrimitiveKind::Bool => Self::Bool(scalar),
            PrimitiveKind::Any => Self::Any(scalar),
            PrimitiveKind::Unknown => Self::Unknown(scalar),
        }
    }

    /// Keyword of the declared kind, used in mismatch messages.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Number(_) => "number",
            Self::Bool(_) => "bool",
            Self::Any(_) => "any",
            Self::Unknown(_) => "unknown",
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::Map(_) => "map",
            Self::Object(_) => "object",
        }
    }

    /// The scalar state of a primitive node.
    #[must_use]
    pub fn scalar(&self) -> Option<&Scalar> {
        match self {
            Self::String(s) | Self::Number(s) | Self::Bool(s) | Self::Any(s) | Self::Unknown(s) => Some(s),
            _ => None,
        }
    }
}
