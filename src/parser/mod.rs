//! Parsing for module trees and type constraints.
//!
//! - [`type_expr`]: recursive-descent parser for variable type constraints
//! - [`hcl`]: reads `variable`, `output` and example `module` blocks with `hcl-rs`
//! - [`source`]: classifies module `source` strings
//!
//! # Example
//!
//! ```rust
//! use varsmith::parser::{parse_type_expression, TypeDescriptor};
//!
//! let descriptor = parse_type_expression("list(object({ name = string }))").unwrap();
//! assert!(matches!(descriptor, TypeDescriptor::List(_)));
//! ```

pub mod cursor;
mod hcl;
mod source;
mod type_expr;

pub use self::hcl::{
    decode_literal, lower_expression, parse_example, parse_outputs, parse_variables, ExampleFile,
    ExampleModule, HclParser, RawVariable,
};
pub use source::{parse_module_source, ModuleSource};
pub use type_expr::{
    parse_type_expression, parse_type_expression_at, ObjectField, PrimitiveKind, TypeDescriptor,
};
