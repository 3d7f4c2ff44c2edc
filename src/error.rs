//! Error types for Varsmith.
//!
//! This module defines the error hierarchy using `thiserror`. Every variant
//! records the source location that raised it so that a failure deep inside
//! a module's value tree can be traced back without a debugger.
//!
//! # Error Categories
//!
//! - **Input errors**: file system failures, invalid HCL
//! - **Data-integrity errors**: malformed type constraints, type mismatches,
//!   unsupported interpolation forms, missing required fields. These abort the
//!   affected module.
//! - **Graph errors**: dependency cycles and modules left without a priority.
//!   These abort the whole run.
//! - **Config errors**: invalid configuration files
//!
//! Formatter failures are deliberately absent from the fatal set: callers log
//! them and fall back to unformatted text.
//!
//! # Example
//!
//! ```rust
//! use varsmith::error::{VarsmithError, Result};
//!
//! fn read(path: &str) -> Result<String> {
//!     std::fs::read_to_string(path)
//!         .map_err(|e| VarsmithError::io(path, e, file!(), line!()))
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Macro to create errors with automatic source location tracking.
///
/// Usage:
/// ```ignore
/// return Err(err!(UnsupportedValueForm { value: text.to_string() }));
/// return Err(err!(Formatter { message }));
/// ```
#[macro_export]
macro_rules! err {
    ($variant:ident { $($field:ident $(: $value:expr)?),* $(,)? }) => {
        $crate::error::VarsmithError::$variant {
            $($field $(: $value)?,)*
            src_path: file!(),
            src_line: line!(),
        }
    };
}

/// A specialized Result type for Varsmith operations.
pub type Result<T> = std::result::Result<T, VarsmithError>;

/// The main error type for Varsmith.
#[derive(Error, Debug)]
pub enum VarsmithError {
    // =========================================================================
    // I/O and Input Errors
    // =========================================================================
    /// I/O error with path context.
    #[error("I/O error at '{path}' ({src_path}:{src_line}): {source}")]
    Io {
        /// The path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// HCL parsing error.
    #[error("Failed to parse HCL in '{file}' \n\t({src_path}:{src_line}): {message}")]
    HclParse {
        /// The file being parsed
        file: PathBuf,
        /// Error message
        message: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    // =========================================================================
    // Data-Integrity Errors
    // =========================================================================
    /// A type constraint expression could not be parsed.
    #[error("Malformed type expression at offset {position} in '{source_text}' ({src_path}:{src_line}): {message}")]
    MalformedExpression {
        /// Byte offset of the offending token
        position: usize,
        /// The full expression text
        source_text: String,
        /// What the parser expected
        message: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// An example value does not conform to the declared primitive kind.
    #[error("Type mismatch for '{attribute}': expected {expected}, got {value} ({src_path}:{src_line})")]
    TypeMismatch {
        /// Attribute receiving the value
        attribute: String,
        /// Declared kind
        expected: String,
        /// Offending value, rendered as JSON
        value: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// An example expression uses a construct the interpreter cannot resolve.
    #[error("Unsupported value form '{value}' ({src_path}:{src_line})")]
    UnsupportedValueForm {
        /// The expression text
        value: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// An object example omits a required key.
    #[error("Required attribute '{field}' is missing in the provided value ({src_path}:{src_line})")]
    MissingRequiredField {
        /// The missing key
        field: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// A module-fatal error, tagged with the module it aborted.
    #[error("Module '{module}' failed ({src_path}:{src_line}): {source}")]
    Module {
        /// Module name
        module: String,
        /// The underlying error
        #[source]
        source: Box<VarsmithError>,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    // =========================================================================
    // Graph Errors
    // =========================================================================
    /// The module dependency graph is not acyclic.
    #[error("Cycle detected in module dependencies ({src_path}:{src_line}): {members:?}")]
    CycleDetected {
        /// Modules participating in (or blocked by) the cycle
        members: Vec<String>,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// A module finished topological sorting without a priority.
    #[error("Module '{module}' does not have a priority assigned ({src_path}:{src_line})")]
    MissingPriority {
        /// Module name
        module: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// A module name was referenced that is not in the catalog.
    #[error("Unknown module '{module}' ({src_path}:{src_line})")]
    UnknownModule {
        /// Module name
        module: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    // =========================================================================
    // Formatter Errors
    // =========================================================================
    /// The external formatter failed. Never fatal.
    #[error("Formatter failed ({src_path}:{src_line}): {message}")]
    Formatter {
        /// Error message
        message: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration parsing error.
    #[error("Failed to parse configuration ({src_path}:{src_line}): {message}")]
    ConfigParse {
        /// Error message
        message: String,
        /// The underlying error (if any)
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}' ({src_path}:{src_line}): {message}")]
    ConfigValue {
        /// The configuration key
        key: String,
        /// Error message
        message: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    // =========================================================================
    // Generic Errors
    // =========================================================================
    /// Internal error (should not happen in normal operation).
    #[error("Internal error ({src_path}:{src_line}): {message}")]
    Internal {
        /// Error message
        message: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },
}

impl VarsmithError {
    /// Creates an `Io` error.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error, src_path: &'static str, src_line: u32) -> Self {
        Self::Io { path: path.into(), source, src_path, src_line }
    }

    /// Creates an `HclParse` error.
    #[must_use]
    pub fn hcl_parse(file: impl Into<PathBuf>, message: String, src_path: &'static str, src_line: u32) -> Self {
        Self::HclParse { file: file.into(), message, src_path, src_line }
    }

    /// Wraps this error with the name of the module it aborted.
    #[must_use]
    pub fn in_module(self, module: &str) -> Self {
        match self {
            already @ Self::Module { .. } => already,
            other => Self::Module {
                module: module.to_string(),
                source: Box::new(other),
                src_path: file!(),
                src_line: line!(),
            },
        }
    }

    /// Whether the error must abort the whole run rather than a single module.
    #[must_use]
    pub fn is_fatal_for_run(&self) -> bool {
        matches!(
            self,
            Self::CycleDetected { .. }
                | Self::MissingPriority { .. }
                | Self::ConfigParse { .. }
                | Self::ConfigValue { .. }
                | Self::Internal { .. }
        )
    }

    /// Returns the appropriate exit code for the error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Io { source, .. } if source.kind() == std::io::ErrorKind::PermissionDenied => 13,
            Self::Io { .. } => 14,
            Self::HclParse { .. } => 15,
            Self::MalformedExpression { .. }
            | Self::TypeMismatch { .. }
            | Self::UnsupportedValueForm { .. }
            | Self::MissingRequiredField { .. } => 16,
            Self::Module { source, .. } => source.exit_code(),
            Self::CycleDetected { .. } | Self::MissingPriority { .. } => 17,
            Self::ConfigParse { .. } => 18,
            Self::ConfigValue { .. } => 19,
            _ => 1,
        }
    }
}

impl From<serde_json::Error> for VarsmithError {
    fn from(source: serde_json::Error) -> Self {
        Self::Internal {
            message: format!("JSON serialization/deserialization error: {source}"),
            src_path: file!(),
            src_line: line!(),
        }
    }
}
