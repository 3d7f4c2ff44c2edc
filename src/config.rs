//! Configuration module for Varsmith.
//!
//! This module handles loading and validating configuration from:
//! - YAML configuration files (`varsmith.yaml`)
//! - Environment variables
//! - CLI arguments
//!
//! # Configuration File Format
//!
//! ```yaml
//! # varsmith.yaml
//! paths:
//!   catalog: catalog.json
//!   modules_dir: modules
//!   provider_table: azurerm_to_avm.json
//!   output: avm_data.json
//! run:
//!   workers: 10
//!   continue_on_error: false
//! formatter:
//!   kind: terraform
//!   command: terraform
//! policy:
//!   module_prefix: avm-res-
//!   resource_group_module: avm-res-resources-resourcegroup
//! ```

use crate::error::{Result, VarsmithError};
use crate::types::FormatterKind;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::LazyLock;

static BRACED_ENV_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("Invalid regex"));

static BARE_ENV_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)").expect("Invalid regex"));

/// Input and output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathOptions {
    /// Module catalog (JSON map keyed by module name).
    pub catalog: PathBuf,

    /// Directory holding one materialized source tree per module.
    pub modules_dir: PathBuf,

    /// Provider resource type -> module name lookup table (JSON).
    pub provider_table: PathBuf,

    /// Where the aggregated document is written.
    pub output: PathBuf,
}

impl Default for PathOptions {
    fn default() -> Self {
        Self {
            catalog: PathBuf::from("catalog.json"),
            modules_dir: PathBuf::from("modules"),
            provider_table: PathBuf::from("azurerm_to_avm.json"),
            output: PathBuf::from("avm_data.json"),
        }
    }
}

/// Execution options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    /// Maximum number of modules processed concurrently.
    pub workers: usize,

    /// Drop a failing module from the document instead of aborting the run.
    pub continue_on_error: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            continue_on_error: false,
        }
    }
}

/// Snippet formatter options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatterOptions {
    /// Which formatter normalizes rendered snippets.
    pub kind: FormatterKind,

    /// Executable used by the `terraform` formatter.
    pub command: String,
}

impl Default for FormatterOptions {
    fn default() -> Self {
        Self {
            kind: FormatterKind::Terraform,
            command: "terraform".to_string(),
        }
    }
}

/// Catalog naming policy.
///
/// These are the module names and source strings that the default-synthesis
/// table, the example interpreter and the dependency builder special-case.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyOptions {
    /// Prefix shared by every catalog module name.
    pub module_prefix: String,

    /// Root-input module: never has dependencies, never resolves references.
    pub resource_group_module: String,

    /// Module referenced by `*ip_address_resource_{name,id}` placeholders.
    pub public_ip_module: String,

    /// Registry source of the key vault module (`resource.id` -> `resource_id`).
    pub key_vault_source: String,

    /// Registry source of the SKU finder helper module.
    pub sku_finder_source: String,

    /// Literal substituted for `module.<sku finder>.sku`.
    pub sku_literal: String,

    /// Resource type prefixes looked up in the provider table.
    pub provider_prefixes: Vec<String>,

    /// Substrings marking dynamic or ephemeral interpolations.
    pub dynamic_markers: Vec<String>,

    /// First priority handed to optional variables.
    pub optional_priority_base: usize,
}

impl Default for PolicyOptions {
    fn default() -> Self {
        Self {
            module_prefix: "avm-res-".to_string(),
            resource_group_module: "avm-res-resources-resourcegroup".to_string(),
            public_ip_module: "avm-res-network-publicipaddress".to_string(),
            key_vault_source: "Azure/avm-res-keyvault-vault/azurerm".to_string(),
            sku_finder_source: "Azure/avm-utl-sku-finder/azapi".to_string(),
            sku_literal: "Standard_D2ds_v5".to_string(),
            provider_prefixes: vec!["azurerm_".to_string()],
            dynamic_markers: [
                "random_",
                "module.naming",
                "tls_private_key.",
                "azurerm_client_config.",
                "azuread_client_config.",
                "azapi_client_config.",
                "local.",
                "http.",
                "var.",
                "azapi_resource.",
                "each.",
                "azuredevops_project.",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
            optional_priority_base: 10_000,
        }
    }
}

impl PolicyOptions {
    /// The identifier form of a module name (`avm-res-a-b` -> `avm_res_a_b`).
    #[must_use]
    pub fn canonical_name(module: &str) -> String {
        module.replace('-', "_")
    }

    /// Text that introduces every cross-module reference, e.g. `module.avm_res_`.
    #[must_use]
    pub fn reference_marker(&self) -> String {
        format!("module.{}", Self::canonical_name(&self.module_prefix))
    }

    /// `module.<canonical module>.<path>`
    #[must_use]
    pub fn module_reference(module: &str, path: &str) -> String {
        format!("module.{}.{path}", Self::canonical_name(module))
    }

    /// Whether a resource type is handled through the provider table.
    #[must_use]
    pub fn is_provider_resource(&self, value: &str) -> bool {
        self.provider_prefixes.iter().any(|p| value.starts_with(p.as_str()))
    }
}

/// Main configuration structure with nested sections.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Input and output paths
    pub paths: PathOptions,

    /// Execution options
    pub run: RunOptions,

    /// Formatter options
    pub formatter: FormatterOptions,

    /// Naming policy
    pub policy: PolicyOptions,
}

fn default_workers() -> usize {
    10
}

impl Config {
    /// Load configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid or a value is out of range.
    pub fn from_yaml(content: &str) -> Result<Self> {
        tracing::debug!("Parsing configuration from YAML");
        let expanded = expand_env_vars(content);

        let config: Config = serde_yaml::from_str(&expanded)?;
        config.validate()?;

        tracing::debug!(
            workers = config.run.workers,
            formatter = ?config.formatter.kind,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Check value ranges serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns `ConfigValue` for the first offending key.
    pub fn validate(&self) -> Result<()> {
        if self.run.workers == 0 {
            return Err(crate::err!(ConfigValue {
                key: "run.workers".to_string(),
                message: "must be at least 1".to_string(),
            }));
        }
        if self.policy.module_prefix.is_empty() {
            return Err(crate::err!(ConfigValue {
                key: "policy.module_prefix".to_string(),
                message: "must not be empty".to_string(),
            }));
        }
        Ok(())
    }

    /// Generate an example YAML configuration.
    #[must_use]
    pub fn example_yaml() -> String {
        r#"# Varsmith Configuration File

# Input and output locations
paths:
  # Module catalog: { "<module_name>": { display_name, source, git_hub_url, description } }
  catalog: catalog.json

  # One directory per module: variables*.tf, outputs.tf, examples/*/main.tf
  modules_dir: modules

  # Provider resource type -> module name
  provider_table: azurerm_to_avm.json

  # Aggregated document
  output: avm_data.json

run:
  # Modules processed concurrently
  workers: 10

  # Drop failing modules instead of aborting
  continue_on_error: false

formatter:
  # terraform | hcl | none
  kind: terraform
  command: terraform

policy:
  module_prefix: avm-res-
  resource_group_module: avm-res-resources-resourcegroup
  public_ip_module: avm-res-network-publicipaddress
  key_vault_source: Azure/avm-res-keyvault-vault/azurerm
  sku_finder_source: Azure/avm-utl-sku-finder/azapi
  sku_literal: Standard_D2ds_v5
  provider_prefixes:
    - azurerm_
  optional_priority_base: 10000
"#
        .to_string()
    }

    /// Merge CLI arguments into the configuration.
    pub fn merge_cli_args(&mut self, args: &crate::cli::GenerateArgs) {
        if let Some(ref catalog) = args.catalog {
            self.paths.catalog = catalog.clone();
        }
        if let Some(ref modules_dir) = args.modules_dir {
            self.paths.modules_dir = modules_dir.clone();
        }
        if let Some(ref table) = args.provider_table {
            self.paths.provider_table = table.clone();
        }
        if let Some(ref output) = args.output {
            self.paths.output = output.clone();
        }
        if let Some(workers) = args.workers {
            self.run.workers = workers;
        }
        if let Some(kind) = args.formatter {
            self.formatter.kind = kind;
        }
        if args.continue_on_error {
            self.run.continue_on_error = true;
        }
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax. Unknown variables are left untouched.
fn expand_env_vars(content: &str) -> String {
    let mut result = content.to_string();

    for cap in BRACED_ENV_PATTERN.captures_iter(content) {
        if let Ok(value) = std::env::var(&cap[1]) {
            result = result.replace(&cap[0], &value);
        }
    }

    for cap in BARE_ENV_PATTERN.captures_iter(content) {
        if let Ok(value) = std::env::var(&cap[1]) {
            result = result.replace(&cap[0], &value);
        }
    }

    result
}

impl From<serde_yaml::Error> for VarsmithError {
    fn from(source: serde_yaml::Error) -> Self {
        crate::err!(ConfigParse {
            message: source.to_string(),
            source: Some(Box::new(source)),
        })
    }
}
