//! Classification of `source` strings in example module blocks.
//!
//! Example files refer to the module under test either by relative path
//! (`../..`) or by its registry address, and to helper modules by registry
//! address or Git URL. Only local and registry sources can name a catalog
//! module; Git sources are kept so they are not mistaken for registry ones.

use regex::Regex;
use std::sync::LazyLock;

const DEFAULT_REGISTRY: &str = "registry.terraform.io";

// [hostname/]namespace/name/provider
static REGISTRY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:([a-zA-Z0-9.-]+)/)?([a-zA-Z0-9_-]+)/([a-zA-Z0-9_-]+)/([a-zA-Z0-9_-]+)$")
        .expect("Invalid regex")
});

// git::<url>.git[?ref=...][//subdir] or git@host:<path>.git[...]
static GIT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:git::([^?]+?\.git)|git@([^:]+):([^?]+?\.git))(?:\?ref=[^/]+)?(?://.+)?$").expect("Invalid regex")
});

/// Where a module block loads its code from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleSource {
    /// `[hostname/]namespace/name/provider`
    Registry {
        hostname: String,
        namespace: String,
        name: String,
        provider: String,
    },

    /// Git repository, by clone URL.
    Git { url: String },

    /// Relative or absolute path.
    Local { path: String },

    Unknown(String),
}

impl ModuleSource {
    /// Registry address without the default hostname, e.g. `Azure/x/azurerm`.
    #[must_use]
    pub fn registry_address(&self) -> Option<String> {
        match self {
            Self::Registry { hostname, namespace, name, provider } if hostname == DEFAULT_REGISTRY => {
                Some(format!("{namespace}/{name}/{provider}"))
            }
            Self::Registry { hostname, namespace, name, provider } => {
                Some(format!("{hostname}/{namespace}/{name}/{provider}"))
            }
            _ => None,
        }
    }

    /// Whether a module block with this source instantiates the module whose
    /// catalog source is `catalog_source`: either the repository root of the
    /// example (`../..`) or the same registry address.
    #[must_use]
    pub fn refers_to(&self, catalog_source: &str) -> bool {
        match self {
            Self::Local { path } => path.trim_end_matches('/') == "../..",
            Self::Registry { .. } => self.registry_address().as_deref() == Some(catalog_source.trim()),
            _ => false,
        }
    }

    /// Catalog module name of a registry source whose name contains `prefix`,
    /// e.g. `Azure/avm-res-keyvault-vault/azurerm` -> `avm-res-keyvault-vault`.
    #[must_use]
    pub fn catalog_name(&self, prefix: &str) -> Option<String> {
        match self {
            Self::Registry { name, .. } => name.find(prefix).map(|idx| name[idx..].to_string()),
            _ => None,
        }
    }
}

/// Classifies a `source` attribute value.
///
/// # Examples
///
/// ```rust
/// use varsmith::parser::{parse_module_source, ModuleSource};
///
/// let source = parse_module_source("Azure/avm-res-keyvault-vault/azurerm");
/// assert!(matches!(source, ModuleSource::Registry { .. }));
///
/// let source = parse_module_source("../..");
/// assert!(matches!(source, ModuleSource::Local { .. }));
/// ```
#[must_use]
pub fn parse_module_source(source: &str) -> ModuleSource {
    let source = source.trim();

    if is_local_path(source) {
        return ModuleSource::Local {
            path: source.to_string(),
        };
    }

    if let Some(git) = try_parse_git_source(source) {
        return git;
    }
    if let Some(registry) = try_parse_registry_source(source) {
        return registry;
    }

    tracing::debug!(source = %source, "Unknown module source format");
    ModuleSource::Unknown(source.to_string())
}

fn is_local_path(source: &str) -> bool {
    matches!(source, "." | "..") || source.starts_with("./") || source.starts_with("../") || source.starts_with('/')
}

fn try_parse_git_source(source: &str) -> Option<ModuleSource> {
    let caps = GIT_PATTERN.captures(source)?;
    let url = match (caps.get(1), caps.get(2), caps.get(3)) {
        (Some(url), _, _) => url.as_str().to_string(),
        (None, Some(host), Some(path)) => format!("ssh://git@{}/{}", host.as_str(), path.as_str()),
        _ => return None,
    };
    Some(ModuleSource::Git { url })
}

fn try_parse_registry_source(source: &str) -> Option<ModuleSource> {
    let caps = REGISTRY_PATTERN.captures(source)?;
    let hostname = caps
        .get(1)
        .map_or_else(|| DEFAULT_REGISTRY.to_string(), |m| m.as_str().to_string());

    Some(ModuleSource::Registry {
        hostname,
        namespace: caps.get(2)?.as_str().to_string(),
        name: caps.get(3)?.as_str().to_string(),
        provider: caps.get(4)?.as_str().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_registry_source() {
        let source = parse_module_source("Azure/avm-res-keyvault-vault/azurerm");
        match &source {
            ModuleSource::Registry { hostname, name, .. } => {
                assert_eq!(hostname, DEFAULT_REGISTRY);
                assert_eq!(name, "avm-res-keyvault-vault");
            }
            other => panic!("Expected a registry source, got {other:?}"),
        }
        assert_eq!(source.catalog_name("avm-res-").as_deref(), Some("avm-res-keyvault-vault"));
    }

    #[test]
    fn test_non_catalog_registry_source_has_no_name() {
        let source = parse_module_source("Azure/naming/azurerm");
        assert_eq!(source.catalog_name("avm-res-"), None);
    }

    #[test]
    fn test_refers_to_local_root() {
        assert!(parse_module_source("../..").refers_to("Azure/avm-res-a/azurerm"));
        assert!(parse_module_source("../../").refers_to("Azure/avm-res-a/azurerm"));
        assert!(!parse_module_source("../../modules/sub").refers_to("Azure/avm-res-a/azurerm"));
    }

    #[test]
    fn test_refers_to_registry_address() {
        let source = parse_module_source("Azure/avm-res-a/azurerm");
        assert!(source.refers_to("Azure/avm-res-a/azurerm"));
        assert!(!source.refers_to("Azure/avm-res-b/azurerm"));
    }

    #[test]
    fn test_git_sources_are_not_registry_addresses() {
        let https = parse_module_source("git::https://github.com/Azure/terraform-azurerm-avm-res-a.git?ref=v0.2.0//modules/sub");
        assert_eq!(
            https,
            ModuleSource::Git {
                url: "https://github.com/Azure/terraform-azurerm-avm-res-a.git".to_string()
            }
        );
        assert_eq!(https.catalog_name("avm-res-"), None);

        let ssh = parse_module_source("git@github.com:Azure/terraform-azurerm-avm-res-a.git");
        assert_eq!(
            ssh,
            ModuleSource::Git {
                url: "ssh://git@github.com/Azure/terraform-azurerm-avm-res-a.git".to_string()
            }
        );
        assert!(!ssh.refers_to("Azure/avm-res-a/azurerm"));
    }

    #[test]
    fn test_parse_unknown_source() {
        assert!(matches!(parse_module_source("not a source"), ModuleSource::Unknown(_)));
    }
}
