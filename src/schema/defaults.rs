//! Placeholder values for required strings no example filled in.

use crate::config::PolicyOptions;

const NIL_GUID: &str = "\"00000000-0000-0000-0000-000000000000\"";

/// Rendered text for a required string attribute without a value.
///
/// `parent` is the enclosing attribute, if any; it keeps free-standing
/// `var.` placeholders unique across nested objects.
pub(crate) fn required_string(policy: &PolicyOptions, name: &str, parent: Option<&str>) -> String {
    match name {
        "name" => "\"example1\"".to_string(),
        "location" => "\"westeurope\"".to_string(),
        "resource_group_name" => PolicyOptions::module_reference(&policy.resource_group_module, "resource.name"),
        "resource_group_resource_id" => {
            PolicyOptions::module_reference(&policy.resource_group_module, "resource.id")
        }
        "tenant_id" | "subscription_id" | "client_id" | "principal_id" => NIL_GUID.to_string(),
        "zone" => "\"1\"".to_string(),
        n if n.ends_with("ip_address_resource_name") => {
            PolicyOptions::module_reference(&policy.public_ip_module, "name")
        }
        n if n.ends_with("ip_address_resource_id") => {
            PolicyOptions::module_reference(&policy.public_ip_module, "resource_id")
        }
        n if n.contains("email") => "\"example@example.com\"".to_string(),
        _ => match parent {
            Some(parent) => format!("var.string_{parent}_{name}"),
            None => format!("var.string_{name}"),
        },
    }
}
