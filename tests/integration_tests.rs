//! Integration tests for Varsmith.
//!
//! These tests run the generator end to end over the fixture catalog under
//! `tests/fixtures`, and drive the binary through its subcommands.

use std::fs;
use std::path::{Path, PathBuf};
use varsmith::types::FormatterKind;
use varsmith::{Catalog, Config, Document, Generator, ProviderTable};

/// Get the path to the test fixtures directory.
fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixture_config(output: &Path) -> Config {
    let fixtures = fixtures_path();
    let mut config = Config::default();
    config.paths.catalog = fixtures.join("catalog.json");
    config.paths.modules_dir = fixtures.join("modules");
    config.paths.provider_table = fixtures.join("azurerm_to_avm.json");
    config.paths.output = output.to_path_buf();
    config.formatter.kind = FormatterKind::None;
    config.run.workers = 2;
    config
}

fn generate_fixture() -> Document {
    let dir = tempfile::tempdir().unwrap();
    let generator = Generator::new(fixture_config(&dir.path().join("out.json"))).with_progress(false);
    let report = generator.run().unwrap();
    assert!(report.failed.is_empty());
    report.document
}

mod generate_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_priorities_follow_references() {
        let document = generate_fixture();

        assert_eq!(document.modules.len(), 3);
        assert_eq!(document.modules["avm-res-resources-resourcegroup"].priority, 0);
        assert_eq!(document.modules["avm-res-network-virtualnetwork"].priority, 1);
        assert_eq!(document.modules["avm-res-web-site"].priority, 2);
    }

    #[test]
    fn test_resource_group_defaults() {
        let document = generate_fixture();
        let rg = &document.modules["avm-res-resources-resourcegroup"];

        // the example name is built from a random suffix and is ignored
        assert_eq!(
            rg.variables["name"].schema,
            "# `name` is Required in module\nname = \"example1\"\n"
        );
        assert_eq!(
            rg.variables["location"].schema,
            "# `location` is Required in module\nlocation = \"eastus\"\n"
        );
        assert_eq!(rg.variables["name"].priority, 0);
        assert_eq!(rg.variables["location"].priority, 1);
        assert_eq!(rg.variables["name"].description, "Name of the resource group.");

        let tags = &rg.variables["tags"];
        assert!(!tags.required);
        assert_eq!(tags.priority, 10_000);
        assert!(tags.schema.contains("environment = \"example\""));

        assert_eq!(rg.outputs, vec!["name", "resource", "resource_id"]);
        assert!(rg.depends_on.avm_depends_on.is_empty());
    }

    #[test]
    fn test_provider_resources_become_module_references() {
        let document = generate_fixture();
        let vnet = &document.modules["avm-res-network-virtualnetwork"];

        assert_eq!(
            vnet.variables["location"].schema,
            "# `location` is Required in module\nlocation = module.avm_res_resources_resourcegroup.resource.location\n"
        );
        assert!(vnet.variables["resource_group_name"]
            .schema
            .ends_with("resource_group_name = module.avm_res_resources_resourcegroup.resource.name\n"));
        assert!(vnet.variables["address_space"]
            .schema
            .contains("address_space = [\"10.0.0.0/16\"]"));
        assert!(vnet.variables["enable_telemetry"].schema.ends_with("enable_telemetry = false\n"));

        let subnets = &vnet.variables["subnets"].schema;
        assert!(subnets.contains("default = {"));
        assert!(subnets.contains("address_prefixes = [\"10.0.1.0/24\"]"));

        assert_eq!(
            vnet.depends_on.required_depends_on.iter().collect::<Vec<_>>(),
            vec!["avm-res-resources-resourcegroup"]
        );
    }

    #[test]
    fn test_example_module_labels_resolve_through_sources() {
        let document = generate_fixture();
        let site = &document.modules["avm-res-web-site"];

        assert_eq!(site.info.source, "Azure/avm-res-web-site/azurerm");
        assert!(site.variables["virtual_network_id"]
            .schema
            .ends_with("virtual_network_id = module.avm_res_network_virtualnetwork.resource_id\n"));
        assert!(site.variables["https_only"].schema.ends_with("https_only = true\n"));
        assert!(site.variables["site_config"].schema.contains("worker_count = 2"));

        assert_eq!(site.variables["resource_group_name"].priority, 2);
        assert_eq!(site.variables["virtual_network_id"].priority, 3);
        assert_eq!(site.variables["https_only"].priority, 10_000);
        assert_eq!(site.variables["site_config"].priority, 10_001);

        assert_eq!(
            site.depends_on.avm_depends_on.iter().collect::<Vec<_>>(),
            vec!["avm-res-network-virtualnetwork", "avm-res-resources-resourcegroup"]
        );
        assert!(site.depends_on.required["virtual_network_id"].contains("avm-res-network-virtualnetwork"));
        assert!(site.depends_on.optional["https_only"].is_empty());
    }

    #[test]
    fn test_written_document_uses_contract_keys() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("avm_data.json");
        let generator = Generator::new(fixture_config(&output)).with_progress(false);
        let report = generator.run().unwrap();
        generator.write(&report.document).unwrap();

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        let site = &raw["avm-res-web-site"];
        for key in ["module_name", "display_name", "source", "git_hub_url", "description", "outputs", "variables", "depends_on", "priority"] {
            assert!(site.get(key).is_some(), "missing key {key}");
        }
        for key in ["avm_depends_on", "required_depends_on", "required", "optional"] {
            assert!(site["depends_on"].get(key).is_some(), "missing key depends_on.{key}");
        }
        for key in ["required", "description", "priority", "schema"] {
            assert!(site["variables"]["name"].get(key).is_some(), "missing key variables.name.{key}");
        }

        assert_eq!(Document::load(&output).unwrap(), report.document);
    }

    #[test]
    fn test_missing_module_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixture_config(&dir.path().join("out.json"));
        let mut catalog = Catalog::load(&config.paths.catalog).unwrap();
        let providers = ProviderTable::load(&config.paths.provider_table).unwrap();
        let mut extra = catalog.modules["avm-res-web-site"].clone();
        extra.module_name = "avm-res-not-downloaded".to_string();
        catalog.modules.insert("avm-res-not-downloaded".to_string(), extra);

        let strict = Generator::new(config.clone()).with_progress(false);
        assert!(strict.generate(&catalog, &providers).is_err());

        let mut lenient_config = config;
        lenient_config.run.continue_on_error = true;
        let lenient = Generator::new(lenient_config).with_progress(false);
        let report = lenient.generate(&catalog, &providers).unwrap();
        assert_eq!(report.failed, vec!["avm-res-not-downloaded"]);
        assert_eq!(report.document.modules.len(), 3);
    }
}

mod cli_tests {
    use super::*;
    use assert_cmd::Command;
    use predicates::prelude::*;

    fn varsmith(dir: &Path) -> Command {
        let mut cmd = Command::cargo_bin("varsmith").unwrap();
        cmd.current_dir(dir).env_remove("VARSMITH_CONFIG").env_remove("RUST_LOG");
        cmd
    }

    fn generate_args(output: &Path) -> Vec<String> {
        let fixtures = fixtures_path();
        vec![
            "generate".to_string(),
            "--catalog".to_string(),
            fixtures.join("catalog.json").display().to_string(),
            "--modules-dir".to_string(),
            fixtures.join("modules").display().to_string(),
            "--provider-table".to_string(),
            fixtures.join("azurerm_to_avm.json").display().to_string(),
            "--formatter".to_string(),
            "none".to_string(),
            "--output".to_string(),
            output.display().to_string(),
        ]
    }

    #[test]
    fn test_generate_then_graph() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("avm_data.json");

        varsmith(dir.path())
            .args(generate_args(&output))
            .assert()
            .success()
            .stdout(predicate::str::contains("Wrote 3 modules"))
            .stdout(predicate::str::contains("avm-res-resources-resourcegroup"));
        assert!(output.exists());

        varsmith(dir.path())
            .args(["graph", output.to_str().unwrap(), "--format", "mermaid"])
            .assert()
            .success()
            .stdout(predicate::str::starts_with("graph LR"))
            .stdout(predicate::str::contains(
                "avm_res_web_site --> avm_res_network_virtualnetwork",
            ));
    }

    #[test]
    fn test_cycle_exits_with_graph_error() {
        let dir = tempfile::tempdir().unwrap();
        let modules = dir.path().join("modules");
        for (module, other) in [("avm-res-a", "avm-res-b"), ("avm-res-b", "avm-res-a")] {
            let root = modules.join(module);
            fs::create_dir_all(root.join("examples/default")).unwrap();
            fs::write(root.join("variables.tf"), "variable \"peer_id\" {\n  type = string\n}\n").unwrap();
            fs::write(
                root.join("examples/default/main.tf"),
                format!(
                    "module \"peer\" {{\n  source = \"Azure/{other}/azurerm\"\n}}\n\n\
                     module \"this\" {{\n  source  = \"../../\"\n  peer_id = module.peer.resource_id\n}}\n"
                ),
            )
            .unwrap();
        }
        fs::write(
            dir.path().join("catalog.json"),
            r#"{
                "avm-res-a": { "source": "Azure/avm-res-a/azurerm" },
                "avm-res-b": { "source": "Azure/avm-res-b/azurerm" }
            }"#,
        )
        .unwrap();
        fs::write(dir.path().join("table.json"), "{}").unwrap();

        varsmith(dir.path())
            .args([
                "generate",
                "--catalog",
                "catalog.json",
                "--modules-dir",
                "modules",
                "--provider-table",
                "table.json",
                "--formatter",
                "none",
            ])
            .assert()
            .code(17)
            .stderr(predicate::str::contains("Cycle detected"));
        assert!(!dir.path().join("avm_data.json").exists());
    }

    #[test]
    fn test_parse_type_prints_canonical_form() {
        let dir = tempfile::tempdir().unwrap();
        varsmith(dir.path())
            .args(["parse-type", "list( string )"])
            .assert()
            .success()
            .stdout("list(string)\n");

        varsmith(dir.path())
            .args(["parse-type", "list(strin)"])
            .assert()
            .code(16)
            .stderr(predicate::str::contains("Malformed type expression"));
    }

    #[test]
    fn test_init_then_validate() {
        let dir = tempfile::tempdir().unwrap();

        varsmith(dir.path())
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("varsmith.yaml"));

        varsmith(dir.path()).arg("init").assert().failure();
        varsmith(dir.path()).args(["init", "--force"]).assert().success();

        varsmith(dir.path())
            .args(["validate", "varsmith.yaml"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration is valid"));

        fs::write(dir.path().join("bad.yaml"), "run:\n  workers: 0\n").unwrap();
        varsmith(dir.path())
            .args(["validate", "bad.yaml"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Configuration error"))
            .stderr(predicate::str::contains("run.workers"));

        // validate reads only its own argument
        varsmith(dir.path())
            .args(["--config", "bad.yaml", "validate", "varsmith.yaml"])
            .assert()
            .success();
    }
}

mod config_tests {
    use super::*;

    #[test]
    fn test_example_config_round_trips() {
        let config = Config::from_yaml(&Config::example_yaml()).unwrap();
        let defaults = Config::default();
        assert_eq!(config.paths.catalog, defaults.paths.catalog);
        assert_eq!(config.run.workers, 10);
        assert_eq!(config.policy.optional_priority_base, 10_000);
        assert_eq!(config.policy.dynamic_markers, defaults.policy.dynamic_markers);
    }
}
