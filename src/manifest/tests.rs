//! Tests for manifest loading, templating and version checks.

use super::*;
use crate::ast::{ResourceDecl, SecretSource};
use anyhow::{Result as AnyResult, ensure};
use rstest::rstest;
use test_support::{EnvVarGuard, env_lock::EnvLock};

const HEADER: &str = "stack_version: \"1.0.0\"\nproject: demo\n";

fn manifest(body: &str) -> String {
    format!("{HEADER}{body}")
}

fn manifest_error(err: &anyhow::Error) -> Option<&ManifestError> {
    err.chain().find_map(|e| e.downcast_ref::<ManifestError>())
}

#[rstest]
fn vars_are_visible_to_templates() -> AnyResult<()> {
    let yaml = manifest(concat!(
        "vars:\n",
        "  prefix: cookiecutter\n",
        "  region: brazilsouth\n",
        "resources:\n",
        "  - kind: resource_group\n",
        "    id: rg\n",
        "    name: \"{{ prefix }}-group\"\n",
        "    location: \"{{ region }}\"\n",
    ));
    let parsed = from_str(&yaml)?;
    let Some(ResourceDecl::ResourceGroup(group)) = parsed.resources.first() else {
        anyhow::bail!("expected a resource group");
    };
    ensure!(group.name.as_deref() == Some("cookiecutter-group"));
    ensure!(group.location == "brazilsouth");
    Ok(())
}

#[rstest]
fn env_helper_reads_process_environment() -> AnyResult<()> {
    let _lock = EnvLock::acquire();
    let _guard = EnvVarGuard::set("AZSTACK_TEST_GROUP", "existing-rg");
    let yaml = manifest(concat!(
        "mode: import\n",
        "naming: fixed\n",
        "resources:\n",
        "  - kind: resource_group\n",
        "    id: rg\n",
        "    name: \"{{ env('AZSTACK_TEST_GROUP') }}\"\n",
        "    location: brazilsouth\n",
    ));
    let parsed = from_str(&yaml)?;
    ensure!(parsed.resources.first().map(ResourceDecl::physical_name) == Some("existing-rg"));
    Ok(())
}

#[rstest]
fn env_helper_fails_for_missing_variables() {
    let _lock = EnvLock::acquire();
    let _guard = EnvVarGuard::remove("AZSTACK_TEST_MISSING");
    let yaml = manifest(concat!(
        "resources:\n",
        "  - kind: resource_group\n",
        "    id: rg\n",
        "    location: \"{{ env('AZSTACK_TEST_MISSING') }}\"\n",
    ));
    let err = from_str(&yaml).expect_err("missing variable should fail");
    let chain = format!("{err:#}");
    assert!(
        chain.contains("AZSTACK_TEST_MISSING"),
        "error should name the variable: {chain}"
    );
    assert!(chain.contains("resources[0].location"), "{chain}");
}

#[rstest]
fn env_helper_rejects_empty_values() {
    let _lock = EnvLock::acquire();
    let _guard = EnvVarGuard::set("AZSTACK_TEST_EMPTY_GROUP", "");
    let yaml = manifest(concat!(
        "mode: import\n",
        "naming: fixed\n",
        "resources:\n",
        "  - kind: resource_group\n",
        "    id: rg\n",
        "    name: \"{{ env('AZSTACK_TEST_EMPTY_GROUP') }}\"\n",
        "    location: brazilsouth\n",
    ));
    let err = from_str(&yaml).expect_err("empty variable should fail");
    let chain = format!("{err:#}");
    assert!(chain.contains("'AZSTACK_TEST_EMPTY_GROUP' is empty"), "{chain}");
    assert!(chain.contains("resources[0].name"), "{chain}");
}

#[rstest]
fn interpolation_references_survive_rendering() -> AnyResult<()> {
    let yaml = manifest(concat!(
        "resources:\n",
        "  - kind: resource_group\n",
        "    id: rg\n",
        "    location: brazilsouth\n",
        "outputs:\n",
        "  POSTGRES_HOST: \"${db.fullyQualifiedDomainName}\"\n",
    ));
    let parsed = from_str(&yaml)?;
    ensure!(
        parsed.outputs.get("POSTGRES_HOST").map(String::as_str)
            == Some("${db.fullyQualifiedDomainName}")
    );
    Ok(())
}

#[rstest]
fn secrets_block_is_parsed() -> AnyResult<()> {
    let yaml = manifest(concat!(
        "secrets:\n",
        "  django_secret_key: { env: SECRET_KEY }\n",
        "resources: []\n",
    ));
    let parsed = from_str(&yaml)?;
    ensure!(
        parsed.secrets.get("django_secret_key") == Some(&SecretSource::Env("SECRET_KEY".into()))
    );
    ensure!(parsed.stack == "dev");
    Ok(())
}

#[rstest]
#[case("2.0.0")]
#[case("0.9.0")]
fn unsupported_versions_are_rejected(#[case] version: &str) {
    let yaml = format!("stack_version: \"{version}\"\nproject: demo\nresources: []\n");
    let err = from_str(&yaml).expect_err("version should be rejected");
    assert!(
        matches!(
            manifest_error(&err),
            Some(ManifestError::UnsupportedVersion { .. })
        ),
        "unexpected error: {err:?}"
    );
}

#[rstest]
fn vars_must_be_a_mapping() {
    let yaml = manifest("vars: [1, 2]\nresources: []\n");
    let err = from_str(&yaml).expect_err("list vars should fail");
    assert!(matches!(manifest_error(&err), Some(ManifestError::Parse { .. })));
}

#[rstest]
fn yaml_errors_carry_the_manifest_name() {
    let err = from_str_named("project: [", &ManifestName::new("stacks/broken.yml"))
        .expect_err("invalid YAML");
    assert_eq!(err.to_string(), "failed to parse stacks/broken.yml");
}

#[rstest]
fn from_path_reports_unreadable_files() {
    let dir = tempfile::tempdir().expect("temp dir");
    let missing = dir.path().join("Stackfile");
    let err = from_path(&missing).expect_err("missing file");
    assert!(err.to_string().starts_with("failed to read "), "{err}");
}
