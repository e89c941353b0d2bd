//! Program generation over the reference Stackfile.

mod common;

use anyhow::Result;
use azstack::ast::{DeploymentMode, NamingStrategy};
use azstack::ir::{BuildContext, ResourceGraph};
use azstack::program_gen;
use common::{build, env_with_values, load_reference};
use rstest::{fixture, rstest};
use serde_json::Value;

#[fixture]
fn program() -> String {
    let graph = build(&load_reference().expect("reference Stackfile")).expect("reference graph");
    program_gen::generate(&graph)
}

#[rstest]
fn generation_is_deterministic(program: String) -> Result<()> {
    let again = program_gen::generate(&build(&load_reference()?)?);
    assert_eq!(program, again);
    Ok(())
}

#[rstest]
fn program_is_valid_yaml_with_every_resource(program: String) -> Result<()> {
    let doc: Value = serde_saphyr::from_str(&program)?;
    assert_eq!(doc.get("runtime"), Some(&Value::from("yaml")));
    let resources = doc
        .get("resources")
        .and_then(Value::as_object)
        .expect("resources map");
    assert_eq!(resources.len(), 15);
    assert_eq!(
        resources
            .get("app")
            .and_then(|app| app.get("type"))
            .and_then(Value::as_str),
        Some("azure-native:web:WebApp")
    );
    Ok(())
}

#[rstest]
fn connection_settings_keep_their_references(program: String) {
    assert!(program.contains(concat!(
        "          - name: \"POSTGRES_HOST\"\n",
        "            value: \"${postgres.name}.postgres.database.azure.com\"\n",
    )));
    assert!(program.contains(concat!(
        "          - name: \"REDIS_URL\"\n",
        "            value: \"redis://${cache.hostName}:6379\"\n",
    )));
}

#[rstest]
fn environment_secrets_are_config_not_values(program: String) {
    assert!(program.contains(concat!(
        "config:\n",
        "  django_secret_key:\n",
        "    type: string\n",
        "    secret: true\n",
        "  postgres_admin_password:\n",
    )));
    assert!(program.contains("value: \"${django_secret_key}\""));
    assert!(!program.contains("value-of-"), "secret value leaked");
}

#[rstest]
fn delegations_use_exact_service_names(program: String) {
    assert!(program.contains("serviceName: \"Microsoft.DBforPostgreSQL/flexibleServers\""));
    assert!(program.contains("serviceName: \"Microsoft.Web/serverFarms\""));
}

#[rstest]
fn import_programs_adopt_existing_resources() -> Result<()> {
    let manifest = load_reference()?;
    let env = env_with_values();
    let ctx = BuildContext::new(&env)
        .with_mode(Some(DeploymentMode::Import))
        .with_naming(Some(NamingStrategy::Fixed))
        .with_subscription(Some("0000".into()));
    let program = program_gen::generate(&ResourceGraph::from_manifest(&manifest, &ctx)?);
    assert!(program.contains(concat!(
        "    options:\n",
        "      import: \"/subscriptions/0000/resourceGroups/cookiecutter-pulumi-django_group\"\n",
    )));
    assert_eq!(program.matches("      import: ").count(), 15);
    Ok(())
}

#[rstest]
fn auto_naming_passes_declared_names_to_the_engine(program: String) {
    assert!(program.contains(concat!(
        "  cache:\n",
        "    type: azure-native:cache:Redis\n",
        "    name: \"cookiecutter-pulumi-django-cache\"\n",
    )));
    assert!(program.contains(concat!(
        "  postgres:\n",
        "    type: azure-native:dbforpostgresql:Server\n",
        "    name: \"cookiecutter-pulumi-django-server\"\n",
    )));
    assert!(!program.contains("    name: \"privatelink.redis.cache.windows.net\"\n"));
}

#[rstest]
fn fixed_naming_sets_names_as_properties_only() -> Result<()> {
    let manifest = load_reference()?;
    let env = env_with_values();
    let ctx = BuildContext::new(&env).with_naming(Some(NamingStrategy::Fixed));
    let program = program_gen::generate(&ResourceGraph::from_manifest(&manifest, &ctx)?);
    assert_eq!(program.matches("\n    name: ").count(), 0);
    assert!(program.contains("      name: \"cookiecutter-pulumi-django-cache\"\n"));
    Ok(())
}
