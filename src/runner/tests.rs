//! Unit tests for the runner's path handling and report formatting.

use super::*;
use crate::ir::{Attribute, Output, Property, ResourceNode};
use rstest::rstest;
use std::path::PathBuf;

#[rstest]
#[case(None, "Pulumi.yaml", "Pulumi.yaml")]
#[case(Some("infra"), "Pulumi.yaml", "infra/Pulumi.yaml")]
#[case(Some("infra"), "/tmp/Pulumi.yaml", "/tmp/Pulumi.yaml")]
fn resolve_output_path_respects_directory(
    #[case] directory: Option<&str>,
    #[case] input: &str,
    #[case] expected: &str,
) {
    let cli = Cli {
        directory: directory.map(PathBuf::from),
        ..Cli::default()
    };
    let resolved = resolve_output_path(&cli, Path::new(input));
    assert_eq!(resolved.as_ref(), Path::new(expected));
}

#[rstest]
fn manifest_path_joins_directory() {
    let cli = Cli {
        directory: Some(PathBuf::from("infra")),
        file: PathBuf::from("stacks/import.yml"),
        ..Cli::default()
    };
    assert_eq!(
        resolve_manifest_path(&cli),
        PathBuf::from("infra/stacks/import.yml")
    );
}

fn small_graph() -> ResourceGraph {
    let mut graph = ResourceGraph::new("demo", "dev");
    let mut rg = ResourceNode::new("rg", ResourceKind::ResourceGroup);
    rg.physical_name = Some("demo-rg".into());
    let mut cache = ResourceNode::new("cache", ResourceKind::RedisCache);
    cache.dependencies = vec!["rg".into()];
    graph.nodes.insert("rg".into(), rg);
    graph.nodes.insert("cache".into(), cache);
    graph
        .outputs
        .insert("resource_group_name".into(), Output::attribute("rg", Attribute::Name));
    graph
        .outputs
        .insert("redis_host".into(), Output::attribute("cache", Attribute::HostName));
    graph
}

#[rstest]
fn outputs_mark_unknown_values_as_computed() {
    assert_eq!(
        outputs(&small_graph()),
        "resource_group_name = demo-rg\nredis_host = <computed>\n"
    );
}

#[rstest]
fn plan_lists_waves_then_digest() {
    let graph = small_graph();
    let text = plan(&graph).expect("plan");
    let digest = GraphHasher::digest(&graph).expect("digest");
    assert_eq!(text, format!("wave 1: rg\nwave 2: cache\ndigest: {digest}\n"));
}

#[rstest]
fn summary_counts_declared_resources() {
    let mut graph = small_graph();
    let mut secret = ResourceNode::new("django_key", ResourceKind::RandomPassword);
    secret
        .properties
        .insert("length".into(), Property::Value(serde_json::json!(50)));
    graph.nodes.insert("django_key".into(), secret);
    assert_eq!(
        summary(&graph),
        "demo/dev: 2 resources, 0 secrets, 2 outputs\nmode: create, naming: auto\n"
    );
}

#[rstest]
#[case(DeploymentMode::Create, false, "mode: create")]
#[case(DeploymentMode::Create, true, "naming: fixed")]
#[case(DeploymentMode::Import, false, "mode: import")]
fn starters_match_the_requested_mode(
    #[case] mode: DeploymentMode,
    #[case] fixed_names: bool,
    #[case] needle: &str,
) {
    assert!(starter(mode, fixed_names).contains(needle));
}

#[rstest]
fn init_refuses_to_overwrite_without_force() {
    let temp = tempfile::tempdir().expect("temp dir");
    let path = temp.path().join("Stackfile");
    std::fs::write(&path, "keep me").expect("seed file");
    let err = init(&path, DeploymentMode::Create, false, false).expect_err("existing file");
    assert!(matches!(
        err.downcast_ref::<RunnerError>(),
        Some(RunnerError::AlreadyExists { .. })
    ));
    init(&path, DeploymentMode::Create, false, true).expect("forced init");
    let written = std::fs::read_to_string(&path).expect("read back");
    assert_eq!(written, REFERENCE_STACK);
}
