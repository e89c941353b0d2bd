//! Pulumi YAML program generator.
//!
//! This module converts a [`crate::ir::ResourceGraph`] into a program for the
//! engine's YAML runtime. Resources are written in graph order, which is the
//! declaration order with generated secrets first, so identical graphs always
//! produce identical text.
//!
//! Cross-resource values are written as `${id.attribute}` interpolations and
//! never folded into literals; the engine derives its dependency edges from
//! them. Literal `$` characters are escaped as `$$`.

use crate::ast::DeploymentMode;
use crate::ir::{Property, ResourceGraph, ResourceKind, ResourceNode};
use crate::secrets::SecretBinding;
use serde_json::Value;
use std::fmt::{self, Display, Formatter};

macro_rules! write_kv {
    ($f:expr, $indent:expr, $key:expr, $opt:expr) => {
        if let Some(val) = $opt {
            writeln!($f, "{:indent$}{}: {}", "", $key, quote(val), indent = $indent)?;
        }
    };
}

/// Generate the program as a string.
#[must_use]
pub fn generate(graph: &ResourceGraph) -> String {
    DisplayProgram { graph }.to_string()
}

/// Escape `$` so the engine does not read literal text as interpolation.
fn escape_dollars(text: &str) -> String {
    text.replace('$', "$$")
}

/// Double-quoted scalar; JSON string syntax is valid YAML.
fn quote(text: &str) -> String {
    Value::String(text.to_owned()).to_string()
}

/// Plain keys are written bare; anything else is quoted.
fn key(text: &str) -> String {
    let mut chars = text.chars();
    let plain = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if plain { text.to_owned() } else { quote(text) }
}

fn escape_value(value: &Value) -> Value {
    match value {
        Value::String(text) => Value::String(escape_dollars(text)),
        Value::Array(items) => Value::Array(items.iter().map(escape_value).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), escape_value(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

struct DisplayProgram<'a> {
    graph: &'a ResourceGraph,
}

impl DisplayProgram<'_> {
    fn secret_reference(&self, name: &str) -> String {
        match self.graph.secrets.get(name) {
            Some(SecretBinding::Generated(_)) => format!("${{{name}.result}}"),
            _ => format!("${{{name}}}"),
        }
    }

    fn scalar(&self, prop: &Property) -> Option<String> {
        match prop {
            Property::Value(value) => Some(escape_value(value).to_string()),
            Property::Output(output) => Some(quote(&output.to_template())),
            Property::Secret(name) => Some(quote(&self.secret_reference(name))),
            Property::List(items) if items.is_empty() => Some("[]".to_owned()),
            Property::Map(entries) if entries.is_empty() => Some("{}".to_owned()),
            Property::List(_) | Property::Map(_) => None,
        }
    }

    /// Write the value of a `key:` line already on the page. Nested lines
    /// start at column `indent`.
    fn write_value(&self, f: &mut Formatter<'_>, prop: &Property, indent: usize) -> fmt::Result {
        if let Some(scalar) = self.scalar(prop) {
            return writeln!(f, " {scalar}");
        }
        writeln!(f)?;
        match prop {
            Property::Map(entries) => {
                for (name, value) in entries {
                    write!(f, "{:indent$}{}:", "", key(name))?;
                    self.write_value(f, value, indent + 2)?;
                }
            }
            Property::List(items) => {
                for item in items {
                    write!(f, "{:indent$}-", "")?;
                    self.write_item(f, item, indent + 2)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Write a list item after its `-`; item content sits at column `indent`.
    fn write_item(&self, f: &mut Formatter<'_>, prop: &Property, indent: usize) -> fmt::Result {
        match (prop, self.scalar(prop)) {
            (_, Some(scalar)) => writeln!(f, " {scalar}"),
            (Property::Map(entries), None) => {
                for (idx, (name, value)) in entries.iter().enumerate() {
                    if idx == 0 {
                        write!(f, " {}:", key(name))?;
                    } else {
                        write!(f, "{:indent$}{}:", "", key(name))?;
                    }
                    self.write_value(f, value, indent + 2)?;
                }
                Ok(())
            }
            (other, None) => self.write_value(f, other, indent),
        }
    }

    fn write_resource(&self, f: &mut Formatter<'_>, node: &ResourceNode) -> fmt::Result {
        writeln!(f, "  {}:", key(&node.id))?;
        writeln!(f, "    type: {}", node.kind.provider_type())?;
        write_kv!(f, 4, "name", node.engine_name.as_deref());
        if !node.properties.is_empty() {
            write!(f, "    properties:")?;
            self.write_value(f, &Property::Map(node.properties.clone()), 6)?;
        }
        let import = (self.graph.mode == DeploymentMode::Import
            && node.kind != ResourceKind::RandomPassword)
            .then_some(node.arm_id.as_deref())
            .flatten();
        if let Some(arm_id) = import {
            writeln!(f, "    options:")?;
            write_kv!(f, 6, "import", Some(arm_id));
        }
        Ok(())
    }
}

impl Display for DisplayProgram<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let graph = self.graph;
        writeln!(f, "name: {}", quote(&graph.project))?;
        writeln!(f, "runtime: yaml")?;
        write_kv!(f, 0, "description", graph.description.as_deref());

        let config: Vec<&str> = graph
            .secrets
            .iter()
            .filter(|(_, binding)| !binding.is_generated())
            .map(|(name, _)| name.as_str())
            .collect();
        if !config.is_empty() {
            writeln!(f, "config:")?;
            for name in config {
                writeln!(f, "  {}:", key(name))?;
                writeln!(f, "    type: string")?;
                writeln!(f, "    secret: true")?;
            }
        }

        if graph.nodes.is_empty() {
            writeln!(f, "resources: {{}}")?;
        } else {
            writeln!(f, "resources:")?;
            for node in graph.nodes.values() {
                self.write_resource(f, node)?;
            }
        }

        if !graph.outputs.is_empty() {
            writeln!(f, "outputs:")?;
            for (name, output) in &graph.outputs {
                writeln!(f, "  {}: {}", key(name), quote(&output.to_template()))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::GenerateSpec;
    use crate::ir::{Attribute, Output};
    use crate::secrets::SecretValue;
    use rstest::rstest;
    use serde_json::json;

    fn group() -> ResourceNode {
        let mut rg = ResourceNode::new("rg", ResourceKind::ResourceGroup);
        rg.physical_name = Some("demo-rg".into());
        rg.arm_id = Some("/subscriptions/s/resourceGroups/demo-rg".into());
        rg.properties
            .insert("resourceGroupName".into(), Property::text("demo-rg"));
        rg.properties
            .insert("location".into(), Property::text("brazilsouth"));
        rg
    }

    #[rstest]
    fn writes_header_resources_and_outputs() {
        let mut graph = ResourceGraph::new("demo", "dev");
        graph.description = Some("Django stack".into());
        graph.nodes.insert("rg".into(), group());
        graph.outputs.insert(
            "resource_group_name".into(),
            Output::attribute("rg", Attribute::Name),
        );
        let expected = concat!(
            "name: \"demo\"\n",
            "runtime: yaml\n",
            "description: \"Django stack\"\n",
            "resources:\n",
            "  rg:\n",
            "    type: azure-native:resources:ResourceGroup\n",
            "    properties:\n",
            "      resourceGroupName: \"demo-rg\"\n",
            "      location: \"brazilsouth\"\n",
            "outputs:\n",
            "  resource_group_name: \"${rg.name}\"\n",
        );
        assert_eq!(generate(&graph), expected);
    }

    #[rstest]
    fn nests_maps_and_lists() {
        let mut graph = ResourceGraph::new("demo", "dev");
        let mut subnet = ResourceNode::new("web_subnet", ResourceKind::Subnet);
        subnet.properties.insert(
            "delegations".into(),
            Property::List(vec![Property::map([
                ("name", Property::text("web")),
                ("serviceName", Property::text("Microsoft.Web/serverFarms")),
            ])]),
        );
        subnet.properties.insert(
            "addressSpace".into(),
            Property::map([("addressPrefixes", Property::Value(json!(["10.0.0.0/16"])))]),
        );
        subnet
            .properties
            .insert("tags".into(), Property::Map(indexmap::IndexMap::new()));
        graph.nodes.insert("web_subnet".into(), subnet);
        let expected = concat!(
            "name: \"demo\"\n",
            "runtime: yaml\n",
            "resources:\n",
            "  web_subnet:\n",
            "    type: azure-native:network:Subnet\n",
            "    properties:\n",
            "      delegations:\n",
            "        - name: \"web\"\n",
            "          serviceName: \"Microsoft.Web/serverFarms\"\n",
            "      addressSpace:\n",
            "        addressPrefixes: [\"10.0.0.0/16\"]\n",
            "      tags: {}\n",
        );
        assert_eq!(generate(&graph), expected);
    }

    #[rstest]
    fn secrets_become_config_or_generated_results() {
        let mut graph = ResourceGraph::new("demo", "dev");
        graph.secrets.insert(
            "admin_password".into(),
            SecretBinding::Env {
                variable: "POSTGRES_ADMIN_PASSWORD".into(),
                value: SecretValue::new("hunter2"),
            },
        );
        graph.secrets.insert(
            "django_key".into(),
            SecretBinding::Generated(GenerateSpec::default()),
        );
        let mut app = ResourceNode::new("app", ResourceKind::WebApp);
        app.properties.insert(
            "settings".into(),
            Property::map([
                ("password", Property::Secret("admin_password".into())),
                ("key", Property::Secret("django_key".into())),
            ]),
        );
        graph.nodes.insert("app".into(), app);
        let program = generate(&graph);
        assert!(
            program.contains("config:\n  admin_password:\n    type: string\n    secret: true\n")
        );
        assert!(!program.contains("django_key:\n    type: string"));
        assert!(program.contains("password: \"${admin_password}\""));
        assert!(program.contains("key: \"${django_key.result}\""));
        assert!(!program.contains("hunter2"), "secret value leaked: {program}");
    }

    #[rstest]
    fn literal_dollars_are_escaped() {
        let mut graph = ResourceGraph::new("demo", "dev");
        let mut app = ResourceNode::new("app", ResourceKind::WebApp);
        app.properties
            .insert("motto".into(), Property::text("costs $5"));
        app.properties.insert(
            "url".into(),
            Property::Output(
                Output::literal("$HOME/").then(Output::attribute("app", Attribute::Name)),
            ),
        );
        graph.nodes.insert("app".into(), app);
        let program = generate(&graph);
        assert!(program.contains("motto: \"costs $$5\""), "{program}");
        assert!(program.contains("url: \"$$HOME/${app.name}\""), "{program}");
    }

    #[rstest]
    #[case(DeploymentMode::Import, true)]
    #[case(DeploymentMode::Create, false)]
    fn import_mode_adds_import_options(#[case] mode: DeploymentMode, #[case] imported: bool) {
        let mut graph = ResourceGraph::new("demo", "dev");
        graph.mode = mode;
        graph.nodes.insert("rg".into(), group());
        let program = generate(&graph);
        assert_eq!(
            program.contains(
                "    options:\n      import: \"/subscriptions/s/resourceGroups/demo-rg\"\n"
            ),
            imported
        );
    }

    #[rstest]
    fn empty_graphs_still_declare_resources() {
        let graph = ResourceGraph::new("demo", "dev");
        assert_eq!(
            generate(&graph),
            "name: \"demo\"\nruntime: yaml\nresources: {}\n"
        );
    }
}
