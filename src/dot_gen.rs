//! Graphviz DOT generator.
//!
//! Renders a [`ResourceGraph`] as a digraph whose edges run from each
//! dependency to its dependent, so the picture reads in apply order.

use crate::ir::{ResourceGraph, ResourceKind};
use std::fmt::{self, Display, Formatter};

/// Generate a DOT document for `graph`.
#[must_use]
pub fn generate(graph: &ResourceGraph) -> String {
    DisplayDot { graph }.to_string()
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

const fn shape(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::ResourceGroup => "folder",
        ResourceKind::VirtualNetwork | ResourceKind::Subnet => "component",
        ResourceKind::PrivateDnsZone | ResourceKind::VirtualNetworkLink => "note",
        ResourceKind::RandomPassword => "diamond",
        ResourceKind::PostgresServer | ResourceKind::RedisCache => "cylinder",
        _ => "box",
    }
}

struct DisplayDot<'a> {
    graph: &'a ResourceGraph,
}

impl Display for DisplayDot<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "digraph \"{}\" {{", escape(&self.graph.project))?;
        writeln!(f, "  rankdir=LR;")?;
        for node in self.graph.nodes.values() {
            let mut lines = vec![escape(&node.id), node.kind.to_string()];
            if let Some(name) = node.physical_name.as_ref().filter(|n| **n != node.id) {
                lines.push(escape(name));
            }
            writeln!(
                f,
                "  \"{}\" [label=\"{}\", shape={}];",
                escape(&node.id),
                lines.join("\\n"),
                shape(node.kind)
            )?;
        }
        for node in self.graph.nodes.values() {
            for dep in &node.dependencies {
                writeln!(f, "  \"{}\" -> \"{}\";", escape(dep), escape(&node.id))?;
            }
        }
        writeln!(f, "}}")
    }
}
