//! Best-effort prediction of engine-reported attributes.
//!
//! Some attributes follow from the declaration alone: fixed names, declared
//! regions, ARM ids under a known subscription, and the host names Azure
//! derives from a resource name. [`PreviewAttributes`] answers those and
//! leaves everything else unknown, which keeps dependent outputs pending.

use super::graph::{Property, ResourceGraph};
use super::kind::{Attribute, ResourceKind};
use super::output::{AttrRef, AttributeSource, Resolution};

/// Default non-TLS Redis port.
pub const REDIS_PORT: u16 = 6379;
/// Default TLS Redis port.
pub const REDIS_SSL_PORT: u16 = 6380;

/// Attribute source predicting values from the graph itself.
#[derive(Debug, Clone, Copy)]
pub struct PreviewAttributes<'g> {
    graph: &'g ResourceGraph,
}

impl<'g> PreviewAttributes<'g> {
    /// Predict attributes of `graph`.
    #[must_use]
    pub const fn new(graph: &'g ResourceGraph) -> Self {
        Self { graph }
    }

    /// Resolve every stack output, in declaration order.
    #[must_use]
    pub fn outputs(&self) -> Vec<(&'g str, Resolution)> {
        self.graph
            .outputs
            .iter()
            .map(|(name, output)| (name.as_str(), output.resolve(self)))
            .collect()
    }
}

impl AttributeSource for PreviewAttributes<'_> {
    fn attribute(&self, reference: &AttrRef) -> Option<String> {
        let node = self.graph.node(&reference.resource)?;
        let name = node.physical_name.as_deref();
        match (node.kind, reference.attribute) {
            (_, Attribute::Name) => name.map(str::to_owned),
            (_, Attribute::Id) => node.arm_id.clone(),
            (_, Attribute::Location) => match node.property("location")? {
                Property::Value(serde_json::Value::String(text)) => Some(text.clone()),
                Property::Output(output) => output.resolve(self).known(),
                _ => None,
            },
            (ResourceKind::RedisCache, Attribute::HostName) => {
                name.map(|n| format!("{n}.redis.cache.windows.net"))
            }
            (ResourceKind::RedisCache, Attribute::Port) => Some(REDIS_PORT.to_string()),
            (ResourceKind::RedisCache, Attribute::SslPort) => Some(REDIS_SSL_PORT.to_string()),
            (ResourceKind::PostgresServer, Attribute::FullyQualifiedDomainName) => {
                name.map(|n| format!("{n}.postgres.database.azure.com"))
            }
            (ResourceKind::WebApp, Attribute::DefaultHostName) => {
                name.map(|n| format!("{n}.azurewebsites.net"))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Output, ResourceNode};
    use rstest::rstest;

    fn graph() -> ResourceGraph {
        let mut graph = ResourceGraph::new("p", "dev");
        let mut rg = ResourceNode::new("rg", ResourceKind::ResourceGroup);
        rg.physical_name = Some("group".into());
        rg.arm_id = Some("/subscriptions/s/resourceGroups/group".into());
        rg.properties
            .insert("location".into(), Property::text("brazilsouth"));
        let mut cache = ResourceNode::new("cache", ResourceKind::RedisCache);
        cache.physical_name = Some("c1".into());
        cache
            .properties
            .insert("location".into(), Property::attribute("rg", Attribute::Location));
        let identity = ResourceNode::new("id", ResourceKind::ManagedIdentity);
        for node in [rg, cache, identity] {
            graph.nodes.insert(node.id.clone(), node);
        }
        graph
    }

    #[rstest]
    #[case("cache", Attribute::HostName, Some("c1.redis.cache.windows.net"))]
    #[case("cache", Attribute::Port, Some("6379"))]
    #[case("cache", Attribute::Location, Some("brazilsouth"))]
    #[case("rg", Attribute::Id, Some("/subscriptions/s/resourceGroups/group"))]
    #[case("id", Attribute::Name, None)]
    #[case("id", Attribute::PrincipalId, None)]
    #[case("ghost", Attribute::Name, None)]
    fn predicts_derivable_attributes(
        #[case] resource: &str,
        #[case] attribute: Attribute,
        #[case] expected: Option<&str>,
    ) {
        let g = graph();
        let preview = PreviewAttributes::new(&g);
        assert_eq!(
            preview.attribute(&AttrRef::new(resource, attribute)).as_deref(),
            expected
        );
    }

    #[rstest]
    fn outputs_resolve_or_stay_pending() {
        let mut g = graph();
        g.outputs.insert(
            "redis_url".into(),
            Output::parse("redis://${cache.hostName}:6379").expect("parse"),
        );
        g.outputs.insert(
            "identity".into(),
            Output::attribute("id", Attribute::Name),
        );
        let outputs = PreviewAttributes::new(&g).outputs();
        assert_eq!(
            outputs,
            vec![
                (
                    "redis_url",
                    Resolution::Known("redis://c1.redis.cache.windows.net:6379".into())
                ),
                (
                    "identity",
                    Resolution::Pending(vec![AttrRef::new("id", Attribute::Name)])
                ),
            ]
        );
    }
}
