//! Resource graph types.

use super::kind::{Attribute, ResourceKind};
use super::output::{AttrRef, InterpolationError, Output};
use crate::ast::{DeploymentMode, NamingStrategy};
use crate::secrets::{SecretBinding, SecretError};
use indexmap::IndexMap;
use itertools::Itertools;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Validated resource graph ready for program generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceGraph {
    /// Engine project name.
    pub project: String,
    /// Engine stack name.
    pub stack: String,
    /// Optional summary carried into the program.
    pub description: Option<String>,
    /// Effective deployment mode.
    pub mode: DeploymentMode,
    /// Effective naming strategy.
    pub naming: NamingStrategy,
    /// Nodes in declaration order, keyed by logical id.
    pub nodes: IndexMap<String, ResourceNode>,
    /// Bound secrets in declaration order.
    pub secrets: IndexMap<String, SecretBinding>,
    /// Exported values.
    pub outputs: IndexMap<String, Output>,
}

/// A single resource in the graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceNode {
    /// Logical id.
    pub id: String,
    /// Kind of resource.
    pub kind: ResourceKind,
    /// Name handed to the provider, when one is fixed.
    pub physical_name: Option<String>,
    /// Engine-side resource name when the engine picks the physical name.
    ///
    /// Auto-named resources keep their declared name here so the generated
    /// physical name starts with it.
    pub engine_name: Option<String>,
    /// Provider properties.
    pub properties: IndexMap<String, Property>,
    /// Logical ids this node waits on, in first-use order.
    pub dependencies: Vec<String>,
    /// ARM resource id, when derivable.
    pub arm_id: Option<String>,
}

impl ResourceNode {
    /// Create a node with no properties.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            id: id.into(),
            kind,
            physical_name: None,
            engine_name: None,
            properties: IndexMap::new(),
            dependencies: Vec::new(),
            arm_id: None,
        }
    }

    /// Property `key`, if set.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&Property> {
        self.properties.get(key)
    }
}

/// A provider property value.
///
/// Values referencing other resources are held as [`Output`]s and secrets by
/// name, so the tree can be inspected and emitted without ever holding a
/// resolved cross-resource value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Property {
    /// Plain JSON value.
    Value(serde_json::Value),
    /// Deferred string.
    Output(Output),
    /// Reference to a bound secret.
    Secret(String),
    /// Ordered list.
    List(Vec<Property>),
    /// Ordered map.
    Map(IndexMap<String, Property>),
}

impl Property {
    /// A string property.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Value(serde_json::Value::String(value.into()))
    }

    /// A deferred `resource.attribute` property.
    #[must_use]
    pub fn attribute(resource: impl Into<String>, attribute: Attribute) -> Self {
        Self::Output(Output::attribute(resource, attribute))
    }

    /// A map built from `(key, value)` pairs.
    #[must_use]
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Self)>) -> Self {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Every attribute reference in the tree, depth first.
    #[must_use]
    pub fn references(&self) -> Vec<&AttrRef> {
        let mut refs = Vec::new();
        self.collect_references(&mut refs);
        refs
    }

    fn collect_references<'a>(&'a self, refs: &mut Vec<&'a AttrRef>) {
        match self {
            Self::Value(_) | Self::Secret(_) => {}
            Self::Output(out) => refs.extend(out.references()),
            Self::List(items) => items.iter().for_each(|item| item.collect_references(refs)),
            Self::Map(entries) => entries
                .values()
                .for_each(|item| item.collect_references(refs)),
        }
    }

    /// Names of secrets referenced in the tree.
    #[must_use]
    pub fn secrets(&self) -> Vec<&str> {
        match self {
            Self::Value(_) | Self::Output(_) => Vec::new(),
            Self::Secret(name) => vec![name.as_str()],
            Self::List(items) => items.iter().flat_map(Self::secrets).collect(),
            Self::Map(entries) => entries.values().flat_map(Self::secrets).collect(),
        }
    }

    /// Follow `path` through nested maps.
    #[must_use]
    pub fn get_path(&self, path: &[&str]) -> Option<&Self> {
        path.iter().try_fold(self, |node, key| match node {
            Self::Map(entries) => entries.get(*key),
            _ => None,
        })
    }
}

/// A constraint the declared stack breaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// A subnet consumed by a delegating service lacks the exact delegation.
    DelegationMismatch {
        /// Subnet id.
        subnet: String,
        /// Consuming resource id.
        consumer: String,
        /// Required service name.
        expected: &'static str,
        /// Services actually delegated.
        found: Vec<String>,
    },
    /// A private endpoint sits in a delegated subnet.
    DelegatedEndpointSubnet {
        /// Endpoint id.
        endpoint: String,
        /// Subnet id.
        subnet: String,
    },
    /// Password authentication is disabled yet a password is supplied.
    PasswordAuthConflict {
        /// Server id.
        server: String,
    },
    /// Password authentication is enabled without full credentials.
    MissingCredential {
        /// Server id.
        server: String,
        /// Missing field.
        field: &'static str,
    },
    /// Two resources of one kind share a physical name within a scope.
    DuplicateName {
        /// Resource kind.
        kind: ResourceKind,
        /// Shared name.
        name: String,
        /// First declaration.
        first: String,
        /// Later declaration.
        second: String,
    },
    /// A database DNS zone lacks the provider's zone suffix.
    DnsZoneSuffix {
        /// Zone id.
        zone: String,
        /// Zone name.
        name: String,
        /// Required suffix.
        suffix: &'static str,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DelegationMismatch {
                subnet,
                consumer,
                expected,
                found,
            } => {
                let found = if found.is_empty() {
                    "none".to_owned()
                } else {
                    found.join(", ")
                };
                write!(
                    f,
                    "subnet '{subnet}' used by '{consumer}' must carry exactly one delegation to {expected} (found: {found})"
                )
            }
            Self::DelegatedEndpointSubnet { endpoint, subnet } => write!(
                f,
                "private endpoint '{endpoint}' cannot use delegated subnet '{subnet}'"
            ),
            Self::PasswordAuthConflict { server } => write!(
                f,
                "server '{server}' disables password authentication but supplies an administrator password"
            ),
            Self::MissingCredential { server, field } => write!(
                f,
                "server '{server}' enables password authentication but has no {field}"
            ),
            Self::DuplicateName {
                kind,
                name,
                first,
                second,
            } => write!(
                f,
                "{kind} name '{name}' is declared by both '{first}' and '{second}'"
            ),
            Self::DnsZoneSuffix { zone, name, suffix } => write!(
                f,
                "private DNS zone '{zone}' ({name}) must end with '{suffix}'"
            ),
        }
    }
}

/// Errors raised while building or validating a [`ResourceGraph`].
#[derive(Debug, Error)]
pub enum IrGenError {
    /// A logical id has characters the engine cannot use as a key.
    #[error("invalid id '{id}': ids start with a letter and contain only letters, digits, '_' or '-'")]
    InvalidId {
        /// Offending id.
        id: String,
    },

    /// Two declarations share a logical id.
    #[error("duplicate id '{id}'")]
    DuplicateId {
        /// Offending id.
        id: String,
    },

    /// A reference names no declaration.
    #[error("'{from}' references unknown resource '{target}' in {field}")]
    UnknownReference {
        /// Referencing declaration.
        from: String,
        /// Field holding the reference.
        field: String,
        /// Referenced id.
        target: String,
    },

    /// A reference names a declaration that appears later.
    #[error("'{from}' references '{target}' in {field} before it is declared")]
    ForwardReference {
        /// Referencing declaration.
        from: String,
        /// Field holding the reference.
        field: String,
        /// Referenced id.
        target: String,
    },

    /// A reference names a declaration of the wrong kind.
    #[error("'{from}' expects a {expected} in {field} but '{target}' is a {found}")]
    ReferenceKind {
        /// Referencing declaration.
        from: String,
        /// Field holding the reference.
        field: String,
        /// Referenced id.
        target: String,
        /// Required kind.
        expected: ResourceKind,
        /// Actual kind.
        found: ResourceKind,
    },

    /// An attribute is read from a kind that does not report it.
    #[error("'{from}' reads {reference} but a {kind} has no attribute '{}'", .reference.attribute)]
    UnknownAttribute {
        /// Referencing declaration.
        from: String,
        /// The reference.
        reference: AttrRef,
        /// Kind of the referenced resource.
        kind: ResourceKind,
    },

    /// A template could not be parsed.
    #[error("invalid template in {from}")]
    Interpolation {
        /// Where the template appeared.
        from: String,
        /// Parse failure.
        #[source]
        source: InterpolationError,
    },

    /// A secret reference names no entry of `secrets`.
    #[error("'{from}' references unknown secret '{secret}'")]
    UnknownSecret {
        /// Referencing declaration.
        from: String,
        /// Secret name.
        secret: String,
    },

    /// A secret could not be bound.
    #[error(transparent)]
    Secret(#[from] SecretError),

    /// Import mode was requested with engine-chosen names.
    #[error("import mode requires fixed naming; pass --naming fixed or set `naming: fixed`")]
    ImportRequiresFixedNaming,

    /// Import mode was requested without a subscription id.
    #[error("import mode requires a subscription id; set ARM_SUBSCRIPTION_ID or pass --subscription-id")]
    MissingSubscription,

    /// The graph contains a dependency cycle.
    #[error("circular dependency detected: {}", .cycle.join(" -> "))]
    CircularDependency {
        /// Canonical cycle, first node repeated at the end.
        cycle: Vec<String>,
    },

    /// A node depends on an id the graph does not contain.
    #[error("'{node}' depends on missing resource '{dependency}'")]
    MissingDependency {
        /// Dependent node.
        node: String,
        /// Missing id.
        dependency: String,
    },

    /// A node depends on one declared after it.
    #[error("'{node}' depends on '{dependency}', which is declared after it")]
    OutOfOrder {
        /// Dependent node.
        node: String,
        /// Later node.
        dependency: String,
    },

    /// One or more stack constraints are broken.
    #[error("stack validation failed:\n{}", .violations.iter().map(|v| format!("  - {v}")).join("\n"))]
    Validation {
        /// Every violation found.
        violations: Vec<Violation>,
    },
}

impl ResourceGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new(project: impl Into<String>, stack: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            stack: stack.into(),
            description: None,
            mode: DeploymentMode::default(),
            naming: NamingStrategy::default(),
            nodes: IndexMap::new(),
            secrets: IndexMap::new(),
            outputs: IndexMap::new(),
        }
    }

    /// Node with logical id `id`.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&ResourceNode> {
        self.nodes.get(id)
    }

    /// Nodes `id` waits on, in first-use order. Unknown ids yield nothing.
    pub fn dependencies_of<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a ResourceNode> + 'a {
        self.nodes
            .get(id)
            .into_iter()
            .flat_map(|node| node.dependencies.iter())
            .filter_map(|dep| self.nodes.get(dep))
    }

    /// Nodes waiting on `id`, in declaration order.
    pub fn dependents_of<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a ResourceNode> + 'a {
        self.nodes
            .values()
            .filter(move |node| node.dependencies.iter().any(|dep| dep == id))
    }

    /// Check structural soundness of a graph, including hand-assembled ones.
    ///
    /// Cycles are reported first, then dependencies on absent nodes, then
    /// dependencies on nodes declared later.
    ///
    /// # Errors
    ///
    /// Returns [`IrGenError::CircularDependency`],
    /// [`IrGenError::MissingDependency`] or [`IrGenError::OutOfOrder`].
    pub fn validate(&self) -> Result<(), IrGenError> {
        let report = super::cycle::analyse(&self.nodes);
        if let Some(cycle) = report.cycle {
            return Err(IrGenError::CircularDependency { cycle });
        }
        if let Some((node, dependency)) = report.missing_dependencies.into_iter().next() {
            return Err(IrGenError::MissingDependency { node, dependency });
        }
        for (position, node) in self.nodes.values().enumerate() {
            for dep in &node.dependencies {
                if self.nodes.get_index_of(dep).is_some_and(|idx| idx >= position) {
                    return Err(IrGenError::OutOfOrder {
                        node: node.id.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn node(id: &str, deps: &[&str]) -> ResourceNode {
        let mut node = ResourceNode::new(id, ResourceKind::ManagedIdentity);
        node.dependencies = deps.iter().map(|d| (*d).to_owned()).collect();
        node
    }

    fn graph(nodes: Vec<ResourceNode>) -> ResourceGraph {
        let mut graph = ResourceGraph::new("p", "dev");
        for node in nodes {
            graph.nodes.insert(node.id.clone(), node);
        }
        graph
    }

    #[rstest]
    fn dependency_queries_follow_edges() {
        let g = graph(vec![node("rg", &[]), node("a", &["rg"]), node("b", &["rg", "a"])]);
        let deps: Vec<_> = g.dependencies_of("b").map(|n| n.id.as_str()).collect();
        assert_eq!(deps, ["rg", "a"]);
        let dependents: Vec<_> = g.dependents_of("rg").map(|n| n.id.as_str()).collect();
        assert_eq!(dependents, ["a", "b"]);
        assert_eq!(g.dependencies_of("missing").count(), 0);
    }

    #[rstest]
    fn validate_reports_canonical_cycle() {
        let g = graph(vec![node("c", &["b"]), node("b", &["a"]), node("a", &["c"])]);
        let err = g.validate().expect_err("cycle");
        let IrGenError::CircularDependency { cycle } = err else {
            panic!("expected cycle, got {err:?}");
        };
        assert_eq!(cycle, ["a", "c", "b", "a"]);
    }

    #[rstest]
    fn validate_reports_missing_dependency() {
        let g = graph(vec![node("a", &["ghost"])]);
        assert!(matches!(
            g.validate(),
            Err(IrGenError::MissingDependency { node, dependency })
                if node == "a" && dependency == "ghost"
        ));
    }

    #[rstest]
    fn validate_reports_out_of_order_dependency() {
        let g = graph(vec![node("a", &["b"]), node("b", &[])]);
        assert!(matches!(
            g.validate(),
            Err(IrGenError::OutOfOrder { node, dependency }) if node == "a" && dependency == "b"
        ));
    }

    #[rstest]
    fn property_walk_collects_references_and_secrets() {
        let prop = Property::map([
            ("serverFarmId", Property::attribute("plan", Attribute::Id)),
            (
                "appSettings",
                Property::List(vec![Property::map([
                    ("name", Property::text("SECRET_KEY")),
                    ("value", Property::Secret("django".into())),
                ])]),
            ),
        ]);
        let refs: Vec<_> = prop.references().into_iter().map(ToString::to_string).collect();
        assert_eq!(refs, ["plan.id"]);
        assert_eq!(prop.secrets(), ["django"]);
        assert!(prop.get_path(&["serverFarmId"]).is_some());
        assert!(prop.get_path(&["serverFarmId", "x"]).is_none());
    }
}
