//! Manifest-to-graph conversion helpers.

use std::collections::HashMap;

use indexmap::IndexMap;
use mockable::Env;
use serde_json::{Value, json};

use crate::ast::{
    DeploymentMode, NamingStrategy, ResourceDecl, SecretRef, SettingValue, StackManifest,
};
use crate::secrets::{self, SecretBinding};

use super::{
    graph::{IrGenError, Property, ResourceGraph, ResourceNode},
    kind::{Attribute, ResourceKind},
    output::Output,
    rules,
};

/// Inputs to graph construction that do not come from the manifest.
///
/// `mode`, `naming` and `stack` override the manifest's values when set.
#[derive(Debug)]
pub struct BuildContext<'a, E: Env + ?Sized> {
    env: &'a E,
    mode: Option<DeploymentMode>,
    naming: Option<NamingStrategy>,
    stack: Option<String>,
    subscription_id: Option<String>,
}

impl<'a, E: Env + ?Sized> BuildContext<'a, E> {
    /// Context reading secrets from `env`, with no overrides.
    #[must_use]
    pub const fn new(env: &'a E) -> Self {
        Self {
            env,
            mode: None,
            naming: None,
            stack: None,
            subscription_id: None,
        }
    }

    /// Override the manifest's deployment mode.
    #[must_use]
    pub fn with_mode(mut self, mode: Option<DeploymentMode>) -> Self {
        self.mode = mode;
        self
    }

    /// Override the manifest's naming strategy.
    #[must_use]
    pub fn with_naming(mut self, naming: Option<NamingStrategy>) -> Self {
        self.naming = naming;
        self
    }

    /// Override the manifest's stack name.
    #[must_use]
    pub fn with_stack(mut self, stack: Option<String>) -> Self {
        self.stack = stack;
        self
    }

    /// Subscription used for ARM resource ids. Blank values count as unset.
    #[must_use]
    pub fn with_subscription(mut self, subscription_id: Option<String>) -> Self {
        self.subscription_id = subscription_id.filter(|id| !id.trim().is_empty());
        self
    }
}

impl ResourceGraph {
    /// Transform a manifest into a validated [`ResourceGraph`].
    ///
    /// Declarations are processed in order, so every reference must name a
    /// declaration that appears earlier. Rule violations are collected and
    /// reported together once the graph is complete.
    ///
    /// # Errors
    ///
    /// Returns [`IrGenError`] for invalid or dangling references, unusable
    /// secrets, an incomplete import configuration, or broken stack rules.
    pub fn from_manifest<E: Env + ?Sized>(
        manifest: &StackManifest,
        ctx: &BuildContext<'_, E>,
    ) -> Result<Self, IrGenError> {
        let mode = ctx.mode.unwrap_or(manifest.mode);
        let naming = ctx.naming.unwrap_or(manifest.naming);
        if mode == DeploymentMode::Import {
            if naming == NamingStrategy::Auto {
                return Err(IrGenError::ImportRequiresFixedNaming);
            }
            if ctx.subscription_id.is_none() {
                return Err(IrGenError::MissingSubscription);
            }
        }

        let stack = ctx.stack.clone().unwrap_or_else(|| manifest.stack.clone());
        let mut graph = Self::new(manifest.project.clone(), stack);
        graph.description.clone_from(&manifest.description);
        graph.mode = mode;
        graph.naming = naming;

        let mut builder = GraphBuilder {
            graph,
            declared: manifest
                .resources
                .iter()
                .map(|decl| (decl.id(), decl.kind()))
                .collect(),
            subscription_id: ctx.subscription_id.as_deref(),
        };
        builder.bind_secrets(manifest, ctx.env)?;
        for decl in &manifest.resources {
            builder.add(decl)?;
        }
        builder.add_outputs(&manifest.outputs)?;

        let graph = builder.graph;
        graph.validate()?;
        let violations = rules::check(manifest, &graph);
        if !violations.is_empty() {
            return Err(IrGenError::Validation { violations });
        }
        tracing::debug!(
            nodes = graph.nodes.len(),
            secrets = graph.secrets.len(),
            ?mode,
            ?naming,
            "built resource graph"
        );
        Ok(graph)
    }
}

/// Whether `id` can serve as an engine resource key.
fn is_valid_id(id: &str) -> bool {
    let mut chars = id.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn check_id(id: &str) -> Result<(), IrGenError> {
    if is_valid_id(id) {
        Ok(())
    } else {
        Err(IrGenError::InvalidId { id: id.to_owned() })
    }
}

struct GraphBuilder<'m> {
    graph: ResourceGraph,
    declared: HashMap<&'m str, ResourceKind>,
    subscription_id: Option<&'m str>,
}

impl GraphBuilder<'_> {
    fn bind_secrets<E: Env + ?Sized>(
        &mut self,
        manifest: &StackManifest,
        env: &E,
    ) -> Result<(), IrGenError> {
        for (name, source) in &manifest.secrets {
            check_id(name)?;
            if self.declared.contains_key(name.as_str()) {
                return Err(IrGenError::DuplicateId { id: name.clone() });
            }
            let binding = secrets::bind(env, name, source)?;
            if let SecretBinding::Generated(spec) = &binding {
                let mut node = ResourceNode::new(name.clone(), ResourceKind::RandomPassword);
                node.properties
                    .insert("length".into(), Property::Value(json!(spec.length)));
                node.properties
                    .insert("special".into(), Property::Value(json!(spec.special)));
                if spec.special {
                    node.properties.insert(
                        "overrideSpecial".into(),
                        Property::text(spec.override_special.clone()),
                    );
                }
                self.graph.nodes.insert(name.clone(), node);
            }
            self.graph.secrets.insert(name.clone(), binding);
        }
        Ok(())
    }

    /// Ensure `target` names an earlier declaration of kind `expected`.
    fn require(
        &self,
        from: &str,
        field: &str,
        target: &str,
        expected: ResourceKind,
    ) -> Result<(), IrGenError> {
        match self.graph.nodes.get(target) {
            Some(node) if node.kind == expected => Ok(()),
            Some(node) => Err(IrGenError::ReferenceKind {
                from: from.to_owned(),
                field: field.to_owned(),
                target: target.to_owned(),
                expected,
                found: node.kind,
            }),
            None => Err(self.missing(from, field, target)),
        }
    }

    fn missing(&self, from: &str, field: &str, target: &str) -> IrGenError {
        if self.declared.contains_key(target) {
            IrGenError::ForwardReference {
                from: from.to_owned(),
                field: field.to_owned(),
                target: target.to_owned(),
            }
        } else {
            IrGenError::UnknownReference {
                from: from.to_owned(),
                field: field.to_owned(),
                target: target.to_owned(),
            }
        }
    }

    fn require_secret(&self, from: &str, secret: &SecretRef) -> Result<Property, IrGenError> {
        if self.graph.secrets.contains_key(&secret.secret) {
            Ok(Property::Secret(secret.secret.clone()))
        } else {
            Err(IrGenError::UnknownSecret {
                from: from.to_owned(),
                secret: secret.secret.clone(),
            })
        }
    }

    /// Parse `template` and check every attribute it reads.
    fn template(&self, from: &str, field: &str, template: &str) -> Result<Output, IrGenError> {
        let output = Output::parse(template).map_err(|source| IrGenError::Interpolation {
            from: format!("{from}.{field}"),
            source,
        })?;
        for reference in output.references() {
            let Some(node) = self.graph.nodes.get(&reference.resource) else {
                return Err(self.missing(from, field, &reference.resource));
            };
            if !node.kind.exposes(reference.attribute) {
                return Err(IrGenError::UnknownAttribute {
                    from: from.to_owned(),
                    reference: reference.clone(),
                    kind: node.kind,
                });
            }
        }
        Ok(output)
    }

    fn add_outputs(&mut self, outputs: &IndexMap<String, String>) -> Result<(), IrGenError> {
        for (name, template) in outputs {
            let output = self.template("outputs", name, template)?;
            self.graph.outputs.insert(name.clone(), output);
        }
        Ok(())
    }

    /// Start a node: owning group, physical name and region properties.
    fn start(&self, decl: &ResourceDecl) -> Result<ResourceNode, IrGenError> {
        let id = decl.id();
        let kind = decl.kind();
        let mut node = ResourceNode::new(id, kind);
        let declared = decl.physical_name().to_owned();
        match self.graph.naming {
            NamingStrategy::Fixed => node.physical_name = Some(declared),
            NamingStrategy::Auto if kind.requires_exact_name() => {
                node.physical_name = Some(declared);
            }
            NamingStrategy::Auto => node.engine_name = Some(declared),
        }

        if let Some(group) = decl.resource_group() {
            self.require(id, "resource_group", group, ResourceKind::ResourceGroup)?;
            node.properties.insert(
                "resourceGroupName".into(),
                Property::attribute(group, Attribute::Name),
            );
        }
        if let (Some(key), Some(name)) = (kind.name_property(), &node.physical_name) {
            node.properties.insert(key.into(), Property::text(name.clone()));
        }
        if kind == ResourceKind::Subnet {
            return Ok(node);
        }
        let location = match (decl.location(), kind.default_location(), decl.resource_group()) {
            (Some(explicit), _, _) => Property::text(explicit),
            (None, Some(default), _) => Property::text(default),
            (None, None, Some(group)) => Property::attribute(group, Attribute::Location),
            (None, None, None) => return Ok(node),
        };
        node.properties.insert("location".into(), location);
        Ok(node)
    }

    fn add(&mut self, decl: &ResourceDecl) -> Result<(), IrGenError> {
        let id = decl.id();
        check_id(id)?;
        if self.graph.nodes.contains_key(id) {
            return Err(IrGenError::DuplicateId { id: id.to_owned() });
        }
        let mut node = self.start(decl)?;
        let props = self.kind_properties(decl)?;
        node.properties.extend(props);
        node.dependencies = self.dependencies(&node);
        node.arm_id = self.arm_id(decl, node.physical_name.as_deref());
        tracing::debug!(id, kind = %node.kind, deps = ?node.dependencies, "added resource");
        self.graph.nodes.insert(id.to_owned(), node);
        Ok(())
    }

    #[expect(
        clippy::too_many_lines,
        reason = "one arm per resource kind reads best as a single match"
    )]
    fn kind_properties(
        &self,
        decl: &ResourceDecl,
    ) -> Result<Vec<(String, Property)>, IrGenError> {
        let id = decl.id();
        let mut props: Vec<(&str, Property)> = Vec::new();
        match decl {
            ResourceDecl::ResourceGroup(_)
            | ResourceDecl::PrivateDnsZone(_)
            | ResourceDecl::ManagedIdentity(_) => {}
            ResourceDecl::VirtualNetwork(d) => {
                props.push((
                    "addressSpace",
                    Property::map([(
                        "addressPrefixes",
                        Property::Value(json!(d.address_prefixes)),
                    )]),
                ));
            }
            ResourceDecl::Subnet(d) => {
                self.require(
                    id,
                    "virtual_network",
                    &d.virtual_network,
                    ResourceKind::VirtualNetwork,
                )?;
                props.push((
                    "virtualNetworkName",
                    Property::attribute(&d.virtual_network, Attribute::Name),
                ));
                props.push(("addressPrefix", Property::text(d.address_prefix.clone())));
                if !d.delegations.is_empty() {
                    let delegations = d
                        .delegations
                        .iter()
                        .map(|del| {
                            Property::map([
                                ("name", Property::text(del.name.clone())),
                                ("serviceName", Property::text(del.service.clone())),
                            ])
                        })
                        .collect();
                    props.push(("delegations", Property::List(delegations)));
                }
            }
            ResourceDecl::VirtualNetworkLink(d) => {
                self.require(id, "zone", &d.zone, ResourceKind::PrivateDnsZone)?;
                self.require(
                    id,
                    "virtual_network",
                    &d.virtual_network,
                    ResourceKind::VirtualNetwork,
                )?;
                props.push(("privateZoneName", Property::attribute(&d.zone, Attribute::Name)));
                props.push((
                    "virtualNetwork",
                    Property::map([("id", Property::attribute(&d.virtual_network, Attribute::Id))]),
                ));
                props.push((
                    "registrationEnabled",
                    Property::Value(Value::Bool(d.registration_enabled)),
                ));
            }
            ResourceDecl::RedisCache(d) => {
                props.push((
                    "sku",
                    Property::map([
                        ("name", Property::text(d.sku.name.clone())),
                        ("family", Property::text(d.sku.family.clone())),
                        ("capacity", Property::Value(json!(d.sku.capacity))),
                    ]),
                ));
            }
            ResourceDecl::PrivateEndpoint(d) => {
                self.require(id, "subnet", &d.subnet, ResourceKind::Subnet)?;
                self.require(id, "service", &d.service, ResourceKind::RedisCache)?;
                props.push((
                    "subnet",
                    Property::map([("id", Property::attribute(&d.subnet, Attribute::Id))]),
                ));
                props.push((
                    "privateLinkServiceConnections",
                    Property::List(vec![Property::map([
                        ("name", Property::text(d.connection_name.clone())),
                        (
                            "privateLinkServiceId",
                            Property::attribute(&d.service, Attribute::Id),
                        ),
                        ("groupIds", Property::Value(json!(d.group_ids))),
                    ])]),
                ));
            }
            ResourceDecl::PostgresServer(d) => {
                self.require(id, "delegated_subnet", &d.delegated_subnet, ResourceKind::Subnet)?;
                self.require(
                    id,
                    "private_dns_zone",
                    &d.private_dns_zone,
                    ResourceKind::PrivateDnsZone,
                )?;
                props.push((
                    "sku",
                    Property::map([
                        ("name", Property::text(d.sku.name.clone())),
                        ("tier", Property::text(d.sku.tier.clone())),
                    ]),
                ));
                props.push(("version", Property::text(d.version.clone())));
                if let Some(login) = &d.administrator_login {
                    props.push(("administratorLogin", Property::text(login.clone())));
                }
                if let Some(secret) = &d.administrator_login_password {
                    props.push(("administratorLoginPassword", self.require_secret(id, secret)?));
                }
                props.push((
                    "authConfig",
                    Property::map([
                        ("passwordAuth", Property::text(d.auth.password_auth.as_provider())),
                        (
                            "activeDirectoryAuth",
                            Property::text(d.auth.active_directory_auth.as_provider()),
                        ),
                    ]),
                ));
                props.push((
                    "storage",
                    Property::map([("storageSizeGB", Property::Value(json!(d.storage_gb)))]),
                ));
                props.push((
                    "backup",
                    Property::map([
                        ("backupRetentionDays", Property::Value(json!(d.backup.retention_days))),
                        (
                            "geoRedundantBackup",
                            Property::text(d.backup.geo_redundant.as_provider()),
                        ),
                    ]),
                ));
                props.push((
                    "network",
                    Property::map([
                        (
                            "delegatedSubnetResourceId",
                            Property::attribute(&d.delegated_subnet, Attribute::Id),
                        ),
                        (
                            "privateDnsZoneArmResourceId",
                            Property::attribute(&d.private_dns_zone, Attribute::Id),
                        ),
                    ]),
                ));
            }
            ResourceDecl::AppServicePlan(d) => {
                props.push(("kind", Property::text(d.plan_kind.clone())));
                props.push(("reserved", Property::Value(Value::Bool(d.reserved))));
                props.push((
                    "sku",
                    Property::map([
                        ("name", Property::text(d.sku.name.clone())),
                        ("tier", Property::text(d.sku.tier.clone())),
                        ("capacity", Property::Value(json!(d.sku.capacity))),
                    ]),
                ));
            }
            ResourceDecl::WebApp(d) => {
                self.require(id, "plan", &d.plan, ResourceKind::AppServicePlan)?;
                props.push(("serverFarmId", Property::attribute(&d.plan, Attribute::Id)));
                let mut site_config: Vec<(&str, Property)> = Vec::new();
                if let Some(runtime) = &d.linux_fx_version {
                    site_config.push(("linuxFxVersion", Property::text(runtime.clone())));
                }
                let mut settings = Vec::with_capacity(d.app_settings.len());
                for (name, value) in &d.app_settings {
                    let value = match value {
                        SettingValue::Secret(secret) => self.require_secret(id, secret)?,
                        SettingValue::Text(text) => {
                            let field = format!("app_settings.{name}");
                            Property::Output(self.template(id, &field, text)?)
                        }
                    };
                    settings.push(Property::map([
                        ("name", Property::text(name.clone())),
                        ("value", value),
                    ]));
                }
                if !settings.is_empty() {
                    site_config.push(("appSettings", Property::List(settings)));
                }
                props.push(("siteConfig", Property::map(site_config)));
                if let Some(subnet) = &d.subnet {
                    self.require(id, "subnet", subnet, ResourceKind::Subnet)?;
                    props.push((
                        "virtualNetworkSubnetId",
                        Property::attribute(subnet, Attribute::Id),
                    ));
                }
                if d.vnet_route_all {
                    props.push(("vnetRouteAllEnabled", Property::Value(Value::Bool(true))));
                }
            }
        }
        Ok(props
            .into_iter()
            .map(|(key, value)| (key.to_owned(), value))
            .collect())
    }

    /// Resources and generated secrets the node's properties read.
    fn dependencies(&self, node: &ResourceNode) -> Vec<String> {
        let mut deps: Vec<String> = Vec::new();
        let mut push = |id: &str| {
            if !deps.iter().any(|d| d == id) {
                deps.push(id.to_owned());
            }
        };
        for prop in node.properties.values() {
            for reference in prop.references() {
                push(&reference.resource);
            }
            for secret in prop.secrets() {
                if self
                    .graph
                    .secrets
                    .get(secret)
                    .is_some_and(SecretBinding::is_generated)
                {
                    push(secret);
                }
            }
        }
        deps
    }

    /// ARM id of the resource, when its name and subscription are known.
    fn arm_id(&self, decl: &ResourceDecl, name: Option<&str>) -> Option<String> {
        let name = name?;
        let subscription = self.subscription_id?;
        let kind = decl.kind();
        let parent_id = |parent: &str| {
            self.graph
                .nodes
                .get(parent)
                .and_then(|node| node.arm_id.clone())
        };
        match (decl, kind.arm_type()) {
            (ResourceDecl::ResourceGroup(_), _) => {
                Some(format!("/subscriptions/{subscription}/resourceGroups/{name}"))
            }
            (ResourceDecl::Subnet(_) | ResourceDecl::VirtualNetworkLink(_), Some(segment)) => {
                let parent = parent_id(decl.parent()?)?;
                Some(format!("{parent}/{segment}/{name}"))
            }
            (_, Some(segment)) => {
                let group = parent_id(decl.resource_group()?)?;
                Some(format!("{group}/providers/{segment}/{name}"))
            }
            (_, None) => None,
        }
    }
}
