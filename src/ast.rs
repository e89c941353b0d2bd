//! Stackfile abstract syntax tree.
//!
//! These structures mirror the YAML schema of a `Stackfile` and are
//! deserialised after template rendering (see [`crate::manifest`]). Every
//! resource is declared once with a logical `id`; other declarations refer to
//! it by that id. Physical names default to the id.
//!
//! ```rust
//! use azstack::ast::{ResourceDecl, StackManifest};
//!
//! let yaml = r#"
//! stack_version: "1.0.0"
//! project: demo
//! resources:
//!   - kind: resource_group
//!     id: rg
//!     name: demo_group
//!     location: brazilsouth
//! "#;
//! let manifest: StackManifest = serde_saphyr::from_str(yaml).expect("parse");
//! let ResourceDecl::ResourceGroup(group) = &manifest.resources[0] else {
//!     panic!("expected a resource group");
//! };
//! assert_eq!(group.location, "brazilsouth");
//! ```

use crate::ir::ResourceKind;
use indexmap::IndexMap;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Map type for `vars` blocks, preserving YAML values.
pub type Vars = HashMap<String, serde_json::Value>;

/// Service name a PostgreSQL delegated subnet must carry.
pub const POSTGRES_DELEGATION: &str = "Microsoft.DBforPostgreSQL/flexibleServers";

/// Service name a web app integration subnet must carry.
pub const WEB_DELEGATION: &str = "Microsoft.Web/serverFarms";

/// Characters Django's `get_random_secret_key` draws its punctuation from.
pub const DJANGO_SECRET_SPECIALS: &str = "!@#$%^&*(-_=+)";

fn default_stack() -> String {
    "dev".to_owned()
}

/// Top-level manifest parsed from a `Stackfile`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StackManifest {
    /// Semantic version of the manifest format.
    pub stack_version: Version,

    /// Engine project name.
    pub project: String,

    /// Stack the engine deploys into.
    #[serde(default = "default_stack")]
    pub stack: String,

    /// Optional human-readable summary carried into the generated program.
    #[serde(default)]
    pub description: Option<String>,

    /// Whether resources are created or adopted from an existing deployment.
    #[serde(default)]
    pub mode: DeploymentMode,

    /// How physical resource names are chosen.
    #[serde(default)]
    pub naming: NamingStrategy,

    /// Global values available to template expressions.
    #[serde(default)]
    pub vars: Vars,

    /// Named secrets referenced by resources.
    #[serde(default)]
    pub secrets: IndexMap<String, SecretSource>,

    /// Resource declarations in dependency order.
    pub resources: Vec<ResourceDecl>,

    /// Values exported once the engine has applied the stack.
    #[serde(default)]
    pub outputs: IndexMap<String, String>,
}

/// Deployment mode of a stack.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentMode {
    /// Create every resource from scratch.
    #[default]
    Create,
    /// Adopt resources that already exist in the subscription.
    Import,
}

/// Naming strategy for physical resource names.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum NamingStrategy {
    /// Let the engine derive unique names from logical ids.
    #[default]
    Auto,
    /// Use the declared names verbatim.
    Fixed,
}

/// Where a secret value comes from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretSource {
    /// Read from the named environment variable at build time.
    Env(String),
    /// Generated by the engine's random provider and kept in its state.
    Generate(GenerateSpec),
}

fn default_secret_length() -> u32 {
    50
}

const fn default_true() -> bool {
    true
}

fn default_specials() -> String {
    DJANGO_SECRET_SPECIALS.to_owned()
}

/// Parameters of an engine-generated secret.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GenerateSpec {
    /// Number of characters.
    #[serde(default = "default_secret_length")]
    pub length: u32,
    /// Whether punctuation is allowed.
    #[serde(default = "default_true")]
    pub special: bool,
    /// The punctuation set to draw from.
    #[serde(default = "default_specials")]
    pub override_special: String,
}

impl Default for GenerateSpec {
    fn default() -> Self {
        Self {
            length: default_secret_length(),
            special: true,
            override_special: default_specials(),
        }
    }
}

/// Reference to an entry of the `secrets` block.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SecretRef {
    /// Name of the secret.
    pub secret: String,
}

/// A single resource declaration, tagged by `kind`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceDecl {
    /// Azure resource group.
    ResourceGroup(ResourceGroupDecl),
    /// Virtual network.
    VirtualNetwork(VirtualNetworkDecl),
    /// Subnet of a virtual network.
    Subnet(SubnetDecl),
    /// Private DNS zone.
    PrivateDnsZone(PrivateDnsZoneDecl),
    /// Link between a private DNS zone and a virtual network.
    VirtualNetworkLink(VirtualNetworkLinkDecl),
    /// Azure Cache for Redis.
    RedisCache(RedisCacheDecl),
    /// Private endpoint exposing a service inside a subnet.
    PrivateEndpoint(PrivateEndpointDecl),
    /// PostgreSQL flexible server.
    PostgresServer(PostgresServerDecl),
    /// App Service plan.
    AppServicePlan(AppServicePlanDecl),
    /// App Service web app.
    WebApp(WebAppDecl),
    /// User-assigned managed identity.
    ManagedIdentity(ManagedIdentityDecl),
}

macro_rules! each_decl {
    ($value:expr, $decl:ident => $body:expr) => {
        match $value {
            ResourceDecl::ResourceGroup($decl) => $body,
            ResourceDecl::VirtualNetwork($decl) => $body,
            ResourceDecl::Subnet($decl) => $body,
            ResourceDecl::PrivateDnsZone($decl) => $body,
            ResourceDecl::VirtualNetworkLink($decl) => $body,
            ResourceDecl::RedisCache($decl) => $body,
            ResourceDecl::PrivateEndpoint($decl) => $body,
            ResourceDecl::PostgresServer($decl) => $body,
            ResourceDecl::AppServicePlan($decl) => $body,
            ResourceDecl::WebApp($decl) => $body,
            ResourceDecl::ManagedIdentity($decl) => $body,
        }
    };
}

impl ResourceDecl {
    /// Logical id used for references.
    #[must_use]
    pub fn id(&self) -> &str {
        each_decl!(self, decl => decl.id.as_str())
    }

    /// Physical name, defaulting to the logical id.
    #[must_use]
    pub fn physical_name(&self) -> &str {
        each_decl!(self, decl => decl.name.as_deref().unwrap_or(decl.id.as_str()))
    }

    /// Declared location, if any.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        match self {
            Self::ResourceGroup(decl) => Some(decl.location.as_str()),
            Self::VirtualNetwork(decl) => decl.location.as_deref(),
            Self::Subnet(_) => None,
            Self::PrivateDnsZone(decl) => decl.location.as_deref(),
            Self::VirtualNetworkLink(decl) => decl.location.as_deref(),
            Self::RedisCache(decl) => decl.location.as_deref(),
            Self::PrivateEndpoint(decl) => decl.location.as_deref(),
            Self::PostgresServer(decl) => decl.location.as_deref(),
            Self::AppServicePlan(decl) => decl.location.as_deref(),
            Self::WebApp(decl) => decl.location.as_deref(),
            Self::ManagedIdentity(decl) => decl.location.as_deref(),
        }
    }

    /// Owning resource group, absent for the group itself.
    #[must_use]
    pub fn resource_group(&self) -> Option<&str> {
        match self {
            Self::ResourceGroup(_) => None,
            Self::VirtualNetwork(decl) => Some(&decl.resource_group),
            Self::Subnet(decl) => Some(&decl.resource_group),
            Self::PrivateDnsZone(decl) => Some(&decl.resource_group),
            Self::VirtualNetworkLink(decl) => Some(&decl.resource_group),
            Self::RedisCache(decl) => Some(&decl.resource_group),
            Self::PrivateEndpoint(decl) => Some(&decl.resource_group),
            Self::PostgresServer(decl) => Some(&decl.resource_group),
            Self::AppServicePlan(decl) => Some(&decl.resource_group),
            Self::WebApp(decl) => Some(&decl.resource_group),
            Self::ManagedIdentity(decl) => Some(&decl.resource_group),
        }
    }

    /// Declaration the physical name must be unique within.
    ///
    /// Subnets are scoped by their network and links by their zone; every
    /// other resource by its group. Groups are scoped by the subscription.
    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        match self {
            Self::Subnet(decl) => Some(&decl.virtual_network),
            Self::VirtualNetworkLink(decl) => Some(&decl.zone),
            other => other.resource_group(),
        }
    }

    /// Resource kind of the declaration.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        match self {
            Self::ResourceGroup(_) => ResourceKind::ResourceGroup,
            Self::VirtualNetwork(_) => ResourceKind::VirtualNetwork,
            Self::Subnet(_) => ResourceKind::Subnet,
            Self::PrivateDnsZone(_) => ResourceKind::PrivateDnsZone,
            Self::VirtualNetworkLink(_) => ResourceKind::VirtualNetworkLink,
            Self::RedisCache(_) => ResourceKind::RedisCache,
            Self::PrivateEndpoint(_) => ResourceKind::PrivateEndpoint,
            Self::PostgresServer(_) => ResourceKind::PostgresServer,
            Self::AppServicePlan(_) => ResourceKind::AppServicePlan,
            Self::WebApp(_) => ResourceKind::WebApp,
            Self::ManagedIdentity(_) => ResourceKind::ManagedIdentity,
        }
    }
}

/// Resource group declaration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceGroupDecl {
    /// Logical id.
    pub id: String,
    /// Physical name.
    #[serde(default)]
    pub name: Option<String>,
    /// Azure region.
    pub location: String,
}

/// Virtual network declaration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VirtualNetworkDecl {
    /// Logical id.
    pub id: String,
    /// Physical name.
    #[serde(default)]
    pub name: Option<String>,
    /// Owning resource group.
    pub resource_group: String,
    /// Region; defaults to the resource group's.
    #[serde(default)]
    pub location: Option<String>,
    /// CIDR blocks of the address space.
    pub address_prefixes: Vec<String>,
}

/// Subnet declaration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SubnetDecl {
    /// Logical id.
    pub id: String,
    /// Physical name.
    #[serde(default)]
    pub name: Option<String>,
    /// Owning resource group.
    pub resource_group: String,
    /// Parent virtual network.
    pub virtual_network: String,
    /// CIDR block of the subnet.
    pub address_prefix: String,
    /// Service delegations granted on the subnet.
    #[serde(default)]
    pub delegations: Vec<Delegation>,
}

/// A subnet service delegation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Delegation {
    /// Delegation name.
    pub name: String,
    /// Delegated service, e.g. `Microsoft.Web/serverFarms`.
    pub service: String,
}

/// Private DNS zone declaration. The physical name is the zone name.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PrivateDnsZoneDecl {
    /// Logical id.
    pub id: String,
    /// Zone name, e.g. `privatelink.redis.cache.windows.net`.
    #[serde(default)]
    pub name: Option<String>,
    /// Owning resource group.
    pub resource_group: String,
    /// Region; defaults to `global`.
    #[serde(default)]
    pub location: Option<String>,
}

/// Virtual network link declaration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VirtualNetworkLinkDecl {
    /// Logical id.
    pub id: String,
    /// Physical name.
    #[serde(default)]
    pub name: Option<String>,
    /// Owning resource group.
    pub resource_group: String,
    /// Region; defaults to `global`.
    #[serde(default)]
    pub location: Option<String>,
    /// Linked private DNS zone.
    pub zone: String,
    /// Linked virtual network.
    pub virtual_network: String,
    /// Whether VM records auto-register in the zone.
    #[serde(default)]
    pub registration_enabled: bool,
}

/// Redis cache SKU.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RedisSku {
    /// SKU name, e.g. `Standard`.
    pub name: String,
    /// SKU family, e.g. `C`.
    pub family: String,
    /// Cache size within the family.
    pub capacity: u32,
}

/// Redis cache declaration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RedisCacheDecl {
    /// Logical id.
    pub id: String,
    /// Physical name.
    #[serde(default)]
    pub name: Option<String>,
    /// Owning resource group.
    pub resource_group: String,
    /// Region; defaults to the resource group's.
    #[serde(default)]
    pub location: Option<String>,
    /// Pricing tier.
    pub sku: RedisSku,
}

fn default_group_ids() -> Vec<String> {
    vec!["redisCache".to_owned()]
}

fn default_connection_name() -> String {
    "redisConnection".to_owned()
}

/// Private endpoint declaration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PrivateEndpointDecl {
    /// Logical id.
    pub id: String,
    /// Physical name.
    #[serde(default)]
    pub name: Option<String>,
    /// Owning resource group.
    pub resource_group: String,
    /// Region; defaults to the resource group's.
    #[serde(default)]
    pub location: Option<String>,
    /// Subnet hosting the endpoint's network interface.
    pub subnet: String,
    /// Service exposed through the endpoint.
    pub service: String,
    /// Sub-resources of the service to expose.
    #[serde(default = "default_group_ids")]
    pub group_ids: Vec<String>,
    /// Name of the private link service connection.
    #[serde(default = "default_connection_name")]
    pub connection_name: String,
}

/// Enabled/disabled switch in provider casing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Toggle {
    /// Feature on.
    Enabled,
    /// Feature off.
    Disabled,
}

impl Toggle {
    /// Provider spelling of the switch.
    #[must_use]
    pub const fn as_provider(self) -> &'static str {
        match self {
            Self::Enabled => "Enabled",
            Self::Disabled => "Disabled",
        }
    }
}

/// PostgreSQL server SKU.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PostgresSku {
    /// SKU name, e.g. `Standard_B2ms`.
    pub name: String,
    /// Tier, e.g. `Burstable`.
    pub tier: String,
}

/// PostgreSQL authentication settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Password authentication.
    pub password_auth: Toggle,
    /// Microsoft Entra authentication.
    pub active_directory_auth: Toggle,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            password_auth: Toggle::Enabled,
            active_directory_auth: Toggle::Disabled,
        }
    }
}

const fn default_retention_days() -> u32 {
    7
}

const fn default_geo_redundant() -> Toggle {
    Toggle::Disabled
}

const fn default_storage_gb() -> u32 {
    32
}

/// PostgreSQL backup policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BackupConfig {
    /// Days backups are kept.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Geo-redundant backup storage.
    #[serde(default = "default_geo_redundant")]
    pub geo_redundant: Toggle,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            geo_redundant: default_geo_redundant(),
        }
    }
}

/// PostgreSQL flexible server declaration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PostgresServerDecl {
    /// Logical id.
    pub id: String,
    /// Physical name.
    #[serde(default)]
    pub name: Option<String>,
    /// Owning resource group.
    pub resource_group: String,
    /// Region; defaults to the resource group's.
    #[serde(default)]
    pub location: Option<String>,
    /// Compute SKU.
    pub sku: PostgresSku,
    /// Major server version.
    pub version: String,
    /// Administrator login name.
    #[serde(default)]
    pub administrator_login: Option<String>,
    /// Administrator password, always sourced from a secret.
    #[serde(default)]
    pub administrator_login_password: Option<SecretRef>,
    /// Authentication switches.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Storage size in GiB.
    #[serde(default = "default_storage_gb")]
    pub storage_gb: u32,
    /// Backup policy.
    #[serde(default)]
    pub backup: BackupConfig,
    /// Subnet delegated to the server.
    pub delegated_subnet: String,
    /// Private DNS zone resolving the server.
    pub private_dns_zone: String,
}

fn default_plan_kind() -> String {
    "linux".to_owned()
}

const fn default_capacity() -> u32 {
    1
}

/// App Service plan SKU.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PlanSku {
    /// SKU name, e.g. `B1`.
    pub name: String,
    /// Tier, e.g. `Basic`.
    pub tier: String,
    /// Worker count.
    #[serde(default = "default_capacity")]
    pub capacity: u32,
}

/// App Service plan declaration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppServicePlanDecl {
    /// Logical id.
    pub id: String,
    /// Physical name.
    #[serde(default)]
    pub name: Option<String>,
    /// Owning resource group.
    pub resource_group: String,
    /// Region; defaults to the resource group's.
    #[serde(default)]
    pub location: Option<String>,
    /// Plan kind, `linux` by default.
    #[serde(default = "default_plan_kind")]
    pub plan_kind: String,
    /// Linux plans must be reserved.
    #[serde(default = "default_true")]
    pub reserved: bool,
    /// Pricing tier.
    pub sku: PlanSku,
}

/// Value of a web app setting.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SettingValue {
    /// A secret from the `secrets` block.
    Secret(SecretRef),
    /// Text, possibly interpolating `${resource.attribute}` references.
    Text(String),
}

/// App Service web app declaration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebAppDecl {
    /// Logical id.
    pub id: String,
    /// Physical name.
    #[serde(default)]
    pub name: Option<String>,
    /// Owning resource group.
    pub resource_group: String,
    /// Region; defaults to the resource group's.
    #[serde(default)]
    pub location: Option<String>,
    /// Hosting plan.
    pub plan: String,
    /// Subnet used for regional virtual network integration.
    #[serde(default)]
    pub subnet: Option<String>,
    /// Runtime stack, e.g. `PYTHON|3.10`.
    #[serde(default)]
    pub linux_fx_version: Option<String>,
    /// Route all outbound traffic through the virtual network.
    #[serde(default)]
    pub vnet_route_all: bool,
    /// Application settings exposed as environment variables.
    #[serde(default)]
    pub app_settings: IndexMap<String, SettingValue>,
}

/// User-assigned managed identity declaration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ManagedIdentityDecl {
    /// Logical id.
    pub id: String,
    /// Physical name.
    #[serde(default)]
    pub name: Option<String>,
    /// Owning resource group.
    pub resource_group: String,
    /// Region; defaults to the resource group's.
    #[serde(default)]
    pub location: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn secret_sources_parse_both_forms() {
        let yaml = "a: { env: SECRET_KEY }\nb: { generate: { length: 12 } }\n";
        let parsed: IndexMap<String, SecretSource> =
            serde_saphyr::from_str(yaml).expect("parse secrets");
        assert_eq!(
            parsed.get("a"),
            Some(&SecretSource::Env("SECRET_KEY".into()))
        );
        let Some(SecretSource::Generate(spec)) = parsed.get("b") else {
            panic!("expected generated secret");
        };
        assert_eq!(spec.length, 12);
        assert!(spec.special);
        assert_eq!(spec.override_special, DJANGO_SECRET_SPECIALS);
    }

    #[rstest]
    #[case("plain text", SettingValue::Text("plain text".into()))]
    #[case(
        "{ secret: key }",
        SettingValue::Secret(SecretRef { secret: "key".into() })
    )]
    fn setting_values_are_untagged(#[case] yaml: &str, #[case] expected: SettingValue) {
        let parsed: SettingValue = serde_saphyr::from_str(yaml).expect("parse setting");
        assert_eq!(parsed, expected);
    }

    #[rstest]
    fn physical_name_defaults_to_id() {
        let decl = ResourceDecl::ManagedIdentity(ManagedIdentityDecl {
            id: "identity".into(),
            name: None,
            resource_group: "rg".into(),
            location: None,
        });
        assert_eq!(decl.physical_name(), "identity");
        assert_eq!(decl.kind(), ResourceKind::ManagedIdentity);
    }

    #[rstest]
    fn unknown_fields_are_rejected() {
        let yaml = "kind: resource_group\nid: rg\nlocation: x\ncolour: blue\n";
        let result: Result<ResourceDecl, _> = serde_saphyr::from_str(yaml);
        assert!(result.is_err(), "unexpected field should fail");
    }
}
