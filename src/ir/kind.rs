//! Resource kinds and the attributes each kind exposes.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Resource kinds understood by the graph builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Azure resource group.
    ResourceGroup,
    /// Virtual network.
    VirtualNetwork,
    /// Subnet of a virtual network.
    Subnet,
    /// Private DNS zone.
    PrivateDnsZone,
    /// Link between a private DNS zone and a virtual network.
    VirtualNetworkLink,
    /// Azure Cache for Redis.
    RedisCache,
    /// Private endpoint.
    PrivateEndpoint,
    /// PostgreSQL flexible server.
    PostgresServer,
    /// App Service plan.
    AppServicePlan,
    /// App Service web app.
    WebApp,
    /// User-assigned managed identity.
    ManagedIdentity,
    /// Engine-generated random secret.
    RandomPassword,
}

use Attribute as A;

const COMMON: &[Attribute] = &[A::Name, A::Id, A::Location];
const REDIS: &[Attribute] = &[A::Name, A::Id, A::Location, A::HostName, A::Port, A::SslPort];
const POSTGRES: &[Attribute] = &[A::Name, A::Id, A::Location, A::FullyQualifiedDomainName];
const WEB_APP: &[Attribute] = &[A::Name, A::Id, A::Location, A::DefaultHostName];
const IDENTITY: &[Attribute] = &[
    A::Name,
    A::Id,
    A::Location,
    A::PrincipalId,
    A::ClientId,
    A::TenantId,
];
const SUBRESOURCE: &[Attribute] = &[A::Name, A::Id];
const RANDOM: &[Attribute] = &[A::Id, A::Result];

impl ResourceKind {
    /// Manifest spelling of the kind.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ResourceGroup => "resource_group",
            Self::VirtualNetwork => "virtual_network",
            Self::Subnet => "subnet",
            Self::PrivateDnsZone => "private_dns_zone",
            Self::VirtualNetworkLink => "virtual_network_link",
            Self::RedisCache => "redis_cache",
            Self::PrivateEndpoint => "private_endpoint",
            Self::PostgresServer => "postgres_server",
            Self::AppServicePlan => "app_service_plan",
            Self::WebApp => "web_app",
            Self::ManagedIdentity => "managed_identity",
            Self::RandomPassword => "random_password",
        }
    }

    /// Engine type token of the kind.
    #[must_use]
    pub const fn provider_type(self) -> &'static str {
        match self {
            Self::ResourceGroup => "azure-native:resources:ResourceGroup",
            Self::VirtualNetwork => "azure-native:network:VirtualNetwork",
            Self::Subnet => "azure-native:network:Subnet",
            Self::PrivateDnsZone => "azure-native:network:PrivateZone",
            Self::VirtualNetworkLink => "azure-native:network:VirtualNetworkLink",
            Self::RedisCache => "azure-native:cache:Redis",
            Self::PrivateEndpoint => "azure-native:network:PrivateEndpoint",
            Self::PostgresServer => "azure-native:dbforpostgresql:Server",
            Self::AppServicePlan => "azure-native:web:AppServicePlan",
            Self::WebApp => "azure-native:web:WebApp",
            Self::ManagedIdentity => "azure-native:managedidentity:UserAssignedIdentity",
            Self::RandomPassword => "random:RandomPassword",
        }
    }

    /// Provider property carrying the physical name.
    #[must_use]
    pub const fn name_property(self) -> Option<&'static str> {
        match self {
            Self::ResourceGroup => Some("resourceGroupName"),
            Self::VirtualNetwork => Some("virtualNetworkName"),
            Self::Subnet => Some("subnetName"),
            Self::PrivateDnsZone => Some("privateZoneName"),
            Self::VirtualNetworkLink => Some("virtualNetworkLinkName"),
            Self::RedisCache | Self::AppServicePlan | Self::WebApp => Some("name"),
            Self::PrivateEndpoint => Some("privateEndpointName"),
            Self::PostgresServer => Some("serverName"),
            Self::ManagedIdentity => Some("resourceName"),
            Self::RandomPassword => None,
        }
    }

    /// ARM resource type segment used to build resource ids.
    ///
    /// Subnets and links are nested under their parent, so their segment is
    /// relative to the parent id.
    #[must_use]
    pub const fn arm_type(self) -> Option<&'static str> {
        match self {
            Self::ResourceGroup | Self::RandomPassword => None,
            Self::VirtualNetwork => Some("Microsoft.Network/virtualNetworks"),
            Self::Subnet => Some("subnets"),
            Self::PrivateDnsZone => Some("Microsoft.Network/privateDnsZones"),
            Self::VirtualNetworkLink => Some("virtualNetworkLinks"),
            Self::RedisCache => Some("Microsoft.Cache/Redis"),
            Self::PrivateEndpoint => Some("Microsoft.Network/privateEndpoints"),
            Self::PostgresServer => Some("Microsoft.DBforPostgreSQL/flexibleServers"),
            Self::AppServicePlan => Some("Microsoft.Web/serverFarms"),
            Self::WebApp => Some("Microsoft.Web/sites"),
            Self::ManagedIdentity => Some("Microsoft.ManagedIdentity/userAssignedIdentities"),
        }
    }

    /// Attributes the engine reports for this kind.
    #[must_use]
    pub const fn attributes(self) -> &'static [Attribute] {
        match self {
            Self::RedisCache => REDIS,
            Self::PostgresServer => POSTGRES,
            Self::WebApp => WEB_APP,
            Self::ManagedIdentity => IDENTITY,
            Self::Subnet | Self::VirtualNetworkLink => SUBRESOURCE,
            Self::RandomPassword => RANDOM,
            Self::ResourceGroup
            | Self::VirtualNetwork
            | Self::PrivateDnsZone
            | Self::PrivateEndpoint
            | Self::AppServicePlan => COMMON,
        }
    }

    /// Whether `attribute` can be read from this kind.
    #[must_use]
    pub fn exposes(self, attribute: Attribute) -> bool {
        self.attributes().contains(&attribute)
    }

    /// Kinds whose physical name carries meaning and is never auto-generated.
    #[must_use]
    pub const fn requires_exact_name(self) -> bool {
        matches!(self, Self::PrivateDnsZone)
    }

    /// Kinds whose name is a public host label shared across all of Azure.
    #[must_use]
    pub const fn globally_named(self) -> bool {
        matches!(self, Self::RedisCache | Self::PostgresServer | Self::WebApp)
    }

    /// Default region when a declaration omits one and does not inherit it.
    #[must_use]
    pub const fn default_location(self) -> Option<&'static str> {
        match self {
            Self::PrivateDnsZone | Self::VirtualNetworkLink => Some("global"),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Attributes the engine resolves after a resource is provisioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Attribute {
    /// Physical name.
    Name,
    /// ARM resource id.
    Id,
    /// Region.
    Location,
    /// Redis host name.
    HostName,
    /// Redis non-TLS port.
    Port,
    /// Redis TLS port.
    SslPort,
    /// PostgreSQL server host name.
    FullyQualifiedDomainName,
    /// Web app public host name.
    DefaultHostName,
    /// Managed identity principal id.
    PrincipalId,
    /// Managed identity client id.
    ClientId,
    /// Managed identity tenant id.
    TenantId,
    /// Generated secret value.
    Result,
}

impl Attribute {
    /// Engine spelling of the attribute.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Id => "id",
            Self::Location => "location",
            Self::HostName => "hostName",
            Self::Port => "port",
            Self::SslPort => "sslPort",
            Self::FullyQualifiedDomainName => "fullyQualifiedDomainName",
            Self::DefaultHostName => "defaultHostName",
            Self::PrincipalId => "principalId",
            Self::ClientId => "clientId",
            Self::TenantId => "tenantId",
            Self::Result => "result",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when an attribute name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown attribute '{0}'")]
pub struct UnknownAttributeName(pub String);

impl FromStr for Attribute {
    type Err = UnknownAttributeName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const ALL: [Attribute; 12] = [
            A::Name,
            A::Id,
            A::Location,
            A::HostName,
            A::Port,
            A::SslPort,
            A::FullyQualifiedDomainName,
            A::DefaultHostName,
            A::PrincipalId,
            A::ClientId,
            A::TenantId,
            A::Result,
        ];
        ALL.into_iter()
            .find(|attr| attr.as_str() == s)
            .ok_or_else(|| UnknownAttributeName(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("hostName", Attribute::HostName)]
    #[case("defaultHostName", Attribute::DefaultHostName)]
    #[case("result", Attribute::Result)]
    fn attribute_names_round_trip(#[case] text: &str, #[case] attr: Attribute) {
        assert_eq!(text.parse::<Attribute>(), Ok(attr));
        assert_eq!(attr.to_string(), text);
    }

    #[rstest]
    fn unknown_attribute_is_rejected() {
        assert_eq!(
            "hostname".parse::<Attribute>(),
            Err(UnknownAttributeName("hostname".into()))
        );
    }

    #[rstest]
    #[case(ResourceKind::RedisCache, Attribute::HostName, true)]
    #[case(ResourceKind::PostgresServer, Attribute::HostName, false)]
    #[case(ResourceKind::WebApp, Attribute::DefaultHostName, true)]
    #[case(ResourceKind::Subnet, Attribute::Location, false)]
    #[case(ResourceKind::RandomPassword, Attribute::Name, false)]
    fn kinds_expose_their_attributes(
        #[case] kind: ResourceKind,
        #[case] attr: Attribute,
        #[case] expected: bool,
    ) {
        assert_eq!(kind.exposes(attr), expected);
    }
}
