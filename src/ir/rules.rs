//! Stack rules checked once the graph is built.
//!
//! Every rule runs to completion so that a single report lists all
//! violations. References are already known to resolve when these run.

use std::collections::HashMap;

use crate::ast::{
    POSTGRES_DELEGATION, PostgresServerDecl, ResourceDecl, StackManifest, SubnetDecl, Toggle,
    WEB_DELEGATION,
};

use super::graph::{ResourceGraph, Violation};
use super::kind::ResourceKind;

/// Zone suffix a PostgreSQL flexible server's private DNS zone must carry.
pub(crate) const POSTGRES_ZONE_SUFFIX: &str = ".postgres.database.azure.com";

pub(crate) fn check(manifest: &StackManifest, graph: &ResourceGraph) -> Vec<Violation> {
    let subnets: HashMap<&str, &SubnetDecl> = manifest
        .resources
        .iter()
        .filter_map(|decl| match decl {
            ResourceDecl::Subnet(subnet) => Some((subnet.id.as_str(), subnet)),
            _ => None,
        })
        .collect();
    let mut violations = Vec::new();
    for decl in &manifest.resources {
        match decl {
            ResourceDecl::PostgresServer(server) => {
                violations.extend(check_delegation(
                    &subnets,
                    &server.id,
                    &server.delegated_subnet,
                    POSTGRES_DELEGATION,
                ));
                check_credentials(server, &mut violations);
                check_zone_suffix(manifest, &server.private_dns_zone, &mut violations);
            }
            ResourceDecl::WebApp(app) => {
                if let Some(subnet) = &app.subnet {
                    violations.extend(check_delegation(&subnets, &app.id, subnet, WEB_DELEGATION));
                }
            }
            ResourceDecl::PrivateEndpoint(endpoint) => {
                if subnets
                    .get(endpoint.subnet.as_str())
                    .is_some_and(|subnet| !subnet.delegations.is_empty())
                {
                    violations.push(Violation::DelegatedEndpointSubnet {
                        endpoint: endpoint.id.clone(),
                        subnet: endpoint.subnet.clone(),
                    });
                }
            }
            _ => {}
        }
    }
    check_duplicate_names(manifest, graph, &mut violations);
    violations
}

fn check_delegation(
    subnets: &HashMap<&str, &SubnetDecl>,
    consumer: &str,
    subnet_id: &str,
    expected: &'static str,
) -> Option<Violation> {
    let subnet = subnets.get(subnet_id)?;
    match subnet.delegations.as_slice() {
        [only] if only.service == expected => None,
        delegations => Some(Violation::DelegationMismatch {
            subnet: subnet_id.to_owned(),
            consumer: consumer.to_owned(),
            expected,
            found: delegations.iter().map(|d| d.service.clone()).collect(),
        }),
    }
}

fn check_credentials(server: &PostgresServerDecl, violations: &mut Vec<Violation>) {
    let has_password = server.administrator_login_password.is_some();
    match server.auth.password_auth {
        Toggle::Disabled if has_password => violations.push(Violation::PasswordAuthConflict {
            server: server.id.clone(),
        }),
        Toggle::Disabled => {}
        Toggle::Enabled => {
            if server.administrator_login.is_none() {
                violations.push(Violation::MissingCredential {
                    server: server.id.clone(),
                    field: "administrator_login",
                });
            }
            if !has_password {
                violations.push(Violation::MissingCredential {
                    server: server.id.clone(),
                    field: "administrator_login_password",
                });
            }
        }
    }
}

fn check_zone_suffix(manifest: &StackManifest, zone_id: &str, violations: &mut Vec<Violation>) {
    let Some(zone) = manifest.resources.iter().find(|decl| {
        decl.kind() == ResourceKind::PrivateDnsZone && decl.id() == zone_id
    }) else {
        return;
    };
    let name = zone.physical_name();
    if !name.ends_with(POSTGRES_ZONE_SUFFIX) {
        violations.push(Violation::DnsZoneSuffix {
            zone: zone_id.to_owned(),
            name: name.to_owned(),
            suffix: POSTGRES_ZONE_SUFFIX,
        });
    }
}

/// Flag declarations of one kind sharing a physical name in one scope.
///
/// Caches, servers and web apps share one namespace across resource groups;
/// everything else is scoped by its parent. Declared names are compared under
/// either naming strategy.
fn check_duplicate_names(
    manifest: &StackManifest,
    graph: &ResourceGraph,
    violations: &mut Vec<Violation>,
) {
    let mut seen: HashMap<(ResourceKind, Option<&str>, &str), &str> = HashMap::new();
    for decl in &manifest.resources {
        if graph.node(decl.id()).is_none() {
            continue;
        }
        let kind = decl.kind();
        let scope = if kind.globally_named() {
            None
        } else {
            decl.parent()
        };
        let key = (kind, scope, decl.physical_name());
        if let Some(first) = seen.get(&key) {
            violations.push(Violation::DuplicateName {
                kind,
                name: decl.physical_name().to_owned(),
                first: (*first).to_owned(),
                second: decl.id().to_owned(),
            });
        } else {
            seen.insert(key, decl.id());
        }
    }
}
