pub(crate) const YAML_HINTS: [(&str, &str); 5] = [
    (
        "did not find expected '-'",
        "Start list items such as `resources:` entries with '-' and indent them consistently.",
    ),
    (
        "expected ':'",
        "Ensure each key is followed by ':' separating key and value.",
    ),
    (
        "mapping values are not allowed",
        "Quote values containing ':' such as runtime strings like \"PYTHON|3.10\" or URLs.",
    ),
    (
        "found character that cannot start any token",
        "Quote values starting with '@', '`' or '%', and indent with spaces (no tabs).",
    ),
    (
        "unknown escape character",
        "Use valid YAML escape sequences or single-quote the string.",
    ),
];

pub(crate) const DATA_HINTS: [(&str, &str); 4] = [
    (
        "unknown variant",
        "Resource kinds are resource_group, virtual_network, subnet, private_dns_zone, \
         virtual_network_link, redis_cache, private_endpoint, postgres_server, \
         app_service_plan, web_app and managed_identity.",
    ),
    (
        "unknown field",
        "Each resource kind accepts a fixed set of fields; check the spelling against the kind.",
    ),
    (
        "missing field `kind`",
        "Every entry under `resources:` needs a `kind:`.",
    ),
    (
        "stack_version",
        "stack_version must be a semantic version such as \"1.0.0\".",
    ),
];
