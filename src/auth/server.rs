//! Server identity naming and endpoint helpers.

/// Primary hosted server identity.
pub const PRIMARY_DOMAIN: &str = "juliahub.com";
/// Brand token recognised inside custom hostnames.
pub(crate) const BRAND_TOKEN: &str = "juliahub";
/// Auth subdomain used by the primary server's issuer.
const PRIMARY_AUTH_HOST: &str = "auth.juliahub.com";

/// Normalize user or protocol input into a server identity.
///
/// `https://acme.juliahub.com/` and `ACME.juliahub.com` both become
/// `acme.juliahub.com`; a bare tenant label expands under the primary domain.
pub fn normalize_server(input: &str) -> String {
    let mut value = input.trim().to_ascii_lowercase();
    if let Some((_, rest)) = value.split_once("://") {
        value = rest.to_string();
    }
    if let Some((host, _)) = value.split_once('/') {
        value = host.to_string();
    }
    let value = value.trim_end_matches('.');
    if value.is_empty() {
        return PRIMARY_DOMAIN.to_string();
    }
    if value.contains('.') {
        return value.to_string();
    }
    if value == BRAND_TOKEN {
        return PRIMARY_DOMAIN.to_string();
    }
    format!("{value}.{PRIMARY_DOMAIN}")
}

/// Host serving the issuer endpoints for `server`.
pub fn auth_host(server: &str) -> &str {
    if server == PRIMARY_DOMAIN {
        PRIMARY_AUTH_HOST
    } else {
        server
    }
}

pub fn device_code_url(server: &str) -> String {
    format!("https://{}/dex/device/code", auth_host(server))
}

pub fn token_url(server: &str) -> String {
    format!("https://{}/dex/token", auth_host(server))
}

/// True when a credential request for `host` belongs to this CLI.
///
/// Matches the primary domain and its subdomains, any host carrying the
/// brand token, and the configured custom server.
pub fn is_known_host(host: &str, configured_server: Option<&str>) -> bool {
    let host = strip_port(host.trim()).trim_end_matches('.').to_ascii_lowercase();
    if host.is_empty() {
        return false;
    }
    if host == PRIMARY_DOMAIN || host.ends_with(&format!(".{PRIMARY_DOMAIN}")) {
        return true;
    }
    if host.contains(BRAND_TOKEN) {
        return true;
    }
    configured_server
        .map(|server| server.trim().to_ascii_lowercase())
        .is_some_and(|server| !server.is_empty() && server == host)
}

pub(crate) fn strip_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    }
}
