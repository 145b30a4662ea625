use std::net::{IpAddr, SocketAddr};

use remitdesk_core::TenantId;

/// Resolves the client address for rate limiting.
///
/// Prefers the first `X-Forwarded-For` entry, then `X-Real-IP`, then the
/// connection address with its port stripped.
#[must_use]
pub fn client_ip(
    forwarded_for: Option<&str>,
    real_ip: Option<&str>,
    remote_address: Option<&str>,
) -> String {
    let forwarded = forwarded_for
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if let Some(address) = forwarded {
        return address.to_owned();
    }

    let real_ip = real_ip.map(str::trim).filter(|value| !value.is_empty());
    if let Some(address) = real_ip {
        return address.to_owned();
    }

    remote_address
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map_or_else(|| "unknown".to_owned(), strip_port)
}

fn strip_port(address: &str) -> String {
    if let Ok(socket_address) = address.parse::<SocketAddr>() {
        return socket_address.ip().to_string();
    }

    if let Ok(ip_address) = address.parse::<IpAddr>() {
        return ip_address.to_string();
    }

    match address.rsplit_once(':') {
        Some((host, port))
            if !host.is_empty()
                && !host.contains(':')
                && !port.is_empty()
                && port.chars().all(|ch| ch.is_ascii_digit()) =>
        {
            host.to_owned()
        }
        _ => address.to_owned(),
    }
}

/// Identifier for per-IP budgets.
#[must_use]
pub fn ip_identifier(ip: &str) -> String {
    format!("ip_{ip}")
}

/// Identifier for per-user budgets.
#[must_use]
pub fn user_identifier(subject: &str) -> String {
    format!("user_{subject}")
}

/// Identifier for per-tenant budgets.
#[must_use]
pub fn tenant_identifier(tenant_id: TenantId) -> String {
    format!("tenant_{tenant_id}")
}

/// Identifier for sensitive routes: the user when authenticated, else the IP.
#[must_use]
pub fn sensitive_identifier(subject: Option<&str>, ip: &str) -> String {
    match subject {
        Some(subject) => format!("sensitive_user_{subject}"),
        None => ip_identifier(ip),
    }
}
