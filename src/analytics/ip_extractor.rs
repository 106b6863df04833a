//! Client IP extraction from HTTP headers with trust validation
//!
//! This module implements client IP extraction that:
//! - Honors Forwarded / X-Forwarded-For only when a proxy mode trusts them
//! - Supports vendor-specific headers (e.g., CF-Connecting-IP)
//! - Falls back to the socket remote address, then to a raw X-Forwarded-For
//!   entry when no socket address is known
//! - Canonicalizes IPv4-mapped IPv6 addresses

use axum::http::HeaderMap;
use std::net::{IpAddr, Ipv4Addr};
use tracing::warn;

use crate::config::{ClientIpConfig, TrustedProxyMode};

/// Public address that replaces loopback clients so local development still
/// exercises a real geolocation lookup
pub const LOOPBACK_SUBSTITUTE: IpAddr = IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8));

/// Extract the client IP address for a request
///
/// # Arguments
/// * `headers` - HTTP request headers
/// * `socket_addr` - The socket remote address, if the server recorded one
/// * `config` - Trusted proxy settings
///
/// # Returns
/// The client IP address, or `None` when neither headers nor the socket
/// provide one
pub fn extract_client_ip(
    headers: &HeaderMap,
    socket_addr: Option<IpAddr>,
    config: &ClientIpConfig,
) -> Option<IpAddr> {
    let trusted = match config.trusted_proxy_mode {
        TrustedProxyMode::Cloudflare => {
            let ip = extract_cloudflare_ip(headers);
            if ip.is_none() {
                warn!("CF-Connecting-IP header missing in Cloudflare mode, using socket address");
            }
            ip
        }
        TrustedProxyMode::Standard => extract_standard_ip(headers, config),
        TrustedProxyMode::None => None,
    };

    trusted
        .or(socket_addr)
        .or_else(|| leftmost_forwarded_for(headers))
        .map(|ip| ip.to_canonical())
}

/// Replace loopback addresses with [`LOOPBACK_SUBSTITUTE`]
pub fn substitute_loopback(ip: IpAddr) -> IpAddr {
    if ip.to_canonical().is_loopback() {
        LOOPBACK_SUBSTITUTE
    } else {
        ip
    }
}

/// Extract IP from Cloudflare-specific header
fn extract_cloudflare_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("cf-connecting-ip")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
}

/// Extract IP from standard headers (Forwarded, X-Forwarded-For) with trust validation
fn extract_standard_ip(headers: &HeaderMap, config: &ClientIpConfig) -> Option<IpAddr> {
    // Prefer RFC 7239 Forwarded header
    if let Some(ip) = extract_from_forwarded(headers) {
        return Some(ip);
    }

    extract_from_x_forwarded_for(headers, config)
}

/// Parse RFC 7239 Forwarded header, returning the first `for=` node
fn extract_from_forwarded(headers: &HeaderMap) -> Option<IpAddr> {
    let forwarded = headers.get("forwarded")?.to_str().ok()?;

    forwarded
        .split(',')
        .flat_map(|element| element.split(';'))
        .filter_map(|param| {
            let param = param.trim();
            let (key, value) = param.split_once('=')?;
            key.eq_ignore_ascii_case("for").then_some(value)
        })
        .find_map(parse_forwarded_node)
}

/// Parse a Forwarded node: `192.0.2.60`, `192.0.2.60:8080`, `"[2001:db8::1]:4711"`
fn parse_forwarded_node(value: &str) -> Option<IpAddr> {
    let value = value.trim().trim_matches('"');

    if let Some(rest) = value.strip_prefix('[') {
        return rest.split(']').next()?.parse().ok();
    }

    value
        .parse::<IpAddr>()
        .ok()
        .or_else(|| value.split(':').next()?.parse().ok())
}

/// Parse X-Forwarded-For header with right-to-left trust validation
fn extract_from_x_forwarded_for(headers: &HeaderMap, config: &ClientIpConfig) -> Option<IpAddr> {
    let ips = forwarded_for_chain(headers);

    if ips.is_empty() {
        return None;
    }

    // If num_trusted_proxies is specified, skip that many from the right
    if let Some(num_trusted) = config.num_trusted_proxies {
        if ips.len() > num_trusted {
            return Some(ips[ips.len() - num_trusted - 1]);
        }
        // Not enough IPs in chain, return the leftmost (least trusted)
        return ips.first().copied();
    }

    // Walk from the right past every hop inside a trusted network
    if !config.trusted_proxies.is_empty() {
        return ips
            .iter()
            .rev()
            .find(|ip| !config.trusted_proxies.iter().any(|net| net.contains(*ip)))
            .or_else(|| ips.first())
            .copied();
    }

    // No trust configuration, return the rightmost IP
    ips.last().copied()
}

/// Leftmost X-Forwarded-For entry, used only when the socket address is unknown
fn leftmost_forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    forwarded_for_chain(headers).first().copied()
}

fn forwarded_for_chain(headers: &HeaderMap) -> Vec<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .map(|xff| {
            xff.split(',')
                .filter_map(|s| s.trim().parse::<IpAddr>().ok())
                .collect()
        })
        .unwrap_or_default()
}
