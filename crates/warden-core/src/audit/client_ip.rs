//! Best-effort caller IP extraction.

use crate::context::CallContext;
use std::net::{IpAddr, SocketAddr};

/// Proxy headers consulted in order before the direct remote address.
pub const PROXY_HEADERS: &[&str] = &[
    "x-forwarded-for",
    "proxy-client-ip",
    "wl-proxy-client-ip",
    "http_client_ip",
    "http_x_forwarded_for",
];

const LOOPBACK_V4: &str = "127.0.0.1";

/// Returns the caller IP for `ctx`, or `None` when nothing usable is present.
///
/// The first header carrying a usable value wins; for comma-separated lists
/// only the first entry is kept. Blank entries and the literal `unknown` are
/// skipped.
pub fn client_ip(ctx: &CallContext) -> Option<String> {
    for name in PROXY_HEADERS {
        if let Some(ip) = ctx.header(name).and_then(first_entry) {
            return Some(normalize(ip));
        }
    }
    ctx.remote_addr()
        .and_then(first_entry)
        .map(|addr| normalize(strip_port(addr)))
}

fn first_entry(value: &str) -> Option<&str> {
    let first = value.split(',').next()?.trim();
    if first.is_empty() || first.eq_ignore_ascii_case("unknown") {
        None
    } else {
        Some(first)
    }
}

fn strip_port(addr: &str) -> &str {
    match addr.parse::<SocketAddr>() {
        Ok(_) => match addr.rfind(':') {
            Some(idx) => addr[..idx].trim_start_matches('[').trim_end_matches(']'),
            None => addr,
        },
        Err(_) => addr,
    }
}

fn normalize(ip: &str) -> String {
    match ip.parse::<IpAddr>() {
        Ok(IpAddr::V6(v6)) if v6.is_loopback() => LOOPBACK_V4.to_string(),
        _ => ip.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwarded_for_list_uses_first_entry() {
        let ctx = CallContext::new()
            .with_header("X-Forwarded-For", "203.0.113.5, 10.0.0.1")
            .with_remote_addr("10.0.0.1:443");
        assert_eq!(client_ip(&ctx).as_deref(), Some("203.0.113.5"));
    }

    #[test]
    fn unknown_header_falls_through() {
        let ctx = CallContext::new()
            .with_header("X-Forwarded-For", "unknown")
            .with_header("Proxy-Client-IP", "198.51.100.7");
        assert_eq!(client_ip(&ctx).as_deref(), Some("198.51.100.7"));
    }

    #[test]
    fn header_precedence_follows_chain() {
        let ctx = CallContext::new()
            .with_header("HTTP_X_FORWARDED_FOR", "192.0.2.9")
            .with_header("WL-Proxy-Client-IP", "192.0.2.1");
        assert_eq!(client_ip(&ctx).as_deref(), Some("192.0.2.1"));
    }

    #[test]
    fn remote_addr_port_is_stripped() {
        let ctx = CallContext::new().with_remote_addr("192.0.2.44:51234");
        assert_eq!(client_ip(&ctx).as_deref(), Some("192.0.2.44"));
    }

    #[test]
    fn ipv6_loopback_normalized() {
        for addr in ["0:0:0:0:0:0:0:1", "::1", "[::1]:8080"] {
            let ctx = CallContext::new().with_remote_addr(addr);
            assert_eq!(client_ip(&ctx).as_deref(), Some("127.0.0.1"), "{addr}");
        }
    }

    #[test]
    fn nothing_usable_yields_none() {
        let ctx = CallContext::new().with_header("X-Forwarded-For", " , ");
        assert_eq!(client_ip(&ctx), None);
    }
}
