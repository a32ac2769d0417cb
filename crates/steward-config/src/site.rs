//! Site-address analysis for block labels.

use serde::{Deserialize, Serialize};

/// Structured view of one site label from a block header, e.g.
/// `https://example.com:8443` or `[::1]:2019` or `:8080`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteAddress {
    pub raw: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub scheme: Option<String>,
    pub is_ipv6: bool,
    pub is_wildcard: bool,
}

impl SiteAddress {
    /// Analyze a raw site label. This never fails: labels that do not look
    /// like addresses simply keep everything in `host`.
    pub fn parse(raw: &str) -> SiteAddress {
        let mut scheme = None;
        let mut host_port = raw;
        if let Some((prefix, rest)) = raw.split_once("://") {
            scheme = Some(prefix.to_string());
            host_port = rest;
        }

        let mut host: Option<String> = None;
        let mut port: Option<u16> = None;
        let mut is_ipv6 = false;

        if let Some(stripped) = host_port.strip_prefix('[') {
            match stripped.find(']') {
                Some(end) => {
                    host = Some(stripped[..end].to_string());
                    is_ipv6 = true;
                    if let Some(port_text) = stripped[end + 1..].strip_prefix(':') {
                        port = port_text.parse().ok();
                    }
                }
                None => host = Some(host_port.to_string()),
            }
        } else if let Some((maybe_host, maybe_port)) = host_port.rsplit_once(':') {
            match parse_port(maybe_port) {
                Some(parsed) => {
                    host = (!maybe_host.is_empty()).then(|| maybe_host.to_string());
                    port = Some(parsed);
                }
                None => host = Some(host_port.to_string()),
            }
        } else if !host_port.is_empty() {
            host = Some(host_port.to_string());
        }

        let is_wildcard = host.as_deref().is_some_and(|value| value.contains('*'));

        SiteAddress {
            raw: raw.to_string(),
            host,
            port,
            scheme,
            is_ipv6,
            is_wildcard,
        }
    }
}

fn parse_port(text: &str) -> Option<u16> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("example.com", Some("example.com"), None, None)]
    #[case("https://example.com:8443", Some("example.com"), Some(8443), Some("https"))]
    #[case(":8080", None, Some(8080), None)]
    #[case("http://:80", None, Some(80), Some("http"))]
    #[case("example.com:foo", Some("example.com:foo"), None, None)]
    fn parses_host_port_scheme(
        #[case] raw: &str,
        #[case] host: Option<&str>,
        #[case] port: Option<u16>,
        #[case] scheme: Option<&str>,
    ) {
        let site = SiteAddress::parse(raw);
        assert_eq!(site.host.as_deref(), host);
        assert_eq!(site.port, port);
        assert_eq!(site.scheme.as_deref(), scheme);
        assert_eq!(site.raw, raw);
    }

    #[test]
    fn ipv6_with_port() {
        let site = SiteAddress::parse("[::1]:2019");
        assert!(site.is_ipv6);
        assert_eq!(site.host.as_deref(), Some("::1"));
        assert_eq!(site.port, Some(2019));
    }

    #[test]
    fn wildcard_host_is_flagged() {
        let site = SiteAddress::parse("*.example.com");
        assert!(site.is_wildcard);
        assert_eq!(site.host.as_deref(), Some("*.example.com"));
    }

    #[test]
    fn out_of_range_port_stays_in_host() {
        let site = SiteAddress::parse("example.com:99999");
        assert_eq!(site.host.as_deref(), Some("example.com:99999"));
        assert_eq!(site.port, None);
    }
}
