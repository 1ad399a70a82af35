//! Outbound URL validation
//!
//! Every fetch target passes through here before the browser touches it.
//! Rejects non-http schemes, localhost, hosts outside the configured
//! allowlist, and anything that resolves to a private or link-local address,
//! so the tracker cannot be pointed at internal networks.

use std::collections::HashSet;
use std::net::IpAddr;
use thiserror::Error;
use url::{Host, Url};

/// Validation failure, mapped to a stable kind string for diagnostics and
/// the edit API
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
    #[error("URL does not parse")]
    InvalidUrl,
    #[error("only http and https schemes are allowed")]
    SchemeForbidden,
    #[error("localhost targets are refused")]
    LocalhostRefused,
    #[error("host is not on the fetch allowlist")]
    NotAllowlisted,
    #[error("DNS resolution failed")]
    DnsFailed,
    #[error("DNS resolution returned no records")]
    NoRecords,
    #[error("host resolves to a private or link-local address")]
    PrivateDestination,
}

impl GuardError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidUrl => "url_invalid",
            Self::SchemeForbidden => "scheme_forbidden",
            Self::LocalhostRefused => "localhost_refused",
            Self::NotAllowlisted => "not_allowlisted",
            Self::DnsFailed => "dns_failed",
            Self::NoRecords => "no_records",
            Self::PrivateDestination => "private_destination",
        }
    }
}

/// Outbound URL guard with an optional hostname allowlist
#[derive(Debug, Clone, Default)]
pub struct UrlGuard {
    allowed_hosts: HashSet<String>,
}

impl UrlGuard {
    /// Create a guard; an empty allowlist permits any public host.
    pub fn new<I, S>(allowed_hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed_hosts: allowed_hosts
                .into_iter()
                .map(|h| h.as_ref().trim().to_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    /// Validate a raw URL string, resolving its host.
    pub async fn validate(&self, raw: &str) -> Result<Url, GuardError> {
        let url = Url::parse(raw).map_err(|_| GuardError::InvalidUrl)?;

        match url.scheme() {
            "http" | "https" => {}
            _ => return Err(GuardError::SchemeForbidden),
        }

        let host = url.host().ok_or(GuardError::InvalidUrl)?;

        match host {
            Host::Domain(domain) => {
                let domain = domain.to_lowercase();
                if domain == "localhost" || domain.ends_with(".localhost") {
                    return Err(GuardError::LocalhostRefused);
                }
                if !self.allowed_hosts.is_empty() && !self.allowed_hosts.contains(&domain) {
                    return Err(GuardError::NotAllowlisted);
                }
                let port = url.port_or_known_default().unwrap_or(443);
                let addrs: Vec<IpAddr> = tokio::net::lookup_host((domain.as_str(), port))
                    .await
                    .map_err(|_| GuardError::DnsFailed)?
                    .map(|sa| sa.ip())
                    .collect();
                if addrs.is_empty() {
                    return Err(GuardError::NoRecords);
                }
                if addrs.iter().any(|ip| is_private_destination(*ip)) {
                    return Err(GuardError::PrivateDestination);
                }
            }
            Host::Ipv4(ip) => {
                if !self.allowed_hosts.is_empty() && !self.allowed_hosts.contains(&ip.to_string())
                {
                    return Err(GuardError::NotAllowlisted);
                }
                if is_private_destination(IpAddr::V4(ip)) {
                    return Err(GuardError::PrivateDestination);
                }
            }
            Host::Ipv6(ip) => {
                if !self.allowed_hosts.is_empty() && !self.allowed_hosts.contains(&ip.to_string())
                {
                    return Err(GuardError::NotAllowlisted);
                }
                if is_private_destination(IpAddr::V6(ip)) {
                    return Err(GuardError::PrivateDestination);
                }
            }
        }

        Ok(url)
    }
}

/// Addresses the tracker must never connect to: loopback, unspecified,
/// link-local, RFC1918, and IPv6 ULA. IPv4-mapped IPv6 addresses are
/// unwrapped and checked as IPv4.
pub fn is_private_destination(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let o = v4.octets();
            v4.is_loopback()
                || v4.is_unspecified()
                || v4.is_link_local()
                || o[0] == 10
                || (o[0] == 172 && (16..=31).contains(&o[1]))
                || (o[0] == 192 && o[1] == 168)
        }
        IpAddr::V6(v6) => {
            if let Some(v4) = v6.to_ipv4_mapped() {
                return is_private_destination(IpAddr::V4(v4));
            }
            let seg = v6.segments();
            v6.is_loopback()
                || v6.is_unspecified()
                // fe80::/10
                || (seg[0] & 0xffc0) == 0xfe80
                // fc00::/7 (unique local)
                || (seg[0] & 0xfe00) == 0xfc00
        }
    }
}
