//! Outbound URL checks applied before any verification request.

use std::net::{Ipv4Addr, Ipv6Addr};

use url::{Host, Url};

/// Parses `raw` and accepts it only when it is an `http(s)` URL whose host is
/// public. Private, loopback, link-local and unspecified addresses are
/// rejected unless `allow_private_hosts` is set.
#[must_use]
pub fn validate_url(raw: &str, allow_private_hosts: bool) -> Option<Url> {
    let url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let host = url.host()?;
    if !allow_private_hosts && is_private_host(&host) {
        return None;
    }
    Some(url)
}

pub(crate) fn is_private_host<S: AsRef<str>>(host: &Host<S>) -> bool {
    match host {
        Host::Domain(domain) => {
            let domain = domain.as_ref().trim_end_matches('.').to_lowercase();
            domain == "localhost" || domain.ends_with(".localhost")
        }
        Host::Ipv4(ip) => is_private_v4(*ip),
        Host::Ipv6(ip) => is_private_v6(*ip),
    }
}

fn is_private_v4(ip: Ipv4Addr) -> bool {
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.octets()[0] == 0
}

fn is_private_v6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_private_v4(v4);
    }
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        // fe80::/10
        || (first & 0xffc0) == 0xfe80
        // fc00::/7
        || (first & 0xfe00) == 0xfc00
}
