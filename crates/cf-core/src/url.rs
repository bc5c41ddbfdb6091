//! Fast URL helpers for resource attributes
//!
//! These functions avoid allocations and work directly on string slices.
//! They only need to answer one question for the party classifier: which
//! host, if any, does an attribute value point at.

// =============================================================================
// Scheme Handling
// =============================================================================

/// Get the position after "://", or after "//" for protocol-relative URLs.
#[inline]
pub fn get_authority_start(url: &str) -> Option<usize> {
    let bytes = url.as_bytes();

    if bytes.starts_with(b"//") {
        return Some(2);
    }

    let colon_pos = bytes.iter().position(|&b| b == b':')?;

    // The scheme must be a plain token; a ':' after a '/' or '?' is part of
    // a relative reference.
    if colon_pos == 0
        || !bytes[..colon_pos]
            .iter()
            .all(|&b| b.is_ascii_alphanumeric() || b == b'+' || b == b'-' || b == b'.')
    {
        return None;
    }

    if bytes.len() > colon_pos + 2 && bytes[colon_pos + 1] == b'/' && bytes[colon_pos + 2] == b'/' {
        return Some(colon_pos + 3);
    }

    None
}

/// True for values that resolve against the page itself: paths, queries,
/// fragments and relative references whose first segment is not a host.
/// `ads.example.net/a.js` and `cdn.example.com:8080` name a host and are not
/// relative.
#[inline]
pub fn is_relative_reference(url: &str) -> bool {
    let trimmed = url.trim_start();
    if trimmed.starts_with("//") {
        return false;
    }
    if trimmed.starts_with(['/', '?', '#', '.']) {
        return true;
    }
    !has_scheme(trimmed) && !starts_with_host(trimmed)
}

/// True when the segment before the first `/`, `?` or `#` reads as a
/// dotted `host[:port]`.
#[inline]
pub fn starts_with_host(url: &str) -> bool {
    let segment = url.split(['/', '?', '#']).next().unwrap_or("");
    let (host, port) = match segment.split_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (segment, None),
    };

    if let Some(port) = port {
        if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
    }

    if host.parse::<std::net::Ipv4Addr>().is_ok() {
        return true;
    }

    let labels_ok = host
        .split('.')
        .all(|label| !label.is_empty() && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-'));
    let tld_ok = host
        .rsplit_once('.')
        .is_some_and(|(_, tld)| tld.bytes().any(|b| b.is_ascii_alphabetic()));
    labels_ok && tld_ok
}

/// True when the value starts with `scheme:`.
#[inline]
pub fn has_scheme(url: &str) -> bool {
    let bytes = url.as_bytes();
    match bytes.iter().position(|&b| b == b':') {
        Some(pos) if pos > 0 => {
            bytes[0].is_ascii_alphabetic()
                && bytes[..pos]
                    .iter()
                    .all(|&b| b.is_ascii_alphanumeric() || b == b'+' || b == b'-' || b == b'.')
        }
        _ => false,
    }
}

// =============================================================================
// Host Extraction
// =============================================================================

/// Get the start and end positions of the hostname in a URL.
#[inline]
pub fn get_host_position(url: &str) -> Option<(usize, usize)> {
    let authority_start = get_authority_start(url)?;
    let bytes = url.as_bytes();

    // Find authority end
    let mut authority_end = bytes.len();
    for (i, &b) in bytes[authority_start..].iter().enumerate() {
        if b == b'/' || b == b'?' || b == b'#' || b == b'\\' {
            authority_end = authority_start + i;
            break;
        }
    }

    // Skip userinfo
    let host_start = match bytes[authority_start..authority_end].iter().rposition(|&b| b == b'@') {
        Some(at) => authority_start + at + 1,
        None => authority_start,
    };

    let host_end = host_end_in(&bytes[host_start..authority_end]) + host_start;
    Some((host_start, host_end))
}

/// End of the host within an authority, stripping a port and keeping
/// bracketed IPv6 literals whole.
fn host_end_in(authority: &[u8]) -> usize {
    if authority.first() == Some(&b'[') {
        return match authority.iter().position(|&b| b == b']') {
            Some(close) => close + 1,
            None => authority.len(),
        };
    }
    authority.iter().position(|&b| b == b':').unwrap_or(authority.len())
}

/// Fast host extraction without allocations.
/// Returns a slice into the original URL, or `None` when the URL has no
/// authority (relative references, `data:`, `about:`, `javascript:`).
#[inline]
pub fn extract_host(url: &str) -> Option<&str> {
    let (host_start, host_end) = get_host_position(url)?;
    let host = &url[host_start..host_end];
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

/// Host of a `host[:port]` string such as `location.host`.
#[inline]
pub fn strip_port(host_with_port: &str) -> &str {
    let end = host_end_in(host_with_port.as_bytes());
    &host_with_port[..end]
}
