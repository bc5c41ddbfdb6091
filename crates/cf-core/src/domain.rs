//! Registrable-domain parsing with memoization
//!
//! Splits a host into subdomain, domain label and public suffix. Uses a
//! loaded Public Suffix List when one is available and a small built-in
//! heuristic otherwise. Results are cached per raw input because the party
//! classifier parses the same hosts over and over.
//!
//! # Examples
//!
//! ```
//! use cf_core::domain::DomainParser;
//!
//! let mut parser = DomainParser::new(64);
//! let parsed = parser.parse("https://news.example.co.uk/a").unwrap();
//! assert_eq!(parsed.domain, "example");
//! assert_eq!(parsed.tld, "co.uk");
//! ```

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;

use publicsuffix::{List, Psl};

use crate::error::ConfigError;
use crate::url::{extract_host, has_scheme, strip_port};

// =============================================================================
// LRU Cache
// =============================================================================

/// Simple fixed-size cache.
/// Uses a basic LRU strategy with a hashmap + deque.
pub struct LruCache<V> {
    capacity: usize,
    entries: HashMap<String, V>,
    order: VecDeque<String>,
}

impl<V: Clone> LruCache<V> {
    /// Create a new LRU cache with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    /// Get a value from the cache.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let value = self.entries.get(key)?.clone();
        // Move to back (most recently used)
        if self.order.back().map(String::as_str) != Some(key) {
            if let Some(pos) = self.order.iter().position(|k| k == key) {
                if let Some(entry) = self.order.remove(pos) {
                    self.order.push_back(entry);
                }
            }
        }
        Some(value)
    }

    /// Insert a value into the cache.
    pub fn insert(&mut self, key: String, value: V) {
        if self.entries.contains_key(&key) {
            self.order.retain(|k| *k != key);
        } else if self.entries.len() >= self.capacity {
            // Evict oldest
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear the cache.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

// =============================================================================
// Parsed Domain
// =============================================================================

/// A host split at its registrable domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDomain {
    /// Labels left of the registrable domain, e.g. `news`.
    pub subdomain: String,
    /// The label directly left of the public suffix, e.g. `example`.
    pub domain: String,
    /// The public suffix, e.g. `co.uk`. Empty for IP addresses.
    pub tld: String,
}

impl ParsedDomain {
    /// eTLD+1, e.g. `example.co.uk`.
    pub fn registrable(&self) -> String {
        if self.tld.is_empty() {
            self.domain.clone()
        } else {
            format!("{}.{}", self.domain, self.tld)
        }
    }

    /// True when both values share a registrable domain.
    pub fn same_site(&self, other: &ParsedDomain) -> bool {
        self.tld == other.tld && self.domain == other.domain
    }

    fn from_labels(labels: &[&str], suffix_len: usize) -> Option<Self> {
        let n = labels.len();
        if suffix_len == 0 || suffix_len >= n {
            return None;
        }
        let domain_index = n - suffix_len - 1;
        Some(Self {
            subdomain: labels[..domain_index].join("."),
            domain: labels[domain_index].to_string(),
            tld: labels[domain_index + 1..].join("."),
        })
    }
}

// =============================================================================
// Heuristic Suffixes
// =============================================================================

/// Common two-part TLDs for fallback.
const COMMON_TWO_PART_TLDS: &[&str] = &[
    "co.uk", "co.jp", "co.nz", "co.za", "co.in", "co.kr",
    "com.au", "com.br", "com.cn", "com.mx", "com.tw", "com.hk",
    "net.au", "net.nz",
    "org.uk", "org.au",
    "gov.uk", "gov.au",
    "ac.uk", "ac.jp",
    "ne.jp", "or.jp",
];

/// Fallback suffix length heuristic.
fn fallback_suffix_len(labels: &[&str]) -> usize {
    let n = labels.len();
    if n >= 3 {
        let last_two = format!("{}.{}", labels[n - 2], labels[n - 1]);
        if COMMON_TWO_PART_TLDS.contains(&last_two.as_str()) {
            return 2;
        }
    }
    1
}

// =============================================================================
// Parser
// =============================================================================

/// Memoizing registrable-domain parser.
pub struct DomainParser {
    suffixes: Option<List>,
    cache: LruCache<Option<ParsedDomain>>,
}

impl DomainParser {
    /// Parser using the built-in suffix heuristic.
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            suffixes: None,
            cache: LruCache::new(cache_capacity),
        }
    }

    /// Parser backed by a Public Suffix List.
    pub fn with_suffix_list(list: List, cache_capacity: usize) -> Self {
        Self {
            suffixes: Some(list),
            cache: LruCache::new(cache_capacity),
        }
    }

    /// Parse Public Suffix List text (`public_suffix_list.dat` format).
    pub fn load_suffix_list(text: &str) -> Result<List, ConfigError> {
        text.parse::<List>()
            .map_err(|e| ConfigError::SuffixList(e.to_string()))
    }

    pub fn has_suffix_list(&self) -> bool {
        self.suffixes.is_some()
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    /// Parse a URL, `host[:port]` or bare host. Returns `None` when no
    /// registrable domain can be determined.
    pub fn parse(&mut self, input: &str) -> Option<ParsedDomain> {
        if let Some(cached) = self.cache.get(input) {
            return cached;
        }

        let result = self.compute(input);
        self.cache.insert(input.to_string(), result.clone());
        result
    }

    fn compute(&self, input: &str) -> Option<ParsedDomain> {
        let input = input.trim();
        let host = match extract_host(input) {
            Some(host) => host,
            None if has_scheme(input) && !looks_like_host_port(input) => return None,
            None => strip_port(input.split(['/', '?', '#']).next().unwrap_or("")),
        };

        let host = host.trim_end_matches('.').to_lowercase();
        if host.is_empty() {
            return None;
        }

        let unbracketed = host.trim_start_matches('[').trim_end_matches(']');
        if unbracketed.parse::<IpAddr>().is_ok() {
            return Some(ParsedDomain {
                subdomain: String::new(),
                domain: unbracketed.to_string(),
                tld: String::new(),
            });
        }

        if !host
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-' || b == b'_' || b >= 0x80)
        {
            return None;
        }

        let labels: Vec<&str> = host.split('.').collect();
        if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
            return None;
        }

        let suffix_len = match &self.suffixes {
            Some(list) => {
                let suffix = list.suffix(host.as_bytes())?;
                if !suffix.is_known() {
                    return None;
                }
                suffix.as_bytes().split(|&b| b == b'.').count()
            }
            None => fallback_suffix_len(&labels),
        };

        ParsedDomain::from_labels(&labels, suffix_len)
    }
}

/// `example.com:8080` parses as a scheme of `example.com`; tell them apart
/// by the all-digit port.
fn looks_like_host_port(input: &str) -> bool {
    match input.split_once(':') {
        Some((host, rest)) => {
            let port = rest.split(['/', '?', '#']).next().unwrap_or("");
            host.contains('.') && !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUFFIXES: &str = "\
// ===BEGIN ICANN DOMAINS===
com
net
uk
co.uk
*.ck
!www.ck
// ===END ICANN DOMAINS===
";

    #[test]
    fn test_fallback_simple() {
        let mut parser = DomainParser::new(16);
        let parsed = parser.parse("sub.example.com").unwrap();
        assert_eq!(parsed.subdomain, "sub");
        assert_eq!(parsed.domain, "example");
        assert_eq!(parsed.tld, "com");
        assert_eq!(parsed.registrable(), "example.com");
    }

    #[test]
    fn test_fallback_two_part() {
        let mut parser = DomainParser::new(16);
        let parsed = parser.parse("a.b.example.co.uk").unwrap();
        assert_eq!(parsed.subdomain, "a.b");
        assert_eq!(parsed.registrable(), "example.co.uk");
    }

    #[test]
    fn test_urls_and_ports() {
        let mut parser = DomainParser::new(16);
        assert_eq!(parser.parse("https://Ads.Example.net:443/x.js").unwrap().registrable(), "example.net");
        assert_eq!(parser.parse("//cdn.example.org/a").unwrap().registrable(), "example.org");
        assert_eq!(parser.parse("www.example.com:8080").unwrap().registrable(), "example.com");
    }

    #[test]
    fn test_unparseable() {
        let mut parser = DomainParser::new(16);
        assert_eq!(parser.parse("localhost"), None);
        assert_eq!(parser.parse(""), None);
        assert_eq!(parser.parse("data:text/plain,hello"), None);
        assert_eq!(parser.parse("https://bad host/"), None);
    }

    #[test]
    fn test_ip_literals() {
        let mut parser = DomainParser::new(16);
        let v4 = parser.parse("http://192.168.0.1/x").unwrap();
        assert_eq!(v4.domain, "192.168.0.1");
        assert_eq!(v4.tld, "");
        let v6 = parser.parse("http://[::1]:8080/").unwrap();
        assert_eq!(v6.domain, "::1");
    }

    #[test]
    fn test_memoized() {
        let mut parser = DomainParser::new(16);
        parser.parse("a.example.com");
        parser.parse("a.example.com");
        parser.parse("localhost");
        assert_eq!(parser.cached_entries(), 2);
    }

    #[test]
    fn test_cache_eviction() {
        let mut cache: LruCache<u32> = LruCache::new(2);
        cache.insert("a".into(), 1);
        cache.insert("b".into(), 2);
        assert_eq!(cache.get("a"), Some(1));
        cache.insert("c".into(), 3);
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("c"), Some(3));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_suffix_list() {
        let list = DomainParser::load_suffix_list(SUFFIXES).unwrap();
        let mut parser = DomainParser::with_suffix_list(list, 16);
        assert!(parser.has_suffix_list());
        assert_eq!(parser.parse("www.example.co.uk").unwrap().registrable(), "example.co.uk");
        assert_eq!(parser.parse("shop.example.com").unwrap().registrable(), "example.com");
        // Unknown suffixes do not parse.
        assert_eq!(parser.parse("example.invalid"), None);
    }

    #[test]
    fn test_same_site() {
        let mut parser = DomainParser::new(16);
        let a = parser.parse("a.example.com").unwrap();
        let b = parser.parse("https://b.example.com/").unwrap();
        let c = parser.parse("example.net").unwrap();
        assert!(a.same_site(&b));
        assert!(!a.same_site(&c));
    }
}
