//! Cosmetic filter list parser
//!
//! Only generic element hiding rules are kept: `##selector` and
//! `#@#selector`. Everything else a list contains (network rules,
//! domain-specific and procedural cosmetic rules) is counted and skipped.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// `##selector`
    Hide,
    /// `#@#selector`
    Exception,
}

/// Leading simple selector a generic rule is indexed by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SelectorKey {
    Id(String),
    Class(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CosmeticRule {
    pub kind: RuleKind,
    pub selector: String,
    pub key: Option<SelectorKey>,
}

/// Line counts from one parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseStats {
    pub lines: usize,
    pub comments: usize,
    pub generic_hide: usize,
    pub generic_exceptions: usize,
    pub domain_specific: usize,
    pub procedural: usize,
    pub network: usize,
}

impl ParseStats {
    pub fn generic_total(&self) -> usize {
        self.generic_hide + self.generic_exceptions
    }
}

/// Cosmetic rule separators, longest first so `#@?#` is not read as `#@#`.
const MARKERS: &[(&str, Marker)] = &[
    ("#@?#", Marker::Procedural),
    ("#@$#", Marker::Procedural),
    ("#?#", Marker::Procedural),
    ("#$#", Marker::Procedural),
    ("#@#", Marker::Exception),
    ("##", Marker::Hide),
];

/// Selector extensions that only procedural filtering understands.
const PROCEDURAL_PATTERNS: &[&str] = &[
    "+js(",
    ":-abp-",
    ":has-text(",
    ":matches-css",
    ":matches-path(",
    ":min-text-length(",
    ":remove(",
    ":style(",
    ":upward(",
    ":watch-attr(",
    ":xpath(",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Hide,
    Exception,
    Procedural,
}

pub fn parse_cosmetic_list(text: &str) -> (Vec<CosmeticRule>, ParseStats) {
    let mut rules = Vec::new();
    let mut stats = ParseStats::default();

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        stats.lines += 1;

        if line.starts_with('!') || line.starts_with('[') {
            stats.comments += 1;
            continue;
        }

        let Some((pos, marker, len)) = find_marker(line) else {
            if line.starts_with('#') {
                stats.comments += 1;
            } else {
                stats.network += 1;
            }
            continue;
        };

        let domains = line[..pos].trim();
        let selector = line[pos + len..].trim();

        if marker == Marker::Procedural || is_procedural(selector) {
            stats.procedural += 1;
            continue;
        }
        if !domains.is_empty() {
            stats.domain_specific += 1;
            continue;
        }
        if selector.is_empty() {
            log::debug!("Skipping cosmetic rule without selector: {}", line);
            stats.comments += 1;
            continue;
        }

        let kind = match marker {
            Marker::Exception => {
                stats.generic_exceptions += 1;
                RuleKind::Exception
            }
            _ => {
                stats.generic_hide += 1;
                RuleKind::Hide
            }
        };

        rules.push(CosmeticRule {
            kind,
            selector: selector.to_string(),
            key: selector_key(selector),
        });
    }

    (rules, stats)
}

fn find_marker(line: &str) -> Option<(usize, Marker, usize)> {
    let mut search = 0;
    while let Some(offset) = line[search..].find('#') {
        let pos = search + offset;
        let rest = &line[pos..];
        for (text, marker) in MARKERS {
            if rest.starts_with(text) {
                return Some((pos, *marker, text.len()));
            }
        }
        search = pos + 1;
    }
    None
}

fn is_procedural(selector: &str) -> bool {
    PROCEDURAL_PATTERNS.iter().any(|pattern| selector.contains(pattern))
}

/// Key of a selector starting with `#id` or `.class`. Selectors with
/// escapes or any other start stay unkeyed.
pub fn selector_key(selector: &str) -> Option<SelectorKey> {
    let mut chars = selector.chars();
    let sigil = chars.next()?;
    if sigil != '#' && sigil != '.' {
        return None;
    }

    let rest = chars.as_str();
    let end = rest
        .char_indices()
        .find(|&(_, c)| !is_ident_char(c))
        .map_or(rest.len(), |(i, _)| i);
    if end == 0 || rest[end..].starts_with('\\') {
        return None;
    }

    let token = rest[..end].to_string();
    if token.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }

    Some(match sigil {
        '#' => SelectorKey::Id(token),
        _ => SelectorKey::Class(token),
    })
}

#[inline]
fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}
