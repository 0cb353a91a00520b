use std::net::Ipv4Addr;
use std::sync::LazyLock;

use regex::Regex;

/// Enrichment attempts allowed for a single message.
pub const MAX_LINKS_PER_MESSAGE: usize = 3;

// Explicit scheme, `www.` host, or bare `host.tld` / IPv4 host followed by an
// optional port and an optional path, query or fragment.
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\b[a-z][a-z0-9+.\-]*://[^\s<>"]+|\bwww\d{0,3}\.[^\s<>"]+|\b(?:(?:[a-z0-9](?:[a-z0-9\-]{0,61}[a-z0-9])?\.)+[a-z]{2,24}|(?:\d{1,3}\.){3}\d{1,3})(?::\d{1,5})?(?:[/?#][^\s<>"]*)?"#,
    )
    .unwrap_or_else(|err| panic!("static url pattern failed to compile: {err}"))
});

// Bare hosts without a path are only accepted on these, otherwise every
// `file.txt` or `node.js` in a sentence would be fetched.
const BARE_HOST_TLDS: &[&str] = &[
    "com", "net", "org", "edu", "gov", "mil", "int", "io", "co", "uk", "de", "fr", "jp", "ru",
    "cn", "br", "in", "it", "nl", "au", "ca", "es", "se", "no", "fi", "ch", "eu", "us", "me",
    "tv", "info", "biz", "dev", "app", "xyz", "ly", "gl", "be",
];

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', '\'', '"', '*'];

/// Deduplicated, insertion-ordered, size-capped candidates from one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSet {
    items: Vec<String>,
    cap: usize,
}

impl LinkSet {
    pub fn with_cap(cap: usize) -> Self {
        Self {
            items: Vec::new(),
            cap,
        }
    }

    /// Admits `candidate` unless it is already present or the set is full.
    pub fn insert(&mut self, candidate: &str) -> bool {
        if self.is_full() || self.items.iter().any(|item| item == candidate) {
            return false;
        }
        self.items.push(candidate.to_string());
        true
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.cap
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.items
    }
}

impl Default for LinkSet {
    fn default() -> Self {
        Self::with_cap(MAX_LINKS_PER_MESSAGE)
    }
}

/// Finds URL-like substrings in a chat message. No network access.
pub fn harvest(text: &str) -> LinkSet {
    let mut links = LinkSet::default();
    for found in URL_PATTERN.find_iter(text) {
        if links.is_full() {
            break;
        }
        if text[..found.start()].ends_with('@') {
            // user@host.tld is an address, not a link
            continue;
        }
        if let Some(candidate) = accept(found.as_str()) {
            links.insert(candidate);
        }
    }
    links
}

fn accept(raw: &str) -> Option<&str> {
    let candidate = trim_candidate(raw);
    if let Some(idx) = candidate.find("://") {
        let rest = &candidate[idx + 3..];
        return (!rest.is_empty()).then_some(candidate);
    }
    let has_www = candidate
        .get(..4)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("www."));
    let host = candidate
        .split([':', '/', '?', '#'])
        .next()
        .unwrap_or(candidate);
    if host.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        // A lone dotted quad reads like a version number; needs a port or path.
        return (host.parse::<Ipv4Addr>().is_ok() && candidate.len() > host.len())
            .then_some(candidate);
    }
    if has_www || candidate.contains(['/', '?', '#']) {
        return Some(candidate);
    }
    let tld = host.rsplit('.').next().unwrap_or_default();
    BARE_HOST_TLDS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(tld))
        .then_some(candidate)
}

/// Drops sentence punctuation and closing brackets that have no opener inside
/// the candidate, so `(see http://x.org/a_(b))` keeps its balanced pair.
fn trim_candidate(raw: &str) -> &str {
    let mut candidate = raw;
    loop {
        let Some(last) = candidate.chars().last() else {
            return candidate;
        };
        let unbalanced = match last {
            ')' => Some('('),
            ']' => Some('['),
            '}' => Some('{'),
            _ => None,
        }
        .is_some_and(|open| candidate.matches(open).count() < candidate.matches(last).count());
        if TRAILING_PUNCTUATION.contains(&last) || unbalanced {
            candidate = &candidate[..candidate.len() - last.len_utf8()];
        } else {
            return candidate;
        }
    }
}
