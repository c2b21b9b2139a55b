use serde::{Deserialize, Serialize};
use url::Url;

/// Where a link points relative to the scraped page's origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Internal,
    External,
    Anchor,
}

impl LinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkKind::Internal => "internal",
            LinkKind::External => "external",
            LinkKind::Anchor => "anchor",
        }
    }
}

/// Classify `candidate` against the page origin.
///
/// Absolute URLs compare hostnames case-insensitively (scheme and port
/// are ignored). A candidate that is not absolute and starts with `#`
/// is an in-page anchor. Anything else is resolved relative to the
/// origin; whatever still cannot be resolved is treated as external,
/// the fail-safe bucket for unparsable, untrusted input.
///
/// Pure and total: no network, no state, same inputs same answer.
pub fn classify(candidate: &str, origin: &str) -> LinkKind {
    if let Ok(link) = Url::parse(candidate) {
        return compare_hosts(&link, origin);
    }

    if candidate.starts_with('#') {
        return LinkKind::Anchor;
    }

    match Url::parse(origin).and_then(|base| base.join(candidate)) {
        Ok(resolved) => compare_hosts(&resolved, origin),
        Err(_) => LinkKind::External,
    }
}

fn compare_hosts(link: &Url, origin: &str) -> LinkKind {
    let Ok(base) = Url::parse(origin) else {
        return LinkKind::External;
    };
    match (link.host_str(), base.host_str()) {
        (Some(a), Some(b)) if a.eq_ignore_ascii_case(b) => LinkKind::Internal,
        _ => LinkKind::External,
    }
}
