use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::classify::{classify, LinkKind};
use crate::model::{Image, Link};

/// Maximum number of link rows shown in the table. Display only: the
/// underlying filtered collection is never truncated.
pub const LINK_DISPLAY_CAP: usize = 100;

/// Which links the table shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LinkFilter {
    #[default]
    All,
    Internal,
    External,
    Anchor,
}

/// Wrap every case-insensitive occurrence of `term` in `<mark>` tags.
///
/// The term is escaped before matching, so metacharacters are literal:
/// searching for `a.b` finds `a.b` and nothing else. Matching is
/// non-overlapping and leftmost-first across the whole text. An empty
/// term returns the original text untouched.
pub fn highlight(text: &str, term: &str) -> String {
    if term.is_empty() {
        return text.to_string();
    }
    let pattern = format!("(?i)({})", regex::escape(term));
    match Regex::new(&pattern) {
        Ok(re) => re.replace_all(text, "<mark>$1</mark>").into_owned(),
        // regex::escape makes the pattern valid; keep the text as-is
        // rather than failing the whole view if that ever changes.
        Err(_) => text.to_string(),
    }
}

/// Links whose classification against `origin` matches `mode`,
/// original order preserved. `All` returns the full list unchanged.
pub fn filter_links<'a>(links: &'a [Link], mode: LinkFilter, origin: &str) -> Vec<&'a Link> {
    let wanted = match mode {
        LinkFilter::All => return links.iter().collect(),
        LinkFilter::Internal => LinkKind::Internal,
        LinkFilter::External => LinkKind::External,
        LinkFilter::Anchor => LinkKind::Anchor,
    };
    links
        .iter()
        .filter(|link| classify(&link.url, origin) == wanted)
        .collect()
}

/// Links whose text or URL contains `term`, case-insensitively.
/// An empty term keeps everything.
pub fn filter_links_by_search<'a>(links: &'a [Link], term: &str) -> Vec<&'a Link> {
    if term.is_empty() {
        return links.iter().collect();
    }
    let needle = term.to_lowercase();
    links
        .iter()
        .filter(|link| {
            link.text.to_lowercase().contains(&needle)
                || link.url.to_lowercase().contains(&needle)
        })
        .collect()
}

/// Images whose alt text or src contains `term`, case-insensitively.
pub fn filter_images_by_search<'a>(images: &'a [Image], term: &str) -> Vec<&'a Image> {
    if term.is_empty() {
        return images.iter().collect();
    }
    let needle = term.to_lowercase();
    images
        .iter()
        .filter(|image| {
            image.alt.to_lowercase().contains(&needle)
                || image.src.to_lowercase().contains(&needle)
        })
        .collect()
}

/// First `LINK_DISPLAY_CAP` rows plus how many were left out.
pub fn display_window<'a, T>(rows: &'a [T]) -> (&'a [T], usize) {
    if rows.len() > LINK_DISPLAY_CAP {
        (&rows[..LINK_DISPLAY_CAP], rows.len() - LINK_DISPLAY_CAP)
    } else {
        (rows, 0)
    }
}
