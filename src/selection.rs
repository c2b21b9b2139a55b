use std::collections::HashSet;

/// Images chosen for bulk export, keyed by `src`.
///
/// The src is treated as an opaque unique identifier: duplicate src
/// values across different `<img>` entries collapse to one selection.
/// Insertion order is remembered so archive entry indices follow the
/// order in which images were picked.
///
/// Filtering the image view hides entries without deselecting them;
/// a selection only empties on an explicit deselect/clear or when the
/// current result is replaced.
#[derive(Debug, Default, Clone)]
pub struct Selection {
    order: Vec<String>,
    members: HashSet<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `src`. A repeat select is a no-op.
    pub fn select(&mut self, src: &str) {
        if self.members.insert(src.to_string()) {
            self.order.push(src.to_string());
        }
    }

    /// Remove `src`. Deselecting something absent is a no-op.
    pub fn deselect(&mut self, src: &str) {
        if self.members.remove(src) {
            self.order.retain(|s| s != src);
        }
    }

    /// Select every visible image src.
    pub fn select_all<I, S>(&mut self, visible: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for src in visible {
            self.select(src.as_ref());
        }
    }

    pub fn deselect_all(&mut self) {
        self.order.clear();
        self.members.clear();
    }

    pub fn clear(&mut self) {
        self.deselect_all();
    }

    pub fn contains(&self, src: &str) -> bool {
        self.members.contains(src)
    }

    pub fn count(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Selected srcs in the order they were picked.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.order.clone()
    }
}
