use serde::{Deserialize, Serialize};

use crate::filter::LinkFilter;
use crate::model::ScrapeResult;
use crate::selection::Selection;

/// Image panel layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageLayout {
    #[default]
    Grid,
    List,
}

/// Transient per-result view settings. Never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewState {
    pub link_filter: LinkFilter,
    pub text_search: String,
    pub links_search: String,
    pub images_search: String,
    pub image_layout: ImageLayout,
}

/// Ticket for one in-flight scrape request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken(u64);

/// Everything the presentation layer owns: the current result, the
/// image selection, and the view settings.
///
/// One result is current at a time. Installing a new one clears the
/// derived state first (clear-before-set), so no selection or filter
/// from the old page leaks into the new one.
///
/// Scrapes cannot be cancelled, so a slow response can arrive after a
/// newer one. Each submission takes a token from `begin_request`; only
/// the most recently issued token may install a result. A stale
/// response is dropped rather than overwriting the newer page.
#[derive(Debug, Default)]
pub struct SessionState {
    current: Option<ScrapeResult>,
    selection: Selection,
    view: ViewState,
    request_seq: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new scrape submission and clear derived state, the
    /// same way the form reset does before firing the request.
    pub fn begin_request(&mut self) -> RequestToken {
        self.selection.clear();
        self.view = ViewState::default();
        self.request_seq += 1;
        RequestToken(self.request_seq)
    }

    /// Install `result` if `token` is still the latest submission.
    /// Returns false (and changes nothing) for a superseded response.
    pub fn install_result(&mut self, token: RequestToken, result: ScrapeResult) -> bool {
        if token.0 != self.request_seq {
            log::info!("Dropping stale scrape response for {}", result.url);
            return false;
        }
        self.selection.clear();
        self.view = ViewState::default();
        self.current = Some(result);
        true
    }

    /// Explicit "clear results": drop the page and all derived state.
    pub fn clear(&mut self) {
        self.current = None;
        self.selection.clear();
        self.view = ViewState::default();
    }

    pub fn current(&self) -> Option<&ScrapeResult> {
        self.current.as_ref()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut ViewState {
        &mut self.view
    }
}
