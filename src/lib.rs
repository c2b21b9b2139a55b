// Scrapeview Library
//
// Presentation and export engine for scraped web pages: link
// classification, search and filtering, HTML re-indenting, image
// selection, and single-file/archive export with graceful fallbacks.

pub mod api;
pub mod archive;
pub mod classify;
pub mod client;
pub mod config;
pub mod export;
pub mod fetch;
pub mod filter;
pub mod format;
pub mod model;
pub mod selection;
pub mod state;
pub mod utils;

// Re-export main types for convenience
pub use archive::{ArchiveBuilder, ArchiveFactory, UnavailableArchiveBuilder, ZipArchiveBuilder};
pub use classify::{classify, LinkKind};
pub use client::ScrapeClient;
pub use config::AppConfig;
pub use export::{Artifact, DatasetExport, Exporter, ImagesExport, SingleDownload};
pub use fetch::{FetchedImage, HttpImageFetcher, ImageFetcher};
pub use filter::{
    display_window, filter_images_by_search, filter_links, filter_links_by_search, highlight,
    LinkFilter, LINK_DISPLAY_CAP,
};
pub use format::format_html;
pub use model::{Heading, Image, Link, MetaTag, OpenGraphTag, ScrapeResult};
pub use selection::Selection;
pub use state::{ImageLayout, RequestToken, SessionState, ViewState};
