use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use url::Url;

use crate::archive::{ArchiveBuilder, ArchiveFactory};
use crate::fetch::ImageFetcher;
use crate::model::ScrapeResult;

/// Alt-text value the scraping service emits for images without one.
pub const NO_ALT_SENTINEL: &str = "No alt text";

/// Most images carried into a full-dataset archive. Bounds export
/// latency; selecting more never silently includes more than this.
pub const DATASET_IMAGE_CAP: usize = 20;

/// Extensions recognized when inferring from a URL path.
pub const KNOWN_IMAGE_EXTENSIONS: &[&str] =
    &["jpg", "jpeg", "png", "gif", "webp", "bmp", "svg"];

const ALT_FILENAME_MAX: usize = 50;

/// One downloadable payload: exact bytes, a MIME type, and the name
/// the browser saves it under.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub filename: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// An entry of the no-archive fallback: the browser downloads the
/// source URL directly, no bytes pass through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleDownload {
    pub url: String,
    pub filename: String,
}

/// Outcome of a selected-images export.
#[derive(Debug)]
pub enum ImagesExport {
    /// Archive built; some entries may have been dropped.
    Archive {
        artifact: Artifact,
        succeeded: usize,
        failed: usize,
    },
    /// Archive capability missing or broken: issue these one at a
    /// time, waiting `delay` between downloads so the browser does
    /// not drop rapid-fire requests.
    Singles {
        downloads: Vec<SingleDownload>,
        delay: Duration,
    },
    /// Every fetch failed; no archive was produced.
    NoneSucceeded { failed: usize },
}

/// Outcome of a full-dataset export.
#[derive(Debug)]
pub enum DatasetExport {
    Archive(Artifact),
    /// Capability missing or broken: the JSON payload alone.
    JsonOnly(Artifact),
}

/// Milliseconds since epoch, the `{ts}` of every artifact name.
pub fn timestamp_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// `{base}-{unix_millis}.{ext}`; unique across repeated exports of
/// the same kind within a session.
pub fn generate_filename(base: &str, ext: &str) -> String {
    format!("{}-{}.{}", base, timestamp_millis(), ext)
}

/// Filename for a single image download, derived from its alt text.
/// Keeps `[a-zA-Z0-9]` only, capped at 50 chars; empty alt, the
/// "No alt text" sentinel, or an alt with no usable characters all
/// fall back to the literal `image`.
pub fn image_filename(alt: &str, src: &str) -> String {
    let mut base = String::from("image");
    if !alt.is_empty() && alt != NO_ALT_SENTINEL {
        let cleaned: String = alt
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .take(ALT_FILENAME_MAX)
            .collect();
        if !cleaned.is_empty() {
            base = cleaned;
        }
    }
    let ext = extension_from_url(src).unwrap_or("jpg");
    format!("{}-{}.{}", base, timestamp_millis(), ext)
}

/// Extension from a declared media type, e.g. `image/webp` -> `webp`.
pub fn extension_from_content_type(content_type: &str) -> Option<&'static str> {
    if content_type.contains("jpeg") {
        Some("jpg")
    } else if content_type.contains("png") {
        Some("png")
    } else if content_type.contains("gif") {
        Some("gif")
    } else if content_type.contains("webp") {
        Some("webp")
    } else if content_type.contains("bmp") {
        Some("bmp")
    } else if content_type.contains("svg") {
        Some("svg")
    } else {
        None
    }
}

/// Extension from the URL path suffix, known image types only.
pub fn extension_from_url(src: &str) -> Option<&'static str> {
    let url = Url::parse(src).ok()?;
    let path = url.path().to_lowercase();
    KNOWN_IMAGE_EXTENSIONS
        .iter()
        .find(|ext| path.ends_with(&format!(".{}", ext)))
        .copied()
}

fn mime_for_extension(ext: &str) -> &'static str {
    match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// Produces every downloadable artifact: the four single-file exports
/// and the two archive variants with their fallbacks.
///
/// Image fetches run sequentially in selection order; one failed
/// image never aborts a batch. Archive construction goes through the
/// [`ArchiveBuilder`] capability probe, so a runtime without archive
/// support degrades instead of erroring.
pub struct Exporter {
    fetcher: Arc<dyn ImageFetcher>,
    archives: Arc<ArchiveFactory>,
    fallback_delay: Duration,
}

impl Exporter {
    pub fn new(
        fetcher: Arc<dyn ImageFetcher>,
        archives: Arc<ArchiveFactory>,
        fallback_delay: Duration,
    ) -> Self {
        Self {
            fetcher,
            archives,
            fallback_delay,
        }
    }

    /// Raw page source as `page-{ts}.html`.
    pub fn export_html(&self, result: &ScrapeResult) -> Artifact {
        let html = if result.html.is_empty() {
            "<html><body>No HTML content</body></html>".to_string()
        } else {
            result.html.clone()
        };
        Artifact {
            filename: generate_filename("page", "html"),
            mime: "text/html".to_string(),
            bytes: html.into_bytes(),
        }
    }

    /// Extracted text as `content-{ts}.txt`.
    pub fn export_text(&self, result: &ScrapeResult) -> Artifact {
        let text = if result.text_content.is_empty() {
            "No text content".to_string()
        } else {
            result.text_content.clone()
        };
        Artifact {
            filename: generate_filename("content", "txt"),
            mime: "text/plain".to_string(),
            bytes: text.into_bytes(),
        }
    }

    /// Complete snapshot as pretty-printed `scraped-data-{ts}.json`.
    pub fn export_json(&self, result: &ScrapeResult) -> Result<Artifact> {
        let json =
            serde_json::to_string_pretty(result).context("Failed to serialize scrape result")?;
        Ok(Artifact {
            filename: generate_filename("scraped-data", "json"),
            mime: "application/json".to_string(),
            bytes: json.into_bytes(),
        })
    }

    /// Fetch one image and wrap it for download under its alt-derived
    /// filename.
    pub async fn export_image(&self, src: &str, alt: &str) -> Result<Artifact> {
        let fetched = self.fetcher.fetch(src).await?;
        let filename = image_filename(alt, src);
        let mime = fetched
            .content_type
            .clone()
            .unwrap_or_else(|| mime_for_extension(extension_from_url(src).unwrap_or("jpg")).to_string());
        Ok(Artifact {
            filename,
            mime,
            bytes: fetched.bytes,
        })
    }

    /// Bundle the selected images into `images-{ts}.zip`.
    ///
    /// Fetches run one at a time in selection order. A non-success
    /// response or network failure drops that entry and continues;
    /// the summary reports how many made it. Successful entries are
    /// numbered consecutively: `images/image-1.{ext}` onward.
    pub async fn export_selected_images(&self, selected: &[String]) -> ImagesExport {
        let mut builder = (self.archives)();
        if !builder.is_available() {
            return self.singles_fallback(selected);
        }

        let mut succeeded = 0usize;
        let mut failed = 0usize;

        for src in selected {
            match self.fetcher.fetch(src).await {
                Ok(fetched) => {
                    let ext = fetched
                        .content_type
                        .as_deref()
                        .and_then(extension_from_content_type)
                        .or_else(|| extension_from_url(src))
                        .unwrap_or("jpg");
                    let name = format!("images/image-{}.{}", succeeded + 1, ext);
                    if let Err(e) = builder.add_entry(&name, &fetched.bytes) {
                        log::error!("Archive construction failed: {}", e);
                        return self.singles_fallback(selected);
                    }
                    succeeded += 1;
                }
                Err(e) => {
                    log::error!("Failed to fetch image {}: {}", src, e);
                    failed += 1;
                }
            }
        }

        if succeeded == 0 {
            return ImagesExport::NoneSucceeded { failed };
        }

        match builder.finish() {
            Ok(bytes) => ImagesExport::Archive {
                artifact: Artifact {
                    filename: generate_filename("images", "zip"),
                    mime: "application/zip".to_string(),
                    bytes,
                },
                succeeded,
                failed,
            },
            Err(e) => {
                log::error!("Archive finalization failed: {}", e);
                self.singles_fallback(selected)
            }
        }
    }

    /// Bundle the whole current dataset into
    /// `web-scraper-data-{ts}.zip`: the JSON snapshot always, page
    /// source and extracted text when present, and up to
    /// [`DATASET_IMAGE_CAP`] selected images. Image fetch failures
    /// are skipped; any archive failure degrades to JSON only.
    pub async fn export_full_dataset(
        &self,
        result: &ScrapeResult,
        selected: &[String],
    ) -> Result<DatasetExport> {
        let json = self.export_json(result)?;

        let mut builder = (self.archives)();
        if !builder.is_available() {
            return Ok(DatasetExport::JsonOnly(json));
        }

        match self.build_dataset_archive(builder.as_mut(), result, selected).await {
            Ok(()) => match builder.finish() {
                Ok(bytes) => Ok(DatasetExport::Archive(Artifact {
                    filename: generate_filename("web-scraper-data", "zip"),
                    mime: "application/zip".to_string(),
                    bytes,
                })),
                Err(e) => {
                    log::error!("Dataset archive finalization failed: {}", e);
                    Ok(DatasetExport::JsonOnly(json))
                }
            },
            Err(e) => {
                log::error!("Dataset archive construction failed: {}", e);
                Ok(DatasetExport::JsonOnly(json))
            }
        }
    }

    async fn build_dataset_archive(
        &self,
        builder: &mut dyn ArchiveBuilder,
        result: &ScrapeResult,
        selected: &[String],
    ) -> Result<()> {
        let json =
            serde_json::to_string_pretty(result).context("Failed to serialize scrape result")?;
        builder.add_entry("scraped-data.json", json.as_bytes())?;

        if !result.html.is_empty() {
            builder.add_entry("page.html", result.html.as_bytes())?;
        }
        if !result.text_content.is_empty() {
            builder.add_entry("content.txt", result.text_content.as_bytes())?;
        }

        let mut count = 0usize;
        for src in selected.iter().take(DATASET_IMAGE_CAP) {
            match self.fetcher.fetch(src).await {
                Ok(fetched) => {
                    let ext = fetched
                        .content_type
                        .as_deref()
                        .and_then(extension_from_content_type)
                        .or_else(|| extension_from_url(src))
                        .unwrap_or("jpg");
                    count += 1;
                    builder.add_entry(&format!("images/image-{}.{}", count, ext), &fetched.bytes)?;
                }
                Err(e) => {
                    log::error!("Skipping image {} in dataset archive: {}", src, e);
                }
            }
        }

        Ok(())
    }

    fn singles_fallback(&self, selected: &[String]) -> ImagesExport {
        let downloads = selected
            .iter()
            .enumerate()
            .map(|(i, src)| SingleDownload {
                url: src.clone(),
                filename: format!("image-{}.{}", i + 1, extension_from_url(src).unwrap_or("jpg")),
            })
            .collect();
        ImagesExport::Singles {
            downloads,
            delay: self.fallback_delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{UnavailableArchiveBuilder, ZipArchiveBuilder};
    use crate::fetch::FetchedImage;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::io::Cursor;

    struct FakeFetcher {
        // src -> Some(image) for success, None for failure
        responses: HashMap<String, Option<FetchedImage>>,
    }

    impl FakeFetcher {
        fn new(entries: Vec<(&str, Option<FetchedImage>)>) -> Self {
            Self {
                responses: entries
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl ImageFetcher for FakeFetcher {
        async fn fetch(&self, src: &str) -> Result<FetchedImage> {
            match self.responses.get(src) {
                Some(Some(image)) => Ok(image.clone()),
                _ => anyhow::bail!("fetch failed for {}", src),
            }
        }

        async fn probe_size(&self, _src: &str) -> Result<Option<u64>> {
            Ok(None)
        }
    }

    fn png(bytes: &[u8]) -> Option<FetchedImage> {
        Some(FetchedImage {
            bytes: bytes.to_vec(),
            content_type: Some("image/png".to_string()),
        })
    }

    fn exporter(fetcher: FakeFetcher) -> Exporter {
        Exporter::new(
            Arc::new(fetcher),
            Arc::new(|| Box::new(ZipArchiveBuilder::new()) as Box<dyn ArchiveBuilder>),
            Duration::from_millis(300),
        )
    }

    fn exporter_without_archives(fetcher: FakeFetcher) -> Exporter {
        Exporter::new(
            Arc::new(fetcher),
            Arc::new(|| Box::new(UnavailableArchiveBuilder) as Box<dyn ArchiveBuilder>),
            Duration::from_millis(300),
        )
    }

    fn entry_names(bytes: &[u8]) -> Vec<String> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    fn sample_result() -> ScrapeResult {
        serde_json::from_str(
            r#"{
                "url": "https://example.com/",
                "title": "Example",
                "html": "<html></html>",
                "textContent": "body text"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_generate_filename_shape() {
        let name = generate_filename("page", "html");
        assert!(name.starts_with("page-"));
        assert!(name.ends_with(".html"));
        let ts = &name["page-".len()..name.len() - ".html".len()];
        assert!(ts.parse::<i64>().is_ok());
    }

    #[test]
    fn test_image_filename_sanitizes_alt() {
        let name = image_filename("Hello, World! 42", "https://e.com/pic.png");
        assert!(name.starts_with("HelloWorld42-"));
        assert!(name.ends_with(".png"));
    }

    #[test]
    fn test_image_filename_caps_at_50_chars() {
        let alt = "a".repeat(80);
        let name = image_filename(&alt, "https://e.com/pic.gif");
        let base = name.split('-').next().unwrap();
        assert_eq!(base.len(), 50);
    }

    #[test]
    fn test_image_filename_fallbacks() {
        assert!(image_filename("", "https://e.com/x").starts_with("image-"));
        assert!(image_filename(NO_ALT_SENTINEL, "https://e.com/x").starts_with("image-"));
        // Alt with nothing usable after stripping.
        assert!(image_filename("!!! ???", "https://e.com/x").starts_with("image-"));
        // No recognizable URL extension defaults to jpg.
        assert!(image_filename("", "https://e.com/x").ends_with(".jpg"));
    }

    #[test]
    fn test_extension_inference() {
        assert_eq!(extension_from_content_type("image/jpeg"), Some("jpg"));
        assert_eq!(extension_from_content_type("image/svg+xml"), Some("svg"));
        assert_eq!(extension_from_content_type("text/html"), None);

        assert_eq!(extension_from_url("https://e.com/a/b.WEBP"), Some("webp"));
        assert_eq!(extension_from_url("https://e.com/a.jpeg"), Some("jpeg"));
        // Query strings are not part of the path suffix.
        assert_eq!(extension_from_url("https://e.com/img?f=x.png"), None);
        assert_eq!(extension_from_url("not a url"), None);
    }

    #[tokio::test]
    async fn test_extension_prefers_content_type_then_url() {
        let fetcher = FakeFetcher::new(vec![
            (
                "https://e.com/a.png",
                Some(FetchedImage {
                    bytes: b"a".to_vec(),
                    content_type: None,
                }),
            ),
            (
                "https://e.com/b",
                Some(FetchedImage {
                    bytes: b"b".to_vec(),
                    content_type: Some("image/webp".to_string()),
                }),
            ),
        ]);
        let selected = vec!["https://e.com/a.png".to_string(), "https://e.com/b".to_string()];

        match exporter(fetcher).export_selected_images(&selected).await {
            ImagesExport::Archive { artifact, succeeded, failed } => {
                assert_eq!(succeeded, 2);
                assert_eq!(failed, 0);
                assert_eq!(
                    entry_names(&artifact.bytes),
                    vec!["images/image-1.png", "images/image-2.webp"]
                );
            }
            other => panic!("expected archive, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_survivors() {
        let fetcher = FakeFetcher::new(vec![
            ("https://e.com/1.png", png(b"1")),
            ("https://e.com/2.png", None),
            ("https://e.com/3.png", None),
            ("https://e.com/4.png", png(b"4")),
            ("https://e.com/5.png", None),
        ]);
        let selected: Vec<String> = (1..=5).map(|i| format!("https://e.com/{}.png", i)).collect();

        match exporter(fetcher).export_selected_images(&selected).await {
            ImagesExport::Archive { artifact, succeeded, failed } => {
                assert_eq!(succeeded, 2);
                assert_eq!(failed, 3);
                assert_eq!(
                    entry_names(&artifact.bytes),
                    vec!["images/image-1.png", "images/image-2.png"]
                );
                assert!(artifact.filename.starts_with("images-"));
                assert!(artifact.filename.ends_with(".zip"));
            }
            other => panic!("expected archive, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_all_failures_yields_no_archive() {
        let fetcher = FakeFetcher::new(vec![
            ("https://e.com/1.png", None),
            ("https://e.com/2.png", None),
        ]);
        let selected = vec![
            "https://e.com/1.png".to_string(),
            "https://e.com/2.png".to_string(),
        ];

        match exporter(fetcher).export_selected_images(&selected).await {
            ImagesExport::NoneSucceeded { failed } => assert_eq!(failed, 2),
            other => panic!("expected total failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_capability_falls_back_to_singles() {
        let fetcher = FakeFetcher::new(vec![]);
        let selected = vec![
            "https://e.com/a.png".to_string(),
            "https://e.com/b".to_string(),
        ];

        match exporter_without_archives(fetcher)
            .export_selected_images(&selected)
            .await
        {
            ImagesExport::Singles { downloads, delay } => {
                assert_eq!(delay, Duration::from_millis(300));
                assert_eq!(
                    downloads,
                    vec![
                        SingleDownload {
                            url: "https://e.com/a.png".to_string(),
                            filename: "image-1.png".to_string(),
                        },
                        SingleDownload {
                            url: "https://e.com/b".to_string(),
                            filename: "image-2.jpg".to_string(),
                        },
                    ]
                );
            }
            other => panic!("expected singles fallback, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dataset_caps_images_at_20() {
        let entries: Vec<(String, Option<FetchedImage>)> = (1..=25)
            .map(|i| (format!("https://e.com/{}.png", i), png(b"x")))
            .collect();
        let fetcher = FakeFetcher {
            responses: entries.into_iter().collect(),
        };
        let selected: Vec<String> = (1..=25).map(|i| format!("https://e.com/{}.png", i)).collect();

        let result = sample_result();
        match exporter(fetcher)
            .export_full_dataset(&result, &selected)
            .await
            .unwrap()
        {
            DatasetExport::Archive(artifact) => {
                let names = entry_names(&artifact.bytes);
                let image_entries = names.iter().filter(|n| n.starts_with("images/")).count();
                assert_eq!(image_entries, DATASET_IMAGE_CAP);
                assert!(names.contains(&"scraped-data.json".to_string()));
                assert!(names.contains(&"page.html".to_string()));
                assert!(names.contains(&"content.txt".to_string()));
                assert!(artifact.filename.starts_with("web-scraper-data-"));
            }
            other => panic!("expected archive, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dataset_skips_empty_sections() {
        let fetcher = FakeFetcher::new(vec![]);
        let mut result = sample_result();
        result.html.clear();
        result.text_content.clear();

        match exporter(fetcher)
            .export_full_dataset(&result, &[])
            .await
            .unwrap()
        {
            DatasetExport::Archive(artifact) => {
                assert_eq!(entry_names(&artifact.bytes), vec!["scraped-data.json"]);
            }
            other => panic!("expected archive, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dataset_missing_capability_yields_json_only() {
        let fetcher = FakeFetcher::new(vec![]);
        let result = sample_result();

        match exporter_without_archives(fetcher)
            .export_full_dataset(&result, &[])
            .await
            .unwrap()
        {
            DatasetExport::JsonOnly(artifact) => {
                assert!(artifact.filename.starts_with("scraped-data-"));
                assert!(artifact.filename.ends_with(".json"));
                assert_eq!(artifact.mime, "application/json");
                let parsed: ScrapeResult = serde_json::from_slice(&artifact.bytes).unwrap();
                assert_eq!(parsed.url, "https://example.com/");
            }
            other => panic!("expected JSON fallback, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_broken_builder_triggers_fallback() {
        struct BrokenBuilder;
        impl ArchiveBuilder for BrokenBuilder {
            fn is_available(&self) -> bool {
                true
            }
            fn add_entry(&mut self, _name: &str, _bytes: &[u8]) -> Result<()> {
                anyhow::bail!("disk full")
            }
            fn finish(self: Box<Self>) -> Result<Vec<u8>> {
                anyhow::bail!("disk full")
            }
        }

        let fetcher = FakeFetcher::new(vec![("https://e.com/a.png", png(b"a"))]);
        let exporter = Exporter::new(
            Arc::new(fetcher),
            Arc::new(|| Box::new(BrokenBuilder) as Box<dyn ArchiveBuilder>),
            Duration::from_millis(300),
        );
        let selected = vec!["https://e.com/a.png".to_string()];

        match exporter.export_selected_images(&selected).await {
            ImagesExport::Singles { downloads, .. } => assert_eq!(downloads.len(), 1),
            other => panic!("expected singles fallback, got {:?}", other),
        }

        let fetcher = FakeFetcher::new(vec![]);
        let exporter = Exporter::new(
            Arc::new(fetcher),
            Arc::new(|| Box::new(BrokenBuilder) as Box<dyn ArchiveBuilder>),
            Duration::from_millis(300),
        );
        match exporter
            .export_full_dataset(&sample_result(), &[])
            .await
            .unwrap()
        {
            DatasetExport::JsonOnly(_) => {}
            other => panic!("expected JSON fallback, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_single_image_export() {
        let fetcher = FakeFetcher::new(vec![("https://e.com/logo.png", png(b"logo-bytes"))]);
        let artifact = exporter(fetcher)
            .export_image("https://e.com/logo.png", "Site Logo")
            .await
            .unwrap();
        assert!(artifact.filename.starts_with("SiteLogo-"));
        assert!(artifact.filename.ends_with(".png"));
        assert_eq!(artifact.mime, "image/png");
        assert_eq!(artifact.bytes, b"logo-bytes");
    }

    #[test]
    fn test_single_exports_use_naming_contracts() {
        let fetcher = FakeFetcher::new(vec![]);
        let exporter = exporter(fetcher);
        let result = sample_result();

        let html = exporter.export_html(&result);
        assert!(html.filename.starts_with("page-") && html.filename.ends_with(".html"));
        assert_eq!(html.bytes, b"<html></html>");

        let text = exporter.export_text(&result);
        assert!(text.filename.starts_with("content-") && text.filename.ends_with(".txt"));
        assert_eq!(text.bytes, b"body text");

        let json = exporter.export_json(&result).unwrap();
        assert!(json.filename.starts_with("scraped-data-") && json.filename.ends_with(".json"));
    }
}
