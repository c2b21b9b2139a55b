use serde::{Deserialize, Serialize};

/// One snapshot of a scraped page, exactly as the scraping service
/// returns it. Field names follow the upstream JSON (camelCase).
///
/// A snapshot is immutable once received: filtering and search operate
/// on borrowed views of `links`/`images`, never on the arrays themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeResult {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub text_content: String,
    #[serde(default)]
    pub headings: Vec<Heading>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub metadata: Vec<MetaTag>,
    #[serde(default)]
    pub open_graph: Vec<OpenGraphTag>,
    #[serde(default)]
    pub fetch_time: String,
    #[serde(default)]
    pub content_size: String,
    #[serde(default)]
    pub title_length: usize,
    #[serde(default)]
    pub links_count: usize,
    #[serde(default)]
    pub images_count: usize,
    #[serde(default)]
    pub headings_count: usize,
    #[serde(default)]
    pub word_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub text: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub src: String,
    #[serde(default)]
    pub alt: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaTag {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenGraphTag {
    pub property: String,
    pub content: String,
}

/// Characters shown in the content summary before truncation.
pub const SUMMARY_LENGTH: usize = 500;

impl ScrapeResult {
    /// Leading slice of the extracted text for the overview card,
    /// with an ellipsis when the text was cut.
    pub fn content_summary(&self) -> String {
        let text = &self.text_content;
        if text.chars().count() <= SUMMARY_LENGTH {
            return text.clone();
        }
        let cut: String = text.chars().take(SUMMARY_LENGTH).collect();
        format!("{}...", cut)
    }
}
