use actix_web::{web, HttpResponse, Result};
use serde::Deserialize;
use std::sync::{Arc, Mutex};

use crate::classify::classify;
use crate::client::ScrapeClient;
use crate::export::{Artifact, DatasetExport, Exporter, ImagesExport};
use crate::fetch::ImageFetcher;
use crate::filter::{
    display_window, filter_images_by_search, filter_links, filter_links_by_search, highlight,
    LinkFilter,
};
use crate::format::format_html;
use crate::state::{SessionState, ViewState};
use crate::utils::format_file_size;

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Mutex<SessionState>>,
    pub client: Arc<ScrapeClient>,
    pub exporter: Arc<Exporter>,
    pub fetcher: Arc<dyn ImageFetcher>,
}

#[derive(Debug, Deserialize)]
pub struct ScrapeBody {
    pub url: String,
    #[serde(rename = "usePlaywright", default)]
    pub use_playwright: bool,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct LinksQuery {
    #[serde(default)]
    pub filter: LinkFilter,
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct HtmlQuery {
    #[serde(default)]
    pub pretty: bool,
}

#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    pub src: String,
    #[serde(default)]
    pub alt: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", tag = "action")]
pub enum SelectionAction {
    Select { src: String },
    Deselect { src: String },
    SelectAll { srcs: Vec<String> },
    DeselectAll,
}

fn error_json(message: &str) -> serde_json::Value {
    serde_json::json!({ "error": message })
}

fn attachment(artifact: Artifact) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(artifact.mime)
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", artifact.filename),
        ))
        .body(artifact.bytes)
}

pub async fn health_check() -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "scrapeview"
    })))
}

/// `POST /scrape`: forward to the scraping service and install the
/// result. An empty URL is rejected before anything goes upstream;
/// upstream errors surface verbatim. A response superseded by a newer
/// submission still goes back to its caller but does not overwrite
/// the current result.
pub async fn scrape_handler(
    state: web::Data<AppState>,
    body: web::Json<ScrapeBody>,
) -> Result<HttpResponse> {
    let url = body.url.trim().to_string();
    if url.is_empty() {
        return Ok(HttpResponse::BadRequest().json(error_json("URL is required")));
    }

    let token = state.session.lock().unwrap().begin_request();

    match state.client.scrape(&url, body.use_playwright).await {
        Ok(result) => {
            let installed = state
                .session
                .lock()
                .unwrap()
                .install_result(token, result.clone());
            log::info!(
                "Scraped {}: {} links, {} images{}",
                result.url,
                result.links_count,
                result.images_count,
                if installed { "" } else { " (superseded)" }
            );
            Ok(HttpResponse::Ok().json(result))
        }
        Err(e) => {
            log::error!("Scrape failed for {}: {}", url, e);
            Ok(HttpResponse::BadGateway().json(error_json(&e.to_string())))
        }
    }
}

pub async fn clear_handler(state: web::Data<AppState>) -> Result<HttpResponse> {
    state.session.lock().unwrap().clear();
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Results cleared" })))
}

/// Filtered link table rows. Classification and search both apply;
/// the 100-row cap is display metadata, the totals always reflect the
/// full filtered set.
pub async fn links_handler(
    state: web::Data<AppState>,
    query: web::Query<LinksQuery>,
) -> Result<HttpResponse> {
    let session = state.session.lock().unwrap();
    let Some(result) = session.current() else {
        return Ok(HttpResponse::NotFound().json(error_json("No scrape result available")));
    };

    let by_mode = filter_links(&result.links, query.filter, &result.url);
    let owned: Vec<_> = by_mode.into_iter().cloned().collect();
    let filtered = filter_links_by_search(&owned, &query.q);
    let (shown, remainder) = display_window(&filtered);

    let rows: Vec<_> = shown
        .iter()
        .map(|link| {
            serde_json::json!({
                "text": link.text,
                "url": link.url,
                "type": classify(&link.url, &result.url).as_str(),
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "total": filtered.len(),
        "remainder": remainder,
        "links": rows,
    })))
}

pub async fn images_handler(
    state: web::Data<AppState>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse> {
    let session = state.session.lock().unwrap();
    let Some(result) = session.current() else {
        return Ok(HttpResponse::NotFound().json(error_json("No scrape result available")));
    };

    let filtered = filter_images_by_search(&result.images, &query.q);
    let rows: Vec<_> = filtered
        .iter()
        .map(|image| {
            serde_json::json!({
                "src": image.src,
                "alt": image.alt,
                "width": image.width,
                "height": image.height,
                "selected": session.selection().contains(&image.src),
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "total": result.images.len(),
        "images": rows,
    })))
}

pub async fn text_handler(
    state: web::Data<AppState>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse> {
    let session = state.session.lock().unwrap();
    let Some(result) = session.current() else {
        return Ok(HttpResponse::NotFound().json(error_json("No scrape result available")));
    };

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "text": highlight(&result.text_content, &query.q),
        "summary": result.content_summary(),
    })))
}

pub async fn html_handler(
    state: web::Data<AppState>,
    query: web::Query<HtmlQuery>,
) -> Result<HttpResponse> {
    let session = state.session.lock().unwrap();
    let Some(result) = session.current() else {
        return Ok(HttpResponse::NotFound().json(error_json("No scrape result available")));
    };

    let html = if query.pretty {
        format_html(&result.html)
    } else {
        result.html.clone()
    };

    Ok(HttpResponse::Ok().json(serde_json::json!({ "html": html })))
}

pub async fn selection_handler(
    state: web::Data<AppState>,
    body: web::Json<SelectionAction>,
) -> Result<HttpResponse> {
    let mut session = state.session.lock().unwrap();
    if session.current().is_none() {
        return Ok(HttpResponse::NotFound().json(error_json("No scrape result available")));
    }

    match body.into_inner() {
        SelectionAction::Select { src } => session.selection_mut().select(&src),
        SelectionAction::Deselect { src } => session.selection_mut().deselect(&src),
        SelectionAction::SelectAll { srcs } => session.selection_mut().select_all(&srcs),
        SelectionAction::DeselectAll => session.selection_mut().deselect_all(),
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "selected": session.selection().count(),
    })))
}

pub async fn get_view_handler(state: web::Data<AppState>) -> Result<HttpResponse> {
    let session = state.session.lock().unwrap();
    Ok(HttpResponse::Ok().json(session.view()))
}

pub async fn set_view_handler(
    state: web::Data<AppState>,
    body: web::Json<ViewState>,
) -> Result<HttpResponse> {
    let mut session = state.session.lock().unwrap();
    *session.view_mut() = body.into_inner();
    Ok(HttpResponse::Ok().json(session.view()))
}

/// HEAD probe of an image URL. A failed probe is a recovered asset
/// error: size comes back null, never a 5xx.
pub async fn image_size_handler(
    state: web::Data<AppState>,
    query: web::Query<ImageQuery>,
) -> Result<HttpResponse> {
    match state.fetcher.probe_size(&query.src).await {
        Ok(Some(size)) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "size": size,
            "formatted": format_file_size(size),
        }))),
        Ok(None) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "size": null,
            "formatted": "Unknown",
        }))),
        Err(e) => {
            log::error!("Size probe failed for {}: {}", query.src, e);
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "size": null,
                "formatted": "Unknown",
            })))
        }
    }
}

pub async fn export_html_handler(state: web::Data<AppState>) -> Result<HttpResponse> {
    let session = state.session.lock().unwrap();
    let Some(result) = session.current() else {
        return Ok(HttpResponse::NotFound().json(error_json("No data to download")));
    };
    Ok(attachment(state.exporter.export_html(result)))
}

pub async fn export_text_handler(state: web::Data<AppState>) -> Result<HttpResponse> {
    let session = state.session.lock().unwrap();
    let Some(result) = session.current() else {
        return Ok(HttpResponse::NotFound().json(error_json("No data to download")));
    };
    Ok(attachment(state.exporter.export_text(result)))
}

pub async fn export_json_handler(state: web::Data<AppState>) -> Result<HttpResponse> {
    let session = state.session.lock().unwrap();
    let Some(result) = session.current() else {
        return Ok(HttpResponse::NotFound().json(error_json("No data to download")));
    };
    match state.exporter.export_json(result) {
        Ok(artifact) => Ok(attachment(artifact)),
        Err(e) => {
            log::error!("JSON export failed: {}", e);
            Ok(HttpResponse::InternalServerError().json(error_json("Export failed")))
        }
    }
}

pub async fn export_image_handler(
    state: web::Data<AppState>,
    query: web::Query<ImageQuery>,
) -> Result<HttpResponse> {
    match state.exporter.export_image(&query.src, &query.alt).await {
        Ok(artifact) => Ok(attachment(artifact)),
        Err(e) => {
            log::error!("Image export failed for {}: {}", query.src, e);
            Ok(HttpResponse::BadGateway().json(error_json(&e.to_string())))
        }
    }
}

/// Selected-images archive. The fetch loop runs outside the session
/// lock; a selection changed mid-export keeps the list the export
/// started with.
pub async fn export_images_handler(state: web::Data<AppState>) -> Result<HttpResponse> {
    let selected = {
        let session = state.session.lock().unwrap();
        if session.current().is_none() {
            return Ok(HttpResponse::NotFound().json(error_json("No scrape result available")));
        }
        session.selection().to_vec()
    };

    if selected.is_empty() {
        return Ok(HttpResponse::BadRequest().json(error_json(
            "Please select at least one image to download",
        )));
    }

    match state.exporter.export_selected_images(&selected).await {
        ImagesExport::Archive {
            artifact,
            succeeded,
            failed,
        } => {
            log::info!("Images archive built: {} ok, {} failed", succeeded, failed);
            let mut response = HttpResponse::Ok();
            response
                .content_type(artifact.mime)
                .insert_header((
                    "Content-Disposition",
                    format!("attachment; filename=\"{}\"", artifact.filename),
                ))
                .insert_header(("X-Images-Succeeded", succeeded.to_string()))
                .insert_header(("X-Images-Failed", failed.to_string()));
            Ok(response.body(artifact.bytes))
        }
        ImagesExport::Singles { downloads, delay } => {
            log::info!(
                "Archive capability unavailable, falling back to {} individual downloads",
                downloads.len()
            );
            let files: Vec<_> = downloads
                .iter()
                .map(|d| serde_json::json!({ "url": d.url, "filename": d.filename }))
                .collect();
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "fallback": "individual",
                "delayMs": delay.as_millis() as u64,
                "downloads": files,
            })))
        }
        ImagesExport::NoneSucceeded { failed } => Ok(HttpResponse::Ok().json(serde_json::json!({
            "success": false,
            "message": "No images could be downloaded",
            "failed": failed,
        }))),
    }
}

/// Full-dataset archive: JSON + page source + text + up to 20
/// selected images, or the JSON-only fallback.
pub async fn export_all_handler(state: web::Data<AppState>) -> Result<HttpResponse> {
    let (result, selected) = {
        let session = state.session.lock().unwrap();
        let Some(result) = session.current() else {
            return Ok(HttpResponse::NotFound().json(error_json("No data to download")));
        };
        (result.clone(), session.selection().to_vec())
    };

    match state.exporter.export_full_dataset(&result, &selected).await {
        Ok(DatasetExport::Archive(artifact)) => Ok(attachment(artifact)),
        Ok(DatasetExport::JsonOnly(artifact)) => {
            log::info!("Archive capability unavailable, exporting JSON only");
            Ok(attachment(artifact))
        }
        Err(e) => {
            log::error!("Dataset export failed: {}", e);
            Ok(HttpResponse::InternalServerError().json(error_json("Export failed")))
        }
    }
}
