use actix_cors::Cors;
use actix_files as fs;
use actix_web::{middleware, web, App, HttpServer};
use clap::Parser;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use scrapeview::api::{self, AppState};
use scrapeview::archive::{ArchiveBuilder, ArchiveFactory, UnavailableArchiveBuilder, ZipArchiveBuilder};
use scrapeview::client::ScrapeClient;
use scrapeview::config::AppConfig;
use scrapeview::export::Exporter;
use scrapeview::fetch::{HttpImageFetcher, ImageFetcher};
use scrapeview::state::SessionState;

#[derive(Parser, Debug)]
#[command(name = "scrapeview", about = "Scraped-page viewer and export server")]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured bind host
    #[arg(long)]
    host: Option<String>,

    /// Override the configured bind port
    #[arg(long)]
    port: Option<u16>,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::load(path).unwrap_or_else(|e| {
            log::error!("{:#}", e);
            std::process::exit(1);
        }),
        None => AppConfig::default(),
    };
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let client = ScrapeClient::new(&config.upstream.scrape_url, config.upstream.timeout_secs)
        .expect("Failed to create scrape client");
    let fetcher: Arc<dyn ImageFetcher> = Arc::new(
        HttpImageFetcher::new(config.export.image_fetch_timeout_secs)
            .expect("Failed to create image fetcher"),
    );

    let archives: Arc<ArchiveFactory> = if config.export.archive_enabled {
        Arc::new(|| Box::new(ZipArchiveBuilder::new()) as Box<dyn ArchiveBuilder>)
    } else {
        log::warn!("Archive support disabled; exports will use fallback paths");
        Arc::new(|| Box::new(UnavailableArchiveBuilder) as Box<dyn ArchiveBuilder>)
    };

    let exporter = Arc::new(Exporter::new(
        fetcher.clone(),
        archives,
        Duration::from_millis(config.export.fallback_delay_ms),
    ));

    let state = web::Data::new(AppState {
        session: Arc::new(Mutex::new(SessionState::new())),
        client: Arc::new(client),
        exporter,
        fetcher,
    });

    let (host, port) = (config.server.host.clone(), config.server.port);

    log::info!("🚀 Starting Scrapeview");
    log::info!("🌐 Server running at http://{}:{}", host, port);
    log::info!("🔗 Upstream scraper: {}", config.upstream.scrape_url);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .wrap(cors)
            // Scrape contract
            .route("/scrape", web::post().to(api::scrape_handler))
            // API routes
            .route("/api/health", web::get().to(api::health_check))
            .route("/api/clear", web::post().to(api::clear_handler))
            .route("/api/links", web::get().to(api::links_handler))
            .route("/api/images", web::get().to(api::images_handler))
            .route("/api/text", web::get().to(api::text_handler))
            .route("/api/html", web::get().to(api::html_handler))
            .route("/api/selection", web::post().to(api::selection_handler))
            .route("/api/view", web::get().to(api::get_view_handler))
            .route("/api/view", web::post().to(api::set_view_handler))
            .route("/api/image-size", web::get().to(api::image_size_handler))
            // Exports
            .route("/api/export/html", web::get().to(api::export_html_handler))
            .route("/api/export/text", web::get().to(api::export_text_handler))
            .route("/api/export/json", web::get().to(api::export_json_handler))
            .route("/api/export/image", web::get().to(api::export_image_handler))
            .route("/api/export/images", web::post().to(api::export_images_handler))
            .route("/api/export/all", web::post().to(api::export_all_handler))
            // Serve static files
            .service(fs::Files::new("/static", "./static").show_files_listing())
            // Serve index.html at root
            .route("/", web::get().to(|| async {
                actix_files::NamedFile::open_async("./static/index.html").await
            }))
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
