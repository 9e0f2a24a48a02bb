use actix_cors::Cors;
use actix_web::{web, App, HttpServer, HttpResponse, middleware, error, http::StatusCode};
use partner_map::config::{DirectoryKind, Settings};
use partner_map::core::{LocationResolver, MapBuilder};
use partner_map::routes::{self, map::AppState};
use partner_map::services::{
    CachedDirectory, DirectorySource, HttpIpLocator, NominatimGeocoder, PostgresDirectory,
    SessionStore, StaticDirectory,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, error};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle path parameter errors (e.g. a malformed session id)
pub fn handle_path_error(err: error::PathError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_path".to_string(),
        message: format!("Invalid path parameter: {}", err),
        status_code: 400,
    }
    .into()
}

fn startup_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    error!("{}: {}", context, err);
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, err))
}

async fn open_directory(settings: &Settings) -> std::io::Result<Arc<dyn DirectorySource>> {
    let directory = &settings.directory;

    match directory.source {
        DirectoryKind::Postgres => {
            let url = directory
                .database_url
                .as_deref()
                .ok_or_else(|| startup_error("Directory configuration error", "database_url is required for the postgres source"))?;
            let max_conn = directory.max_connections.unwrap_or(10);
            let min_conn = directory.min_connections.unwrap_or(1);

            let postgres = PostgresDirectory::new(url, max_conn, min_conn)
                .await
                .map_err(|e| startup_error("Failed to connect to PostgreSQL", e))?;

            info!("PostgreSQL directory initialized (max: {} connections)", max_conn);

            Ok(Arc::new(CachedDirectory::new(
                Arc::new(postgres),
                Duration::from_secs(directory.cache_ttl_secs),
            )))
        }
        DirectoryKind::Static => {
            let static_directory = StaticDirectory::from_file(&directory.static_path)
                .map_err(|e| startup_error("Failed to load static directory", e))?;
            Ok(Arc::new(static_directory))
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Load configuration before logging; [logging] configures the subscriber
    let loaded = Settings::load();
    let logging = loaded
        .as_ref()
        .map(|settings| settings.logging.clone())
        .unwrap_or_default()
        .with_env_overrides();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true);

    if logging.is_pretty() {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }

    info!("Starting partner map service...");

    let settings = loaded.map_err(|e| startup_error("Failed to load configuration", e))?;
    let policy = settings
        .region
        .policy()
        .map_err(|e| startup_error("Invalid region configuration", e))?;

    info!("Configuration loaded successfully (region policy: {:?})", policy);

    let directory = open_directory(&settings).await?;

    // Location providers
    let geocoder = NominatimGeocoder::new(
        settings.geocoder.endpoint.clone(),
        &settings.geocoder.user_agent,
        Duration::from_secs(settings.geocoder.timeout_secs),
    )
    .map_err(|e| startup_error("Failed to create geocoder client", e))?;

    let ip_locator = HttpIpLocator::new(
        settings.ip_locator.endpoint.clone(),
        Duration::from_secs(settings.ip_locator.timeout_secs),
    )
    .map_err(|e| startup_error("Failed to create IP locator client", e))?;

    let resolver = LocationResolver::new(
        Arc::new(geocoder),
        Arc::new(ip_locator),
        policy,
        settings.geocoder.bias_suffix.clone(),
    );

    info!("Location resolver initialized (geocoder: {})", settings.geocoder.endpoint);

    let sessions = SessionStore::new(
        settings.sessions.max_sessions,
        Duration::from_secs(settings.sessions.idle_secs),
    );

    // Build application state
    let app_state = AppState {
        directory,
        resolver,
        sessions,
        map_builder: MapBuilder::new(settings.map.graph_options()),
        default_radius: settings.map.default_radius,
        default_unit: settings.map.default_unit,
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::PathConfig::default().error_handler(handle_path_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
