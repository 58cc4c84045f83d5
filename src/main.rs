use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use relief_engine::config::{LoggingSettings, Settings};
use relief_engine::core::{
    DonationMatcher, FilterPolicy, OccupancyModel, Projection, ProximityFilter, ScorePolicy, SelectPolicy,
};
use relief_engine::models::Collection;
use relief_engine::routes::{self, AppState};
use relief_engine::services::{
    spawn_projection_feed, subscribe, AppwriteCollections, AppwriteStore, Coordinator, DocumentStore, RetryPolicy,
    ViewCache,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    #[serde(rename = "statusCode")]
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
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST)).json(self)
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

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

fn startup_error(what: &str, err: impl std::fmt::Display) -> std::io::Error {
    error!("{}: {}", what, err);
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", what, err))
}

/// LOG_LEVEL and LOG_FORMAT override the configured logging section
fn init_tracing(logging: &LoggingSettings) {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| logging.level.clone());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| logging.format.clone());
    let filter = EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Load configuration, then bring up logging from it
    let settings = Settings::load();
    init_tracing(settings.as_ref().map(|s| &s.logging).unwrap_or(&LoggingSettings::default()));

    info!("Starting relief engine...");

    let settings = settings.map_err(|e| startup_error("Failed to load configuration", e))?;

    info!("Configuration loaded successfully");

    // Initialize the store of record
    let collections = AppwriteCollections {
        requests: settings.collection.requests.clone(),
        donations: settings.collection.donations.clone(),
        asks: settings.collection.asks.clone(),
        shelters: settings.collection.shelters.clone(),
    };

    let store: Arc<dyn DocumentStore> = Arc::new(
        AppwriteStore::new(
            settings.appwrite.endpoint.clone(),
            settings.appwrite.api_key.clone(),
            settings.appwrite.project_id.clone(),
            settings.appwrite.database_id.clone(),
            collections,
            Duration::from_secs(settings.appwrite.timeout_secs.unwrap_or(10)),
        )
        .map_err(|e| startup_error("Failed to build Appwrite client", e))?,
    );

    info!("Appwrite store initialized");

    // Initialize matcher with configured policies
    let filter_policy = FilterPolicy::from_name(&settings.matching.filter_policy).unwrap_or_else(|| {
        warn!("Unknown filter policy {:?}, using category-match", settings.matching.filter_policy);
        FilterPolicy::default()
    });
    let score_policy = ScorePolicy::from_name(&settings.matching.score_policy).unwrap_or_else(|| {
        warn!("Unknown score policy {:?}, using uniform", settings.matching.score_policy);
        ScorePolicy::default()
    });
    let select_policy = SelectPolicy::from_name(&settings.matching.select_policy).unwrap_or_else(|| {
        warn!("Unknown select policy {:?}, using highest-score", settings.matching.select_policy);
        SelectPolicy::default()
    });
    let matcher = DonationMatcher::new(filter_policy, score_policy, select_policy);

    info!(
        "Matcher initialized with policies: {:?} / {:?} / {:?}",
        filter_policy, score_policy, select_policy
    );

    let occupancy = OccupancyModel::new(settings.occupancy.limited_threshold);
    let retry = RetryPolicy {
        max_attempts: settings.commit.max_attempts,
        backoff_base: Duration::from_millis(settings.commit.backoff_base_ms),
    };
    let coordinator = Arc::new(Coordinator::new(store.clone(), matcher, occupancy, retry));

    // Keep the projection fed from the store
    let projection = Arc::new(RwLock::new(Projection::new(
        ProximityFilter::new(settings.proximity.distance_decimals),
        occupancy,
    )));
    let poll_interval = Duration::from_millis(settings.sync.poll_interval_ms);

    for collection in Collection::ALL {
        let subscription = subscribe(store.clone(), collection, Vec::new(), poll_interval);
        spawn_projection_feed(projection.clone(), subscription);
    }

    let cache = Arc::new(ViewCache::new(settings.cache.max_entries, settings.cache.ttl_secs));

    info!(
        "View cache initialized ({} entries, TTL: {}s)",
        settings.cache.max_entries, settings.cache.ttl_secs
    );

    // Build application state
    let app_state = AppState {
        coordinator,
        projection,
        cache,
        default_radius_km: settings.proximity.default_radius_km,
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
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
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
