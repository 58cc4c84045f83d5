use actix_web::{web, HttpResponse};
use serde::Serialize;
use serde_json::Value;
use validator::Validate;

use crate::models::{ConsistencyResponse, HealthResponse, NearbyQuery, NearbyResponse, Ranked};
use crate::routes::{ApiError, AppState};
use crate::services::CacheKey;

/// Configure read-only views over the projection
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/nearby/{kind}", web::get().to(nearby))
        .route("/panic", web::get().to(panic_requests))
        .route("/consistency", web::get().to(consistency));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let generation = state.projection.read().await.generation();

    // Nothing has arrived from the store yet
    let status = if generation == 0 { "starting" } else { "healthy" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        generation,
        timestamp: chrono::Utc::now(),
    })
}

fn render<T: Serialize>(results: Vec<Ranked<T>>, generation: u64) -> Result<Value, ApiError> {
    let response = NearbyResponse {
        total_results: results.len(),
        results,
        generation,
    };
    Ok(serde_json::to_value(response)?)
}

/// Ranked entities within reach of a point
///
/// GET /api/v1/nearby/{requests|donations|shelters}?lat=..&lng=..&radiusKm=..&category=..
///
/// Requests are pending ones, donations are available ones, shelters are the
/// ones that are not full. Nearest first.
async fn nearby(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<NearbyQuery>,
) -> Result<HttpResponse, ApiError> {
    query.validate()?;
    let kind = path.into_inner();
    let observer = query.observer();
    let radius_km = query.radius_km.unwrap_or(state.default_radius_km);
    let category = query.category;

    let cache_key = |generation: u64| {
        CacheKey::nearby(&kind, generation, observer.lat, observer.lng, radius_km, category.map(|c| c.as_str()))
    };

    let generation = state.projection.read().await.generation();
    if let Ok(cached) = state.cache.get::<Value>(&cache_key(generation)).await {
        return Ok(HttpResponse::Ok().json(cached));
    }

    let projection = state.projection.read().await;
    // A batch may have landed since the lookup; key on what is rendered
    let generation = projection.generation();
    let body = match kind.as_str() {
        "requests" => {
            let mut results = projection.pending_requests_near(observer, radius_km);
            if let Some(category) = category {
                results.retain(|r| r.item.category == category);
            }
            render(results, generation)?
        }
        "donations" => render(projection.available_donations_near(observer, radius_km, category), generation)?,
        "shelters" => render(projection.shelters_with_space_near(observer, radius_km), generation)?,
        other => {
            return Err(ApiError::Validation(format!(
                "unknown view `{}`, expected one of: requests, donations, shelters",
                other
            )))
        }
    };
    drop(projection);

    let key = cache_key(generation);
    if let Err(e) = state.cache.set(&key, &body).await {
        tracing::warn!("Failed to cache nearby view {}: {}", key, e);
    }

    Ok(HttpResponse::Ok().json(body))
}

/// Open panic requests, oldest first
///
/// GET /api/v1/panic
async fn panic_requests(state: web::Data<AppState>) -> HttpResponse {
    let projection = state.projection.read().await;
    let panics = projection.panic_requests();

    HttpResponse::Ok().json(serde_json::json!({
        "results": panics,
        "totalResults": panics.len(),
        "generation": projection.generation(),
    }))
}

/// Cross-entity links that do not currently hold
///
/// GET /api/v1/consistency
///
/// Collections are delivered independently, so a short-lived mismatch right
/// after a match is expected; a persistent one is not.
async fn consistency(state: web::Data<AppState>) -> HttpResponse {
    let generation = state.projection.read().await.generation();
    if let Ok(cached) = state.cache.get::<Value>(&CacheKey::consistency(generation)).await {
        return HttpResponse::Ok().json(cached);
    }

    let projection = state.projection.read().await;
    let generation = projection.generation();
    let issues = projection.validate_links();
    drop(projection);

    if !issues.is_empty() {
        tracing::debug!("{} link issues at generation {}", issues.len(), generation);
    }

    let response = ConsistencyResponse {
        generation,
        consistent: issues.is_empty(),
        issues,
    };

    let key = CacheKey::consistency(generation);
    if let Err(e) = state.cache.set(&key, &response).await {
        tracing::warn!("Failed to cache consistency report {}: {}", key, e);
    }

    HttpResponse::Ok().json(response)
}
