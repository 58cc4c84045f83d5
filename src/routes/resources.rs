use actix_web::{web, HttpResponse};
use tracing::Instrument;

use crate::models::{MatchResponse, OccupancyChangeRequest};
use crate::routes::{ApiError, AppState};

/// Configure donation and shelter routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/donations/{id}/match", web::post().to(match_donation))
        .route("/shelters/{id}/occupancy", web::post().to(change_occupancy));
}

/// Link an available donation to the best pending ask
///
/// POST /api/v1/donations/{id}/match
///
/// Responds 200 with `matched: false` when no ask qualifies.
async fn match_donation(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let donation_id = path.into_inner();
    let span = tracing::info_span!("match_donation", op_id = %uuid::Uuid::new_v4(), donation_id = %donation_id);

    let outcome = state
        .coordinator
        .match_donation(&donation_id)
        .instrument(span)
        .await?;

    Ok(HttpResponse::Ok().json(MatchResponse {
        matched: outcome.ask.is_some(),
        donation: outcome.donation,
        ask: outcome.ask,
    }))
}

/// Book or release places at a shelter
///
/// POST /api/v1/shelters/{id}/occupancy
///
/// Request body:
/// ```json
/// { "delta": 2 }
/// ```
async fn change_occupancy(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: web::Json<OccupancyChangeRequest>,
) -> Result<HttpResponse, ApiError> {
    let shelter_id = path.into_inner();
    let span = tracing::info_span!(
        "apply_occupancy_change",
        op_id = %uuid::Uuid::new_v4(),
        shelter_id = %shelter_id,
        delta = req.delta
    );

    let shelter = state
        .coordinator
        .apply_occupancy_change(&shelter_id, req.delta)
        .instrument(span)
        .await?;

    Ok(HttpResponse::Ok().json(shelter))
}
