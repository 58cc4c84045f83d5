use actix_web::{web, HttpResponse};
use tracing::Instrument;
use validator::Validate;

use crate::models::{AssignVolunteerRequest, TransitionRequest};
use crate::routes::{ApiError, AppState};

/// Configure aid-request lifecycle routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/requests/{id}/assign", web::post().to(assign_volunteer))
        .route("/requests/{id}/transition", web::post().to(transition_request))
        .route("/requests/{id}/unassign", web::post().to(unassign_request));
}

/// Assign a volunteer to a pending request
///
/// POST /api/v1/requests/{id}/assign
///
/// Request body:
/// ```json
/// { "volunteerId": "string" }
/// ```
async fn assign_volunteer(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: web::Json<AssignVolunteerRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    let request_id = path.into_inner();
    let span = tracing::info_span!("assign_volunteer", op_id = %uuid::Uuid::new_v4(), request_id = %request_id);

    let request = state
        .coordinator
        .assign_volunteer(&request_id, &req.volunteer_id)
        .instrument(span)
        .await?;

    Ok(HttpResponse::Ok().json(request))
}

/// Move a request to another status
///
/// POST /api/v1/requests/{id}/transition
///
/// Request body:
/// ```json
/// { "status": "resolved|cancelled|pending|in-progress" }
/// ```
async fn transition_request(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: web::Json<TransitionRequest>,
) -> Result<HttpResponse, ApiError> {
    let request_id = path.into_inner();
    let span = tracing::info_span!("transition_request", op_id = %uuid::Uuid::new_v4(), request_id = %request_id);

    let request = state
        .coordinator
        .transition_request(&request_id, req.status)
        .instrument(span)
        .await?;

    Ok(HttpResponse::Ok().json(request))
}

/// Release the volunteer and return the request to pending
///
/// POST /api/v1/requests/{id}/unassign
async fn unassign_request(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let request_id = path.into_inner();
    let span = tracing::info_span!("unassign_request", op_id = %uuid::Uuid::new_v4(), request_id = %request_id);

    let request = state
        .coordinator
        .unassign_request(&request_id)
        .instrument(span)
        .await?;

    Ok(HttpResponse::Ok().json(request))
}
