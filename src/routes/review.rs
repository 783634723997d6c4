use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use crate::guards::SignedJson;
use crate::models::{DocumentUpdate, DocumentWrite, Review};
use crate::triggers::{TriggerOutcome, TriggerService};
use crate::utils::{ApiResponse, ApiError};

#[openapi(tag = "Review Triggers")]
#[post("/triggers/reviews/<review_id>/create", data = "<review>")]
pub async fn review_created(
    triggers: &State<TriggerService>,
    review_id: String,
    review: SignedJson<Review>,
) -> Result<Json<ApiResponse<TriggerOutcome>>, ApiError> {
    let outcome = triggers.on_review_created(&review_id, &review).await?;
    Ok(Json(ApiResponse::success(outcome)))
}

#[openapi(tag = "Review Triggers")]
#[post("/triggers/reviews/<review_id>/update", data = "<change>")]
pub async fn review_updated(
    triggers: &State<TriggerService>,
    review_id: String,
    change: SignedJson<DocumentUpdate<Review>>,
) -> Result<Json<ApiResponse<TriggerOutcome>>, ApiError> {
    let outcome = triggers.on_review_updated(&review_id, &change).await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// Body is the review as it was before deletion.
#[openapi(tag = "Review Triggers")]
#[post("/triggers/reviews/<review_id>/delete", data = "<review>")]
pub async fn review_deleted(
    triggers: &State<TriggerService>,
    review_id: String,
    review: SignedJson<Review>,
) -> Result<Json<ApiResponse<TriggerOutcome>>, ApiError> {
    let outcome = triggers.on_review_deleted(&review_id, &review).await?;
    Ok(Json(ApiResponse::success(outcome)))
}

#[openapi(tag = "Review Triggers")]
#[post("/triggers/reviews/<review_id>/write", data = "<change>")]
pub async fn review_written(
    triggers: &State<TriggerService>,
    review_id: String,
    change: SignedJson<DocumentWrite<Review>>,
) -> Result<Json<ApiResponse<TriggerOutcome>>, ApiError> {
    let outcome = triggers.on_review_written(&review_id, &change).await?;
    Ok(Json(ApiResponse::success(outcome)))
}
