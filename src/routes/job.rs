use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use crate::guards::SignedJson;
use crate::models::{DocumentUpdate, Job};
use crate::triggers::{TriggerOutcome, TriggerService};
use crate::utils::{ApiResponse, ApiError};

#[openapi(tag = "Job Triggers")]
#[post("/triggers/jobs/<job_id>/update", data = "<change>")]
pub async fn job_updated(
    triggers: &State<TriggerService>,
    job_id: String,
    change: SignedJson<DocumentUpdate<Job>>,
) -> Result<Json<ApiResponse<TriggerOutcome>>, ApiError> {
    let outcome = triggers.on_job_updated(&job_id, &change).await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// Body is the job as it was before deletion. Only its signature is checked;
/// reviews are matched on the path id.
#[openapi(tag = "Job Triggers")]
#[post("/triggers/jobs/<job_id>/delete", data = "<_before>")]
pub async fn job_deleted(
    triggers: &State<TriggerService>,
    job_id: String,
    _before: SignedJson<serde_json::Value>,
) -> Result<Json<ApiResponse<TriggerOutcome>>, ApiError> {
    let outcome = triggers.on_job_deleted(&job_id).await?;
    Ok(Json(ApiResponse::success(outcome)))
}
