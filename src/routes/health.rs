use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use crate::triggers::TriggerService;
use crate::utils::{ApiResponse, ApiError};

#[openapi(tag = "Health")]
#[get("/health")]
pub async fn health(
    triggers: &State<TriggerService>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    triggers.ping().await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "status": "ok"
    }))))
}
