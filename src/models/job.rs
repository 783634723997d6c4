use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;

pub const JOB_STATUS_COMPLETED: &str = "completed";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    #[serde(
        rename = "_id",
        default,
        deserialize_with = "crate::models::id::deserialize_document_id",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<String>")]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>, // "pending", "in_progress", "completed", ...
    #[serde(default)]
    pub worker_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Job {
    pub fn is_completed(&self) -> bool {
        self.status.as_deref() == Some(JOB_STATUS_COMPLETED)
    }

    pub fn worker(&self) -> Option<&str> {
        self.worker_id.as_deref().filter(|id| !id.is_empty())
    }
}
