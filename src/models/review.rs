use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(
        rename = "_id",
        default,
        deserialize_with = "crate::models::id::deserialize_document_id",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<String>")]
    pub id: Option<String>,
    #[serde(default)]
    pub worker_id: Option<String>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub job_id: Option<String>,
    pub rating: f64, // 1-5
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Review {
    /// Worker id, treating an empty string the same as a missing field.
    pub fn worker(&self) -> Option<&str> {
        self.worker_id.as_deref().filter(|id| !id.is_empty())
    }

    /// The (jobId, customerId) pair a review is unique on, when both are set.
    pub fn uniqueness_key(&self) -> Option<(&str, &str)> {
        let job_id = self.job_id.as_deref().filter(|id| !id.is_empty())?;
        let customer_id = self.customer_id.as_deref().filter(|id| !id.is_empty())?;
        Some((job_id, customer_id))
    }
}
