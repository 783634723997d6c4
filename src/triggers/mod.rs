//! Trigger handlers that keep worker aggregates in step with reviews and jobs.
//!
//! Every handler is stateless: it reads what it needs from the store, writes
//! once, and returns. Concurrent invocations share nothing but the database.

pub mod listener;
mod jobs;
mod rating;
mod review_guard;


use std::sync::Arc;

use rocket_okapi::okapi::schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::DocumentStore;

/// What a handler did. Returned to the caller for observability only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum TriggerOutcome {
    #[serde(rename_all = "camelCase")]
    RatingUpdated {
        worker_id: String,
        avg_rating: f64,
        rating_count: i64,
    },
    #[serde(rename_all = "camelCase")]
    ReviewAccepted { review_id: String },
    #[serde(rename_all = "camelCase")]
    JobCounted { worker_id: String },
    #[serde(rename_all = "camelCase")]
    ReviewsDeleted { job_id: String, count: u64 },
    Skipped { reason: String },
}

impl TriggerOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        TriggerOutcome::Skipped {
            reason: reason.into(),
        }
    }
}

#[derive(Clone)]
pub struct TriggerService {
    store: Arc<dyn DocumentStore>,
}

impl TriggerService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        TriggerService { store }
    }

    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }
}
