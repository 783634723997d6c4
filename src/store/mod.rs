//! Database access for the trigger handlers.
//!
//! Handlers only ever talk to a [`DocumentStore`]; production wires in
//! [`MongoStore`], tests use the in-memory store.

#[cfg(test)]
pub mod memory;
pub mod mongo;

pub use mongo::MongoStore;

use crate::error::Result;
use crate::models::{RatingSummary, Review};

pub const REVIEWS: &str = "reviews";
pub const JOBS: &str = "jobs";
pub const WORKERS: &str = "workers";

#[rocket::async_trait]
pub trait DocumentStore: Send + Sync {
    async fn ping(&self) -> Result<()>;

    async fn reviews_for_worker(&self, worker_id: &str) -> Result<Vec<Review>>;

    /// Ids of every review of the job, including ones too malformed to decode.
    async fn review_ids_for_job(&self, job_id: &str) -> Result<Vec<String>>;

    async fn reviews_for_job_by_customer(
        &self,
        job_id: &str,
        customer_id: &str,
    ) -> Result<Vec<Review>>;

    async fn delete_review(&self, review_id: &str) -> Result<()>;

    /// Deletes every listed review or none of them. Returns the number deleted.
    async fn delete_reviews(&self, review_ids: &[String]) -> Result<u64>;

    /// Overwrites the worker's rating aggregate and stamps `updatedAt`.
    /// Fails with `WorkerNotFound` when the worker document is missing.
    async fn set_worker_rating(&self, worker_id: &str, summary: RatingSummary) -> Result<()>;

    /// Server-side `totalJobs += 1`; must not be a read-modify-write.
    async fn increment_completed_jobs(&self, worker_id: &str) -> Result<()>;
}
