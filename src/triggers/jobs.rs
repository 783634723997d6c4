use log::{debug, error, info};

use super::{TriggerOutcome, TriggerService};
use crate::error::Result;
use crate::models::{DocumentUpdate, Job};

impl TriggerService {
    /// `jobs/{jobId}` update. Counts a job once, when it first becomes
    /// completed. Nothing is ever decremented.
    pub async fn on_job_updated(&self, job_id: &str, update: &DocumentUpdate<Job>) -> Result<TriggerOutcome> {
        if update.before.is_completed() || !update.after.is_completed() {
            return Ok(TriggerOutcome::skipped("status did not become completed"));
        }

        let Some(worker_id) = update.after.worker() else {
            info!("Completed job {} has no assigned worker", job_id);
            return Ok(TriggerOutcome::skipped("job has no workerId"));
        };

        self.store
            .increment_completed_jobs(worker_id)
            .await
            .inspect_err(|e| error!("Error updating job stats: {}", e))?;

        info!("Incremented total jobs for worker {}", worker_id);

        Ok(TriggerOutcome::JobCounted {
            worker_id: worker_id.to_string(),
        })
    }

    /// `jobs/{jobId}` delete. Removes the job's reviews in one atomic batch.
    pub async fn on_job_deleted(&self, job_id: &str) -> Result<TriggerOutcome> {
        self.delete_job_reviews(job_id)
            .await
            .inspect_err(|e| error!("Error cleaning up reviews: {}", e))
    }

    async fn delete_job_reviews(&self, job_id: &str) -> Result<TriggerOutcome> {
        let review_ids = self.store.review_ids_for_job(job_id).await?;

        if review_ids.is_empty() {
            info!("No reviews to delete for job: {}", job_id);
            return Ok(TriggerOutcome::skipped("no reviews for job"));
        }

        debug!("Deleting reviews {:?} for job {}", review_ids, job_id);

        let count = self.store.delete_reviews(&review_ids).await?;
        info!("Deleted {} reviews for job {}", count, job_id);

        Ok(TriggerOutcome::ReviewsDeleted {
            job_id: job_id.to_string(),
            count,
        })
    }
}
