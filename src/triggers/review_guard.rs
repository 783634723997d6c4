use log::{error, info, warn};

use super::{TriggerOutcome, TriggerService};
use crate::error::{Result, TriggerError};
use crate::models::{DocumentWrite, Review};

impl TriggerService {
    /// `reviews/{reviewId}` any write. On create, retracts the new review if
    /// the customer had already reviewed the job.
    ///
    /// The duplicate has already been committed when this runs, so two
    /// reviews created at the same instant can both be retracted.
    pub async fn on_review_written(
        &self,
        review_id: &str,
        write: &DocumentWrite<Review>,
    ) -> Result<TriggerOutcome> {
        let review = match (&write.before, &write.after) {
            (None, Some(review)) => review,
            (None, None) => {
                return Err(TriggerError::MalformedEvent(
                    "write event needs a before or after image".to_string(),
                ));
            }
            _ => return Ok(TriggerOutcome::skipped("not a create")),
        };

        let Some((job_id, customer_id)) = review.uniqueness_key() else {
            warn!(
                "Review {} is missing jobId or customerId, skipping duplicate check",
                review_id
            );
            return Ok(TriggerOutcome::skipped("review has no jobId/customerId"));
        };

        self.reject_duplicate(review_id, job_id, customer_id)
            .await
            .inspect_err(|e| error!("Error validating review: {}", e))
    }

    async fn reject_duplicate(
        &self,
        review_id: &str,
        job_id: &str,
        customer_id: &str,
    ) -> Result<TriggerOutcome> {
        let existing = self
            .store
            .reviews_for_job_by_customer(job_id, customer_id)
            .await?;

        if existing.len() > 1 {
            info!("Duplicate review detected for job {}, deleting...", job_id);
            self.store.delete_review(review_id).await?;
            return Err(TriggerError::AlreadyExists {
                job_id: job_id.to_string(),
                customer_id: customer_id.to_string(),
            });
        }

        Ok(TriggerOutcome::ReviewAccepted {
            review_id: review_id.to_string(),
        })
    }
}
