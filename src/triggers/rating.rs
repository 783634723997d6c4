use log::{error, info, warn};

use super::{TriggerOutcome, TriggerService};
use crate::error::Result;
use crate::models::{DocumentUpdate, RatingSummary, Review};

/// What to write when a worker turns out to have no reviews.
#[derive(Debug, Clone, Copy)]
enum WhenEmpty {
    /// The triggering review should have matched; leave the worker alone.
    Skip,
    /// The last review is gone; reset the aggregate.
    Reset,
}

impl TriggerService {
    /// `reviews/{reviewId}` create.
    pub async fn on_review_created(&self, review_id: &str, review: &Review) -> Result<TriggerOutcome> {
        let Some(worker_id) = review.worker() else {
            warn!("Review {} has no workerId, skipping rating update", review_id);
            return Ok(TriggerOutcome::skipped("review has no workerId"));
        };

        self.recompute_rating(worker_id, WhenEmpty::Skip)
            .await
            .inspect_err(|e| error!("Error updating worker rating: {}", e))
    }

    /// `reviews/{reviewId}` update. Only a changed rating triggers a recount.
    pub async fn on_review_updated(
        &self,
        review_id: &str,
        update: &DocumentUpdate<Review>,
    ) -> Result<TriggerOutcome> {
        if update.before.rating == update.after.rating {
            return Ok(TriggerOutcome::skipped("rating unchanged"));
        }

        let Some(worker_id) = update.after.worker() else {
            warn!("Review {} has no workerId, skipping rating update", review_id);
            return Ok(TriggerOutcome::skipped("review has no workerId"));
        };

        self.recompute_rating(worker_id, WhenEmpty::Skip)
            .await
            .inspect_err(|e| error!("Error updating worker rating: {}", e))
    }

    /// Review update whose before-image is unavailable (pre-images off or
    /// expired). The rating may have changed, so recount as on create.
    pub async fn on_review_changed(&self, review_id: &str, review: &Review) -> Result<TriggerOutcome> {
        self.on_review_created(review_id, review).await
    }

    /// `reviews/{reviewId}` delete, given the review's before-image.
    pub async fn on_review_deleted(&self, review_id: &str, review: &Review) -> Result<TriggerOutcome> {
        let Some(worker_id) = review.worker() else {
            warn!("Deleted review {} had no workerId, skipping rating update", review_id);
            return Ok(TriggerOutcome::skipped("review has no workerId"));
        };

        self.recompute_rating(worker_id, WhenEmpty::Reset)
            .await
            .inspect_err(|e| error!("Error updating worker rating after deletion: {}", e))
    }

    /// Full recount from the reviews collection; never an incremental delta.
    async fn recompute_rating(&self, worker_id: &str, when_empty: WhenEmpty) -> Result<TriggerOutcome> {
        let reviews = self.store.reviews_for_worker(worker_id).await?;

        let summary = match RatingSummary::from_ratings(reviews.iter().map(|r| r.rating)) {
            Some(summary) => summary,
            None => match when_empty {
                WhenEmpty::Skip => {
                    info!("No reviews found for worker: {}", worker_id);
                    return Ok(TriggerOutcome::skipped("no reviews found for worker"));
                }
                WhenEmpty::Reset => RatingSummary::empty(),
            },
        };

        self.store.set_worker_rating(worker_id, summary).await?;

        info!(
            "Updated worker {} rating: {:.2} ({} reviews)",
            worker_id, summary.avg_rating, summary.rating_count
        );

        Ok(TriggerOutcome::RatingUpdated {
            worker_id: worker_id.to_string(),
            avg_rating: summary.avg_rating,
            rating_count: summary.rating_count,
        })
    }
}
