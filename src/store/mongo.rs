use log::warn;
use mongodb::bson::{self, doc, Bson, Document};
use mongodb::options::FindOptions;
use mongodb::{Client, Collection, Database};
use rocket::futures::TryStreamExt;

use super::{DocumentStore, JOBS, REVIEWS, WORKERS};
use crate::error::{Result, TriggerError};
use crate::models::id::{bson_id, id_candidates, id_filter};
use crate::models::{RatingSummary, Review};

#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, database_name: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).await?;

        // Test connection
        client
            .database("admin")
            .run_command(doc! {"ping": 1}, None)
            .await?;

        let db = client.database(database_name);
        Ok(MongoStore { client, db })
    }

    /// Raw documents; each is decoded on its own so one bad review cannot
    /// poison a whole query or change stream.
    pub fn reviews(&self) -> Collection<Document> {
        self.db.collection::<Document>(REVIEWS)
    }

    pub fn jobs(&self) -> Collection<Document> {
        self.db.collection::<Document>(JOBS)
    }

    fn workers(&self) -> Collection<Document> {
        self.db.collection::<Document>(WORKERS)
    }

    async fn find_reviews(&self, filter: Document) -> Result<Vec<Review>> {
        let documents: Vec<Document> = self
            .reviews()
            .find(filter, None)
            .await?
            .try_collect()
            .await?;

        Ok(documents.into_iter().filter_map(decode_review).collect())
    }

    async fn update_worker(&self, worker_id: &str, update: Document) -> Result<()> {
        let result = self
            .workers()
            .update_one(id_filter(worker_id), update, None)
            .await?;

        if result.matched_count == 0 {
            return Err(TriggerError::WorkerNotFound(worker_id.to_string()));
        }
        Ok(())
    }
}

/// Decodes one stored review, logging and dropping it when it is malformed
/// (for example a missing or non-numeric `rating`).
fn decode_review(document: Document) -> Option<Review> {
    let id = document.get("_id").and_then(bson_id).unwrap_or_default();
    match bson::from_document::<Review>(document) {
        Ok(review) => Some(review),
        Err(e) => {
            warn!("Skipping undecodable review {}: {}", id, e);
            None
        }
    }
}

#[rocket::async_trait]
impl DocumentStore for MongoStore {
    async fn ping(&self) -> Result<()> {
        self.db.run_command(doc! {"ping": 1}, None).await?;
        Ok(())
    }

    async fn reviews_for_worker(&self, worker_id: &str) -> Result<Vec<Review>> {
        self.find_reviews(doc! { "workerId": worker_id }).await
    }

    async fn review_ids_for_job(&self, job_id: &str) -> Result<Vec<String>> {
        let options = FindOptions::builder().projection(doc! { "_id": 1 }).build();
        let documents: Vec<Document> = self
            .reviews()
            .find(doc! { "jobId": job_id }, options)
            .await?
            .try_collect()
            .await?;

        Ok(documents
            .iter()
            .filter_map(|document| document.get("_id").and_then(bson_id))
            .collect())
    }

    async fn reviews_for_job_by_customer(
        &self,
        job_id: &str,
        customer_id: &str,
    ) -> Result<Vec<Review>> {
        self.find_reviews(doc! { "jobId": job_id, "customerId": customer_id })
            .await
    }

    async fn delete_review(&self, review_id: &str) -> Result<()> {
        self.reviews().delete_one(id_filter(review_id), None).await?;
        Ok(())
    }

    async fn delete_reviews(&self, review_ids: &[String]) -> Result<u64> {
        if review_ids.is_empty() {
            return Ok(0);
        }

        let candidates: Vec<Bson> = review_ids
            .iter()
            .flat_map(|id| id_candidates(id))
            .collect();

        // Dropping the session without committing aborts the transaction.
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let result = self
            .reviews()
            .delete_many_with_session(
                doc! { "_id": { "$in": candidates } },
                None,
                &mut session,
            )
            .await?;

        session.commit_transaction().await?;
        Ok(result.deleted_count)
    }

    async fn set_worker_rating(&self, worker_id: &str, summary: RatingSummary) -> Result<()> {
        self.update_worker(
            worker_id,
            doc! {
                "$set": {
                    "avgRating": summary.avg_rating,
                    "ratingCount": summary.rating_count,
                },
                "$currentDate": { "updatedAt": true },
            },
        )
        .await
    }

    async fn increment_completed_jobs(&self, worker_id: &str) -> Result<()> {
        self.update_worker(
            worker_id,
            doc! {
                "$inc": { "totalJobs": 1 },
                "$currentDate": { "updatedAt": true },
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::oid::ObjectId;

    #[test]
    fn malformed_reviews_are_dropped_not_fatal() {
        let oid = ObjectId::new();
        let good = doc! { "_id": oid, "workerId": "w1", "rating": 5 };
        let no_rating = doc! { "_id": "r2", "workerId": "w1" };
        let text_rating = doc! { "_id": "r3", "workerId": "w1", "rating": "five" };

        let reviews: Vec<Review> = [good, no_rating, text_rating]
            .into_iter()
            .filter_map(decode_review)
            .collect();

        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].id, Some(oid.to_hex()));
    }
}
