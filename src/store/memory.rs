//! In-memory document store for tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use mongodb::bson::DateTime;

use super::DocumentStore;
use crate::error::{Result, TriggerError};
use crate::models::{RatingSummary, Review, Worker};

#[derive(Debug, Default)]
pub struct MemoryStore {
    reviews: Mutex<BTreeMap<String, Review>>,
    workers: Mutex<BTreeMap<String, Worker>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_worker(&self, worker_id: &str) {
        let worker = Worker {
            id: Some(worker_id.to_string()),
            ..Worker::default()
        };
        self.workers
            .lock()
            .expect("lock")
            .insert(worker_id.to_string(), worker);
    }

    /// Stores a review the way the app would, before any trigger runs.
    pub fn insert_review(&self, review_id: &str, review: Review) -> Review {
        let review = Review {
            id: Some(review_id.to_string()),
            ..review
        };
        self.reviews
            .lock()
            .expect("lock")
            .insert(review_id.to_string(), review.clone());
        review
    }

    pub fn remove_review(&self, review_id: &str) -> Option<Review> {
        self.reviews.lock().expect("lock").remove(review_id)
    }

    pub fn worker(&self, worker_id: &str) -> Option<Worker> {
        self.workers.lock().expect("lock").get(worker_id).cloned()
    }

    pub fn review_ids(&self) -> Vec<String> {
        self.reviews.lock().expect("lock").keys().cloned().collect()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_read(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(TriggerError::Storage("injected read failure".to_string()));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(TriggerError::Storage("injected write failure".to_string()));
        }
        Ok(())
    }

    fn find_reviews(&self, predicate: impl Fn(&Review) -> bool) -> Result<Vec<Review>> {
        self.check_read()?;
        Ok(self
            .reviews
            .lock()
            .expect("lock")
            .values()
            .filter(|review| predicate(review))
            .cloned()
            .collect())
    }

    fn update_worker(&self, worker_id: &str, apply: impl FnOnce(&mut Worker)) -> Result<()> {
        self.check_write()?;
        let mut workers = self.workers.lock().expect("lock");
        let worker = workers
            .get_mut(worker_id)
            .ok_or_else(|| TriggerError::WorkerNotFound(worker_id.to_string()))?;
        apply(worker);
        worker.updated_at = Some(DateTime::now());
        Ok(())
    }
}

#[rocket::async_trait]
impl DocumentStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        self.check_read()
    }

    async fn reviews_for_worker(&self, worker_id: &str) -> Result<Vec<Review>> {
        self.find_reviews(|review| review.worker_id.as_deref() == Some(worker_id))
    }

    async fn review_ids_for_job(&self, job_id: &str) -> Result<Vec<String>> {
        let reviews = self.find_reviews(|review| review.job_id.as_deref() == Some(job_id))?;
        Ok(reviews.into_iter().filter_map(|review| review.id).collect())
    }

    async fn reviews_for_job_by_customer(
        &self,
        job_id: &str,
        customer_id: &str,
    ) -> Result<Vec<Review>> {
        self.find_reviews(|review| {
            review.job_id.as_deref() == Some(job_id)
                && review.customer_id.as_deref() == Some(customer_id)
        })
    }

    async fn delete_review(&self, review_id: &str) -> Result<()> {
        self.check_write()?;
        self.reviews.lock().expect("lock").remove(review_id);
        Ok(())
    }

    async fn delete_reviews(&self, review_ids: &[String]) -> Result<u64> {
        self.check_write()?;
        let mut reviews = self.reviews.lock().expect("lock");
        let deleted = review_ids
            .iter()
            .filter(|id| reviews.remove(id.as_str()).is_some())
            .count();
        Ok(deleted as u64)
    }

    async fn set_worker_rating(&self, worker_id: &str, summary: RatingSummary) -> Result<()> {
        self.update_worker(worker_id, |worker| {
            worker.avg_rating = summary.avg_rating;
            worker.rating_count = summary.rating_count;
        })
    }

    async fn increment_completed_jobs(&self, worker_id: &str) -> Result<()> {
        self.update_worker(worker_id, |worker| worker.total_jobs += 1)
    }
}
