//! MongoDB change-stream source for the trigger handlers.
//!
//! Needs a replica set, and `changeStreamPreAndPostImages` enabled on
//! `reviews` and `jobs` for update and delete events to carry a before-image.

use std::time::Duration;

use log::{error, info, warn};
use mongodb::bson::{self, Document};
use mongodb::change_stream::event::{OperationType, ResumeToken};
use mongodb::options::{ChangeStreamOptions, FullDocumentBeforeChangeType, FullDocumentType};
use mongodb::Collection;
use rocket::fairing::AdHoc;
use rocket::futures::TryStreamExt;
use serde::de::DeserializeOwned;

use super::TriggerService;
use crate::config::Config;
use crate::error::Result;
use crate::models::id::bson_id;
use crate::models::{DocumentUpdate, DocumentWrite, Job, Review};
use crate::store::{MongoStore, JOBS, REVIEWS};

const RESTART_DELAY: Duration = Duration::from_secs(5);

/// Routes one decoded change (kind, id, before, after) to its handlers.
type Dispatch = fn(&TriggerService, ChangeKind, &str, Option<Document>, Option<Document>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    fn from_operation(operation: &OperationType) -> Option<Self> {
        match operation {
            OperationType::Insert => Some(ChangeKind::Insert),
            OperationType::Update | OperationType::Replace => Some(ChangeKind::Update),
            OperationType::Delete => Some(ChangeKind::Delete),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReviewInvocation {
    Created { review_id: String, review: Review },
    Updated { review_id: String, update: DocumentUpdate<Review> },
    /// Update that arrived without a before-image.
    Changed { review_id: String, review: Review },
    Deleted { review_id: String, review: Review },
    Written { review_id: String, write: DocumentWrite<Review> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobInvocation {
    Updated { job_id: String, update: DocumentUpdate<Job> },
    Deleted { job_id: String },
}

/// Starts the listener after launch when `change_streams` is enabled.
pub fn fairing() -> AdHoc {
    AdHoc::on_liftoff("Change stream listener", |rocket| {
        Box::pin(async move {
            if !Config::change_streams_enabled() {
                info!("Change stream listener disabled");
                return;
            }

            match (rocket.state::<MongoStore>(), rocket.state::<TriggerService>()) {
                (Some(store), Some(service)) => spawn(store, service),
                _ => warn!("Change stream listener needs a MongoDB store, not starting"),
            }
        })
    })
}

pub fn spawn(store: &MongoStore, service: &TriggerService) {
    tokio::spawn(watch(store.reviews(), service.clone(), dispatch_review));
    tokio::spawn(watch(store.jobs(), service.clone(), dispatch_job));
}

fn stream_options(resume_after: Option<ResumeToken>) -> ChangeStreamOptions {
    ChangeStreamOptions::builder()
        .full_document(Some(FullDocumentType::UpdateLookup))
        .full_document_before_change(Some(FullDocumentBeforeChangeType::WhenAvailable))
        .resume_after(resume_after)
        .build()
}

/// Keeps a change stream open for the life of the process. A failed or
/// closed stream is reopened after `RESTART_DELAY`, resuming after the last
/// event seen.
async fn watch(collection: Collection<Document>, service: TriggerService, dispatch: Dispatch) {
    let mut resume_token = None;

    loop {
        match consume(&collection, &service, dispatch, &mut resume_token).await {
            Ok(()) => warn!("Change stream on {} closed", collection.name()),
            Err(e) => error!("Change stream on {} failed: {}", collection.name(), e),
        }
        info!(
            "Reopening change stream on {} in {}s",
            collection.name(),
            RESTART_DELAY.as_secs()
        );
        tokio::time::sleep(RESTART_DELAY).await;
    }
}

async fn consume(
    collection: &Collection<Document>,
    service: &TriggerService,
    dispatch: Dispatch,
    resume_token: &mut Option<ResumeToken>,
) -> Result<()> {
    let mut stream = collection
        .watch(Vec::<Document>::new(), stream_options(resume_token.clone()))
        .await?;
    info!("Watching {} for changes", collection.name());

    while let Some(event) = stream.try_next().await? {
        if matches!(event.operation_type, OperationType::Invalidate) {
            // An invalidated stream cannot be resumed; start fresh.
            *resume_token = None;
            return Ok(());
        }
        *resume_token = stream.resume_token();

        let Some(kind) = ChangeKind::from_operation(&event.operation_type) else {
            continue;
        };
        let Some(id) = event
            .document_key
            .as_ref()
            .and_then(|key| key.get("_id"))
            .and_then(bson_id)
        else {
            warn!("Change on {} without a usable document key, ignoring", collection.name());
            continue;
        };

        dispatch(
            service,
            kind,
            &id,
            event.full_document_before_change,
            event.full_document,
        );
    }

    Ok(())
}

/// Decodes one document image. A document that does not fit the model is
/// logged and treated as absent so one bad write cannot stop the stream.
pub fn decode<T: DeserializeOwned>(collection: &str, id: &str, image: Option<Document>) -> Option<T> {
    let image = image?;
    match bson::from_document(image) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!("Skipping undecodable {} document {}: {}", collection, id, e);
            None
        }
    }
}

fn dispatch_review(
    service: &TriggerService,
    kind: ChangeKind,
    review_id: &str,
    before: Option<Document>,
    after: Option<Document>,
) {
    let before = decode(REVIEWS, review_id, before);
    let after = decode(REVIEWS, review_id, after);

    for invocation in review_invocations(kind, review_id, before, after) {
        tokio::spawn(run_review(service.clone(), invocation));
    }
}

fn dispatch_job(
    service: &TriggerService,
    kind: ChangeKind,
    job_id: &str,
    before: Option<Document>,
    after: Option<Document>,
) {
    let before = decode(JOBS, job_id, before);
    let after = decode(JOBS, job_id, after);

    if let Some(invocation) = job_invocation(kind, job_id, before, after) {
        tokio::spawn(run_job(service.clone(), invocation));
    }
}

/// Maps one review change onto the handlers bound to `reviews/{reviewId}`.
pub fn review_invocations(
    kind: ChangeKind,
    review_id: &str,
    before: Option<Review>,
    after: Option<Review>,
) -> Vec<ReviewInvocation> {
    let review_id = review_id.to_string();

    // The write handler only sees a change whose images prove what it is:
    // an update missing its before-image must not look like a create.
    let (rating, write) = match (kind, before, after) {
        (ChangeKind::Insert, _, Some(review)) => (
            ReviewInvocation::Created {
                review_id: review_id.clone(),
                review: review.clone(),
            },
            Some(DocumentWrite {
                before: None,
                after: Some(review),
            }),
        ),
        (ChangeKind::Update, Some(before), Some(after)) => (
            ReviewInvocation::Updated {
                review_id: review_id.clone(),
                update: DocumentUpdate {
                    before: before.clone(),
                    after: after.clone(),
                },
            },
            Some(DocumentWrite {
                before: Some(before),
                after: Some(after),
            }),
        ),
        (ChangeKind::Update, None, Some(review)) => (
            ReviewInvocation::Changed {
                review_id: review_id.clone(),
                review,
            },
            None,
        ),
        (ChangeKind::Delete, Some(review), _) => (
            ReviewInvocation::Deleted {
                review_id: review_id.clone(),
                review: review.clone(),
            },
            Some(DocumentWrite {
                before: Some(review),
                after: None,
            }),
        ),
        (kind, _, _) => {
            warn!(
                "Review {} {:?} change is missing a document image, skipping",
                review_id, kind
            );
            return Vec::new();
        }
    };

    let mut invocations = vec![rating];
    if let Some(write) = write {
        invocations.push(ReviewInvocation::Written { review_id, write });
    }
    invocations
}

/// Maps one job change onto the handlers bound to `jobs/{jobId}`.
pub fn job_invocation(
    kind: ChangeKind,
    job_id: &str,
    before: Option<Job>,
    after: Option<Job>,
) -> Option<JobInvocation> {
    match (kind, before, after) {
        (ChangeKind::Update, Some(before), Some(after)) => Some(JobInvocation::Updated {
            job_id: job_id.to_string(),
            update: DocumentUpdate { before, after },
        }),
        (ChangeKind::Update, _, _) => {
            warn!("Job {} update is missing a document image, skipping", job_id);
            None
        }
        (ChangeKind::Delete, _, _) => Some(JobInvocation::Deleted {
            job_id: job_id.to_string(),
        }),
        (ChangeKind::Insert, _, _) => None,
    }
}

// Handlers log their own failures; nothing here retries.
async fn run_review(service: TriggerService, invocation: ReviewInvocation) {
    let result = match &invocation {
        ReviewInvocation::Created { review_id, review } => {
            service.on_review_created(review_id, review).await
        }
        ReviewInvocation::Updated { review_id, update } => {
            service.on_review_updated(review_id, update).await
        }
        ReviewInvocation::Changed { review_id, review } => {
            service.on_review_changed(review_id, review).await
        }
        ReviewInvocation::Deleted { review_id, review } => {
            service.on_review_deleted(review_id, review).await
        }
        ReviewInvocation::Written { review_id, write } => {
            service.on_review_written(review_id, write).await
        }
    };

    if let Err(e) = result {
        warn!("Review trigger failed for {:?}: {}", invocation, e);
    }
}

async fn run_job(service: TriggerService, invocation: JobInvocation) {
    let result = match &invocation {
        JobInvocation::Updated { job_id, update } => service.on_job_updated(job_id, update).await,
        JobInvocation::Deleted { job_id } => service.on_job_deleted(job_id).await,
    };

    if let Err(e) = result {
        warn!("Job trigger failed for {:?}: {}", invocation, e);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::memory::MemoryStore;
    use mongodb::bson::{doc, oid::ObjectId};

    fn review(rating: f64) -> Review {
        Review {
            id: Some("r1".to_string()),
            worker_id: Some("w1".to_string()),
            customer_id: Some("c1".to_string()),
            job_id: Some("j1".to_string()),
            rating,
            comment: None,
        }
    }

    fn job(status: &str) -> Job {
        Job {
            id: Some("j1".to_string()),
            status: Some(status.to_string()),
            worker_id: Some("w1".to_string()),
            customer_id: None,
            title: None,
        }
    }

    #[test]
    fn change_with_object_id_decodes() {
        let oid = ObjectId::new();
        let image = doc! {
            "_id": oid,
            "workerId": "w1",
            "customerId": "c1",
            "jobId": "j1",
            "rating": 5,
        };

        assert_eq!(bson_id(image.get("_id").unwrap()), Some(oid.to_hex()));
        let review: Review = decode(REVIEWS, &oid.to_hex(), Some(image)).unwrap();
        assert_eq!(review.id, Some(oid.to_hex()));
        assert_eq!(review.rating, 5.0);
    }

    #[test]
    fn undecodable_image_is_dropped() {
        let bad = doc! { "_id": "r1", "workerId": "w1", "rating": "five" };
        assert_eq!(decode::<Review>(REVIEWS, "r1", Some(bad)), None);

        let numeric_id = doc! { "_id": 7, "status": "completed" };
        assert_eq!(decode::<Job>(JOBS, "7", Some(numeric_id)), None);

        assert_eq!(decode::<Review>(REVIEWS, "r1", None), None);
    }

    #[test]
    fn insert_fires_create_and_write() {
        let invocations = review_invocations(ChangeKind::Insert, "r1", None, Some(review(4.0)));

        assert_eq!(invocations.len(), 2);
        assert!(matches!(&invocations[0], ReviewInvocation::Created { review_id, .. } if review_id == "r1"));
        match &invocations[1] {
            ReviewInvocation::Written { write, .. } => assert!(write.is_create()),
            other => panic!("unexpected invocation {:?}", other),
        }
    }

    #[test]
    fn update_without_before_image_recounts_and_skips_guard() {
        let invocations = review_invocations(ChangeKind::Update, "r1", None, Some(review(5.0)));

        assert_eq!(
            invocations,
            vec![ReviewInvocation::Changed {
                review_id: "r1".to_string(),
                review: review(5.0),
            }]
        );
    }

    #[test]
    fn update_with_both_images_fires_update_and_write() {
        let invocations = review_invocations(
            ChangeKind::Update,
            "r1",
            Some(review(3.0)),
            Some(review(5.0)),
        );

        assert_eq!(invocations.len(), 2);
        assert!(matches!(
            &invocations[0],
            ReviewInvocation::Updated { update, .. } if update.before.rating == 3.0 && update.after.rating == 5.0
        ));
        match &invocations[1] {
            ReviewInvocation::Written { write, .. } => assert!(!write.is_create()),
            other => panic!("unexpected invocation {:?}", other),
        }
    }

    #[test]
    fn delete_uses_before_image() {
        let invocations = review_invocations(ChangeKind::Delete, "r1", Some(review(2.0)), None);

        assert_eq!(invocations.len(), 2);
        assert!(matches!(
            &invocations[0],
            ReviewInvocation::Deleted { review, .. } if review.rating == 2.0
        ));
    }

    #[test]
    fn changes_missing_their_images_fire_nothing() {
        assert!(review_invocations(ChangeKind::Delete, "r1", None, None).is_empty());
        assert!(review_invocations(ChangeKind::Update, "r1", Some(review(3.0)), None).is_empty());
        assert!(review_invocations(ChangeKind::Insert, "r1", None, None).is_empty());
    }

    #[tokio::test]
    async fn edited_review_survives_update_without_before_image() {
        let store = Arc::new(MemoryStore::new());
        store.insert_worker("w1");
        let service = TriggerService::new(store.clone());

        let mut first = review(5.0);
        first.id = None;
        store.insert_review("r1", first);
        // An older duplicate for the same (job, customer) pair gets edited.
        let edited = store.insert_review("r2", review(2.0));

        for invocation in review_invocations(ChangeKind::Update, "r2", None, Some(edited)) {
            run_review(service.clone(), invocation).await;
        }

        let mut ids = store.review_ids();
        ids.sort();
        assert_eq!(ids, vec!["r1".to_string(), "r2".to_string()]);

        let worker = store.worker("w1").unwrap();
        assert_eq!(worker.avg_rating, 3.5);
        assert_eq!(worker.rating_count, 2);
    }

    #[test]
    fn job_changes_map_to_handlers() {
        let update = job_invocation(
            ChangeKind::Update,
            "j1",
            Some(job("in_progress")),
            Some(job("completed")),
        );
        assert!(matches!(update, Some(JobInvocation::Updated { .. })));

        assert_eq!(
            job_invocation(ChangeKind::Delete, "j1", None, None),
            Some(JobInvocation::Deleted {
                job_id: "j1".to_string()
            })
        );
        assert_eq!(job_invocation(ChangeKind::Insert, "j1", None, Some(job("pending"))), None);
        assert_eq!(job_invocation(ChangeKind::Update, "j1", None, Some(job("completed"))), None);
    }
}
