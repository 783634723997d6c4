use thiserror::Error;

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Worker not found: {0}")]
    WorkerNotFound(String),

    #[error("A review already exists for job {job_id} by customer {customer_id}")]
    AlreadyExists { job_id: String, customer_id: String },

    #[error("Malformed event: {0}")]
    MalformedEvent(String),
}

pub type Result<T> = std::result::Result<T, TriggerError>;
