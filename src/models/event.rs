use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;

/// Before/after images of a document that existed on both sides of an update.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct DocumentUpdate<T> {
    pub before: T,
    pub after: T,
}

/// Images of any write: create has no `before`, delete has no `after`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct DocumentWrite<T> {
    pub before: Option<T>,
    pub after: Option<T>,
}

impl<T> DocumentWrite<T> {
    pub fn is_create(&self) -> bool {
        self.before.is_none() && self.after.is_some()
    }
}
