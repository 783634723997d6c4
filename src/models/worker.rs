use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;

/// Derived projection of a worker's reviews and completed jobs. The document
/// itself is owned by the app; only these fields are written here.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Worker {
    #[serde(
        rename = "_id",
        default,
        deserialize_with = "crate::models::id::deserialize_document_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(default)]
    pub avg_rating: f64,
    #[serde(default)]
    pub rating_count: i64,
    #[serde(default)]
    pub total_jobs: i64,
    #[serde(default)]
    pub updated_at: Option<DateTime>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub avg_rating: f64,
    pub rating_count: i64,
}

impl RatingSummary {
    /// Summary written when a worker has no reviews left.
    pub fn empty() -> Self {
        RatingSummary {
            avg_rating: 0.0,
            rating_count: 0,
        }
    }

    /// Mean of `ratings` rounded to two decimals, or `None` for an empty set.
    pub fn from_ratings<I>(ratings: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let (total, count) = ratings
            .into_iter()
            .fold((0.0_f64, 0_i64), |(total, count), rating| (total + rating, count + 1));

        if count == 0 {
            return None;
        }

        Some(RatingSummary {
            avg_rating: round_to_cents(total / count as f64),
            rating_count: count,
        })
    }
}

/// Half-up rounding to two decimal places.
pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
