use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, Bson, Document};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

/// Reads an `_id` that may be a string or an ObjectId (the driver default)
/// into the string form handlers pass around. ObjectIds become their hex.
pub fn deserialize_document_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Bson>::deserialize(deserializer)? {
        None | Some(Bson::Null) => Ok(None),
        Some(id) => bson_id(&id)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("unsupported _id {}", id))),
    }
}

pub fn bson_id(id: &Bson) -> Option<String> {
    match id {
        Bson::String(id) => Some(id.clone()),
        Bson::ObjectId(oid) => Some(oid.to_hex()),
        _ => None,
    }
}

/// Candidate `_id` values for a string id: the string itself, plus the
/// ObjectId it spells when it is 24 hex digits.
pub fn id_candidates(id: &str) -> Vec<Bson> {
    let mut candidates = vec![Bson::String(id.to_string())];
    if let Ok(oid) = ObjectId::parse_str(id) {
        candidates.push(Bson::ObjectId(oid));
    }
    candidates
}

/// `_id` filter matching a document stored under either id form.
pub fn id_filter(id: &str) -> Document {
    doc! { "_id": { "$in": id_candidates(id) } }
}
