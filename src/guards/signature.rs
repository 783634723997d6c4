use std::ops::Deref;

use hmac::{Hmac, Mac};
use log::warn;
use rocket::data::{self, Data, FromData, ToByteUnit};
use rocket::http::Status;
use rocket::outcome::Outcome;
use rocket::Request;
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::RequestBody;
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::request::OpenApiFromData;
use rocket::serde::json::Json;
use serde::de::DeserializeOwned;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Trigger-Signature";

/// Secret the trigger runner signs request bodies with. `None` accepts
/// unsigned invocations.
#[derive(Debug, Clone, Default)]
pub struct TriggerSecret(pub Option<String>);

/// JSON body of a trigger invocation, checked against `X-Trigger-Signature`
/// (hex HMAC-SHA256 of the raw body) when a secret is configured.
#[derive(Debug)]
pub struct SignedJson<T>(pub T);

impl<T> Deref for SignedJson<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

pub fn verify_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };

    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

#[rocket::async_trait]
impl<'r, T: DeserializeOwned> FromData<'r> for SignedJson<T> {
    type Error = String;

    async fn from_data(req: &'r Request<'_>, data: Data<'r>) -> data::Outcome<'r, Self> {
        let limit = req.limits().get("json").unwrap_or(1.mebibytes());
        let body = match data.open(limit).into_bytes().await {
            Ok(body) if body.is_complete() => body.into_inner(),
            Ok(_) => {
                return Outcome::Error((Status::PayloadTooLarge, "Trigger payload too large".to_string()));
            }
            Err(e) => return Outcome::Error((Status::BadRequest, e.to_string())),
        };

        let secret = req
            .rocket()
            .state::<TriggerSecret>()
            .and_then(|secret| secret.0.as_deref());

        if let Some(secret) = secret {
            let signature = req.headers().get_one(SIGNATURE_HEADER).unwrap_or_default();
            if !verify_signature(secret, &body, signature) {
                warn!("Rejected unsigned or mis-signed trigger call to {}", req.uri());
                return Outcome::Error((Status::Unauthorized, "Invalid trigger signature".to_string()));
            }
        }

        match serde_json::from_slice(&body) {
            Ok(value) => Outcome::Success(SignedJson(value)),
            Err(e) => Outcome::Error((Status::BadRequest, format!("Malformed event: {}", e))),
        }
    }
}

/// Documents the body as the plain JSON payload it wraps.
impl<'r, T: DeserializeOwned + JsonSchema> OpenApiFromData<'r> for SignedJson<T> {
    fn request_body(generator: &mut OpenApiGenerator) -> rocket_okapi::Result<RequestBody> {
        <Json<T> as OpenApiFromData<'r>>::request_body(generator)
    }
}
