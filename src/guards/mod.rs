pub mod signature;

pub use signature::{SignedJson, TriggerSecret, SIGNATURE_HEADER};
