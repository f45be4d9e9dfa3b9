/// Token Store
///
/// Persists every token record in a single JSON document that the gallery
/// front end reads directly.

pub mod models;
pub mod json_store;

pub use models::{Category, TokenMap, TokenRecord, MAX_VALIDITY_DAYS};
pub use json_store::{LoadOutcome, Recovery, StoreHealth, TokenStore};
