/// Gallery Tokens - access token manager for a client photo gallery
///
/// Issues per-client tokens into a JSON store read by the static gallery,
/// keeps rotating backups of that store and reports on gallery usage.

pub mod backup;
pub mod config;
pub mod error;
pub mod reports;
pub mod shell;
pub mod store;
pub mod tokens;

pub use config::GalleryConfig;
pub use error::{GalleryError, GalleryResult};
