/// Sources module
///
/// Where bearer tokens come from.
pub mod auth;

pub use auth::{FetchToken, TdxAuthSource};
