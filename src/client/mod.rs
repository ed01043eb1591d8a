pub mod api;
pub mod requests;
