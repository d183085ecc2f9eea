pub mod admin;
pub mod api;
pub mod events;
pub mod models;
pub mod query;
