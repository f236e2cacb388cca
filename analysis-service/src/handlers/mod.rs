//! HTTP handlers for the analysis API.

pub mod analyze;
pub mod chat;
pub mod health;
pub mod models;

pub use analyze::analyze_medical_image;
pub use chat::chat;
pub use health::{health_check, metrics_endpoint, not_found};
pub use models::list_models;
