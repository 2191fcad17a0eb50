//! Webhook domain module for signed HTTP event notifications

mod entity;
mod error;
mod repository;
pub mod signature;

pub use entity::*;
pub use error::WebhookError;
pub use repository::*;
