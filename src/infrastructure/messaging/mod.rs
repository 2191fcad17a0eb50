//! Messaging service implementations

mod http;
mod outbox;

pub use http::HttpMessagingService;
pub use outbox::OutboxMessagingService;
