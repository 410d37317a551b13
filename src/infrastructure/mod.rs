//! Infrastructure: persistence, caching, analytics and webhook delivery.

pub mod analytics;
pub mod cache;
pub mod notifier;
pub mod persistence;
