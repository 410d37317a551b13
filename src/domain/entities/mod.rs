//! Core business entities.

pub mod principal;
pub mod url_mapping;
pub mod user;
pub mod webhook;

pub use principal::Principal;
pub use url_mapping::{NewUrlMapping, UrlMapping};
pub use user::{DuplicateStrategy, NotificationSettings, Tier, User};
pub use webhook::{DeliveryOutcome, WebhookEvent, WebhookJob};
