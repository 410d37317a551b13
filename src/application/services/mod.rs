//! Application services orchestrating domain and infrastructure.

pub mod auth_service;
pub mod resolver;
pub mod url_service;

pub use auth_service::{AuthService, AuthenticatedUser};
pub use resolver::{ClickContext, Resolution, ResolverService};
pub use url_service::{
    AliasAvailability, CreateUrlCommand, CreateUrlOutcome, UrlService, UrlServiceConfig,
};
