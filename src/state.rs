//! Application state shared across HTTP handlers.
//!
//! Contains the services, cache handle, and redirect policy. Cloned for
//! each request via Axum's state extraction; cheap thanks to `Arc`
//! wrapping.

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::application::services::{AuthService, ResolverService, UrlService, UrlServiceConfig};
use crate::domain::click_event::ClickEvent;
use crate::domain::repositories::{UrlRepository, UserRepository};
use crate::infrastructure::cache::UrlCache;
use crate::infrastructure::notifier::Notifier;
use crate::utils::code_generator::CodeGenerator;

/// Shared application state injected into HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub url_service: Arc<UrlService>,
    pub resolver: Arc<ResolverService>,
    pub auth_service: Arc<AuthService>,

    pub cache: Arc<dyn UrlCache>,

    /// When true the redirect host answers 301 instead of 302.
    pub redirect_permanent: bool,
}

/// Wiring inputs that are plain values rather than components.
pub struct StateOptions {
    pub base_url: String,
    pub short_code_length: usize,
    pub short_code_max_attempts: u32,
    pub reserved_words: Vec<String>,
    pub token_signing_secret: String,
    pub redirect_permanent: bool,
}

impl AppState {
    /// Wires repositories, cache, and notifier into the service graph.
    ///
    /// # Arguments
    ///
    /// - `url_repository` / `user_repository` - storage access
    /// - `cache` - the composed cache (both tiers)
    /// - `notifier` - webhook enqueue handle
    /// - `click_sender` - channel into the click worker
    pub fn build(
        url_repository: Arc<dyn UrlRepository>,
        user_repository: Arc<dyn UserRepository>,
        cache: Arc<dyn UrlCache>,
        notifier: Notifier,
        click_sender: mpsc::Sender<ClickEvent>,
        options: StateOptions,
    ) -> Self {
        let codegen = Arc::new(CodeGenerator::new(
            options.short_code_length,
            &options.reserved_words,
        ));

        let auth_service = Arc::new(AuthService::new(
            user_repository.clone(),
            url_repository.clone(),
            options.token_signing_secret,
        ));

        let url_service = Arc::new(UrlService::new(
            url_repository.clone(),
            user_repository,
            cache.clone(),
            notifier,
            auth_service.clone(),
            codegen,
            UrlServiceConfig {
                base_url: options.base_url,
                max_generation_attempts: options.short_code_max_attempts,
            },
        ));

        let resolver = Arc::new(ResolverService::new(
            url_repository,
            cache.clone(),
            click_sender,
        ));

        Self {
            url_service,
            resolver,
            auth_service,
            cache,
            redirect_permanent: options.redirect_permanent,
        }
    }
}
