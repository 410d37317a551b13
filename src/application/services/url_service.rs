//! URL mapping orchestration: create, update, delete, list, alias checks.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::services::auth_service::AuthService;
use crate::domain::entities::{
    DuplicateStrategy, NewUrlMapping, Principal, Tier, UrlMapping, WebhookEvent,
};
use crate::domain::repositories::{
    BulkDeleteOutcome, ListQuery, Page, UrlRepository, UserRepository,
};
use crate::error::AppError;
use crate::infrastructure::cache::UrlCache;
use crate::infrastructure::notifier::Notifier;
use crate::utils::code_generator::CodeGenerator;
use crate::utils::url_normalizer::{hash_url, normalize_url};

/// Expiry ceiling for anonymous mappings, in days.
const ANONYMOUS_MAX_TTL_DAYS: i64 = 7;

/// Alternatives offered alongside an alias conflict.
const ALIAS_SUGGESTION_COUNT: usize = 3;

/// Service-level knobs.
#[derive(Debug, Clone)]
pub struct UrlServiceConfig {
    /// Public origin used when composing `short_url`.
    pub base_url: String,
    /// Attempts of generate+insert before giving up.
    pub max_generation_attempts: u32,
}

/// Inputs for creating a mapping.
#[derive(Debug, Clone)]
pub struct CreateUrlCommand {
    pub long_url: String,
    pub custom_alias: Option<String>,
    pub expiry_days: Option<i64>,
}

/// A created (or reused) mapping.
#[derive(Debug, Clone)]
pub struct CreateUrlOutcome {
    pub mapping: UrlMapping,
    pub was_reused: bool,
}

/// Result of an alias availability probe.
#[derive(Debug, Clone)]
pub struct AliasAvailability {
    pub available: bool,
    pub suggestions: Vec<String>,
}

/// Orchestrates the allocator, repository, cache and notifier.
///
/// All mutations invalidate the cache after the repository commits, and
/// lifecycle webhooks are dispatched asynchronously so no caller waits on
/// outbound HTTP.
pub struct UrlService {
    repository: Arc<dyn UrlRepository>,
    users: Arc<dyn UserRepository>,
    cache: Arc<dyn UrlCache>,
    notifier: Notifier,
    auth: Arc<AuthService>,
    codegen: Arc<CodeGenerator>,
    config: UrlServiceConfig,
}

impl UrlService {
    pub fn new(
        repository: Arc<dyn UrlRepository>,
        users: Arc<dyn UserRepository>,
        cache: Arc<dyn UrlCache>,
        notifier: Notifier,
        auth: Arc<AuthService>,
        codegen: Arc<CodeGenerator>,
        config: UrlServiceConfig,
    ) -> Self {
        Self {
            repository,
            users,
            cache,
            notifier,
            auth,
            codegen,
            config,
        }
    }

    /// Constructs the public short URL for a code.
    pub fn short_url(&self, code: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), code)
    }

    /// Creates a short URL mapping.
    ///
    /// # Flow
    ///
    /// 1. Validate and normalize the long URL; compute the dedup hash
    /// 2. Custom alias: normalize, reject reserved words, fail on conflict
    /// 3. Generated code: apply the owner's duplicate strategy (reuse may
    ///    return an existing mapping), then draw+insert with retry
    /// 4. Compute expiry from explicit days, owner default, and tier caps
    /// 5. Invalidate the cache for the new code (displacing any negative
    ///    entry) and dispatch `url.created` asynchronously
    ///
    /// # Errors
    ///
    /// [`AppError::InvalidUrl`], [`AppError::InvalidAlias`],
    /// [`AppError::AliasTaken`], [`AppError::GenerationExhausted`].
    pub async fn create(
        &self,
        principal: &Principal,
        command: CreateUrlCommand,
    ) -> Result<CreateUrlOutcome, AppError> {
        let long_url = normalize_url(&command.long_url).map_err(|e| {
            AppError::invalid_url("Invalid URL", json!({ "reason": e.to_string() }))
        })?;
        let long_url_hash = hash_url(&long_url);

        let owner_id = principal.user_id();

        // Owner preferences feed the duplicate strategy and default TTL.
        let (duplicate_strategy, default_ttl_days) = match owner_id {
            Some(id) => {
                let user = self.users.find_by_id(id).await?.ok_or_else(|| {
                    AppError::unauthenticated("Unauthorized", json!({ "reason": "Unknown user" }))
                })?;
                (user.duplicate_strategy, user.default_ttl_days.map(i64::from))
            }
            None => (DuplicateStrategy::GenerateNew, None),
        };

        let expires_at =
            self.compute_expiry(principal.tier(), command.expiry_days, default_ttl_days)?;

        if let Some(alias) = command.custom_alias {
            return self
                .create_with_alias(owner_id, &alias, long_url, long_url_hash, expires_at)
                .await;
        }

        if duplicate_strategy == DuplicateStrategy::ReuseExisting
            && let Some(existing) = self
                .repository
                .find_active_by_hash(&long_url_hash, owner_id)
                .await?
        {
            return Ok(CreateUrlOutcome {
                mapping: existing,
                was_reused: true,
            });
        }

        self.create_with_generated_code(owner_id, long_url, long_url_hash, expires_at)
            .await
    }

    async fn create_with_alias(
        &self,
        owner_id: Option<Uuid>,
        alias: &str,
        long_url: String,
        long_url_hash: String,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<CreateUrlOutcome, AppError> {
        let code = self.codegen.normalize(alias).map_err(|e| {
            AppError::invalid_alias(e.to_string(), json!({ "reason": e.kind(), "alias": alias }))
        })?;

        // Friendlier conflict message than the raw unique violation; the
        // insert below still settles races authoritatively.
        if self.repository.find_by_code(&code).await?.is_some() {
            let suggestions = self.available_suggestions(&code).await?;
            return Err(AppError::alias_taken(
                "This alias is already in use",
                json!({ "alias": code, "suggestions": suggestions }),
            ));
        }

        let mapping = self
            .repository
            .create(NewUrlMapping {
                short_code: code.clone(),
                long_url,
                long_url_hash,
                owner_id,
                is_custom_alias: true,
                expires_at,
            })
            .await?;

        self.finish_create(&mapping).await;

        Ok(CreateUrlOutcome {
            mapping,
            was_reused: false,
        })
    }

    async fn create_with_generated_code(
        &self,
        owner_id: Option<Uuid>,
        long_url: String,
        long_url_hash: String,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<CreateUrlOutcome, AppError> {
        for attempt in 0..self.config.max_generation_attempts {
            let code = self.codegen.generate();

            match self
                .repository
                .create(NewUrlMapping {
                    short_code: code,
                    long_url: long_url.clone(),
                    long_url_hash: long_url_hash.clone(),
                    owner_id,
                    is_custom_alias: false,
                    expires_at,
                })
                .await
            {
                Ok(mapping) => {
                    self.finish_create(&mapping).await;
                    return Ok(CreateUrlOutcome {
                        mapping,
                        was_reused: false,
                    });
                }
                // A collision on a random draw: try a fresh code.
                Err(AppError::AliasTaken { .. }) => {
                    metrics::counter!("short_code_collisions_total").increment(1);
                    tracing::debug!(attempt, "Generated code collided, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        metrics::counter!("short_code_generation_exhausted_total").increment(1);
        Err(AppError::generation_exhausted(
            "Could not allocate a unique short code",
            json!({ "attempts": self.config.max_generation_attempts }),
        ))
    }

    /// Post-insert bookkeeping shared by both create paths.
    async fn finish_create(&self, mapping: &UrlMapping) {
        // Displace any negative cache entry left by lookups that predate
        // this code.
        self.cache.invalidate(&mapping.short_code).await;

        self.notifier.notify(
            mapping.owner_id,
            WebhookEvent::UrlCreated,
            json!({
                "short_code": mapping.short_code,
                "short_url": self.short_url(&mapping.short_code),
                "long_url": mapping.long_url,
                "is_custom_alias": mapping.is_custom_alias,
                "expires_at": mapping.expires_at,
            }),
        );
    }

    /// Applies the expiry policy.
    ///
    /// Explicit days win over the owner's default TTL; both are capped by
    /// the tier. When nothing is requested, tiers that permit it get no
    /// expiry and the rest get their cap.
    fn compute_expiry(
        &self,
        tier: Option<Tier>,
        explicit_days: Option<i64>,
        default_days: Option<i64>,
    ) -> Result<Option<DateTime<Utc>>, AppError> {
        let (max_days, allows_none) = match tier {
            None => (Some(ANONYMOUS_MAX_TTL_DAYS), false),
            Some(t) => (t.max_ttl_days(), t.allows_no_expiry()),
        };

        let requested = explicit_days.or(default_days);

        if let Some(days) = requested {
            if days <= 0 {
                return Err(AppError::invalid_url(
                    "Expiry must be at least one day",
                    json!({ "expiry_days": days }),
                ));
            }
            if let Some(max) = max_days
                && days > max
            {
                return Err(AppError::invalid_url(
                    "Expiry exceeds the maximum for your tier",
                    json!({ "expiry_days": days, "max_days": max }),
                ));
            }
            return Ok(Some(Utc::now() + ChronoDuration::days(days)));
        }

        if allows_none {
            Ok(None)
        } else {
            // The tier requires an expiry; fall back to its ceiling.
            let days = max_days.expect("tiers that forbid no-expiry carry a cap");
            Ok(Some(Utc::now() + ChronoDuration::days(days)))
        }
    }

    /// Replaces a mapping's expiry.
    ///
    /// Only the owner or an admin may do this. `None` clears the expiry,
    /// which only tiers that allow unexpiring links may request.
    pub async fn update_expiry(
        &self,
        principal: &Principal,
        code: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<UrlMapping, AppError> {
        let user = self.auth.require_auth(principal)?;
        self.auth.require_ownership(principal, code).await?;

        match expires_at {
            Some(t) if t <= Utc::now() => {
                return Err(AppError::invalid_url(
                    "Expiry must be in the future",
                    json!({ "expires_at": t }),
                ));
            }
            None if !user.is_admin && !user.tier.allows_no_expiry() => {
                return Err(AppError::invalid_url(
                    "Your tier does not allow links without expiry",
                    json!({ "tier": user.tier.as_str() }),
                ));
            }
            _ => {}
        }

        let mapping = self.repository.update_expiry(code, expires_at).await?;
        self.cache.invalidate(code).await;

        Ok(mapping)
    }

    /// Soft-deletes a mapping.
    ///
    /// Idempotent tail: deleting a code that is already gone reports
    /// `NotFound`. Cache invalidation happens after the commit either way.
    pub async fn delete(
        &self,
        principal: &Principal,
        code: &str,
    ) -> Result<DateTime<Utc>, AppError> {
        let mapping = self.auth.require_ownership(principal, code).await?;

        let deleted_at = self.repository.soft_delete(code).await?.ok_or_else(|| {
            // Lost a race with a concurrent delete.
            AppError::not_found("Short URL not found", json!({ "code": code }))
        })?;

        self.cache.invalidate(code).await;

        self.notifier.notify(
            mapping.owner_id,
            WebhookEvent::UrlDeleted,
            json!({
                "short_code": code,
                "long_url": mapping.long_url,
                "deleted_at": deleted_at,
            }),
        );

        Ok(deleted_at)
    }

    /// Soft-deletes a batch of the caller's mappings. Premium and above.
    ///
    /// Per-code outcomes; codes that are absent, already deleted, or owned
    /// by someone else are reported as failed. Admins operate unscoped.
    pub async fn bulk_delete(
        &self,
        principal: &Principal,
        codes: Vec<String>,
    ) -> Result<BulkDeleteOutcome, AppError> {
        let user = self.auth.require_auth(principal)?;
        self.auth.require_tier(principal, Tier::Premium)?;

        if codes.is_empty() {
            return Ok(BulkDeleteOutcome::default());
        }

        let owner_scope = if user.is_admin { None } else { Some(user.id) };
        let outcome = self.repository.bulk_soft_delete(&codes, owner_scope).await?;

        for code in &outcome.deleted {
            self.cache.invalidate(code).await;
            self.notifier.notify(
                Some(user.id),
                WebhookEvent::UrlDeleted,
                json!({ "short_code": code }),
            );
        }

        Ok(outcome)
    }

    /// Lists the caller's mappings.
    pub async fn list(
        &self,
        principal: &Principal,
        query: &ListQuery,
    ) -> Result<Page<UrlMapping>, AppError> {
        let user = self.auth.require_auth(principal)?;
        self.repository.list_by_owner(user.id, query).await
    }

    /// Fetches a mapping for API inspection (no access accounting).
    ///
    /// # Errors
    ///
    /// [`AppError::NotFound`] for unknown or soft-deleted codes,
    /// [`AppError::Gone`] for expired ones.
    pub async fn get_info(&self, code: &str) -> Result<UrlMapping, AppError> {
        let mapping = self.repository.find_by_code(code).await?.ok_or_else(|| {
            AppError::not_found("Short URL not found", json!({ "code": code }))
        })?;

        if mapping.is_expired() {
            return Err(AppError::gone(
                "This short URL has expired",
                json!({ "code": code }),
            ));
        }

        Ok(mapping)
    }

    /// Probes alias availability.
    ///
    /// Reserved or taken aliases come back unavailable with alternatives;
    /// malformed ones are a validation error.
    pub async fn check_alias(&self, alias: &str) -> Result<AliasAvailability, AppError> {
        use crate::utils::code_generator::InvalidAlias;

        let code = match self.codegen.normalize(alias) {
            Ok(code) => code,
            Err(InvalidAlias::Reserved) => {
                return Ok(AliasAvailability {
                    available: false,
                    suggestions: self.available_suggestions(alias).await?,
                });
            }
            Err(e) => {
                return Err(AppError::invalid_alias(
                    e.to_string(),
                    json!({ "reason": e.kind(), "alias": alias }),
                ));
            }
        };

        if self.repository.find_by_code(&code).await?.is_none() {
            Ok(AliasAvailability {
                available: true,
                suggestions: vec![],
            })
        } else {
            Ok(AliasAvailability {
                available: false,
                suggestions: self.available_suggestions(&code).await?,
            })
        }
    }

    /// Dispatches a `webhook.test` event to the caller's endpoint.
    pub async fn send_test_webhook(&self, principal: &Principal) -> Result<(), AppError> {
        let user = self.auth.require_auth(principal)?;

        self.notifier.notify(
            Some(user.id),
            WebhookEvent::Test,
            json!({ "message": "Webhook configuration test" }),
        );

        Ok(())
    }

    /// Generates suggestions and keeps only the ones that are actually free.
    async fn available_suggestions(&self, base: &str) -> Result<Vec<String>, AppError> {
        let mut available = Vec::new();

        for candidate in self.codegen.suggestions(base, ALIAS_SUGGESTION_COUNT * 2) {
            if available.len() >= ALIAS_SUGGESTION_COUNT {
                break;
            }
            if self.repository.find_by_code(&candidate).await?.is_none() {
                available.push(candidate);
            }
        }

        Ok(available)
    }
}
