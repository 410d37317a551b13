#![allow(dead_code)]

//! Shared test fixtures: in-memory repositories and state wiring.
//!
//! Handler tests run against these fakes so the suite needs neither
//! PostgreSQL nor Redis; the fakes honor the repository contracts
//! (active-code uniqueness, owner scoping, soft-delete visibility).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use axum::extract::ConnectInfo;
use linkforge::domain::click_event::ClickEvent;
use linkforge::domain::entities::{
    DuplicateStrategy, NewUrlMapping, NotificationSettings, Tier, UrlMapping, User, WebhookJob,
};
use linkforge::domain::repositories::{
    BulkDeleteOutcome, ListQuery, Page, SortColumn, SortOrder, UrlRepository, UserRepository,
};
use linkforge::error::AppError;
use linkforge::infrastructure::cache::MemoryCache;
use linkforge::infrastructure::notifier::{Notifier, sign_payload};
use linkforge::state::{AppState, StateOptions};

pub const TEST_SIGNING_SECRET: &str = "test-signing-secret";

/// In-memory URL repository honoring active-code uniqueness and
/// soft-delete visibility.
#[derive(Default)]
pub struct InMemoryUrlRepository {
    rows: Mutex<Vec<UrlMapping>>,
    next_id: AtomicI64,
}

impl InMemoryUrlRepository {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Seeds a mapping directly, bypassing the service layer.
    pub fn seed(&self, mapping: UrlMapping) {
        self.rows.lock().unwrap().push(mapping);
    }

    pub fn seeded(
        &self,
        code: &str,
        long_url: &str,
        owner_id: Option<Uuid>,
        expires_at: Option<DateTime<Utc>>,
    ) -> UrlMapping {
        let mapping = UrlMapping {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            short_code: code.to_string(),
            long_url: long_url.to_string(),
            long_url_hash: format!("hash-{code}"),
            owner_id,
            is_custom_alias: false,
            access_count: 0,
            created_at: Utc::now(),
            expires_at,
            last_accessed_at: None,
            is_deleted: false,
            deleted_at: None,
        };
        self.seed(mapping.clone());
        mapping
    }

    pub fn snapshot(&self, code: &str) -> Option<UrlMapping> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.short_code == code && !m.is_deleted)
            .cloned()
    }
}

#[async_trait]
impl UrlRepository for InMemoryUrlRepository {
    async fn create(&self, new: NewUrlMapping) -> Result<UrlMapping, AppError> {
        let mut rows = self.rows.lock().unwrap();

        if rows
            .iter()
            .any(|m| m.short_code == new.short_code && !m.is_deleted)
        {
            return Err(AppError::alias_taken(
                "This short code is already in use",
                serde_json::json!({ "constraint": "url_mappings_active_code_key" }),
            ));
        }

        let mapping = UrlMapping {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            short_code: new.short_code,
            long_url: new.long_url,
            long_url_hash: new.long_url_hash,
            owner_id: new.owner_id,
            is_custom_alias: new.is_custom_alias,
            access_count: 0,
            created_at: Utc::now(),
            expires_at: new.expires_at,
            last_accessed_at: None,
            is_deleted: false,
            deleted_at: None,
        };
        rows.push(mapping.clone());

        Ok(mapping)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<UrlMapping>, AppError> {
        Ok(self.snapshot(code))
    }

    async fn find_active_by_hash(
        &self,
        hash: &str,
        owner_id: Option<Uuid>,
    ) -> Result<Option<UrlMapping>, AppError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|m| {
                m.long_url_hash == hash
                    && m.owner_id == owner_id
                    && !m.is_deleted
                    && !m.is_expired()
            })
            .max_by_key(|m| m.created_at)
            .cloned())
    }

    async fn update_expiry(
        &self,
        code: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<UrlMapping, AppError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|m| m.short_code == code && !m.is_deleted)
            .ok_or_else(|| {
                AppError::not_found("Short URL not found", serde_json::json!({ "code": code }))
            })?;

        row.expires_at = expires_at;
        Ok(row.clone())
    }

    async fn soft_delete(&self, code: &str) -> Result<Option<DateTime<Utc>>, AppError> {
        let mut rows = self.rows.lock().unwrap();
        match rows
            .iter_mut()
            .find(|m| m.short_code == code && !m.is_deleted)
        {
            Some(row) => {
                let now = Utc::now();
                row.is_deleted = true;
                row.deleted_at = Some(now);
                Ok(Some(now))
            }
            None => Ok(None),
        }
    }

    async fn bulk_soft_delete(
        &self,
        codes: &[String],
        owner_scope: Option<Uuid>,
    ) -> Result<BulkDeleteOutcome, AppError> {
        let mut outcome = BulkDeleteOutcome::default();
        let mut rows = self.rows.lock().unwrap();

        for code in codes {
            let row = rows.iter_mut().find(|m| {
                m.short_code == *code
                    && !m.is_deleted
                    && owner_scope.is_none_or(|owner| m.owner_id == Some(owner))
            });

            match row {
                Some(row) => {
                    row.is_deleted = true;
                    row.deleted_at = Some(Utc::now());
                    outcome.deleted.push(code.clone());
                }
                None => outcome.failed.push(code.clone()),
            }
        }

        Ok(outcome)
    }

    async fn increment_access(&self, code: &str) {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows
            .iter_mut()
            .find(|m| m.short_code == code && !m.is_deleted)
        {
            row.access_count += 1;
            row.last_accessed_at = Some(Utc::now());
        }
    }

    async fn list_by_owner(
        &self,
        owner_id: Uuid,
        query: &ListQuery,
    ) -> Result<Page<UrlMapping>, AppError> {
        let rows = self.rows.lock().unwrap();
        let now = Utc::now();

        let mut items: Vec<UrlMapping> = rows
            .iter()
            .filter(|m| m.owner_id == Some(owner_id) && !m.is_deleted)
            .filter(|m| {
                query.search.as_ref().is_none_or(|s| {
                    m.short_code.contains(s.as_str()) || m.long_url.contains(s.as_str())
                })
            })
            .filter(|m| {
                query
                    .is_custom_alias
                    .is_none_or(|want| m.is_custom_alias == want)
            })
            .filter(|m| query.has_expiry.is_none_or(|want| m.expires_at.is_some() == want))
            .filter(|m| {
                query.is_expired.is_none_or(|want| {
                    m.expires_at.map(|e| e <= now).unwrap_or(false) == want
                })
            })
            .filter(|m| query.created_from.is_none_or(|from| m.created_at >= from))
            .filter(|m| query.created_to.is_none_or(|to| m.created_at <= to))
            .filter(|m| query.min_access_count.is_none_or(|min| m.access_count >= min))
            .filter(|m| query.max_access_count.is_none_or(|max| m.access_count <= max))
            .cloned()
            .collect();

        match query.sort_by {
            SortColumn::CreatedAt => items.sort_by_key(|m| m.created_at),
            SortColumn::AccessCount => items.sort_by_key(|m| m.access_count),
            SortColumn::LastAccessedAt => items.sort_by_key(|m| m.last_accessed_at),
            SortColumn::ShortCode => items.sort_by(|a, b| a.short_code.cmp(&b.short_code)),
            SortColumn::ExpiresAt => items.sort_by_key(|m| m.expires_at),
        }
        if query.order == SortOrder::Desc {
            items.reverse();
        }

        let total = items.len() as i64;
        let start = ((query.page - 1).max(0) * query.page_size) as usize;
        let items = items
            .into_iter()
            .skip(start)
            .take(query.page_size as usize)
            .collect();

        Ok(Page { items, total })
    }

    async fn find_expiring(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<UrlMapping>, AppError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|m| {
                !m.is_deleted
                    && m.expires_at
                        .map(|e| e >= from && e < to)
                        .unwrap_or(false)
            })
            .cloned()
            .collect())
    }

    async fn find_soft_deleted_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<i64>, AppError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|m| m.is_deleted && m.deleted_at.map(|d| d < cutoff).unwrap_or(false))
            .map(|m| m.id)
            .collect())
    }

    async fn hard_delete(&self, ids: &[i64]) -> Result<u64, AppError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|m| !(m.is_deleted && ids.contains(&m.id)));
        Ok((before - rows.len()) as u64)
    }
}

/// In-memory user directory keyed by id and token hash.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<Vec<(User, Option<String>)>>,
    settings: Mutex<Vec<NotificationSettings>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user reachable with the given raw token.
    pub fn add_user(&self, user: User, raw_token: Option<&str>) {
        let token_hash = raw_token.map(|t| sign_payload(TEST_SIGNING_SECRET, t.as_bytes()));
        self.users.lock().unwrap().push((user, token_hash));
    }

    pub fn set_settings(&self, settings: NotificationSettings) {
        self.settings.lock().unwrap().push(settings);
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|(u, _)| u.id == id)
            .map(|(u, _)| u.clone()))
    }

    async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|(_, hash)| hash.as_deref() == Some(token_hash))
            .map(|(u, _)| u.clone()))
    }

    async fn notification_settings(
        &self,
        user_id: Uuid,
    ) -> Result<Option<NotificationSettings>, AppError> {
        Ok(self
            .settings
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.user_id == user_id)
            .cloned())
    }
}

/// Builds a user record for tests.
pub fn test_user(tier: Tier, strategy: DuplicateStrategy) -> User {
    User {
        id: Uuid::new_v4(),
        email: format!("{}@example.com", Uuid::new_v4()),
        tier,
        is_active: true,
        is_admin: false,
        duplicate_strategy: strategy,
        default_ttl_days: None,
        created_at: Utc::now(),
    }
}

/// Everything a handler test needs.
pub struct TestContext {
    pub state: AppState,
    pub urls: Arc<InMemoryUrlRepository>,
    pub users: Arc<InMemoryUserRepository>,
    pub click_rx: mpsc::Receiver<ClickEvent>,
    pub webhook_rx: mpsc::Receiver<WebhookJob>,
}

/// Wires an [`AppState`] over in-memory fakes and a real L1 cache.
pub fn create_test_context() -> TestContext {
    create_test_context_with(false)
}

pub fn create_test_context_with(redirect_permanent: bool) -> TestContext {
    let urls = Arc::new(InMemoryUrlRepository::new());
    let users = Arc::new(InMemoryUserRepository::new());

    let cache = Arc::new(MemoryCache::new(
        1000,
        Duration::from_secs(60),
        Duration::from_secs(60),
    ));

    let (click_tx, click_rx) = mpsc::channel(100);
    let (webhook_tx, webhook_rx) = mpsc::channel(100);

    let state = AppState::build(
        urls.clone(),
        users.clone(),
        cache,
        Notifier::new(webhook_tx),
        click_tx,
        StateOptions {
            base_url: "https://sho.rt".to_string(),
            short_code_length: 7,
            short_code_max_attempts: 8,
            reserved_words: vec![],
            token_signing_secret: TEST_SIGNING_SECRET.to_string(),
            redirect_permanent,
        },
    );

    TestContext {
        state,
        urls,
        users,
        click_rx,
        webhook_rx,
    }
}

/// Injects a fixed peer address so handlers taking `ConnectInfo` work
/// under `axum_test::TestServer`.
#[derive(Clone)]
pub struct MockConnectInfoLayer;

impl<S> tower::Layer<S> for MockConnectInfoLayer {
    type Service = MockConnectInfoService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MockConnectInfoService { inner }
    }
}

#[derive(Clone)]
pub struct MockConnectInfoService<S> {
    inner: S,
}

impl<S, B> tower::Service<axum::http::Request<B>> for MockConnectInfoService<S>
where
    S: tower::Service<axum::http::Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        let addr: SocketAddr = "127.0.0.1:12345".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        self.inner.call(req)
    }
}
