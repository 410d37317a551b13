//! Authentication and ownership gates.
//!
//! Credentials are opaque tokens issued elsewhere; the core only verifies
//! their HMAC against storage and derives a [`Principal`]. Ownership checks
//! read the repository directly, never the cache, because a stale snapshot
//! must not decide who may mutate.

use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::entities::{Principal, Tier, UrlMapping};
use crate::domain::repositories::{UrlRepository, UserRepository};
use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Identity of an authenticated caller, unpacked from a [`Principal`].
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub tier: Tier,
    pub is_admin: bool,
}

/// Service turning credentials into principals and gating mutations.
///
/// Tokens are hashed with HMAC-SHA256 (keyed by `signing_secret`) before
/// lookup, so read-only access to the database is not enough to forge or
/// verify credentials.
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    urls: Arc<dyn UrlRepository>,
    signing_secret: String,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        urls: Arc<dyn UrlRepository>,
        signing_secret: String,
    ) -> Self {
        Self {
            users,
            urls,
            signing_secret,
        }
    }

    /// Hashes a raw token with HMAC-SHA256 using the server signing secret.
    ///
    /// Returns a 64-character lowercase hex-encoded MAC.
    fn hash_token(&self, token: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.signing_secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(token.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Resolves a raw credential (bearer token or API key) to a principal.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unauthenticated`] when the credential matches no
    /// user or the user is inactive.
    pub async fn authenticate(&self, credential: &str) -> Result<Principal, AppError> {
        let token_hash = self.hash_token(credential);

        let user = self
            .users
            .find_by_token_hash(&token_hash)
            .await?
            .ok_or_else(|| {
                AppError::unauthenticated(
                    "Unauthorized",
                    json!({ "reason": "Invalid or revoked credential" }),
                )
            })?;

        if !user.is_active {
            return Err(AppError::unauthenticated(
                "Unauthorized",
                json!({ "reason": "Account is inactive" }),
            ));
        }

        Ok(Principal::User {
            id: user.id,
            tier: user.tier,
            is_admin: user.is_admin,
        })
    }

    /// Rejects anonymous callers.
    pub fn require_auth(&self, principal: &Principal) -> Result<AuthenticatedUser, AppError> {
        match principal {
            Principal::User { id, tier, is_admin } => Ok(AuthenticatedUser {
                id: *id,
                tier: *tier,
                is_admin: *is_admin,
            }),
            Principal::Anonymous => Err(AppError::unauthenticated(
                "Authentication required",
                json!({}),
            )),
        }
    }

    /// Verifies the caller may mutate the mapping behind `code`.
    ///
    /// Reads through the repository so the decision is never made on a
    /// cached snapshot. Admins may mutate anything; other callers only
    /// their own mappings. Anonymous mappings have no owner and are closed
    /// to the standard surface entirely.
    ///
    /// # Errors
    ///
    /// - [`AppError::Unauthenticated`] for anonymous callers
    /// - [`AppError::NotFound`] when no active mapping matches
    /// - [`AppError::Forbidden`] when the caller is neither owner nor admin
    pub async fn require_ownership(
        &self,
        principal: &Principal,
        code: &str,
    ) -> Result<UrlMapping, AppError> {
        let user = self.require_auth(principal)?;

        let mapping = self.urls.find_by_code(code).await?.ok_or_else(|| {
            AppError::not_found("Short URL not found", json!({ "code": code }))
        })?;

        if user.is_admin {
            return Ok(mapping);
        }

        match mapping.owner_id {
            Some(owner_id) if owner_id == user.id => Ok(mapping),
            Some(_) => Err(AppError::forbidden(
                "You do not own this short URL",
                json!({ "code": code }),
            )),
            None => Err(AppError::forbidden(
                "Anonymous short URLs cannot be managed",
                json!({ "code": code }),
            )),
        }
    }

    /// Rejects callers below the required tier. Admins pass regardless.
    pub fn require_tier(&self, principal: &Principal, required: Tier) -> Result<(), AppError> {
        let user = self.require_auth(principal)?;

        if user.is_admin || user.tier >= required {
            Ok(())
        } else {
            Err(AppError::insufficient_tier(
                format!("This operation requires the {} tier", required.as_str()),
                json!({
                    "required": required.as_str(),
                    "current": user.tier.as_str(),
                }),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{DuplicateStrategy, User};
    use crate::domain::repositories::{MockUrlRepository, MockUserRepository};
    use chrono::Utc;

    fn test_secret() -> String {
        "test-signing-secret".to_string()
    }

    fn compute_expected_hash(token: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(test_secret().as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(token.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn test_user(id: Uuid, active: bool) -> User {
        User {
            id,
            email: "user@example.com".to_string(),
            tier: Tier::Standard,
            is_active: active,
            is_admin: false,
            duplicate_strategy: DuplicateStrategy::GenerateNew,
            default_ttl_days: None,
            created_at: Utc::now(),
        }
    }

    fn mapping_owned_by(owner: Option<Uuid>) -> UrlMapping {
        UrlMapping {
            id: 1,
            short_code: "abc12Xy".to_string(),
            long_url: "https://example.com/".to_string(),
            long_url_hash: "hash".to_string(),
            owner_id: owner,
            is_custom_alias: false,
            access_count: 0,
            created_at: Utc::now(),
            expires_at: None,
            last_accessed_at: None,
            is_deleted: false,
            deleted_at: None,
        }
    }

    fn service(users: MockUserRepository, urls: MockUrlRepository) -> AuthService {
        AuthService::new(Arc::new(users), Arc::new(urls), test_secret())
    }

    // ── authenticate ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_authenticate_success() {
        let token = "valid-token";
        let expected_hash = compute_expected_hash(token);
        let user_id = Uuid::new_v4();

        let mut users = MockUserRepository::new();
        users
            .expect_find_by_token_hash()
            .withf(move |hash| hash == expected_hash)
            .times(1)
            .returning(move |_| Ok(Some(test_user(user_id, true))));

        let svc = service(users, MockUrlRepository::new());
        let principal = svc.authenticate(token).await.unwrap();

        assert_eq!(principal.user_id(), Some(user_id));
        assert_eq!(principal.tier(), Some(Tier::Standard));
    }

    #[tokio::test]
    async fn test_authenticate_unknown_token() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_token_hash().returning(|_| Ok(None));

        let svc = service(users, MockUrlRepository::new());
        let err = svc.authenticate("bogus").await.unwrap_err();

        assert!(matches!(err, AppError::Unauthenticated { .. }));
    }

    #[tokio::test]
    async fn test_authenticate_inactive_user() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_token_hash()
            .returning(|_| Ok(Some(test_user(Uuid::new_v4(), false))));

        let svc = service(users, MockUrlRepository::new());
        let err = svc.authenticate("token").await.unwrap_err();

        assert!(matches!(err, AppError::Unauthenticated { .. }));
    }

    #[tokio::test]
    async fn test_hash_token_consistency() {
        let svc = service(MockUserRepository::new(), MockUrlRepository::new());

        let hash1 = svc.hash_token("test-token");
        let hash2 = svc.hash_token("test-token");

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[tokio::test]
    async fn test_hash_token_secret_matters() {
        let svc1 = AuthService::new(
            Arc::new(MockUserRepository::new()),
            Arc::new(MockUrlRepository::new()),
            "secret-a".to_string(),
        );
        let svc2 = AuthService::new(
            Arc::new(MockUserRepository::new()),
            Arc::new(MockUrlRepository::new()),
            "secret-b".to_string(),
        );

        assert_ne!(svc1.hash_token("token"), svc2.hash_token("token"));
    }

    // ── require_auth ──────────────────────────────────────────────────────────

    #[test]
    fn test_require_auth_rejects_anonymous() {
        let svc = service(MockUserRepository::new(), MockUrlRepository::new());
        let err = svc.require_auth(&Principal::Anonymous).unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated { .. }));
    }

    #[test]
    fn test_require_auth_unpacks_user() {
        let svc = service(MockUserRepository::new(), MockUrlRepository::new());
        let id = Uuid::new_v4();
        let user = svc
            .require_auth(&Principal::User {
                id,
                tier: Tier::Premium,
                is_admin: false,
            })
            .unwrap();

        assert_eq!(user.id, id);
        assert_eq!(user.tier, Tier::Premium);
    }

    // ── require_ownership ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_ownership_passes_for_owner() {
        let owner = Uuid::new_v4();
        let mut urls = MockUrlRepository::new();
        urls.expect_find_by_code()
            .returning(move |_| Ok(Some(mapping_owned_by(Some(owner)))));

        let svc = service(MockUserRepository::new(), urls);
        let principal = Principal::User {
            id: owner,
            tier: Tier::Standard,
            is_admin: false,
        };

        assert!(svc.require_ownership(&principal, "abc12Xy").await.is_ok());
    }

    #[tokio::test]
    async fn test_ownership_rejects_other_user() {
        let mut urls = MockUrlRepository::new();
        urls.expect_find_by_code()
            .returning(|_| Ok(Some(mapping_owned_by(Some(Uuid::new_v4())))));

        let svc = service(MockUserRepository::new(), urls);
        let principal = Principal::User {
            id: Uuid::new_v4(),
            tier: Tier::Enterprise,
            is_admin: false,
        };

        let err = svc
            .require_ownership(&principal, "abc12Xy")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn test_ownership_rejects_anonymous_mapping() {
        let mut urls = MockUrlRepository::new();
        urls.expect_find_by_code()
            .returning(|_| Ok(Some(mapping_owned_by(None))));

        let svc = service(MockUserRepository::new(), urls);
        let principal = Principal::User {
            id: Uuid::new_v4(),
            tier: Tier::Standard,
            is_admin: false,
        };

        let err = svc
            .require_ownership(&principal, "abc12Xy")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn test_admin_may_mutate_any_mapping() {
        let mut urls = MockUrlRepository::new();
        urls.expect_find_by_code()
            .returning(|_| Ok(Some(mapping_owned_by(None))));

        let svc = service(MockUserRepository::new(), urls);
        let principal = Principal::User {
            id: Uuid::new_v4(),
            tier: Tier::Standard,
            is_admin: true,
        };

        assert!(svc.require_ownership(&principal, "abc12Xy").await.is_ok());
    }

    #[tokio::test]
    async fn test_ownership_of_missing_mapping_is_not_found() {
        let mut urls = MockUrlRepository::new();
        urls.expect_find_by_code().returning(|_| Ok(None));

        let svc = service(MockUserRepository::new(), urls);
        let principal = Principal::User {
            id: Uuid::new_v4(),
            tier: Tier::Standard,
            is_admin: false,
        };

        let err = svc.require_ownership(&principal, "nothere").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    // ── require_tier ──────────────────────────────────────────────────────────

    #[test]
    fn test_tier_gate() {
        let svc = service(MockUserRepository::new(), MockUrlRepository::new());

        let standard = Principal::User {
            id: Uuid::new_v4(),
            tier: Tier::Standard,
            is_admin: false,
        };
        let err = svc.require_tier(&standard, Tier::Premium).unwrap_err();
        assert!(matches!(err, AppError::InsufficientTier { .. }));

        let premium = Principal::User {
            id: Uuid::new_v4(),
            tier: Tier::Premium,
            is_admin: false,
        };
        assert!(svc.require_tier(&premium, Tier::Premium).is_ok());

        let enterprise = Principal::User {
            id: Uuid::new_v4(),
            tier: Tier::Enterprise,
            is_admin: false,
        };
        assert!(svc.require_tier(&enterprise, Tier::Premium).is_ok());
    }

    #[test]
    fn test_admin_bypasses_tier_gate() {
        let svc = service(MockUserRepository::new(), MockUrlRepository::new());
        let admin = Principal::User {
            id: Uuid::new_v4(),
            tier: Tier::Standard,
            is_admin: true,
        };
        assert!(svc.require_tier(&admin, Tier::Enterprise).is_ok());
    }

    #[test]
    fn test_anonymous_fails_tier_gate_as_unauthenticated() {
        let svc = service(MockUserRepository::new(), MockUrlRepository::new());
        let err = svc
            .require_tier(&Principal::Anonymous, Tier::Premium)
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated { .. }));
    }
}
