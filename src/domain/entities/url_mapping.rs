//! URL mapping entity: the unit of persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A short-code to long-URL mapping with ownership and lifecycle metadata.
///
/// Serializable so cache tiers can hold snapshots of the row; a cached
/// mapping is a value copy, never a live reference to storage.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UrlMapping {
    pub id: i64,
    pub short_code: String,
    pub long_url: String,
    pub long_url_hash: String,
    /// `None` marks an anonymous mapping.
    pub owner_id: Option<Uuid>,
    pub is_custom_alias: bool,
    /// Best-effort counter; authoritative totals come from the analytics
    /// pipeline.
    pub access_count: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl UrlMapping {
    /// Returns true if the mapping has passed its expiry time.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|e| Utc::now() >= e)
    }

    /// Returns true if the mapping is anonymous (has no owner).
    pub fn is_anonymous(&self) -> bool {
        self.owner_id.is_none()
    }

    /// Returns true if the mapping is visible to reads and not expired.
    pub fn is_live(&self) -> bool {
        !self.is_deleted && !self.is_expired()
    }
}

/// Input data for creating a new mapping.
#[derive(Debug, Clone)]
pub struct NewUrlMapping {
    pub short_code: String,
    pub long_url: String,
    pub long_url_hash: String,
    pub owner_id: Option<Uuid>,
    pub is_custom_alias: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn mapping() -> UrlMapping {
        UrlMapping {
            id: 1,
            short_code: "abc12Xy".to_string(),
            long_url: "https://example.com/".to_string(),
            long_url_hash: "deadbeef".to_string(),
            owner_id: None,
            is_custom_alias: false,
            access_count: 0,
            created_at: Utc::now(),
            expires_at: None,
            last_accessed_at: None,
            is_deleted: false,
            deleted_at: None,
        }
    }

    #[test]
    fn test_mapping_without_expiry_is_live() {
        let m = mapping();
        assert!(!m.is_expired());
        assert!(m.is_live());
        assert!(m.is_anonymous());
    }

    #[test]
    fn test_mapping_with_past_expiry_is_expired() {
        let mut m = mapping();
        m.expires_at = Some(Utc::now() - Duration::seconds(1));
        assert!(m.is_expired());
        assert!(!m.is_live());
    }

    #[test]
    fn test_mapping_with_future_expiry_is_live() {
        let mut m = mapping();
        m.expires_at = Some(Utc::now() + Duration::days(1));
        assert!(!m.is_expired());
        assert!(m.is_live());
    }

    #[test]
    fn test_soft_deleted_mapping_is_not_live() {
        let mut m = mapping();
        m.is_deleted = true;
        m.deleted_at = Some(Utc::now());
        assert!(!m.is_live());
    }

    #[test]
    fn test_owned_mapping_is_not_anonymous() {
        let mut m = mapping();
        m.owner_id = Some(Uuid::new_v4());
        assert!(!m.is_anonymous());
    }

    #[test]
    fn test_snapshot_round_trips_through_json() {
        let m = mapping();
        let json = serde_json::to_string(&m).unwrap();
        let back: UrlMapping = serde_json::from_str(&json).unwrap();
        assert_eq!(back.short_code, m.short_code);
        assert_eq!(back.long_url, m.long_url);
    }
}
