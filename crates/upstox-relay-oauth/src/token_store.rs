//! Token storage keyed by account.
//!
//! The relay never talks to a token store directly from handler code other
//! than through [`TokenStore`], so the in-memory store can be replaced with
//! a persistent one without touching the HTTP layer.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::oauth::TokenResponse;

/// Account used when the caller does not name one.
pub const DEFAULT_ACCOUNT: &str = "default";

// ============================================================================
// AccountId
// ============================================================================

/// Identity a token pair belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// Parse a caller-supplied id. Blank input yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_ACCOUNT
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self(DEFAULT_ACCOUNT.to_string())
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// TokenRecord
// ============================================================================

/// A token pair as held by the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Lifetime in seconds as reported by upstream.
    pub expires_in: Option<u64>,
    pub received_at: DateTime<Utc>,
}

impl TokenRecord {
    /// Record for a freshly issued token.
    pub fn from_response(tokens: &TokenResponse) -> Self {
        Self {
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            expires_in: tokens.expires_in,
            received_at: Utc::now(),
        }
    }

    /// Record for a refreshed token.
    ///
    /// Upstream may omit the refresh token on refresh; the one that was
    /// used stays valid and is kept.
    pub fn from_refresh(tokens: &TokenResponse, used_refresh_token: &str) -> Self {
        let mut record = Self::from_response(tokens);
        if record.refresh_token.as_deref().is_none_or(str::is_empty) {
            record.refresh_token = Some(used_refresh_token.to_string());
        }
        record
    }

    /// Absolute expiry, when upstream reported a lifetime.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.expires_in?).ok()?;
        self.received_at
            .checked_add_signed(Duration::try_seconds(secs)?)
    }

    /// Whether the access token has expired at `now`.
    ///
    /// Tokens without a reported lifetime are never considered expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|at| now >= at)
    }
}

// ============================================================================
// TokenStore Trait
// ============================================================================

/// Storage for token records, keyed by account.
#[async_trait]
pub trait TokenStore: Send + Sync + fmt::Debug {
    /// Current record for `account`, if any.
    async fn get(&self, account: &AccountId) -> Option<TokenRecord>;

    /// Insert or overwrite the record for `account`.
    async fn put(&self, account: AccountId, record: TokenRecord);

    /// Remove the record for `account`. Returns whether one existed.
    async fn delete(&self, account: &AccountId) -> bool;
}

// ============================================================================
// InMemoryTokenStore
// ============================================================================

/// Process-local token store. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    records: RwLock<HashMap<AccountId, TokenRecord>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of accounts with a stored record.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn get(&self, account: &AccountId) -> Option<TokenRecord> {
        self.records.read().await.get(account).cloned()
    }

    async fn put(&self, account: AccountId, record: TokenRecord) {
        let mut records = self.records.write().await;
        if records.insert(account.clone(), record).is_some() {
            tracing::debug!(account = %account, "Replaced stored token");
        } else {
            tracing::debug!(account = %account, "Stored new token");
        }
    }

    async fn delete(&self, account: &AccountId) -> bool {
        self.records.write().await.remove(account).is_some()
    }
}

// ============================================================================
// Shared Token Store
// ============================================================================

/// Token store shared across request handlers.
pub type SharedTokenStore = Arc<dyn TokenStore>;

/// Create a shared in-memory token store.
pub fn create_memory_token_store() -> SharedTokenStore {
    Arc::new(InMemoryTokenStore::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn response(access: &str, refresh: Option<&str>, expires_in: Option<u64>) -> TokenResponse {
        TokenResponse {
            access_token: access.to_string(),
            refresh_token: refresh.map(str::to_string),
            expires_in,
            token_type: Some("Bearer".to_string()),
            extra: Map::new(),
        }
    }

    #[test]
    fn test_account_id_parse() {
        assert_eq!(AccountId::parse("  alice ").unwrap().as_str(), "alice");
        assert!(AccountId::parse("   ").is_none());
        assert!(AccountId::default().is_default());
    }

    #[test]
    fn test_record_from_response() {
        let record = TokenRecord::from_response(&response("A", Some("R"), Some(3600)));
        assert_eq!(record.access_token, "A");
        assert_eq!(record.refresh_token.as_deref(), Some("R"));
        assert_eq!(record.expires_in, Some(3600));
    }

    #[test]
    fn test_refresh_keeps_prior_refresh_token() {
        let record = TokenRecord::from_refresh(&response("A2", None, Some(60)), "R1");
        assert_eq!(record.refresh_token.as_deref(), Some("R1"));

        let record = TokenRecord::from_refresh(&response("A2", Some(""), Some(60)), "R1");
        assert_eq!(record.refresh_token.as_deref(), Some("R1"));

        let record = TokenRecord::from_refresh(&response("A2", Some("R2"), Some(60)), "R1");
        assert_eq!(record.refresh_token.as_deref(), Some("R2"));
    }

    #[test]
    fn test_expiry() {
        let record = TokenRecord::from_response(&response("A", None, Some(3600)));
        let at = record.expires_at().unwrap();
        assert_eq!(at - record.received_at, Duration::seconds(3600));
        assert!(!record.is_expired(record.received_at));
        assert!(record.is_expired(at));

        let forever = TokenRecord::from_response(&response("A", None, None));
        assert!(forever.expires_at().is_none());
        assert!(!forever.is_expired(Utc::now() + Duration::days(365)));
    }

    #[tokio::test]
    async fn test_memory_store_put_get_delete() {
        let store = InMemoryTokenStore::new();
        let alice = AccountId::parse("alice").unwrap();
        assert!(store.get(&alice).await.is_none());

        let record = TokenRecord::from_response(&response("A", Some("R"), Some(3600)));
        store.put(alice.clone(), record.clone()).await;
        assert_eq!(store.get(&alice).await, Some(record));
        assert_eq!(store.len().await, 1);

        assert!(store.delete(&alice).await);
        assert!(!store.delete(&alice).await);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_memory_store_accounts_are_isolated() {
        let store = create_memory_token_store();
        let alice = AccountId::parse("alice").unwrap();
        let bob = AccountId::parse("bob").unwrap();

        store
            .put(alice.clone(), TokenRecord::from_response(&response("A", None, None)))
            .await;
        store
            .put(bob.clone(), TokenRecord::from_response(&response("B", None, None)))
            .await;

        assert_eq!(store.get(&alice).await.unwrap().access_token, "A");
        assert_eq!(store.get(&bob).await.unwrap().access_token, "B");
        assert!(store.get(&AccountId::default()).await.is_none());
    }

    #[tokio::test]
    async fn test_memory_store_last_write_wins() {
        let store = InMemoryTokenStore::new();
        let account = AccountId::default();

        store
            .put(account.clone(), TokenRecord::from_response(&response("first", None, None)))
            .await;
        store
            .put(account.clone(), TokenRecord::from_response(&response("second", None, None)))
            .await;

        assert_eq!(store.get(&account).await.unwrap().access_token, "second");
        assert_eq!(store.len().await, 1);
    }
}
