//! Revocation registry.
//!
//! Holds the `jti` of every token that was logged out or rotated, until the
//! codec would reject that token anyway (`exp` plus clock-skew leeway). Entries past their expiry are treated as
//! absent and removed lazily on access.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::AuthError;

/// Storage for revoked token ids.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Revoke `jti` until `expires_at`. Revoking again keeps the later of
    /// the two expiries, so an entry never shrinks. Blank ids and past
    /// expiries are ignored.
    async fn revoke(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<(), AuthError>;

    /// Atomically revoke `jti` unless a live entry already exists.
    ///
    /// Returns `true` only for the caller that created the entry.
    async fn revoke_if_absent(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<bool, AuthError>;

    /// Whether a live entry exists for `jti`.
    async fn is_revoked(&self, jti: &str) -> Result<bool, AuthError>;
}

/// In-process [`TokenStore`] backed by a sharded concurrent map.
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    entries: DashMap<String, DateTime<Utc>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.entries.len();
        self.entries.retain(|_, expires_at| *expires_at > now);
        before.saturating_sub(self.entries.len())
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn revoke(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<(), AuthError> {
        if jti.trim().is_empty() || expires_at <= Utc::now() {
            return Ok(());
        }
        self.entries
            .entry(jti.to_string())
            .and_modify(|current| *current = (*current).max(expires_at))
            .or_insert(expires_at);
        Ok(())
    }

    async fn revoke_if_absent(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<bool, AuthError> {
        let now = Utc::now();
        if jti.trim().is_empty() || expires_at <= now {
            return Ok(false);
        }
        // The entry guard holds the shard lock across the whole decision.
        let claimed = match self.entries.entry(jti.to_string()) {
            Entry::Occupied(mut entry) => {
                if *entry.get() > now {
                    false
                } else {
                    entry.insert(expires_at);
                    true
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(expires_at);
                true
            }
        };
        Ok(claimed)
    }

    async fn is_revoked(&self, jti: &str) -> Result<bool, AuthError> {
        let now = Utc::now();
        if self.entries.remove_if(jti, |_, expires_at| *expires_at <= now).is_some() {
            return Ok(false);
        }
        Ok(self.entries.get(jti).is_some_and(|expires_at| *expires_at > now))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::*;

    fn in_minutes(minutes: i64) -> DateTime<Utc> {
        Utc::now() + Duration::minutes(minutes)
    }

    #[tokio::test]
    async fn revoke_then_query() {
        let store = InMemoryTokenStore::new();
        assert!(!store.is_revoked("a").await.unwrap());
        store.revoke("a", in_minutes(5)).await.unwrap();
        assert!(store.is_revoked("a").await.unwrap());
        assert!(!store.is_revoked("b").await.unwrap());
    }

    #[tokio::test]
    async fn revoke_is_idempotent_overwrite() {
        let store = InMemoryTokenStore::new();
        store.revoke("a", in_minutes(5)).await.unwrap();
        store.revoke("a", in_minutes(10)).await.unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.is_revoked("a").await.unwrap());
    }

    #[tokio::test]
    async fn revoke_again_keeps_the_later_expiry() {
        let soon = || Utc::now() + Duration::milliseconds(800);
        let store = InMemoryTokenStore::new();

        store.revoke("extended", soon()).await.unwrap();
        store.revoke("extended", in_minutes(10)).await.unwrap();
        store.revoke("kept", in_minutes(10)).await.unwrap();
        store.revoke("kept", soon()).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(1200)).await;
        assert!(store.is_revoked("extended").await.unwrap());
        assert!(store.is_revoked("kept").await.unwrap());
    }

    #[tokio::test]
    async fn blank_or_past_entries_are_ignored() {
        let store = InMemoryTokenStore::new();
        store.revoke("  ", in_minutes(5)).await.unwrap();
        store.revoke("a", in_minutes(-1)).await.unwrap();
        assert!(store.is_empty());
        assert!(!store.revoke_if_absent("", in_minutes(5)).await.unwrap());
        assert!(!store.revoke_if_absent("a", in_minutes(-1)).await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn revoke_if_absent_claims_once() {
        let store = InMemoryTokenStore::new();
        assert!(store.revoke_if_absent("a", in_minutes(5)).await.unwrap());
        assert!(!store.revoke_if_absent("a", in_minutes(10)).await.unwrap());
        assert!(store.is_revoked("a").await.unwrap());
    }

    #[tokio::test]
    async fn revoke_if_absent_respects_plain_revoke() {
        let store = InMemoryTokenStore::new();
        store.revoke("a", in_minutes(5)).await.unwrap();
        assert!(!store.revoke_if_absent("a", in_minutes(5)).await.unwrap());
    }

    #[tokio::test]
    async fn entries_lapse_at_expiry() {
        let store = InMemoryTokenStore::new();
        store.revoke("a", Utc::now() + Duration::milliseconds(300)).await.unwrap();
        assert!(store.is_revoked("a").await.unwrap());

        tokio::time::sleep(std::time::Duration::from_millis(500)).await;

        assert!(!store.is_revoked("a").await.unwrap());
        assert!(store.is_empty(), "expired entry should be dropped on access");
    }

    #[tokio::test]
    async fn expired_leftover_counts_as_absent() {
        let store = InMemoryTokenStore::new();
        store.revoke("a", Utc::now() + Duration::milliseconds(200)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(400)).await;

        assert_eq!(store.len(), 1);
        assert!(store.revoke_if_absent("a", in_minutes(5)).await.unwrap());
        assert!(store.is_revoked("a").await.unwrap());
    }

    #[tokio::test]
    async fn purge_drops_only_expired() {
        let store = InMemoryTokenStore::new();
        store.revoke("short", Utc::now() + Duration::milliseconds(200)).await.unwrap();
        store.revoke("long", in_minutes(5)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(400)).await;

        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.is_revoked("long").await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_claims_have_one_winner() {
        let store = Arc::new(InMemoryTokenStore::new());
        let expires_at = in_minutes(5);

        let tasks = (0..64).map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.revoke_if_absent("shared", expires_at).await.unwrap() })
        });
        let results = futures::future::join_all(tasks).await;

        let winners = results.into_iter().filter(|r| *r.as_ref().unwrap()).count();
        assert_eq!(winners, 1);
    }
}
