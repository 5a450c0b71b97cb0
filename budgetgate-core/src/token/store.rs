//! In-memory single-use token store with per-entry TTL.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use super::error::TokenStoreError;
use super::types::{StoredToken, TokenValue};
use crate::request::ApprovalRequest;

// ============================================================================
// Token Store Configuration
// ============================================================================

/// Configuration for the token store.
#[derive(Debug, Clone)]
pub struct TokenStoreConfig {
    /// TTL applied when callers use [`TokenStore::default_ttl`]
    pub default_ttl: Duration,
    /// Maximum number of live entries before writes are refused
    pub max_entries: usize,
}

impl Default for TokenStoreConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(6 * 3600), // 6 hours
            max_entries: 10_000,
        }
    }
}

// ============================================================================
// Token Store
// ============================================================================

/// Claim shared by every entry issued for the same request.
///
/// Exactly one `swap(true)` on `consumed` can observe `false`, which is what
/// makes a pair of sibling tokens mutually exclusive.
#[derive(Debug)]
struct Claim {
    /// Serialized `ApprovalRequest`
    payload: String,
    /// Absolute expiry time
    expires_at: DateTime<Utc>,
    /// Set once by the first successful retrieval of any sibling
    consumed: AtomicBool,
}

impl Claim {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    fn is_consumed(&self) -> bool {
        self.consumed.load(Ordering::Acquire)
    }
}

/// Internal entry keyed by token value.
#[derive(Debug)]
struct TokenEntry {
    /// Shared with the sibling entry, if any
    claim: Arc<Claim>,
    /// Key of the mutually exclusive sibling token
    sibling: Option<TokenValue>,
}

/// In-memory token store with atomic retrieve-and-remove.
///
/// Uses DashMap for concurrent access. A lookup removes the entry from the
/// map and then claims the shared [`Claim`]; only one caller across all
/// siblings can win that claim.
pub struct TokenStore {
    entries: DashMap<TokenValue, TokenEntry>,
    config: TokenStoreConfig,
    /// Serializes writers so the capacity check and insert are one step.
    /// Readers and removals never take it.
    writes: Mutex<()>,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("entries", &self.entries.len())
            .field("config", &self.config)
            .finish()
    }
}

impl TokenStore {
    /// Creates a new token store with the given configuration.
    #[must_use]
    pub fn new(config: TokenStoreConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            writes: Mutex::new(()),
        }
    }

    /// Creates a new token store with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(TokenStoreConfig::default())
    }

    /// Returns the store configuration.
    #[must_use]
    pub fn config(&self) -> &TokenStoreConfig {
        &self.config
    }

    /// TTL configured for newly issued tokens.
    #[must_use]
    pub fn default_ttl(&self) -> Duration {
        self.config.default_ttl
    }

    /// Number of entries currently held, including ones not yet reclaimed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entries are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stores a single token, overwriting any entry under the same key.
    ///
    /// # Errors
    ///
    /// - `TokenStoreError::Serialization` if the payload cannot be encoded
    /// - `TokenStoreError::CapacityExceeded` if the store is full
    pub fn put(
        &self,
        key: TokenValue,
        payload: &ApprovalRequest,
        ttl: Duration,
    ) -> Result<(), TokenStoreError> {
        let claim = Self::claim_for(payload, ttl)?;
        let _writer = self.write_guard();
        let needed = usize::from(!self.entries.contains_key(&key));
        self.ensure_capacity(needed)?;

        debug!(token = %key.redacted(), expires_at = %claim.expires_at, "Token stored");
        self.entries.insert(
            key,
            TokenEntry {
                claim,
                sibling: None,
            },
        );
        Ok(())
    }

    /// Stores two mutually exclusive tokens for the same request.
    ///
    /// Both entries share one payload, one expiry and one claim: retrieving
    /// either one makes both unobservable. Both or neither are written.
    ///
    /// # Errors
    ///
    /// - `TokenStoreError::Serialization` if the payload cannot be encoded
    /// - `TokenStoreError::CapacityExceeded` if the store cannot hold both
    pub fn put_pair(
        &self,
        first: TokenValue,
        second: TokenValue,
        payload: &ApprovalRequest,
        ttl: Duration,
    ) -> Result<(), TokenStoreError> {
        let claim = Self::claim_for(payload, ttl)?;
        let _writer = self.write_guard();
        let needed = usize::from(!self.entries.contains_key(&first))
            + usize::from(!self.entries.contains_key(&second));
        self.ensure_capacity(needed)?;

        debug!(
            first = %first.redacted(),
            second = %second.redacted(),
            expires_at = %claim.expires_at,
            "Token pair stored"
        );
        self.entries.insert(
            first.clone(),
            TokenEntry {
                claim: claim.clone(),
                sibling: Some(second.clone()),
            },
        );
        self.entries.insert(
            second,
            TokenEntry {
                claim,
                sibling: Some(first),
            },
        );
        Ok(())
    }

    /// Retrieves a token and invalidates it (and its sibling) atomically.
    ///
    /// Returns `Ok(None)` if the token was never issued, was already
    /// consumed, its sibling was consumed, or its TTL elapsed. Of any number
    /// of concurrent callers for the same token or its sibling, at most one
    /// receives `Some`.
    ///
    /// # Errors
    ///
    /// Returns `TokenStoreError::CorruptPayload` if the payload of a
    /// successfully claimed token cannot be decoded. The token stays
    /// consumed in that case.
    pub fn get_and_invalidate(
        &self,
        key: &TokenValue,
    ) -> Result<Option<StoredToken>, TokenStoreError> {
        let Some((value, entry)) = self.entries.remove(key) else {
            return Ok(None);
        };
        self.remove_sibling(&entry);

        // Claim first: an expired token still burns its sibling.
        if entry.claim.consumed.swap(true, Ordering::AcqRel) {
            debug!(token = %value.redacted(), "Token already consumed via sibling");
            return Ok(None);
        }

        if entry.claim.is_expired(Utc::now()) {
            debug!(token = %value.redacted(), expires_at = %entry.claim.expires_at, "Token expired");
            return Ok(None);
        }

        let request: ApprovalRequest = serde_json::from_str(&entry.claim.payload).map_err(|e| {
            TokenStoreError::CorruptPayload {
                details: e.to_string(),
            }
        })?;

        Ok(Some(StoredToken {
            value,
            request,
            expires_at: entry.claim.expires_at,
        }))
    }

    /// Invalidates a token and its sibling without reading the payload.
    ///
    /// Returns true if a live entry was revoked.
    pub fn revoke_pair(&self, key: &TokenValue) -> bool {
        let Some((_, entry)) = self.entries.remove(key) else {
            return false;
        };
        self.remove_sibling(&entry);
        !entry.claim.consumed.swap(true, Ordering::AcqRel)
    }

    /// Removes consumed and expired entries.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| !entry.claim.is_consumed() && !entry.claim.is_expired(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed = removed, remaining = self.entries.len(), "Purged expired tokens");
        }
        removed
    }

    fn claim_for(payload: &ApprovalRequest, ttl: Duration) -> Result<Arc<Claim>, TokenStoreError> {
        let payload =
            serde_json::to_string(payload).map_err(|e| TokenStoreError::Serialization {
                details: e.to_string(),
            })?;
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Ok(Arc::new(Claim {
            payload,
            expires_at,
            consumed: AtomicBool::new(false),
        }))
    }

    fn write_guard(&self) -> MutexGuard<'_, ()> {
        // The guarded value is `()`, so a poisoned lock holds no broken state.
        self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Caller must hold the write guard.
    fn ensure_capacity(&self, needed: usize) -> Result<(), TokenStoreError> {
        if needed == 0 {
            return Ok(());
        }
        if self.entries.len() + needed > self.config.max_entries {
            // Reclaim dead entries before refusing the write.
            self.purge_expired();
            if self.entries.len() + needed > self.config.max_entries {
                warn!(
                    max_entries = self.config.max_entries,
                    "Token store full, refusing write"
                );
                return Err(TokenStoreError::CapacityExceeded {
                    max_entries: self.config.max_entries,
                });
            }
        }
        Ok(())
    }

    /// Removes the sibling entry, but only if it still belongs to the same
    /// claim (a later `put` may have reused the key).
    fn remove_sibling(&self, entry: &TokenEntry) {
        if let Some(sibling) = &entry.sibling {
            self.entries
                .remove_if(sibling, |_, other| Arc::ptr_eq(&other.claim, &entry.claim));
        }
    }
}
