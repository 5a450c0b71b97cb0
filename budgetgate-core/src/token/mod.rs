//! Single-use approval tokens.
//!
//! This module provides:
//! - Token values with an explicit approve/deny intent
//! - An in-memory store with per-entry TTL and atomic retrieve-and-remove
//! - Sibling pairs: consuming one token of a pair invalidates both
//!
//! ## Constraints
//!
//! - **In-memory storage** - Tokens are lost on restart
//! - **Lazy expiry** - Expired entries are unobservable immediately and
//!   reclaimed by [`TokenStore::purge_expired`]

pub mod error;
pub mod store;
pub mod types;

pub use error::TokenStoreError;
pub use store::{TokenStore, TokenStoreConfig};
pub use types::{ApprovalLinks, StoredToken, TokenIntent, TokenValue};

// ============================================================================
// Tests
// ============================================================================
