//! Risk Metadata Store
//!
//! Concurrent in-memory store for generated [`RiskMetadata`] records,
//! keyed by record id. DashMap gives lock-free reads across handlers.
//!
//! Features:
//! - TTL-based expiration (1 hour default)
//! - Hit/miss counters for the stats endpoint
//! - Periodic cleanup via [`MetadataStore::cleanup_expired`]

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::models::types::RiskMetadata;
use crate::utils::constants::DEFAULT_METADATA_TTL_SECS;

/// Stored record with its insertion time
#[derive(Clone, Debug)]
struct StoredEntry {
    metadata: RiskMetadata,
    stored_at: Instant,
}

impl StoredEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() > ttl
    }
}

/// Shared metadata store; clones point at the same map
#[derive(Clone)]
pub struct MetadataStore {
    entries: Arc<DashMap<String, StoredEntry>>,
    ttl: Duration,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl Default for MetadataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(DEFAULT_METADATA_TTL_SECS))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Fetch a live record. Ids are case-sensitive.
    pub fn get(&self, id: &str) -> Option<RiskMetadata> {
        let expired = match self.entries.get(id) {
            Some(entry) if !entry.is_expired(self.ttl) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("✅ STORE HIT: {}", id);
                return Some(entry.metadata.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            self.evict_if_expired(id);
            debug!("📭 STORE MISS (expired): {}", id);
        } else {
            debug!("📭 STORE MISS: {}", id);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Remove `id` only if the entry is still expired; a concurrent insert
    /// may have replaced it since it was read
    fn evict_if_expired(&self, id: &str) -> bool {
        self.entries
            .remove_if(id, |_, entry| entry.is_expired(self.ttl))
            .is_some()
    }

    /// Insert or replace the record under its own id
    pub fn insert(&self, metadata: RiskMetadata) {
        let id = metadata.id.clone();
        let replaced = self
            .entries
            .insert(
                id.clone(),
                StoredEntry {
                    metadata,
                    stored_at: Instant::now(),
                },
            )
            .is_some();
        debug!(replaced, "💾 STORE SET: {} (TTL: {}s)", id, self.ttl.as_secs());
    }

    pub fn remove(&self, id: &str) -> Option<RiskMetadata> {
        self.entries.remove(id).map(|(_, entry)| entry.metadata)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired record; returns how many were removed
    pub fn cleanup_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(self.ttl));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            info!("🧹 STORE CLEANUP: {} expired records removed", removed);
        }
        removed
    }

    pub fn stats(&self) -> StoreStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        StoreStats {
            entries: self.entries.len(),
            hits,
            misses,
            hit_rate,
            ttl_secs: self.ttl.as_secs(),
        }
    }
}

/// Store statistics for monitoring
#[derive(Debug, Clone, PartialEq)]
pub struct StoreStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub ttl_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::IntelligentRiskScorer;
    use crate::core::RiskFactors;

    fn record(id: &str) -> RiskMetadata {
        IntelligentRiskScorer::new().generate_risk_metadata(id, RiskFactors::uniform(40.0), vec![])
    }

    #[test]
    fn test_insert_get() {
        let store = MetadataStore::new();
        store.insert(record("tx-1"));

        let found = store.get("tx-1").unwrap();
        assert_eq!(found.id, "tx-1");
        assert!(store.get("TX-1").is_none());
    }

    #[test]
    fn test_insert_replaces() {
        let store = MetadataStore::new();
        store.insert(record("tx-1"));
        let mut newer = record("tx-1");
        newer.reasoning = vec!["updated".to_string()];
        store.insert(newer);

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("tx-1").unwrap().reasoning, vec!["updated"]);
    }

    #[test]
    fn test_expired_entries() {
        let store = MetadataStore::with_ttl(Duration::ZERO);
        store.insert(record("a"));
        store.insert(record("b"));
        std::thread::sleep(Duration::from_millis(5));

        assert!(store.get("a").is_none());
        assert_eq!(store.cleanup_expired(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_expiry_eviction_keeps_fresh_replacement() {
        let store = MetadataStore::with_ttl(Duration::from_secs(3600));
        store.insert(record("tx-1"));

        // Another handler re-inserted the id after this one saw it expired
        assert!(!store.evict_if_expired("tx-1"));
        assert_eq!(store.get("tx-1").unwrap().id, "tx-1");

        let expiring = MetadataStore::with_ttl(Duration::ZERO);
        expiring.insert(record("tx-2"));
        std::thread::sleep(Duration::from_millis(5));
        assert!(expiring.evict_if_expired("tx-2"));
        assert!(expiring.is_empty());
    }

    #[test]
    fn test_stats() {
        let store = MetadataStore::new();
        store.insert(record("a"));
        store.get("a");
        store.get("missing");

        let stats = store.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate, 50.0);
    }
}
