//! Result cache: process-lifetime store of validated stage outputs.
//!
//! Keyed by (stage, fingerprint). Each key owns a `OnceCell`, which gives
//! single-flight semantics: concurrent callers for the same key wait on the
//! one computation in progress instead of issuing duplicate LLM calls.
//! If that computation fails, the cell stays empty and the next waiter
//! computes. Entries never expire: they live until `clear()`, shutdown, or
//! eviction of a value that fails re-validation.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::OnceCell;

use crate::analysis::models::{AnalysisReport, FinalReport};
use crate::pipeline::fingerprint::Fingerprint;
use crate::pipeline::Stage;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub stage: Stage,
    pub fingerprint: Fingerprint,
}

impl CacheKey {
    pub fn new(stage: Stage, fingerprint: Fingerprint) -> Self {
        Self { stage, fingerprint }
    }
}

/// A validated output of either stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageResult {
    Analysis(AnalysisReport),
    Final(FinalReport),
}

impl From<AnalysisReport> for StageResult {
    fn from(report: AnalysisReport) -> Self {
        StageResult::Analysis(report)
    }
}

impl From<FinalReport> for StageResult {
    fn from(report: FinalReport) -> Self {
        StageResult::Final(report)
    }
}

impl TryFrom<StageResult> for AnalysisReport {
    type Error = StageResult;

    fn try_from(result: StageResult) -> Result<Self, Self::Error> {
        match result {
            StageResult::Analysis(report) => Ok(report),
            other => Err(other),
        }
    }
}

impl TryFrom<StageResult> for FinalReport {
    type Error = StageResult;

    fn try_from(result: StageResult) -> Result<Self, Self::Error> {
        match result {
            StageResult::Final(report) => Ok(report),
            other => Err(other),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    result: StageResult,
    created_at: DateTime<Utc>,
}

impl CacheEntry {
    fn new(result: StageResult) -> Self {
        Self {
            result,
            created_at: Utc::now(),
        }
    }
}

/// Whether a lookup was served from the cache or computed by this caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Hit,
    Computed,
}

#[derive(Debug, Clone, Serialize)]
pub struct CachedKey {
    pub stage: Stage,
    pub fingerprint: Fingerprint,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub keys: Vec<CachedKey>,
}

type Slot = Arc<OnceCell<CacheEntry>>;

#[derive(Default)]
pub struct ResultCache {
    slots: Mutex<HashMap<CacheKey, Slot>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<StageResult> {
        self.slots()
            .get(key)
            .and_then(|slot| slot.get())
            .map(|entry| entry.result.clone())
    }

    /// Stores a result, replacing any previous value (last writer wins).
    pub fn put(&self, key: CacheKey, result: StageResult) {
        let slot = Arc::new(OnceCell::new_with(Some(CacheEntry::new(result))));
        self.slots().insert(key, slot);
    }

    /// Returns the cached result for `key`, or runs `compute` to produce it.
    /// Stored values are served without touching the slot; otherwise at most
    /// one `compute` per key runs at a time and other callers wait for it.
    /// Failed computations store nothing.
    pub async fn get_or_try_compute<F, Fut, E>(
        &self,
        key: &CacheKey,
        compute: F,
    ) -> Result<(StageResult, Lookup), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<StageResult, E>>,
    {
        if let Some(result) = self.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok((result, Lookup::Hit));
        }

        let slot = self.slots().entry(key.clone()).or_default().clone();

        let mut computed = false;
        let outcome = slot
            .get_or_try_init(|| {
                computed = true;
                let fut = compute();
                async move { fut.await.map(CacheEntry::new) }
            })
            .await;

        match outcome {
            Ok(entry) => {
                let lookup = if computed {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    Lookup::Computed
                } else {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    Lookup::Hit
                };
                Ok((entry.result.clone(), lookup))
            }
            Err(e) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                self.discard_empty_slot(key, &slot);
                Err(e)
            }
        }
    }

    /// Drops a stored result so the next lookup recomputes it.
    /// A computation still in flight for the key is left alone.
    pub fn evict(&self, key: &CacheKey) -> bool {
        let mut slots = self.slots();
        match slots.get(key) {
            Some(slot) if slot.initialized() => slots.remove(key).is_some(),
            _ => false,
        }
    }

    pub fn clear(&self) {
        self.slots().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn stats(&self) -> CacheStats {
        let mut keys: Vec<CachedKey> = self
            .slots()
            .iter()
            .filter_map(|(key, slot)| {
                slot.get().map(|entry| CachedKey {
                    stage: key.stage,
                    fingerprint: key.fingerprint.clone(),
                    created_at: entry.created_at,
                })
            })
            .collect();
        keys.sort_by_key(|k| k.created_at);

        CacheStats {
            entries: keys.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            keys,
        }
    }

    // Removes the slot only when it is still empty and nobody else holds it.
    fn discard_empty_slot(&self, key: &CacheKey, slot: &Slot) {
        let mut slots = self.slots();
        let unused = slots.get(key).is_some_and(|current| {
            Arc::ptr_eq(current, slot) && !current.initialized() && Arc::strong_count(current) == 2
        });
        if unused {
            slots.remove(key);
        }
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<CacheKey, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
