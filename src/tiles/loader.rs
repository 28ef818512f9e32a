use crossbeam_channel::{unbounded, Receiver, Sender};
use futures::FutureExt;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::panic::AssertUnwindSafe;

use super::cache::{TileCache, TileImage, TileKey};
use super::source::TileFetcher;
use crate::core::config::TileLoadingConfig;
use crate::prelude::{Arc, HashMap, HashSet, Instant};
use crate::traits::{should_retry_with_backoff, CacheStats, Configurable};
use crate::{MosaicError, Result};

/// Priority for tile loading (higher number = higher priority)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TilePriority {
    /// Coarser-level tiles used as fallback
    Background = 1,
    /// Tiles inside the prefetch margin only
    Prefetch = 10,
    /// Tiles inside the container (highest priority)
    Visible = 100,
}

/// A tile loading task with priority
#[derive(Debug, Clone)]
pub struct TileTask {
    pub key: TileKey,
    pub priority: TilePriority,
    /// Sequence number for tie-breaking (lower = earlier)
    pub sequence: u64,
}

impl PartialEq for TileTask {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TileTask {}

impl PartialOrd for TileTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TileTask {
    fn cmp(&self, other: &Self) -> Ordering {
        // Higher priority first, then earlier sequence number
        match self.priority.cmp(&other.priority) {
            Ordering::Equal => other.sequence.cmp(&self.sequence),
            other => other,
        }
    }
}

/// Result of a tile loading operation
#[derive(Debug)]
pub struct TileResult {
    pub key: TileKey,
    pub data: Result<Vec<u8>>,
}

/// Outcome of [`TileLoader::request`]
#[derive(Debug, Clone, PartialEq)]
pub enum TileStatus {
    /// Queued or in flight
    Pending,
    Ready(TileImage),
    /// Failed and not (yet) eligible for another attempt
    Failed,
}

impl TileStatus {
    pub fn image(&self) -> Option<&TileImage> {
        match self {
            TileStatus::Ready(image) => Some(image),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TileStatus::Pending => "pending",
            TileStatus::Ready(_) => "ready",
            TileStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct FailureInfo {
    /// Retries made after the first failed attempt
    retries: u32,
    last_failure: Instant,
    priority: TilePriority,
    retrying: bool,
}

/// De-duplicating asynchronous tile loader backed by an LRU cache
///
/// Requests are queued by priority and fetched through the global runtime at
/// most `max_concurrent` at a time. Completed fetches travel back over a
/// channel and are applied by [`poll_results`](Self::poll_results) on the
/// caller's thread.
pub struct TileLoader {
    config: TileLoadingConfig,
    fetcher: Arc<dyn TileFetcher>,
    cache: TileCache,
    queue: BinaryHeap<TileTask>,
    queued: HashMap<TileKey, TilePriority>,
    in_flight: HashSet<TileKey>,
    failed: HashMap<TileKey, FailureInfo>,
    /// In flight but dropped by `prune`; their failures are not recorded
    superseded: HashSet<TileKey>,
    result_tx: Sender<TileResult>,
    result_rx: Receiver<TileResult>,
    sequence: u64,
    fetches_started: u64,
}

impl TileLoader {
    pub fn new(config: TileLoadingConfig, fetcher: Arc<dyn TileFetcher>) -> Self {
        let (result_tx, result_rx) = unbounded();
        Self {
            cache: TileCache::new(config.cache_capacity),
            config,
            fetcher,
            queue: BinaryHeap::new(),
            queued: HashMap::default(),
            in_flight: HashSet::default(),
            failed: HashMap::default(),
            superseded: HashSet::default(),
            result_tx,
            result_rx,
            sequence: 0,
            fetches_started: 0,
        }
    }

    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    /// Resolve a tile: cached image, pending fetch, or failure
    ///
    /// The first request for a key queues a fetch; repeated requests while it
    /// is queued or in flight never queue another one.
    pub fn request(&mut self, key: TileKey, priority: TilePriority, now: Instant) -> TileStatus {
        if let Some(image) = self.cache.get(&key) {
            return TileStatus::Ready(image);
        }
        if self.in_flight.contains(&key) {
            self.superseded.remove(&key);
            return TileStatus::Pending;
        }
        if let Some(current) = self.queued.get(&key).copied() {
            if priority > current {
                self.enqueue(key, priority);
            }
            return TileStatus::Pending;
        }
        if let Some(info) = self.failed.get_mut(&key) {
            info.priority = info.priority.max(priority);
            if self.retry_allowed(&key, now) {
                self.enqueue(key, priority);
                return TileStatus::Pending;
            }
            return TileStatus::Failed;
        }
        self.enqueue(key, priority);
        TileStatus::Pending
    }

    /// Current state of a tile without queueing anything or counting a lookup
    pub fn status(&self, key: &TileKey) -> TileStatus {
        if let Some(image) = self.cache.peek(key) {
            TileStatus::Ready(image)
        } else if self.queued.contains_key(key) || self.in_flight.contains(key) {
            TileStatus::Pending
        } else if self.failed.contains_key(key) {
            TileStatus::Failed
        } else {
            TileStatus::Pending
        }
    }

    fn enqueue(&mut self, key: TileKey, priority: TilePriority) {
        self.sequence += 1;
        self.queued.insert(key, priority);
        self.queue.push(TileTask {
            key,
            priority,
            sequence: self.sequence,
        });
    }

    fn retry_allowed(&self, key: &TileKey, now: Instant) -> bool {
        match self.failed.get(key) {
            Some(info) => should_retry_with_backoff(
                info.retries,
                Some(info.last_failure),
                now,
                self.config.max_retries,
                self.config.retry_delay_ms,
                self.config.exponential_backoff,
            ),
            None => true,
        }
    }

    /// Start queued fetches up to the concurrency limit; returns how many started
    pub fn dispatch(&mut self) -> usize {
        let mut started = 0;
        while self.in_flight.len() < self.config.max_concurrent.max(1) {
            let Some(task) = self.queue.pop() else {
                break;
            };
            // stale heap entry from a priority upgrade or a pruned request
            if self.queued.get(&task.key) != Some(&task.priority) {
                continue;
            }
            self.queued.remove(&task.key);
            if let Some(info) = self.failed.get_mut(&task.key) {
                info.retrying = true;
            }

            let key = task.key;
            let fetcher = Arc::clone(&self.fetcher);
            let tx = self.result_tx.clone();
            log::debug!("fetching tile {key:?} ({:?})", task.priority);
            let spawned = crate::runtime::spawn(async move {
                let data = match AssertUnwindSafe(fetcher.fetch(&key)).catch_unwind().await {
                    Ok(data) => data,
                    Err(_) => Err(MosaicError::Runtime(format!("fetch of {key:?} panicked"))),
                };
                let _ = tx.send(TileResult { key, data });
            });

            match spawned {
                Ok(_handle) => {
                    self.in_flight.insert(key);
                    self.fetches_started += 1;
                    started += 1;
                }
                Err(e) => {
                    log::warn!("could not start tile fetch: {e}");
                    // keep the request so a later dispatch can try again
                    self.enqueue(key, task.priority);
                    break;
                }
            }
        }
        started
    }

    /// Apply finished fetches; returns how many completed
    pub fn poll_results(&mut self, now: Instant) -> usize {
        let mut completed = 0;
        while let Ok(result) = self.result_rx.try_recv() {
            completed += 1;
            self.in_flight.remove(&result.key);
            let superseded = self.superseded.remove(&result.key);
            match result.data {
                Ok(bytes) => {
                    log::debug!("tile ready {:?} ({} bytes)", result.key, bytes.len());
                    self.failed.remove(&result.key);
                    self.cache.put(TileImage::new(result.key, bytes));
                }
                Err(e) if superseded => {
                    log::debug!("ignoring failure of superseded tile {:?}: {e}", result.key);
                    self.failed.remove(&result.key);
                }
                Err(e) => {
                    log::warn!("tile {:?} failed: {e}", result.key);
                    match self.failed.get_mut(&result.key) {
                        Some(info) => {
                            if info.retrying {
                                info.retries += 1;
                            }
                            info.retrying = false;
                            info.last_failure = now;
                        }
                        None => {
                            self.failed.insert(
                                result.key,
                                FailureInfo {
                                    retries: 0,
                                    last_failure: now,
                                    priority: TilePriority::Visible,
                                    retrying: false,
                                },
                            );
                        }
                    }
                }
            }
        }
        completed
    }

    /// Re-queue failed tiles whose backoff has elapsed; returns how many
    pub fn retry_due(&mut self, now: Instant) -> usize {
        let due: Vec<(TileKey, TilePriority)> = self
            .failed
            .iter()
            .filter(|(key, info)| {
                !info.retrying
                    && !self.queued.contains_key(*key)
                    && !self.in_flight.contains(*key)
            })
            .filter(|(key, _)| self.retry_allowed(key, now))
            .map(|(key, info)| (*key, info.priority))
            .collect();
        for (key, priority) in &due {
            self.enqueue(*key, *priority);
        }
        due.len()
    }

    /// Drop queued requests and failure records no longer wanted.
    /// In-flight fetches finish and still populate the cache, but a failure
    /// of one is not retried.
    pub fn prune(&mut self, wanted: &HashSet<TileKey>) {
        self.superseded = self
            .in_flight
            .iter()
            .filter(|key| !wanted.contains(*key))
            .copied()
            .collect();
        self.queued.retain(|key, _| wanted.contains(key));
        self.queue.retain(|task| wanted.contains(&task.key));
        self.failed.retain(|key, _| wanted.contains(key));
    }

    /// Forget everything except the cache
    pub fn reset(&mut self) {
        self.superseded = self.in_flight.clone();
        self.queue.clear();
        self.queued.clear();
        self.failed.clear();
    }

    pub fn pending_count(&self) -> usize {
        self.queued.len()
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_idle(&self) -> bool {
        self.queued.is_empty() && self.in_flight.is_empty()
    }

    /// Total fetches handed to the runtime
    pub fn fetches_started(&self) -> u64 {
        self.fetches_started
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            in_flight: self.in_flight.len(),
            ..self.cache.stats()
        }
    }
}

impl Configurable for TileLoader {
    type Config = TileLoadingConfig;

    fn config(&self) -> &TileLoadingConfig {
        &self.config
    }

    fn set_config(&mut self, config: TileLoadingConfig) -> Result<()> {
        Self::validate_config(&config)?;
        if config.cache_capacity != self.config.cache_capacity {
            self.cache = TileCache::new(config.cache_capacity);
        }
        self.config = config;
        Ok(())
    }

    fn validate_config(config: &TileLoadingConfig) -> Result<()> {
        if config.cache_capacity == 0 || config.max_concurrent == 0 {
            return Err(crate::MosaicError::Config(
                "cache_capacity and max_concurrent must be > 0".into(),
            ));
        }
        Ok(())
    }
}
