//! Foreground batch loading.
//!
//! A batch fetches every selected resort concurrently and settles only when
//! each one has been resolved from cache, fetched, failed, or discarded.
//! Cancellation is observed at two points per resort: before the fetcher is
//! called and before the result is written to the cache.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use skicast_forecast::{CacheKey, ElevationBand, ForecastCache, ForecastFetcher, ResortId};
use tokio::task::JoinHandle;

use crate::background::BackgroundQueue;
use crate::retry::{with_retry, RetryOutcome, RetryPolicy};
use crate::token::{BatchToken, GenerationCounter};

pub const DEFAULT_BACKGROUND_DELAY_MS: u64 = 50;

/// How a single resort settled within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResortOutcome {
    /// Already cached for this elevation
    Cached,
    /// Fetched and written to the cache
    Fetched,
    /// Fetch failed (after the retry, for foreground loads)
    Failed,
    /// Superseded before the result could be used
    Discarded,
}

/// Summary of one settled batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub generation: u64,
    pub elevation: ElevationBand,
    pub resorts: Vec<(ResortId, ResortOutcome)>,
    /// A newer batch (or a cancel) arrived before this one settled.
    pub superseded: bool,
}

impl BatchReport {
    pub fn empty(generation: u64, elevation: ElevationBand) -> Self {
        Self {
            generation,
            elevation,
            resorts: Vec::new(),
            superseded: false,
        }
    }

    pub fn count(&self, outcome: ResortOutcome) -> usize {
        self.resorts.iter().filter(|(_, o)| *o == outcome).count()
    }

    /// Resorts now available in the cache.
    pub fn loaded(&self) -> usize {
        self.count(ResortOutcome::Cached) + self.count(ResortOutcome::Fetched)
    }

    pub fn outcome(&self, resort: &ResortId) -> Option<ResortOutcome> {
        self.resorts
            .iter()
            .find(|(id, _)| id == resort)
            .map(|(_, outcome)| *outcome)
    }

    pub fn is_empty(&self) -> bool {
        self.resorts.is_empty()
    }

    /// Every target resort failed to load.
    pub fn all_failed(&self) -> bool {
        !self.resorts.is_empty() && self.count(ResortOutcome::Failed) == self.resorts.len()
    }
}

#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Applied to foreground (displayed) resorts only
    pub foreground_retry: RetryPolicy,
    /// Pause between background prefetches
    pub background_delay: Duration,
    /// Warm the cache with unselected resorts after each batch
    pub background_prefetch: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            foreground_retry: RetryPolicy::default(),
            background_delay: Duration::from_millis(DEFAULT_BACKGROUND_DELAY_MS),
            background_prefetch: true,
        }
    }
}

/// Owns cancellation and is the only writer of the forecast cache.
pub struct LoadController<F> {
    fetcher: Arc<F>,
    cache: Arc<ForecastCache>,
    generations: Arc<GenerationCounter>,
    queue: Arc<BackgroundQueue>,
    config: LoaderConfig,
}

impl<F> Clone for LoadController<F> {
    fn clone(&self) -> Self {
        Self {
            fetcher: self.fetcher.clone(),
            cache: self.cache.clone(),
            generations: self.generations.clone(),
            queue: self.queue.clone(),
            config: self.config.clone(),
        }
    }
}

impl<F> LoadController<F>
where
    F: ForecastFetcher + 'static,
{
    pub fn new(fetcher: Arc<F>, cache: Arc<ForecastCache>, config: LoaderConfig) -> Self {
        Self {
            fetcher,
            cache,
            generations: Arc::new(GenerationCounter::new()),
            queue: Arc::new(BackgroundQueue::new()),
            config,
        }
    }

    pub fn cache(&self) -> &ForecastCache {
        &self.cache
    }

    pub fn queue(&self) -> &BackgroundQueue {
        &self.queue
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Generation of the current (or most recently cancelled) batch.
    pub fn current_generation(&self) -> u64 {
        self.generations.current()
    }

    /// Supersede whatever is running and hand out the new batch token.
    /// The background queue is emptied; the caller refills it.
    pub fn begin_batch(&self) -> BatchToken {
        let token = self.generations.advance();
        self.queue.clear();
        tracing::debug!("Batch {} started", token.generation());
        token
    }

    /// Cancel the active batch (and its background work) without starting
    /// another one. Returns whether anything was active.
    pub fn cancel_active(&self) -> bool {
        let was_active = self.generations.invalidate();
        self.queue.clear();
        if was_active {
            tracing::info!("Active load cancelled");
        }
        was_active
    }

    /// Cancel the current batch, then load `resorts` as a new one.
    pub async fn start_batch(&self, resorts: &[ResortId], elevation: ElevationBand) -> BatchReport {
        let token = self.begin_batch();
        self.run_batch(&token, resorts, elevation).await
    }

    /// Load every resort under `token` concurrently and wait for all of them.
    pub async fn run_batch(
        &self,
        token: &BatchToken,
        resorts: &[ResortId],
        elevation: ElevationBand,
    ) -> BatchReport {
        tracing::info!(
            "Loading {} resorts at {} elevation (batch {})",
            resorts.len(),
            elevation,
            token.generation()
        );

        let loads = resorts
            .iter()
            .map(|resort| self.load_resort(token, resort, elevation, self.config.foreground_retry));
        let outcomes = join_all(loads).await;

        let report = BatchReport {
            generation: token.generation(),
            elevation,
            resorts: resorts.iter().cloned().zip(outcomes).collect(),
            superseded: token.is_stale(),
        };

        tracing::info!(
            "Batch {} settled: {} cached, {} fetched, {} failed, {} discarded",
            report.generation,
            report.count(ResortOutcome::Cached),
            report.count(ResortOutcome::Fetched),
            report.count(ResortOutcome::Failed),
            report.count(ResortOutcome::Discarded)
        );
        report
    }

    /// Resolve one resort: cache hit, or fetch under `policy` and store.
    pub(crate) async fn load_resort(
        &self,
        token: &BatchToken,
        resort: &ResortId,
        elevation: ElevationBand,
        policy: RetryPolicy,
    ) -> ResortOutcome {
        let key = CacheKey::new(resort.clone(), elevation);
        if self.cache.contains(&key) {
            tracing::debug!("{} served from cache", key);
            return ResortOutcome::Cached;
        }

        let fetcher = &*self.fetcher;
        let outcome = with_retry(policy, token, resort.as_str(), move || {
            fetcher.fetch(resort, elevation)
        })
        .await;

        match outcome {
            RetryOutcome::Succeeded(forecast) => {
                if self
                    .cache
                    .put_when(key, Arc::new(forecast), || token.is_current())
                {
                    tracing::debug!("{} ({}) cached", resort, elevation);
                    ResortOutcome::Fetched
                } else {
                    tracing::debug!("Discarding stale result for {} ({})", resort, elevation);
                    ResortOutcome::Discarded
                }
            }
            RetryOutcome::Exhausted(_) if token.is_stale() => ResortOutcome::Discarded,
            RetryOutcome::Exhausted(e) => {
                tracing::warn!(
                    "Giving up on {} ({}): {} (transient: {})",
                    resort,
                    elevation,
                    e,
                    e.is_transient()
                );
                ResortOutcome::Failed
            }
            RetryOutcome::Cancelled => ResortOutcome::Discarded,
        }
    }

    /// Drain the background queue for `token` on a separate task.
    pub fn spawn_background(&self, token: BatchToken, elevation: ElevationBand) -> JoinHandle<usize> {
        let controller = self.clone();
        tokio::spawn(async move { controller.process_background(&token, elevation).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcomes: &[ResortOutcome]) -> BatchReport {
        BatchReport {
            generation: 1,
            elevation: ElevationBand::Base,
            resorts: outcomes
                .iter()
                .enumerate()
                .map(|(i, o)| (ResortId::new(format!("R{i}")), *o))
                .collect(),
            superseded: false,
        }
    }

    #[test]
    fn test_report_counts() {
        let r = report(&[
            ResortOutcome::Cached,
            ResortOutcome::Fetched,
            ResortOutcome::Failed,
            ResortOutcome::Discarded,
        ]);
        assert_eq!(r.loaded(), 2);
        assert_eq!(r.count(ResortOutcome::Failed), 1);
        assert!(!r.all_failed());
        assert_eq!(r.outcome(&"R2".into()), Some(ResortOutcome::Failed));
    }

    #[test]
    fn test_all_failed() {
        assert!(report(&[ResortOutcome::Failed, ResortOutcome::Failed]).all_failed());
        assert!(!report(&[]).all_failed());
        assert!(!report(&[ResortOutcome::Failed, ResortOutcome::Discarded]).all_failed());
    }

    #[test]
    fn test_loader_config_default() {
        let config = LoaderConfig::default();
        assert_eq!(config.foreground_retry.max_retries, 1);
        assert_eq!(config.background_delay, Duration::from_millis(50));
        assert!(config.background_prefetch);
    }
}
