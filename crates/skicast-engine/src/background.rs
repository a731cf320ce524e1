//! Low-priority cache warming for resorts that are not selected.
//!
//! The queue belongs to the batch generation that filled it. A drain loop
//! for an older generation gets nothing from [`BackgroundQueue::next_for`],
//! so superseded prefetchers stop at their next step.

use std::collections::VecDeque;

use parking_lot::Mutex;
use skicast_forecast::{CacheKey, ElevationBand, ForecastFetcher, ResortId};

use crate::loader::{LoadController, ResortOutcome};
use crate::retry::RetryPolicy;
use crate::token::BatchToken;

#[derive(Debug, Default)]
struct QueueState {
    owner: u64,
    pending: VecDeque<ResortId>,
}

#[derive(Debug, Default)]
pub struct BackgroundQueue {
    state: Mutex<QueueState>,
}

impl BackgroundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the queue with every resort of `universe` not in `selected`,
    /// in universe order, owned by `generation`.
    pub fn enqueue_remainder(
        &self,
        universe: &[ResortId],
        selected: &[ResortId],
        generation: u64,
    ) -> usize {
        let pending: VecDeque<ResortId> = universe
            .iter()
            .filter(|id| !selected.contains(id))
            .cloned()
            .collect();
        let queued = pending.len();

        let mut state = self.state.lock();
        state.owner = generation;
        state.pending = pending;
        queued
    }

    /// Pop the next resort, but only for the generation that owns the queue.
    pub fn next_for(&self, generation: u64) -> Option<ResortId> {
        let mut state = self.state.lock();
        if state.owner != generation {
            return None;
        }
        state.pending.pop_front()
    }

    pub fn clear(&self) {
        self.state.lock().pending.clear();
    }

    pub fn pending(&self) -> Vec<ResortId> {
        self.state.lock().pending.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().pending.is_empty()
    }
}

impl<F> LoadController<F>
where
    F: ForecastFetcher + 'static,
{
    /// Prefetch queued resorts one at a time until the queue is empty or the
    /// batch is superseded. Never retries and never reports errors.
    ///
    /// Returns how many resorts were fetched.
    pub async fn process_background(&self, token: &BatchToken, elevation: ElevationBand) -> usize {
        let mut fetched = 0;

        while let Some(resort) = self.queue().next_for(token.generation()) {
            if token.is_stale() {
                break;
            }

            let key = CacheKey::new(resort.clone(), elevation);
            if self.cache().contains(&key) {
                tracing::debug!("Background: {} already cached", key);
                continue;
            }

            match self
                .load_resort(token, &resort, elevation, RetryPolicy::none())
                .await
            {
                ResortOutcome::Fetched => fetched += 1,
                ResortOutcome::Failed => tracing::debug!("Background: skipped {}", resort),
                ResortOutcome::Cached | ResortOutcome::Discarded => {}
            }

            if !token.sleep(self.config().background_delay).await {
                break;
            }
        }

        tracing::debug!(
            "Background prefetch for batch {} finished ({} fetched)",
            token.generation(),
            fetched
        );
        fetched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<ResortId> {
        names.iter().copied().map(ResortId::from).collect()
    }

    #[test]
    fn test_remainder_preserves_universe_order() {
        let queue = BackgroundQueue::new();
        let universe = ids(&["A", "B", "C", "D", "E"]);

        let queued = queue.enqueue_remainder(&universe, &ids(&["D", "A", "B"]), 1);

        assert_eq!(queued, 2);
        assert_eq!(queue.pending(), ids(&["C", "E"]));
    }

    #[test]
    fn test_enqueue_replaces_previous_contents() {
        let queue = BackgroundQueue::new();
        let universe = ids(&["A", "B", "C"]);
        queue.enqueue_remainder(&universe, &ids(&["A"]), 1);
        queue.enqueue_remainder(&universe, &ids(&["B", "C"]), 2);

        assert_eq!(queue.pending(), ids(&["A"]));
    }

    #[test]
    fn test_next_for_only_serves_owner() {
        let queue = BackgroundQueue::new();
        let universe = ids(&["A", "B", "C"]);
        queue.enqueue_remainder(&universe, &[], 7);

        assert_eq!(queue.next_for(6), None);
        assert_eq!(queue.next_for(7), Some("A".into()));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_clear() {
        let queue = BackgroundQueue::new();
        queue.enqueue_remainder(&ids(&["A", "B"]), &[], 1);
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.next_for(1), None);
    }
}
