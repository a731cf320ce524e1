//! Batch generation tokens.
//!
//! A single monotonically increasing counter decides which batch is current.
//! Advancing it invalidates every token handed out before, and cancels the
//! previous batch's [`CancellationToken`] so sleeping work wakes up early.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// Identifies one load batch. Cheap to clone; every async step of the batch
/// carries a copy.
#[derive(Debug, Clone)]
pub struct BatchToken {
    generation: u64,
    current: Arc<AtomicU64>,
    cancel: CancellationToken,
}

impl BatchToken {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True while no newer batch has started and no cancel was issued.
    pub fn is_current(&self) -> bool {
        !self.cancel.is_cancelled() && self.current.load(Ordering::SeqCst) == self.generation
    }

    pub fn is_stale(&self) -> bool {
        !self.is_current()
    }

    /// Sleep for `delay`, returning early (with `false`) if the batch is
    /// cancelled first.
    pub async fn sleep(&self, delay: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}

/// Source of [`BatchToken`]s. Exactly one token is current at a time.
#[derive(Debug, Default)]
pub struct GenerationCounter {
    current: Arc<AtomicU64>,
    active: Mutex<Option<CancellationToken>>,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation, cancelling the one before it.
    pub fn advance(&self) -> BatchToken {
        let mut active = self.active.lock();
        if let Some(previous) = active.take() {
            previous.cancel();
        }

        let generation = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();
        *active = Some(cancel.clone());

        BatchToken {
            generation,
            current: self.current.clone(),
            cancel,
        }
    }

    /// Invalidate the current generation without starting a new batch.
    ///
    /// Returns whether a batch was active.
    pub fn invalidate(&self) -> bool {
        let mut active = self.active.lock();
        self.current.fetch_add(1, Ordering::SeqCst);
        match active.take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_supersedes_previous() {
        let counter = GenerationCounter::new();
        let first = counter.advance();
        assert!(first.is_current());

        let second = counter.advance();
        assert!(first.is_stale());
        assert!(second.is_current());
        assert!(second.generation() > first.generation());
    }

    #[test]
    fn test_invalidate_without_new_batch() {
        let counter = GenerationCounter::new();
        assert!(!counter.invalidate());

        let token = counter.advance();
        assert!(counter.invalidate());
        assert!(token.is_stale());
        assert!(!counter.invalidate());
    }

    #[test]
    fn test_clones_share_state() {
        let counter = GenerationCounter::new();
        let token = counter.advance();
        let copy = token.clone();
        counter.advance();
        assert!(copy.is_stale());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_completes_when_current() {
        let counter = GenerationCounter::new();
        let token = counter.advance();
        assert!(token.sleep(Duration::from_millis(100)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_wakes_on_supersede() {
        let counter = Arc::new(GenerationCounter::new());
        let token = counter.advance();

        let sleeper = tokio::spawn(async move { token.sleep(Duration::from_secs(3600)).await });
        tokio::task::yield_now().await;
        counter.advance();

        assert!(!sleeper.await.unwrap());
    }
}
