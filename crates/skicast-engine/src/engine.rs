//! The engine facade.
//!
//! [`ForecastEngine`] is a cheap-clone handle over shared state. It owns the
//! load controller (and through it the cache and the background queue) and
//! tracks the active elevation band and the overall load state.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use skicast_forecast::{
    CacheKey, ElevationBand, ForecastCache, ForecastFetcher, ResortCatalog, ResortForecast, ResortId,
};
use tokio::task::JoinHandle;

use crate::loader::{BatchReport, LoadController, LoaderConfig};
use crate::ranking::{rank, AggregationWindow, DaySelector, RankingRequest};
use crate::selection::Selection;

/// Overall state of the displayed data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    /// Nothing requested yet, or the last load was cancelled
    #[default]
    Idle,
    Loading,
    Ready,
    /// The first load failed for every resort; nothing has ever loaded
    Unavailable,
}

/// One entry of the sort-day selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayOption {
    pub selector: DaySelector,
    pub label: String,
}

#[derive(Debug, Default)]
struct EngineState {
    elevation: ElevationBand,
    load_state: LoadState,
    loaded_any: bool,
}

struct EngineInner<F> {
    controller: LoadController<F>,
    catalog: ResortCatalog,
    state: RwLock<EngineState>,
    background: Mutex<Option<JoinHandle<usize>>>,
}

pub struct ForecastEngine<F> {
    inner: Arc<EngineInner<F>>,
}

impl<F> Clone for ForecastEngine<F> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<F> ForecastEngine<F>
where
    F: ForecastFetcher + 'static,
{
    pub fn new(fetcher: F, catalog: ResortCatalog, config: LoaderConfig) -> Self {
        let controller = LoadController::new(Arc::new(fetcher), Arc::new(ForecastCache::new()), config);
        Self {
            inner: Arc::new(EngineInner {
                controller,
                catalog,
                state: RwLock::new(EngineState::default()),
                background: Mutex::new(None),
            }),
        }
    }

    pub fn catalog(&self) -> &ResortCatalog {
        &self.inner.catalog
    }

    pub fn elevation(&self) -> ElevationBand {
        self.inner.state.read().elevation
    }

    pub fn load_state(&self) -> LoadState {
        self.inner.state.read().load_state
    }

    pub fn cached(&self, resort: &ResortId, elevation: ElevationBand) -> Option<Arc<ResortForecast>> {
        self.cache().get(&CacheKey::new(resort.clone(), elevation))
    }

    pub fn cached_count(&self) -> usize {
        self.cache().len()
    }

    /// Snapshot of the resorts still waiting for background prefetch.
    pub fn background_pending(&self) -> Vec<ResortId> {
        self.inner.controller.queue().pending()
    }

    fn cache(&self) -> &ForecastCache {
        self.inner.controller.cache()
    }

    /// Switch the active elevation band. The running batch is cancelled
    /// before the cache is cleared. Returns whether the band changed.
    pub fn change_elevation(&self, elevation: ElevationBand) -> bool {
        let mut state = self.inner.state.write();
        self.switch_elevation(&mut state, elevation)
    }

    fn switch_elevation(&self, state: &mut EngineState, elevation: ElevationBand) -> bool {
        if state.elevation == elevation {
            return false;
        }

        self.inner.controller.cancel_active();
        self.cache().clear();
        tracing::info!("Elevation changed from {} to {}", state.elevation, elevation);
        state.elevation = elevation;
        if state.load_state == LoadState::Loading {
            state.load_state = LoadState::Idle;
        }
        true
    }

    /// Load `selection` at `elevation`, superseding any batch in flight.
    ///
    /// Settles once every selected resort is resolved; never fails. When the
    /// batch is still current afterwards, background prefetch of the other
    /// resorts is started.
    pub async fn request_load(&self, selection: &Selection, elevation: ElevationBand) -> BatchReport {
        let controller = &self.inner.controller;

        // The band switch and the new batch happen under one guard, so the
        // current batch always matches the engine's elevation.
        let (token, queued) = {
            let mut state = self.inner.state.write();
            self.switch_elevation(&mut state, elevation);

            if selection.is_empty() {
                controller.cancel_active();
                if state.load_state == LoadState::Loading {
                    state.load_state = LoadState::Idle;
                }
                return BatchReport::empty(controller.current_generation(), elevation);
            }

            let token = controller.begin_batch();
            let queued = controller.queue().enqueue_remainder(
                self.inner.catalog.resorts(),
                selection.resorts(),
                token.generation(),
            );
            state.load_state = LoadState::Loading;
            (token, queued)
        };
        tracing::debug!("{} resorts queued for background prefetch", queued);

        let report = controller.run_batch(&token, selection.resorts(), elevation).await;

        if token.is_current() {
            self.settle(&report);
            if controller.config().background_prefetch && queued > 0 {
                let handle = controller.spawn_background(token, elevation);
                *self.inner.background.lock() = Some(handle);
            }
        }
        report
    }

    fn settle(&self, report: &BatchReport) {
        let mut state = self.inner.state.write();
        if report.loaded() > 0 {
            state.loaded_any = true;
        }

        state.load_state = if report.all_failed() && !state.loaded_any {
            tracing::error!("No forecast data could be loaded");
            LoadState::Unavailable
        } else {
            LoadState::Ready
        };
    }

    /// Cancel the active batch and its background prefetch.
    pub fn cancel(&self) {
        self.inner.controller.cancel_active();
        let mut state = self.inner.state.write();
        if state.load_state == LoadState::Loading {
            state.load_state = LoadState::Idle;
        }
    }

    /// Deselect everything, cancelling the active batch.
    pub fn deselect_all(&self, selection: &mut Selection) {
        selection.clear();
        self.cancel();
    }

    /// Wait for the most recent background prefetch to finish.
    ///
    /// Returns how many resorts it fetched.
    pub async fn wait_for_background(&self) -> usize {
        let handle = self.inner.background.lock().take();
        match handle {
            Some(handle) => match handle.await {
                Ok(fetched) => fetched,
                Err(e) => {
                    tracing::warn!("Background prefetch task failed: {}", e);
                    0
                }
            },
            None => 0,
        }
    }

    /// Loaded forecasts for `selection` in display order.
    ///
    /// Reads the cache only; resorts without data are left out.
    pub fn visible_forecasts(
        &self,
        selection: &Selection,
        elevation: ElevationBand,
        ranking: &RankingRequest,
    ) -> Vec<Arc<ResortForecast>> {
        let mut loaded: HashMap<ResortId, Arc<ResortForecast>> = selection
            .resorts()
            .iter()
            .filter_map(|id| self.cached(id, elevation).map(|f| (id.clone(), f)))
            .collect();

        let ids: Vec<ResortId> = selection
            .resorts()
            .iter()
            .filter(|id| loaded.contains_key(*id))
            .cloned()
            .collect();

        rank(&ids, |id| loaded.get(id).cloned(), ranking)
            .into_iter()
            .filter_map(|id| loaded.remove(&id))
            .collect()
    }

    /// Options for the sort-day selector: the day names of the first selected
    /// resort's cached forecast, then the aggregation windows. Empty until
    /// that forecast is loaded.
    pub fn day_options(&self, selection: &Selection, elevation: ElevationBand) -> Vec<DayOption> {
        let Some(first) = selection.resorts().first() else {
            return Vec::new();
        };
        let Some(forecast) = self.cached(first, elevation) else {
            return Vec::new();
        };
        if forecast.days.is_empty() {
            return Vec::new();
        }

        let days = forecast.days.iter().enumerate().map(|(i, day)| DayOption {
            selector: DaySelector::Day(i),
            label: day.name.clone(),
        });
        let windows = AggregationWindow::ALL.iter().map(|w| DayOption {
            selector: DaySelector::Window(*w),
            label: w.label().to_string(),
        });
        days.chain(windows).collect()
    }
}
