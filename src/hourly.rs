//! Hourly orchestrator: cache-first loading of the single-day detail.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};

use crate::api::WeatherBackend;
use crate::cache::HourlyKey;
use crate::models::{EventType, HourlyRequest, HourlyResponse};
use crate::store::AppStore;
use crate::{Result, WayraError};

/// What the hourly panel currently shows
#[derive(Debug, Clone, Default)]
pub struct HourlyView {
    pub data: Option<Arc<HourlyResponse>>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
struct Shared {
    view: Mutex<HourlyView>,
    generation: AtomicU64,
}

impl Shared {
    fn view(&self) -> MutexGuard<'_, HourlyView> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }
}

struct LoadingGuard {
    shared: Arc<Shared>,
    generation: u64,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        if self.shared.is_current(self.generation) {
            self.shared.view().loading = false;
        }
    }
}

/// Drives `GET /weather/hourly` through the shared hourly cache
#[derive(Clone)]
pub struct HourlyOrchestrator {
    store: AppStore,
    backend: Arc<dyn WeatherBackend>,
    shared: Arc<Shared>,
}

impl HourlyOrchestrator {
    pub fn new(store: AppStore, backend: Arc<dyn WeatherBackend>) -> Self {
        Self {
            store,
            backend,
            shared: Arc::new(Shared::default()),
        }
    }

    #[must_use]
    pub fn view(&self) -> HourlyView {
        self.shared.view().clone()
    }

    /// Loads the hourly detail for one location and day.
    ///
    /// Without `force` a cached entry is returned immediately. Otherwise one
    /// request is sent and its result is written to the cache even when a
    /// newer call has taken over the view. On failure the previous data stays
    /// visible next to the error.
    #[instrument(skip(self))]
    pub async fn load_hourly(
        &self,
        lat: f64,
        lon: f64,
        date: NaiveDate,
        event_type: Option<EventType>,
        force: bool,
    ) -> Result<Arc<HourlyResponse>> {
        let key = HourlyKey::new(lat, lon, date, event_type);
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if !force {
            if let Some(cached) = self.store.hourly_from_cache(&key) {
                let mut view = self.shared.view();
                view.data = Some(cached.clone());
                view.error = None;
                view.loading = false;
                return Ok(cached);
            }
        }

        {
            let mut view = self.shared.view();
            view.loading = true;
            view.error = None;
        }
        let _loading = LoadingGuard {
            shared: self.shared.clone(),
            generation,
        };

        let request = HourlyRequest {
            lat,
            lon,
            date,
            event_type,
        };
        let start_time = Instant::now();

        match self.backend.hourly(&request).await {
            Ok(response) => {
                if !response.is_aligned() {
                    warn!(
                        %key,
                        hours = response.time.len(),
                        temperature = response.temperature.len(),
                        humidity = response.humidity.len(),
                        wind = response.wind.len(),
                        precipitation = response.precipitation.len(),
                        "Hourly result has misaligned series"
                    );
                }
                let response = Arc::new(response);
                self.store.cache_hourly(key.clone(), response.clone());

                if !self.shared.is_current(generation) {
                    debug!(%key, "Hourly result cached but overtaken by a newer request");
                    return Err(WayraError::Superseded);
                }
                self.shared.view().data = Some(response.clone());

                info!(
                    %key,
                    hours = response.time.len(),
                    elapsed_ms = start_time.elapsed().as_millis() as u64,
                    "Hourly forecast loaded"
                );
                Ok(response)
            }
            Err(e) => {
                if !self.shared.is_current(generation) {
                    return Err(WayraError::Superseded);
                }
                let message = e
                    .user_message()
                    .unwrap_or_else(|| self.store.language().messages().hourly_fetch.to_string());
                self.shared.view().error = Some(message);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::testing::FakeBackend;
    use crate::models::hourly::fixtures::hourly_response;

    use tokio::sync::Notify;

    fn may_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn setup() -> (AppStore, Arc<FakeBackend>, HourlyOrchestrator) {
        let store = AppStore::default();
        let backend = Arc::new(FakeBackend::default());
        let orchestrator = HourlyOrchestrator::new(store.clone(), backend.clone());
        (store, backend, orchestrator)
    }

    #[tokio::test]
    async fn test_same_fingerprint_is_fetched_once() {
        let (_store, backend, orchestrator) = setup();
        let event = Some(EventType::Viaje);

        let first = orchestrator
            .load_hourly(10.12345, 20.6789, may_first(), event, false)
            .await
            .unwrap();
        let second = orchestrator
            .load_hourly(10.1234, 20.6789, may_first(), event, false)
            .await
            .unwrap();

        assert_eq!(backend.hourly_calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
        let view = orchestrator.view();
        assert!(!view.loading);
        assert!(view.error.is_none());
    }

    #[tokio::test]
    async fn test_force_always_fetches_and_overwrites_cache() {
        let (store, backend, orchestrator) = setup();
        let key = HourlyKey::new(1.0, 2.0, may_first(), None);
        let stale = Arc::new(hourly_response("stale"));
        store.cache_hourly(key.clone(), stale.clone());

        let fresh = orchestrator
            .load_hourly(1.0, 2.0, may_first(), None, true)
            .await
            .unwrap();

        assert_eq!(backend.hourly_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fresh.date, "2024-05-01");
        let cached = store.hourly_from_cache(&key).unwrap();
        assert!(Arc::ptr_eq(&cached, &fresh));
        assert!(!Arc::ptr_eq(&cached, &stale));
    }

    #[tokio::test]
    async fn test_cache_hit_clears_previous_error() {
        let (store, backend, orchestrator) = setup();
        backend.set_failure(Some(("Sin datos", 503)));
        orchestrator
            .load_hourly(1.0, 2.0, may_first(), None, false)
            .await
            .unwrap_err();
        assert_eq!(orchestrator.view().error.as_deref(), Some("Sin datos"));

        let next_day = may_first().succ_opt().unwrap();
        store.cache_hourly(
            HourlyKey::new(1.0, 2.0, next_day, None),
            Arc::new(hourly_response("2024-05-02")),
        );
        orchestrator
            .load_hourly(1.0, 2.0, next_day, None, false)
            .await
            .unwrap();

        let view = orchestrator.view();
        assert!(view.error.is_none());
        assert_eq!(view.data.unwrap().date, "2024-05-02");
        assert_eq!(backend.hourly_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_keeps_last_good_data() {
        let (_store, backend, orchestrator) = setup();
        orchestrator
            .load_hourly(1.0, 2.0, may_first(), None, false)
            .await
            .unwrap();

        backend.set_failure(Some(("Sin datos", 503)));
        let err = orchestrator
            .load_hourly(1.0, 2.0, may_first(), None, true)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(503));

        let view = orchestrator.view();
        assert!(!view.loading);
        assert_eq!(view.error.as_deref(), Some("Sin datos"));
        assert_eq!(view.data.unwrap().date, "2024-05-01");
    }

    #[tokio::test]
    async fn test_cancelled_load_lowers_loading() {
        let (store, backend, orchestrator) = setup();
        *backend.hourly_gate.lock().unwrap() = Some(Arc::new(Notify::new()));

        let call = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                orchestrator
                    .load_hourly(1.0, 2.0, may_first(), None, false)
                    .await
            })
        };
        while backend.hourly_calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        assert!(orchestrator.view().loading);

        call.abort();
        assert!(call.await.unwrap_err().is_cancelled());

        let view = orchestrator.view();
        assert!(!view.loading);
        assert!(view.error.is_none());
        assert!(view.data.is_none());
        assert!(
            store
                .hourly_from_cache(&HourlyKey::new(1.0, 2.0, may_first(), None))
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_misaligned_result_is_still_shown() {
        let (store, backend, orchestrator) = setup();
        let mut misaligned = hourly_response("2024-05-01");
        misaligned.wind.truncate(2);
        *backend.hourly_override.lock().unwrap() = Some(misaligned);

        let data = orchestrator
            .load_hourly(1.0, 2.0, may_first(), None, false)
            .await
            .unwrap();

        assert!(!data.is_aligned());
        assert_eq!(orchestrator.view().data.unwrap().wind.len(), 2);
        assert!(
            store
                .hourly_from_cache(&HourlyKey::new(1.0, 2.0, may_first(), None))
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_stale_completion_only_fills_the_cache() {
        let (store, backend, orchestrator) = setup();
        let gate = Arc::new(Notify::new());
        *backend.hourly_gate.lock().unwrap() = Some(gate.clone());

        let slow = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                orchestrator
                    .load_hourly(1.0, 2.0, may_first(), None, false)
                    .await
            })
        };
        while backend.hourly_calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        assert!(orchestrator.view().loading);

        // A newer call is answered from the cache while the first is in flight
        let next_day = may_first().succ_opt().unwrap();
        store.cache_hourly(
            HourlyKey::new(1.0, 2.0, next_day, None),
            Arc::new(hourly_response("2024-05-02")),
        );
        orchestrator
            .load_hourly(1.0, 2.0, next_day, None, false)
            .await
            .unwrap();

        gate.notify_one();
        let err = slow.await.unwrap().unwrap_err();
        assert!(err.is_superseded());

        let view = orchestrator.view();
        assert!(!view.loading);
        assert_eq!(view.data.unwrap().date, "2024-05-02");
        assert!(
            store
                .hourly_from_cache(&HourlyKey::new(1.0, 2.0, may_first(), None))
                .is_some()
        );
    }
}
