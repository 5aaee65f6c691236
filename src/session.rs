//! Session wiring: the shared store, both orchestrators and the effects that
//! link an analysis to its hourly detail.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, instrument, warn};

use crate::analyze::AnalyzeOrchestrator;
use crate::api::WeatherBackend;
use crate::config::DefaultsConfig;
use crate::download::{DownloadPayload, resolve_download_request};
use crate::hourly::{HourlyOrchestrator, HourlyView};
use crate::models::{AnalyzeResponse, DownloadFormat, EventType, HourlyResponse};
use crate::store::AppStore;
use crate::Result;

/// One user session
#[derive(Clone)]
pub struct Session {
    store: AppStore,
    backend: Arc<dyn WeatherBackend>,
    analyze: AnalyzeOrchestrator,
    hourly: HourlyOrchestrator,
    force_best_day_refetch: bool,
}

impl Session {
    pub fn new(store: AppStore, backend: Arc<dyn WeatherBackend>, defaults: &DefaultsConfig) -> Self {
        Self {
            analyze: AnalyzeOrchestrator::new(store.clone(), backend.clone()),
            hourly: HourlyOrchestrator::new(store.clone(), backend.clone()),
            store,
            backend,
            force_best_day_refetch: defaults.force_best_day_refetch,
        }
    }

    pub fn store(&self) -> &AppStore {
        &self.store
    }

    #[must_use]
    pub fn hourly_view(&self) -> HourlyView {
        self.hourly.view()
    }

    /// Runs the analysis, then loads the hourly detail for the selected day
    pub async fn analyze(&self) -> Result<Arc<AnalyzeResponse>> {
        let result = self.analyze.run_analyze().await?;
        self.refresh_hourly().await;
        Ok(result)
    }

    /// Changes the selected day and reloads its hourly detail
    pub async fn select_date(&self, date: NaiveDate) -> Option<Arc<HourlyResponse>> {
        self.store.set_date(date);
        self.refresh_hourly().await
    }

    /// Changes the event type and reloads the hourly detail
    pub async fn select_event_type(&self, event_type: EventType) -> Option<Arc<HourlyResponse>> {
        self.store.set_event_type(event_type);
        self.refresh_hourly().await
    }

    /// Jumps to a candidate best day. The hourly detail bypasses the cache
    /// unless `force_best_day_refetch` is disabled.
    #[instrument(skip(self))]
    pub async fn select_best_day(&self, date: NaiveDate) -> Result<Option<Arc<HourlyResponse>>> {
        self.store.set_date(date);
        let (result, event_type) = self
            .store
            .with_state(|state| (state.analyze_result(), state.event_type()));
        let Some(result) = result else {
            return Ok(None);
        };

        let location = &result.location;
        self.hourly
            .load_hourly(
                location.lat,
                location.lon,
                date,
                Some(event_type),
                self.force_best_day_refetch,
            )
            .await
            .map(Some)
    }

    /// Hourly effect: reloads the detail for the analyzed location, the
    /// selected date and the event type. Failures stay in the hourly view.
    async fn refresh_hourly(&self) -> Option<Arc<HourlyResponse>> {
        let (result, date, event_type) = self
            .store
            .with_state(|state| (state.analyze_result(), state.date(), state.event_type()));
        let result = result?;

        let location = &result.location;
        match self
            .hourly
            .load_hourly(location.lat, location.lon, date, Some(event_type), false)
            .await
        {
            Ok(hourly) => Some(hourly),
            Err(e) if e.is_superseded() => {
                debug!("Hourly refresh overtaken by a newer request");
                None
            }
            Err(e) => {
                warn!(error = %e, "Hourly fetch failed");
                None
            }
        }
    }

    /// Downloads the export of the current analysis
    #[instrument(skip(self))]
    pub async fn download(&self, format: DownloadFormat) -> Result<DownloadPayload> {
        let (result, city, date, language) = self.store.with_state(|state| {
            (
                state.analyze_result(),
                state.city().to_string(),
                state.date(),
                state.language(),
            )
        });
        let request =
            resolve_download_request(result.as_deref(), &city, date, format, language.messages())?;
        self.backend.download(&request).await
    }
}
