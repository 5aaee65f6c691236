//! Analyze orchestrator: turns the current query into one analyze request and
//! folds the outcome back into the shared store.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::api::WeatherBackend;
use crate::i18n::Messages;
use crate::models::{AnalyzeCoordsRequest, AnalyzeRequest, AnalyzeResponse, LastQuery, QueryParams};
use crate::store::{AppState, AppStore};
use crate::{Result, WayraError};

/// Lowers the analyze loading flag when the call that raised it ends,
/// including when its future is dropped mid-request
struct LoadingGuard {
    store: AppStore,
    generation: u64,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        let generation = self.generation;
        self.store.with_state(|state| {
            if state.is_current_analyze(generation) {
                state.set_analyze_loading(false);
            }
        });
    }
}

/// Builds the request for the active mode, rejecting incomplete input.
///
/// Pin mode requires coordinates; city mode requires a non-blank name.
pub fn resolve_request(query: &QueryParams, messages: &Messages) -> Result<LastQuery> {
    if query.use_pin {
        let coords = query
            .coordinates
            .ok_or_else(|| WayraError::validation(messages.map_required))?;
        return Ok(LastQuery::Coords(AnalyzeCoordsRequest {
            lat: coords.lat,
            lon: coords.lon,
            date: query.date,
            event_type: Some(query.event_type),
        }));
    }

    let city = query.city.trim();
    if city.is_empty() {
        return Err(WayraError::validation(messages.missing_city));
    }
    Ok(LastQuery::City(AnalyzeRequest {
        city: city.to_string(),
        date: query.date,
        event_type: query.event_type,
    }))
}

/// Accepts a successful result: stores it, drops every cached hourly entry and
/// aligns the query inputs with the server-resolved location
fn accept_result(state: &mut AppState, request: &LastQuery, result: Arc<AnalyzeResponse>) {
    let location = result.location.clone();
    state.set_analyze_result(Some(result));
    state.set_last_analyze(Some(Utc::now()));
    state.clear_hourly_cache();

    match request {
        LastQuery::City(_) => state.set_city(location.city.clone()),
        LastQuery::Coords(_) if !location.city.is_empty() => state.set_city(location.city.clone()),
        LastQuery::Coords(_) => {}
    }
    state.set_coordinates(Some(location.coordinates()));
}

/// Drives `POST /analyze` and `POST /analyze/coords`
#[derive(Clone)]
pub struct AnalyzeOrchestrator {
    store: AppStore,
    backend: Arc<dyn WeatherBackend>,
}

impl AnalyzeOrchestrator {
    pub fn new(store: AppStore, backend: Arc<dyn WeatherBackend>) -> Self {
        Self { store, backend }
    }

    /// Runs one analysis for the current query.
    ///
    /// On return the loading flag is down and exactly one of result or error
    /// is set. Errors are also returned so callers can skip duplicate
    /// notifications. A call overtaken by a newer one writes nothing and
    /// returns [`WayraError::Superseded`].
    #[instrument(skip(self))]
    pub async fn run_analyze(&self) -> Result<Arc<AnalyzeResponse>> {
        let (generation, query, language) = self
            .store
            .with_state(|state| (state.begin_analyze(), state.query(), state.language()));
        let _loading = LoadingGuard {
            store: self.store.clone(),
            generation,
        };
        let messages = language.messages();

        let request = match resolve_request(&query, messages) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Analyze rejected before dispatch");
                return Err(self.fail(generation, e, messages));
            }
        };

        let dispatched = self.store.with_state(|state| {
            if state.is_current_analyze(generation) {
                state.set_last_query(Some(request.clone()));
                true
            } else {
                false
            }
        });
        if !dispatched {
            return Err(WayraError::Superseded);
        }

        let start_time = Instant::now();
        let outcome = match &request {
            LastQuery::City(body) => self.backend.analyze_city(body).await,
            LastQuery::Coords(body) => self.backend.analyze_coords(body).await,
        };

        let result = match outcome {
            Ok(result) => Arc::new(result),
            Err(e) => return Err(self.fail(generation, e, messages)),
        };

        for (series, len) in result.misaligned_series() {
            warn!(
                series = %series,
                len,
                expected = result.temperature.len(),
                "Analyze result has misaligned series"
            );
        }

        let accepted = self.store.with_state(|state| {
            if !state.is_current_analyze(generation) {
                return false;
            }
            accept_result(state, &request, result.clone());
            true
        });
        if !accepted {
            info!("Discarding analyze result overtaken by a newer request");
            return Err(WayraError::Superseded);
        }

        info!(
            location = %result.location.label(),
            days = result.temperature.len(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Analysis completed"
        );
        Ok(result)
    }

    /// Records a failure for the current generation and hands the error back
    fn fail(&self, generation: u64, error: WayraError, messages: &Messages) -> WayraError {
        let message = error
            .user_message()
            .unwrap_or_else(|| messages.generic.to_string());

        self.store.with_state(|state| {
            if state.is_current_analyze(generation) {
                state.set_analyze_error(Some(message));
                state.set_analyze_result(None);
                error
            } else {
                WayraError::Superseded
            }
        })
    }
}
