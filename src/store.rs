//! Shared session state.
//!
//! [`AppStore`] is a cheap cloneable handle to one [`AppState`]. Every mutation
//! goes through a named operation; [`AppStore::with_state`] runs several of them
//! under a single lock so readers never observe a half-applied update.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, warn};

use crate::cache::{HourlyCache, HourlyKey};
use crate::config::DefaultsConfig;
use crate::i18n::{Language, Theme};
use crate::models::{AnalyzeResponse, Coordinates, EventType, HourlyResponse, LastQuery, QueryParams};
use crate::preferences::{PreferenceStore, STORAGE_LANGUAGE, STORAGE_THEME};

/// Session-scoped data owned by the store
#[derive(Debug, Clone)]
pub struct AppState {
    city: String,
    date: NaiveDate,
    event_type: EventType,
    coordinates: Option<Coordinates>,
    use_pin: bool,
    language: Language,
    theme: Theme,
    analyze_result: Option<Arc<AnalyzeResponse>>,
    analyze_loading: bool,
    analyze_error: Option<String>,
    last_analyze: Option<DateTime<Utc>>,
    last_query: Option<LastQuery>,
    hourly_cache: HourlyCache,
    analyze_generation: u64,
}

impl AppState {
    #[must_use]
    pub fn new(language: Language, theme: Theme, event_type: EventType) -> Self {
        Self {
            city: String::new(),
            date: Utc::now().date_naive(),
            event_type,
            coordinates: None,
            use_pin: false,
            language,
            theme,
            analyze_result: None,
            analyze_loading: false,
            analyze_error: None,
            last_analyze: None,
            last_query: None,
            hourly_cache: HourlyCache::new(),
            analyze_generation: 0,
        }
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        self.coordinates
    }

    pub fn use_pin(&self) -> bool {
        self.use_pin
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn analyze_result(&self) -> Option<Arc<AnalyzeResponse>> {
        self.analyze_result.clone()
    }

    pub fn analyze_loading(&self) -> bool {
        self.analyze_loading
    }

    pub fn analyze_error(&self) -> Option<&str> {
        self.analyze_error.as_deref()
    }

    pub fn last_analyze(&self) -> Option<DateTime<Utc>> {
        self.last_analyze
    }

    pub fn last_query(&self) -> Option<&LastQuery> {
        self.last_query.as_ref()
    }

    pub fn hourly_cache_len(&self) -> usize {
        self.hourly_cache.len()
    }

    /// Current query inputs
    #[must_use]
    pub fn query(&self) -> QueryParams {
        QueryParams {
            city: self.city.clone(),
            coordinates: self.coordinates,
            date: self.date,
            event_type: self.event_type,
            use_pin: self.use_pin,
        }
    }

    pub fn set_city(&mut self, city: impl Into<String>) {
        self.city = city.into();
    }

    pub fn set_date(&mut self, date: NaiveDate) {
        self.date = date;
    }

    pub fn set_event_type(&mut self, event_type: EventType) {
        self.event_type = event_type;
    }

    pub fn set_coordinates(&mut self, coordinates: Option<Coordinates>) {
        self.coordinates = coordinates;
    }

    pub fn set_use_pin(&mut self, use_pin: bool) {
        self.use_pin = use_pin;
    }

    pub fn set_analyze_loading(&mut self, loading: bool) {
        self.analyze_loading = loading;
    }

    pub fn set_analyze_result(&mut self, result: Option<Arc<AnalyzeResponse>>) {
        self.analyze_result = result;
    }

    pub fn set_analyze_error(&mut self, error: Option<String>) {
        self.analyze_error = error;
    }

    pub fn set_last_analyze(&mut self, timestamp: Option<DateTime<Utc>>) {
        self.last_analyze = timestamp;
    }

    pub fn set_last_query(&mut self, query: Option<LastQuery>) {
        self.last_query = query;
    }

    pub fn cache_hourly(&mut self, key: HourlyKey, value: Arc<HourlyResponse>) {
        self.hourly_cache.insert(key, value);
    }

    pub fn hourly_from_cache(&self, key: &HourlyKey) -> Option<Arc<HourlyResponse>> {
        self.hourly_cache.get(key)
    }

    pub fn clear_hourly_cache(&mut self) {
        self.hourly_cache.clear();
    }

    /// Drops the analysis and everything derived from it. Query inputs and
    /// the hourly cache are kept.
    pub fn reset_analysis(&mut self) {
        self.analyze_result = None;
        self.analyze_error = None;
        self.analyze_loading = false;
        self.last_analyze = None;
        self.last_query = None;
    }

    /// Starts a new analyze call and returns its generation.
    ///
    /// The newest call owns the loading flag: it is raised here and only the
    /// holder of the current generation may lower it again.
    pub fn begin_analyze(&mut self) -> u64 {
        self.analyze_generation += 1;
        self.analyze_loading = true;
        self.analyze_error = None;
        self.analyze_generation
    }

    pub fn is_current_analyze(&self, generation: u64) -> bool {
        self.analyze_generation == generation
    }
}

/// Cloneable handle to the shared [`AppState`]
#[derive(Debug, Clone)]
pub struct AppStore {
    state: Arc<Mutex<AppState>>,
    preferences: Option<Arc<PreferenceStore>>,
}

impl Default for AppStore {
    fn default() -> Self {
        Self::new(&DefaultsConfig::default(), None)
    }
}

impl AppStore {
    /// Builds the store, reading persisted language and theme when a
    /// preference store is available
    pub fn new(defaults: &DefaultsConfig, preferences: Option<Arc<PreferenceStore>>) -> Self {
        let language = preferences
            .as_deref()
            .and_then(|store| read_preference(store, STORAGE_LANGUAGE))
            .unwrap_or(defaults.language);
        let theme = preferences
            .as_deref()
            .and_then(|store| read_preference(store, STORAGE_THEME))
            .unwrap_or_default();

        debug!(%language, %theme, "Initialized session state");
        Self {
            state: Arc::new(Mutex::new(AppState::new(language, theme, defaults.event_type))),
            preferences,
        }
    }

    fn lock(&self) -> MutexGuard<'_, AppState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` with exclusive access to the state
    pub fn with_state<R>(&self, f: impl FnOnce(&mut AppState) -> R) -> R {
        f(&mut self.lock())
    }

    /// A copy of the whole state
    #[must_use]
    pub fn snapshot(&self) -> AppState {
        self.lock().clone()
    }

    #[must_use]
    pub fn query(&self) -> QueryParams {
        self.lock().query()
    }

    #[must_use]
    pub fn language(&self) -> Language {
        self.lock().language
    }

    #[must_use]
    pub fn theme(&self) -> Theme {
        self.lock().theme
    }

    #[must_use]
    pub fn analyze_result(&self) -> Option<Arc<AnalyzeResponse>> {
        self.lock().analyze_result()
    }

    #[must_use]
    pub fn analyze_error(&self) -> Option<String> {
        self.lock().analyze_error.clone()
    }

    #[must_use]
    pub fn analyze_loading(&self) -> bool {
        self.lock().analyze_loading
    }

    pub fn set_city(&self, city: impl Into<String>) {
        self.lock().set_city(city);
    }

    pub fn set_date(&self, date: NaiveDate) {
        self.lock().set_date(date);
    }

    pub fn set_event_type(&self, event_type: EventType) {
        self.lock().set_event_type(event_type);
    }

    pub fn set_coordinates(&self, coordinates: Option<Coordinates>) {
        self.lock().set_coordinates(coordinates);
    }

    pub fn set_use_pin(&self, use_pin: bool) {
        self.lock().set_use_pin(use_pin);
    }

    /// Changes the language and persists it when possible
    pub fn set_language(&self, language: Language) {
        self.persist(STORAGE_LANGUAGE, language.code());
        self.lock().language = language;
    }

    /// Changes the theme and persists it when possible
    pub fn set_theme(&self, theme: Theme) {
        self.persist(STORAGE_THEME, theme.code());
        self.lock().theme = theme;
    }

    /// Forgets the stored language and theme and returns to the defaults
    pub fn reset_preferences(&self, defaults: &DefaultsConfig) {
        if let Some(store) = &self.preferences {
            for key in [STORAGE_LANGUAGE, STORAGE_THEME] {
                if let Err(e) = store.remove(key) {
                    warn!(key, error = %e, "Failed to remove preference");
                }
            }
        }
        let mut state = self.lock();
        state.language = defaults.language;
        state.theme = Theme::default();
    }

    pub fn set_analyze_loading(&self, loading: bool) {
        self.lock().set_analyze_loading(loading);
    }

    pub fn set_analyze_result(&self, result: Option<Arc<AnalyzeResponse>>) {
        self.lock().set_analyze_result(result);
    }

    pub fn set_analyze_error(&self, error: Option<String>) {
        self.lock().set_analyze_error(error);
    }

    pub fn set_last_analyze(&self, timestamp: Option<DateTime<Utc>>) {
        self.lock().set_last_analyze(timestamp);
    }

    pub fn set_last_query(&self, query: Option<LastQuery>) {
        self.lock().set_last_query(query);
    }

    pub fn cache_hourly(&self, key: HourlyKey, value: Arc<HourlyResponse>) {
        self.lock().cache_hourly(key, value);
    }

    #[must_use]
    pub fn hourly_from_cache(&self, key: &HourlyKey) -> Option<Arc<HourlyResponse>> {
        self.lock().hourly_from_cache(key)
    }

    pub fn clear_hourly_cache(&self) {
        self.lock().clear_hourly_cache();
    }

    pub fn reset_analysis(&self) {
        self.lock().reset_analysis();
    }

    fn persist(&self, key: &str, value: &str) {
        let Some(store) = &self.preferences else {
            warn!(key, "No preference store available, preference not persisted");
            return;
        };
        if let Err(e) = store.set(key, value) {
            warn!(key, error = %e, "Failed to persist preference");
        }
    }
}

fn read_preference<T: std::str::FromStr>(store: &PreferenceStore, key: &str) -> Option<T> {
    match store.get(key) {
        Ok(Some(raw)) => match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(key, value = %raw, "Ignoring unrecognized stored preference");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            warn!(key, error = %e, "Failed to read preference");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnalyzeRequest;
    use crate::models::analyze::fixtures::analyze_response;
    use crate::models::hourly::fixtures::hourly_response;
    use tempfile::TempDir;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[test]
    fn test_initial_state() {
        let store = AppStore::default();
        let state = store.snapshot();
        assert_eq!(state.city(), "");
        assert_eq!(state.event_type(), EventType::Viaje);
        assert_eq!(state.language(), Language::Es);
        assert_eq!(state.theme(), Theme::Dark);
        assert!(!state.use_pin());
        assert!(!state.analyze_loading());
        assert!(state.analyze_result().is_none());
        assert_eq!(state.hourly_cache_len(), 0);
    }

    #[test]
    fn test_query_reflects_mutations() {
        let store = AppStore::default();
        store.set_city("Arequipa");
        store.set_date(date());
        store.set_event_type(EventType::Caminata);
        store.set_coordinates(Some(Coordinates::new(-16.4, -71.5)));
        store.set_use_pin(true);

        let query = store.query();
        assert_eq!(query.city, "Arequipa");
        assert_eq!(query.date, date());
        assert_eq!(query.event_type, EventType::Caminata);
        assert_eq!(query.coordinates, Some(Coordinates::new(-16.4, -71.5)));
        assert!(query.use_pin);
    }

    #[test]
    fn test_hourly_cache_operations() {
        let store = AppStore::default();
        let key = HourlyKey::new(1.0, 2.0, date(), None);
        assert!(store.hourly_from_cache(&key).is_none());

        store.cache_hourly(key.clone(), Arc::new(hourly_response("2024-05-01")));
        assert!(store.hourly_from_cache(&key).is_some());

        store.clear_hourly_cache();
        assert!(store.hourly_from_cache(&key).is_none());
    }

    #[test]
    fn test_reset_analysis_keeps_inputs_and_cache() {
        let store = AppStore::default();
        store.set_city("Cusco");
        store.cache_hourly(
            HourlyKey::new(1.0, 2.0, date(), None),
            Arc::new(hourly_response("2024-05-01")),
        );
        store.with_state(|state| {
            state.set_analyze_result(Some(Arc::new(analyze_response())));
            state.set_analyze_error(Some("boom".to_string()));
            state.set_analyze_loading(true);
            state.set_last_analyze(Some(Utc::now()));
            state.set_last_query(Some(LastQuery::City(AnalyzeRequest {
                city: "Cusco".to_string(),
                date: date(),
                event_type: EventType::Viaje,
            })));
        });

        store.reset_analysis();
        let state = store.snapshot();
        assert!(state.analyze_result().is_none());
        assert!(state.analyze_error().is_none());
        assert!(!state.analyze_loading());
        assert!(state.last_analyze().is_none());
        assert!(state.last_query().is_none());
        assert_eq!(state.city(), "Cusco");
        assert_eq!(state.hourly_cache_len(), 1);
    }

    #[test]
    fn test_generations_track_the_newest_call() {
        let store = AppStore::default();
        store.set_analyze_error(Some("old".to_string()));
        let first = store.with_state(AppState::begin_analyze);
        let second = store.with_state(AppState::begin_analyze);
        store.with_state(|state| {
            assert!(state.analyze_loading());
            assert!(state.analyze_error().is_none());
            assert!(!state.is_current_analyze(first));
            assert!(state.is_current_analyze(second));
        });
    }

    #[test]
    fn test_preferences_without_store_are_a_no_op() {
        let store = AppStore::default();
        store.set_language(Language::En);
        store.set_theme(Theme::Light);
        assert_eq!(store.language(), Language::En);
        assert_eq!(store.theme(), Theme::Light);
    }

    #[test]
    fn test_preferences_are_written_through_and_read_at_startup() {
        let temp_dir = TempDir::new().unwrap();
        let preferences = Arc::new(PreferenceStore::open(temp_dir.path()).unwrap());

        let store = AppStore::new(&DefaultsConfig::default(), Some(preferences.clone()));
        store.set_language(Language::En);
        store.set_theme(Theme::Light);
        assert_eq!(preferences.get(STORAGE_LANGUAGE).unwrap().as_deref(), Some("en"));

        let restored = AppStore::new(&DefaultsConfig::default(), Some(preferences));
        assert_eq!(restored.language(), Language::En);
        assert_eq!(restored.theme(), Theme::Light);
    }

    #[test]
    fn test_unrecognized_stored_preference_falls_back_to_default() {
        let temp_dir = TempDir::new().unwrap();
        let preferences = Arc::new(PreferenceStore::open(temp_dir.path()).unwrap());
        preferences.set(STORAGE_LANGUAGE, "klingon").unwrap();

        let store = AppStore::new(&DefaultsConfig::default(), Some(preferences));
        assert_eq!(store.language(), Language::Es);
    }

    #[test]
    fn test_reset_preferences_forgets_stored_values() {
        let temp_dir = TempDir::new().unwrap();
        let preferences = Arc::new(PreferenceStore::open(temp_dir.path()).unwrap());
        let defaults = DefaultsConfig {
            language: Language::En,
            ..DefaultsConfig::default()
        };

        let store = AppStore::new(&defaults, Some(preferences.clone()));
        store.set_language(Language::Es);
        store.set_theme(Theme::Light);
        store.reset_preferences(&defaults);

        assert_eq!(store.language(), Language::En);
        assert_eq!(store.theme(), Theme::Dark);
        assert_eq!(preferences.get(STORAGE_LANGUAGE).unwrap(), None);
        assert_eq!(preferences.get(STORAGE_THEME).unwrap(), None);
    }
}
