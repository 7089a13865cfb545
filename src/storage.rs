//! Saved-form persistence.
//!
//! The form and the last rendered report are written to browser local
//! storage so a reload (or an accidental tab close) loses nothing. The
//! [`KeyValueStore`] trait hides the backend so the restore and persist
//! flows run against an in-memory map on native targets.

use crate::{FormState, SavedForm};
use log::{info, warn};
use std::cell::RefCell;
use std::collections::HashMap;

/// Storage key holding the serialized form payload.
pub const SAVED_FORM_KEY: &str = "SavedForm";
/// Storage key holding the last rendered report markup.
pub const REPORT_KEY: &str = "valuationReport";

/// Minimal string key/value store.
pub trait KeyValueStore {
    fn load(&self, key: &str) -> Option<String>;
    fn save(&self, key: &str, value: &str);
}

/// Browser `localStorage` backend. Missing storage (disabled by the user,
/// or a non-browser context) degrades to no-ops with a warning.
pub struct BrowserStorage;

fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window()?.local_storage().ok().flatten()
}

impl KeyValueStore for BrowserStorage {
    fn load(&self, key: &str) -> Option<String> {
        local_storage()?.get_item(key).ok().flatten()
    }

    fn save(&self, key: &str, value: &str) {
        match local_storage() {
            Some(storage) => {
                if let Err(err) = storage.set_item(key, value) {
                    warn!("Failed to write {key} to local storage: {err:?}");
                }
            }
            None => warn!("Local storage is unavailable, {key} not saved"),
        }
    }
}

/// In-memory backend used by tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn save(&self, key: &str, value: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }
}

/// Builds the initial form state, restoring whatever survived the last
/// session.
///
/// Starts from the defaults for `current_year`, then overlays the saved
/// form if one parses; the stored report markup is only brought back
/// together with a valid saved form. A malformed blob is discarded with a
/// warning and the defaults stand. Always ends by reconciling the row
/// table with the forecast horizon.
pub fn initialize<S: KeyValueStore>(store: &S, current_year: i32) -> (FormState, Option<String>) {
    let mut state = FormState::with_defaults(current_year);
    let mut report = None;
    if let Some(raw) = store.load(SAVED_FORM_KEY) {
        match serde_json::from_str::<SavedForm>(&raw) {
            Ok(saved) => {
                state.apply_saved(&saved);
                info!("Form data is loaded from the local storage");
                report = store.load(REPORT_KEY);
                if report.is_some() {
                    info!("Valuation report is loaded from the local storage");
                }
            }
            Err(err) => warn!("Discarding malformed saved form: {err}"),
        }
    }
    state.adjust_rows();
    (state, report)
}

/// Writes the current form (as its wire payload) and report markup.
pub fn persist<S: KeyValueStore>(store: &S, state: &FormState, report: &str) {
    match serde_json::to_string(&state.to_request()) {
        Ok(json) => store.save(SAVED_FORM_KEY, &json),
        Err(err) => warn!("Failed to serialize form state: {err}"),
    }
    store.save(REPORT_KEY, report);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.load("missing"), None);
        store.save("k", "v1");
        store.save("k", "v2");
        assert_eq!(store.load("k"), Some("v2".to_string()));
    }

    #[test]
    fn test_initialize_empty_store_yields_defaults() {
        let store = MemoryStore::new();
        let (state, report) = initialize(&store, 2024);
        assert_eq!(state, FormState::with_defaults(2024));
        assert_eq!(state.rows.len(), defaults::YEARS_FORECAST);
        assert_eq!(report, None);
    }

    #[test]
    fn test_initialize_restores_persisted_session() {
        let store = MemoryStore::new();
        let mut state = FormState::with_defaults(2024);
        state.name = "Globex".to_string();
        state.rows[1].revenue = "42,000".to_string();
        persist(&store, &state, "<h5>Globex</h5>");

        let (restored, report) = initialize(&store, 2030);
        assert_eq!(restored.name, "Globex");
        assert_eq!(restored.data_first_year, "2024");
        assert_eq!(restored.rows.len(), 3);
        assert_eq!(restored.rows[1].revenue, "42,000");
        assert_eq!(report, Some("<h5>Globex</h5>".to_string()));
    }

    #[test]
    fn test_initialize_discards_malformed_blob() {
        let store = MemoryStore::new();
        store.save(SAVED_FORM_KEY, "{not json");
        store.save(REPORT_KEY, "<h5>stale</h5>");
        let (state, report) = initialize(&store, 2024);
        assert_eq!(state, FormState::with_defaults(2024));
        assert_eq!(report, None);
    }

    #[test]
    fn test_initialize_discards_wrongly_typed_blob() {
        let store = MemoryStore::new();
        store.save(SAVED_FORM_KEY, r#"{"revenue":"lots"}"#);
        let (state, _) = initialize(&store, 2024);
        assert_eq!(state, FormState::with_defaults(2024));
    }

    #[test]
    fn test_report_needs_a_saved_form() {
        let store = MemoryStore::new();
        store.save(REPORT_KEY, "<h5>orphan</h5>");
        let (_, report) = initialize(&store, 2024);
        assert_eq!(report, None);
    }

    #[test]
    fn test_persist_writes_wire_payload() {
        let store = MemoryStore::new();
        let state = FormState::with_defaults(2024);
        persist(&store, &state, "");
        let blob = store.load(SAVED_FORM_KEY).unwrap();
        assert!(blob.contains("\"dataFirstYear\":2024"));
        assert!(blob.contains(&format!("\"name\":\"{}\"", defaults::COMPANY_NAME)));
        assert_eq!(store.load(REPORT_KEY), Some(String::new()));
    }
}
