//! Preference store: pin set mirror plus the two sort-mode layers.

use crate::{Identity, PinSet, SettingsBackend, SortMode};
use tracing::{debug, info, warn};

/// Persisted pin list (JSON array of identity strings).
pub const PINNED_KEY: &str = "bcp_pinned";
/// Persisted global default sort mode label.
pub const SORT_MODE_KEY: &str = "bcp_sort_mode";

#[derive(Debug)]
pub struct PreferenceStore<B: SettingsBackend> {
    backend: B,
    pins: PinSet,
    session_sort: Option<SortMode>,
}

impl<B: SettingsBackend> PreferenceStore<B> {
    pub fn new(backend: B) -> Self {
        let mut store = Self {
            backend,
            pins: PinSet::new(),
            session_sort: None,
        };
        store.load_pins();
        store
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Refresh the in-memory mirror from the backend.
    pub fn load_pins(&mut self) -> &PinSet {
        self.pins = match self.backend.get(PINNED_KEY) {
            Some(raw) => {
                let pins = PinSet::from_json(&raw);
                if pins.is_empty() && raw.trim() != "[]" {
                    warn!(target: "prefs", raw_len = raw.len(), "pinned_value_unusable");
                }
                pins
            }
            None => PinSet::new(),
        };
        debug!(target: "prefs", pins = self.pins.len(), "pins_loaded");
        &self.pins
    }

    pub fn save_pins(&mut self) {
        self.backend.set(PINNED_KEY, self.pins.to_json());
    }

    pub fn pins(&self) -> &PinSet {
        &self.pins
    }

    pub fn is_pinned(&self, identity: &Identity) -> bool {
        self.pins.contains(identity)
    }

    /// Flip membership and persist immediately. Returns the new state.
    pub fn toggle_pin(&mut self, identity: &Identity) -> bool {
        let pinned = self.pins.toggle(identity);
        self.save_pins();
        info!(target: "prefs", identity = identity.as_str(), pinned, "pin_toggled");
        pinned
    }

    /// Persisted default; unknown or missing values read as `Native`.
    pub fn global_sort_mode(&self) -> SortMode {
        self.backend
            .get(SORT_MODE_KEY)
            .and_then(|raw| SortMode::from_label(&raw))
            .unwrap_or_default()
    }

    pub fn set_global_sort_mode(&mut self, mode: SortMode) {
        self.backend.set(SORT_MODE_KEY, mode.label().to_string());
        info!(target: "prefs", mode = mode.label(), "global_sort_mode_set");
    }

    pub fn session_sort_mode(&self) -> Option<SortMode> {
        self.session_sort
    }

    pub fn set_session_sort_mode(&mut self, mode: Option<SortMode>) {
        self.session_sort = mode;
        debug!(target: "prefs", mode = ?mode, "session_sort_mode_set");
    }

    /// Validated write from a raw label (e.g. a button's data attribute).
    /// Unrecognized labels are ignored and return `false`.
    pub fn set_session_sort_label(&mut self, raw: &str) -> bool {
        match SortMode::from_label(raw) {
            Some(mode) => {
                self.set_session_sort_mode(Some(mode));
                true
            }
            None => false,
        }
    }

    /// Session override if set, else the global default.
    pub fn effective_sort_mode(&self) -> SortMode {
        self.session_sort
            .unwrap_or_else(|| self.global_sort_mode())
    }

    /// Palette (re)opened: reload pins and drop any stale override.
    pub fn begin_session(&mut self) {
        self.load_pins();
        self.session_sort = None;
    }

    pub fn end_session(&mut self) {
        self.session_sort = None;
    }
}
