//! Preference data model and best-effort persistence.
//!
//! Holds the pieces of state that outlive a palette session (the pin set and
//! the global default sort mode) plus the session-scoped sort override. Every
//! read path self-heals: corrupt or unknown persisted values collapse to an
//! empty pin set or `SortMode::Native` and are never surfaced as errors.

mod backend;
mod panel;
mod store;

pub use backend::{JsonFileSettings, MemorySettings, SettingsBackend, SettingsError};
pub use panel::{SettingAction, SettingDescriptor, SettingsPanel, settings_panel};
pub use store::{PINNED_KEY, PreferenceStore, SORT_MODE_KEY};

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;

/// Stable logical key for a row: normalized label, optionally `label||shortcut`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Wrap an already-normalized key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Identity {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Set of pinned identities. Membership and add/remove only; iteration order
/// is an implementation detail (sorted, so persisted output is deterministic).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinSet {
    pins: BTreeSet<Identity>,
}

impl PinSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.pins.contains(identity)
    }

    pub fn insert(&mut self, identity: Identity) -> bool {
        self.pins.insert(identity)
    }

    pub fn remove(&mut self, identity: &Identity) -> bool {
        self.pins.remove(identity)
    }

    /// Flip membership; returns the new state (`true` = now pinned).
    pub fn toggle(&mut self, identity: &Identity) -> bool {
        if self.pins.remove(identity) {
            false
        } else {
            self.pins.insert(identity.clone());
            true
        }
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Identity> {
        self.pins.iter()
    }

    /// Decode the persisted JSON array. Anything that is not an array yields an
    /// empty set; non-string entries are dropped.
    pub fn from_json(raw: &str) -> Self {
        let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) else {
            return Self::default();
        };
        let Some(items) = value.as_array() else {
            return Self::default();
        };
        items
            .iter()
            .filter_map(|item| item.as_str())
            .map(Identity::new)
            .collect()
    }

    pub fn to_json(&self) -> String {
        let items: Vec<&str> = self.pins.iter().map(Identity::as_str).collect();
        serde_json::to_string(&items).unwrap_or_else(|_| "[]".to_string())
    }
}

impl FromIterator<Identity> for PinSet {
    fn from_iter<I: IntoIterator<Item = Identity>>(iter: I) -> Self {
        Self {
            pins: iter.into_iter().collect(),
        }
    }
}

/// Ordering policy for unpinned rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortMode {
    #[default]
    #[serde(rename = "Roam native")]
    Native,
    #[serde(rename = "A → Z")]
    Ascending,
    #[serde(rename = "Z → A")]
    Descending,
}

impl SortMode {
    pub const ALL: [SortMode; 3] = [SortMode::Native, SortMode::Ascending, SortMode::Descending];

    /// Persisted / settings label.
    pub const fn label(self) -> &'static str {
        match self {
            SortMode::Native => "Roam native",
            SortMode::Ascending => "A → Z",
            SortMode::Descending => "Z → A",
        }
    }

    /// Text on the footer sort button.
    pub const fn button_label(self) -> &'static str {
        match self {
            SortMode::Native => "Roam",
            SortMode::Ascending => "A → Z",
            SortMode::Descending => "Z → A",
        }
    }

    pub const fn tooltip(self) -> &'static str {
        match self {
            SortMode::Native => "Use Roam native ordering",
            SortMode::Ascending => "Sort unpinned commands A → Z",
            SortMode::Descending => "Sort unpinned commands Z → A",
        }
    }

    pub fn from_label(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.label() == raw)
    }

    /// Lenient parse used for CLI/script input: accepts the label as well as
    /// `native`, `asc`, `desc` and a few spellings of each.
    pub fn parse_loose(raw: &str) -> Option<Self> {
        if let Some(mode) = Self::from_label(raw) {
            return Some(mode);
        }
        match raw.trim().to_ascii_lowercase().as_str() {
            "native" | "roam" | "none" => Some(SortMode::Native),
            "asc" | "ascending" | "a-z" | "az" => Some(SortMode::Ascending),
            "desc" | "descending" | "z-a" | "za" => Some(SortMode::Descending),
            _ => None,
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
