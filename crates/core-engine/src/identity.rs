//! Row identity resolution.
//!
//! A row's identity is its normalized label, or `label||shortcut` when the row
//! carries shortcut hints. Rows with an empty label have no identity.
//!
//! Results are cached per node and keyed by a fingerprint of the raw texts, so
//! a host that rewrites a row's text in place invalidates the entry without any
//! reference-equality bookkeeping. The cache only saves normalization work:
//! a cold resolve returns exactly what a warm one would.

use crate::controls::{KEY_ATTR, LABEL_ATTR, SHORTCUT_ATTR, clear_attr, write_attr};
use ahash::AHashMap;
use core_dom::contract::{LABEL, LABEL_TEXT, SHORTCUT};
use core_dom::{HostTree, NodeId};
use core_prefs::Identity;
use smallvec::SmallVec;
use std::hash::BuildHasher;
use tracing::trace;

/// Trim, collapse internal whitespace runs to one space, and case-fold.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRow {
    pub identity: Option<Identity>,
    /// Normalized label; empty when the row has no identity.
    pub label: String,
    /// Normalized, comma-joined shortcut hints.
    pub shortcut: Option<String>,
}

impl ResolvedRow {
    fn empty() -> Self {
        Self {
            identity: None,
            label: String::new(),
            shortcut: None,
        }
    }
}

/// Raw texts as rendered by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RawRowText {
    pub label: String,
    pub shortcuts: SmallVec<[String; 2]>,
}

impl RawRowText {
    pub fn read<T: HostTree + ?Sized>(tree: &T, row: NodeId) -> Self {
        let label = tree
            .locate(row, &LABEL)
            .and_then(|container| tree.locate(container, &LABEL_TEXT))
            .map(|span| tree.text(span).trim().to_string())
            .unwrap_or_default();
        let shortcuts = tree
            .locate_all(row, &SHORTCUT)
            .into_iter()
            .map(|el| tree.text(el).trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Self { label, shortcuts }
    }

    /// Pure derivation; the cache never changes its output.
    pub fn resolve(&self) -> ResolvedRow {
        let label = normalize(&self.label);
        if label.is_empty() {
            return ResolvedRow::empty();
        }
        let shortcut = if self.shortcuts.is_empty() {
            None
        } else {
            Some(normalize(&self.shortcuts.join(",")))
        };
        let key = match &shortcut {
            Some(s) => format!("{label}||{s}"),
            None => label.clone(),
        };
        ResolvedRow {
            identity: Some(Identity::new(key)),
            label,
            shortcut,
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    fingerprint: u64,
    resolved: ResolvedRow,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverStats {
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug)]
pub struct IdentityResolver {
    cache: AHashMap<NodeId, CacheEntry>,
    hasher: ahash::RandomState,
    stats: ResolverStats,
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityResolver {
    pub fn new() -> Self {
        Self {
            cache: AHashMap::new(),
            hasher: ahash::RandomState::with_seeds(0x9e37, 0x79b9, 0x7f4a, 0x7c15),
            stats: ResolverStats::default(),
        }
    }

    pub fn stats(&self) -> ResolverStats {
        self.stats
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Resolve `row` and tag it with diagnostic attributes.
    pub fn resolve<T: HostTree + ?Sized>(&mut self, tree: &mut T, row: NodeId) -> ResolvedRow {
        let raw = RawRowText::read(tree, row);
        let fingerprint = self.hasher.hash_one(&raw);
        let resolved = match self.cache.get(&row) {
            Some(entry) if entry.fingerprint == fingerprint => {
                self.stats.hits += 1;
                entry.resolved.clone()
            }
            _ => {
                self.stats.misses += 1;
                let resolved = raw.resolve();
                trace!(
                    target: "engine.identity",
                    row = row.raw(),
                    identity = resolved.identity.as_ref().map(Identity::as_str),
                    "identity_resolved"
                );
                self.cache.insert(
                    row,
                    CacheEntry {
                        fingerprint,
                        resolved: resolved.clone(),
                    },
                );
                resolved
            }
        };
        // Tags always mirror the current text; a row that lost its label or
        // hints must not keep advertising the old key.
        match &resolved.identity {
            Some(identity) => {
                write_attr(tree, row, KEY_ATTR, identity.as_str());
                write_attr(tree, row, LABEL_ATTR, &resolved.label);
            }
            None => {
                clear_attr(tree, row, KEY_ATTR);
                clear_attr(tree, row, LABEL_ATTR);
            }
        }
        match &resolved.shortcut {
            Some(shortcut) => write_attr(tree, row, SHORTCUT_ATTR, shortcut),
            None => clear_attr(tree, row, SHORTCUT_ATTR),
        };
        resolved
    }

    /// Drop entries for rows that are no longer part of the list.
    pub fn retain(&mut self, live: &[NodeId]) {
        self.cache.retain(|node, _| live.contains(node));
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}
