//! Per-open session context.
//!
//! Everything scoped to "palette is open" lives here and nowhere else, so
//! closing the palette is a single step: drop the `Session`.

use crate::identity::IdentityResolver;
use crate::observers::MenuWatcher;
use crate::selection::ActiveSelection;
use ahash::AHashMap;
use core_dom::{HostTree, NodeId};
use core_prefs::Identity;

/// First-seen position per identity. Write-once per session.
#[derive(Debug, Default)]
pub struct BaseIndexMap {
    first_seen: AHashMap<Identity, usize>,
}

impl BaseIndexMap {
    /// Record `index` if `identity` is new and return its base index.
    pub fn observe(&mut self, identity: &Identity, index: usize) -> usize {
        if let Some(existing) = self.first_seen.get(identity) {
            return *existing;
        }
        self.first_seen.insert(identity.clone(), index);
        index
    }

    pub fn get(&self, identity: &Identity) -> Option<usize> {
        self.first_seen.get(identity).copied()
    }

    pub fn len(&self) -> usize {
        self.first_seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.first_seen.is_empty()
    }
}

#[derive(Debug)]
pub struct Session {
    pub portal: NodeId,
    pub menu_watch: MenuWatcher,
    pub base_index: BaseIndexMap,
    pub identities: IdentityResolver,
    pub selection: ActiveSelection,
    /// Bumped after every completed pass; invalidates navigation snapshots.
    pub menu_version: u64,
    /// Last pass left the list away from host order (pins shown or a
    /// non-native sort); arrow keys are handled by the engine while set.
    pub reordered: bool,
}

impl Session {
    pub fn open<T: HostTree + ?Sized>(tree: &T, portal: NodeId) -> Self {
        Self {
            portal,
            menu_watch: MenuWatcher::attach(tree, portal),
            base_index: BaseIndexMap::default(),
            identities: IdentityResolver::new(),
            selection: ActiveSelection::default(),
            menu_version: 0,
            reordered: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_index_is_write_once() {
        let mut map = BaseIndexMap::default();
        let a = Identity::new("a");
        assert_eq!(map.observe(&a, 3), 3);
        assert_eq!(map.observe(&a, 0), 3);
        assert_eq!(map.get(&a), Some(3));
        assert_eq!(map.len(), 1);
    }
}
