//! Lifecycle watchers.
//!
//! Two layers, both fed with raw mutation records by the embedder:
//!
//! * `PortalWatcher` watches the whole document for the palette root. While
//!   closed it only looks at added nodes and defers the actual open check to the
//!   next frame (bursts of additions collapse into one check). While open it
//!   only checks that the known root is still attached.
//! * `MenuWatcher` lives inside an open session. It first watches the root's
//!   subtree until the row-list appears, then switches to watching the row-list's
//!   direct children. Each invocation re-locates the row-list and re-attaches
//!   when the host has swapped it for a new node.

use core_dom::contract::{MENU, PALETTE_ROOT};
use core_dom::{HostTree, MutationRecord, NodeId, ObserveFlags, Observation};
use tracing::debug;

pub fn find_portal<T: HostTree + ?Sized>(tree: &T) -> Option<NodeId> {
    tree.locate(tree.body(), &PALETTE_ROOT)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalSignal {
    Quiet,
    /// A palette root was added; an open check is pending for the next frame.
    CheckScheduled,
    /// The open palette's root is no longer attached.
    Closed,
}

#[derive(Debug)]
pub struct PortalWatcher {
    observation: Observation,
    check_pending: bool,
}

impl PortalWatcher {
    pub fn connect<T: HostTree + ?Sized>(tree: &T) -> Self {
        Self {
            observation: Observation::new(
                tree.body(),
                ObserveFlags::CHILD_LIST | ObserveFlags::SUBTREE,
            ),
            check_pending: false,
        }
    }

    pub fn observe<T: HostTree + ?Sized>(
        &mut self,
        tree: &T,
        records: &[MutationRecord],
        open_portal: Option<NodeId>,
    ) -> PortalSignal {
        let closed = match open_portal {
            Some(portal) if tree.is_attached(portal) => return PortalSignal::Quiet,
            Some(_) => true,
            None => false,
        };
        let added_portal = records
            .iter()
            .filter(|r| self.observation.observes(tree, r))
            .flat_map(|r| r.added.iter())
            .any(|node| tree.matches_within(*node, &PALETTE_ROOT));
        if added_portal && !self.check_pending {
            self.check_pending = true;
            debug!(target: "engine.lifecycle", "portal_check_scheduled");
        }
        if closed {
            PortalSignal::Closed
        } else if added_portal {
            PortalSignal::CheckScheduled
        } else {
            PortalSignal::Quiet
        }
    }

    /// Consume the pending open check (frame tick).
    pub fn take_pending_check(&mut self) -> bool {
        std::mem::take(&mut self.check_pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuWatch {
    /// Row-list not present yet; watching the root's subtree.
    Finding(Observation),
    Observing(Observation),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuSignal {
    Unchanged,
    /// Row-list appeared or was replaced; now observing `menu`.
    Attached(NodeId),
    /// Row-list vanished; back to finding.
    Lost,
}

#[derive(Debug)]
pub struct MenuWatcher {
    portal: NodeId,
    watch: MenuWatch,
}

impl MenuWatcher {
    pub fn attach<T: HostTree + ?Sized>(tree: &T, portal: NodeId) -> Self {
        let watch = Self::watch_for(tree, portal);
        debug!(target: "engine.lifecycle", watch = ?watch, "menu_watch_attached");
        Self { portal, watch }
    }

    fn watch_for<T: HostTree + ?Sized>(tree: &T, portal: NodeId) -> MenuWatch {
        match tree.locate(portal, &MENU) {
            Some(menu) => MenuWatch::Observing(Observation::new(menu, ObserveFlags::CHILD_LIST)),
            None => MenuWatch::Finding(Observation::new(
                portal,
                ObserveFlags::CHILD_LIST | ObserveFlags::SUBTREE,
            )),
        }
    }

    pub fn portal(&self) -> NodeId {
        self.portal
    }

    pub fn menu(&self) -> Option<NodeId> {
        match self.watch {
            MenuWatch::Observing(obs) => Some(obs.target),
            MenuWatch::Finding(_) => None,
        }
    }

    /// Identity check against the live tree; re-attaches when the row-list
    /// node appeared, disappeared, or was replaced.
    pub fn refresh<T: HostTree + ?Sized>(&mut self, tree: &T) -> MenuSignal {
        let located = tree.locate(self.portal, &MENU);
        if located == self.menu() {
            return MenuSignal::Unchanged;
        }
        self.watch = Self::watch_for(tree, self.portal);
        debug!(target: "engine.lifecycle", watch = ?self.watch, "menu_watch_reattached");
        match located {
            Some(menu) => MenuSignal::Attached(menu),
            None => MenuSignal::Lost,
        }
    }

    /// Route a batch of records. Returns `true` when a reconciliation pass is
    /// warranted.
    pub fn wants_pass<T: HostTree + ?Sized>(&mut self, tree: &T, records: &[MutationRecord]) -> bool {
        let before = self.watch;
        match self.refresh(tree) {
            MenuSignal::Attached(_) => return true,
            MenuSignal::Lost => return false,
            MenuSignal::Unchanged => {}
        }
        match before {
            MenuWatch::Observing(obs) => records.iter().any(|r| obs.observes(tree, r)),
            MenuWatch::Finding(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_dom::MemoryTree;
    use core_dom::fixture::{RowSpec, mount_menu, mount_palette, mount_shell, render_rows, unmount};

    #[test]
    fn portal_addition_schedules_one_check() {
        let mut tree = MemoryTree::new();
        let mut watcher = PortalWatcher::connect(&tree);
        mount_palette(&mut tree, &[RowSpec::new("A")]);
        let records = tree.take_records();
        assert_eq!(watcher.observe(&tree, &records, None), PortalSignal::CheckScheduled);
        assert_eq!(watcher.observe(&tree, &records, None), PortalSignal::CheckScheduled);
        assert!(watcher.take_pending_check());
        assert!(!watcher.take_pending_check());
    }

    #[test]
    fn unrelated_additions_are_quiet() {
        let mut tree = MemoryTree::new();
        let mut watcher = PortalWatcher::connect(&tree);
        let div = tree.create_element("div", &["toast"]);
        let body = tree.body();
        tree.append_child(body, div);
        let records = tree.take_records();
        assert_eq!(watcher.observe(&tree, &records, None), PortalSignal::Quiet);
        assert!(!watcher.take_pending_check());
    }

    #[test]
    fn detached_portal_reports_closed() {
        let mut tree = MemoryTree::new();
        let mut watcher = PortalWatcher::connect(&tree);
        let nodes = mount_palette(&mut tree, &[]);
        tree.take_records();
        assert_eq!(watcher.observe(&tree, &[], Some(nodes.portal)), PortalSignal::Quiet);
        unmount(&mut tree, &nodes);
        let records = tree.take_records();
        assert_eq!(
            watcher.observe(&tree, &records, Some(nodes.portal)),
            PortalSignal::Closed
        );
    }

    #[test]
    fn menu_watcher_finds_late_menu_then_observes_direct_children() {
        let mut tree = MemoryTree::new();
        let mut nodes = mount_shell(&mut tree);
        tree.take_records();
        let mut watcher = MenuWatcher::attach(&tree, nodes.portal);
        assert_eq!(watcher.menu(), None);

        let menu = mount_menu(&mut tree, &mut nodes, &[RowSpec::new("A")]);
        let records = tree.take_records();
        assert!(watcher.wants_pass(&tree, &records));
        assert_eq!(watcher.menu(), Some(menu));

        render_rows(&mut tree, menu, &[RowSpec::new("B")]);
        let records = tree.take_records();
        assert!(watcher.wants_pass(&tree, &records));

        // Text change deep inside a row is not a direct child-list change.
        let row = tree.children(menu)[0];
        tree.set_text(row, "x");
        let records = tree.take_records();
        assert!(!watcher.wants_pass(&tree, &records));
    }

    #[test]
    fn menu_watcher_reattaches_on_replacement() {
        let mut tree = MemoryTree::new();
        let mut nodes = mount_palette(&mut tree, &[RowSpec::new("A")]);
        let old = nodes.menu.unwrap();
        let mut watcher = MenuWatcher::attach(&tree, nodes.portal);
        assert_eq!(watcher.menu(), Some(old));
        tree.remove(old);
        let fresh = mount_menu(&mut tree, &mut nodes, &[RowSpec::new("B")]);
        tree.take_records();
        assert!(watcher.wants_pass(&tree, &[]));
        assert_eq!(watcher.menu(), Some(fresh));
        assert_eq!(watcher.refresh(&tree), MenuSignal::Unchanged);
    }
}
