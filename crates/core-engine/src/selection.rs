//! Active-selection tracking.
//!
//! The host highlights the keyboard-active row by position. Once rows are
//! moved away from host order that position points at the wrong row, so the
//! tracker remembers the active row's identity instead and re-applies the
//! highlight to whichever node carries it after every pass. While the list is
//! reordered it also owns up/down navigation over a per-version snapshot of
//! the visible rows.

use crate::controls::KEY_ATTR;
use crate::reconcile::RowMeta;
use core_dom::contract::{ACTIVE_CLASS, ROW};
use core_dom::{HostTree, NavKey, NodeId};
use core_prefs::Identity;
use tracing::{debug, trace};

#[derive(Debug)]
struct VisibleRows {
    version: u64,
    rows: Vec<NodeId>,
}

#[derive(Debug, Default)]
pub struct ActiveSelection {
    active: Option<Identity>,
    primed: bool,
    snapshot: Option<VisibleRows>,
    snapshot_rebuilds: u64,
}

impl ActiveSelection {
    pub fn active(&self) -> Option<&Identity> {
        self.active.as_ref()
    }

    /// Record an activation the engine learned about (row click).
    pub fn remember(&mut self, identity: Option<Identity>) {
        trace!(target: "engine.selection", identity = identity.as_ref().map(Identity::as_str), "remember");
        self.active = identity;
    }

    pub fn snapshot_rebuilds(&self) -> u64 {
        self.snapshot_rebuilds
    }

    /// Re-apply the highlight after a pass. `rows` is the final display order.
    ///
    /// First pass with rows in a session: when pins are present the first pinned row
    /// becomes active. Afterwards, when `host_leads` (list in host order) the
    /// host's own highlight is adopted; otherwise the remembered identity wins
    /// and the host's highlight is only used when that identity is gone.
    /// In every case at most one row keeps the highlight.
    pub fn reconcile<T: HostTree + ?Sized>(
        &mut self,
        tree: &mut T,
        rows: &[RowMeta],
        first_pinned: Option<&Identity>,
        host_leads: bool,
    ) -> Option<NodeId> {
        // An empty first render does not count as the first pass.
        if !self.primed && !rows.is_empty() {
            self.primed = true;
            if let Some(pinned) = first_pinned {
                debug!(target: "engine.selection", identity = pinned.as_str(), "surface_first_pin");
                self.active = Some(pinned.clone());
                return self.apply_remembered(tree, rows);
            }
        }
        let marked: Vec<&RowMeta> = rows
            .iter()
            .filter(|r| tree.has_class(r.node, ACTIVE_CLASS))
            .collect();
        let remembered = self.remembered_row(rows);
        let target = if host_leads && !marked.is_empty() {
            remembered
                .filter(|node| marked.iter().any(|m| m.node == *node))
                .map(|node| rows.iter().find(|r| r.node == node))
                .unwrap_or_else(|| marked.first().copied())
        } else {
            remembered
                .and_then(|node| rows.iter().find(|r| r.node == node))
                .or_else(|| marked.first().copied())
        };
        let target = target?;
        self.active = target.identity.clone();
        apply_marker(tree, rows.iter().map(|r| r.node), target.node);
        Some(target.node)
    }

    fn remembered_row(&self, rows: &[RowMeta]) -> Option<NodeId> {
        let active = self.active.as_ref()?;
        rows.iter()
            .find(|r| r.identity.as_ref() == Some(active))
            .map(|r| r.node)
    }

    fn apply_remembered<T: HostTree + ?Sized>(
        &mut self,
        tree: &mut T,
        rows: &[RowMeta],
    ) -> Option<NodeId> {
        let target = self.remembered_row(rows)?;
        apply_marker(tree, rows.iter().map(|r| r.node), target);
        Some(target)
    }

    /// Rows of `menu` in display order, cached per menu version. A snapshot
    /// holding a detached node is rebuilt even if the version matches.
    pub fn visible_rows<T: HostTree + ?Sized>(
        &mut self,
        tree: &T,
        menu: NodeId,
        version: u64,
    ) -> &[NodeId] {
        let fresh = self
            .snapshot
            .as_ref()
            .is_some_and(|s| s.version == version && s.rows.iter().all(|r| tree.is_attached(*r)));
        if !fresh {
            self.snapshot_rebuilds += 1;
            self.snapshot = Some(VisibleRows {
                version,
                rows: tree.locate_all(menu, &ROW),
            });
        }
        self.snapshot
            .as_ref()
            .map(|s| s.rows.as_slice())
            .unwrap_or_default()
    }

    /// Move the highlight one row with wraparound. Returns the new active row.
    pub fn step<T: HostTree + ?Sized>(
        &mut self,
        tree: &mut T,
        menu: NodeId,
        version: u64,
        key: NavKey,
    ) -> Option<NodeId> {
        let rows = self.visible_rows(&*tree, menu, version).to_vec();
        if rows.is_empty() {
            return None;
        }
        let by_identity = self.active.as_ref().and_then(|id| {
            rows.iter()
                .position(|r| tree.attr(*r, KEY_ATTR).as_deref() == Some(id.as_str()))
        });
        let current = by_identity.or_else(|| rows.iter().position(|r| tree.has_class(*r, ACTIVE_CLASS)));
        let len = rows.len();
        let next = match (current, key) {
            (None, NavKey::Down) => 0,
            (None, NavKey::Up) => len - 1,
            (Some(i), NavKey::Down) => (i + 1) % len,
            (Some(i), NavKey::Up) => (i + len - 1) % len,
        };
        let target = rows[next];
        apply_marker(tree, rows.iter().copied(), target);
        self.active = tree.attr(target, KEY_ATTR).map(Identity::new);
        trace!(target: "engine.selection", ?key, from = ?current, to = next, "navigate");
        Some(target)
    }
}

/// Exactly `target` keeps the highlight among `rows`.
fn apply_marker<T: HostTree + ?Sized>(
    tree: &mut T,
    rows: impl IntoIterator<Item = NodeId>,
    target: NodeId,
) {
    for row in rows {
        let want = row == target;
        if tree.has_class(row, ACTIVE_CLASS) != want {
            if want {
                tree.add_class(row, ACTIVE_CLASS);
            } else {
                tree.remove_class(row, ACTIVE_CLASS);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_dom::MemoryTree;
    use core_dom::fixture::{RowSpec, active_labels, mount_palette};

    fn rows_for(tree: &MemoryTree, menu: NodeId) -> Vec<RowMeta> {
        tree.children(menu)
            .into_iter()
            .enumerate()
            .map(|(i, node)| {
                let label = core_dom::fixture::row_label(tree, node).to_lowercase();
                RowMeta {
                    node,
                    identity: Some(Identity::new(label.clone())),
                    label,
                    index: i,
                    base_index: i,
                }
            })
            .collect()
    }

    #[test]
    fn first_pass_surfaces_first_pin() {
        let mut tree = MemoryTree::new();
        let nodes = mount_palette(&mut tree, &[RowSpec::new("a"), RowSpec::new("b")]);
        let menu = nodes.menu.unwrap();
        let rows = rows_for(&tree, menu);
        let mut sel = ActiveSelection::default();
        let pinned = Identity::new("b");
        sel.reconcile(&mut tree, &rows, Some(&pinned), false);
        assert_eq!(active_labels(&tree, menu), vec!["b"]);
        assert_eq!(sel.active(), Some(&pinned));
    }

    #[test]
    fn empty_first_render_does_not_consume_pin_surfacing() {
        let mut tree = MemoryTree::new();
        let nodes = mount_palette(&mut tree, &[RowSpec::new("a"), RowSpec::new("b")]);
        let menu = nodes.menu.unwrap();
        let rows = rows_for(&tree, menu);
        let mut sel = ActiveSelection::default();
        let pinned = Identity::new("b");
        assert_eq!(sel.reconcile(&mut tree, &[], Some(&pinned), false), None);
        sel.reconcile(&mut tree, &rows, Some(&pinned), false);
        assert_eq!(active_labels(&tree, menu), vec!["b"]);
    }

    #[test]
    fn multiple_markers_collapse_to_remembered() {
        let mut tree = MemoryTree::new();
        let nodes = mount_palette(
            &mut tree,
            &[RowSpec::new("a"), RowSpec::new("b"), RowSpec::new("c")],
        );
        let menu = nodes.menu.unwrap();
        let rows = rows_for(&tree, menu);
        let mut sel = ActiveSelection::default();
        sel.reconcile(&mut tree, &rows, None, false);
        sel.remember(Some(Identity::new("c")));
        tree.add_class(rows[1].node, ACTIVE_CLASS);
        tree.add_class(rows[2].node, ACTIVE_CLASS);
        sel.reconcile(&mut tree, &rows, None, false);
        assert_eq!(active_labels(&tree, menu), vec!["c"]);
    }

    #[test]
    fn host_leads_adopts_host_highlight() {
        let mut tree = MemoryTree::new();
        let nodes = mount_palette(&mut tree, &[RowSpec::new("a"), RowSpec::new("b")]);
        let menu = nodes.menu.unwrap();
        let rows = rows_for(&tree, menu);
        let mut sel = ActiveSelection::default();
        sel.reconcile(&mut tree, &rows, None, true);
        assert_eq!(sel.active(), Some(&Identity::new("a")));
        // Host moved its highlight natively.
        tree.remove_class(rows[0].node, ACTIVE_CLASS);
        tree.add_class(rows[1].node, ACTIVE_CLASS);
        sel.reconcile(&mut tree, &rows, None, true);
        assert_eq!(sel.active(), Some(&Identity::new("b")));
        assert_eq!(active_labels(&tree, menu), vec!["b"]);
    }

    #[test]
    fn step_wraps_both_ways() {
        let mut tree = MemoryTree::new();
        let nodes = mount_palette(&mut tree, &[RowSpec::new("a"), RowSpec::new("b")]);
        let menu = nodes.menu.unwrap();
        let rows = rows_for(&tree, menu);
        for row in &rows {
            tree.set_attr(row.node, KEY_ATTR, row.identity.as_ref().unwrap().as_str());
        }
        let mut sel = ActiveSelection::default();
        sel.reconcile(&mut tree, &rows, None, false);
        sel.step(&mut tree, menu, 1, NavKey::Up);
        assert_eq!(active_labels(&tree, menu), vec!["b"]);
        sel.step(&mut tree, menu, 1, NavKey::Down);
        assert_eq!(active_labels(&tree, menu), vec!["a"]);
        assert_eq!(sel.snapshot_rebuilds(), 1, "snapshot reused within a version");
        sel.step(&mut tree, menu, 2, NavKey::Down);
        assert_eq!(sel.snapshot_rebuilds(), 2);
    }
}
