//! The reorder/augmentation pass.
//!
//! Desired display order: pinned rows (label ascending), an optional
//! separator, then unpinned rows in the effective sort mode. Ties always
//! break on base index (first-seen position this session) so incidental host
//! shuffles do not make equal-label rows jitter.
//!
//! Idempotence contract: when the DOM already shows the desired order, the
//! pass issues no child-list mutation at all. This is what lets the
//! mutation-observer feedback loop settle.

use crate::controls::{
    SEPARATOR, ensure_separator, ensure_sort_controls, ensure_star, update_sort_controls,
};
use crate::session::Session;
use core_dom::contract::ROW;
use core_dom::{HostTree, NodeId};
use core_prefs::{Identity, PinSet, PreferenceStore, SettingsBackend, SortMode};
use std::cmp::Ordering;
use tracing::{debug, trace};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowMeta {
    pub node: NodeId,
    pub identity: Option<Identity>,
    /// Normalized label; empty for rows without identity.
    pub label: String,
    /// Position in the DOM when the pass started.
    pub index: usize,
    pub base_index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderPlan {
    pub pinned: Vec<RowMeta>,
    pub unpinned: Vec<RowMeta>,
}

impl OrderPlan {
    pub fn needs_separator(&self) -> bool {
        !self.pinned.is_empty() && !self.unpinned.is_empty()
    }

    /// Rows in display order (separator excluded).
    pub fn rows(&self) -> impl Iterator<Item = &RowMeta> {
        self.pinned.iter().chain(self.unpinned.iter())
    }
}

/// Primary collation key: canonical decomposition with combining marks
/// stripped, so accented letters sort next to their base letter.
fn collation_key(label: &str) -> String {
    label.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Label comparison where empty labels always sort last, in either direction.
/// Labels compare by collation key first and raw text second.
pub fn compare_labels(a: &str, b: &str, descending: bool) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ord = collation_key(a)
                .cmp(&collation_key(b))
                .then_with(|| a.cmp(b));
            if descending { ord.reverse() } else { ord }
        }
    }
}

fn by_label_then_base(descending: bool) -> impl Fn(&RowMeta, &RowMeta) -> Ordering {
    move |a, b| {
        compare_labels(&a.label, &b.label, descending).then(a.base_index.cmp(&b.base_index))
    }
}

/// Pure grouping and ordering.
pub fn plan_order(rows: Vec<RowMeta>, pins: &PinSet, mode: SortMode) -> OrderPlan {
    let (mut pinned, mut unpinned): (Vec<RowMeta>, Vec<RowMeta>) = rows
        .into_iter()
        .partition(|row| row.identity.as_ref().is_some_and(|id| pins.contains(id)));
    pinned.sort_by(by_label_then_base(false));
    match mode {
        SortMode::Native => unpinned.sort_by_key(|row| row.base_index),
        SortMode::Ascending => unpinned.sort_by(by_label_then_base(false)),
        SortMode::Descending => unpinned.sort_by(by_label_then_base(true)),
    }
    OrderPlan { pinned, unpinned }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PassSummary {
    pub rows: usize,
    pub pinned: usize,
    pub separator: bool,
    /// DOM order was changed by this pass.
    pub moved: bool,
    pub version: u64,
}

/// One reconciliation pass over `menu`. Never fails; missing structure
/// degrades to a no-op for the affected row or step.
pub fn reconcile<T, B>(
    tree: &mut T,
    menu: NodeId,
    session: &mut Session,
    prefs: &PreferenceStore<B>,
) -> PassSummary
where
    T: HostTree + ?Sized,
    B: SettingsBackend,
{
    let mode = prefs.effective_sort_mode();
    let row_nodes = tree.locate_all(menu, &ROW);
    let mut rows = Vec::with_capacity(row_nodes.len());
    for (index, node) in row_nodes.iter().copied().enumerate() {
        let resolved = session.identities.resolve(tree, node);
        let base_index = match &resolved.identity {
            Some(identity) => session.base_index.observe(identity, index),
            None => index,
        };
        let pinned = resolved
            .identity
            .as_ref()
            .is_some_and(|id| prefs.is_pinned(id));
        ensure_star(tree, node, pinned, resolved.identity.as_ref());
        rows.push(RowMeta {
            node,
            identity: resolved.identity,
            label: resolved.label,
            index,
            base_index,
        });
    }
    session.identities.retain(&row_nodes);

    let plan = plan_order(rows, prefs.pins(), mode);
    let separator = ensure_separator(tree, menu, plan.needs_separator());

    let mut desired: Vec<NodeId> = plan.pinned.iter().map(|r| r.node).collect();
    desired.extend(separator);
    desired.extend(plan.unpinned.iter().map(|r| r.node));
    let current: Vec<NodeId> = tree
        .children(menu)
        .into_iter()
        .filter(|child| tree.matches(*child, &ROW) || tree.matches(*child, &SEPARATOR))
        .collect();
    let moved = desired != current;
    if moved {
        trace!(target: "engine.reconcile", current = ?current, desired = ?desired, "reorder");
        tree.move_children(menu, &desired);
    }

    ensure_sort_controls(tree, session.portal);
    update_sort_controls(tree, session.portal, mode);

    session.menu_version += 1;
    session.reordered = !plan.pinned.is_empty() || mode != SortMode::Native;
    let ordered: Vec<RowMeta> = plan.rows().cloned().collect();
    let first_pinned = plan.pinned.first().and_then(|r| r.identity.as_ref());
    session
        .selection
        .reconcile(tree, &ordered, first_pinned, !session.reordered);

    let summary = PassSummary {
        rows: ordered.len(),
        pinned: plan.pinned.len(),
        separator: separator.is_some(),
        moved,
        version: session.menu_version,
    };
    debug!(
        target: "engine.reconcile",
        rows = summary.rows,
        pinned = summary.pinned,
        separator = summary.separator,
        moved = summary.moved,
        version = summary.version,
        mode = mode.label(),
        "pass_complete"
    );
    summary
}
