//! Engine-owned decorations: pin stars, the group separator, and the footer
//! sort controls.
//!
//! Decorations are always re-located by marker attribute, never cached across
//! passes: the host may drop and rebuild the structure around them. Every
//! write goes through `write_attr` / `write_text`, which skip values that are
//! already in place so an unchanged pass produces no host-visible churn.

use core_dom::contract::{FOOTER, LABEL, ROW};
use core_dom::{HostTree, NodeId, Selector};
use core_prefs::{Identity, SortMode};
use tracing::trace;

pub const STAR_ATTR: &str = "data-bcp-star";
pub const SEPARATOR_ATTR: &str = "data-bcp-separator";
pub const SORT_CONTROLS_ATTR: &str = "data-bcp-sort-controls";
pub const SORT_BUTTON_ATTR: &str = "data-bcp-sort-button";
/// Mode label carried by each sort button.
pub const SORT_MODE_ATTR: &str = "data-bcp-sort";
/// Identity tag written on rows (and their star).
pub const KEY_ATTR: &str = "data-bcp-key";
pub const LABEL_ATTR: &str = "data-bcp-label";
pub const SHORTCUT_ATTR: &str = "data-bcp-shortcut";

pub const STAR: Selector = Selector::attr(STAR_ATTR, "1");
pub const SEPARATOR: Selector = Selector::attr(SEPARATOR_ATTR, "1");
pub const SORT_CONTROLS: Selector = Selector::attr(SORT_CONTROLS_ATTR, "1");
pub const SORT_BUTTON: Selector = Selector::attr(SORT_BUTTON_ATTR, "1");

/// Returns `true` when a write happened.
pub(crate) fn write_attr<T: HostTree + ?Sized>(
    tree: &mut T,
    node: NodeId,
    name: &str,
    value: &str,
) -> bool {
    if tree.attr(node, name).as_deref() == Some(value) {
        return false;
    }
    tree.set_attr(node, name, value);
    true
}

/// Remove `name` if present. Returns `true` when a write happened.
pub(crate) fn clear_attr<T: HostTree + ?Sized>(tree: &mut T, node: NodeId, name: &str) -> bool {
    if tree.attr(node, name).is_none() {
        return false;
    }
    tree.remove_attr(node, name);
    true
}

pub(crate) fn write_text<T: HostTree + ?Sized>(tree: &mut T, node: NodeId, text: &str) -> bool {
    if tree.text(node) == text {
        return false;
    }
    tree.set_text(node, text);
    true
}

fn flag(on: bool) -> &'static str {
    if on { "1" } else { "0" }
}

fn pressed(on: bool) -> &'static str {
    if on { "true" } else { "false" }
}

/// Ensure `row` carries a star reflecting `pinned`. No-op (returns `None`)
/// when the row has no label container.
pub fn ensure_star<T: HostTree + ?Sized>(
    tree: &mut T,
    row: NodeId,
    pinned: bool,
    identity: Option<&Identity>,
) -> Option<NodeId> {
    let label = tree.locate(row, &LABEL)?;
    let star = match tree.locate(label, &STAR) {
        Some(star) => star,
        None => {
            let star = tree.create_element("button", &["bcp-star"]);
            tree.set_attr(star, "type", "button");
            tree.set_attr(star, STAR_ATTR, "1");
            tree.prepend_child(label, star);
            trace!(target: "engine.controls", row = row.raw(), "star_created");
            star
        }
    };
    match identity {
        Some(identity) => write_attr(tree, star, KEY_ATTR, identity.as_str()),
        None => clear_attr(tree, star, KEY_ATTR),
    };
    set_star_state(tree, star, pinned);
    Some(star)
}

pub fn set_star_state<T: HostTree + ?Sized>(tree: &mut T, star: NodeId, pinned: bool) {
    write_text(tree, star, if pinned { "★" } else { "☆" });
    write_attr(tree, star, "data-pinned", flag(pinned));
    write_attr(tree, star, "aria-pressed", pressed(pinned));
    let label = if pinned { "Unpin command" } else { "Pin command" };
    write_attr(tree, star, "aria-label", label);
    write_attr(tree, star, "title", label);
}

/// Create or remove the separator. Returns it when `needed`.
pub fn ensure_separator<T: HostTree + ?Sized>(
    tree: &mut T,
    menu: NodeId,
    needed: bool,
) -> Option<NodeId> {
    let existing = tree.locate(menu, &SEPARATOR);
    match (needed, existing) {
        (true, Some(sep)) => Some(sep),
        (true, None) => {
            let sep = tree.create_element("div", &["bp3-menu-divider", "bcp-menu-divider"]);
            tree.set_attr(sep, SEPARATOR_ATTR, "1");
            tree.set_attr(sep, "role", "separator");
            Some(sep)
        }
        (false, Some(sep)) => {
            tree.remove(sep);
            None
        }
        (false, None) => None,
    }
}

/// Append the sort controls to the footer once. No-op without a footer.
pub fn ensure_sort_controls<T: HostTree + ?Sized>(tree: &mut T, portal: NodeId) -> Option<NodeId> {
    let footer = tree.locate(portal, &FOOTER)?;
    if let Some(existing) = tree.locate(footer, &SORT_CONTROLS) {
        return Some(existing);
    }
    let controls = tree.create_element("div", &["bcp-sort-controls"]);
    tree.set_attr(controls, SORT_CONTROLS_ATTR, "1");
    let caption = tree.create_element("span", &["bcp-sort-label"]);
    tree.set_text(caption, "Sort:");
    tree.append_child(controls, caption);
    for mode in SortMode::ALL {
        let button = tree.create_element("button", &["bcp-sort-button"]);
        tree.set_attr(button, "type", "button");
        tree.set_text(button, mode.button_label());
        tree.set_attr(button, SORT_BUTTON_ATTR, "1");
        tree.set_attr(button, SORT_MODE_ATTR, mode.label());
        tree.set_attr(button, "title", mode.tooltip());
        tree.set_attr(button, "aria-label", mode.tooltip());
        tree.append_child(controls, button);
    }
    tree.append_child(footer, controls);
    trace!(target: "engine.controls", portal = portal.raw(), "sort_controls_created");
    Some(controls)
}

/// Reflect the effective mode on the sort buttons.
pub fn update_sort_controls<T: HostTree + ?Sized>(tree: &mut T, portal: NodeId, effective: SortMode) {
    let Some(controls) = tree.locate(portal, &SORT_CONTROLS) else {
        return;
    };
    for button in tree.locate_all(controls, &SORT_BUTTON) {
        let active = tree.attr(button, SORT_MODE_ATTR).as_deref() == Some(effective.label());
        write_attr(tree, button, "aria-pressed", pressed(active));
        write_attr(tree, button, "data-active", flag(active));
    }
}

/// What a click landed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlHit {
    Star { star: NodeId, row: Option<NodeId> },
    /// Raw mode label from the button; validated by the preference store.
    SortButton(String),
    Row(NodeId),
    Outside,
}

pub fn hit_test<T: HostTree + ?Sized>(tree: &T, node: NodeId) -> ControlHit {
    if let Some(star) = tree.closest(node, &STAR) {
        return ControlHit::Star {
            star,
            row: tree.closest(star, &ROW),
        };
    }
    if let Some(button) = tree.closest(node, &SORT_BUTTON) {
        return ControlHit::SortButton(tree.attr(button, SORT_MODE_ATTR).unwrap_or_default());
    }
    match tree.closest(node, &ROW) {
        Some(row) => ControlHit::Row(row),
        None => ControlHit::Outside,
    }
}
