//! Host-side palette builder.
//!
//! Produces the markup shape described in `contract` so tests and the
//! simulator can play the host: mount/unmount the portal, re-render the row
//! list (the host replaces rows wholesale and highlights the first one), and
//! read back what a user would see.

use crate::contract::{ACTIVE_CLASS, FOOTER, LABEL, LABEL_TEXT, MENU, ROW, SHORTCUT};
use crate::{HostTree, NodeId};

/// Text shown for an engine separator in `menu_outline`.
pub const SEPARATOR_OUTLINE: &str = "<separator>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSpec {
    pub label: String,
    pub shortcuts: Vec<String>,
}

impl RowSpec {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            shortcuts: Vec::new(),
        }
    }

    pub fn with_shortcut(mut self, shortcut: impl Into<String>) -> Self {
        self.shortcuts.push(shortcut.into());
        self
    }

    /// Parse `"Label [Ctrl-x] [Alt-y]"`; bracketed suffixes become shortcut hints.
    pub fn parse(raw: &str) -> Self {
        let mut label = raw.trim();
        let mut shortcuts = Vec::new();
        while label.ends_with(']') {
            let Some(open) = label.rfind('[') else {
                break;
            };
            shortcuts.push(label[open + 1..label.len() - 1].trim().to_string());
            label = label[..open].trim_end();
        }
        shortcuts.reverse();
        Self {
            label: label.to_string(),
            shortcuts,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteNodes {
    pub portal: NodeId,
    pub container: NodeId,
    pub menu: Option<NodeId>,
    pub footer: NodeId,
}

/// Mount the portal with footer but no row list yet.
pub fn mount_shell<T: HostTree + ?Sized>(tree: &mut T) -> PaletteNodes {
    let portal = tree.create_element("div", &["rm-modal-portal--command-palette"]);
    let container = tree.create_element("div", &["rm-command-palette"]);
    let footer = tree.create_element("div", FOOTER.classes);
    tree.append_child(portal, container);
    tree.append_child(container, footer);
    let body = tree.body();
    tree.append_child(body, portal);
    PaletteNodes {
        portal,
        container,
        menu: None,
        footer,
    }
}

/// Insert a fresh row-list into the container, before the footer.
pub fn mount_menu<T: HostTree + ?Sized>(
    tree: &mut T,
    nodes: &mut PaletteNodes,
    rows: &[RowSpec],
) -> NodeId {
    let menu = tree.create_element("div", MENU.classes);
    for spec in rows {
        let row = build_row(tree, spec);
        tree.append_child(menu, row);
    }
    highlight_first(tree, menu);
    tree.prepend_child(nodes.container, menu);
    nodes.menu = Some(menu);
    menu
}

/// Mount a complete palette in one go.
pub fn mount_palette<T: HostTree + ?Sized>(tree: &mut T, rows: &[RowSpec]) -> PaletteNodes {
    let mut nodes = mount_shell(tree);
    mount_menu(tree, &mut nodes, rows);
    nodes
}

pub fn unmount<T: HostTree + ?Sized>(tree: &mut T, nodes: &PaletteNodes) {
    tree.remove(nodes.portal);
}

pub fn build_row<T: HostTree + ?Sized>(tree: &mut T, spec: &RowSpec) -> NodeId {
    let row = tree.create_element("div", ROW.classes);
    let label = tree.create_element("div", LABEL.classes);
    let text = tree.create_element(LABEL_TEXT.tag.unwrap_or("span"), &[]);
    tree.set_text(text, &spec.label);
    tree.append_child(label, text);
    tree.append_child(row, label);
    for hint in &spec.shortcuts {
        let el = tree.create_element("span", SHORTCUT.classes);
        tree.set_text(el, hint);
        tree.append_child(row, el);
    }
    row
}

/// Host re-render: every child of the menu is dropped (engine decorations
/// included) and rows are rebuilt in host order with the first highlighted.
pub fn render_rows<T: HostTree + ?Sized>(tree: &mut T, menu: NodeId, rows: &[RowSpec]) -> Vec<NodeId> {
    for child in tree.children(menu) {
        tree.remove(child);
    }
    let built: Vec<NodeId> = rows.iter().map(|spec| build_row(tree, spec)).collect();
    for row in &built {
        tree.append_child(menu, *row);
    }
    highlight_first(tree, menu);
    built
}

fn highlight_first<T: HostTree + ?Sized>(tree: &mut T, menu: NodeId) {
    if let Some(first) = tree.children(menu).into_iter().find(|n| tree.matches(*n, &ROW)) {
        tree.add_class(first, ACTIVE_CLASS);
    }
}

pub fn row_label<T: HostTree + ?Sized>(tree: &T, row: NodeId) -> String {
    tree.locate(row, &LABEL)
        .and_then(|label| tree.locate(label, &LABEL_TEXT))
        .map(|span| tree.text(span))
        .unwrap_or_default()
}

/// Direct children of the menu as the user sees them: row labels, separators
/// rendered as `SEPARATOR_OUTLINE`.
pub fn menu_outline<T: HostTree + ?Sized>(tree: &T, menu: NodeId) -> Vec<String> {
    tree.children(menu)
        .into_iter()
        .filter_map(|child| {
            if tree.matches(child, &ROW) {
                Some(row_label(tree, child))
            } else if tree.attr(child, "role").as_deref() == Some("separator") {
                Some(SEPARATOR_OUTLINE.to_string())
            } else {
                None
            }
        })
        .collect()
}

pub fn find_row<T: HostTree + ?Sized>(tree: &T, menu: NodeId, label: &str) -> Option<NodeId> {
    tree.locate_all(menu, &ROW)
        .into_iter()
        .find(|row| row_label(tree, *row) == label)
}

pub fn active_labels<T: HostTree + ?Sized>(tree: &T, menu: NodeId) -> Vec<String> {
    tree.locate_all(menu, &ROW)
        .into_iter()
        .filter(|row| tree.has_class(*row, ACTIVE_CLASS))
        .map(|row| row_label(tree, row))
        .collect()
}
