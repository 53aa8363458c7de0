//! Structural assumptions about the host command palette.
//!
//! If the host changes its markup these are the only selectors that need to
//! follow; every consumer degrades to a no-op when one stops matching.

use crate::Selector;

/// Root of the command palette portal; presence means "palette open".
pub const PALETTE_ROOT: Selector = Selector::classes(&["rm-modal-portal--command-palette"]);
/// Row-list container.
pub const MENU: Selector = Selector::classes(&["rm-command-palette__menu"]);
pub const ROW: Selector = Selector::classes(&["rm-menu-item", "bp3-menu-item"]);
/// Label container inside a row; the engine's star is prepended here.
pub const LABEL: Selector = Selector::classes(&["rm-command-palette__label"]);
/// Text-bearing element inside `LABEL`.
pub const LABEL_TEXT: Selector = Selector::tag("span");
pub const SHORTCUT: Selector = Selector::classes(&["rm-command-palette__shortcut"]);
pub const FOOTER: Selector = Selector::classes(&["rm-command-palette__footer"]);

/// Class the host uses to highlight the keyboard-active row.
pub const ACTIVE_CLASS: &str = "bp3-active";
