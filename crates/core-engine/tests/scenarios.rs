//! End-to-end passes against a host-shaped palette.

mod common;

use common::{Harness, sep, strings};
use core_dom::contract::{LABEL, LABEL_TEXT, SHORTCUT};
use core_dom::{HostTree, NavKey};
use core_engine::controls::{KEY_ATTR, SHORTCUT_ATTR, STAR};
use core_engine::{ClickOutcome, KeyOutcome, Lifecycle};
use core_prefs::{Identity, MemorySettings, PINNED_KEY, SORT_MODE_KEY, SettingsBackend, SortMode};
use pretty_assertions::assert_eq;

const ROWS: [&str; 3] = ["Open daily note", "Copy block ref", "Archive page"];

fn with_settings(pins: &[&str], mode: Option<SortMode>) -> Harness {
    let mut backend = MemorySettings::new();
    if !pins.is_empty() {
        let json = serde_json_array(pins);
        backend = backend.with(PINNED_KEY, json);
    }
    if let Some(mode) = mode {
        backend = backend.with(SORT_MODE_KEY, mode.label());
    }
    Harness::with_backend(backend)
}

fn serde_json_array(items: &[&str]) -> String {
    let quoted: Vec<String> = items.iter().map(|s| format!("{s:?}")).collect();
    format!("[{}]", quoted.join(","))
}

#[test]
fn native_without_pins_leaves_host_order() {
    let mut h = Harness::new();
    h.open(&ROWS);
    h.settle();
    assert_eq!(h.outline(), strings(&ROWS));
    assert_eq!(h.tree.stats().batch_moves, 0, "nothing to reorder");
}

#[test]
fn single_pin_floats_above_separator() {
    let mut h = with_settings(&["copy block ref"], None);
    h.open(&ROWS);
    h.settle();
    assert_eq!(
        h.outline(),
        vec![
            "Copy block ref".to_string(),
            sep(),
            "Open daily note".to_string(),
            "Archive page".to_string(),
        ]
    );
}

#[test]
fn ascending_default_sorts_unpinned() {
    let mut h = with_settings(&[], Some(SortMode::Ascending));
    h.open(&ROWS);
    h.settle();
    assert_eq!(
        h.outline(),
        strings(&["Archive page", "Copy block ref", "Open daily note"])
    );
}

#[test]
fn pinned_group_ignores_descending_mode() {
    let mut h = with_settings(&["archive page", "open daily note"], Some(SortMode::Descending));
    h.open(&ROWS);
    h.settle();
    assert_eq!(
        h.outline(),
        vec![
            "Archive page".to_string(),
            "Open daily note".to_string(),
            sep(),
            "Copy block ref".to_string(),
        ]
    );
}

#[test]
fn second_pass_without_host_change_is_silent() {
    let mut h = with_settings(&["copy block ref"], Some(SortMode::Descending));
    h.open(&ROWS);
    h.settle();
    let before = h.tree.stats();
    assert!(h.engine.request_pass());
    let report = h.frame();
    let pass = report.pass.expect("pass ran");
    assert!(!pass.moved);
    assert_eq!(h.tree.stats(), before);
    assert_eq!(h.tree.pending_records(), 0);
}

#[test]
fn self_triggered_mutations_settle_after_one_noop_pass() {
    let mut h = with_settings(&["archive page"], None);
    h.open(&ROWS);
    // Reordering pass plus the no-op pass caused by its own writes.
    assert_eq!(h.settle(), 2);
    assert!(!h.engine.pass_pending());
}

#[test]
fn star_toggle_round_trip_restores_order_and_pins() {
    let mut h = Harness::new();
    h.open(&ROWS);
    h.settle();
    let original = h.outline();

    assert_eq!(h.star("Archive page"), ClickOutcome::Consumed);
    assert!(h.engine.prefs().is_pinned(&Identity::new("archive page")));
    assert_eq!(
        h.engine.prefs().backend().get(PINNED_KEY).as_deref(),
        Some("[\"archive page\"]"),
        "persisted synchronously"
    );
    h.settle();
    assert_eq!(h.outline()[0], "Archive page");
    assert_eq!(h.outline()[1], sep());

    assert_eq!(h.star("Archive page"), ClickOutcome::Consumed);
    h.settle();
    assert!(h.engine.prefs().pins().is_empty());
    assert_eq!(h.outline(), original);
}

#[test]
fn sort_buttons_override_for_the_session_only() {
    let mut h = Harness::new();
    h.open(&ROWS);
    h.settle();
    assert_eq!(h.sort(SortMode::Descending), ClickOutcome::Consumed);
    h.settle();
    assert_eq!(
        h.outline(),
        strings(&["Open daily note", "Copy block ref", "Archive page"])
    );
    assert_eq!(h.sort(SortMode::Ascending), ClickOutcome::Consumed);
    h.settle();
    assert_eq!(h.outline()[0], "Archive page");
    assert_eq!(h.engine.prefs().backend().get(SORT_MODE_KEY), None, "global untouched");

    h.close();
    assert!(!h.engine.is_open());
    h.open(&ROWS);
    h.settle();
    assert_eq!(h.outline(), strings(&ROWS), "override reset on reopen");
    assert_eq!(h.engine.sessions_opened(), 2);
}

#[test]
fn equal_labels_keep_first_seen_order_across_rerenders() {
    let mut h = with_settings(&[], Some(SortMode::Ascending));
    h.open(&["Same [a]", "Other", "Same [b]"]);
    h.settle();
    let shortcuts = |h: &Harness| -> Vec<Option<String>> {
        h.tree
            .children(h.menu())
            .into_iter()
            .map(|row| h.tree.attr(row, SHORTCUT_ATTR))
            .collect()
    };
    let expected = vec![None, Some("a".to_string()), Some("b".to_string())];
    assert_eq!(shortcuts(&h), expected);

    // Host shuffles the incidental order; base indexes from the first render win.
    h.rerender(&["Same [b]", "Other", "Same [a]"]);
    h.settle();
    assert_eq!(shortcuts(&h), expected);
}

#[test]
fn host_rerender_is_reconciled_again() {
    let mut h = with_settings(&["archive page"], None);
    h.open(&ROWS);
    h.settle();
    h.rerender(&ROWS);
    assert_eq!(h.outline(), strings(&ROWS), "host dropped the decorations");
    h.settle();
    assert_eq!(
        h.outline(),
        vec![
            "Archive page".to_string(),
            sep(),
            "Open daily note".to_string(),
            "Copy block ref".to_string(),
        ]
    );
}

#[test]
fn reopen_resets_session_state() {
    let mut h = Harness::new();
    h.open(&ROWS);
    h.settle();
    let first = h.engine.session().map(|s| s.base_index.len());
    assert_eq!(first, Some(3));
    h.close();
    assert!(h.engine.session().is_none());
    let report = h.frame();
    assert_eq!(report.pass, None);

    h.open(&["Archive page"]);
    let report = h.frame();
    assert!(matches!(report.lifecycle, Some(Lifecycle::Opened(_))));
    assert_eq!(h.engine.session().map(|s| s.base_index.len()), Some(1));
}

#[test]
fn late_menu_is_found_and_reconciled() {
    let mut h = with_settings(&["archive page"], None);
    let mut nodes = core_dom::fixture::mount_shell(&mut h.tree);
    h.deliver();
    let report = h.frame();
    assert!(matches!(report.lifecycle, Some(Lifecycle::Opened(_))));
    assert_eq!(report.pass, None, "no row-list yet");

    core_dom::fixture::mount_menu(&mut h.tree, &mut nodes, &common::specs(&ROWS));
    h.nodes = Some(nodes);
    h.deliver();
    h.settle();
    assert_eq!(h.outline()[0], "Archive page");
}

#[test]
fn replaced_menu_is_reattached() {
    let mut h = with_settings(&["archive page"], None);
    let mut nodes = h.open(&ROWS);
    h.settle();
    let old = h.menu();
    h.tree.remove(old);
    core_dom::fixture::mount_menu(&mut h.tree, &mut nodes, &common::specs(&ROWS));
    h.nodes = Some(nodes);
    h.deliver();
    h.settle();
    assert_ne!(h.menu(), old);
    assert_eq!(h.outline()[0], "Archive page");
}

#[test]
fn clicks_outside_the_palette_pass_through() {
    let mut h = Harness::new();
    h.open(&ROWS);
    h.settle();
    let body = h.tree.body();
    assert_eq!(
        h.engine.handle_click(&mut h.tree, body),
        ClickOutcome::PassThrough
    );
    assert_eq!(h.click_row("Copy block ref"), ClickOutcome::PassThrough);
}

#[test]
fn arrow_keys_follow_display_order_while_reordered() {
    let mut h = with_settings(&["archive page"], None);
    h.open(&ROWS);
    h.settle();
    assert_eq!(
        h.outline(),
        vec![
            "Archive page".to_string(),
            sep(),
            "Open daily note".to_string(),
            "Copy block ref".to_string(),
        ]
    );
    assert_eq!(h.active(), strings(&["Archive page"]), "first pin surfaced");

    assert_eq!(h.key(NavKey::Down), KeyOutcome::Handled);
    assert_eq!(h.active(), strings(&["Open daily note"]));
    assert_eq!(h.key(NavKey::Up), KeyOutcome::Handled);
    assert_eq!(h.key(NavKey::Up), KeyOutcome::Handled);
    assert_eq!(h.active(), strings(&["Copy block ref"]), "wraps to the last row");
}

#[test]
fn active_row_survives_a_reorder() {
    let mut h = with_settings(&["archive page"], None);
    h.open(&ROWS);
    h.settle();
    h.key(NavKey::Up);
    assert_eq!(h.active(), strings(&["Copy block ref"]));

    assert_eq!(h.sort(SortMode::Ascending), ClickOutcome::Consumed);
    h.settle();
    assert_eq!(
        h.outline(),
        vec![
            "Archive page".to_string(),
            sep(),
            "Copy block ref".to_string(),
            "Open daily note".to_string(),
        ]
    );
    assert_eq!(h.active(), strings(&["Copy block ref"]));
}

#[test]
fn arrow_keys_pass_through_in_host_order() {
    let mut h = Harness::new();
    h.open(&ROWS);
    h.settle();
    assert_eq!(h.key(NavKey::Down), KeyOutcome::PassThrough);
    assert_eq!(h.key(NavKey::Up), KeyOutcome::PassThrough);
    assert_eq!(h.active(), strings(&["Open daily note"]));
}

#[test]
fn emptied_label_row_cannot_be_pinned() {
    let mut h = Harness::new();
    h.open(&ROWS);
    h.settle();
    let row = h.row("Archive page");
    let star = h.tree.locate(row, &STAR).expect("star rendered");
    let span = h
        .tree
        .locate(row, &LABEL)
        .and_then(|label| h.tree.locate(label, &LABEL_TEXT))
        .expect("label text");
    h.tree.set_text(span, "");
    h.deliver();
    h.engine.request_pass();
    h.settle();

    assert_eq!(h.tree.attr(row, KEY_ATTR), None);
    assert_eq!(h.tree.attr(star, KEY_ATTR), None);
    assert_eq!(
        h.engine.handle_click(&mut h.tree, star),
        ClickOutcome::Consumed
    );
    assert!(h.engine.prefs().pins().is_empty());
    assert!(!h.engine.pass_pending());
}

#[test]
fn dropped_shortcut_hint_changes_identity() {
    let mut h = Harness::new();
    h.open(&["Open daily note", "Copy block ref [Ctrl-c]"]);
    h.settle();
    let row = h.row("Copy block ref");
    assert_eq!(h.tree.attr(row, KEY_ATTR).as_deref(), Some("copy block ref||ctrl-c"));

    let hint = h.tree.locate(row, &SHORTCUT).expect("hint rendered");
    h.tree.remove(hint);
    h.deliver();
    h.engine.request_pass();
    h.settle();
    assert_eq!(h.tree.attr(row, SHORTCUT_ATTR), None);
    assert_eq!(h.tree.attr(row, KEY_ATTR).as_deref(), Some("copy block ref"));

    h.star("Copy block ref");
    assert!(h.engine.prefs().is_pinned(&Identity::new("copy block ref")));
}

#[test]
fn empty_first_render_still_surfaces_first_pin() {
    let mut h = with_settings(&["archive page"], None);
    h.open(&[]);
    h.settle();
    assert!(h.active().is_empty());

    h.rerender(&ROWS);
    h.settle();
    assert_eq!(h.outline()[0], "Archive page");
    assert_eq!(h.active(), strings(&["Archive page"]));
}
