//! Host simulator: plays the palette host around one `Engine`.
//!
//! The simulator owns a `MemoryTree`, mounts and re-renders the palette the
//! way the host does, forwards drained mutation records after every action
//! (the host's observer callbacks), and ticks frames on request. Arrow keys
//! the engine passes through are handled the host's way: by DOM position.

use core_dom::contract::{ACTIVE_CLASS, ROW};
use core_dom::fixture::{
    PaletteNodes, RowSpec, SEPARATOR_OUTLINE, find_row, menu_outline, mount_palette, render_rows,
    row_label, unmount,
};
use core_dom::{HostTree, MemoryTree, NavKey, NodeId};
use core_engine::controls::{KEY_ATTR, SORT_BUTTON, SORT_MODE_ATTR, STAR};
use core_engine::{ClickOutcome, Engine, FrameReport, KeyOutcome};
use core_events::ScriptCommand;
use core_prefs::{Identity, PreferenceStore, SettingsBackend, SortMode};
use tracing::{debug, info, warn};

pub struct Simulator<B: SettingsBackend> {
    tree: MemoryTree,
    engine: Engine<B>,
    nodes: Option<PaletteNodes>,
    /// Rows the host renders on mount and on `rows`.
    rows: Vec<RowSpec>,
    max_settle_frames: u32,
    frames: u64,
}

impl<B: SettingsBackend> Simulator<B> {
    pub fn new(backend: B, max_settle_frames: u32) -> Self {
        let tree = MemoryTree::new();
        let mut engine = Engine::new(PreferenceStore::new(backend));
        engine.start(&tree);
        Self {
            tree,
            engine,
            nodes: None,
            rows: Vec::new(),
            max_settle_frames: max_settle_frames.max(1),
            frames: 0,
        }
    }

    pub fn engine(&self) -> &Engine<B> {
        &self.engine
    }

    pub fn tree(&self) -> &MemoryTree {
        &self.tree
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn menu(&self) -> Option<NodeId> {
        self.nodes.and_then(|n| n.menu)
    }

    /// Host observer callbacks: hand every pending record to the engine.
    fn deliver(&mut self) {
        let records = self.tree.take_records();
        if !records.is_empty() {
            self.engine.handle_mutations(&self.tree, &records);
        }
    }

    pub fn frame(&mut self) -> FrameReport {
        self.deliver();
        let report = self.engine.on_frame(&mut self.tree);
        self.frames += 1;
        self.deliver();
        if let Some(lifecycle) = report.lifecycle {
            info!(target: "runtime", ?lifecycle, "lifecycle");
        }
        report
    }

    /// Run frames until nothing is pending, bounded by `max_settle_frames`.
    /// Returns `false` when the bound was hit first.
    pub fn settle(&mut self) -> bool {
        for _ in 0..self.max_settle_frames {
            self.frame();
            if !self.engine.pass_pending() && self.tree.pending_records() == 0 {
                return true;
            }
        }
        warn!(target: "runtime", frames = self.max_settle_frames, "settle_limit_reached");
        false
    }

    /// Apply one command. Returns lines to print (only `show` prints).
    pub fn apply(&mut self, command: ScriptCommand) -> Vec<String> {
        debug!(target: "runtime", ?command, "script_command");
        match command {
            ScriptCommand::Open => self.open(),
            ScriptCommand::Close => self.close(),
            ScriptCommand::Rows(rows) => self.render(rows),
            ScriptCommand::Star(label) => self.star(&label),
            ScriptCommand::Click(label) => self.click(&label),
            ScriptCommand::Sort(mode) => self.sort(mode),
            ScriptCommand::Key(key) => self.key(key),
            ScriptCommand::Default(mode) => {
                self.engine.set_default_sort_mode(&mut self.tree, mode);
            }
            ScriptCommand::Frame => {
                self.frame();
            }
            ScriptCommand::Show => {
                self.settle();
                return self.render_view();
            }
        }
        self.deliver();
        Vec::new()
    }

    fn open(&mut self) {
        if self.nodes.is_some() {
            warn!(target: "runtime", "palette_already_open");
            return;
        }
        self.nodes = Some(mount_palette(&mut self.tree, &self.rows));
    }

    fn close(&mut self) {
        match self.nodes.take() {
            Some(nodes) => unmount(&mut self.tree, &nodes),
            None => warn!(target: "runtime", "palette_not_open"),
        }
    }

    fn render(&mut self, rows: Vec<String>) {
        self.rows = rows.iter().map(|r| RowSpec::parse(r)).collect();
        if let Some(menu) = self.menu() {
            render_rows(&mut self.tree, menu, &self.rows);
        }
    }

    fn row(&self, label: &str) -> Option<NodeId> {
        let row = self.menu().and_then(|menu| find_row(&self.tree, menu, label));
        if row.is_none() {
            warn!(target: "runtime", label, "row_not_found");
        }
        row
    }

    fn star(&mut self, label: &str) {
        let Some(star) = self.row(label).and_then(|row| self.tree.locate(row, &STAR)) else {
            return;
        };
        let outcome = self.engine.handle_click(&mut self.tree, star);
        debug!(target: "runtime", label, ?outcome, "star_click");
    }

    fn click(&mut self, label: &str) {
        let Some(row) = self.row(label) else {
            return;
        };
        if self.engine.handle_click(&mut self.tree, row) == ClickOutcome::PassThrough {
            // The host highlights the clicked row itself.
            self.host_highlight(Some(row));
        }
    }

    fn sort(&mut self, mode: SortMode) {
        let Some(portal) = self.nodes.map(|n| n.portal) else {
            warn!(target: "runtime", "palette_not_open");
            return;
        };
        let button = self
            .tree
            .locate_all(portal, &SORT_BUTTON)
            .into_iter()
            .find(|b| self.tree.attr(*b, SORT_MODE_ATTR).as_deref() == Some(mode.label()));
        match button {
            Some(button) => {
                self.engine.handle_click(&mut self.tree, button);
            }
            None => warn!(target: "runtime", mode = mode.label(), "sort_controls_missing"),
        }
    }

    fn key(&mut self, key: NavKey) {
        if self.engine.handle_key(&mut self.tree, key) == KeyOutcome::Handled {
            return;
        }
        // Native host navigation: by DOM position, with wraparound.
        let Some(menu) = self.menu() else {
            return;
        };
        let rows = self.tree.locate_all(menu, &ROW);
        if rows.is_empty() {
            return;
        }
        let current = rows.iter().position(|r| self.tree.has_class(*r, ACTIVE_CLASS));
        let len = rows.len();
        let next = match (current, key) {
            (None, _) => 0,
            (Some(i), NavKey::Down) => (i + 1) % len,
            (Some(i), NavKey::Up) => (i + len - 1) % len,
        };
        self.host_highlight(Some(rows[next]));
    }

    fn host_highlight(&mut self, target: Option<NodeId>) {
        let Some(menu) = self.menu() else {
            return;
        };
        for row in self.tree.locate_all(menu, &ROW) {
            if Some(row) == target {
                self.tree.add_class(row, ACTIVE_CLASS);
            } else if self.tree.has_class(row, ACTIVE_CLASS) {
                self.tree.remove_class(row, ACTIVE_CLASS);
            }
        }
    }

    /// What the user sees: mode line, then each menu entry with highlight
    /// and pin markers.
    pub fn render_view(&self) -> Vec<String> {
        let Some(menu) = self.menu() else {
            return vec!["(palette closed)".to_string()];
        };
        let mode = self.engine.prefs().effective_sort_mode();
        let mut out = vec![format!("sort: {}", mode.label())];
        let rows = self.tree.locate_all(menu, &ROW);
        let mut row_iter = rows.iter();
        for entry in menu_outline(&self.tree, menu) {
            if entry == SEPARATOR_OUTLINE {
                out.push("  ────".to_string());
                continue;
            }
            let Some(row) = row_iter.next() else {
                break;
            };
            let active = if self.tree.has_class(*row, ACTIVE_CLASS) { '>' } else { ' ' };
            let pinned = self
                .tree
                .attr(*row, KEY_ATTR)
                .is_some_and(|key| self.engine.prefs().is_pinned(&Identity::new(key)));
            let star = if pinned { '★' } else { '☆' };
            out.push(format!("{active} {star} {}", row_label(&self.tree, *row)));
        }
        out
    }
}
