#![allow(dead_code)] // Shared across several integration tests; each binary uses a subset.

use core_dom::fixture::{
    PaletteNodes, RowSpec, active_labels, find_row, menu_outline, mount_palette, render_rows,
    unmount,
};
use core_dom::{HostTree, MemoryTree, NavKey, NodeId};
use core_engine::controls::{SORT_BUTTON, SORT_MODE_ATTR, STAR};
use core_engine::{ClickOutcome, Engine, FrameReport, KeyOutcome};
use core_prefs::{MemorySettings, PreferenceStore, SettingsBackend, SortMode};

/// Upper bound on frames `settle` will run before giving up.
pub const SETTLE_LIMIT: usize = 16;

pub fn specs(rows: &[&str]) -> Vec<RowSpec> {
    rows.iter().map(|r| RowSpec::parse(r)).collect()
}

/// Plays the host around one engine: owns the tree, forwards drained
/// mutation records, and ticks frames.
pub struct Harness<B: SettingsBackend = MemorySettings> {
    pub tree: MemoryTree,
    pub engine: Engine<B>,
    pub nodes: Option<PaletteNodes>,
}

impl Harness<MemorySettings> {
    pub fn new() -> Self {
        Self::with_backend(MemorySettings::new())
    }
}

impl<B: SettingsBackend> Harness<B> {
    pub fn with_backend(backend: B) -> Self {
        let tree = MemoryTree::new();
        let mut engine = Engine::new(PreferenceStore::new(backend));
        engine.start(&tree);
        Self {
            tree,
            engine,
            nodes: None,
        }
    }

    pub fn open(&mut self, rows: &[&str]) -> PaletteNodes {
        let nodes = mount_palette(&mut self.tree, &specs(rows));
        self.nodes = Some(nodes);
        self.deliver();
        nodes
    }

    pub fn close(&mut self) {
        if let Some(nodes) = self.nodes.take() {
            unmount(&mut self.tree, &nodes);
        }
        self.deliver();
    }

    pub fn deliver(&mut self) {
        let records = self.tree.take_records();
        self.engine.handle_mutations(&self.tree, &records);
    }

    pub fn frame(&mut self) -> FrameReport {
        self.deliver();
        let report = self.engine.on_frame(&mut self.tree);
        self.deliver();
        report
    }

    /// Tick until no pass is pending and no records are queued. Returns the
    /// number of passes that ran.
    pub fn settle(&mut self) -> usize {
        let mut passes = 0;
        for _ in 0..SETTLE_LIMIT {
            let report = self.frame();
            passes += usize::from(report.pass.is_some());
            if !self.engine.pass_pending() && self.tree.pending_records() == 0 {
                return passes;
            }
        }
        panic!("engine did not settle within {SETTLE_LIMIT} frames");
    }

    pub fn menu(&self) -> NodeId {
        self.nodes.and_then(|n| n.menu).expect("palette mounted with a menu")
    }

    pub fn outline(&self) -> Vec<String> {
        menu_outline(&self.tree, self.menu())
    }

    pub fn active(&self) -> Vec<String> {
        active_labels(&self.tree, self.menu())
    }

    pub fn row(&self, label: &str) -> NodeId {
        find_row(&self.tree, self.menu(), label).unwrap_or_else(|| panic!("row {label:?} present"))
    }

    /// Host re-render of the row list.
    pub fn rerender(&mut self, rows: &[&str]) {
        let menu = self.menu();
        render_rows(&mut self.tree, menu, &specs(rows));
        self.deliver();
    }

    pub fn star(&mut self, label: &str) -> ClickOutcome {
        let row = self.row(label);
        let star = self.tree.locate(row, &STAR).expect("star rendered");
        self.engine.handle_click(&mut self.tree, star)
    }

    pub fn click_row(&mut self, label: &str) -> ClickOutcome {
        let row = self.row(label);
        self.engine.handle_click(&mut self.tree, row)
    }

    pub fn sort(&mut self, mode: SortMode) -> ClickOutcome {
        let portal = self.nodes.expect("palette mounted").portal;
        let button = self
            .tree
            .locate_all(portal, &SORT_BUTTON)
            .into_iter()
            .find(|b| self.tree.attr(*b, SORT_MODE_ATTR).as_deref() == Some(mode.label()))
            .expect("sort button rendered");
        self.engine.handle_click(&mut self.tree, button)
    }

    pub fn key(&mut self, key: NavKey) -> KeyOutcome {
        self.engine.handle_key(&mut self.tree, key)
    }
}

pub fn sep() -> String {
    core_dom::fixture::SEPARATOR_OUTLINE.to_string()
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
