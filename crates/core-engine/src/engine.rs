use crate::controls::{
    ControlHit, KEY_ATTR, ensure_sort_controls, hit_test, set_star_state, update_sort_controls,
};
use crate::observers::{PortalSignal, PortalWatcher, find_portal};
use crate::reconcile::{PassSummary, reconcile};
use crate::scheduler::{PassScheduler, SchedulerMetricsSnapshot};
use crate::session::Session;
use core_dom::{HostTree, MutationRecord, NavKey, NodeId};
use core_prefs::{Identity, PreferenceStore, SettingsBackend, SortMode};
use tracing::{debug, info};

/// Palette lifecycle transition observed during a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Opened(NodeId),
    Closed,
    /// The host swapped the palette root for a new one while open.
    Replaced(NodeId),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub lifecycle: Option<Lifecycle>,
    pub pass: Option<PassSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Engine control; the host must not see this click.
    Consumed,
    PassThrough,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Highlight moved by the engine; suppress the host's own handling.
    Handled,
    PassThrough,
}

/// Facade wiring the watchers, scheduler and reconciler to one host tree.
///
/// The embedder forwards three kinds of input: drained mutation records,
/// frame ticks, and user input (clicks, arrow keys). Nothing here blocks or
/// fails; every entry point degrades to a no-op when the palette structure
/// is not where it is expected.
#[derive(Debug)]
pub struct Engine<B: SettingsBackend> {
    prefs: PreferenceStore<B>,
    portal_watch: Option<PortalWatcher>,
    scheduler: PassScheduler,
    session: Option<Session>,
    sessions_opened: u64,
}

impl<B: SettingsBackend> Engine<B> {
    pub fn new(prefs: PreferenceStore<B>) -> Self {
        Self {
            prefs,
            portal_watch: None,
            scheduler: PassScheduler::new(),
            session: None,
            sessions_opened: 0,
        }
    }

    pub fn prefs(&self) -> &PreferenceStore<B> {
        &self.prefs
    }

    pub fn prefs_mut(&mut self) -> &mut PreferenceStore<B> {
        &mut self.prefs
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn sessions_opened(&self) -> u64 {
        self.sessions_opened
    }

    pub fn scheduler_metrics(&self) -> SchedulerMetricsSnapshot {
        self.scheduler.metrics_snapshot()
    }

    pub fn pass_pending(&self) -> bool {
        !self.scheduler.is_idle()
    }

    /// External request (e.g. preferences changed behind the engine's back).
    /// No-op while closed.
    pub fn request_pass(&mut self) -> bool {
        if self.session.is_none() {
            return false;
        }
        self.scheduler.request_pass()
    }

    /// Begin watching `tree`. A palette that is already mounted opens at once.
    pub fn start<T: HostTree + ?Sized>(&mut self, tree: &T) -> Option<Lifecycle> {
        self.portal_watch = Some(PortalWatcher::connect(tree));
        info!(target: "engine.lifecycle", "engine_started");
        self.portal_check(tree)
    }

    pub fn stop(&mut self) {
        self.close();
        self.portal_watch = None;
        info!(target: "engine.lifecycle", "engine_stopped");
    }

    /// Route a batch of child-list records drained from the host tree.
    pub fn handle_mutations<T: HostTree + ?Sized>(&mut self, tree: &T, records: &[MutationRecord]) {
        let Some(watch) = self.portal_watch.as_mut() else {
            return;
        };
        let open_portal = self.session.as_ref().map(|s| s.portal);
        if watch.observe(tree, records, open_portal) == PortalSignal::Closed {
            self.close();
            return;
        }
        if let Some(session) = self.session.as_mut() {
            if session.menu_watch.wants_pass(tree, records) {
                self.scheduler.request_pass();
            }
        }
    }

    /// Frame tick: deferred portal check first, then at most one pass.
    pub fn on_frame<T: HostTree + ?Sized>(&mut self, tree: &mut T) -> FrameReport {
        let check = self
            .portal_watch
            .as_mut()
            .is_some_and(PortalWatcher::take_pending_check);
        let detached = self
            .session
            .as_ref()
            .is_some_and(|s| !tree.is_attached(s.portal));
        let lifecycle = if check || detached {
            self.portal_check(&*tree)
        } else {
            None
        };
        let pass = self.run_due_pass(tree);
        FrameReport { lifecycle, pass }
    }

    fn run_due_pass<T: HostTree + ?Sized>(&mut self, tree: &mut T) -> Option<PassSummary> {
        let session = self.session.as_mut()?;
        if !self.scheduler.begin_frame() {
            return None;
        }
        session.menu_watch.refresh(&*tree);
        let summary = session
            .menu_watch
            .menu()
            .map(|menu| reconcile(tree, menu, session, &self.prefs));
        if summary.is_none() {
            debug!(target: "engine.reconcile", "pass_skipped_no_menu");
        }
        self.scheduler.finish_pass();
        summary
    }

    /// Compare the live tree against the open session and open, close, or
    /// replace accordingly.
    fn portal_check<T: HostTree + ?Sized>(&mut self, tree: &T) -> Option<Lifecycle> {
        let found = find_portal(tree);
        let open = self.session.as_ref().map(|s| s.portal);
        match (open, found) {
            (Some(current), Some(portal)) if current == portal => None,
            (Some(_), Some(portal)) => {
                self.close();
                self.open(tree, portal);
                Some(Lifecycle::Replaced(portal))
            }
            (None, Some(portal)) => {
                self.open(tree, portal);
                Some(Lifecycle::Opened(portal))
            }
            (Some(_), None) => {
                self.close();
                Some(Lifecycle::Closed)
            }
            (None, None) => None,
        }
    }

    fn open<T: HostTree + ?Sized>(&mut self, tree: &T, portal: NodeId) {
        self.prefs.begin_session();
        self.session = Some(Session::open(tree, portal));
        self.sessions_opened += 1;
        self.scheduler.request_pass();
        info!(
            target: "engine.lifecycle",
            portal = portal.raw(),
            pins = self.prefs.pins().len(),
            "palette_opened"
        );
    }

    fn close(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        self.scheduler.cancel();
        self.prefs.end_session();
        info!(
            target: "engine.lifecycle",
            portal = session.portal.raw(),
            passes = session.menu_version,
            "palette_closed"
        );
    }

    /// Click dispatch. Star and sort-button clicks are consumed; row clicks
    /// update the active selection and pass through to the host.
    pub fn handle_click<T: HostTree + ?Sized>(&mut self, tree: &mut T, target: NodeId) -> ClickOutcome {
        let Some(session) = self.session.as_mut() else {
            return ClickOutcome::PassThrough;
        };
        if !tree.contains(session.portal, target) {
            return ClickOutcome::PassThrough;
        }
        match hit_test(&*tree, target) {
            ControlHit::Star { star, row } => {
                // The row's current text decides; the star's tag is only a
                // fallback for a star detached from its row.
                let identity = match row {
                    Some(row) => session.identities.resolve(tree, row).identity,
                    None => tree.attr(star, KEY_ATTR).map(Identity::new),
                };
                if let Some(identity) = identity {
                    let pinned = self.prefs.toggle_pin(&identity);
                    set_star_state(tree, star, pinned);
                    self.scheduler.request_pass();
                }
                ClickOutcome::Consumed
            }
            ControlHit::SortButton(label) => {
                if self.prefs.set_session_sort_label(&label) {
                    update_sort_controls(tree, session.portal, self.prefs.effective_sort_mode());
                    self.scheduler.request_pass();
                }
                ClickOutcome::Consumed
            }
            ControlHit::Row(row) => {
                let identity = session.identities.resolve(tree, row).identity;
                session.selection.remember(identity);
                ClickOutcome::PassThrough
            }
            ControlHit::Outside => ClickOutcome::PassThrough,
        }
    }

    /// Arrow keys are owned by the engine only while the list is reordered.
    pub fn handle_key<T: HostTree + ?Sized>(&mut self, tree: &mut T, key: NavKey) -> KeyOutcome {
        let Some(session) = self.session.as_mut() else {
            return KeyOutcome::PassThrough;
        };
        if !session.reordered {
            return KeyOutcome::PassThrough;
        }
        let Some(menu) = session.menu_watch.menu() else {
            return KeyOutcome::PassThrough;
        };
        match session.selection.step(tree, menu, session.menu_version, key) {
            Some(_) => KeyOutcome::Handled,
            None => KeyOutcome::PassThrough,
        }
    }

    /// Settings-surface write of the persisted default mode.
    pub fn set_default_sort_mode<T: HostTree + ?Sized>(&mut self, tree: &mut T, mode: SortMode) {
        self.prefs.set_global_sort_mode(mode);
        if let Some(session) = self.session.as_ref() {
            ensure_sort_controls(tree, session.portal);
            update_sort_controls(tree, session.portal, self.prefs.effective_sort_mode());
            self.scheduler.request_pass();
        }
    }
}
