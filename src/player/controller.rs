use std::collections::{HashSet, VecDeque};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::Settings;
use crate::engine::{SoundEngine, SoundEvent, SoundId};
use crate::error::Fault;
use crate::page::{ControlKind, ElementId, Listener, Page};
use crate::registry::SoundRegistry;
use crate::scanner::{Debouncer, LinkRules, LinkScanner, Reconciled, Snapshot, reconcile};
use crate::scrub::ScrubController;
use crate::surface;

use super::types::{Controls, Input, InputOutcome, PlaybackStatus, PointerButton, Session};

const FAULT_CAPACITY: usize = 32;

pub struct Player<P, E, C = SystemClock> {
    pub(super) page: P,
    pub(super) engine: E,
    pub(super) clock: C,
    pub(super) settings: Settings,
    pub(super) scanner: LinkScanner,
    pub(super) registry: SoundRegistry,
    pub(super) events: Receiver<SoundEvent>,
    pub(super) snapshot: Snapshot,
    pub(super) session: Session,
    pub(super) controls: Controls,
    /// Root of the playlist scope; `None` when the configured container is
    /// missing.
    pub(super) container: Option<ElementId>,
    pub(super) bound: HashSet<Listener>,
    pub(super) mutations: Debouncer,
    /// A scan was asked for mid-drag; it runs when the drag ends.
    pub(super) scan_deferred: bool,
    pub(super) scrub: ScrubController,
    /// Pending skip past a track that failed to load.
    pub(super) error_skip: Option<(Instant, SoundId)>,
    faults: VecDeque<Fault>,
}

impl<P, E> Player<P, E, SystemClock>
where
    P: Page,
    E: SoundEngine,
{
    pub fn new(page: P, engine: E, settings: Settings) -> Self {
        Self::with_clock(page, engine, settings, SystemClock)
    }
}

impl<P, E, C> Player<P, E, C>
where
    P: Page,
    E: SoundEngine,
    C: Clock,
{
    pub fn with_clock(page: P, engine: E, settings: Settings, clock: C) -> Self {
        let (tx, events) = mpsc::channel();
        let timing = &settings.timing;
        let mutations = Debouncer::new(Duration::from_millis(timing.mutation_debounce_ms));
        let scrub = ScrubController::new(Duration::from_millis(timing.scrub_throttle_ms));
        Self {
            page,
            engine,
            clock,
            scanner: LinkScanner::new(LinkRules::from_settings(&settings)),
            settings,
            registry: SoundRegistry::new(tx),
            events,
            snapshot: Snapshot::default(),
            session: Session::default(),
            controls: Controls::default(),
            container: None,
            bound: HashSet::new(),
            mutations,
            scan_deferred: false,
            scrub,
            error_skip: None,
            faults: VecDeque::new(),
        }
    }

    /// Resolve the playlist scope, scan it and start observing it.
    pub fn init(&mut self) {
        let body = self.page.body();
        self.container = match self.settings.player.container_scope.clone() {
            Some(class) if !class.is_empty() => {
                let found = self.page.first_by_class(&class);
                if found.is_none() {
                    self.record_fault(Fault::MissingContainer(class));
                }
                found
            }
            _ => Some(body),
        };
        if let Some(container) = self.container {
            let class = self.settings.classes.container.clone();
            self.page.add_class(container, &class);
            if self.settings.player.auto_scan {
                self.bind(Listener::Mutations(container));
            }
        }
        info!(
            container = ?self.container,
            auto_scan = self.settings.player.auto_scan,
            "player initialised"
        );

        self.rescan();
        if self.settings.player.auto_play {
            self.start_index(0);
        }
        self.sync();
    }

    /// Unbind everything, strip the page annotations and forget all state.
    /// The player can be initialised again afterwards.
    pub fn destroy(&mut self) {
        info!("destroying player");
        for listener in std::mem::take(&mut self.bound) {
            self.page.unlisten(listener);
        }
        if let Some(container) = self.container {
            self.scanner.strip(&mut self.page, &self.engine, container);
        }
        self.registry.reset(&mut self.engine);
        while self.events.try_recv().is_ok() {}

        self.snapshot = Snapshot::default();
        self.session = Session::default();
        self.controls = Controls::default();
        self.container = None;
        self.scanner.reset();
        self.mutations.cancel();
        self.scan_deferred = false;
        self.scrub.cancel();
        self.error_skip = None;
        self.faults.clear();
    }

    /// Scan and reconcile right away.
    pub fn scan_page(&mut self) {
        self.rescan();
        self.sync();
    }

    /// Route an input from one of the page listeners.
    pub fn handle_input(&mut self, input: Input) -> InputOutcome {
        match input {
            Input::Click { target, button } if self.is_bound(Listener::DocumentClick) => {
                self.click(target, button)
            }
            Input::Control(kind) if self.is_bound(Listener::Control(kind)) => {
                match kind {
                    ControlKind::PlayPause => self.toggle_play_global(),
                    ControlKind::PlayAll => self.toggle_play_all(),
                    ControlKind::Next => self.next(),
                    ControlKind::Previous => self.previous(),
                }
                InputOutcome::Handled
            }
            Input::PointerDown { target, x, button } if self.is_bound(Listener::PointerDown) => {
                if button == PointerButton::Secondary {
                    return InputOutcome::PassThrough;
                }
                self.begin_drag(target, x)
            }
            Input::PointerMove { x } if self.is_bound(Listener::PointerMove) => {
                self.move_drag(x);
                InputOutcome::Handled
            }
            Input::PointerUp if self.is_bound(Listener::PointerUp) => self.end_drag(),
            Input::Mutation
                if self
                    .container
                    .is_some_and(|c| self.is_bound(Listener::Mutations(c))) =>
            {
                self.notify_mutation();
                InputOutcome::PassThrough
            }
            _ => InputOutcome::PassThrough,
        }
    }

    /// The container changed; rescan once things settle.
    pub fn notify_mutation(&mut self) {
        self.mutations.notify(self.clock.now());
    }

    /// Fire every timer whose deadline has passed.
    pub fn tick(&mut self) {
        let now = self.clock.now();
        let mut changed = false;

        if self.mutations.take_due(now) {
            self.rescan();
            changed = true;
        }
        if let Some(cmd) = self.scrub.tick(now) {
            self.run_scrub(cmd);
        }
        if let Some((at, sound)) = self.error_skip.clone()
            && now >= at
        {
            self.error_skip = None;
            if self.session.active.as_ref() == Some(&sound) {
                debug!(sound = %sound, "skipping past failed track");
                self.advance(true);
                changed = true;
            }
        }

        if changed {
            self.sync();
        }
    }

    /// Earliest pending timer, for hosts that sleep between ticks.
    pub fn next_deadline(&self) -> Option<Instant> {
        [
            self.mutations.deadline(),
            self.scrub.deadline(),
            self.error_skip.as_ref().map(|(at, _)| *at),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Contained failures, oldest first.
    pub fn faults(&self) -> impl Iterator<Item = &Fault> {
        self.faults.iter()
    }

    pub fn status(&self) -> PlaybackStatus {
        self.session.status
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn registry(&self) -> &SoundRegistry {
        &self.registry
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    /// Direct page access, e.g. to insert or remove links. Follow up with
    /// [`Player::notify_mutation`] or [`Player::scan_page`].
    pub fn page_mut(&mut self) -> &mut P {
        &mut self.page
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Build a new snapshot, reconcile the active sound against it and
    /// rebind listeners. Deferred to the end of a drag in progress.
    pub(super) fn rescan(&mut self) {
        if self.session.drag_active {
            debug!("drag in progress, scan deferred");
            self.scan_deferred = true;
            return;
        }
        self.scan_deferred = false;
        self.mutations.cancel();
        self.unbind_scan_listeners();

        let previous = std::mem::take(&mut self.snapshot);
        self.snapshot = match self.container {
            Some(root) => self.scanner.scan(&mut self.page, &self.engine, root),
            None => Snapshot::default(),
        };
        let diff = previous.diff(&self.snapshot);
        if !diff.is_empty() {
            debug!(added = diff.added.len(), removed = diff.removed.len(), "playlist changed");
        }

        if let Some(active) = self.session.active.clone()
            && let Some(handle) = self.registry.get_mut(&active)
        {
            let was_orphaned = handle.record.orphaned;
            if reconcile(&mut handle.record, &self.snapshot) == Reconciled::Orphaned
                && !was_orphaned
            {
                self.record_fault(Fault::Orphaned(active));
            }
        }

        if !self.snapshot.is_empty() {
            self.ensure_controls_markup();
            let hide = self.settings.classes.hide.clone();
            for el in self.page.elements_by_class(&hide) {
                self.page.remove_class(el, &hide);
            }
        }

        self.controls = Controls::locate(&self.page, &self.settings.classes);
        let missing: Vec<String> = self
            .controls
            .missing(&self.settings.classes)
            .into_iter()
            .map(str::to_string)
            .collect();
        for class in missing {
            self.record_fault(Fault::MissingControl(class));
        }

        self.bind(Listener::DocumentClick);
        self.bind(Listener::PointerDown);
        self.bind(Listener::PointerUp);
        if !self.snapshot.is_empty() {
            for kind in [
                ControlKind::PlayPause,
                ControlKind::PlayAll,
                ControlKind::Next,
                ControlKind::Previous,
            ] {
                if self.controls.transport(kind).is_some() {
                    self.bind(Listener::Control(kind));
                }
            }
        }
        debug!(tracks = self.snapshot.len(), "scan complete");
    }

    fn ensure_controls_markup(&mut self) {
        let markup = self.settings.player.controls_markup.clone();
        if !markup.enabled {
            return;
        }
        let wrapper = match self.page.first_by_class(&markup.wrapper_class) {
            Some(el) => el,
            None => {
                let parent = self.container.unwrap_or_else(|| self.page.body());
                debug!(class = %markup.wrapper_class, "creating controls wrapper");
                self.page
                    .create_wrapper(parent, &markup.wrapper_class, markup.position)
            }
        };
        if !self.page.has_children(wrapper) {
            self.page
                .render_default_controls(wrapper, &self.settings.classes);
        }
    }

    /// Project the session onto the page.
    pub(super) fn sync(&mut self) {
        let state = surface::project(&self.session, &self.registry);
        surface::apply(
            &mut self.page,
            &self.settings.classes,
            &self.controls,
            &state,
        );
        if let Some(handle) = self
            .session
            .active
            .as_ref()
            .and_then(|id| self.registry.get_mut(id))
        {
            handle.record.state_tag = state.tag;
        }
    }

    pub(super) fn record_fault(&mut self, fault: Fault) {
        warn!(%fault, "contained fault");
        if self.faults.contains(&fault) {
            return;
        }
        if self.faults.len() == FAULT_CAPACITY {
            self.faults.pop_front();
        }
        self.faults.push_back(fault);
    }

    pub(super) fn is_bound(&self, listener: Listener) -> bool {
        self.bound.contains(&listener)
    }

    pub(super) fn bind(&mut self, listener: Listener) {
        if self.bound.insert(listener) {
            self.page.listen(listener);
        }
    }

    pub(super) fn unbind(&mut self, listener: Listener) {
        if self.bound.remove(&listener) {
            self.page.unlisten(listener);
        }
    }

    fn unbind_scan_listeners(&mut self) {
        let scan_bound: Vec<Listener> = self
            .bound
            .iter()
            .copied()
            .filter(|l| !matches!(l, Listener::Mutations(_) | Listener::PointerMove))
            .collect();
        for listener in scan_bound {
            self.unbind(listener);
        }
    }
}
