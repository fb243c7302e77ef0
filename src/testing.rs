//! Test doubles shared by the unit tests.

use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::clock::Clock;
use crate::config::Settings;
use crate::engine::{SoundCallbacks, SoundEngine, SoundEventKind, SoundId, SoundSpec, SoundStatus};
use crate::error::EngineError;
use crate::page::{ElementId, MemoryPage, Page};
use crate::player::Player;

/// Every command a [`FakeEngine`] received, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create(SoundId),
    Play(SoundId),
    Pause(SoundId),
    Resume(SoundId),
    TogglePause(SoundId),
    Stop(SoundId),
    Unload(SoundId),
    SetPosition(SoundId, u64),
    Reset,
}

#[derive(Debug, Default)]
pub struct FakeEngine {
    pub calls: Vec<Call>,
    callbacks: HashMap<SoundId, SoundCallbacks>,
    statuses: HashMap<SoundId, SoundStatus>,
    /// Ids whose creation fails.
    pub refuse: HashSet<SoundId>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire a lifecycle callback of `id` as the engine would.
    pub fn emit(&self, id: &str, kind: SoundEventKind) {
        if let Some(cb) = self.callbacks.get(&SoundId::from(id)) {
            cb.emit(kind);
        }
    }

    pub fn set_status(&mut self, id: &str, status: SoundStatus) {
        self.statuses.insert(SoundId::from(id), status);
    }

    pub fn is_created(&self, id: &str) -> bool {
        self.callbacks.contains_key(&SoundId::from(id))
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    pub fn position_of(&self, call: &Call) -> Option<usize> {
        self.calls.iter().position(|c| c == call)
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl SoundEngine for FakeEngine {
    fn can_play_link(&self, url: &str, mime_type: Option<&str>) -> bool {
        mime_type.is_some_and(|m| m.starts_with("audio/"))
            || url.ends_with(".mp3")
            || url.ends_with(".ogg")
    }

    fn create_sound(
        &mut self,
        spec: SoundSpec,
        callbacks: SoundCallbacks,
    ) -> Result<(), EngineError> {
        self.calls.push(Call::Create(spec.id.clone()));
        if self.refuse.contains(&spec.id) {
            return Err(EngineError::CreateFailed {
                id: spec.id,
                reason: "refused".to_string(),
            });
        }
        self.callbacks.insert(spec.id, callbacks);
        Ok(())
    }

    fn play(&mut self, id: &SoundId) {
        self.calls.push(Call::Play(id.clone()));
    }

    fn pause(&mut self, id: &SoundId) {
        self.calls.push(Call::Pause(id.clone()));
    }

    fn resume(&mut self, id: &SoundId) {
        self.calls.push(Call::Resume(id.clone()));
    }

    fn toggle_pause(&mut self, id: &SoundId) {
        self.calls.push(Call::TogglePause(id.clone()));
    }

    fn stop(&mut self, id: &SoundId) {
        self.calls.push(Call::Stop(id.clone()));
    }

    fn unload(&mut self, id: &SoundId) {
        self.calls.push(Call::Unload(id.clone()));
    }

    fn set_position(&mut self, id: &SoundId, position_ms: u64) {
        self.calls.push(Call::SetPosition(id.clone(), position_ms));
    }

    fn status(&self, id: &SoundId) -> Option<SoundStatus> {
        if !self.callbacks.contains_key(id) {
            return None;
        }
        Some(self.statuses.get(id).cloned().unwrap_or_default())
    }

    fn reset(&mut self) {
        self.calls.push(Call::Reset);
        self.callbacks.clear();
        self.statuses.clear();
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock(Rc<Cell<Instant>>);

impl ManualClock {
    pub fn new() -> Self {
        Self(Rc::new(Cell::new(Instant::now())))
    }

    pub fn advance_ms(&self, ms: u64) {
        self.0.set(self.0.get() + Duration::from_millis(ms));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.0.get()
    }
}

pub type TestPlayer = Player<MemoryPage, FakeEngine, ManualClock>;

/// A page with one list of links, each given an explicit sound id so tests
/// can refer to tracks by name.
pub struct Fixture {
    pub page: MemoryPage,
    pub list: ElementId,
    pub links: Vec<ElementId>,
}

impl Fixture {
    pub fn new(ids: &[&str]) -> Self {
        let mut page = MemoryPage::new();
        let list = page.append(page.body(), "ul");
        let links = ids
            .iter()
            .map(|id| {
                let li = page.append(list, "li");
                let a = page.append_link(li, &format!("{id}.mp3"), id);
                page.set_attr(a, crate::page::SOUND_ID_ATTR, id);
                a
            })
            .collect();
        Self { page, list, links }
    }

    /// Add the default transport controls at the top of the body.
    pub fn with_controls(mut self) -> Self {
        let classes = crate::config::ClassNames::default();
        let body = self.page.body();
        let wrapper = self.page.create_wrapper(
            body,
            "td-controls-wrapper",
            crate::config::MarkupPosition::Top,
        );
        self.page.render_default_controls(wrapper, &classes);
        let play_all = self.page.append_link(wrapper, "#", "all");
        self.page.add_class(play_all, &classes.play_all);
        self
    }

    pub fn start(self, settings: Settings) -> (TestPlayer, ManualClock, Vec<ElementId>) {
        let clock = ManualClock::new();
        let mut player = Player::with_clock(self.page, FakeEngine::new(), settings, clock.clone());
        player.init();
        (player, clock, self.links)
    }
}

/// Shorthand for a sound id.
pub fn sid(id: &str) -> SoundId {
    SoundId::from(id)
}
