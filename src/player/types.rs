use crate::config::ClassNames;
use crate::engine::SoundId;
use crate::page::{ControlKind, ElementId, Page};

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum PlaybackStatus {
    #[default]
    Stopped,
    Playing,
    Paused,
    /// The track ran out; resolved into `Stopped` or an advance before the
    /// transition returns.
    Finished,
}

/// The single authoritative playback state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub(crate) active: Option<SoundId>,
    pub(crate) status: PlaybackStatus,
    pub(crate) drag_active: bool,
}

impl Session {
    pub fn active(&self) -> Option<&SoundId> {
        self.active.as_ref()
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_active
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    /// Usually the wheel button.
    Auxiliary,
    Secondary,
}

/// Something the page delivered to one of the player's listeners.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Input {
    Click {
        target: ElementId,
        button: PointerButton,
    },
    Control(ControlKind),
    PointerDown {
        target: ElementId,
        x: f64,
        button: PointerButton,
    },
    PointerMove {
        x: f64,
    },
    PointerUp,
    /// The container's subtree changed.
    Mutation,
}

/// Whether the page should go on with the input's default action.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InputOutcome {
    /// Consumed; the default action must be prevented.
    Handled,
    PassThrough,
}

/// Control elements found by the latest scan. Any of them may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Controls {
    pub play_pause: Option<ElementId>,
    pub play_all: Option<ElementId>,
    pub next: Option<ElementId>,
    pub previous: Option<ElementId>,
    pub current_time: Option<ElementId>,
    pub duration: Option<ElementId>,
    pub status_bar: Option<ElementId>,
    pub loading: Option<ElementId>,
    pub position: Option<ElementId>,
    pub scrubber: Option<ElementId>,
    pub track_title: Option<ElementId>,
    pub permalink: Option<ElementId>,
}

impl Controls {
    /// First element of each control class.
    pub fn locate<P: Page + ?Sized>(page: &P, classes: &ClassNames) -> Self {
        Self {
            play_pause: page.first_by_class(&classes.play_pause),
            play_all: page.first_by_class(&classes.play_all),
            next: page.first_by_class(&classes.next),
            previous: page.first_by_class(&classes.previous),
            current_time: page.first_by_class(&classes.current_time),
            duration: page.first_by_class(&classes.duration),
            status_bar: page.first_by_class(&classes.status_bar),
            loading: page.first_by_class(&classes.loading),
            position: page.first_by_class(&classes.position),
            scrubber: page.first_by_class(&classes.scrubber),
            track_title: page.first_by_class(&classes.track_title),
            permalink: page.first_by_class(&classes.permalink),
        }
    }

    pub fn transport(&self, kind: ControlKind) -> Option<ElementId> {
        match kind {
            ControlKind::PlayPause => self.play_pause,
            ControlKind::PlayAll => self.play_all,
            ControlKind::Next => self.next,
            ControlKind::Previous => self.previous,
        }
    }

    /// Class names of the controls that were not found.
    pub fn missing<'a>(&self, classes: &'a ClassNames) -> Vec<&'a str> {
        [
            (self.play_pause, &classes.play_pause),
            (self.play_all, &classes.play_all),
            (self.next, &classes.next),
            (self.previous, &classes.previous),
            (self.current_time, &classes.current_time),
            (self.duration, &classes.duration),
            (self.status_bar, &classes.status_bar),
            (self.loading, &classes.loading),
            (self.position, &classes.position),
            (self.scrubber, &classes.scrubber),
            (self.track_title, &classes.track_title),
            (self.permalink, &classes.permalink),
        ]
        .into_iter()
        .filter(|(el, _)| el.is_none())
        .map(|(_, class)| class.as_str())
        .collect()
    }
}
