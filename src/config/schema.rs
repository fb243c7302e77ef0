use std::path::PathBuf;

use serde::Deserialize;

/// Top-level settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/tapedeck/config.toml` or `~/.config/tapedeck/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `TAPEDECK__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub player: PlayerSettings,
    pub timing: TimingSettings,
    pub classes: ClassNames,
    pub library: LibrarySettings,
    pub ui: UiSettings,
    pub log: LogSettings,
}

/// The options a host passes to `init`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    /// Advance to the next track when one finishes.
    pub play_next: bool,
    /// Start the first track right after the initial scan.
    pub auto_play: bool,
    /// Wrap around at either end of the playlist.
    pub repeat_all: bool,
    /// Class of the element that scopes the playlist. `None` scans the whole document.
    pub container_scope: Option<String>,
    /// Rescan automatically when the container's subtree changes.
    pub auto_scan: bool,
    /// When set, only links carrying this class join the playlist.
    pub link_filter_class: Option<String>,
    pub controls_markup: ControlsMarkup,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            play_next: true,
            auto_play: false,
            repeat_all: false,
            container_scope: None,
            auto_scan: true,
            link_filter_class: None,
            controls_markup: ControlsMarkup::default(),
        }
    }
}

/// Whether and where the default transport markup is injected.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlsMarkup {
    pub enabled: bool,
    pub wrapper_class: String,
    pub position: MarkupPosition,
}

impl Default for ControlsMarkup {
    fn default() -> Self {
        Self {
            enabled: false,
            wrapper_class: "td-controls-wrapper".to_string(),
            position: MarkupPosition::Top,
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarkupPosition {
    #[default]
    Top,
    Bottom,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    /// Quiet period before a burst of page mutations triggers one rescan (milliseconds).
    pub mutation_debounce_ms: u64,
    /// Minimum spacing between seek commands while scrubbing (milliseconds).
    pub scrub_throttle_ms: u64,
    /// Delay before skipping past a track that failed to load (milliseconds).
    pub error_skip_delay_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            mutation_debounce_ms: 100,
            scrub_throttle_ms: 20,
            error_skip_delay_ms: 250,
        }
    }
}

/// CSS class names the controller reads from or writes to the page.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassNames {
    /// Forces a link to be playable even when the engine would not recognise it.
    pub playable: String,
    /// Keeps an otherwise playable link out of the playlist.
    pub exclude: String,
    /// Link is only appended to the playlist when clicked.
    pub cue: String,

    /// Added to every link in the playlist.
    pub link: String,
    pub playing: String,
    pub paused: String,
    pub buffering: String,
    pub error: String,
    /// Added to the playlist container at init.
    pub container: String,
    /// Added to the scrubber while a drag is active.
    pub dragging: String,
    /// Removed from every element once the playlist is non-empty.
    pub hide: String,

    pub play_pause: String,
    pub play_all: String,
    pub next: String,
    pub previous: String,
    pub current_time: String,
    pub duration: String,
    pub scrubber: String,
    pub status_bar: String,
    pub position: String,
    pub loading: String,
    pub track_title: String,
    pub permalink: String,
}

impl Default for ClassNames {
    fn default() -> Self {
        Self {
            playable: "td-playable".to_string(),
            exclude: "td-exclude".to_string(),
            cue: "td-cue".to_string(),

            link: "td-link".to_string(),
            playing: "td-playing".to_string(),
            paused: "td-paused".to_string(),
            buffering: "td-buffering".to_string(),
            error: "td-error".to_string(),
            container: "td-container".to_string(),
            dragging: "dragging".to_string(),
            hide: "td-hide".to_string(),

            play_pause: "td-play-pause".to_string(),
            play_all: "td-play-all".to_string(),
            next: "td-next".to_string(),
            previous: "td-previous".to_string(),
            current_time: "td-current-time".to_string(),
            duration: "td-duration".to_string(),
            scrubber: "td-scrubber".to_string(),
            status_bar: "td-statusbar".to_string(),
            position: "td-position".to_string(),
            loading: "td-loading".to_string(),
            track_title: "td-current-track-title".to_string(),
            permalink: "td-permalink".to_string(),
        }
    }
}

impl ClassNames {
    /// Every configured name paired with its field name, for validation.
    pub(crate) fn named(&self) -> [(&'static str, &str); 23] {
        [
            ("playable", &self.playable),
            ("exclude", &self.exclude),
            ("cue", &self.cue),
            ("link", &self.link),
            ("playing", &self.playing),
            ("paused", &self.paused),
            ("buffering", &self.buffering),
            ("error", &self.error),
            ("container", &self.container),
            ("dragging", &self.dragging),
            ("hide", &self.hide),
            ("play_pause", &self.play_pause),
            ("play_all", &self.play_all),
            ("next", &self.next),
            ("previous", &self.previous),
            ("current_time", &self.current_time),
            ("duration", &self.duration),
            ("scrubber", &self.scrubber),
            ("status_bar", &self.status_bar),
            ("position", &self.position),
            ("loading", &self.loading),
            ("track_title", &self.track_title),
            ("permalink", &self.permalink),
        ]
    }
}

/// Demo binary: which files in the scanned directory become links.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// File extensions to treat as audio (case-insensitive, without dot).
    pub extensions: Vec<String>,
    /// Whether to follow symlinks during scanning.
    pub follow_links: bool,
    /// Whether to include hidden files/directories (dotfiles).
    pub include_hidden: bool,
    /// Whether to recurse into subdirectories.
    pub recursive: bool,
    /// Optional cap on directory recursion depth.
    pub max_depth: Option<usize>,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            extensions: vec!["mp3".into(), "flac".into(), "wav".into(), "ogg".into()],
            follow_links: true,
            include_hidden: true,
            recursive: true,
            max_depth: None,
        }
    }
}

/// Demo binary: terminal UI.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// The text rendered inside the top header box.
    pub header_text: String,
    /// How far one `H` / `L` scrub drag moves the pointer, in percent of the scrubber.
    pub scrub_step_percent: f64,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            header_text: " ~ every link a track ~ ".to_string(),
            scrub_step_percent: 5.0,
        }
    }
}

/// Demo binary: where `tracing` output goes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Log file. No subscriber is installed when unset.
    pub file: Option<PathBuf>,
}
