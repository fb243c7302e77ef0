//! UI rendering helpers for the terminal user interface.
//!
//! Everything shown here is read back from the page the player drives: the
//! tags on the links, the text of the time readouts and the width of the
//! position bar. The terminal is just another view of that document.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Modifier, Style, Stylize},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Padding, Paragraph, Wrap},
};
use std::{collections::BTreeMap, sync::LazyLock};

use tapedeck::config::{ClassNames, UiSettings};
use tapedeck::page::{ElementId, MemoryPage, Page};
use tapedeck::PlaybackStatus;

use crate::runtime::DeckPlayer;

static CONTROLS_MAP: LazyLock<BTreeMap<&'static str, &'static str>> = LazyLock::new(|| {
    let mut map = BTreeMap::new();
    map.insert("j/k", "up/down");
    map.insert("enter", "play selected link");
    map.insert("space/p", "play/pause");
    map.insert("a", "play all");
    map.insert("h/l", "prev/next");
    // H/L is filled dynamically from config.
    map.insert("d/u", "remove/restore link");
    map.insert("r", "rescan");
    map.insert("q", "quit");
    map
});

/// Render the controls help text, incorporating the scrub step.
pub(crate) fn controls_text(scrub_step_percent: f64) -> String {
    // Keep the rendered order stable and human-friendly.
    let order = ["j/k", "h/l", "H/L", "enter", "space/p", "a", "d/u", "r", "q"];
    order
        .iter()
        .filter_map(|k| {
            if *k == "H/L" {
                Some(format!("[H/L] scrub -/+{scrub_step_percent}%"))
            } else {
                CONTROLS_MAP.get(*k).map(|v| format!("[{k}] {v}"))
            }
        })
        .collect::<Vec<String>>()
        .join(" | ")
}

/// Window of `total` rows that fits `height` and keeps `selected` centered
/// when possible. Returns `(start, end, selected_in_window)`.
pub(crate) fn visible_window(total: usize, height: usize, selected: usize) -> (usize, usize, usize) {
    let selected = selected.min(total.saturating_sub(1));
    if total <= height || height == 0 {
        return (0, total, selected);
    }
    let half = height / 2;
    let mut start = selected.saturating_sub(half);
    if start + height > total {
        start = total - height;
    }
    (start, start + height, selected - start)
}

/// Prefix showing the tags a link carries.
pub(crate) fn link_marker(page: &MemoryPage, el: ElementId, classes: &ClassNames) -> &'static str {
    if page.has_class(el, &classes.error) {
        "✗ "
    } else if page.has_class(el, &classes.buffering) {
        "… "
    } else if page.has_class(el, &classes.playing) {
        "▶ "
    } else if page.has_class(el, &classes.paused) {
        "⏸ "
    } else {
        "  "
    }
}

fn status_label(status: PlaybackStatus) -> &'static str {
    match status {
        PlaybackStatus::Playing => "Playing",
        PlaybackStatus::Paused => "Paused",
        PlaybackStatus::Stopped | PlaybackStatus::Finished => "Stopped",
    }
}

fn control_text(player: &DeckPlayer, el: Option<ElementId>) -> String {
    el.map(|el| player.page().text(el)).unwrap_or_default()
}

/// Render the entire UI into `frame`.
pub fn draw(frame: &mut Frame, player: &DeckPlayer, selected: usize, ui_settings: &UiSettings) {
    let classes = &player.settings().classes;
    let controls = player.controls();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(4),
        ])
        .split(frame.area());

    // Header
    let header = Paragraph::new(ui_settings.header_text.as_str())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" tapedeck ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    // Status box
    let status = {
        let mut parts: Vec<String> = vec![status_label(player.status()).to_string()];
        if player.session().active().is_some() {
            parts.push(format!("Track: {}", control_text(player, controls.track_title)));
            parts.push(format!(
                "{} / {}",
                control_text(player, controls.current_time),
                control_text(player, controls.duration)
            ));
        }
        let settings = &player.settings().player;
        parts.push(format!(
            "Next: {}",
            if settings.play_next { "auto" } else { "manual" }
        ));
        if settings.repeat_all {
            parts.push("Repeat: all".to_string());
        }
        if let Some(fault) = player.faults().last() {
            parts.push(format!("! {fault}"));
        }
        parts.join(" • ")
    };
    let status_par = Paragraph::new(status)
        .block(
            Block::bordered()
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                })
                .title(" status "),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(status_par, chunks[1]);

    // Scrubber: the position bar's width, as the player last set it.
    let percent = controls
        .position
        .and_then(|el| player.page().width_percent(el))
        .unwrap_or(0.0);
    let dragging = controls
        .scrubber
        .is_some_and(|el| player.page().has_class(el, &classes.dragging));
    let mut gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(" position "))
        .ratio((percent / 100.0).clamp(0.0, 1.0));
    if dragging {
        gauge = gauge.bold();
    }
    frame.render_widget(gauge, chunks[2]);

    // Main list: the current snapshot, in playlist order.
    {
        let tracks = player.snapshot().tracks();
        let total = tracks.len();
        let (start, end, selected_in_window) =
            visible_window(total, chunks[3].height.saturating_sub(2) as usize, selected);

        let visible_items: Vec<ListItem> = tracks[start..end]
            .iter()
            .map(|t| {
                let marker = link_marker(player.page(), t.element, classes);
                ListItem::new(format!("{marker}{}", t.title))
            })
            .collect();

        let list = List::new(visible_items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" playlist ({total}) ")),
            )
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut state = ListState::default();
        if total > 0 {
            state.select(Some(selected_in_window));
        }
        frame.render_stateful_widget(list, chunks[3], &mut state);
    }

    let footer = Paragraph::new(controls_text(ui_settings.scrub_step_percent))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" controls ")
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                }),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, chunks[4]);
}
