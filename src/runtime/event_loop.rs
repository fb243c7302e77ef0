use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{Terminal, backend::CrosstermBackend};
use tapedeck::clock::Clock;
use tapedeck::config::Settings;
use tapedeck::page::{ControlKind, ElementId, MemoryPage, Page};
use tapedeck::player::PointerButton;
use tapedeck::{Input, Player, SoundEngine};
use tracing::debug;

use super::DeckPlayer;
use crate::ui;

/// Longest wait for input before the engine is polled again.
const FRAME: Duration = Duration::from_millis(50);

/// State tracked by the runtime event loop across iterations.
#[derive(Debug, Default)]
pub struct EventLoopState {
    /// Cursor into the current playlist.
    pub selected: usize,
    /// List items taken off the page, most recent last, with the parent and
    /// position they came from.
    removed: Vec<(ElementId, ElementId, usize)>,
}

impl EventLoopState {
    fn clamp(&mut self, len: usize) {
        self.selected = self.selected.min(len.saturating_sub(1));
    }
}

/// How long to wait for input: until the player's next timer, at most one
/// frame.
pub(super) fn poll_timeout(next_deadline: Option<Instant>, now: Instant) -> Duration {
    next_deadline
        .map(|at| at.saturating_duration_since(now).min(FRAME))
        .unwrap_or(FRAME)
}

/// Main terminal event loop: feeds engine callbacks and timers to the player,
/// draws, and turns keys into page input. Returns `Ok(())` when shutdown is
/// requested.
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &Settings,
    player: &mut DeckPlayer,
    state: &mut EventLoopState,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        player.engine_mut().poll();
        player.pump_events();
        player.tick();
        state.clamp(player.snapshot().len());

        terminal.draw(|f| ui::draw(f, player, state.selected, &settings.ui))?;

        if event::poll(poll_timeout(player.next_deadline(), Instant::now()))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
            && handle_key_event(key, settings, player, state)
        {
            break;
        }
    }

    Ok(())
}

/// Apply one key press. Returns whether the user asked to quit.
pub fn handle_key_event<E, C>(
    key: KeyEvent,
    settings: &Settings,
    player: &mut Player<MemoryPage, E, C>,
    state: &mut EventLoopState,
) -> bool
where
    E: SoundEngine,
    C: Clock,
{
    let len = player.snapshot().len();
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('j') | KeyCode::Down => {
            if state.selected + 1 < len {
                state.selected += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            state.selected = state.selected.saturating_sub(1);
        }
        KeyCode::Enter => {
            if let Some(target) = player.snapshot().get(state.selected).map(|t| t.element) {
                player.handle_input(Input::Click {
                    target,
                    button: PointerButton::Primary,
                });
            }
        }
        KeyCode::Char(' ') | KeyCode::Char('p') => {
            player.handle_input(Input::Control(ControlKind::PlayPause));
        }
        KeyCode::Char('a') => {
            player.handle_input(Input::Control(ControlKind::PlayAll));
        }
        KeyCode::Char('l') => {
            player.handle_input(Input::Control(ControlKind::Next));
        }
        KeyCode::Char('h') => {
            player.handle_input(Input::Control(ControlKind::Previous));
        }
        KeyCode::Char('L') => scrub(player, settings.ui.scrub_step_percent),
        KeyCode::Char('H') => scrub(player, -settings.ui.scrub_step_percent),
        KeyCode::Char('d') => remove_selected(player, state),
        KeyCode::Char('u') => {
            if let Some((item, parent, pos)) = state.removed.pop() {
                player.page_mut().attach(parent, item, pos);
                player.handle_input(Input::Mutation);
            }
        }
        KeyCode::Char('r') => player.scan_page(),
        _ => {}
    }
    false
}

/// Drag the scrubber from the current position by `step_percent`, in one
/// press-and-release.
fn scrub<E, C>(player: &mut Player<MemoryPage, E, C>, step_percent: f64)
where
    E: SoundEngine,
    C: Clock,
{
    let controls = *player.controls();
    let Some(scrubber) = controls.scrubber else {
        return;
    };
    let current = controls
        .position
        .and_then(|el| player.page().width_percent(el))
        .unwrap_or(0.0);
    let target = (current + step_percent).clamp(0.0, 100.0);
    let page = player.page();
    let x = page.offset_left(scrubber) + page.offset_width(scrubber) * target / 100.0;
    debug!(current, target, "scrubbing");

    player.handle_input(Input::PointerDown {
        target: scrubber,
        x,
        button: PointerButton::Primary,
    });
    player.handle_input(Input::PointerUp);
}

/// Take the selected link's list item off the page, the way a host page
/// would remove content.
fn remove_selected<E, C>(player: &mut Player<MemoryPage, E, C>, state: &mut EventLoopState)
where
    E: SoundEngine,
    C: Clock,
{
    let Some(link) = player.snapshot().get(state.selected).map(|t| t.element) else {
        return;
    };
    let item = player.page().parent(link).unwrap_or(link);
    if let Some((parent, pos)) = player.page_mut().detach(item) {
        state.removed.push((item, parent, pos));
        player.handle_input(Input::Mutation);
    }
}
