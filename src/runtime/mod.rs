use std::env;
use std::path::Path;

use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::{Terminal, backend::CrosstermBackend};
use tapedeck::{MemoryPage, Player, RodioEngine};
use tracing::{info, warn};

use crate::library::scan;

mod event_loop;
mod logging;
mod settings;
mod startup;


/// The player as the terminal host runs it.
pub type DeckPlayer = Player<MemoryPage, RodioEngine>;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (settings, problem) = settings::load_settings();
    logging::init(&settings.log)?;
    if let Some(e) = problem {
        warn!(error = %e, "unusable config, using defaults");
    }

    let dir = env::args().nth(1).unwrap_or_else(|| {
        std::env::current_dir()
            .ok()
            .and_then(|p| p.to_str().map(|s| s.to_string()))
            .unwrap_or_else(|| "Music".to_string())
    });

    let tracks = scan(Path::new(&dir), &settings.library);
    info!(dir = %dir, tracks = tracks.len(), "starting tapedeck");
    let (page, _) = startup::build_page(&tracks);
    let engine = RodioEngine::open()?;
    let mut player = Player::new(page, engine, startup::player_settings(&settings));
    player.init();

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut state = event_loop::EventLoopState::default();
    let run_result = event_loop::run(&mut terminal, &settings, &mut player, &mut state);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    player.destroy();
    run_result
}
