use tapedeck::config::Settings;
use tapedeck::page::{ElementId, MemoryPage, PERMALINK_ATTR, Page};

use crate::library::Track;

/// Class of the list that holds one link per track.
pub const PLAYLIST_CLASS: &str = "playlist";

/// A page with one list item and link per track, in library order.
pub fn build_page(tracks: &[Track]) -> (MemoryPage, ElementId) {
    let mut page = MemoryPage::new();
    let body = page.body();
    let list = page.append(body, "ul");
    page.add_class(list, PLAYLIST_CLASS);
    for track in tracks {
        let li = page.append(list, "li");
        let link = page.append_link(li, &track.url(), &track.link_text());
        page.set_attr(link, PERMALINK_ATTR, &track.path.display().to_string());
    }
    (page, list)
}

/// The player options for the terminal host: the demo page carries no
/// controls of its own, so the default markup is always injected.
pub fn player_settings(settings: &Settings) -> Settings {
    let mut settings = settings.clone();
    settings.player.controls_markup.enabled = true;
    settings
}
