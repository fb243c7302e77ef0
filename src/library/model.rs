use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Track {
    pub path: PathBuf,
    pub title: String,
    pub artist: Option<String>,
}

impl Track {
    /// `Artist - Title`, or just the title.
    pub fn link_text(&self) -> String {
        match self.artist.as_deref().map(str::trim) {
            Some(a) if !a.is_empty() => format!("{} - {}", a, self.title),
            _ => self.title.clone(),
        }
    }

    /// Link target the engine resolves back to [`Track::path`].
    pub fn url(&self) -> String {
        format!("file://{}", self.path.display())
    }
}
