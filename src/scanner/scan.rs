use tracing::debug;

use crate::config::Settings;
use crate::engine::{SoundEngine, SoundId};
use crate::page::{ElementId, INDEX_ATTR, PERMALINK_ATTR, Page, SOUND_ID_ATTR};
use crate::registry::SoundRecord;

use super::snapshot::{Snapshot, TrackDescriptor};

/// Which links count as tracks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRules {
    /// Forces a link to be playable even if the engine does not recognise it.
    pub playable_class: String,
    pub exclude_class: String,
    /// Marks links that join the playlist only when clicked.
    pub cue_class: String,
    /// Added to every qualifying link.
    pub link_class: String,
    /// When set, only links carrying this class qualify.
    pub filter_class: Option<String>,
}

impl LinkRules {
    pub fn from_settings(settings: &Settings) -> Self {
        let classes = &settings.classes;
        Self {
            playable_class: classes.playable.clone(),
            exclude_class: classes.exclude.clone(),
            cue_class: classes.cue.clone(),
            link_class: classes.link.clone(),
            filter_class: settings
                .player
                .link_filter_class
                .clone()
                .filter(|c| !c.is_empty()),
        }
    }

    /// A link is a track candidate when it has an `href`, the engine can play
    /// it or it is marked playable, it is not excluded and it passes the
    /// filter class. Cue links are candidates too; [`LinkScanner::scan`]
    /// skips them.
    pub fn is_candidate<P, E>(&self, page: &P, engine: &E, el: ElementId) -> bool
    where
        P: Page + ?Sized,
        E: SoundEngine + ?Sized,
    {
        if !page.is_link(el) {
            return false;
        }
        let Some(href) = page.attr(el, "href").filter(|h| !h.is_empty()) else {
            return false;
        };
        let mime = page.attr(el, "type");
        let playable = engine.can_play_link(&href, mime.as_deref())
            || page.has_class(el, &self.playable_class);
        if !playable || page.has_class(el, &self.exclude_class) {
            return false;
        }
        match &self.filter_class {
            Some(class) => page.has_class(el, class),
            None => true,
        }
    }

    pub fn is_cue<P: Page + ?Sized>(&self, page: &P, el: ElementId) -> bool {
        page.has_class(el, &self.cue_class)
    }
}

/// Builds snapshots and annotates the page with index and sound id
/// attributes.
#[derive(Debug, Clone)]
pub struct LinkScanner {
    rules: LinkRules,
    generated: u64,
    /// Cue links that joined the playlist, in the order they were clicked.
    cued: Vec<ElementId>,
}

impl LinkScanner {
    pub fn new(rules: LinkRules) -> Self {
        Self {
            rules,
            generated: 0,
            cued: Vec::new(),
        }
    }

    pub fn rules(&self) -> &LinkRules {
        &self.rules
    }

    /// Scan the links below `root`. Running it twice over an unchanged page
    /// yields the same snapshot and leaves the same attributes behind.
    pub fn scan<P, E>(&mut self, page: &mut P, engine: &E, root: ElementId) -> Snapshot
    where
        P: Page + ?Sized,
        E: SoundEngine + ?Sized,
    {
        let links = page.links_within(root);
        let mut tracks = Vec::new();
        for &el in &links {
            if !self.rules.is_candidate(page, engine, el) || self.rules.is_cue(page, el) {
                continue;
            }
            let index = tracks.len();
            tracks.push(self.describe(page, el, index));
        }

        // Cued links stay at the end for as long as they remain on the page.
        let rules = &self.rules;
        self.cued.retain(|el| {
            links.contains(el) && rules.is_cue(page, *el) && rules.is_candidate(page, engine, *el)
        });
        for el in self.cued.clone() {
            let index = tracks.len();
            tracks.push(self.describe(page, el, index));
        }
        debug!(found = tracks.len(), cued = self.cued.len(), "scanned links");
        Snapshot::from_tracks(tracks)
    }

    /// Append a clicked cue link to `snapshot`. Returns `None` when `el` is
    /// not a cue candidate or is already part of the playlist.
    pub fn cue<P, E>(
        &mut self,
        page: &mut P,
        engine: &E,
        snapshot: &Snapshot,
        el: ElementId,
    ) -> Option<Snapshot>
    where
        P: Page + ?Sized,
        E: SoundEngine + ?Sized,
    {
        if snapshot.find_element(el).is_some()
            || !self.rules.is_cue(page, el)
            || !self.rules.is_candidate(page, engine, el)
        {
            return None;
        }
        let track = self.describe(page, el, snapshot.len());
        self.cued.push(el);
        debug!(sound = %track.sound, index = track.index, "cued link");
        Some(snapshot.with_appended(track))
    }

    /// Remove the annotations a scan leaves on qualifying links below `root`.
    /// Sound id attributes are kept: they are the links' identity.
    pub fn strip<P, E>(&self, page: &mut P, engine: &E, root: ElementId)
    where
        P: Page + ?Sized,
        E: SoundEngine + ?Sized,
    {
        for el in page.links_within(root) {
            if self.rules.is_candidate(page, engine, el) {
                page.remove_class(el, &self.rules.link_class);
                page.remove_attr(el, INDEX_ATTR);
            }
        }
    }

    /// Restart generated sound ids from zero and forget cued links.
    pub fn reset(&mut self) {
        self.generated = 0;
        self.cued.clear();
    }

    fn describe<P: Page + ?Sized>(
        &mut self,
        page: &mut P,
        el: ElementId,
        index: usize,
    ) -> TrackDescriptor {
        page.add_class(el, &self.rules.link_class);
        page.set_attr(el, INDEX_ATTR, &index.to_string());

        let sound = match page.attr(el, SOUND_ID_ATTR).filter(|s| !s.is_empty()) {
            Some(id) => SoundId::new(id),
            None => {
                let id = SoundId::new(format!("_sound_{}", self.generated));
                self.generated += 1;
                page.set_attr(el, SOUND_ID_ATTR, id.as_str());
                id
            }
        };

        let title = page
            .attr(el, "title")
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| page.text(el));

        TrackDescriptor {
            index,
            sound,
            url: page.attr(el, "href").unwrap_or_default(),
            title,
            permalink: page.attr(el, PERMALINK_ATTR),
            mime_type: page.attr(el, "type"),
            element: el,
        }
    }
}

/// Outcome of re-anchoring a sound against a fresh snapshot.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Reconciled {
    /// The sound is in the snapshot; its index and element were rebound.
    Anchored,
    /// The sound is gone; its position can no longer be trusted.
    Orphaned,
}

/// Rebind `record` to the descriptor of its sound in `snapshot`, or flag it
/// orphaned when the sound is absent.
pub fn reconcile(record: &mut SoundRecord, snapshot: &Snapshot) -> Reconciled {
    match snapshot.find_sound(&record.descriptor.sound) {
        Some(track) => {
            record.descriptor = track.clone();
            record.orphaned = false;
            Reconciled::Anchored
        }
        None => {
            record.orphaned = true;
            Reconciled::Orphaned
        }
    }
}
