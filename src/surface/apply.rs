use crate::config::ClassNames;
use crate::page::{CURRENT_INDEX_ATTR, CURRENT_SOUND_ID_ATTR, ElementId, Page, SOUND_ID_ATTR};
use crate::player::{Controls, PlaybackStatus};

use super::project::{LinkState, Progress, SurfaceState, format_clock};

fn state_class(classes: &ClassNames, state: LinkState) -> &str {
    match state {
        LinkState::Playing => &classes.playing,
        LinkState::Paused => &classes.paused,
    }
}

/// Remove every class of the slot, then add the wanted ones.
fn set_slot<P: Page + ?Sized>(
    page: &mut P,
    el: ElementId,
    classes: &ClassNames,
    state: Option<LinkState>,
    buffering: bool,
) {
    page.remove_class(el, &classes.playing);
    page.remove_class(el, &classes.paused);
    page.remove_class(el, &classes.buffering);
    if let Some(state) = state {
        page.add_class(el, state_class(classes, state));
    }
    if buffering {
        page.add_class(el, &classes.buffering);
    }
}

/// Write `state` onto the page.
pub fn apply<P: Page + ?Sized>(
    page: &mut P,
    classes: &ClassNames,
    controls: &Controls,
    state: &SurfaceState,
) {
    let body = page.body();
    set_slot(page, body, classes, state.tag, state.buffering);
    if let Some(el) = controls.play_pause {
        set_slot(page, el, classes, state.tag, state.buffering);
    }
    if let Some(el) = controls.play_all {
        set_slot(page, el, classes, state.play_all_tag, state.buffering);
    }

    for el in [controls.play_pause, controls.play_all].into_iter().flatten() {
        match &state.active {
            Some(active) => {
                page.set_attr(el, CURRENT_SOUND_ID_ATTR, active.sound.as_str());
                page.set_attr(el, CURRENT_INDEX_ATTR, &active.index.to_string());
            }
            None => {
                page.remove_attr(el, CURRENT_SOUND_ID_ATTR);
                page.remove_attr(el, CURRENT_INDEX_ATTR);
            }
        }
    }

    // Every element linked to a sound, so duplicates and re-inserted links
    // follow the active sound too.
    for el in page.elements_with_attr(SOUND_ID_ATTR) {
        let sound = page.attr(el, SOUND_ID_ATTR).unwrap_or_default();
        let is_active = state
            .active
            .as_ref()
            .is_some_and(|a| a.sound.as_str() == sound);
        if is_active {
            set_slot(page, el, classes, state.tag, state.buffering);
        } else {
            set_slot(page, el, classes, None, false);
        }
        if state.errored.iter().any(|s| s.as_str() == sound) {
            page.add_class(el, &classes.error);
        } else {
            page.remove_class(el, &classes.error);
        }
    }

    if let Some(active) = &state.active {
        if let Some(el) = controls.track_title {
            page.set_text(el, &active.title);
        }
        if let Some(el) = controls.permalink {
            page.set_attr(el, "href", active.permalink.as_deref().unwrap_or_default());
        }
    }

    if let Some(el) = controls.scrubber {
        if state.dragging {
            page.add_class(el, &classes.dragging);
        } else {
            page.remove_class(el, &classes.dragging);
        }
    }

    if matches!(
        state.status,
        PlaybackStatus::Stopped | PlaybackStatus::Finished
    ) && let Some(el) = controls.position
    {
        page.set_width_percent(el, 0.0);
    }
}

/// Time readouts and position bar.
pub fn apply_progress<P: Page + ?Sized>(page: &mut P, controls: &Controls, progress: &Progress) {
    if let Some(el) = controls.current_time {
        page.set_text(el, &format_clock(progress.position_ms));
    }
    if let Some(el) = controls.duration {
        page.set_text(el, &format_clock(progress.duration_ms.unwrap_or(0.0)));
    }
    if let Some(el) = controls.position
        && let Some(pct) = progress.percent()
    {
        page.set_width_percent(el, pct);
    }
}

/// Loading bar, from the loaded fraction of the source.
pub fn apply_loading<P: Page + ?Sized>(page: &mut P, controls: &Controls, fraction: Option<f64>) {
    if let Some(el) = controls.loading
        && let Some(f) = fraction.filter(|f| f.is_finite())
    {
        page.set_width_percent(el, (f * 100.0).clamp(0.0, 100.0));
    }
}
