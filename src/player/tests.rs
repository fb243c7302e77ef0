use std::collections::HashSet;
use std::io;
use std::sync::{Arc, Mutex};

use super::*;
use crate::config::Settings;
use crate::engine::{ReadyState, SoundEventKind, SoundId, SoundStatus};
use crate::error::Fault;
use crate::page::{
    CURRENT_INDEX_ATTR, CURRENT_SOUND_ID_ATTR, ControlKind, ElementId, INDEX_ATTR, Listener,
    MemoryPage, Page,
};
use crate::testing::{Call, FakeEngine, Fixture, ManualClock, TestPlayer, sid};

fn click(p: &mut TestPlayer, el: ElementId) -> InputOutcome {
    p.handle_input(Input::Click {
        target: el,
        button: PointerButton::Primary,
    })
}

fn calls(p: &TestPlayer) -> Vec<Call> {
    p.engine().calls.clone()
}

fn clear(p: &mut TestPlayer) {
    p.engine_mut().clear();
}

fn active(p: &TestPlayer) -> Option<String> {
    p.session().active().map(|s| s.as_str().to_string())
}

fn has(p: &TestPlayer, el: ElementId, class: &str) -> bool {
    p.page().has_class(el, class)
}

fn with_duration(ms: f64) -> SoundStatus {
    SoundStatus {
        duration_ms: Some(ms),
        duration_estimate_ms: Some(ms),
        ready_state: ReadyState::Loaded,
        ..SoundStatus::default()
    }
}

fn switch_calls(from: &str, to: &str) -> Vec<Call> {
    vec![
        Call::Stop(sid(from)),
        Call::Unload(sid(from)),
        Call::Create(sid(to)),
        Call::Play(sid(to)),
    ]
}

/// Sounds the engine was told to play and not stopped since, after every
/// command.
fn max_live_sounds(calls: &[Call]) -> usize {
    let mut live: HashSet<SoundId> = HashSet::new();
    let mut max = 0;
    for call in calls {
        match call {
            Call::Play(id) | Call::Resume(id) => {
                live.insert(id.clone());
            }
            Call::Stop(id) | Call::Unload(id) => {
                live.remove(id);
            }
            Call::Reset => live.clear(),
            _ => {}
        }
        max = max.max(live.len());
    }
    max
}

#[test]
fn init_scans_dense_indices_in_document_order() {
    let (p, _, links) = Fixture::new(&["a", "b", "c"]).start(Settings::default());

    assert_eq!(p.snapshot().len(), 3);
    for (i, &el) in links.iter().enumerate() {
        assert_eq!(p.page().attr(el, INDEX_ATTR), Some(i.to_string()));
        assert_eq!(p.snapshot().get(i).unwrap().element, el);
    }
    assert!(calls(&p).is_empty());
    assert_eq!(p.status(), PlaybackStatus::Stopped);
}

#[test]
fn next_switches_tracks_stopping_the_previous_first() {
    let (mut p, _, links) = Fixture::new(&["a", "b", "c"]).start(Settings::default());
    assert_eq!(click(&mut p, links[0]), InputOutcome::Handled);
    assert_eq!(calls(&p), vec![Call::Create(sid("a")), Call::Play(sid("a"))]);
    clear(&mut p);

    p.next();

    assert_eq!(calls(&p), switch_calls("a", "b"));
    assert_eq!(active(&p).as_deref(), Some("b"));
    assert_eq!(p.status(), PlaybackStatus::Playing);
    assert!(has(&p, links[1], "td-playing"));
    assert!(!has(&p, links[0], "td-playing"));
    assert!(has(&p, p.page().body(), "td-playing"));
}

#[test]
fn only_one_sound_is_ever_live() {
    let mut settings = Settings::default();
    settings.player.repeat_all = true;
    let (mut p, _, links) = Fixture::new(&["a", "b", "c"]).start(settings);

    click(&mut p, links[1]);
    p.next();
    p.next();
    p.previous();
    click(&mut p, links[0]);
    click(&mut p, links[0]);
    p.toggle_play_global();
    click(&mut p, links[2]);
    p.engine().emit("c", SoundEventKind::Finish);
    p.pump_events();

    assert_eq!(max_live_sounds(&calls(&p)), 1);
    assert_eq!(active(&p).as_deref(), Some("a"));
}

#[test]
fn next_at_the_end_without_repeat_stops() {
    let (mut p, _, links) = Fixture::new(&["a", "b"]).start(Settings::default());
    click(&mut p, links[1]);
    clear(&mut p);

    p.next();

    assert_eq!(calls(&p), vec![Call::Stop(sid("b"))]);
    assert_eq!(active(&p).as_deref(), Some("b"));
    assert_eq!(p.status(), PlaybackStatus::Stopped);
    assert!(!has(&p, links[1], "td-playing"));

    clear(&mut p);
    p.toggle_play_global();
    assert_eq!(calls(&p), vec![Call::Play(sid("b"))]);
    assert_eq!(p.status(), PlaybackStatus::Playing);
}

#[test]
fn next_at_the_end_with_repeat_wraps_to_first() {
    let mut settings = Settings::default();
    settings.player.repeat_all = true;
    let (mut p, _, links) = Fixture::new(&["a", "b"]).start(settings);
    click(&mut p, links[1]);
    clear(&mut p);

    p.next();

    assert_eq!(calls(&p), switch_calls("b", "a"));
    assert_eq!(p.status(), PlaybackStatus::Playing);
}

#[test]
fn previous_at_the_start() {
    let (mut p, _, links) = Fixture::new(&["a", "b", "c"]).start(Settings::default());
    click(&mut p, links[0]);
    clear(&mut p);
    p.previous();
    assert!(calls(&p).is_empty());
    assert_eq!(active(&p).as_deref(), Some("a"));

    let mut settings = Settings::default();
    settings.player.repeat_all = true;
    let (mut p, _, links) = Fixture::new(&["a", "b", "c"]).start(settings);
    click(&mut p, links[0]);
    clear(&mut p);
    p.previous();
    assert_eq!(calls(&p), switch_calls("a", "c"));
}

#[test]
fn relative_navigation_without_active_track_starts_at_first() {
    let (mut p, _, _) = Fixture::new(&["a", "b", "c"]).start(Settings::default());
    p.previous();
    assert_eq!(active(&p).as_deref(), Some("a"));

    let (mut p, _, _) = Fixture::new(&["a", "b", "c"]).start(Settings::default());
    p.next();
    assert_eq!(active(&p).as_deref(), Some("a"));
}

#[test]
fn rescan_rebinds_active_index() {
    let (mut p, _, links) = Fixture::new(&["a", "b", "c"]).start(Settings::default());
    click(&mut p, links[1]);

    let li = p.page().parent(links[0]).unwrap();
    p.page_mut().detach(li);
    p.scan_page();

    let record = &p.registry().get(&sid("b")).unwrap().record;
    assert_eq!(record.descriptor.index, 0);
    assert!(!record.orphaned);
    clear(&mut p);

    // b is now first, so next lands on c.
    p.next();
    assert_eq!(calls(&p), switch_calls("b", "c"));
}

#[test]
fn orphaned_track_restarts_navigation_at_first() {
    let (mut p, _, links) = Fixture::new(&["a", "b", "c"]).start(Settings::default());
    click(&mut p, links[1]);

    let li = p.page().parent(links[1]).unwrap();
    p.page_mut().detach(li);
    p.scan_page();

    assert!(p.registry().get(&sid("b")).unwrap().record.orphaned);
    assert!(p.faults().any(|f| *f == Fault::Orphaned(sid("b"))));
    // Still playing; only the position is lost.
    assert_eq!(p.status(), PlaybackStatus::Playing);
    clear(&mut p);

    p.next();
    assert_eq!(calls(&p), switch_calls("b", "a"));
    assert!(!p.registry().get(&sid("a")).unwrap().record.orphaned);
}

#[test]
fn orphaned_previous_also_restarts_at_first() {
    let (mut p, _, links) = Fixture::new(&["a", "b", "c"]).start(Settings::default());
    click(&mut p, links[2]);
    let li = p.page().parent(links[2]).unwrap();
    p.page_mut().detach(li);
    p.scan_page();
    clear(&mut p);

    p.previous();
    assert_eq!(calls(&p), switch_calls("c", "a"));
}

#[test]
fn reinserted_link_reanchors_its_handle() {
    let (mut p, _, links) = Fixture::new(&["a", "b"]).start(Settings::default());
    click(&mut p, links[0]);
    let li = p.page().parent(links[0]).unwrap();
    let (list, pos) = p.page_mut().detach(li).unwrap();
    p.scan_page();
    assert!(p.registry().get(&sid("a")).unwrap().record.orphaned);

    p.page_mut().attach(list, li, pos);
    p.scan_page();
    let record = &p.registry().get(&sid("a")).unwrap().record;
    assert!(!record.orphaned);
    assert_eq!(record.descriptor.element, links[0]);
    // The handle was reused, not recreated.
    assert_eq!(p.engine().count(|c| matches!(c, Call::Create(_))), 1);
}

#[test]
fn finish_on_single_track_resolves_to_stopped() {
    let (mut p, _, links) = Fixture::new(&["a"]).start(Settings::default());
    click(&mut p, links[0]);
    clear(&mut p);

    p.engine().emit("a", SoundEventKind::Finish);
    p.pump_events();

    assert_eq!(p.status(), PlaybackStatus::Stopped);
    assert!(calls(&p).is_empty());
    assert!(!has(&p, links[0], "td-playing"));
    assert!(!has(&p, p.page().body(), "td-playing"));
}

#[test]
fn finish_advances_when_play_next() {
    let (mut p, _, links) = Fixture::new(&["a", "b"]).start(Settings::default());
    click(&mut p, links[0]);
    clear(&mut p);

    p.engine().emit("a", SoundEventKind::Finish);
    p.pump_events();

    assert_eq!(calls(&p), switch_calls("a", "b"));
    assert_eq!(p.status(), PlaybackStatus::Playing);
}

#[test]
fn finish_stops_without_play_next_or_when_orphaned() {
    let mut settings = Settings::default();
    settings.player.play_next = false;
    let (mut p, _, links) = Fixture::new(&["a", "b"]).start(settings);
    click(&mut p, links[0]);
    clear(&mut p);
    p.engine().emit("a", SoundEventKind::Finish);
    p.pump_events();
    assert!(calls(&p).is_empty());
    assert_eq!(p.status(), PlaybackStatus::Stopped);

    let (mut p, _, links) = Fixture::new(&["a", "b"]).start(Settings::default());
    click(&mut p, links[0]);
    let li = p.page().parent(links[0]).unwrap();
    p.page_mut().detach(li);
    p.scan_page();
    clear(&mut p);
    p.engine().emit("a", SoundEventKind::Finish);
    p.pump_events();
    assert!(calls(&p).is_empty());
    assert_eq!(p.status(), PlaybackStatus::Stopped);
}

#[test]
fn events_from_superseded_handles_are_dropped() {
    let (mut p, _, links) = Fixture::new(&["a", "b"]).start(Settings::default());
    click(&mut p, links[0]);
    click(&mut p, links[1]);

    p.engine().emit("a", SoundEventKind::Pause);
    p.engine().emit("a", SoundEventKind::Finish);
    p.pump_events();
    assert_eq!(p.status(), PlaybackStatus::Playing);
    assert_eq!(active(&p).as_deref(), Some("b"));

    p.engine().emit("b", SoundEventKind::Pause);
    p.pump_events();
    assert_eq!(p.status(), PlaybackStatus::Paused);
    assert!(has(&p, links[1], "td-paused"));
}

#[test]
fn events_from_an_earlier_run_of_the_same_sound_are_dropped() {
    let (mut p, _, links) = Fixture::new(&["a", "b", "c"]).start(Settings::default());
    click(&mut p, links[0]);
    p.engine().emit("a", SoundEventKind::Finish);
    click(&mut p, links[1]);
    click(&mut p, links[0]);
    clear(&mut p);

    p.pump_events();
    assert_eq!(active(&p).as_deref(), Some("a"));
    assert_eq!(p.status(), PlaybackStatus::Playing);
    assert!(calls(&p).is_empty());

    p.engine().emit("a", SoundEventKind::Pause);
    p.pump_events();
    assert_eq!(p.status(), PlaybackStatus::Paused);
}

#[test]
fn replaying_a_stopped_track_drops_its_old_events() {
    let (mut p, _, links) = Fixture::new(&["a", "b"]).start(Settings::default());
    click(&mut p, links[0]);
    p.engine().emit("a", SoundEventKind::Pause);
    p.engine().emit("a", SoundEventKind::Finish);
    p.pump_events();
    assert_eq!(active(&p).as_deref(), Some("b"));

    p.engine().emit("b", SoundEventKind::Finish);
    p.next();
    assert_eq!(p.status(), PlaybackStatus::Stopped);
    p.toggle_play_global();
    p.pump_events();
    assert_eq!(p.status(), PlaybackStatus::Playing);
    assert_eq!(active(&p).as_deref(), Some("b"));
}

#[test]
fn clicking_the_active_link_toggles_pause() {
    let (mut p, _, links) = Fixture::new(&["a", "b"]).start(Settings::default());
    click(&mut p, links[0]);
    click(&mut p, links[0]);
    assert_eq!(p.status(), PlaybackStatus::Paused);
    click(&mut p, links[0]);
    assert_eq!(p.status(), PlaybackStatus::Playing);
    assert_eq!(
        calls(&p),
        vec![
            Call::Create(sid("a")),
            Call::Play(sid("a")),
            Call::Pause(sid("a")),
            Call::Resume(sid("a")),
        ]
    );
}

#[test]
fn stopped_active_track_plays_again_on_click() {
    let (mut p, _, links) = Fixture::new(&["a"]).start(Settings::default());
    click(&mut p, links[0]);
    p.engine().emit("a", SoundEventKind::Finish);
    p.pump_events();
    clear(&mut p);

    click(&mut p, links[0]);
    assert_eq!(calls(&p), vec![Call::Play(sid("a"))]);
    assert_eq!(p.status(), PlaybackStatus::Playing);
}

#[test]
fn clicks_that_are_not_for_the_playlist_pass_through() {
    let mut fx = Fixture::new(&["a", "b"]);
    let body = fx.page.body();
    let other = fx.page.append_link(body, "about.html", "About");
    let excluded = fx.page.append_link(body, "x.mp3", "X");
    fx.page.add_class(excluded, "td-exclude");
    let list = fx.list;
    let (mut p, _, links) = fx.start(Settings::default());

    assert_eq!(click(&mut p, other), InputOutcome::PassThrough);
    assert_eq!(click(&mut p, excluded), InputOutcome::PassThrough);
    assert_eq!(click(&mut p, list), InputOutcome::PassThrough);
    assert_eq!(
        p.handle_input(Input::Click {
            target: links[0],
            button: PointerButton::Secondary,
        }),
        InputOutcome::PassThrough
    );
    assert!(calls(&p).is_empty());
}

#[test]
fn click_inside_a_link_resolves_to_the_link() {
    let mut fx = Fixture::new(&["a", "b"]);
    let span = fx.page.append(fx.links[1], "span");
    let (mut p, _, _) = fx.start(Settings::default());

    assert_eq!(click(&mut p, span), InputOutcome::Handled);
    assert_eq!(active(&p).as_deref(), Some("b"));
}

#[test]
fn links_outside_the_container_pass_through() {
    let mut page = MemoryPage::new();
    let body = page.body();
    let playlist = page.append(body, "div");
    page.add_class(playlist, "playlist");
    let inside = page.append_link(playlist, "in.mp3", "In");
    let outside = page.append_link(body, "out.mp3", "Out");

    let mut settings = Settings::default();
    settings.player.container_scope = Some("playlist".to_string());
    let mut p = Player::with_clock(page, FakeEngine::new(), settings, ManualClock::new());
    p.init();

    assert!(p.page().has_class(playlist, "td-container"));
    assert_eq!(p.snapshot().len(), 1);
    assert_eq!(click(&mut p, outside), InputOutcome::PassThrough);
    assert_eq!(click(&mut p, inside), InputOutcome::Handled);
}

#[test]
fn missing_container_gives_an_empty_playlist() {
    let mut settings = Settings::default();
    settings.player.container_scope = Some("nowhere".to_string());
    let (mut p, _, links) = Fixture::new(&["a"]).start(settings);

    assert!(p.snapshot().is_empty());
    assert!(
        p.faults()
            .any(|f| *f == Fault::MissingContainer("nowhere".to_string()))
    );
    assert_eq!(click(&mut p, links[0]), InputOutcome::PassThrough);
    p.next();
    assert!(calls(&p).is_empty());
}

#[test]
fn clicked_cue_link_joins_the_end_of_the_playlist() {
    let mut fx = Fixture::new(&["a", "b"]);
    let li = fx.page.append(fx.list, "li");
    let cue = fx.page.append_link(li, "later.mp3", "Later");
    fx.page.add_class(cue, "td-cue");
    let (mut p, _, _) = fx.start(Settings::default());
    assert_eq!(p.snapshot().len(), 2);

    assert_eq!(click(&mut p, cue), InputOutcome::Handled);
    assert_eq!(p.snapshot().len(), 3);
    assert_eq!(p.page().attr(cue, INDEX_ATTR).as_deref(), Some("2"));
    assert_eq!(active(&p).as_deref(), Some("_sound_0"));

    // Survives the next scan instead of being orphaned.
    p.scan_page();
    assert!(!p.registry().get(&sid("_sound_0")).unwrap().record.orphaned);
}

#[test]
fn global_toggle_starts_first_then_toggles() {
    let (mut p, _, _) = Fixture::new(&["a", "b"]).start(Settings::default());
    p.toggle_play_global();
    p.toggle_play_global();
    p.toggle_play_global();
    assert_eq!(
        calls(&p),
        vec![
            Call::Create(sid("a")),
            Call::Play(sid("a")),
            Call::Pause(sid("a")),
            Call::Resume(sid("a")),
        ]
    );
}

#[test]
fn play_all_restarts_when_orphaned_and_toggles_otherwise() {
    let (mut p, _, links) = Fixture::new(&["a", "b", "c"])
        .with_controls()
        .start(Settings::default());
    let play_all = p.controls().play_all.unwrap();
    let play_pause = p.controls().play_pause.unwrap();

    click(&mut p, links[1]);
    assert!(has(&p, play_all, "td-playing"));
    p.toggle_play_all();
    assert_eq!(p.status(), PlaybackStatus::Paused);
    assert!(has(&p, play_all, "td-paused"));
    p.toggle_play_all();
    assert_eq!(p.status(), PlaybackStatus::Playing);

    let li = p.page().parent(links[1]).unwrap();
    p.page_mut().detach(li);
    p.scan_page();
    assert!(has(&p, play_pause, "td-playing"));
    assert!(!has(&p, play_all, "td-playing"));
    clear(&mut p);

    p.toggle_play_all();
    assert_eq!(calls(&p), switch_calls("b", "a"));
}

#[test]
fn controls_are_bound_only_with_a_playlist() {
    let (p, _, _) = Fixture::new(&[]).with_controls().start(Settings::default());
    assert!(!p.page().is_listening(&Listener::Control(ControlKind::PlayPause)));
    assert!(p.page().is_listening(&Listener::DocumentClick));

    let (mut p, _, _) = Fixture::new(&["a"]).with_controls().start(Settings::default());
    for kind in [
        ControlKind::PlayPause,
        ControlKind::PlayAll,
        ControlKind::Next,
        ControlKind::Previous,
    ] {
        assert!(p.page().is_listening(&Listener::Control(kind)));
    }
    assert_eq!(
        p.handle_input(Input::Control(ControlKind::Next)),
        InputOutcome::Handled
    );
    assert_eq!(active(&p).as_deref(), Some("a"));
}

#[test]
fn inputs_for_unbound_listeners_pass_through() {
    let fx = Fixture::new(&["a"]);
    let link = fx.links[0];
    let mut p = Player::with_clock(fx.page, FakeEngine::new(), Settings::default(), ManualClock::new());
    assert_eq!(click(&mut p, link), InputOutcome::PassThrough);

    p.init();
    // No controls on the page, so nothing listens for them.
    assert_eq!(
        p.handle_input(Input::Control(ControlKind::PlayPause)),
        InputOutcome::PassThrough
    );
    assert_eq!(
        p.handle_input(Input::PointerMove { x: 1.0 }),
        InputOutcome::PassThrough
    );
    assert!(calls(&p).is_empty());
    assert!(
        p.faults()
            .any(|f| *f == Fault::MissingControl("td-play-pause".to_string()))
    );
}

#[test]
fn mutations_are_debounced_into_one_rescan() {
    let fx = Fixture::new(&["a", "b"]);
    let list = fx.list;
    let (mut p, clock, _) = fx.start(Settings::default());

    let li = p.page_mut().append(list, "li");
    p.page_mut().append_link(li, "c.mp3", "C");
    assert_eq!(p.handle_input(Input::Mutation), InputOutcome::PassThrough);
    clock.advance_ms(50);
    p.handle_input(Input::Mutation);
    clock.advance_ms(60);
    p.tick();
    assert_eq!(p.snapshot().len(), 2);
    assert_eq!(p.next_deadline(), Some(clock_now(&clock) + ms(40)));

    clock.advance_ms(40);
    p.tick();
    assert_eq!(p.snapshot().len(), 3);
    assert_eq!(p.next_deadline(), None);
}

#[test]
fn mutations_are_ignored_without_auto_scan() {
    let mut settings = Settings::default();
    settings.player.auto_scan = false;
    let (mut p, _, _) = Fixture::new(&["a"]).start(settings);
    p.handle_input(Input::Mutation);
    assert_eq!(p.next_deadline(), None);
}

#[test]
fn auto_play_starts_the_first_track() {
    let mut settings = Settings::default();
    settings.player.auto_play = true;
    let (p, _, links) = Fixture::new(&["a", "b"]).start(settings);
    assert_eq!(calls(&p), vec![Call::Create(sid("a")), Call::Play(sid("a"))]);
    assert!(has(&p, links[0], "td-playing"));
}

#[test]
fn load_error_tags_the_link_and_skips_after_a_delay() {
    let (mut p, clock, links) = Fixture::new(&["a", "b"]).start(Settings::default());
    click(&mut p, links[0]);
    p.engine_mut().set_status(
        "a",
        SoundStatus {
            ready_state: ReadyState::Failed,
            ..SoundStatus::default()
        },
    );
    clear(&mut p);

    p.engine().emit("a", SoundEventKind::BufferChange);
    p.pump_events();

    assert_eq!(p.status(), PlaybackStatus::Stopped);
    assert!(has(&p, links[0], "td-error"));
    assert!(p.faults().any(|f| *f == Fault::LoadFailed(sid("a"))));
    assert_eq!(p.snapshot().len(), 2);

    clock.advance_ms(249);
    p.tick();
    assert!(calls(&p).is_empty());
    clock.advance_ms(1);
    p.tick();
    assert_eq!(calls(&p), switch_calls("a", "b"));
    assert!(has(&p, links[0], "td-error"));

    click(&mut p, links[0]);
    assert!(!has(&p, links[0], "td-error"));
}

#[test]
fn error_skip_is_cancelled_when_the_user_moves_on() {
    let (mut p, clock, links) = Fixture::new(&["a", "b", "c"]).start(Settings::default());
    click(&mut p, links[0]);
    p.engine_mut().set_status(
        "a",
        SoundStatus {
            ready_state: ReadyState::Failed,
            ..SoundStatus::default()
        },
    );
    p.engine().emit("a", SoundEventKind::BufferChange);
    p.pump_events();

    click(&mut p, links[2]);
    clear(&mut p);
    clock.advance_ms(300);
    p.tick();
    assert!(calls(&p).is_empty());
    assert_eq!(active(&p).as_deref(), Some("c"));
}

#[test]
fn refused_sound_counts_as_a_load_error() {
    let (mut p, clock, links) = Fixture::new(&["a", "b"]).start(Settings::default());
    p.engine_mut().refuse.insert(sid("a"));

    assert_eq!(click(&mut p, links[0]), InputOutcome::Handled);
    assert_eq!(p.status(), PlaybackStatus::Stopped);
    assert!(has(&p, links[0], "td-error"));

    clock.advance_ms(250);
    p.tick();
    assert_eq!(active(&p).as_deref(), Some("b"));
    assert_eq!(p.status(), PlaybackStatus::Playing);
}

#[test]
fn buffering_tag_follows_the_engine() {
    let (mut p, _, links) = Fixture::new(&["a"]).start(Settings::default());
    click(&mut p, links[0]);
    p.engine_mut().set_status(
        "a",
        SoundStatus {
            is_buffering: true,
            ready_state: ReadyState::Loading,
            ..SoundStatus::default()
        },
    );
    p.engine().emit("a", SoundEventKind::BufferChange);
    p.pump_events();
    assert!(has(&p, links[0], "td-buffering"));
    assert!(has(&p, p.page().body(), "td-buffering"));

    p.engine_mut().set_status("a", with_duration(1000.0));
    p.engine().emit("a", SoundEventKind::BufferChange);
    p.pump_events();
    assert!(!has(&p, links[0], "td-buffering"));
    assert!(!has(&p, p.page().body(), "td-buffering"));
}

#[test]
fn surface_sync_is_idempotent() {
    let (mut p, _, links) = Fixture::new(&["a", "b"])
        .with_controls()
        .start(Settings::default());
    let play_pause = p.controls().play_pause.unwrap();
    click(&mut p, links[1]);

    let snapshot = |p: &TestPlayer| {
        [links[0], links[1], play_pause, p.page().body()]
            .map(|el| p.page().classes(el).to_vec())
    };
    let before = snapshot(&p);
    p.scan_page();
    p.scan_page();
    assert_eq!(snapshot(&p), before);

    p.toggle_play_global();
    assert!(has(&p, play_pause, "td-paused"));
    assert!(!has(&p, play_pause, "td-playing"));
    assert!(has(&p, p.page().body(), "td-paused"));
    assert!(has(&p, links[1], "td-paused"));
    assert_eq!(
        p.page().attr(play_pause, CURRENT_SOUND_ID_ATTR).as_deref(),
        Some("b")
    );
    assert_eq!(p.page().attr(play_pause, CURRENT_INDEX_ATTR).as_deref(), Some("1"));
    assert_eq!(
        p.registry().get(&sid("b")).unwrap().record.state_tag,
        Some(crate::surface::LinkState::Paused)
    );
}

#[test]
fn track_title_and_progress_are_projected() {
    let mut fx = Fixture::new(&["a"]).with_controls();
    let link = fx.links[0];
    fx.page.set_attr(link, crate::page::PERMALINK_ATTR, "/tracks/a");
    let (mut p, _, links) = fx.start(Settings::default());
    let controls = *p.controls();
    click(&mut p, links[0]);

    assert_eq!(p.page().text(controls.track_title.unwrap()), "a");
    assert_eq!(
        p.page().attr(controls.permalink.unwrap(), "href").as_deref(),
        Some("/tracks/a")
    );

    p.engine_mut().set_status(
        "a",
        SoundStatus {
            position_ms: 65_000.0,
            bytes_loaded: 50,
            bytes_total: Some(200),
            ..with_duration(130_000.0)
        },
    );
    p.engine().emit("a", SoundEventKind::WhilePlaying);
    p.engine().emit("a", SoundEventKind::WhileLoading);
    p.pump_events();

    assert_eq!(p.page().text(controls.current_time.unwrap()), "1:05");
    assert_eq!(p.page().text(controls.duration.unwrap()), "2:10");
    assert_eq!(p.page().width_percent(controls.position.unwrap()), Some(50.0));
    assert_eq!(p.page().width_percent(controls.loading.unwrap()), Some(25.0));

    p.engine().emit("a", SoundEventKind::Finish);
    p.pump_events();
    assert_eq!(p.page().width_percent(controls.position.unwrap()), Some(0.0));
}

#[test]
fn controls_markup_is_injected_when_enabled() {
    let mut settings = Settings::default();
    settings.player.controls_markup.enabled = true;
    let (p, _, _) = Fixture::new(&["a"]).start(settings.clone());

    let wrapper = p.page().first_by_class("td-controls-wrapper").unwrap();
    assert_eq!(p.page().children(p.page().body())[0], wrapper);
    assert!(p.controls().scrubber.is_some());
    assert!(p.page().elements_by_class("td-hide").is_empty());

    let (p, _, _) = Fixture::new(&[]).start(settings);
    assert!(p.page().first_by_class("td-controls-wrapper").is_none());
}

#[test]
fn drag_pauses_once_seeks_once_and_resumes_once() {
    let (mut p, clock, links) = Fixture::new(&["a"])
        .with_controls()
        .start(Settings::default());
    let scrubber = p.controls().scrubber.unwrap();
    click(&mut p, links[0]);
    p.engine_mut().set_status("a", with_duration(100_000.0));
    clear(&mut p);

    let down = p.handle_input(Input::PointerDown {
        target: scrubber,
        x: 50.0,
        button: PointerButton::Primary,
    });
    assert_eq!(down, InputOutcome::Handled);
    assert_eq!(calls(&p), vec![Call::Pause(sid("a"))]);
    assert!(p.session().is_dragging());
    assert!(has(&p, scrubber, "dragging"));

    for x in [60.0, 70.0, 80.0] {
        clock.advance_ms(4);
        assert_eq!(p.handle_input(Input::PointerMove { x }), InputOutcome::Handled);
    }
    assert_eq!(calls(&p), vec![Call::Pause(sid("a"))]);

    assert_eq!(p.handle_input(Input::PointerUp), InputOutcome::Handled);
    assert_eq!(
        calls(&p),
        vec![
            Call::Pause(sid("a")),
            Call::SetPosition(sid("a"), 80_000),
            Call::Resume(sid("a")),
        ]
    );
    assert_eq!(p.status(), PlaybackStatus::Playing);
    assert!(!has(&p, scrubber, "dragging"));
    assert!(!p.page().is_listening(&Listener::PointerMove));
}

#[test]
fn drag_from_user_pause_stays_paused() {
    let (mut p, clock, links) = Fixture::new(&["a"])
        .with_controls()
        .start(Settings::default());
    let scrubber = p.controls().scrubber.unwrap();
    click(&mut p, links[0]);
    click(&mut p, links[0]);
    p.engine_mut().set_status("a", with_duration(100_000.0));
    clear(&mut p);

    p.begin_drag(scrubber, 25.0);
    clock.advance_ms(30);
    p.tick();
    p.end_drag();

    assert_eq!(calls(&p), vec![Call::SetPosition(sid("a"), 25_000)]);
    assert_eq!(p.status(), PlaybackStatus::Paused);
}

#[test]
fn engine_pause_and_resume_are_ignored_mid_drag() {
    let (mut p, _, links) = Fixture::new(&["a"])
        .with_controls()
        .start(Settings::default());
    let scrubber = p.controls().scrubber.unwrap();
    click(&mut p, links[0]);
    p.engine_mut().set_status("a", with_duration(100_000.0));

    p.begin_drag(scrubber, 10.0);
    p.engine().emit("a", SoundEventKind::Pause);
    p.pump_events();
    assert_eq!(p.status(), PlaybackStatus::Playing);
    assert!(has(&p, links[0], "td-playing"));
}

#[test]
fn rescans_wait_for_the_drag_to_end() {
    let fx = Fixture::new(&["a"]).with_controls();
    let list = fx.list;
    let (mut p, _, links) = fx.start(Settings::default());
    let scrubber = p.controls().scrubber.unwrap();
    click(&mut p, links[0]);
    p.engine_mut().set_status("a", with_duration(100_000.0));

    p.begin_drag(scrubber, 10.0);
    p.page_mut().append_link(list, "b.mp3", "b");
    p.scan_page();
    assert_eq!(p.snapshot().len(), 1);

    p.end_drag();
    assert_eq!(p.snapshot().len(), 2);
}

#[test]
fn debounced_mutation_during_a_drag_rescans_on_release() {
    let fx = Fixture::new(&["a", "b", "c"]).with_controls();
    let (mut p, clock, links) = fx.start(Settings::default());
    let scrubber = p.controls().scrubber.unwrap();
    click(&mut p, links[0]);
    p.engine_mut().set_status("a", with_duration(100_000.0));

    p.begin_drag(scrubber, 10.0);
    let li = p.page().parent(links[1]).unwrap();
    p.page_mut().detach(li);
    p.handle_input(Input::Mutation);
    clock.advance_ms(150);
    p.tick();
    assert_eq!(p.snapshot().len(), 3);

    p.end_drag();
    assert_eq!(p.snapshot().len(), 2);
    assert!(p.snapshot().find_element(links[1]).is_none());

    clock.advance_ms(500);
    p.tick();
    p.next();
    assert_eq!(active(&p).as_deref(), Some("c"));
}

#[test]
fn drag_needs_the_scrubber_and_an_active_track() {
    let (mut p, _, links) = Fixture::new(&["a"])
        .with_controls()
        .start(Settings::default());
    let scrubber = p.controls().scrubber.unwrap();

    assert_eq!(p.begin_drag(scrubber, 10.0), InputOutcome::PassThrough);
    click(&mut p, links[0]);
    assert_eq!(p.begin_drag(links[0], 10.0), InputOutcome::PassThrough);
    assert_eq!(
        p.handle_input(Input::PointerDown {
            target: scrubber,
            x: 10.0,
            button: PointerButton::Secondary,
        }),
        InputOutcome::PassThrough
    );
    assert!(!p.session().is_dragging());
}

#[test]
fn unknown_duration_discards_the_seek() {
    let (mut p, clock, links) = Fixture::new(&["a"])
        .with_controls()
        .start(Settings::default());
    let scrubber = p.controls().scrubber.unwrap();
    click(&mut p, links[0]);
    clear(&mut p);

    p.begin_drag(scrubber, 40.0);
    clock.advance_ms(50);
    p.move_drag(60.0);
    p.end_drag();

    assert_eq!(
        calls(&p),
        vec![Call::Pause(sid("a")), Call::Resume(sid("a"))]
    );
    assert!(p.faults().any(|f| *f == Fault::BadGeometry));
}

#[test]
fn trailing_seek_fires_from_tick() {
    let (mut p, clock, links) = Fixture::new(&["a"])
        .with_controls()
        .start(Settings::default());
    let scrubber = p.controls().scrubber.unwrap();
    click(&mut p, links[0]);
    p.engine_mut().set_status("a", with_duration(10_000.0));
    clear(&mut p);

    p.begin_drag(scrubber, 10.0);
    clock.advance_ms(5);
    p.move_drag(20.0);
    assert_eq!(p.next_deadline(), Some(clock_now(&clock) + ms(20)));
    clock.advance_ms(20);
    p.tick();
    assert_eq!(
        calls(&p),
        vec![Call::Pause(sid("a")), Call::SetPosition(sid("a"), 2_000)]
    );
}

#[test]
fn destroy_unbinds_and_forgets_everything() {
    let (mut p, _, links) = Fixture::new(&["a", "b"]).start(Settings::default());
    click(&mut p, links[0]);
    p.record_fault(Fault::BadGeometry);

    p.destroy();

    assert_eq!(p.page().listener_count(), 0);
    for &el in &links {
        assert_eq!(p.page().attr(el, INDEX_ATTR), None);
        assert!(!p.page().has_class(el, "td-link"));
    }
    assert_eq!(calls(&p).last(), Some(&Call::Reset));
    assert!(p.snapshot().is_empty());
    assert_eq!(p.session(), &Session::default());
    assert!(p.registry().is_empty());
    assert_eq!(p.next_deadline(), None);
    assert_eq!(p.faults().count(), 0);

    p.init();
    assert_eq!(p.snapshot().len(), 2);
    click(&mut p, links[0]);
    assert_eq!(active(&p).as_deref(), Some("a"));
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn repeated_faults_are_logged_but_kept_once() {
    let (mut p, _, _) = Fixture::new(&["a"]).start(Settings::default());
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        p.record_fault(Fault::LoadFailed(sid("a")));
        p.record_fault(Fault::LoadFailed(sid("a")));
    });

    let load_failed = p
        .faults()
        .filter(|f| **f == Fault::LoadFailed(sid("a")))
        .count();
    assert_eq!(load_failed, 1);
    let logged = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
    assert_eq!(logged.matches("contained fault").count(), 2);
}

fn ms(n: u64) -> std::time::Duration {
    std::time::Duration::from_millis(n)
}

fn clock_now(clock: &ManualClock) -> std::time::Instant {
    use crate::clock::Clock;
    clock.now()
}
