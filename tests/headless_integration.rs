use std::path::Path;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use typerace::achievements::{AchievementId, AchievementState, AchievementStore, FileAchievementStore};
use typerace::app::App;
use typerace::config::{Config, FileConfigStore};
use typerace::leaderboard::{LeaderboardQuery, LeaderboardStore, SqliteLeaderboard};
use typerace::passages::{Category, Passages};
use typerace::runtime::{RaceEvent, Runner};
use typerace::session::{FinishReason, RaceState, Session};
use typerace::worker::LeaderboardWorker;

fn custom(text: &str) -> Config {
    Config {
        category: Category::Custom,
        custom_passage: Some(text.to_string()),
        ..Config::default()
    }
}

fn session_on_disk(config: Config, db: &Path) -> Session {
    let db = db.to_path_buf();
    let worker = LeaderboardWorker::spawn_with(move || SqliteLeaderboard::open(db));
    Session::new(
        config,
        Passages::load().unwrap(),
        AchievementState::new(),
        Box::new(worker),
    )
}

fn app_on_disk(config: Config, dir: &Path) -> App {
    let session = session_on_disk(config, &dir.join("leaderboard.db"));
    App::new(
        session,
        Box::new(FileConfigStore::with_path(dir.join("config.json"))),
        Box::new(FileAchievementStore::with_path(dir.join("achievements.json"))),
    )
}

fn key(c: char) -> RaceEvent {
    RaceEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
}

fn enter() -> RaceEvent {
    RaceEvent::Key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE))
}

/// Feeds every queued event to the app at `now`, stopping at the first
/// idle tick.
fn drain(runner: &Runner<mpsc::Receiver<RaceEvent>>, app: &mut App, now: Instant) {
    loop {
        match runner.step() {
            RaceEvent::Key(k) => app.handle_key(k, now),
            RaceEvent::Resize => {}
            RaceEvent::Tick => {
                app.on_tick(now);
                return;
            }
        }
    }
}

fn stored(db: &Path) -> SqliteLeaderboard {
    SqliteLeaderboard::open(db).unwrap()
}

// A whole race through the runtime: name entry, countdown, typing, and the
// result landing in sqlite.
#[test]
fn headless_race_completes_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = app_on_disk(custom("cat"), dir.path());

    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(rx).with_tick(Duration::from_millis(5));

    let t0 = Instant::now();
    for c in "ada".chars() {
        tx.send(key(c)).unwrap();
    }
    tx.send(enter()).unwrap();
    drain(&runner, &mut app, t0);
    assert_eq!(app.session.state(), RaceState::Countdown { remaining: 3 });

    // 100ms virtual ticks through the countdown
    let mut now = t0;
    while app.session.state() != RaceState::Playing {
        now += Duration::from_millis(100);
        drain(&runner, &mut app, now);
        assert!(now < t0 + Duration::from_secs(5), "countdown never ended");
    }
    let go = app.session.started_at().unwrap();
    assert_eq!(go, t0 + Duration::from_secs(3));

    for c in "cat".chars() {
        tx.send(key(c)).unwrap();
    }
    drain(&runner, &mut app, go + Duration::from_secs(30));

    assert_eq!(app.session.state(), RaceState::Finished);
    let snapshot = *app.session.snapshot();
    assert_eq!(snapshot.completion, 100.0);
    assert_eq!(snapshot.accuracy, 100);
    // 3 chars = 0.6 words over half a minute
    assert_eq!(snapshot.wpm, 1);

    // dropping the app joins the worker after it drains its queue
    drop(app);

    let db = stored(&dir.path().join("leaderboard.db"));
    assert_eq!(db.count().unwrap(), 1);
    let top = db.query_top_results(&LeaderboardQuery::default()).unwrap();
    assert_eq!(top[0].player_name, "ada");
    assert_eq!(top[0].wpm, 1);
    assert_eq!(top[0].category, Category::Custom);
    assert_eq!(top[0].text_id, "cat");

    let unlocked = FileAchievementStore::with_path(dir.path().join("achievements.json")).load();
    assert!(unlocked.is_unlocked(AchievementId::FirstRace));
}

#[test]
fn timed_race_ends_at_the_deadline() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("leaderboard.db");
    let passage = "the cat sat on the mat while the dog slept by door";
    assert_eq!(passage.chars().count(), 50);

    let mut session = session_on_disk(
        Config {
            timer_mode: true,
            timer_duration_secs: 30,
            ..custom(passage)
        },
        &db,
    );
    session.set_player_name("tim");
    let t0 = Instant::now();
    assert!(session.start(t0));
    for s in 1..=3 {
        session.on_tick(t0 + Duration::from_secs(s));
    }
    let go = session.started_at().unwrap();

    session.update_input(&passage[..10], go + Duration::from_secs(8));
    let mut now = go;
    while session.state() == RaceState::Playing {
        now += Duration::from_millis(100);
        session.on_tick(now);
        assert!(now < go + Duration::from_secs(40), "race timer never fired");
    }

    assert_eq!(session.finish_reason(), Some(FinishReason::TimeUp));
    assert_eq!(session.snapshot().completion, 20.0);
    assert_eq!(session.snapshot().wpm, 4);
    assert!(session.history().len() <= 10);
    drop(session);

    let db = stored(&db);
    assert_eq!(db.count().unwrap(), 1);
    let top = db.query_top_results(&LeaderboardQuery::default()).unwrap();
    assert_eq!(top[0].wpm, 4);
    assert_eq!(top[0].accuracy, 100);
}

#[test]
fn achievements_survive_reset_and_restart() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = app_on_disk(custom("ok"), dir.path());
    let t0 = Instant::now();

    app.session.set_player_name("kim");
    app.session.start(t0);
    for s in 1..=3 {
        app.on_tick(t0 + Duration::from_secs(s));
    }
    let go = app.session.started_at().unwrap();
    app.handle_key(KeyEvent::new(KeyCode::Char('o'), KeyModifiers::NONE), go);
    app.handle_key(
        KeyEvent::new(KeyCode::Char('k'), KeyModifiers::NONE),
        go + Duration::from_secs(1),
    );
    assert_eq!(app.session.state(), RaceState::Finished);

    app.handle_key(
        KeyEvent::new(KeyCode::Char('r'), KeyModifiers::NONE),
        go + Duration::from_secs(2),
    );
    assert_eq!(app.session.state(), RaceState::Waiting);
    assert!(app.session.achievements().is_unlocked(AchievementId::FirstRace));
    drop(app);

    let restored = FileAchievementStore::with_path(dir.path().join("achievements.json")).load();
    assert!(restored.is_unlocked(AchievementId::FirstRace));
}

#[test]
fn blank_name_never_leaves_waiting() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = app_on_disk(Config::default(), dir.path());
    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(rx).with_tick(Duration::from_millis(5));

    for c in "   ".chars() {
        tx.send(key(c)).unwrap();
    }
    tx.send(enter()).unwrap();
    let t0 = Instant::now();
    drain(&runner, &mut app, t0);
    drain(&runner, &mut app, t0 + Duration::from_secs(5));

    assert_eq!(app.session.state(), RaceState::Waiting);
}

// Storage trouble is logged by the worker; the race itself is unaffected.
#[test]
fn unwritable_database_does_not_block_the_race() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"x").unwrap();

    let mut session = session_on_disk(custom("go"), &blocker.join("leaderboard.db"));
    session.set_player_name("ned");
    let t0 = Instant::now();
    session.start(t0);
    for s in 1..=3 {
        session.on_tick(t0 + Duration::from_secs(s));
    }
    session.update_input("go", t0 + Duration::from_secs(4));

    assert_eq!(session.state(), RaceState::Finished);
    assert!(session.last_result().is_some());
    assert!(session.reset());
}
