use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, warn};

use crate::achievements::AchievementStore;
use crate::config::{Config, ConfigStore};
use crate::leaderboard::LeaderboardQuery;
use crate::notifications::AchievementToasts;
use crate::session::{RaceState, Session, SessionEvent, SoundCue};

pub const MAX_NAME_LEN: usize = 24;

/// Glue between terminal keys and the race session. Owns everything the
/// screen shows that the session does not: toasts, the leaderboard filter
/// toggle and persistence of settings and unlocks.
pub struct App {
    pub session: Session,
    pub toasts: AchievementToasts,
    pub filter_leaderboard: bool,
    pub should_quit: bool,
    /// Time of the last tick or key, used by the renderer.
    pub last_event: Instant,
    config_store: Box<dyn ConfigStore>,
    achievement_store: Box<dyn AchievementStore>,
    sounds: Vec<SoundCue>,
}

impl App {
    pub fn new(
        session: Session,
        config_store: Box<dyn ConfigStore>,
        achievement_store: Box<dyn AchievementStore>,
    ) -> Self {
        Self {
            session,
            toasts: AchievementToasts::new(),
            filter_leaderboard: false,
            should_quit: false,
            last_event: Instant::now(),
            config_store,
            achievement_store,
            sounds: Vec::new(),
        }
    }

    pub fn on_tick(&mut self, now: Instant) {
        self.last_event = now;
        self.session.on_tick(now);
        self.process_events(now);
        self.toasts.expire(now);
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        self.last_event = now;
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        match self.session.state() {
            RaceState::Waiting => self.on_waiting_key(key, now),
            RaceState::Countdown { .. } => {
                if key.code == KeyCode::Esc {
                    self.should_quit = true;
                }
            }
            RaceState::Playing => match key.code {
                KeyCode::Char(c) => self.session.type_char(c, now),
                KeyCode::Esc => self.should_quit = true,
                _ => {}
            },
            RaceState::Finished => match key.code {
                KeyCode::Char('r') | KeyCode::Enter => {
                    self.session.reset();
                }
                KeyCode::Char('f') | KeyCode::Tab => self.toggle_leaderboard_filter(),
                KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
                _ => {}
            },
        }
        self.process_events(now);
    }

    fn on_waiting_key(&mut self, key: KeyEvent, now: Instant) {
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Enter => {
                self.session.start(now);
            }
            KeyCode::Backspace => {
                let mut name = self.session.player_name().to_string();
                name.pop();
                self.session.set_player_name(&name);
            }
            KeyCode::Char(c) if !c.is_control() => {
                let mut name = self.session.player_name().to_string();
                if name.chars().count() < MAX_NAME_LEN {
                    name.push(c);
                    self.session.set_player_name(&name);
                }
            }
            KeyCode::Tab => self.toggle_leaderboard_filter(),
            KeyCode::F(1) => self.update_config(|cfg| {
                cfg.category = cfg.category.next(cfg.has_custom_passage());
            }),
            KeyCode::F(2) => self.update_config(|cfg| cfg.difficulty = cfg.difficulty.next()),
            KeyCode::F(3) => self.update_config(|cfg| cfg.timer_mode = !cfg.timer_mode),
            KeyCode::F(4) => self.update_config(|cfg| cfg.sound_enabled = !cfg.sound_enabled),
            KeyCode::F(5) => self.reset_achievements(),
            KeyCode::Left => self.update_config(|cfg| cfg.adjust_timer(false)),
            KeyCode::Right => self.update_config(|cfg| cfg.adjust_timer(true)),
            _ => {}
        }
    }

    /// Applies a settings change to the session and writes it to disk.
    pub fn update_config(&mut self, change: impl FnOnce(&mut Config)) {
        let mut config = self.session.config().clone();
        change(&mut config);
        if &config == self.session.config() {
            return;
        }
        if let Err(e) = self.config_store.save(&config) {
            warn!(error = %e, "error saving config");
        }
        self.session.apply_config(config);
        if self.filter_leaderboard {
            self.session.refresh_leaderboard(self.leaderboard_query());
        }
    }

    pub fn toggle_leaderboard_filter(&mut self) {
        self.filter_leaderboard = !self.filter_leaderboard;
        debug!(filtered = self.filter_leaderboard, "leaderboard filter");
        self.session.refresh_leaderboard(self.leaderboard_query());
    }

    /// Unfiltered, or filtered by the last race's settings when one just
    /// finished and by the configured settings otherwise.
    pub fn leaderboard_query(&self) -> LeaderboardQuery {
        if !self.filter_leaderboard {
            return LeaderboardQuery::default();
        }
        match self.session.last_result() {
            Some(result) => LeaderboardQuery::filtered(result.difficulty, result.category),
            None => {
                let cfg = self.session.config();
                LeaderboardQuery::filtered(cfg.difficulty, cfg.category)
            }
        }
    }

    pub fn reset_achievements(&mut self) {
        self.session.reset_achievements();
        self.toasts.clear();
        self.persist_achievements();
    }

    /// Sound cues raised since the last call.
    pub fn take_sounds(&mut self) -> Vec<SoundCue> {
        std::mem::take(&mut self.sounds)
    }

    fn process_events(&mut self, now: Instant) {
        for event in self.session.drain_events() {
            match event {
                SessionEvent::AchievementsUnlocked(ids) => {
                    self.toasts.push(&ids, now);
                    self.persist_achievements();
                }
                SessionEvent::Sound(cue) => self.sounds.push(cue),
                SessionEvent::StateChanged(RaceState::Waiting) if self.filter_leaderboard => {
                    // back to filtering by settings; a finished race already
                    // refreshed with its own settings after the save
                    self.session.refresh_leaderboard(self.leaderboard_query());
                }
                SessionEvent::StateChanged(_) | SessionEvent::LeaderboardUpdated => {}
            }
        }
    }

    fn persist_achievements(&self) {
        if let Err(e) = self.achievement_store.save(self.session.achievements()) {
            warn!(error = %e, "error saving achievements");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::achievements::{AchievementId, AchievementState, FileAchievementStore};
    use crate::config::{Difficulty, FileConfigStore};
    use crate::error::LeaderboardError;
    use crate::passages::{Category, Passages};
    use crate::worker::{LeaderboardClient, LeaderboardCommand, LeaderboardReply};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct Commands(Rc<RefCell<Vec<LeaderboardCommand>>>);

    impl LeaderboardClient for Commands {
        fn send(&self, command: LeaderboardCommand) -> Result<(), LeaderboardError> {
            self.0.borrow_mut().push(command);
            Ok(())
        }

        fn try_recv(&self) -> Option<LeaderboardReply> {
            None
        }
    }

    impl Commands {
        fn last_refresh(&self) -> Option<LeaderboardQuery> {
            self.0.borrow().iter().rev().find_map(|c| match c {
                LeaderboardCommand::Refresh(q) => Some(*q),
                LeaderboardCommand::Save { .. } => None,
            })
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app_in(dir: &TempDir, config: Config) -> (App, Commands) {
        let commands = Commands::default();
        let session = Session::new(
            config,
            Passages::load().unwrap(),
            AchievementState::new(),
            Box::new(commands.clone()),
        );
        let app = App::new(
            session,
            Box::new(FileConfigStore::with_path(dir.path().join("config.json"))),
            Box::new(FileAchievementStore::with_path(
                dir.path().join("achievements.json"),
            )),
        );
        (app, commands)
    }

    fn type_str(app: &mut App, text: &str, now: Instant) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c)), now);
        }
    }

    #[test]
    fn name_entry_and_start() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _) = app_in(&dir, Config::default());
        let now = Instant::now();

        app.handle_key(key(KeyCode::Enter), now);
        assert_eq!(app.session.state(), RaceState::Waiting);

        type_str(&mut app, "adx", now);
        app.handle_key(key(KeyCode::Backspace), now);
        type_str(&mut app, "a", now);
        assert_eq!(app.session.player_name(), "ada");

        app.handle_key(key(KeyCode::Enter), now);
        assert_eq!(app.session.state(), RaceState::Countdown { remaining: 3 });
    }

    #[test]
    fn name_is_capped() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _) = app_in(&dir, Config::default());
        type_str(&mut app, &"n".repeat(40), Instant::now());
        assert_eq!(app.session.player_name().len(), MAX_NAME_LEN);
    }

    #[test]
    fn settings_keys_persist_config() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _) = app_in(&dir, Config::default());
        let now = Instant::now();

        app.handle_key(key(KeyCode::F(2)), now);
        app.handle_key(key(KeyCode::F(3)), now);
        app.handle_key(key(KeyCode::Right), now);

        let cfg = app.session.config().clone();
        assert_eq!(cfg.difficulty, Difficulty::Hard);
        assert!(cfg.timer_mode);
        assert_eq!(cfg.timer_duration_secs, 90);

        let saved = FileConfigStore::with_path(dir.path().join("config.json")).load();
        assert_eq!(saved, cfg);
    }

    #[test]
    fn full_race_through_keys() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            category: Category::Custom,
            custom_passage: Some("go".into()),
            ..Config::default()
        };
        let (mut app, commands) = app_in(&dir, config);
        let t0 = Instant::now();

        type_str(&mut app, "ada", t0);
        app.handle_key(key(KeyCode::Enter), t0);
        for s in 1..=3 {
            app.on_tick(t0 + Duration::from_secs(s));
        }
        assert_eq!(app.session.state(), RaceState::Playing);

        type_str(&mut app, "go", t0 + Duration::from_secs(4));
        assert_eq!(app.session.state(), RaceState::Finished);
        assert!(app
            .toasts
            .active()
            .any(|t| t.id == AchievementId::FirstRace));
        assert!(app.take_sounds().contains(&SoundCue::Finish));

        let saves = commands
            .0
            .borrow()
            .iter()
            .filter(|c| matches!(c, LeaderboardCommand::Save { .. }))
            .count();
        assert_eq!(saves, 1);

        let stored = FileAchievementStore::with_path(dir.path().join("achievements.json")).load();
        assert!(stored.is_unlocked(AchievementId::FirstRace));

        app.handle_key(key(KeyCode::Char('r')), t0 + Duration::from_secs(5));
        assert_eq!(app.session.state(), RaceState::Waiting);
        assert_eq!(app.session.player_name(), "ada");
    }

    #[test]
    fn typing_during_race_does_not_touch_name() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            category: Category::Custom,
            custom_passage: Some("hello".into()),
            ..Config::default()
        };
        let (mut app, _) = app_in(&dir, config);
        let t0 = Instant::now();
        type_str(&mut app, "bo", t0);
        app.handle_key(key(KeyCode::Enter), t0);
        app.on_tick(t0 + Duration::from_secs(3));
        app.on_tick(t0 + Duration::from_secs(3));

        type_str(&mut app, "he", t0 + Duration::from_secs(4));
        assert_eq!(app.session.player_name(), "bo");
        assert_eq!(app.session.typed(), &['h', 'e']);
    }

    #[test]
    fn filter_toggle_refreshes_with_settings() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, commands) = app_in(&dir, Config::default());

        app.handle_key(key(KeyCode::Tab), Instant::now());
        assert_eq!(
            commands.last_refresh(),
            Some(LeaderboardQuery::filtered(
                Difficulty::Medium,
                Category::General
            ))
        );

        app.handle_key(key(KeyCode::F(2)), Instant::now());
        assert_eq!(
            commands.last_refresh(),
            Some(LeaderboardQuery::filtered(Difficulty::Hard, Category::General))
        );

        app.handle_key(key(KeyCode::Tab), Instant::now());
        assert_eq!(commands.last_refresh(), Some(LeaderboardQuery::default()));
    }

    #[test]
    fn filtered_race_reads_the_leaderboard_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            category: Category::Custom,
            custom_passage: Some("go".into()),
            ..Config::default()
        };
        let (mut app, commands) = app_in(&dir, config);
        let t0 = Instant::now();

        app.handle_key(key(KeyCode::Tab), t0);
        type_str(&mut app, "ada", t0);
        app.handle_key(key(KeyCode::Enter), t0);
        app.on_tick(t0 + Duration::from_secs(3));
        commands.0.borrow_mut().clear();

        type_str(&mut app, "go", t0 + Duration::from_secs(4));
        assert_eq!(app.session.state(), RaceState::Finished);
        {
            let sent = commands.0.borrow();
            assert_eq!(sent.len(), 1);
            assert!(matches!(
                &sent[0],
                LeaderboardCommand::Save { refresh, .. }
                    if *refresh == LeaderboardQuery::filtered(Difficulty::Medium, Category::Custom)
            ));
        }

        app.handle_key(key(KeyCode::Char('r')), t0 + Duration::from_secs(5));
        assert_eq!(commands.0.borrow().len(), 2);
        assert_eq!(
            commands.last_refresh(),
            Some(LeaderboardQuery::filtered(Difficulty::Medium, Category::Custom))
        );
    }

    #[test]
    fn ctrl_c_always_quits() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _) = app_in(&dir, Config::default());
        app.handle_key(
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
            Instant::now(),
        );
        assert!(app.should_quit);
        assert!(app.session.player_name().is_empty());
    }
}
