use std::time::{Duration, Instant};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, error, info, warn};

use crate::achievements::{AchievementId, AchievementState};
use crate::config::{Config, Difficulty};
use crate::leaderboard::{LeaderboardQuery, RaceResult};
use crate::metrics::{self, MetricsSnapshot, WpmHistory};
use crate::passages::{fingerprint, Category, Passages};
use crate::timer::{poll_slot, Timer};
use crate::worker::{LeaderboardClient, LeaderboardCommand, LeaderboardReply};

/// Period of the live metrics recomputation.
pub const METRICS_TICK: Duration = Duration::from_millis(100);
pub const COUNTDOWN_STEP: Duration = Duration::from_secs(1);
pub const COUNTDOWN_FROM: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceState {
    Waiting,
    Countdown { remaining: u8 },
    Playing,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCue {
    Correct,
    Incorrect,
    Finish,
    Achievement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Completed,
    TimeUp,
}

/// Things the presentation layer reacts to, drained with
/// [`Session::drain_events`].
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StateChanged(RaceState),
    Sound(SoundCue),
    AchievementsUnlocked(Vec<AchievementId>),
    LeaderboardUpdated,
}

/// Settings frozen when a race starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaceSetup {
    pub category: Category,
    pub difficulty: Difficulty,
    pub time_limit: Option<Duration>,
}

impl RaceSetup {
    fn from_config(config: &Config) -> Self {
        Self {
            category: config.category,
            difficulty: config.difficulty,
            time_limit: config
                .timer_mode
                .then(|| Duration::from_secs(config.timer_duration_secs)),
        }
    }
}

#[derive(Debug, Default)]
struct RaceTimers {
    countdown: Option<Timer>,
    metrics: Option<Timer>,
    race: Option<Timer>,
}

impl RaceTimers {
    fn cancel_all(&mut self) {
        self.countdown = None;
        self.metrics = None;
        self.race = None;
    }
}

/// The single-player race: waiting -> countdown -> playing -> finished,
/// and back to waiting on reset.
///
/// All time is passed in by the caller, so the session itself never reads
/// a clock. Achievement unlocks live here across races; only
/// [`Session::reset_achievements`] clears them.
pub struct Session {
    config: Config,
    passages: Passages,
    rng: StdRng,
    client: Box<dyn LeaderboardClient>,

    player_name: String,
    state: RaceState,
    setup: Option<RaceSetup>,
    reference_text: String,
    reference: Vec<char>,
    typed: Vec<char>,
    started_at: Option<Instant>,

    snapshot: MetricsSnapshot,
    history: WpmHistory,
    current_streak: usize,
    max_streak: usize,
    achievements: AchievementState,
    timers: RaceTimers,

    leaderboard: Vec<RaceResult>,
    leaderboard_query: LeaderboardQuery,
    last_result: Option<RaceResult>,
    finish_reason: Option<FinishReason>,
    events: Vec<SessionEvent>,
}

impl Session {
    /// Builds a session in `Waiting` and requests the initial leaderboard.
    pub fn new(
        config: Config,
        passages: Passages,
        achievements: AchievementState,
        client: Box<dyn LeaderboardClient>,
    ) -> Self {
        let mut session = Self {
            config,
            passages,
            rng: StdRng::from_entropy(),
            client,
            player_name: String::new(),
            state: RaceState::Waiting,
            setup: None,
            reference_text: String::new(),
            reference: Vec::new(),
            typed: Vec::new(),
            started_at: None,
            snapshot: MetricsSnapshot::default(),
            history: WpmHistory::new(),
            current_streak: 0,
            max_streak: 0,
            achievements,
            timers: RaceTimers::default(),
            leaderboard: Vec::new(),
            leaderboard_query: LeaderboardQuery::default(),
            last_result: None,
            finish_reason: None,
            events: Vec::new(),
        };
        session.refresh_leaderboard(LeaderboardQuery::default());
        session
    }

    /// Deterministic passage selection.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn state(&self) -> RaceState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Takes effect from the next race; a race in progress keeps its setup.
    pub fn apply_config(&mut self, config: Config) {
        debug!(?config, "settings changed");
        self.config = config;
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    pub fn set_player_name(&mut self, name: &str) {
        if self.state != RaceState::Waiting {
            debug!(state = ?self.state, "player name is only editable while waiting");
            return;
        }
        self.player_name = name.to_string();
    }

    pub fn setup(&self) -> Option<&RaceSetup> {
        self.setup.as_ref()
    }

    pub fn reference_text(&self) -> &str {
        &self.reference_text
    }

    pub fn reference(&self) -> &[char] {
        &self.reference
    }

    pub fn typed(&self) -> &[char] {
        &self.typed
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    pub fn snapshot(&self) -> &MetricsSnapshot {
        &self.snapshot
    }

    pub fn history(&self) -> &WpmHistory {
        &self.history
    }

    pub fn current_streak(&self) -> usize {
        self.current_streak
    }

    pub fn max_streak(&self) -> usize {
        self.max_streak
    }

    pub fn achievements(&self) -> &AchievementState {
        &self.achievements
    }

    pub fn leaderboard(&self) -> &[RaceResult] {
        &self.leaderboard
    }

    pub fn leaderboard_query(&self) -> &LeaderboardQuery {
        &self.leaderboard_query
    }

    pub fn last_result(&self) -> Option<&RaceResult> {
        self.last_result.as_ref()
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason
    }

    /// Time left on the race clock in timer mode.
    pub fn time_remaining(&self, now: Instant) -> Option<Duration> {
        self.timers.race.as_ref().map(|t| t.remaining(now))
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        self.started_at
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or_default()
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Waiting -> countdown. Ignored unless waiting with a non-blank name.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.state != RaceState::Waiting {
            debug!(state = ?self.state, "start ignored");
            return false;
        }
        if self.player_name.trim().is_empty() {
            debug!("start ignored, player name is blank");
            return false;
        }

        let setup = RaceSetup::from_config(&self.config);
        let text = match self.passages.pick(
            setup.category,
            self.config.custom_passage.as_deref(),
            &mut self.rng,
        ) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "cannot start race");
                return false;
            }
        };

        info!(
            player = %self.player_name.trim(),
            category = %setup.category,
            difficulty = %setup.difficulty,
            timed = setup.time_limit.is_some(),
            "race starting"
        );

        self.reference = text.chars().collect();
        self.reference_text = text;
        self.setup = Some(setup);
        self.typed.clear();
        self.snapshot = MetricsSnapshot::default();
        self.history = WpmHistory::new();
        self.last_result = None;
        self.finish_reason = None;

        self.timers.cancel_all();
        self.timers.countdown = Some(Timer::repeating(now, COUNTDOWN_STEP));
        self.set_state(RaceState::Countdown {
            remaining: COUNTDOWN_FROM,
        });
        true
    }

    /// Replaces the typed buffer. Only growth (or same-length edits) is
    /// accepted; input past the passage end is cut off. Input arriving after
    /// the race clock ran out ends the race instead.
    pub fn update_input(&mut self, buffer: &str, now: Instant) {
        if self.state != RaceState::Playing {
            debug!(state = ?self.state, "input ignored");
            return;
        }
        if self.poll_deadline(now) {
            debug!("input after the time limit dropped");
            return;
        }

        let next: Vec<char> = buffer.chars().take(self.reference.len()).collect();
        if next.len() < self.typed.len() {
            debug!(
                from = self.typed.len(),
                to = next.len(),
                "ignoring input that shrinks the buffer"
            );
            return;
        }

        if next.len() > self.typed.len() {
            let idx = next.len() - 1;
            if next[idx] == self.reference[idx] {
                self.current_streak += 1;
                self.max_streak = self.max_streak.max(self.current_streak);
                self.cue(SoundCue::Correct);
            } else {
                self.current_streak = 0;
                self.cue(SoundCue::Incorrect);
            }
        }

        self.typed = next;

        if self.typed.len() == self.reference.len() {
            self.finish(now, FinishReason::Completed);
        }
    }

    /// Appends one character to the typed buffer.
    pub fn type_char(&mut self, c: char, now: Instant) {
        let mut buffer: String = self.typed.iter().collect();
        buffer.push(c);
        self.update_input(&buffer, now);
    }

    /// Drives every timer the session owns and picks up leaderboard replies.
    pub fn on_tick(&mut self, now: Instant) {
        self.poll_leaderboard();

        match self.state {
            RaceState::Countdown { .. } => self.advance_countdown(now),
            RaceState::Playing => self.advance_race(now),
            RaceState::Waiting | RaceState::Finished => {}
        }
    }

    /// Finished -> waiting. Clears the race; keeps name and achievements.
    pub fn reset(&mut self) -> bool {
        if self.state != RaceState::Finished {
            debug!(state = ?self.state, "reset ignored");
            return false;
        }

        self.timers.cancel_all();
        self.setup = None;
        self.reference_text.clear();
        self.reference.clear();
        self.typed.clear();
        self.started_at = None;
        self.snapshot = MetricsSnapshot::default();
        self.history = WpmHistory::new();
        self.current_streak = 0;
        self.max_streak = 0;
        self.last_result = None;
        self.finish_reason = None;
        self.set_state(RaceState::Waiting);
        true
    }

    /// Clears every unlocked achievement.
    pub fn reset_achievements(&mut self) {
        info!("achievements reset");
        self.achievements.reset();
    }

    /// Asks for a new leaderboard view; the reply arrives on a later tick.
    pub fn refresh_leaderboard(&mut self, query: LeaderboardQuery) {
        self.leaderboard_query = query;
        if let Err(e) = self.client.send(LeaderboardCommand::Refresh(query)) {
            error!(error = %e, "error requesting leaderboard");
        }
    }

    fn advance_countdown(&mut self, now: Instant) {
        let Some(first_due) = self.timers.countdown.as_ref().map(Timer::due) else {
            return;
        };
        let fired = poll_slot(&mut self.timers.countdown, now);
        for step in 0..fired {
            let RaceState::Countdown { remaining } = self.state else {
                break;
            };
            if remaining <= 1 {
                // the race starts when the last step was due, not when polled
                self.begin_playing(first_due + COUNTDOWN_STEP * step);
                break;
            }
            self.set_state(RaceState::Countdown {
                remaining: remaining - 1,
            });
        }
    }

    fn begin_playing(&mut self, go: Instant) {
        self.timers.cancel_all();
        self.started_at = Some(go);
        self.typed.clear();
        self.snapshot = MetricsSnapshot::default();
        self.history = WpmHistory::new();
        self.current_streak = 0;
        self.max_streak = 0;

        self.timers.metrics = Some(Timer::repeating(go, METRICS_TICK));
        if let Some(limit) = self.setup.and_then(|s| s.time_limit) {
            self.timers.race = Some(Timer::once(go, limit));
        }
        self.set_state(RaceState::Playing);
    }

    /// Finishes the race at its deadline if the clock has run out.
    fn poll_deadline(&mut self, now: Instant) -> bool {
        let Some(due) = self.timers.race.as_ref().map(Timer::due) else {
            return false;
        };
        if poll_slot(&mut self.timers.race, now) == 0 {
            return false;
        }
        self.finish(due, FinishReason::TimeUp);
        true
    }

    fn advance_race(&mut self, now: Instant) {
        if self.poll_deadline(now) {
            return;
        }
        if poll_slot(&mut self.timers.metrics, now) > 0 {
            self.recompute(now);
        }
    }

    fn recompute(&mut self, now: Instant) {
        let Some(started_at) = self.started_at else {
            return;
        };
        let (snapshot, history) = metrics::calculate(
            &self.reference,
            &self.typed,
            started_at,
            now,
            &self.history,
            self.snapshot.max_wpm,
        );
        self.snapshot = snapshot;
        self.history = history;

        let unlocked = self.achievements.evaluate(&self.snapshot);
        if !unlocked.is_empty() {
            info!(?unlocked, "achievements unlocked");
            self.events.push(SessionEvent::AchievementsUnlocked(unlocked));
            self.cue(SoundCue::Achievement);
        }
    }

    fn finish(&mut self, at: Instant, reason: FinishReason) {
        self.timers.cancel_all();
        self.recompute(at);
        self.finish_reason = Some(reason);
        self.set_state(RaceState::Finished);
        self.cue(SoundCue::Finish);

        let setup = self
            .setup
            .unwrap_or_else(|| RaceSetup::from_config(&self.config));
        let result = RaceResult {
            player_name: self.player_name.trim().to_string(),
            wpm: self.snapshot.wpm,
            accuracy: self.snapshot.accuracy,
            text_id: fingerprint(&self.reference_text),
            difficulty: setup.difficulty,
            category: setup.category,
            completed_at: Utc::now(),
        };
        info!(
            ?reason,
            wpm = result.wpm,
            accuracy = result.accuracy,
            completion = self.snapshot.completion,
            "race finished"
        );

        // a filtered view follows the race just run; the worker's
        // refresh-on-success is the only read this race issues
        if self.leaderboard_query.is_filtered() {
            self.leaderboard_query = LeaderboardQuery {
                difficulty: Some(setup.difficulty),
                category: Some(setup.category),
                ..self.leaderboard_query
            };
        }

        self.last_result = Some(result.clone());
        let command = LeaderboardCommand::Save {
            result,
            refresh: self.leaderboard_query,
        };
        if let Err(e) = self.client.send(command) {
            error!(error = %e, "error saving race result");
        }
    }

    fn poll_leaderboard(&mut self) {
        while let Some(reply) = self.client.try_recv() {
            match reply {
                LeaderboardReply::Refreshed { query, entries } => {
                    if query != self.leaderboard_query {
                        debug!(?query, "dropping stale leaderboard view");
                        continue;
                    }
                    self.leaderboard = entries;
                    self.events.push(SessionEvent::LeaderboardUpdated);
                }
            }
        }
    }

    fn set_state(&mut self, state: RaceState) {
        if self.state != state {
            debug!(from = ?self.state, to = ?state, "race state");
        }
        self.state = state;
        self.events.push(SessionEvent::StateChanged(state));
    }

    fn cue(&mut self, cue: SoundCue) {
        if self.config.sound_enabled {
            self.events.push(SessionEvent::Sound(cue));
        }
    }
}
