use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin, Write},
    path::{Path, PathBuf},
    sync::Mutex,
    time::Instant,
};
use tracing::{info, Level};

use typerace::{
    achievements::{AchievementStore, EphemeralAchievementStore, FileAchievementStore},
    app::{App, MAX_NAME_LEN},
    app_dirs::AppDirs,
    config::{Config, ConfigStore, Difficulty, FileConfigStore, MAX_TIMER_SECS, MIN_TIMER_SECS},
    leaderboard::SqliteLeaderboard,
    passages::{Category, Passages},
    runtime::{spawn_terminal_reader, RaceEvent, Runner},
    session::{Session, SoundCue},
    worker::LeaderboardWorker,
};

/// terminal typing race with a local leaderboard and achievements
#[derive(Parser, Debug, Clone)]
#[clap(version, about)]
pub struct Cli {
    /// player name to pre-fill
    #[clap(short = 'n', long)]
    name: Option<String>,

    /// passage category for this run
    #[clap(short = 'c', long, value_enum)]
    category: Option<Category>,

    /// difficulty recorded with results
    #[clap(short = 'd', long, value_enum)]
    difficulty: Option<Difficulty>,

    /// race against the clock for this many seconds (30-300)
    #[clap(short = 't', long)]
    timer: Option<u64>,

    /// disable sound cues
    #[clap(long)]
    no_sound: bool,

    /// custom passage to type
    #[clap(short = 'p', long)]
    prompt: Option<String>,

    /// leaderboard database path
    #[clap(long)]
    db: Option<PathBuf>,

    /// log verbosity written to the state dir log file
    #[clap(long, default_value_t = Level::INFO)]
    log_level: Level,
}

impl Cli {
    /// Command line flags win over the saved settings for this run only.
    fn apply(&self, mut config: Config) -> Config {
        if let Some(category) = self.category {
            config.category = category;
        }
        if let Some(difficulty) = self.difficulty {
            config.difficulty = difficulty;
        }
        if let Some(secs) = self.timer {
            config.timer_mode = true;
            config.timer_duration_secs = secs.clamp(MIN_TIMER_SECS, MAX_TIMER_SECS);
        }
        if self.no_sound {
            config.sound_enabled = false;
        }
        if let Some(prompt) = &self.prompt {
            config.category = Category::Custom;
            config.custom_passage = Some(prompt.clone());
        }
        config
    }
}

fn init_logging(level: Level, path: Option<&Path>) {
    let Some(path) = path else {
        return;
    };
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    // the terminal belongs to the tui, so no log file means no logging
    let Ok(file) = OpenOptions::new().create(true).append(true).open(path) else {
        return;
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
}

fn build_app(cli: &Cli) -> Result<App, Box<dyn Error>> {
    let config_store = FileConfigStore::new();
    let config = cli.apply(config_store.load());

    let achievement_store: Box<dyn AchievementStore> = match AppDirs::achievements_path() {
        Some(path) => Box::new(FileAchievementStore::with_path(path)),
        None => Box::new(EphemeralAchievementStore),
    };
    let achievements = achievement_store.load();

    let db_path = cli.db.clone().or_else(AppDirs::db_path);
    let worker = LeaderboardWorker::spawn_with(move || match db_path {
        Some(path) => SqliteLeaderboard::open(path),
        None => SqliteLeaderboard::open_in_memory(),
    });

    let mut session = Session::new(config, Passages::load()?, achievements, Box::new(worker));
    if let Some(name) = &cli.name {
        let name: String = name.chars().take(MAX_NAME_LEN).collect();
        session.set_player_name(&name);
    }

    Ok(App::new(
        session,
        Box::new(config_store),
        achievement_store,
    ))
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    init_logging(cli.log_level, AppDirs::log_path().as_deref());
    info!(version = env!("CARGO_PKG_VERSION"), "typerace starting");

    let mut app = build_app(&cli)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    info!("typerace exiting");
    result
}

fn start_tui<B: Backend + Write>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(spawn_terminal_reader());

    loop {
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;

        let event = runner.step();
        let now = Instant::now();
        match event {
            RaceEvent::Key(key) => app.handle_key(key, now),
            RaceEvent::Resize | RaceEvent::Tick => {}
        }
        // keys can starve the tick, so timers are polled after every event
        app.on_tick(now);

        let audible = app
            .take_sounds()
            .into_iter()
            .any(|cue| cue != SoundCue::Correct);
        if audible {
            write!(terminal.backend_mut(), "\x07")?;
            Write::flush(terminal.backend_mut())?;
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
