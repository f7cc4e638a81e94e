use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use mathdrill::{
    app::{App, DynStore},
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    high_score::{MemoryHighScoreStore, SqliteHighScoreStore},
    history::HistoryLog,
    question::{Difficulty, Operation},
    round::RoundSettings,
    runtime::{CrosstermEventSource, DrillEvent, FixedTicker, Runner, TICK_RATE_MS},
    session::{Phase, Session},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin, Write},
    sync::Mutex,
    time::Duration,
};
use tracing_subscriber::EnvFilter;

/// timed arithmetic drills in the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Timed arithmetic drills in the terminal: pick an operation and a times table, answer as many questions as you can before the clock runs out, and chase your high score."
)]
pub struct Cli {
    /// length of a normal round in seconds
    #[clap(short = 's', long = "secs")]
    round_secs: Option<u32>,

    /// per-question time limit in equation mode
    #[clap(long)]
    question_secs: Option<u32>,

    /// how long a wrong answer's correction stays on screen
    #[clap(long)]
    feedback_secs: Option<u32>,

    /// operation to preselect on the setup screen
    #[clap(short = 'o', long, value_enum)]
    operation: Option<Operation>,

    /// table to preselect: 0-9 or "mix"
    #[clap(short = 'd', long)]
    difficulty: Option<Difficulty>,

    /// preselect equation mode (ax + b = c)
    #[clap(short = 'e', long, conflicts_with_all = ["operation", "difficulty"])]
    equations: bool,

    /// seed the question generator for reproducible rounds
    #[clap(long)]
    seed: Option<u64>,

    /// write the resulting timer settings to the config file
    #[clap(long)]
    save_config: bool,

    /// print stored high scores and exit
    #[clap(long)]
    scores: bool,
}

impl Cli {
    /// Loaded config with command line overrides applied
    fn round_settings(&self, loaded: &Config) -> RoundSettings {
        let config = Config {
            round_secs: self.round_secs.unwrap_or(loaded.round_secs),
            question_secs: self.question_secs.unwrap_or(loaded.question_secs),
            feedback_secs: self.feedback_secs.unwrap_or(loaded.feedback_secs),
        };
        RoundSettings::from(&config)
    }

    fn preselect(&self, session: &mut Session<DynStore>) {
        if self.equations {
            session.selection.toggle_equations();
            return;
        }
        if let Some(operation) = self.operation {
            session.selection.select_operation(operation);
        }
        if let Some(difficulty) = self.difficulty {
            session.selection.select_difficulty(difficulty);
        }
    }
}

fn init_logging() {
    let path = AppDirs::log_path();
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };

    let filter = EnvFilter::try_from_env("MATHDRILL_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
}

fn open_store() -> DynStore {
    match SqliteHighScoreStore::new() {
        Ok(store) => Box::new(store),
        Err(e) => {
            tracing::warn!(error = %e, "high scores unavailable, keeping them in memory");
            Box::new(MemoryHighScoreStore::new())
        }
    }
}

fn print_scores<W: Write>(store: &SqliteHighScoreStore, out: &mut W) -> Result<(), Box<dyn Error>> {
    let scores = store.all_scores()?;
    if scores.is_empty() {
        writeln!(out, "no high scores yet")?;
    }
    for entry in scores {
        let when = entry
            .updated_at
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        writeln!(out, "{:<28} {:>4}  {when}", entry.key, entry.score)?;
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging();

    if cli.scores {
        let store = SqliteHighScoreStore::new()?;
        return print_scores(&store, &mut io::stdout());
    }

    let config_store = FileConfigStore::new();
    let settings = cli.round_settings(&config_store.load());
    if cli.save_config {
        config_store.save(&Config::from(&settings))?;
        tracing::info!(path = %config_store.path().display(), "saved config");
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let mut session = match cli.seed {
        Some(seed) => Session::seeded(open_store(), settings, seed),
        None => Session::new(open_store(), settings),
    };
    cli.preselect(&mut session);
    let tick = Duration::from_millis(TICK_RATE_MS);
    let mut app = App::new(session, Some(HistoryLog::new(AppDirs::history_path())), tick);

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app, tick);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    tick: Duration,
) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(CrosstermEventSource::new(), FixedTicker::new(tick));
    terminal.draw(|f| f.render_widget(&*app, f.area()))?;

    loop {
        let size = terminal.size().unwrap_or_default();
        match runner.step() {
            DrillEvent::Tick => {
                let animating = app.celebration.is_active;
                app.on_tick(size.width, size.height);
                if animating || app.phase() == Phase::Playing {
                    terminal.draw(|f| f.render_widget(&*app, f.area()))?;
                }
            }
            DrillEvent::Resize => {
                terminal.draw(|f| f.render_widget(&*app, f.area()))?;
            }
            DrillEvent::Key(key) => {
                if !app.handle_key(key, size.width, size.height) {
                    break;
                }
                terminal.draw(|f| f.render_widget(&*app, f.area()))?;
            }
        }
    }

    tracing::info!("bye");
    Ok(())
}
