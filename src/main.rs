mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use invigil::{
    app_dirs::AppDirs,
    bank::{EmbeddedBank, FileBank, QuestionBank},
    config::{Config, ConfigStore, FileConfigStore},
    exam::{ExamOutcome, ExamPlan, Question},
    runtime::{CrosstermEventSource, Event, FixedTicker, Runner},
    session::{ExamSession, Phase},
    store::{PortalDb, ResultSink},
    words::WordList,
    TICK_RATE_MS,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    time::{Duration, SystemTime},
};

/// terminal assessment portal with timed sections and a typing test
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal assessment portal that walks an applicant through timed multiple choice sections and a short typing test, then records the submission in a local database."
)]
pub struct Cli {
    /// examination id to sit with (skips the entry screen)
    examination_id: Option<String>,

    /// question paper to load instead of the built-in sample
    #[clap(short = 'q', long)]
    questions: Option<PathBuf>,

    /// seconds allowed per multiple choice section
    #[clap(long)]
    section_secs: Option<u64>,

    /// seconds allowed for the typing test
    #[clap(long)]
    typing_secs: Option<u64>,

    /// number of words in the typing reference text
    #[clap(long)]
    typing_words: Option<usize>,

    /// results database path
    #[clap(long)]
    db: Option<PathBuf>,

    /// issue a new examination id and exit
    #[clap(long, value_name = "ID")]
    register: Option<String>,

    /// print submitted results and exit
    #[clap(long)]
    results: bool,

    /// write submitted results as csv to stdout and exit
    #[clap(long)]
    export: bool,
}

impl Cli {
    /// Stored settings overlaid with whatever was given on the command line.
    fn effective_config(&self, stored: Config) -> Config {
        Config {
            section_secs: self.section_secs.unwrap_or(stored.section_secs),
            typing_secs: self.typing_secs.unwrap_or(stored.typing_secs),
            typing_words: self.typing_words.unwrap_or(stored.typing_words),
        }
    }
}

#[derive(Debug)]
pub enum Screen {
    Gate {
        input: String,
        error: Option<String>,
    },
    Exam,
}

#[derive(Debug)]
pub struct App {
    pub screen: Screen,
    pub session: Option<ExamSession>,
}

fn make_session(
    examination_id: &str,
    paper: &Result<Vec<Question>, String>,
    config: &Config,
    words: &WordList,
) -> ExamSession {
    let mut session = ExamSession::new(examination_id);
    match paper {
        Ok(questions) => match ExamPlan::build(
            questions.clone(),
            words.reference_text(config.typing_words),
            config.section_secs as f64,
            config.typing_secs as f64,
        ) {
            Ok(plan) => session.content_loaded(plan),
            Err(e) => session.content_failed(e.to_string()),
        },
        Err(message) => session.content_failed(message.clone()),
    }
    session
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let cli = Cli::parse();

    let db_path = cli
        .db
        .clone()
        .or_else(AppDirs::db_path)
        .unwrap_or_else(|| PathBuf::from("portal.db"));

    if let Some(id) = cli.register.as_deref() {
        match PortalDb::open(&db_path).and_then(|db| db.register(id)) {
            Ok(()) => println!("registered {id}"),
            Err(e) => {
                let mut cmd = Cli::command();
                cmd.error(ErrorKind::InvalidValue, e.to_string()).exit();
            }
        }
        return Ok(());
    }

    if cli.results {
        let db = PortalDb::open(&db_path)?;
        print_results(&db)?;
        return Ok(());
    }

    if cli.export {
        let db = PortalDb::open(&db_path)?;
        let count = db.export_csv(io::stdout())?;
        eprintln!("exported {count} rows");
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let config_store = FileConfigStore::new();
    let config = cli.effective_config(config_store.load());

    let bank: Box<dyn QuestionBank> = match cli.questions.as_ref() {
        Some(path) => Box::new(FileBank::new(path)),
        None => Box::new(EmbeddedBank),
    };
    let paper = bank.load().map_err(|e| e.to_string());
    let words = WordList::embedded();

    let mut db = match PortalDb::open(&db_path) {
        Ok(db) => db,
        Err(e) => {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::Io, e.to_string()).exit();
        }
    };

    let mut app = match cli.examination_id.as_deref().map(str::trim) {
        Some(id) => {
            if let Err(e) = db.verify(id) {
                let mut cmd = Cli::command();
                cmd.error(ErrorKind::InvalidValue, e.to_string()).exit();
            }
            App {
                screen: Screen::Exam,
                session: Some(make_session(id, &paper, &config, &words)),
            }
        }
        None => App {
            screen: Screen::Gate {
                input: String::new(),
                error: None,
            },
            session: None,
        },
    };

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app, &mut db, &paper, &config, &words);

    if let Err(e) = config_store.save(&config) {
        log::warn!("could not persist configuration: {e}");
    }

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result
}

fn print_results(db: &PortalDb) -> Result<(), Box<dyn Error>> {
    let rows = db.list_results()?;
    if rows.is_empty() {
        println!("no results yet.");
        return Ok(());
    }

    let now = SystemTime::now();
    for row in rows {
        println!(
            "{:<14} english {:>3}  logical {:>3}  computer {:>3}  service {:>3}  wpm {:>3}  acc {:>3}%  total {:>3}  ({})",
            row.examination_id,
            row.english,
            row.logical,
            row.computerskill,
            row.customerservice,
            row.typing_wpm,
            row.typing_accuracy,
            row.total(),
            row.submitted_ago(now),
        );
    }
    Ok(())
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    db: &mut PortalDb,
    paper: &Result<Vec<Question>, String>,
    config: &Config,
    words: &WordList,
) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    terminal.draw(|f| ui(app, f))?;

    loop {
        match runner.step() {
            Event::Tick => {
                let outcome = app
                    .session
                    .as_mut()
                    .and_then(|session| session.on_tick(SystemTime::now()));
                if let Some(outcome) = outcome {
                    if let Some(session) = app.session.as_mut() {
                        deliver(session, db, &outcome);
                    }
                }
                // countdowns repaint every tick while a sitting is live
                if app.session.is_some() {
                    terminal.draw(|f| ui(app, f))?;
                }
            }
            Event::Resize => {
                terminal.draw(|f| ui(app, f))?;
            }
            // pasted text never reaches the typing attempt
            Event::Paste(_) => {}
            Event::Key(key) => {
                if handle_key(key, app, db, paper, config, words) {
                    break;
                }
                terminal.draw(|f| ui(app, f))?;
            }
        }
    }

    Ok(())
}

/// Returns true when the applicant asked to leave.
fn handle_key(
    key: KeyEvent,
    app: &mut App,
    db: &mut PortalDb,
    paper: &Result<Vec<Question>, String>,
    config: &Config,
    words: &WordList,
) -> bool {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    match &mut app.screen {
        Screen::Gate { input, error } => match key.code {
            KeyCode::Esc => return true,
            KeyCode::Enter => {
                let id = input.trim().to_owned();
                if let Err(e) = db.verify(&id) {
                    *error = Some(e.to_string());
                } else {
                    app.session = Some(make_session(&id, paper, config, words));
                    app.screen = Screen::Exam;
                }
            }
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Char(c) => {
                input.push(c);
                *error = None;
            }
            _ => {}
        },
        Screen::Exam => {
            if key.code == KeyCode::Esc {
                return true;
            }
            let Some(session) = app.session.as_mut() else {
                return false;
            };
            if matches!(session.phase(), Phase::Completed | Phase::Error(_)) {
                return key.code == KeyCode::Enter;
            }
            let typing = session
                .current_section()
                .is_some_and(|section| section.is_typing());

            match key.code {
                KeyCode::Char('s') if typing && key.modifiers.contains(KeyModifiers::CONTROL) => {
                    if let Some(outcome) = session.finish(SystemTime::now()) {
                        deliver(session, db, &outcome);
                    }
                }
                KeyCode::Char(c) if typing => {
                    if !key.modifiers.contains(KeyModifiers::CONTROL) {
                        session.type_char(c, SystemTime::now());
                    }
                }
                KeyCode::Backspace if typing => {
                    session.type_backspace();
                }
                KeyCode::Left => {
                    session.previous_section();
                }
                KeyCode::Right if !typing => {
                    session.next_section();
                }
                KeyCode::Up if !typing => {
                    session.focus_prev_question();
                }
                KeyCode::Down if !typing => {
                    session.focus_next_question();
                }
                KeyCode::Char(c) if !typing => {
                    if let Some(digit) = c.to_digit(10) {
                        if digit >= 1 {
                            session.answer_focused((digit - 1) as usize);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    false
}

fn deliver(session: &mut ExamSession, db: &mut PortalDb, outcome: &ExamOutcome) {
    match db.submit(outcome) {
        Ok(()) => session.submission_succeeded(),
        Err(e) => {
            log::warn!("submission failed for {}: {e}", outcome.examination_id);
            session.submission_failed(e.to_string());
        }
    }
}

fn ui(app: &App, f: &mut Frame) {
    f.render_widget(app, f.area());
}
