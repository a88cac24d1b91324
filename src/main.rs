mod event;
mod ui;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Alignment;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};
use tracing::info;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

use typeladder::app::{App, AppScreen, Mode};
use typeladder::config::Config;
use typeladder::content;
use typeladder::engine::challenge::{Ladder, LevelState};
use typeladder::engine::service::ProgressService;
use typeladder::engine::stats;
use typeladder::session::clock::SystemClock;
use typeladder::session::{Key, SessionStatus};
use typeladder::store::repository::ProgressRepository;
use typeladder::store::schema::ExportData;
use typeladder::store::JsonStore;

use event::{AppEvent, EventHandler};
use ui::Palette;
use ui::layout::{AppLayout, centered_rect, pack_hint_lines};
use ui::results::ResultsPanel;
use ui::typing_area::TypingArea;

type TuiApp = App<JsonStore, SystemClock>;

#[derive(Parser)]
#[command(name = "typeladder", version, about = "Terminal typing practice with a 100-level challenge ladder")]
struct Cli {
    #[arg(short, long, global = true, help = "User id (overrides the configured one)")]
    user: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Free practice on a bundled passage or your own text
    Practice {
        #[arg(short, long, help = "Time limit in seconds (0 = untimed)")]
        time: Option<u32>,
        #[arg(long, help = "Practice on this text instead of a random passage")]
        text: Option<String>,
    },
    /// Play a ladder level (defaults to the next open one)
    Challenge { level: Option<u32> },
    /// List ladder levels and their state
    Levels,
    /// Show progress statistics
    Stats {
        #[arg(long, help = "Recompute streak and best score from history first")]
        rebuild: bool,
    },
    /// Write this user's progress to a JSON file
    Export { file: PathBuf },
    /// Replace a user's progress from an exported JSON file (the user named
    /// in the file, unless --user picks another)
    Import { file: PathBuf },
}

/// Where a fresh practice passage comes from when the user asks for another.
struct PracticeSource {
    rng: SmallRng,
    time_limit: Option<u32>,
    fixed_text: Option<String>,
}

impl PracticeSource {
    fn next_text(&mut self) -> Result<String> {
        match &self.fixed_text {
            Some(text) => Ok(text.clone()),
            None => Ok(content::random_passage(&mut self.rng)?),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;
    let data_dir = config.data_dir();
    setup_logging(&data_dir, &config.log_level)?;

    let user_id = cli.user.clone().unwrap_or_else(|| config.user_id.clone());
    let store = JsonStore::with_base_dir(data_dir)?;
    let ladder = match &config.ladder_path {
        Some(path) => content::load_ladder(Path::new(path))
            .with_context(|| format!("loading ladder from {path}"))?,
        None => content::bundled_ladder()?,
    };

    match cli.command.unwrap_or(Command::Practice {
        time: None,
        text: None,
    }) {
        Command::Practice { time, text } => {
            let time_limit = match time {
                Some(secs) => (secs > 0).then_some(secs),
                None => config.time_limit(),
            };
            let mut source = PracticeSource {
                rng: SmallRng::from_entropy(),
                time_limit,
                fixed_text: text,
            };
            let mut app = App::new(ProgressService::new(store), ladder, SystemClock, &user_id);
            app.start_practice(&source.next_text()?, source.time_limit);
            run_tui(&mut app, &mut source)?;
        }
        Command::Challenge { level } => {
            let mut app = App::new(ProgressService::new(store), ladder, SystemClock, &user_id);
            let level_id = match level {
                Some(id) => id,
                None => match app.next_challenge_id()? {
                    Some(id) => id,
                    None => bail!("every level is already complete"),
                },
            };
            app.start_challenge(level_id)?;
            let mut source = PracticeSource {
                rng: SmallRng::from_entropy(),
                time_limit: config.time_limit(),
                fixed_text: None,
            };
            run_tui(&mut app, &mut source)?;
        }
        Command::Levels => print_levels(&ladder, &store, &user_id)?,
        Command::Stats { rebuild } => {
            let mut service = ProgressService::new(store);
            let progress = if rebuild {
                service.rebuild(&user_id)?
            } else {
                service.progress(&user_id)?
            };
            print_stats(&user_id, &stats::summarize(&progress), ladder.len());
        }
        Command::Export { file } => {
            let data = store.export_user(&user_id)?;
            fs::write(&file, serde_json::to_string_pretty(&data)?)?;
            println!("Exported {} to {}", user_id, file.display());
        }
        Command::Import { file } => {
            let raw = fs::read_to_string(&file)?;
            let data: ExportData = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a typeladder export", file.display()))?;
            let target = cli.user.as_deref().unwrap_or(&data.user_id);
            store.import_user(target, &data)?;
            println!("Imported progress for {target}");
        }
    }

    Ok(())
}

fn setup_logging(data_dir: &Path, level: &str) -> Result<()> {
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("typeladder")
        .filename_suffix("log")
        .build(data_dir.join("logs"))?;
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .try_init()
        .map_err(|err| anyhow::anyhow!("{err}"))?;

    info!("logging initialized");
    Ok(())
}

fn print_levels(ladder: &Ladder, store: &JsonStore, user_id: &str) -> Result<()> {
    let progress = store.load(user_id)?;
    for (level, state) in ladder.states(&progress.completed_tasks) {
        let marker = match state {
            LevelState::Completed => "done",
            LevelState::Unlocked => "open",
            LevelState::Locked => "    ",
        };
        let badge = level
            .badge
            .as_ref()
            .map(|b| format!("  [{}]", b.name))
            .unwrap_or_default();
        println!(
            "{:>3}  {marker}  {:>3} wpm  {:>3}%  {:>3} coins{badge}",
            level.level_number, level.wpm_goal, level.accuracy_goal, level.coin_reward
        );
    }
    println!(
        "{}/{} levels complete",
        ladder.completed_count(&progress.completed_tasks),
        ladder.len()
    );
    Ok(())
}

fn print_stats(user_id: &str, summary: &stats::ProgressSummary, ladder_len: usize) {
    println!("Progress for {user_id}");
    println!("  Tests taken:      {}", summary.total_tests);
    println!("  Best speed:       {} WPM", summary.best_wpm);
    println!("  Average speed:    {:.1} WPM", summary.average_wpm);
    println!("  Last 10 average:  {:.1} WPM", summary.recent_average_wpm);
    println!("  Average accuracy: {:.1}%", summary.average_accuracy);
    println!("  Streak:           {} (best {})", summary.streak, summary.best_streak);
    println!("  Coins:            {}", summary.coins);
    println!("  Levels complete:  {}/{}", summary.levels_completed, ladder_len);
}

fn run_tui(app: &mut TuiApp, source: &mut PracticeSource) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let events = EventHandler::new(Duration::from_secs(1));

    let result = run_app(&mut terminal, app, &events, source);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result?;
    if let Some(metrics) = app.last_metrics {
        println!(
            "{} WPM, {}% accuracy in {:.1}s",
            metrics.wpm, metrics.accuracy, metrics.time
        );
    }
    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut TuiApp,
    events: &EventHandler,
    source: &mut PracticeSource,
) -> Result<()> {
    let palette = Palette::default();
    loop {
        terminal.draw(|frame| render(frame, app, &palette))?;

        match events.next()? {
            AppEvent::Key(key) => handle_key(app, key, source),
            AppEvent::Tick => app.on_tick(),
            AppEvent::Resize => {}
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_key(app: &mut TuiApp, key: KeyEvent, source: &mut PracticeSource) {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return;
    }

    match app.screen {
        AppScreen::Typing => handle_typing_key(app, key),
        AppScreen::Result => handle_result_key(app, key, source),
    }
}

fn handle_typing_key(app: &mut TuiApp, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.should_quit = true,
        KeyCode::Backspace => app.type_key(Key::Backspace),
        KeyCode::Char(ch) => app.type_key(Key::Char(ch)),
        _ => {}
    }
}

fn handle_result_key(app: &mut TuiApp, key: KeyEvent, source: &mut PracticeSource) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        KeyCode::Char('r') | KeyCode::Tab => app.retry(),
        KeyCode::Enter | KeyCode::Char('n') => match app.mode {
            Mode::Practice => match source.next_text() {
                Ok(text) => app.start_practice(&text, source.time_limit),
                Err(err) => app.status_message = Some(err.to_string()),
            },
            Mode::Challenge(_) => {
                if let Err(err) = app.continue_ladder() {
                    app.status_message = Some(err.to_string());
                }
            }
        },
        _ => {}
    }
}

fn render(frame: &mut ratatui::Frame, app: &TuiApp, palette: &Palette) {
    match app.screen {
        AppScreen::Typing => render_typing(frame, app, palette),
        AppScreen::Result => render_result(frame, app, palette),
    }
}

fn render_typing(frame: &mut ratatui::Frame, app: &TuiApp, palette: &Palette) {
    let layout = AppLayout::new(frame.area());
    let snapshot = app.snapshot();

    let (title, goal) = match app.current_level() {
        Some(level) => (
            format!("Level {}", level.level_number),
            format!("  goal {} WPM / {}%", level.wpm_goal, level.accuracy_goal),
        ),
        None => ("Practice".to_string(), String::new()),
    };
    let timer = match snapshot.time_left {
        Some(left) => format!("{left}s left"),
        None => "untimed".to_string(),
    };
    let state = match snapshot.status {
        SessionStatus::Waiting => "start typing",
        SessionStatus::Started => "",
        SessionStatus::Finished => "done",
    };
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            format!(" {} WPM ", snapshot.live_wpm),
            Style::default().fg(palette.accent).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" {timer} "), Style::default().fg(palette.fg)),
        Span::styled(
            format!(" {:.0}% ", app.session.progress() * 100.0),
            Style::default().fg(palette.fg),
        ),
        Span::styled(goal, Style::default().fg(palette.pending)),
        Span::styled(format!("  {}", app.user_id()), Style::default().fg(palette.pending)),
        Span::styled(format!("  {state}"), Style::default().fg(palette.pending)),
    ]))
    .block(Block::bordered().border_style(Style::default().fg(palette.border)));
    frame.render_widget(header, layout.header);

    frame.render_widget(TypingArea::new(&app.session, palette, title), layout.main);

    let hints = pack_hint_lines(&["[Esc] Quit", "[Backspace] Fix"], layout.footer.width as usize);
    let footer = Paragraph::new(hints.into_iter().map(Line::from).collect::<Vec<_>>())
        .style(Style::default().fg(palette.pending));
    frame.render_widget(footer, layout.footer);
}

fn render_result(frame: &mut ratatui::Frame, app: &TuiApp, palette: &Palette) {
    let area = centered_rect(60, 60, frame.area());
    let panel = ResultsPanel::new(
        app.last_metrics.as_ref(),
        app.last_outcome.as_ref(),
        app.current_level(),
        app.status_message.as_deref(),
        palette,
    );
    frame.render_widget(panel, area);

    let next = match app.mode {
        Mode::Practice => "[Enter] New passage",
        Mode::Challenge(_) => "[Enter] Next level",
    };
    let hints = pack_hint_lines(&["[r] Retry", next, "[q] Quit"], area.width as usize);
    if let Some(line) = hints.first() {
        let y = area.y.saturating_add(area.height);
        if y < frame.area().height {
            let footer = Paragraph::new(line.as_str())
                .alignment(Alignment::Center)
                .style(Style::default().fg(palette.accent));
            frame.render_widget(footer, ratatui::layout::Rect::new(area.x, y, area.width, 1));
        }
    }
}
