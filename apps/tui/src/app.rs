//! Core TUI application state and event loop.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{info, warn};

use pdfqa_core::{LiveCollaborators, OrchestratorSettings, ProgressReporter, QueryOrchestrator};
use pdfqa_shared::{AppConfig, Answer, PdfQaError, SessionInput};

use crate::screens::AskScreen;
use crate::widgets::status_bar;

/// Messages from the background submission task to the UI thread.
pub(crate) enum WorkerEvent {
    Phase(String),
    Delta(String),
    Finished(Result<Answer, PdfQaError>),
}

/// Forwards orchestrator phases to the UI.
struct ChannelProgress(UnboundedSender<WorkerEvent>);

impl ProgressReporter for ChannelProgress {
    fn phase(&self, name: &str) {
        let _ = self.0.send(WorkerEvent::Phase(name.to_string()));
    }
}

/// Application state.
pub(crate) struct App {
    pub screen: AskScreen,
    pub should_quit: bool,
    pub show_help: bool,
    /// Spinner animation counter, advanced once per frame.
    pub tick: usize,
    orchestrator: Arc<QueryOrchestrator<LiveCollaborators>>,
    runtime: Handle,
    tx: UnboundedSender<WorkerEvent>,
    rx: UnboundedReceiver<WorkerEvent>,
}

impl App {
    pub(crate) fn new(config: AppConfig, runtime: Handle) -> Self {
        let (tx, rx) = unbounded_channel();

        let delta_tx = tx.clone();
        let collaborators = LiveCollaborators::new(config.clone()).with_delta_sink(Arc::new(
            move |delta: &str| {
                let _ = delta_tx.send(WorkerEvent::Delta(delta.to_string()));
            },
        ));
        let mut settings = OrchestratorSettings::from(&config);
        settings.stream = true;

        Self {
            screen: AskScreen::new(&config.defaults.pdf_url),
            should_quit: false,
            show_help: false,
            tick: 0,
            orchestrator: Arc::new(QueryOrchestrator::new(collaborators, settings)),
            runtime,
            tx,
            rx,
        }
    }

    /// Run a submission on the runtime; the result comes back over the channel.
    fn spawn_submission(&self, input: SessionInput) {
        info!(source = %input.document_source, "submitting question");
        let orchestrator = Arc::clone(&self.orchestrator);
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let progress = ChannelProgress(tx.clone());
            let result = orchestrator.handle_submission_with(input, &progress).await;
            if let Err(e) = &result {
                warn!(error = %e, "submission failed");
            }
            let _ = tx.send(WorkerEvent::Finished(result));
        });
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            match event {
                WorkerEvent::Phase(name) => self.screen.on_phase(&name),
                WorkerEvent::Delta(text) => self.screen.on_delta(&text),
                WorkerEvent::Finished(result) => self.screen.on_finished(result),
            }
        }
    }

    fn status(&self) -> String {
        match self.screen.session() {
            Some(session) => format!("Session {session} · ? for help"),
            None => "New conversation · ? for help".to_string(),
        }
    }
}

/// Entry point: sets up terminal, runs event loop, restores terminal.
pub(crate) fn run(config: AppConfig, runtime: Handle) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, App::new(config, runtime));

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, mut app: App) -> Result<()> {
    loop {
        app.drain_events();
        terminal.draw(|f| draw(f, &app))?;

        // 100ms poll keeps the spinner moving while a submission runs
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                handle_key(&mut app, key.code, key.modifiers);
            }
        }
        app.tick = app.tick.wrapping_add(1);

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn handle_key(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    match code {
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
            return;
        }
        KeyCode::Char('q') if !app.screen.is_editing() => {
            app.should_quit = true;
            return;
        }
        KeyCode::Char('?') if !app.screen.is_editing() => {
            app.show_help = !app.show_help;
            return;
        }
        _ => {}
    }

    if app.show_help {
        app.show_help = false;
        return;
    }

    if let Some(input) = app.screen.handle_key(code, modifiers) {
        app.spawn_submission(input);
    }
}

fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(1),    // Form + answer
            Constraint::Length(1), // Status bar
        ])
        .split(f.area());

    let title = Paragraph::new(Line::from(vec![
        Span::styled("Chat with PDF", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw("  ask questions about any PDF document"),
    ]))
    .block(Block::default().borders(Borders::ALL).title(" pdfqa "));
    f.render_widget(title, chunks[0]);

    app.screen.draw(f, chunks[1], app.tick);

    let status = app.status();
    f.render_widget(status_bar(&status), chunks[2]);

    if app.show_help {
        draw_help_overlay(f);
    }
}

fn draw_help_overlay(f: &mut Frame) {
    let area = centered_rect(60, 60, f.area());

    let help_text = vec![
        Line::from("Keybindings").style(Style::default().add_modifier(Modifier::BOLD)),
        Line::from(""),
        Line::from("  Tab/S-Tab    Next/previous field"),
        Line::from("  Enter        Edit field / press Submit"),
        Line::from("  Esc          Stop editing"),
        Line::from("  Ctrl-S       Submit the form"),
        Line::from("  Ctrl-N       Start a new conversation"),
        Line::from("  PgUp/PgDn    Scroll the answer"),
        Line::from("  ?            Toggle this help"),
        Line::from("  q / Ctrl-C   Quit"),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Help (press any key to close) ")
                .style(Style::default().bg(Color::DarkGray)),
        )
        .style(Style::default().fg(Color::White).bg(Color::DarkGray));

    f.render_widget(ratatui::widgets::Clear, area);
    f.render_widget(help, area);
}

/// Create a centered rectangle with percentage width and height.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
