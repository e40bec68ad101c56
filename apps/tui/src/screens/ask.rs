//! Question form: API key, database URL, PDF URL, question, and the answer panel.

use std::time::Instant;

use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use pdfqa_shared::{Answer, IndexStatus, PdfQaError, SessionId, SessionInput};

use crate::widgets::spinner_frame;

/// Which form element is focused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    ApiKey,
    DbUrl,
    PdfUrl,
    Question,
    Submit,
}

impl Field {
    fn title(self) -> &'static str {
        match self {
            Self::ApiKey => " Groq API Key ",
            Self::DbUrl => " Database URL ",
            Self::PdfUrl => " PDF URL ",
            Self::Question => " Question ",
            Self::Submit => " Submit ",
        }
    }
}

const FIELDS: [Field; 5] = [
    Field::ApiKey,
    Field::DbUrl,
    Field::PdfUrl,
    Field::Question,
    Field::Submit,
];

/// What the answer panel is showing.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Output {
    Idle,
    Running { phase: String },
    Answer(String),
    Error(String),
}

pub(crate) struct AskScreen {
    api_key: String,
    db_url: String,
    pdf_url: String,
    question: String,
    focused: Field,
    editing: bool,
    output: Output,
    /// Text streamed so far for the running submission.
    partial: String,
    scroll: u16,
    session: Option<SessionId>,
    started: Option<Instant>,
    footer: String,
}

impl AskScreen {
    pub(crate) fn new(default_pdf_url: &str) -> Self {
        Self {
            api_key: String::new(),
            db_url: String::new(),
            pdf_url: default_pdf_url.to_string(),
            question: String::new(),
            focused: Field::ApiKey,
            editing: false,
            output: Output::Idle,
            partial: String::new(),
            scroll: 0,
            session: None,
            started: None,
            footer: String::new(),
        }
    }

    pub(crate) fn is_editing(&self) -> bool {
        self.editing
    }

    pub(crate) fn is_running(&self) -> bool {
        matches!(self.output, Output::Running { .. })
    }

    /// Current conversation, if a previous answer started one.
    pub(crate) fn session(&self) -> Option<&SessionId> {
        self.session.as_ref()
    }

    /// Handle a key; returns a submission when the user asked to send the form.
    pub(crate) fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> Option<SessionInput> {
        if code == KeyCode::Char('s') && modifiers.contains(KeyModifiers::CONTROL) {
            self.editing = false;
            return self.submit();
        }

        if self.editing {
            match code {
                KeyCode::Esc => self.editing = false,
                KeyCode::Tab | KeyCode::Enter => {
                    self.editing = false;
                    self.next_field();
                }
                KeyCode::Backspace => {
                    if let Some(field) = self.current_field_mut() {
                        field.pop();
                    }
                }
                KeyCode::Char(c) => {
                    if let Some(field) = self.current_field_mut() {
                        field.push(c);
                    }
                }
                _ => {}
            }
            return None;
        }

        match code {
            KeyCode::Enter if self.focused == Field::Submit => return self.submit(),
            KeyCode::Enter => self.editing = true,
            KeyCode::Tab | KeyCode::Down => self.next_field(),
            KeyCode::BackTab | KeyCode::Up => self.prev_field(),
            KeyCode::PageDown => self.scroll = self.scroll.saturating_add(5),
            KeyCode::PageUp => self.scroll = self.scroll.saturating_sub(5),
            KeyCode::Char('n') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.session = None;
                self.footer = "Started a new conversation".to_string();
            }
            _ => {}
        }
        None
    }

    fn submit(&mut self) -> Option<SessionInput> {
        if self.is_running() {
            return None;
        }
        let mut input = SessionInput::new(
            self.api_key.as_str(),
            self.db_url.as_str(),
            self.pdf_url.as_str(),
            self.question.as_str(),
        );
        if let Some(session) = &self.session {
            input = input.with_session(session.clone());
        }
        self.output = Output::Running {
            phase: "Submitting...".to_string(),
        };
        self.partial.clear();
        self.scroll = 0;
        self.started = Some(Instant::now());
        Some(input)
    }

    pub(crate) fn on_phase(&mut self, name: &str) {
        if self.is_running() {
            self.output = Output::Running {
                phase: name.to_string(),
            };
        }
    }

    pub(crate) fn on_delta(&mut self, text: &str) {
        if self.is_running() {
            self.partial.push_str(text);
        }
    }

    pub(crate) fn on_finished(&mut self, result: Result<Answer, PdfQaError>) {
        self.partial.clear();
        self.started = None;
        match result {
            Ok(answer) => {
                let indexed: usize = answer
                    .index
                    .iter()
                    .map(|o| match o.status {
                        IndexStatus::Indexed { chunks } => chunks,
                        IndexStatus::AlreadyIndexed => 0,
                    })
                    .sum();
                self.footer = format!(
                    "Answered in {:.1}s · {} new chunks · session {}",
                    answer.elapsed.as_secs_f64(),
                    indexed,
                    answer.session_id
                );
                self.session = Some(answer.session_id);
                self.output = Output::Answer(answer.text);
            }
            Err(e) => {
                self.footer = match e.stage() {
                    Some(stage) => format!("Failed during {stage}"),
                    None => "Failed".to_string(),
                };
                self.output = Output::Error(e.to_string());
            }
        }
    }

    pub(crate) fn draw(&self, f: &mut Frame, area: Rect, tick: usize) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3), // API key
                Constraint::Length(3), // DB URL
                Constraint::Length(3), // PDF URL
                Constraint::Length(3), // Question
                Constraint::Length(1), // Submit + hint
                Constraint::Length(1), // Spinner / footer
                Constraint::Min(3),    // Answer
            ])
            .split(area);

        for (i, field) in FIELDS[..4].iter().enumerate() {
            let text = match field {
                Field::ApiKey => mask(&self.api_key),
                _ => self.field_value(*field).to_string(),
            };
            let block = Block::default()
                .borders(Borders::ALL)
                .title(field.title())
                .border_style(self.field_style(*field));
            f.render_widget(Paragraph::new(text).block(block), chunks[i]);
        }

        let hint = if self.editing {
            "Type to edit · Esc to stop editing · Tab to next field · Ctrl-S to submit"
        } else {
            "Enter to edit · Tab to next field · Ctrl-S to submit · Ctrl-N new conversation"
        };
        let submit_style = if self.focused == Field::Submit {
            Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Cyan)
        };
        let submit_line = Line::from(vec![
            Span::styled("[ Submit ]", submit_style),
            Span::raw("  "),
            Span::styled(hint, Style::default().fg(Color::DarkGray)),
        ]);
        f.render_widget(Paragraph::new(submit_line), chunks[4]);

        let status_line = match &self.output {
            Output::Running { phase } => {
                let elapsed = self.started.map(|s| s.elapsed().as_secs()).unwrap_or(0);
                Line::from(Span::styled(
                    format!("{} {phase} ({elapsed}s)", spinner_frame(tick)),
                    Style::default().fg(Color::Yellow),
                ))
            }
            _ => Line::from(Span::styled(self.footer.as_str(), Style::default().fg(Color::DarkGray))),
        };
        f.render_widget(Paragraph::new(status_line), chunks[5]);

        let (body, style) = match &self.output {
            Output::Idle => ("Fill in the form and submit a question.", Style::default().fg(Color::DarkGray)),
            Output::Running { .. } => (self.partial.as_str(), Style::default()),
            Output::Answer(text) => (text.as_str(), Style::default()),
            Output::Error(message) => (message.as_str(), Style::default().fg(Color::Red)),
        };
        let answer = Paragraph::new(body)
            .style(style)
            .wrap(Wrap { trim: false })
            .scroll((self.scroll, 0))
            .block(Block::default().borders(Borders::ALL).title(" Answer "));
        f.render_widget(answer, chunks[6]);
    }

    fn field_style(&self, field: Field) -> Style {
        if self.focused == field && self.editing {
            Style::default().fg(Color::Yellow)
        } else if self.focused == field {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        }
    }

    fn field_value(&self, field: Field) -> &str {
        match field {
            Field::ApiKey => &self.api_key,
            Field::DbUrl => &self.db_url,
            Field::PdfUrl => &self.pdf_url,
            Field::Question => &self.question,
            Field::Submit => "",
        }
    }

    fn current_field_mut(&mut self) -> Option<&mut String> {
        match self.focused {
            Field::ApiKey => Some(&mut self.api_key),
            Field::DbUrl => Some(&mut self.db_url),
            Field::PdfUrl => Some(&mut self.pdf_url),
            Field::Question => Some(&mut self.question),
            Field::Submit => None,
        }
    }

    fn next_field(&mut self) {
        let pos = FIELDS.iter().position(|f| *f == self.focused).unwrap_or(0);
        self.focused = FIELDS[(pos + 1) % FIELDS.len()];
    }

    fn prev_field(&mut self) {
        let pos = FIELDS.iter().position(|f| *f == self.focused).unwrap_or(0);
        self.focused = FIELDS[(pos + FIELDS.len() - 1) % FIELDS.len()];
    }
}

fn mask(secret: &str) -> String {
    "•".repeat(secret.chars().count())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn press(screen: &mut AskScreen, code: KeyCode) -> Option<SessionInput> {
        screen.handle_key(code, KeyModifiers::NONE)
    }

    fn type_text(screen: &mut AskScreen, text: &str) {
        press(screen, KeyCode::Enter);
        for c in text.chars() {
            press(screen, KeyCode::Char(c));
        }
        press(screen, KeyCode::Tab);
    }

    fn ctrl(screen: &mut AskScreen, c: char) -> Option<SessionInput> {
        screen.handle_key(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn filled() -> AskScreen {
        let mut screen = AskScreen::new("https://example.com/recipes.pdf");
        type_text(&mut screen, "k1");
        type_text(&mut screen, "file:local.db");
        press(&mut screen, KeyCode::Tab);
        type_text(&mut screen, "What is step 3?");
        screen
    }

    #[test]
    fn pdf_url_is_prefilled() {
        let screen = AskScreen::new("https://example.com/recipes.pdf");
        assert_eq!(screen.field_value(Field::PdfUrl), "https://example.com/recipes.pdf");
    }

    #[test]
    fn api_key_is_masked() {
        assert_eq!(mask("gsk_123"), "•••••••");
        assert_eq!(mask(""), "");
    }

    #[test]
    fn ctrl_s_submits_all_four_fields() {
        let mut screen = filled();
        let input = ctrl(&mut screen, 's').expect("submission");
        assert_eq!(input.credential.expose(), "k1");
        assert_eq!(input.storage_address, "file:local.db");
        assert_eq!(input.document_source, "https://example.com/recipes.pdf");
        assert_eq!(input.question, "What is step 3?");
        assert!(input.session_id.is_none());
        assert!(screen.is_running());
    }

    #[test]
    fn submit_button_submits_on_enter() {
        let mut screen = filled();
        assert_eq!(screen.focused, Field::Submit);
        assert!(press(&mut screen, KeyCode::Enter).is_some());
    }

    #[test]
    fn no_second_submission_while_running() {
        let mut screen = filled();
        assert!(ctrl(&mut screen, 's').is_some());
        assert!(ctrl(&mut screen, 's').is_none());
    }

    #[test]
    fn answer_continues_the_session() {
        let mut screen = filled();
        ctrl(&mut screen, 's');
        let session = SessionId::new();
        screen.on_finished(Ok(Answer {
            text: "Add the sauce.".into(),
            session_id: session.clone(),
            index: Vec::new(),
            elapsed: Duration::from_millis(1200),
        }));
        assert_eq!(screen.output, Output::Answer("Add the sauce.".into()));

        let next = ctrl(&mut screen, 's').expect("submission");
        assert_eq!(next.session_id, Some(session));

        screen.on_finished(Err(PdfQaError::query("boom")));
        ctrl(&mut screen, 'n');
        assert!(screen.session().is_none());
    }

    #[test]
    fn errors_are_shown_inline() {
        let mut screen = AskScreen::new("");
        let input = ctrl(&mut screen, 's').expect("submission");
        let err = input.validate().unwrap_err();
        screen.on_finished(Err(err));
        match &screen.output {
            Output::Error(message) => assert!(message.contains("API key")),
            other => panic!("expected error, got {other:?}"),
        }
        assert!(!screen.is_running());
    }

    #[test]
    fn deltas_accumulate_only_while_running() {
        let mut screen = filled();
        screen.on_delta("ignored");
        assert!(screen.partial.is_empty());
        ctrl(&mut screen, 's');
        screen.on_phase("Processing your query...");
        screen.on_delta("Step 3 ");
        screen.on_delta("is...");
        assert_eq!(screen.partial, "Step 3 is...");
    }
}
