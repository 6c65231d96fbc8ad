//! Application event loop tying the conversation to the terminal.

use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
};
use tracing::{info, warn};

use crate::clipboard;
use crate::config::Config;
use crate::controller::{ConversationController, Reply};
use crate::generate::HttpGenerator;
use crate::markup::escape_html;
use crate::session::{self, Message, SessionManager};
use crate::store::{DirStore, SessionStore};
use crate::stream::StreamPresenter;
use crate::ui::commands::{ParsedCommand, SlashCommand, get_help_text};
use crate::ui::composer::{Composer, ComposerResult};
use crate::ui::picker::{PickerResult, SessionPicker};
use crate::ui::theme::Theme;
use crate::ui::transcript::Transcript;

const IDLE_POLL: Duration = Duration::from_millis(250);
const STATUS_TTL: Duration = Duration::from_millis(2500);

/// The interactive chat application.
pub struct ChatApp {
    config: Config,
    theme: Theme,
    controller: ConversationController,
    composer: Composer,
    transcript: Transcript,
    picker: Option<SessionPicker>,
    presenter: Option<StreamPresenter>,
    /// Input accepted but not yet submitted to the generator. Processed
    /// right after the next draw so the thinking indicator is visible
    /// during the request.
    pending_send: Option<String>,
    status: Option<(String, Instant)>,
    should_quit: bool,
}

impl ChatApp {
    pub fn new(config: Config, prefill: Option<String>) -> Self {
        let store = SessionStore::new(Box::new(DirStore::new(config.state_dir())));
        let sessions = SessionManager::new(store);
        let generator = HttpGenerator::new(config.endpoint.clone(), config.api_key());
        let controller = ConversationController::new(sessions, Box::new(generator));

        let theme = Theme::by_name(&config.ui.theme);
        let mut transcript = Transcript::new();
        transcript.rebuild_from(controller.sessions().active_messages());

        let composer = Composer::new("Type your message... (/ for commands)");
        if let Some(text) = prefill {
            composer.set_text(&text);
        }

        Self {
            config,
            theme,
            controller,
            composer,
            transcript,
            picker: None,
            presenter: None,
            pending_send: None,
            status: None,
            should_quit: false,
        }
    }

    /// Run until quit, restoring the terminal on the way out.
    pub async fn run(&mut self) -> Result<()> {
        enable_raw_mode().context("Failed to enable raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;

        let result = self.event_loop(&mut terminal).await;

        disable_raw_mode().context("Failed to disable raw mode")?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)
            .context("Failed to leave alternate screen")?;
        terminal.show_cursor().context("Failed to restore cursor")?;

        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ) -> Result<()> {
        while !self.should_quit {
            self.expire_status();
            self.transcript.advance_tick();
            terminal.draw(|frame| self.draw(frame))?;

            // Submissions wait one frame so the transcript already shows
            // the user's message and the thinking indicator.
            if let Some(input) = self.pending_send.take() {
                self.send(&input).await;
                continue;
            }

            let timeout = match &self.presenter {
                Some(presenter) => presenter.delay(),
                None => IDLE_POLL,
            };
            if event::poll(timeout).context("Failed to poll terminal events")? {
                if let Event::Key(key) = event::read().context("Failed to read terminal event")? {
                    self.handle_key(key);
                }
            }

            self.advance_stream();
        }

        // Flush whatever the active conversation holds before leaving.
        self.controller.persist();
        Ok(())
    }

    fn draw(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(5),
                Constraint::Length(3),
                Constraint::Length(1),
            ])
            .split(frame.size());

        let title = session::derive_title(self.controller.sessions().active_messages());
        self.transcript
            .render(chunks[0], frame.buffer_mut(), &self.theme, &title);
        self.composer
            .render(chunks[1], frame.buffer_mut(), &self.theme, self.locked());
        self.draw_status(frame, chunks[2]);

        if let Some(picker) = &self.picker {
            picker.render(frame.size(), frame.buffer_mut(), &self.theme);
        }
    }

    fn draw_status(&self, frame: &mut Frame, area: ratatui::layout::Rect) {
        let (text, color) = match &self.status {
            Some((message, _)) => (message.clone(), self.theme.notice),
            None => (
                " Enter send \u{00b7} Shift+Enter newline \u{00b7} PgUp/PgDn scroll \u{00b7} /bye quit"
                    .to_string(),
                self.theme.text_dim,
            ),
        };
        let line = Line::from(Span::styled(text, Style::default().fg(color)));
        frame.render_widget(Paragraph::new(line), area);
    }

    /// Whether new submissions are currently ignored.
    fn locked(&self) -> bool {
        self.presenter.is_some() || self.pending_send.is_some()
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Press
            && key.modifiers.contains(KeyModifiers::CONTROL)
            && key.code == KeyCode::Char('c')
        {
            self.should_quit = true;
            return;
        }

        if self.picker.is_some() {
            self.handle_picker_key(key);
            return;
        }

        match key.code {
            KeyCode::PageUp => {
                self.transcript.scroll_up(10);
                return;
            }
            KeyCode::PageDown => {
                self.transcript.scroll_down(10);
                return;
            }
            _ => {}
        }

        match self.composer.handle_key(key, self.locked()) {
            ComposerResult::Submitted(input) => self.queue_send(input),
            ComposerResult::Command(parsed) => self.handle_command(parsed),
            ComposerResult::None => {}
        }
    }

    fn handle_picker_key(&mut self, key: KeyEvent) {
        let Some(picker) = &mut self.picker else {
            return;
        };
        match picker.handle_key(key) {
            PickerResult::Switch(id) => {
                let messages: Option<Vec<Message>> = self
                    .controller
                    .sessions_mut()
                    .switch_to(&id)
                    .map(<[Message]>::to_vec);
                if let Some(messages) = messages {
                    self.transcript.rebuild_from(&messages);
                }
                self.picker = None;
            }
            PickerResult::Delete(id) => {
                let was_active = self.controller.sessions().active_id() == id;
                self.controller.sessions_mut().delete_session(&id);
                if was_active {
                    self.transcript.clear();
                }
                let summaries = self.controller.sessions().list_sessions().collect();
                if let Some(picker) = &mut self.picker {
                    picker.set_summaries(summaries);
                }
            }
            PickerResult::Close => self.picker = None,
            PickerResult::None => {}
        }
    }

    fn queue_send(&mut self, input: String) {
        self.transcript.push_user(&input);
        self.transcript.set_thinking(true);
        self.pending_send = Some(input);
    }

    async fn send(&mut self, input: &str) {
        match self.controller.submit(input).await {
            Ok(Reply::Text(text)) => {
                self.presenter = Some(StreamPresenter::start(text, self.config.typing_delay()));
            }
            Ok(Reply::Empty) => {
                self.transcript.set_thinking(false);
                self.transcript
                    .push_notice("The model returned an empty reply. Try rephrasing.");
                self.controller.persist();
            }
            Err(err) => {
                self.transcript.set_thinking(false);
                self.transcript.push_error(err.to_string());
                self.controller.persist();
            }
        }
    }

    /// Step the reveal animation, if one is running.
    fn advance_stream(&mut self) {
        let Some(presenter) = &mut self.presenter else {
            return;
        };
        let frame = presenter.step();
        let done = presenter.is_done();
        self.transcript.set_streaming(frame);

        if done {
            let text = presenter.full_text();
            self.presenter = None;
            self.transcript.clear_streaming();
            self.transcript.push_assistant(&text);
            self.controller.commit_reply(&text);
        }
    }

    fn handle_command(&mut self, parsed: ParsedCommand) {
        match parsed.command {
            SlashCommand::New => {
                self.controller.sessions_mut().create_session();
                self.transcript.clear();
                self.set_status("Started a new conversation");
            }
            SlashCommand::Sessions => {
                let summaries = self.controller.sessions().list_sessions().collect();
                self.picker = Some(SessionPicker::new(summaries));
            }
            SlashCommand::Copy => self.copy_last_reply(),
            SlashCommand::Export => self.export_transcript(),
            SlashCommand::Theme => self.toggle_theme(),
            SlashCommand::Clear => {
                self.controller.sessions_mut().clear_all();
                self.transcript.clear();
                self.set_status("Deleted all saved conversations");
            }
            SlashCommand::Help => self.transcript.push_notice(get_help_text()),
            SlashCommand::Bye => self.should_quit = true,
        }
    }

    fn copy_last_reply(&mut self) {
        let Some(markup) = self.transcript.last_assistant_markup() else {
            self.set_status("Nothing to copy yet");
            return;
        };
        match clipboard::copy_to_clipboard(&markup.to_clipboard_text()) {
            Ok(()) => self.set_status("Reply copied to clipboard"),
            Err(err) => {
                warn!(%err, "clipboard copy failed");
                self.transcript.push_error(format!("copy failed: {err}"));
            }
        }
    }

    fn export_transcript(&mut self) {
        let messages = self.controller.sessions().active_messages();
        if messages.is_empty() {
            self.set_status("Nothing to export yet");
            return;
        }
        let title = session::derive_title(messages);
        let html = export_html(&title, messages);
        let path = self
            .config
            .data_dir
            .join(format!("transcript-{}.html", Local::now().format("%Y%m%d-%H%M%S")));
        match std::fs::write(&path, html) {
            Ok(()) => {
                info!(path = %path.display(), "transcript exported");
                self.set_status(format!("Exported to {}", path.display()));
            }
            Err(err) => self.transcript.push_error(format!("export failed: {err}")),
        }
    }

    fn toggle_theme(&mut self) {
        let next = Theme::toggled_name(&self.config.ui.theme);
        self.config.ui.theme = next.to_string();
        self.theme = Theme::by_name(next);
        if let Err(err) = self.config.save() {
            warn!(%err, "failed to save theme preference");
        }
        self.set_status(format!("Theme: {next}"));
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some((message.into(), Instant::now()));
    }

    fn expire_status(&mut self) {
        if let Some((_, since)) = &self.status {
            if since.elapsed() > STATUS_TTL {
                self.status = None;
            }
        }
    }
}

/// Self-contained HTML document for one conversation.
fn export_html(title: &str, messages: &[Message]) -> String {
    let mut body = String::new();
    for message in messages {
        if message.is_user {
            body.push_str("<div class=\"message user\"><p>");
            body.push_str(&escape_html(&message.content).replace('\n', "<br>"));
            body.push_str("</p></div>\n");
        } else {
            body.push_str("<div class=\"message assistant\">");
            body.push_str(&crate::markup::render(&message.content).to_html());
            body.push_str("</div>\n");
        }
    }

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
         <style>\n\
         body {{ font-family: sans-serif; max-width: 48rem; margin: 2rem auto; }}\n\
         .user {{ background: #e8f0fe; border-radius: 8px; padding: 0.5rem 1rem; }}\n\
         .assistant {{ padding: 0.5rem 1rem; }}\n\
         pre {{ background: #f4f4f4; padding: 0.75rem; overflow-x: auto; }}\n\
         </style>\n</head>\n<body>\n<h1>{heading}</h1>\n{body}</body>\n</html>\n",
        title = escape_html(title),
        heading = escape_html(title),
        body = body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_escapes_user_text_and_renders_assistant_markup() {
        let messages = vec![
            Message::user("is <b> safe?"),
            Message::assistant("Use **escaping**:\n- always"),
        ];
        let html = export_html("is <b> safe?", &messages);

        assert!(html.contains("is &lt;b&gt; safe?"));
        assert!(!html.contains("<b> safe"));
        assert!(html.contains("<strong>escaping</strong>"));
        assert!(html.contains("<ul><li>always</li></ul>"));
    }

    #[test]
    fn export_preserves_user_line_breaks() {
        let messages = vec![Message::user("line one\nline two")];
        let html = export_html("line one", &messages);
        assert!(html.contains("line one<br>line two"));
    }
}
