use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api::ChatApi;
use crate::config::ChatConfig;
use crate::error::Result;
use crate::schema::{ChatRequest, CLEAR_MESSAGE};
use crate::view::{Theme, ViewState};

// -- Types --

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    pub role: Role,
    pub text: String,
}

impl ChatLine {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            role: Role::Bot,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    /// A request is in flight; the typing indicator is shown.
    AwaitingReply,
}

const WARNING: &str = "⚠️ ";

/// Hands URLs to the desktop: audio replies and the data export.
pub trait Launcher: Send + Sync + 'static {
    /// Start playing an audio URL. Errors (e.g. autoplay refused) are
    /// tolerated by the caller.
    fn play_audio(&self, url: &str) -> std::io::Result<()>;

    fn open_url(&self, url: &str) -> std::io::Result<()>;
}

/// Opens URLs with the system handler.
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn play_audio(&self, url: &str) -> std::io::Result<()> {
        open::that_detached(url)
    }

    fn open_url(&self, url: &str) -> std::io::Result<()> {
        open::that_detached(url)
    }
}

// -- Session --

/// One chat session: transcript, input box, and view state.
pub struct ChatSession {
    api: Arc<dyn ChatApi>,
    launcher: Arc<dyn Launcher>,
    options: ChatConfig,
    transcript: Vec<ChatLine>,
    state: SessionState,
    view: ViewState,
    input: String,
}

impl ChatSession {
    pub fn new(
        api: Arc<dyn ChatApi>,
        launcher: Arc<dyn Launcher>,
        options: ChatConfig,
        theme: Theme,
    ) -> Self {
        Self {
            api,
            launcher,
            options,
            transcript: Vec::new(),
            state: SessionState::Idle,
            view: ViewState::with_theme(theme),
            input: String::new(),
        }
    }

    pub fn transcript(&self) -> &[ChatLine] {
        &self.transcript
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn view(&self) -> ViewState {
        self.view
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Apply a view transition, e.g. `session.update_view(ViewState::toggle_theme)`.
    pub fn update_view(&mut self, transition: impl FnOnce(ViewState) -> ViewState) -> ViewState {
        self.view = transition(self.view);
        self.view
    }

    fn push(&mut self, line: ChatLine, added: &mut Vec<ChatLine>) {
        added.push(line.clone());
        self.transcript.push(line);
    }

    /// Send the input box contents. Returns the lines added to the transcript.
    pub async fn send_input(&mut self) -> Vec<ChatLine> {
        let text = std::mem::take(&mut self.input);
        self.send(&text).await
    }

    /// Send a chat message and render the reply.
    pub async fn send(&mut self, text: &str) -> Vec<ChatLine> {
        let text = text.trim();
        let mut added = Vec::new();
        if text.is_empty() {
            return added;
        }

        self.push(ChatLine::user(text), &mut added);
        self.input.clear();

        let request = ChatRequest {
            message: text.to_string(),
            voice_enabled: Some(self.options.voice_enabled),
            language: Some(self.options.language.clone()),
            mode: Some(self.options.mode.clone()),
        };

        self.state = SessionState::AwaitingReply;
        let result = self.api.send_chat(&request).await;
        self.state = SessionState::Idle;

        let reply = match result {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "chat request failed");
                self.push(ChatLine::bot(format!("{WARNING}Network error.")), &mut added);
                return added;
            }
        };

        if let Some(error) = reply.error {
            self.push(ChatLine::bot(format!("{WARNING}{error}")), &mut added);
            return added;
        }

        self.push(ChatLine::bot(reply.reply.unwrap_or_default()), &mut added);

        if let Some(url) = reply.audio_url.filter(|u| !u.is_empty()) {
            self.play_audio(&url);
        }
        added
    }

    /// A speech-recognition result: fill the input box and send it.
    pub async fn send_transcript(&mut self, transcript: &str) -> Vec<ChatLine> {
        self.set_input(transcript);
        self.send_input().await
    }

    fn play_audio(&self, url: &str) {
        if !self.options.play_audio {
            return;
        }
        let url = self.api.resolve_url(url);
        match self.launcher.play_audio(&url) {
            Ok(()) => debug!(url = %url, "playing reply audio"),
            Err(e) => debug!(url = %url, error = %e, "audio playback refused"),
        }
    }

    /// Reset the server-side session, then start over locally.
    pub async fn clear(&mut self) {
        self.state = SessionState::AwaitingReply;
        if let Err(e) = self.api.send_chat(&ChatRequest::bare(CLEAR_MESSAGE)).await {
            warn!(error = %e, "clear request failed");
        }
        self.reset();
        info!("chat session cleared");
    }

    /// Delete all server-side data, then start over locally.
    pub async fn delete_data(&mut self) {
        if let Err(e) = self.api.delete_data().await {
            warn!(error = %e, "delete-data request failed");
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.transcript.clear();
        self.input.clear();
        self.state = SessionState::Idle;
        self.view = self.view.reset();
    }

    /// Open the data export in the browser.
    pub fn export(&self) -> Result<()> {
        let url = self.api.export_url();
        info!(url = %url, "opening data export");
        self.launcher.open_url(&url)?;
        Ok(())
    }

    /// Add a reminder through the chat endpoint.
    pub async fn add_reminder(&mut self, text: &str) -> Vec<ChatLine> {
        let text = text.trim();
        let mut added = Vec::new();
        if text.is_empty() {
            return added;
        }

        let request = ChatRequest::bare(format!("remind me {text}"));
        let line = match self.api.send_chat(&request).await {
            Ok(reply) => ChatLine::bot(
                reply
                    .reply
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| "Reminder added.".to_string()),
            ),
            Err(e) => {
                warn!(error = %e, "add reminder failed");
                ChatLine::bot(format!("{WARNING}Could not add reminder."))
            }
        };
        self.push(line, &mut added);
        added
    }

    /// Open the dashboard and load its lines.
    pub async fn dashboard(&mut self) -> Vec<String> {
        self.view = self.view.open_dashboard();

        match self.api.dashboard().await {
            Ok(entries) if entries.is_empty() => vec!["No reminders yet".to_string()],
            Ok(entries) => entries
                .into_iter()
                .map(|e| format!("✅ {}", e.task.unwrap_or_default()))
                .collect(),
            Err(e) => {
                warn!(error = %e, "dashboard request failed");
                vec!["Failed to load reminders.".to_string()]
            }
        }
    }

    pub fn close_dashboard(&mut self) {
        self.view = self.view.close_dashboard();
    }

    /// Upload a file for analysis and render the response.
    pub async fn upload(&mut self, path: &Path) -> Vec<ChatLine> {
        let mut added = Vec::new();

        self.state = SessionState::AwaitingReply;
        let result = self.api.upload(path).await;
        self.state = SessionState::Idle;

        let response = match result {
            Ok(r) => r,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "upload failed");
                self.push(ChatLine::bot(format!("{WARNING}{e}")), &mut added);
                return added;
            }
        };

        if let Some(error) = response.error {
            self.push(ChatLine::bot(format!("{WARNING}{error}")), &mut added);
        }
        if let Some(message) = response.message {
            self.push(ChatLine::bot(message), &mut added);
        }
        if let Some(analysis) = response.analysis {
            self.push(ChatLine::bot(analysis), &mut added);
        }
        if response.ocr_text.is_some() {
            self.push(ChatLine::bot("OCR captured."), &mut added);
        }
        added
    }
}
