use serde::{Deserialize, Serialize};

// -- Reminder types --

/// A due reminder as returned by `GET /reminders-due`.
///
/// The backend owns the record; the client only ever sees this projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,
    #[serde(default)]
    pub task: String,
}

impl Reminder {
    pub fn new(id: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            task: task.into(),
        }
    }

    /// Text shown to the user, derived from `task` at render time.
    pub fn display_text(&self) -> String {
        display_text(&self.task)
    }
}

/// Strip a leading "remind" / "remind me" filler phrase for display.
///
/// Falls back to the raw task when stripping leaves nothing, and to
/// `"Reminder"` when the task itself is empty.
pub fn display_text(task: &str) -> String {
    let stripped = if let Ok(re) = regex_lite::Regex::new(r"(?i)^remind( me)?") {
        re.replace(task, "").trim().to_string()
    } else {
        task.trim().to_string()
    };

    if !stripped.is_empty() {
        stripped
    } else if !task.is_empty() {
        task.to_string()
    } else {
        "Reminder".to_string()
    }
}

/// Body of `POST /reminders-ack`.
///
/// Without `snooze_minutes` the reminder is completed; with it the backend
/// re-surfaces the reminder after that many minutes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgment {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snooze_minutes: Option<u32>,
}

impl Acknowledgment {
    pub fn done(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            snooze_minutes: None,
        }
    }

    pub fn snooze(id: impl Into<String>, minutes: u32) -> Self {
        Self {
            id: id.into(),
            snooze_minutes: Some(minutes),
        }
    }
}

/// The two buttons offered on a toast or OS notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderAction {
    Snooze,
    Done,
}

impl ReminderAction {
    pub const SNOOZE_ID: &'static str = "snooze-5";
    pub const DONE_ID: &'static str = "done";

    /// Action identifier used on the notification surface.
    pub fn as_str(self) -> &'static str {
        match self {
            ReminderAction::Snooze => Self::SNOOZE_ID,
            ReminderAction::Done => Self::DONE_ID,
        }
    }

    /// Button text. The snooze id stays `snooze-5` on the wire; the label
    /// names the minutes that will actually be sent.
    pub fn label(self, snooze_minutes: u32) -> String {
        match self {
            ReminderAction::Snooze => format!("Snooze {snooze_minutes} min"),
            ReminderAction::Done => "Done".to_string(),
        }
    }

    /// Anything other than the snooze id (including a plain body click) is Done.
    pub fn from_action_id(action: Option<&str>) -> Self {
        match action {
            Some(Self::SNOOZE_ID) => ReminderAction::Snooze,
            _ => ReminderAction::Done,
        }
    }

    pub fn acknowledgment(self, id: impl Into<String>, snooze_minutes: u32) -> Acknowledgment {
        match self {
            ReminderAction::Snooze => Acknowledgment::snooze(id, snooze_minutes),
            ReminderAction::Done => Acknowledgment::done(id),
        }
    }
}

/// One row of `GET /dashboard`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardEntry {
    #[serde(default)]
    pub task: Option<String>,
}

// -- Chat types --

/// Body of `POST /chat`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

impl ChatRequest {
    /// A bare message with no session options, as sent by the clear and
    /// add-reminder controls.
    pub fn bare(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            voice_enabled: None,
            language: None,
            mode: None,
        }
    }
}

/// Sentinel message that resets server-side session state.
pub const CLEAR_MESSAGE: &str = "clear";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
}

/// Response of `/upload-image` and `/upload-doc`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub analysis: Option<String>,
    #[serde(default)]
    pub ocr_text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_text_strips_filler() {
        assert_eq!(display_text("remind me call mom"), "call mom");
        assert_eq!(display_text("Remind Me  to stretch "), "to stretch");
        assert_eq!(display_text("remind water plants"), "water plants");
    }

    #[test]
    fn test_display_text_fallbacks() {
        assert_eq!(display_text("remind me"), "remind me");
        assert_eq!(display_text(""), "Reminder");
        assert_eq!(display_text("buy milk"), "buy milk");
    }

    #[test]
    fn test_display_text_only_strips_leading_phrase() {
        assert_eq!(display_text("please remind me later"), "please remind me later");
    }

    #[test]
    fn test_done_ack_omits_snooze_field() {
        let json = serde_json::to_value(Acknowledgment::done("r1")).unwrap();
        assert_eq!(json, serde_json::json!({ "id": "r1" }));

        let json = serde_json::to_value(Acknowledgment::snooze("r1", 5)).unwrap();
        assert_eq!(json, serde_json::json!({ "id": "r1", "snooze_minutes": 5 }));
    }

    #[test]
    fn test_action_ids() {
        assert_eq!(
            ReminderAction::from_action_id(Some("snooze-5")),
            ReminderAction::Snooze
        );
        assert_eq!(ReminderAction::from_action_id(Some("done")), ReminderAction::Done);
        assert_eq!(ReminderAction::from_action_id(None), ReminderAction::Done);
        assert_eq!(
            ReminderAction::from_action_id(Some("default")),
            ReminderAction::Done
        );
    }

    #[test]
    fn test_snooze_label_follows_configured_minutes() {
        assert_eq!(ReminderAction::Snooze.label(5), "Snooze 5 min");
        assert_eq!(ReminderAction::Snooze.label(10), "Snooze 10 min");
        assert_eq!(ReminderAction::Done.label(10), "Done");
        // The wire id does not change with the configured minutes.
        assert_eq!(ReminderAction::Snooze.as_str(), "snooze-5");
        assert_eq!(
            ReminderAction::Snooze.acknowledgment("r1", 10),
            Acknowledgment::snooze("r1", 10)
        );
    }

    #[test]
    fn test_reminder_ignores_extra_backend_fields() {
        let json = r#"[{"id":"a","task":"remind me x","due_ts":"2024-01-01T00:00:00Z","delivered":false}]"#;
        let due: Vec<Reminder> = serde_json::from_str(json).unwrap();
        assert_eq!(due, vec![Reminder::new("a", "remind me x")]);
    }

    #[test]
    fn test_bare_chat_request_has_only_message() {
        let json = serde_json::to_value(ChatRequest::bare(CLEAR_MESSAGE)).unwrap();
        assert_eq!(json, serde_json::json!({ "message": "clear" }));
    }
}
