use std::path::PathBuf;
use std::sync::Arc;

use brainbox_core::chat::ChatSession;
use brainbox_core::schema::ReminderAction;
use brainbox_core::toast::{ActionOutcome, ToastId, ToastRenderer};
use brainbox_core::view::ViewState;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::terminal::{print_lines, print_view};

/// One line typed into the interactive session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Message(String),
    Clear,
    Remind(String),
    Dashboard,
    CloseDashboard,
    Upload(PathBuf),
    Export,
    Delete,
    Theme,
    Sidebar,
    Toast(ReminderAction, ToastId),
    Toasts,
    Quit,
    Invalid(String),
}

impl Input {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let Some(command) = line.strip_prefix('/') else {
            return Input::Message(line.to_string());
        };

        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };

        match (name, arg) {
            ("clear" | "new", _) => Input::Clear,
            ("remind", "") => Input::Invalid("usage: /remind <text>".to_string()),
            ("remind", text) => Input::Remind(text.to_string()),
            ("dashboard", _) => Input::Dashboard,
            ("close", _) => Input::CloseDashboard,
            ("upload", "") => Input::Invalid("usage: /upload <path>".to_string()),
            ("upload", path) => Input::Upload(PathBuf::from(path)),
            ("export", _) => Input::Export,
            ("delete", _) => Input::Delete,
            ("theme", _) => Input::Theme,
            ("sidebar" | "menu", _) => Input::Sidebar,
            ("snooze", id) => parse_toast(ReminderAction::Snooze, id),
            ("done", id) => parse_toast(ReminderAction::Done, id),
            ("toasts", _) => Input::Toasts,
            ("quit" | "exit", _) => Input::Quit,
            _ => Input::Invalid(format!("unknown command /{name}, try /sidebar")),
        }
    }
}

fn parse_toast(action: ReminderAction, arg: &str) -> Input {
    match arg.parse::<ToastId>() {
        Ok(id) => Input::Toast(action, id),
        Err(_) => Input::Invalid(format!("usage: {} <toast id>", command_for(action))),
    }
}

fn command_for(action: ReminderAction) -> &'static str {
    match action {
        ReminderAction::Snooze => "/snooze",
        ReminderAction::Done => "/done",
    }
}

/// Read stdin until `/quit`, EOF, or Ctrl-C.
pub async fn run_interactive(mut chat: ChatSession, toasts: Arc<ToastRenderer>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print_view(&chat.view());
    println!("type a message, or /sidebar for commands");

    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("received SIGINT, leaving session");
                break;
            }
            line = lines.next_line() => line?,
        };

        let Some(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        match Input::parse(&line) {
            Input::Message(text) => {
                println!("typing…");
                let added = chat.send(&text).await;
                // The user's own line is already on screen.
                print_lines(added.get(1..).unwrap_or_default());
            }
            Input::Clear => {
                chat.clear().await;
                println!("✨ New chat started");
                print_view(&chat.view());
            }
            Input::Remind(text) => print_lines(&chat.add_reminder(&text).await),
            Input::Dashboard => {
                println!("Loading...");
                for line in chat.dashboard().await {
                    println!("  {line}");
                }
            }
            Input::CloseDashboard => chat.close_dashboard(),
            Input::Upload(path) => {
                println!("typing…");
                print_lines(&chat.upload(&path).await);
            }
            Input::Export => {
                if let Err(e) = chat.export() {
                    warn!(error = %e, "could not open export");
                }
            }
            Input::Delete => {
                chat.delete_data().await;
                println!("data deleted");
                print_view(&chat.view());
            }
            Input::Theme => print_view(&chat.update_view(ViewState::toggle_theme)),
            Input::Sidebar => print_view(&chat.update_view(ViewState::toggle_sidebar)),
            Input::Toast(action, id) => {
                // Runs on its own so the prompt stays responsive.
                let toasts = toasts.clone();
                tokio::spawn(async move {
                    match toasts.act(id, action).await {
                        ActionOutcome::Removed => {}
                        ActionOutcome::Kept => println!("  [#{id}] could not reach the server, try again"),
                        ActionOutcome::Ignored => println!("  no open toast #{id}"),
                    }
                });
            }
            Input::Toasts => {
                let visible = toasts.visible();
                if visible.is_empty() {
                    println!("no open reminders");
                }
                for toast in visible {
                    println!("{}", crate::terminal::format_card(&toast));
                }
            }
            Input::Quit => break,
            Input::Invalid(message) => println!("{message}"),
        }
    }

    Ok(())
}
