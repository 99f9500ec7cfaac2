use brainbox_core::chat::{ChatLine, Role};
use brainbox_core::schema::ReminderAction;
use brainbox_core::toast::{RemovalReason, Toast, ToastSurface};
use brainbox_core::view::ViewState;
use tracing::info;

/// Draws toasts as cards on stdout, for the interactive session.
pub struct TerminalToasts;

impl ToastSurface for TerminalToasts {
    fn toast_added(&self, toast: &Toast) {
        println!("{}", format_card(toast));
    }

    fn toast_removed(&self, toast: &Toast, reason: RemovalReason) {
        match reason {
            RemovalReason::Acknowledged(action) => {
                println!("  [#{}] {} ({})", toast.id, toast.text, toast.label(action));
            }
            RemovalReason::Evicted => {
                println!("  [#{}] {} (dismissed)", toast.id, toast.text);
            }
        }
    }
}

/// Headless surface: toasts become log lines.
pub struct LogToasts;

impl ToastSurface for LogToasts {
    fn toast_added(&self, toast: &Toast) {
        info!(toast = toast.id, reminder = %toast.reminder_id, text = %toast.text, "reminder due");
    }

    fn toast_removed(&self, toast: &Toast, reason: RemovalReason) {
        info!(toast = toast.id, ?reason, "toast removed");
    }
}

pub fn format_card(toast: &Toast) -> String {
    let actions: Vec<String> = toast
        .actions()
        .iter()
        .map(|a| {
            let command = match a {
                ReminderAction::Snooze => "/snooze",
                ReminderAction::Done => "/done",
            };
            format!("{command} {}  {}", toast.id, toast.label(*a))
        })
        .collect();

    format!(
        "┌─ {} [#{}] {}\n│  {}\n└─ {}",
        toast.title,
        toast.id,
        toast.shown_at.format("%H:%M"),
        toast.text,
        actions.join("   ")
    )
}

pub fn print_lines(lines: &[ChatLine]) {
    for line in lines {
        match line.role {
            Role::User => println!("you> {}", line.text),
            Role::Bot => println!("bot> {}", line.text),
        }
    }
}

pub fn print_view(view: &ViewState) {
    let model = view.render();
    println!("theme {}", model.theme_toggle);
    if view.sidebar_open {
        println!("┌─ menu");
        for (command, what) in MENU {
            println!("│  {command:<18} {what}");
        }
        println!("└─ /sidebar to close");
    }
}

pub const MENU: [(&str, &str); 12] = [
    ("/clear", "new chat"),
    ("/remind <text>", "add a reminder"),
    ("/dashboard", "list reminders"),
    ("/close", "close the dashboard"),
    ("/upload <path>", "analyse an image or document"),
    ("/export", "export your data"),
    ("/delete", "delete your data"),
    ("/theme", "toggle light/dark"),
    ("/snooze <id>", "snooze a reminder toast"),
    ("/done <id>", "complete a reminder toast"),
    ("/toasts", "show open reminder toasts"),
    ("/quit", "exit"),
];
