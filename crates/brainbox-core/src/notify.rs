use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::NotificationConfig;
use crate::error::{CoreError, Result};
use crate::schema::{Reminder, ReminderAction};
use crate::worker::WorkerHandle;

/// Permission state of the notification surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Not asked yet.
    Default,
    Granted,
    Denied,
}

/// An OS notification for one due reminder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderNotification {
    /// Replaces any visible notification with the same tag.
    pub tag: String,
    pub reminder_id: String,
    pub title: String,
    pub body: String,
    pub actions: [ReminderAction; 2],
    pub snooze_minutes: u32,
    pub require_interaction: bool,
}

impl ReminderNotification {
    pub fn for_reminder(reminder: &Reminder, title: &str, snooze_minutes: u32) -> Self {
        Self {
            tag: reminder.id.clone(),
            reminder_id: reminder.id.clone(),
            title: title.to_string(),
            body: reminder.display_text(),
            actions: [ReminderAction::Snooze, ReminderAction::Done],
            snooze_minutes,
            require_interaction: true,
        }
    }
}

/// Permission-gated OS notification surface.
#[async_trait]
pub trait NotificationChannel: Send + Sync + 'static {
    /// Human-readable name for logging.
    fn name(&self) -> &'static str;

    fn permission(&self) -> Permission;

    /// Ask for permission if it hasn't been decided yet.
    async fn request_permission(&self) -> Permission;

    async fn show(&self, notification: ReminderNotification) -> Result<()>;

    /// Close the notification with this tag, if still visible.
    async fn close(&self, tag: &str);
}

/// Notifications that still have a thread waiting on their actions,
/// keyed by tag. Holds at most one waiter per tag.
#[derive(Debug, Default)]
struct Waiters {
    by_tag: HashMap<String, u32>,
}

#[cfg_attr(not(all(unix, not(target_os = "macos"))), allow(dead_code))]
impl Waiters {
    /// Notification id to replace when showing `tag` again.
    fn replaces(&self, tag: &str) -> Option<u32> {
        self.by_tag.get(tag).copied()
    }

    /// Record that `tag` is on screen as notification `id`. Returns `true`
    /// when a new waiter must be started; a replacement that kept the same id
    /// is still covered by the existing one.
    fn shown(&mut self, tag: &str, id: u32) -> bool {
        if self.by_tag.get(tag) == Some(&id) {
            return false;
        }
        self.by_tag.insert(tag.to_string(), id);
        true
    }

    /// The waiter for notification `id` returned. A newer notification for
    /// the same tag keeps its entry.
    fn finished(&mut self, tag: &str, id: u32) {
        if self.by_tag.get(tag) == Some(&id) {
            self.by_tag.remove(tag);
        }
    }

    fn len(&self) -> usize {
        self.by_tag.len()
    }
}

/// Desktop notifications via `notify-rust`.
///
/// On XDG desktops the action buttons are live: a click is forwarded to the
/// background worker as a notification-click message.
pub struct DesktopNotifier {
    app_name: String,
    permission: Mutex<Permission>,
    worker: WorkerHandle,
    waiters: Arc<Mutex<Waiters>>,
}

impl DesktopNotifier {
    pub fn new(config: &NotificationConfig, worker: WorkerHandle) -> Self {
        let permission = if config.enabled {
            Permission::Default
        } else {
            Permission::Denied
        };
        Self {
            app_name: config.app_name.clone(),
            permission: Mutex::new(permission),
            worker,
            waiters: Arc::new(Mutex::new(Waiters::default())),
        }
    }
}

fn lock_waiters(waiters: &Mutex<Waiters>) -> std::sync::MutexGuard<'_, Waiters> {
    waiters.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl NotificationChannel for DesktopNotifier {
    fn name(&self) -> &'static str {
        "Desktop"
    }

    fn permission(&self) -> Permission {
        *self.permission.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn request_permission(&self) -> Permission {
        let mut permission = self.permission.lock().unwrap_or_else(|e| e.into_inner());
        if *permission == Permission::Default {
            // Desktop notification daemons don't prompt; enabled means granted.
            *permission = Permission::Granted;
            info!("desktop notifications granted");
        }
        *permission
    }

    async fn show(&self, notification: ReminderNotification) -> Result<()> {
        let app_name = self.app_name.clone();
        let worker = self.worker.clone();
        let waiters = self.waiters.clone();

        tokio::task::spawn_blocking(move || show_blocking(&app_name, notification, worker, waiters))
            .await
            .map_err(|e| CoreError::Notification(format!("notification task panicked: {e}")))?
    }

    async fn close(&self, tag: &str) {
        // The daemon dismisses a notification once one of its actions fires,
        // and its waiter clears the bookkeeping on the way out.
        debug!(tag, pending = lock_waiters(&self.waiters).len(), "notification closed");
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
fn show_blocking(
    app_name: &str,
    notification: ReminderNotification,
    worker: WorkerHandle,
    waiters: Arc<Mutex<Waiters>>,
) -> Result<()> {
    use notify_rust::{Hint, Notification, Timeout};

    let mut builder = Notification::new();
    builder
        .appname(app_name)
        .summary(&notification.title)
        .body(&notification.body);
    for action in notification.actions {
        builder.action(action.as_str(), &action.label(notification.snooze_minutes));
    }
    if notification.require_interaction {
        builder.hint(Hint::Resident(true)).timeout(Timeout::Never);
    }

    // Held across show so a finishing waiter can't interleave with the
    // replacement.
    let mut pending = lock_waiters(&waiters);
    if let Some(existing) = pending.replaces(&notification.tag) {
        builder.id(existing);
    }

    let handle = builder
        .show()
        .map_err(|e| CoreError::Notification(e.to_string()))?;
    let id = handle.id();
    if !pending.shown(&notification.tag, id) {
        debug!(tag = %notification.tag, id, "notification replaced in place");
        return Ok(());
    }
    drop(pending);

    // Waits until the user acts on the notification or it goes away.
    let tag = notification.tag;
    let reminder_id = notification.reminder_id;
    std::thread::spawn(move || {
        handle.wait_for_action(|action| {
            let result = match action {
                "__closed" => worker.blocking_notification_closed(&reminder_id),
                "default" => worker.blocking_notification_clicked(Some(reminder_id.clone()), None),
                other => worker.blocking_notification_clicked(
                    Some(reminder_id.clone()),
                    Some(other.to_string()),
                ),
            };
            if let Err(e) = result {
                warn!(error = %e, "could not forward notification action");
            }
        });
        lock_waiters(&waiters).finished(&tag, id);
    });
    Ok(())
}

#[cfg(not(all(unix, not(target_os = "macos"))))]
fn show_blocking(
    app_name: &str,
    notification: ReminderNotification,
    _worker: WorkerHandle,
    _waiters: Arc<Mutex<Waiters>>,
) -> Result<()> {
    use notify_rust::Notification;

    // No action buttons on this platform; the in-app toast carries them.
    Notification::new()
        .appname(app_name)
        .summary(&notification.title)
        .body(&notification.body)
        .show()
        .map_err(|e| CoreError::Notification(e.to_string()))?;
    Ok(())
}

/// Fallback channel that never has permission.
/// Used in headless setups and when notifications are turned off.
pub struct NoopNotifier;

#[async_trait]
impl NotificationChannel for NoopNotifier {
    fn name(&self) -> &'static str {
        "Noop"
    }

    fn permission(&self) -> Permission {
        Permission::Denied
    }

    async fn request_permission(&self) -> Permission {
        Permission::Denied
    }

    async fn show(&self, _notification: ReminderNotification) -> Result<()> {
        Ok(())
    }

    async fn close(&self, _tag: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_for_reminder() {
        let n = ReminderNotification::for_reminder(
            &Reminder::new("r1", "remind me call mom"),
            "⏰ Reminder",
            5,
        );
        assert_eq!(n.tag, "r1");
        assert_eq!(n.reminder_id, "r1");
        assert_eq!(n.body, "call mom");
        assert_eq!(n.actions[0].as_str(), "snooze-5");
        assert_eq!(n.actions[1].as_str(), "done");
        assert_eq!(n.snooze_minutes, 5);
        assert!(n.require_interaction);
    }

    #[test]
    fn test_one_waiter_per_tag() {
        let mut waiters = Waiters::default();

        assert!(waiters.shown("r1", 7));
        assert_eq!(waiters.replaces("r1"), Some(7));
        // Shown again after a snooze: the daemon kept id 7, so the existing
        // waiter still covers it.
        assert!(!waiters.shown("r1", 7));
        assert_eq!(waiters.len(), 1);
    }

    #[test]
    fn test_closed_notification_clears_its_entry() {
        let mut waiters = Waiters::default();
        waiters.shown("r1", 7);
        waiters.shown("r2", 8);

        waiters.finished("r1", 7);

        assert_eq!(waiters.replaces("r1"), None);
        assert_eq!(waiters.len(), 1);
    }

    #[test]
    fn test_stale_waiter_keeps_newer_entry() {
        let mut waiters = Waiters::default();
        waiters.shown("r1", 7);
        // The old notification was gone, so the daemon assigned a new id.
        assert!(waiters.shown("r1", 9));

        waiters.finished("r1", 7);

        assert_eq!(waiters.replaces("r1"), Some(9));
    }

    #[tokio::test]
    async fn test_disabled_desktop_notifier_stays_denied() {
        let (handle, _rx) = crate::worker::channel();
        let notifier = DesktopNotifier::new(
            &NotificationConfig {
                enabled: false,
                ..NotificationConfig::default()
            },
            handle,
        );
        assert_eq!(notifier.permission(), Permission::Denied);
        assert_eq!(notifier.request_permission().await, Permission::Denied);
    }

    #[tokio::test]
    async fn test_enabled_desktop_notifier_grants_on_request() {
        let (handle, _rx) = crate::worker::channel();
        let notifier = DesktopNotifier::new(&NotificationConfig::default(), handle);
        assert_eq!(notifier.permission(), Permission::Default);
        assert_eq!(notifier.request_permission().await, Permission::Granted);
        assert_eq!(notifier.permission(), Permission::Granted);
    }
}
