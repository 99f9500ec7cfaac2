//! In-client reminder toasts.
//!
//! Toasts are shown regardless of OS notification permission. The rack is
//! bounded: when it is full the oldest idle toast is evicted.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::api::ReminderApi;
use crate::schema::{Reminder, ReminderAction};

pub type ToastId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: ToastId,
    pub reminder_id: String,
    pub title: String,
    pub text: String,
    pub shown_at: DateTime<Utc>,
    /// Minutes a Snooze on this toast asks for.
    pub snooze_minutes: u32,
    /// An action's acknowledgment is in flight.
    pub busy: bool,
}

impl Toast {
    pub fn actions(&self) -> [ReminderAction; 2] {
        [ReminderAction::Snooze, ReminderAction::Done]
    }

    pub fn label(&self, action: ReminderAction) -> String {
        action.label(self.snooze_minutes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    Acknowledged(ReminderAction),
    Evicted,
}

/// Where toasts are drawn.
pub trait ToastSurface: Send + Sync + 'static {
    fn toast_added(&self, toast: &Toast);

    fn toast_removed(&self, toast: &Toast, reason: RemovalReason);
}

/// Bounded, ordered set of visible toasts (oldest first).
#[derive(Debug)]
pub struct ToastRack {
    toasts: VecDeque<Toast>,
    capacity: usize,
    snooze_minutes: u32,
    next_id: ToastId,
}

impl ToastRack {
    pub fn new(capacity: usize, snooze_minutes: u32) -> Self {
        Self {
            toasts: VecDeque::new(),
            capacity: capacity.max(1),
            snooze_minutes,
            next_id: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.toasts.iter()
    }

    pub fn get(&self, id: ToastId) -> Option<&Toast> {
        self.toasts.iter().find(|t| t.id == id)
    }

    /// Add a toast, returning it together with the toast evicted to make room.
    pub fn push(&mut self, reminder: &Reminder, title: &str) -> (Toast, Option<Toast>) {
        let evicted = if self.toasts.len() >= self.capacity {
            let idx = self.toasts.iter().position(|t| !t.busy).unwrap_or(0);
            self.toasts.remove(idx)
        } else {
            None
        };

        let toast = Toast {
            id: self.next_id,
            reminder_id: reminder.id.clone(),
            title: title.to_string(),
            text: reminder.display_text(),
            shown_at: Utc::now(),
            snooze_minutes: self.snooze_minutes,
            busy: false,
        };
        self.next_id += 1;
        self.toasts.push_back(toast.clone());
        (toast, evicted)
    }

    /// Mark a toast busy and return its reminder id.
    /// `None` if the toast is gone or already has an action in flight.
    pub fn begin_action(&mut self, id: ToastId) -> Option<String> {
        let toast = self.toasts.iter_mut().find(|t| t.id == id)?;
        if toast.busy {
            return None;
        }
        toast.busy = true;
        Some(toast.reminder_id.clone())
    }

    /// Finish an action: remove the toast when the call resolved, otherwise
    /// make it clickable again.
    pub fn finish_action(&mut self, id: ToastId, resolved: bool) -> Option<Toast> {
        let idx = self.toasts.iter().position(|t| t.id == id)?;
        if resolved {
            self.toasts.remove(idx)
        } else {
            self.toasts[idx].busy = false;
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Acknowledged and removed.
    Removed,
    /// The acknowledgment failed; the toast stays for another try.
    Kept,
    /// No such toast, or it already has an action in flight.
    Ignored,
}

/// Shows toasts for due reminders and runs their Snooze/Done actions.
pub struct ToastRenderer {
    rack: Mutex<ToastRack>,
    surface: Arc<dyn ToastSurface>,
    api: Arc<dyn ReminderApi>,
    title: String,
    snooze_minutes: u32,
}

impl ToastRenderer {
    pub fn new(
        api: Arc<dyn ReminderApi>,
        surface: Arc<dyn ToastSurface>,
        capacity: usize,
        title: &str,
        snooze_minutes: u32,
    ) -> Self {
        Self {
            rack: Mutex::new(ToastRack::new(capacity, snooze_minutes)),
            surface,
            api,
            title: title.to_string(),
            snooze_minutes,
        }
    }

    fn rack(&self) -> std::sync::MutexGuard<'_, ToastRack> {
        self.rack.lock().unwrap_or_else(|e| {
            warn!("toast rack mutex was poisoned, recovering");
            e.into_inner()
        })
    }

    pub fn show(&self, reminder: &Reminder) -> ToastId {
        let (toast, evicted) = self.rack().push(reminder, &self.title);

        if let Some(ref old) = evicted {
            debug!(toast = old.id, reminder = %old.reminder_id, "evicting oldest toast");
            self.surface.toast_removed(old, RemovalReason::Evicted);
        }
        self.surface.toast_added(&toast);
        toast.id
    }

    /// Snapshot of the visible toasts, oldest first.
    pub fn visible(&self) -> Vec<Toast> {
        self.rack().iter().cloned().collect()
    }

    /// Ids of the reminders that currently have a toast on screen.
    pub fn visible_reminders(&self) -> HashSet<String> {
        self.rack().iter().map(|t| t.reminder_id.clone()).collect()
    }

    /// Run a toast's action. The toast is removed only after the
    /// acknowledgment call has resolved.
    pub async fn act(&self, id: ToastId, action: ReminderAction) -> ActionOutcome {
        let reminder_id = self.rack().begin_action(id);
        let Some(reminder_id) = reminder_id else {
            return ActionOutcome::Ignored;
        };

        let ack = action.acknowledgment(reminder_id, self.snooze_minutes);
        let resolved = match self.api.acknowledge(&ack).await {
            Ok(()) => true,
            Err(e) => {
                warn!(toast = id, reminder = %ack.id, error = %e, "toast acknowledgment failed");
                false
            }
        };

        let removed = self.rack().finish_action(id, resolved);
        match removed {
            Some(toast) => {
                self.surface
                    .toast_removed(&toast, RemovalReason::Acknowledged(action));
                ActionOutcome::Removed
            }
            // Evicted while the call was in flight.
            None if resolved => ActionOutcome::Removed,
            None => ActionOutcome::Kept,
        }
    }
}
