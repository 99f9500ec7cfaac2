//! Background delivery worker.
//!
//! Runs as its own task, independent of any interactive session, and handles
//! notification-button clicks by forwarding acknowledgments to the backend.
//! Everything reaches it through a typed message channel; see [`WorkerEvent`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::api::ReminderApi;
use crate::error::{CoreError, Result};
use crate::notify::NotificationChannel;
use crate::schema::{Acknowledgment, ReminderAction};

const INBOX_CAPACITY: usize = 64;

/// Payload of a notification click: the reminder id attached to the
/// notification and the action button pressed (`None` for a body click).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMessage {
    pub id: Option<String>,
    pub action: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    Install,
    Activate,
    NotificationClick(ActionMessage),
    NotificationClose { id: Option<String> },
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    Installing,
    Installed,
    /// Controls every attached session.
    Active,
    Stopped,
}

/// Cloneable sender side of the worker, handed to sessions and notifiers.
#[derive(Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<WorkerEvent>,
    status: watch::Receiver<WorkerStatus>,
}

/// Receiving side, consumed by [`DeliveryWorker::new`].
pub struct WorkerInbox {
    rx: mpsc::Receiver<WorkerEvent>,
    status: watch::Sender<WorkerStatus>,
}

/// Create the message channel between sessions and the worker.
pub fn channel() -> (WorkerHandle, WorkerInbox) {
    let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
    let (status_tx, status_rx) = watch::channel(WorkerStatus::Installing);
    (
        WorkerHandle {
            tx,
            status: status_rx,
        },
        WorkerInbox {
            rx,
            status: status_tx,
        },
    )
}

impl WorkerHandle {
    pub fn status(&self) -> WorkerStatus {
        *self.status.borrow()
    }

    pub fn is_active(&self) -> bool {
        self.status() == WorkerStatus::Active
    }

    /// Install the worker and wait until it has taken control.
    pub async fn register(&self) -> Result<()> {
        self.send(WorkerEvent::Install).await?;
        let mut status = self.status.clone();
        status
            .wait_for(|s| matches!(s, WorkerStatus::Active | WorkerStatus::Stopped))
            .await
            .map_err(|_| CoreError::WorkerGone)?;
        if self.is_active() {
            Ok(())
        } else {
            Err(CoreError::WorkerGone)
        }
    }

    pub async fn notification_clicked(
        &self,
        id: Option<String>,
        action: Option<String>,
    ) -> Result<()> {
        self.send(WorkerEvent::NotificationClick(ActionMessage { id, action }))
            .await
    }

    /// Same as [`notification_clicked`](Self::notification_clicked), for
    /// callers on a blocking thread.
    pub fn blocking_notification_clicked(
        &self,
        id: Option<String>,
        action: Option<String>,
    ) -> Result<()> {
        self.tx
            .blocking_send(WorkerEvent::NotificationClick(ActionMessage { id, action }))
            .map_err(|_| CoreError::WorkerGone)
    }

    pub fn blocking_notification_closed(&self, id: &str) -> Result<()> {
        self.tx
            .blocking_send(WorkerEvent::NotificationClose {
                id: Some(id.to_string()),
            })
            .map_err(|_| CoreError::WorkerGone)
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(WorkerEvent::Shutdown).await;
    }

    async fn send(&self, event: WorkerEvent) -> Result<()> {
        self.tx.send(event).await.map_err(|_| CoreError::WorkerGone)
    }
}

pub struct DeliveryWorker {
    api: Arc<dyn ReminderApi>,
    notifier: Arc<dyn NotificationChannel>,
    inbox: WorkerInbox,
    snooze_minutes: u32,
}

impl DeliveryWorker {
    pub fn new(
        api: Arc<dyn ReminderApi>,
        notifier: Arc<dyn NotificationChannel>,
        inbox: WorkerInbox,
        snooze_minutes: u32,
    ) -> Self {
        Self {
            api,
            notifier,
            inbox,
            snooze_minutes,
        }
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Process events until shutdown or until every handle is dropped.
    pub async fn run(mut self) {
        debug!(notifier = self.notifier.name(), "delivery worker started");

        while let Some(event) = self.inbox.rx.recv().await {
            match event {
                WorkerEvent::Install => {
                    self.set_status(WorkerStatus::Installed);
                    // Skip waiting: activate straight away.
                    self.activate();
                }
                WorkerEvent::Activate => self.activate(),
                WorkerEvent::NotificationClick(message) => {
                    self.handle_click(message).await;
                }
                WorkerEvent::NotificationClose { id } => {
                    debug!(id = ?id, "notification dismissed");
                }
                WorkerEvent::Shutdown => break,
            }
        }

        self.set_status(WorkerStatus::Stopped);
        info!("delivery worker stopped");
    }

    fn activate(&self) {
        if *self.inbox.status.borrow() != WorkerStatus::Active {
            self.set_status(WorkerStatus::Active);
            info!("delivery worker active, controlling all sessions");
        }
    }

    fn set_status(&self, status: WorkerStatus) {
        self.inbox.status.send_replace(status);
    }

    /// Close the notification and forward the acknowledgment, if any.
    /// Returns the acknowledgment that was sent.
    async fn handle_click(&self, message: ActionMessage) -> Option<Acknowledgment> {
        if let Some(ref id) = message.id {
            self.notifier.close(id).await;
        }

        let id = message.id?;
        let action = ReminderAction::from_action_id(message.action.as_deref());
        let ack = action.acknowledgment(id, self.snooze_minutes);

        match self.api.acknowledge(&ack).await {
            Ok(()) => info!(id = %ack.id, action = action.as_str(), "notification action acknowledged"),
            Err(e) => debug!(id = %ack.id, error = %e, "notification acknowledgment failed"),
        }
        Some(ack)
    }
}
