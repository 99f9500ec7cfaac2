use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::ReminderApi;
use crate::config::{AckPolicy, AppConfig};
use crate::notify::{NotificationChannel, Permission, ReminderNotification};
use crate::schema::{Acknowledgment, Reminder};
use crate::toast::ToastRenderer;
use crate::worker::WorkerHandle;

/// What one poll cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub notified: usize,
    pub toasts: usize,
    pub acked: usize,
}

/// Fetches due reminders on a fixed interval and delivers them.
///
/// Cycles never overlap: the next one is scheduled only after the current
/// fetch and all of its acknowledgments have resolved.
pub struct ReminderPoller {
    api: Arc<dyn ReminderApi>,
    notifier: Arc<dyn NotificationChannel>,
    toasts: Arc<ToastRenderer>,
    worker: Option<WorkerHandle>,
    interval: Duration,
    policy: AckPolicy,
    notification_title: String,
    snooze_minutes: u32,
}

impl ReminderPoller {
    pub fn new(
        config: &AppConfig,
        api: Arc<dyn ReminderApi>,
        notifier: Arc<dyn NotificationChannel>,
        toasts: Arc<ToastRenderer>,
        worker: Option<WorkerHandle>,
    ) -> Self {
        Self {
            api,
            notifier,
            toasts,
            worker,
            interval: config.reminders.poll_interval(),
            policy: config.reminders.ack_policy,
            notification_title: config.notifications.title.clone(),
            snooze_minutes: config.reminders.snooze_minutes,
        }
    }

    /// Register the background worker and ask for notification permission.
    /// Failures only disable OS notifications.
    pub async fn prepare(&self) {
        if let Some(ref worker) = self.worker {
            if let Err(e) = worker.register().await {
                warn!(error = %e, "delivery worker registration failed");
            }
        }

        if self.notifier.permission() == Permission::Default {
            let permission = self.notifier.request_permission().await;
            info!(notifier = self.notifier.name(), ?permission, "notification permission");
        }
    }

    fn can_notify(&self) -> bool {
        let worker_active = self.worker.as_ref().is_some_and(|w| w.is_active());
        worker_active && self.notifier.permission() == Permission::Granted
    }

    /// Run one cycle. Returns `None` when the due list couldn't be fetched.
    pub async fn poll_once(&self) -> Option<CycleReport> {
        let due = match self.api.fetch_due().await {
            Ok(due) => due,
            Err(e) => {
                debug!(error = %e, "due reminder fetch failed, skipping cycle");
                return None;
            }
        };

        let mut report = CycleReport {
            fetched: due.len(),
            ..CycleReport::default()
        };

        let due = self.filter_on_screen(due);
        let notify = self.can_notify();

        for reminder in &due {
            if notify {
                let notification = ReminderNotification::for_reminder(
                    reminder,
                    &self.notification_title,
                    self.snooze_minutes,
                );
                match self.notifier.show(notification).await {
                    Ok(()) => report.notified += 1,
                    Err(e) => warn!(id = %reminder.id, error = %e, "failed to show notification"),
                }
            }

            self.toasts.show(reminder);
            report.toasts += 1;

            if self.policy == AckPolicy::OnDelivery {
                report.acked += 1;
                if let Err(e) = self.api.acknowledge(&Acknowledgment::done(&reminder.id)).await {
                    debug!(id = %reminder.id, error = %e, "automatic acknowledgment failed");
                }
            }
        }

        if report.fetched > 0 {
            info!(
                fetched = report.fetched,
                notified = report.notified,
                toasts = report.toasts,
                acked = report.acked,
                "reminders delivered"
            );
        }
        Some(report)
    }

    /// Under `on_action` nothing is acknowledged automatically, so a reminder
    /// stays due until the user acts. Skip the ones whose toast is still on
    /// screen; an evicted or snoozed reminder is shown again.
    fn filter_on_screen(&self, due: Vec<Reminder>) -> Vec<Reminder> {
        if self.policy == AckPolicy::OnDelivery {
            return due;
        }

        let mut on_screen: HashSet<String> = self.toasts.visible_reminders();
        due.into_iter()
            .filter(|r| on_screen.insert(r.id.clone()))
            .collect()
    }

    /// Poll until cancelled. Cancellation is only observed between cycles;
    /// in-flight calls always run to completion.
    pub async fn run(self, cancel: CancellationToken) {
        info!(interval_secs = self.interval.as_secs(), policy = ?self.policy, "reminder poller started");

        loop {
            self.poll_once().await;

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!("reminder poller stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ReminderAction;
    use crate::toast::tests::RecordingSurface;
    use crate::toast::ActionOutcome;
    use crate::worker::tests::{RecordingApi, RecordingNotifier};
    use crate::worker::{self, DeliveryWorker};

    struct Harness {
        api: Arc<RecordingApi>,
        notifier: Arc<RecordingNotifier>,
        surface: Arc<RecordingSurface>,
        toasts: Arc<ToastRenderer>,
        poller: ReminderPoller,
    }

    enum WorkerSetup {
        None,
        /// Spawned but not registered yet.
        Spawned,
        Registered,
        /// The worker side is gone before registration.
        Dead,
    }

    async fn harness(permission: Permission, policy: AckPolicy, setup: WorkerSetup) -> Harness {
        let mut config = AppConfig::default();
        config.reminders.ack_policy = policy;
        config.reminders.poll_interval_seconds = 1;

        let api = Arc::new(RecordingApi::default());
        let notifier = Arc::new(RecordingNotifier::new(permission));
        let surface = Arc::new(RecordingSurface::default());
        let toasts = Arc::new(ToastRenderer::new(
            api.clone(),
            surface.clone(),
            config.reminders.max_visible_toasts,
            "⏰ Reminder",
            config.reminders.snooze_minutes,
        ));

        let handle = match setup {
            WorkerSetup::None => None,
            WorkerSetup::Spawned | WorkerSetup::Registered => {
                let (handle, inbox) = worker::channel();
                DeliveryWorker::new(api.clone(), notifier.clone(), inbox, 5).spawn();
                if matches!(setup, WorkerSetup::Registered) {
                    handle.register().await.unwrap();
                }
                Some(handle)
            }
            WorkerSetup::Dead => {
                let (handle, inbox) = worker::channel();
                drop(inbox);
                Some(handle)
            }
        };

        let poller = ReminderPoller::new(&config, api.clone(), notifier.clone(), toasts.clone(), handle);
        Harness {
            api,
            notifier,
            surface,
            toasts,
            poller,
        }
    }

    fn set_due(api: &RecordingApi, due: Vec<Reminder>) {
        *api.due.lock().unwrap() = due;
    }

    #[tokio::test]
    async fn test_each_due_reminder_gets_toast_notification_and_ack() {
        let h = harness(Permission::Granted, AckPolicy::OnDelivery, WorkerSetup::Registered).await;
        set_due(
            &h.api,
            vec![
                Reminder::new("a", "one"),
                Reminder::new("b", "two"),
                Reminder::new("c", "three"),
            ],
        );

        let report = h.poller.poll_once().await.unwrap();

        assert_eq!(
            report,
            CycleReport {
                fetched: 3,
                notified: 3,
                toasts: 3,
                acked: 3
            }
        );
        assert_eq!(h.surface.added.lock().unwrap().len(), 3);
        assert_eq!(h.notifier.shown.lock().unwrap().len(), 3);
        let acks = h.api.acks.lock().unwrap();
        assert_eq!(
            *acks,
            vec![
                Acknowledgment::done("a"),
                Acknowledgment::done("b"),
                Acknowledgment::done("c")
            ]
        );
    }

    #[tokio::test]
    async fn test_denied_permission_still_toasts_and_acks() {
        let h = harness(Permission::Denied, AckPolicy::OnDelivery, WorkerSetup::Registered).await;
        set_due(&h.api, vec![Reminder::new("a", "one"), Reminder::new("b", "two")]);

        let report = h.poller.poll_once().await.unwrap();

        assert_eq!(report.notified, 0);
        assert_eq!(report.toasts, 2);
        assert_eq!(h.api.acks.lock().unwrap().len(), 2);
        assert!(h.notifier.shown.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_worker_means_no_os_notification() {
        let h = harness(Permission::Granted, AckPolicy::OnDelivery, WorkerSetup::None).await;
        set_due(&h.api, vec![Reminder::new("a", "one")]);

        let report = h.poller.poll_once().await.unwrap();

        assert_eq!(report.notified, 0);
        assert_eq!(report.toasts, 1);
        assert_eq!(report.acked, 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_creates_nothing() {
        let h = harness(Permission::Granted, AckPolicy::OnDelivery, WorkerSetup::Registered).await;
        set_due(&h.api, vec![Reminder::new("a", "one")]);
        *h.api.fail_fetch.lock().unwrap() = Some(503);

        assert_eq!(h.poller.poll_once().await, None);
        assert!(h.surface.added.lock().unwrap().is_empty());
        assert!(h.notifier.shown.lock().unwrap().is_empty());
        assert!(h.api.acks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_acks_do_not_stop_delivery() {
        let mut h = harness(Permission::Denied, AckPolicy::OnDelivery, WorkerSetup::None).await;
        let api = Arc::new(RecordingApi {
            fail_ack: true,
            ..RecordingApi::default()
        });
        set_due(&api, vec![Reminder::new("a", "one"), Reminder::new("b", "two")]);
        h.poller.api = api.clone() as Arc<dyn ReminderApi>;

        let report = h.poller.poll_once().await.unwrap();

        assert_eq!(report.toasts, 2);
        assert_eq!(report.acked, 2);
        assert_eq!(api.acks.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_loop_keeps_polling_after_failures() {
        let mut h = harness(Permission::Denied, AckPolicy::OnDelivery, WorkerSetup::None).await;
        *h.api.fail_fetch.lock().unwrap() = Some(500);
        h.poller.interval = Duration::from_millis(10);

        let cancel = CancellationToken::new();
        let task = tokio::spawn(h.poller.run(cancel.clone()));

        tokio::time::timeout(Duration::from_secs(5), async {
            while *h.api.fetches.lock().unwrap() < 3 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        cancel.cancel();
        task.await.unwrap();
        assert!(h.surface.added.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_end_to_end_done_after_automatic_ack() {
        let h = harness(Permission::Granted, AckPolicy::OnDelivery, WorkerSetup::Registered).await;
        set_due(&h.api, vec![Reminder::new("r1", "remind me call mom")]);

        h.poller.poll_once().await.unwrap();

        let visible = h.toasts.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].text, "call mom");
        assert_eq!(*h.api.acks.lock().unwrap(), vec![Acknowledgment::done("r1")]);

        let outcome = h
            .toasts
            .act(visible[0].id, ReminderAction::Done)
            .await;

        assert_eq!(outcome, ActionOutcome::Removed);
        assert_eq!(
            *h.api.acks.lock().unwrap(),
            vec![Acknowledgment::done("r1"), Acknowledgment::done("r1")]
        );
        assert!(h.toasts.visible().is_empty());
    }

    #[tokio::test]
    async fn test_on_action_policy_skips_automatic_ack_and_repeats() {
        let h = harness(Permission::Denied, AckPolicy::OnAction, WorkerSetup::None).await;
        set_due(&h.api, vec![Reminder::new("a", "one")]);

        let first = h.poller.poll_once().await.unwrap();
        let second = h.poller.poll_once().await.unwrap();

        assert_eq!(first.toasts, 1);
        assert_eq!(first.acked, 0);
        // Still on screen: not shown twice.
        assert_eq!(second.fetched, 1);
        assert_eq!(second.toasts, 0);
        assert!(h.api.acks.lock().unwrap().is_empty());

        // Snoozed from the toast: drops out of the due list, then comes back.
        let id = h.toasts.visible()[0].id;
        assert_eq!(
            h.toasts.act(id, ReminderAction::Snooze).await,
            ActionOutcome::Removed
        );
        set_due(&h.api, Vec::new());
        h.poller.poll_once().await.unwrap();
        set_due(&h.api, vec![Reminder::new("a", "one")]);
        let again = h.poller.poll_once().await.unwrap();

        assert_eq!(again.toasts, 1);
        assert_eq!(*h.api.acks.lock().unwrap(), vec![Acknowledgment::snooze("a", 5)]);
    }

    #[tokio::test]
    async fn test_on_action_evicted_reminder_is_shown_again() {
        let mut h = harness(Permission::Denied, AckPolicy::OnAction, WorkerSetup::None).await;
        let toasts = Arc::new(ToastRenderer::new(
            h.api.clone(),
            h.surface.clone(),
            1,
            "⏰ Reminder",
            5,
        ));
        h.poller.toasts = toasts.clone();
        set_due(&h.api, vec![Reminder::new("a", "one"), Reminder::new("b", "two")]);

        assert_eq!(h.poller.poll_once().await.unwrap().toasts, 2);
        let visible = toasts.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].reminder_id, "b");

        toasts.act(visible[0].id, ReminderAction::Done).await;
        set_due(&h.api, vec![Reminder::new("a", "one")]);

        // Eviction didn't acknowledge "a", so it is still due and comes back.
        let report = h.poller.poll_once().await.unwrap();
        assert_eq!(report.toasts, 1);
        let ids: Vec<_> = toasts.visible().into_iter().map(|t| t.reminder_id).collect();
        assert_eq!(ids, vec!["a"]);

        assert_eq!(h.poller.poll_once().await.unwrap().toasts, 0);
        assert_eq!(*h.api.acks.lock().unwrap(), vec![Acknowledgment::done("b")]);
    }

    #[tokio::test]
    async fn test_prepare_registers_worker_and_requests_permission() {
        let h = harness(Permission::Default, AckPolicy::OnDelivery, WorkerSetup::Spawned).await;
        assert!(!h.poller.can_notify());

        h.poller.prepare().await;

        assert_eq!(h.notifier.permission(), Permission::Granted);
        assert!(h.poller.can_notify());

        set_due(&h.api, vec![Reminder::new("a", "one")]);
        let report = h.poller.poll_once().await.unwrap();
        assert_eq!(report.notified, 1);
        assert_eq!(h.notifier.shown.lock().unwrap()[0].tag, "a");
    }

    #[tokio::test]
    async fn test_prepare_without_worker_still_toasts_and_acks() {
        let h = harness(Permission::Default, AckPolicy::OnDelivery, WorkerSetup::Dead).await;

        h.poller.prepare().await;

        assert_eq!(h.notifier.permission(), Permission::Granted);
        assert!(!h.poller.can_notify());

        set_due(&h.api, vec![Reminder::new("a", "one"), Reminder::new("b", "two")]);
        let report = h.poller.poll_once().await.unwrap();

        assert_eq!(report.notified, 0);
        assert_eq!(report.toasts, 2);
        assert_eq!(report.acked, 2);
        assert!(h.notifier.shown.lock().unwrap().is_empty());
        assert_eq!(h.surface.added.lock().unwrap().len(), 2);
    }
}
