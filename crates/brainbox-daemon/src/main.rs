mod session;
mod terminal;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use brainbox_core::api::{ChatApi, ReminderApi};
use brainbox_core::chat::{ChatSession, SystemLauncher};
use brainbox_core::config::{init_logging, AppConfig};
use brainbox_core::notify::{DesktopNotifier, NoopNotifier, NotificationChannel};
use brainbox_core::poller::ReminderPoller;
use brainbox_core::schema::Acknowledgment;
use brainbox_core::toast::{ToastRenderer, ToastSurface};
use brainbox_core::view::Theme;
use brainbox_core::worker::{self, DeliveryWorker, WorkerHandle};
use brainbox_core::HttpClient;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::terminal::{print_lines, LogToasts, TerminalToasts};

#[derive(Parser)]
#[command(name = "brainbox", about = "BrainBox chat client with reminder notifications")]
struct Cli {
    /// Backend base URL (overrides config and BRAINBOX_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive chat with reminder toasts (default when no subcommand given)
    Run,
    /// Poll for reminders and show desktop notifications, without a chat prompt
    Worker,
    /// Send a single chat message
    Chat {
        #[arg(required = true)]
        message: Vec<String>,
    },
    /// Add a reminder
    Remind {
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// List reminders
    Dashboard,
    /// Upload an image or document for analysis
    Upload { path: PathBuf },
    /// Acknowledge a reminder by id
    Ack {
        id: String,
        /// Snooze for this many minutes instead of completing
        #[arg(long)]
        snooze: Option<u32>,
    },
    /// Open the data export in the browser
    Export,
    /// Delete all data on the backend
    DeleteData,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();

    let mut config = AppConfig::load()?;
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }
    let client = Arc::new(HttpClient::new(&config.api));

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run_interactive(config, client).await,
        Command::Worker => run_worker(config, client).await,
        Command::Chat { message } => {
            let mut chat = chat_session(&config, client);
            print_lines(&chat.send(&message.join(" ")).await);
            Ok(())
        }
        Command::Remind { text } => {
            let mut chat = chat_session(&config, client);
            print_lines(&chat.add_reminder(&text.join(" ")).await);
            Ok(())
        }
        Command::Dashboard => {
            let mut chat = chat_session(&config, client);
            for line in chat.dashboard().await {
                println!("{line}");
            }
            Ok(())
        }
        Command::Upload { path } => {
            let mut chat = chat_session(&config, client);
            print_lines(&chat.upload(&path).await);
            Ok(())
        }
        Command::Ack { id, snooze } => {
            let ack = match snooze {
                Some(minutes) => Acknowledgment::snooze(id, minutes),
                None => Acknowledgment::done(id),
            };
            client.acknowledge(&ack).await?;
            println!("acknowledged {}", ack.id);
            Ok(())
        }
        Command::Export => {
            chat_session(&config, client).export()?;
            Ok(())
        }
        Command::DeleteData => {
            client.delete_data().await?;
            println!("data deleted");
            Ok(())
        }
    }
}

fn chat_session(config: &AppConfig, client: Arc<HttpClient>) -> ChatSession {
    ChatSession::new(
        client,
        Arc::new(SystemLauncher),
        config.chat.clone(),
        Theme::from_name(&config.ui.theme),
    )
}

/// Running reminder delivery: worker task, poller task, and the toast rack.
struct Reminders {
    worker: WorkerHandle,
    worker_task: tokio::task::JoinHandle<()>,
    poller_task: tokio::task::JoinHandle<()>,
    toasts: Arc<ToastRenderer>,
    cancel: CancellationToken,
}

impl Reminders {
    async fn start(
        config: &AppConfig,
        client: Arc<HttpClient>,
        surface: Arc<dyn ToastSurface>,
    ) -> Self {
        let (handle, inbox) = worker::channel();

        let notifier: Arc<dyn NotificationChannel> = if config.notifications.enabled {
            Arc::new(DesktopNotifier::new(&config.notifications, handle.clone()))
        } else {
            Arc::new(NoopNotifier)
        };

        let worker_task = DeliveryWorker::new(
            client.clone(),
            notifier.clone(),
            inbox,
            config.reminders.snooze_minutes,
        )
        .spawn();

        let toasts = Arc::new(ToastRenderer::new(
            client.clone(),
            surface,
            config.reminders.max_visible_toasts,
            &config.notifications.title,
            config.reminders.snooze_minutes,
        ));

        let poller = ReminderPoller::new(config, client, notifier, toasts.clone(), Some(handle.clone()));
        poller.prepare().await;

        let cancel = CancellationToken::new();
        let poller_task = if config.reminders.enabled {
            tokio::spawn(poller.run(cancel.clone()))
        } else {
            info!("reminder polling disabled");
            tokio::spawn(async {})
        };

        Self {
            worker: handle,
            worker_task,
            poller_task,
            toasts,
            cancel,
        }
    }

    /// Stop polling, then the worker. Waits up to 30 seconds for in-flight
    /// calls to finish.
    async fn shutdown(self) {
        self.cancel.cancel();
        let timeout = Duration::from_secs(30);
        let _ = tokio::time::timeout(timeout, async {
            let _ = self.poller_task.await;
            self.worker.shutdown().await;
            let _ = self.worker_task.await;
        })
        .await;
    }
}

async fn run_interactive(config: AppConfig, client: Arc<HttpClient>) -> anyhow::Result<()> {
    info!(api = %client.base_url(), "brainbox starting");
    if !client.health_check().await {
        warn!(api = %client.base_url(), "backend not reachable, will keep trying");
    }

    let reminders = Reminders::start(&config, client.clone(), Arc::new(TerminalToasts)).await;
    let chat = chat_session(&config, client);

    let result = session::run_interactive(chat, reminders.toasts.clone()).await;

    reminders.shutdown().await;
    info!("brainbox stopped");
    result
}

async fn run_worker(config: AppConfig, client: Arc<HttpClient>) -> anyhow::Result<()> {
    info!(
        api = %client.base_url(),
        interval = config.reminders.poll_interval_seconds,
        "brainbox worker starting"
    );

    let reminders = Reminders::start(&config, client, Arc::new(LogToasts)).await;

    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("received SIGINT, shutting down");
        }
        _ = sigterm.recv() => {
            info!("received SIGTERM, shutting down");
        }
    }

    reminders.shutdown().await;
    info!("brainbox worker stopped");
    Ok(())
}
