use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("backend returned status {0}")]
    Status(u16),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("notification error: {0}")]
    Notification(String),

    #[error("upload error: {0}")]
    Upload(String),

    #[error("worker is gone")]
    WorkerGone,
}

pub type Result<T> = std::result::Result<T, CoreError>;
