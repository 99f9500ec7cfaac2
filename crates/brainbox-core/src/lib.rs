pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod notify;
pub mod poller;
pub mod schema;
pub mod toast;
pub mod view;
pub mod worker;

pub use api::HttpClient;
pub use config::AppConfig;
pub use error::{CoreError, Result};
