pub mod auth;
pub mod concurrency;
pub mod config;
pub mod error;
pub mod logging;
pub mod magnet;
pub mod models;
pub mod provider;
pub mod service;
pub mod store;

pub use config::Config;
pub use error::{DebridError, NetworkKind, Presentation, Result};
pub use magnet::Magnet;
pub use service::{DebridManager, LoginStep};
