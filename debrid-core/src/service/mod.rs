pub mod hooks;
pub mod manager;

pub use hooks::{ActionRunner, HistoryRecorder, NoopAction, TracingHistoryRecorder};
pub use manager::{report_error, DebridManager, LoginStep};
