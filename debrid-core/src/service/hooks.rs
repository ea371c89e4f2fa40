//! Host collaborators invoked after a successful download

use crate::models::SourceId;

/// Records resolved downloads in the host's history
#[cfg_attr(test, mockall::automock)]
pub trait HistoryRecorder: Send + Sync {
    fn record(&self, title: &str, url: &str, source: SourceId);
}

/// Runs the host's default action on a final URL (open a player, copy, ...)
#[cfg_attr(test, mockall::automock)]
pub trait ActionRunner: Send + Sync {
    fn run_default(&self, url: &str);
}

/// History recorder that only emits a log event
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingHistoryRecorder;

impl HistoryRecorder for TracingHistoryRecorder {
    fn record(&self, title: &str, url: &str, source: SourceId) {
        tracing::info!(%source, title, url, "Download resolved");
    }
}

/// Action runner that does nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAction;

impl ActionRunner for NoopAction {
    fn run_default(&self, _url: &str) {}
}
