// Device / PIN Login
//
// `RequestCode -> Poll -> {Success | Timeout | Cancelled}`. Adapters hand out a
// `PendingDeviceLogin` holding the code to show the user and an authorizer
// that performs one poll step (and stores the credential on success).

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// Poll cadence of a device login
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 12,
        }
    }
}

/// Result of one poll step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    /// Not approved yet
    Pending,
    /// Credential stored
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Success,
    Timeout,
    Cancelled,
}

/// One step of a provider's device flow
///
/// Implementations keep their own sub-state (e.g. a two-phase exchange) and
/// return `Pending` for responses that only mean "not approved yet".
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceAuthorizer: Send {
    async fn poll_once(&mut self) -> Result<PollStatus>;
}

/// A device login waiting for the user
pub struct PendingDeviceLogin {
    /// Where the user approves the device
    pub verification_url: String,
    /// Code to show next to the URL
    pub user_code: String,
    pub schedule: PollSchedule,
    authorizer: Box<dyn DeviceAuthorizer>,
}

impl PendingDeviceLogin {
    pub fn new(
        verification_url: impl Into<String>,
        user_code: impl Into<String>,
        schedule: PollSchedule,
        authorizer: Box<dyn DeviceAuthorizer>,
    ) -> Self {
        Self {
            verification_url: verification_url.into(),
            user_code: user_code.into(),
            schedule,
            authorizer,
        }
    }

    /// Poll until approved, out of attempts, or cancelled
    ///
    /// Transport errors abort the flow.
    pub async fn wait(mut self, cancel: &CancellationToken) -> Result<AuthOutcome> {
        for attempt in 1..=self.schedule.max_attempts {
            if cancel.is_cancelled() {
                return Ok(AuthOutcome::Cancelled);
            }

            tokio::select! {
                () = cancel.cancelled() => return Ok(AuthOutcome::Cancelled),
                () = tokio::time::sleep(self.schedule.interval) => {}
            }

            if self.authorizer.poll_once().await? == PollStatus::Complete {
                tracing::info!(attempt, "Device login approved");
                return Ok(AuthOutcome::Success);
            }
            tracing::debug!(attempt, "Device login still pending");
        }

        Ok(AuthOutcome::Timeout)
    }
}

impl std::fmt::Debug for PendingDeviceLogin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingDeviceLogin")
            .field("verification_url", &self.verification_url)
            .field("user_code", &self.user_code)
            .field("schedule", &self.schedule)
            .finish_non_exhaustive()
    }
}
