// Authentication
//
// Per-source credential access plus the two interactive login flows: device
// pin polling and browser redirect with the token in the URL fragment.

pub mod credentials;
pub mod device;
pub mod oauth;

pub use credentials::{keys, SourceCredentials};
pub use device::{AuthOutcome, DeviceAuthorizer, PendingDeviceLogin, PollSchedule, PollStatus};
pub use oauth::extract_fragment_token;
