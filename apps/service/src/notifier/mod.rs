//! Outbound SMS notification.

pub mod twilio;

pub use twilio::TwilioNotifier;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid notification input: {0}")]
    InvalidInput(String),
    #[error("notification transport failed: {0}")]
    Transport(String),
    #[error("notification rejected with status {status}")]
    Rejected { status: u16 },
}

/// Sends a short text message to a phone number. The engine never retries a
/// failed delivery.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, phone: &str, message: &str) -> Result<(), NotifyError>;
}
