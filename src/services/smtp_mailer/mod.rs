use async_trait::async_trait;
use std::fmt;

use lettre::address::AddressError;
use lettre::transport::smtp::Error as SmtpError;

#[derive(Debug)]
pub enum MailError {
    Other(String),
    InvalidEmailAddress(String),
    SendError(String),
    EnvVarMissing(String),
}

impl fmt::Display for MailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MailError::Other(e) => write!(f, "Error: {}", e),
            MailError::InvalidEmailAddress(e) => write!(f, "Invalid Address: {}", e),
            MailError::SendError(e) => write!(f, "Send error: {}", e),
            MailError::EnvVarMissing(e) => write!(f, "Env Var Missing: {}", e),
        }
    }
}

impl std::error::Error for MailError {}

impl From<SmtpError> for MailError {
    fn from(err: SmtpError) -> Self {
        MailError::SendError(err.to_string())
    }
}

impl From<std::env::VarError> for MailError {
    fn from(err: std::env::VarError) -> Self {
        MailError::EnvVarMissing(err.to_string())
    }
}

impl From<lettre::error::Error> for MailError {
    fn from(err: lettre::error::Error) -> Self {
        MailError::SendError(err.to_string())
    }
}

impl From<AddressError> for MailError {
    fn from(e: AddressError) -> Self {
        MailError::InvalidEmailAddress(e.to_string())
    }
}

/// Outbound notification contract. One best-effort delivery attempt per
/// call; callers that need guaranteed delivery own their own retry.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

mod mock_mailer;
mod smtp_impl;

pub use mock_mailer::{MockMailer, RecordedEmail};
pub use smtp_impl::SmtpMailer;
