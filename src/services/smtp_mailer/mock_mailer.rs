use crate::services::smtp_mailer::{MailError, Mailer};
use async_trait::async_trait;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// A mock mailer that records sent emails for testing purposes. Delivery
/// can be failed wholesale (`fail_send`) or for specific recipients
/// (`fail_recipients`), for the partial-failure paths.
#[derive(Debug, Default)]
pub struct MockMailer {
    pub sent: Mutex<Vec<RecordedEmail>>,
    pub fail_send: bool,
    pub fail_recipients: Vec<String>,
}

impl MockMailer {
    pub fn failing_for(recipients: &[&str]) -> Self {
        Self {
            fail_recipients: recipients.iter().map(|r| r.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn sent_to(&self, recipient: &str) -> Vec<RecordedEmail> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|email| email.to == recipient)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        if self.fail_send || self.fail_recipients.iter().any(|r| r == to) {
            return Err(MailError::Other("mock failure".into()));
        }
        self.sent.lock().unwrap().push(RecordedEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}
