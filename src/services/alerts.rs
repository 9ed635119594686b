use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::issue_repository::IssueRepository;
use crate::db::supervisor_repository::SupervisorRepository;
use crate::models::issue::NewIssue;
use crate::services::smtp_mailer::Mailer;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastOutcome {
    pub delivered: usize,
    pub failed: usize,
}

/// Fans alert messages out to the supervisor roster.
///
/// Sends are issued concurrently and awaited before the call returns; one
/// failing recipient never blocks the rest, and the whole fan-out is
/// bounded by `send_timeout` so an unreachable relay cannot stall a
/// monitor tick indefinitely.
pub struct AlertDispatcher {
    mailer: Arc<dyn Mailer>,
    supervisors: Arc<dyn SupervisorRepository>,
    send_timeout: Duration,
}

impl AlertDispatcher {
    pub fn new(
        mailer: Arc<dyn Mailer>,
        supervisors: Arc<dyn SupervisorRepository>,
        send_timeout: Duration,
    ) -> Self {
        Self {
            mailer,
            supervisors,
            send_timeout,
        }
    }

    /// Deliver one message to every supervisor on record. Roster lookup
    /// failures propagate; delivery failures are logged and counted.
    pub async fn broadcast(
        &self,
        subject: &str,
        body: &str,
    ) -> Result<BroadcastOutcome, sqlx::Error> {
        let roster = self.supervisors.list_all().await?;
        if roster.is_empty() {
            warn!(%subject, "supervisor roster is empty; alert has no recipients");
            return Ok(BroadcastOutcome::default());
        }

        let mut sends = JoinSet::new();
        for supervisor in roster {
            let mailer = Arc::clone(&self.mailer);
            let subject = subject.to_string();
            let body = body.to_string();
            sends.spawn(async move {
                let result = mailer.send(&supervisor.email, &subject, &body).await;
                (supervisor.email, result)
            });
        }

        let mut outcome = BroadcastOutcome::default();
        let drain = async {
            while let Some(joined) = sends.join_next().await {
                match joined {
                    Ok((_, Ok(()))) => outcome.delivered += 1,
                    Ok((email, Err(err))) => {
                        warn!(%email, %err, "alert delivery failed");
                        outcome.failed += 1;
                    }
                    Err(err) => {
                        warn!(%err, "alert send task failed to complete");
                        outcome.failed += 1;
                    }
                }
            }
        };

        let timed_out = timeout(self.send_timeout, drain).await.is_err();
        if timed_out {
            let stalled = sends.len();
            sends.abort_all();
            warn!(%subject, stalled, "alert fan-out timed out; dropping remaining sends");
            outcome.failed += stalled;
        }

        Ok(outcome)
    }

    /// One escalation message per flagged address.
    pub async fn notify_repeat_offenders(
        &self,
        addresses: &[String],
    ) -> Result<(), sqlx::Error> {
        for address in addresses {
            let body = format!("The address {address} has been marked as a repeat offender.");
            let outcome = self
                .broadcast("Repeat Offender Notification", &body)
                .await?;
            info!(%address, delivered = outcome.delivered, "repeat offender notification sent");
        }
        Ok(())
    }

    /// A route reported as running behind.
    pub async fn route_delayed(
        &self,
        route_id: Uuid,
        location: &str,
    ) -> Result<BroadcastOutcome, sqlx::Error> {
        let subject = format!("Route {route_id} Delayed Alert");
        let body = format!(
            "Route {route_id} has been reported as delayed at location: {location}. \
             Please investigate."
        );
        self.broadcast(&subject, &body).await
    }

    /// A problem reported mid-route. Alerts supervisors and also logs the
    /// problem as an issue so it enters repeat-offender tracking.
    pub async fn route_issue_reported(
        &self,
        issues: &dyn IssueRepository,
        crew_id: Uuid,
        route_id: Uuid,
        location: &str,
    ) -> Result<BroadcastOutcome, sqlx::Error> {
        let subject = format!("Issue Reported on Route {route_id}");
        let body = format!(
            "An issue has been reported on Route {route_id} at location: {location}. \
             Please review and take necessary actions."
        );
        let outcome = self.broadcast(&subject, &body).await?;

        issues
            .insert(NewIssue {
                crew_id,
                route_id,
                address: location.to_string(),
                description: body,
                issue_type: "Route Issue".to_string(),
                date_reported: OffsetDateTime::now_utc(),
            })
            .await?;

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::mock_db::{MockIssueRepository, StaticSupervisorRepository};
    use crate::services::smtp_mailer::{MailError, MockMailer};
    use async_trait::async_trait;

    fn dispatcher(
        mailer: Arc<dyn Mailer>,
        supervisors: Arc<dyn SupervisorRepository>,
    ) -> AlertDispatcher {
        AlertDispatcher::new(mailer, supervisors, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn broadcast_reaches_every_supervisor() {
        let mailer = Arc::new(MockMailer::default());
        let roster = Arc::new(StaticSupervisorRepository::with_emails(&[
            "alpha@example.com",
            "bravo@example.com",
        ]));

        let outcome = dispatcher(mailer.clone(), roster)
            .broadcast("Status Update Missing", "details")
            .await
            .unwrap();

        assert_eq!(outcome, BroadcastOutcome { delivered: 2, failed: 0 });
        assert_eq!(mailer.sent.lock().unwrap().len(), 2);
        assert_eq!(mailer.sent_to("alpha@example.com").len(), 1);
        assert_eq!(mailer.sent_to("bravo@example.com").len(), 1);
    }

    #[tokio::test]
    async fn one_failed_recipient_does_not_block_the_rest() {
        let mailer = Arc::new(MockMailer::failing_for(&["alpha@example.com"]));
        let roster = Arc::new(StaticSupervisorRepository::with_emails(&[
            "alpha@example.com",
            "bravo@example.com",
        ]));

        let outcome = dispatcher(mailer.clone(), roster)
            .broadcast("Status Update Missing", "details")
            .await
            .unwrap();

        assert_eq!(outcome, BroadcastOutcome { delivered: 1, failed: 1 });
        assert!(mailer.sent_to("alpha@example.com").is_empty());
        assert_eq!(mailer.sent_to("bravo@example.com").len(), 1);
    }

    #[tokio::test]
    async fn roster_errors_propagate() {
        let mailer = Arc::new(MockMailer::default());
        let roster = Arc::new(StaticSupervisorRepository {
            should_fail: true,
            ..Default::default()
        });

        assert!(dispatcher(mailer, roster)
            .broadcast("subject", "body")
            .await
            .is_err());
    }

    struct StallingMailer;

    #[async_trait]
    impl Mailer for StallingMailer {
        async fn send(&self, _: &str, _: &str, _: &str) -> Result<(), MailError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn fan_out_times_out_instead_of_stalling() {
        let roster = Arc::new(StaticSupervisorRepository::with_emails(&[
            "alpha@example.com",
            "bravo@example.com",
        ]));
        let dispatcher =
            AlertDispatcher::new(Arc::new(StallingMailer), roster, Duration::from_millis(50));

        let outcome = dispatcher.broadcast("subject", "body").await.unwrap();
        assert_eq!(outcome, BroadcastOutcome { delivered: 0, failed: 2 });
    }

    #[tokio::test]
    async fn repeat_offender_notice_goes_out_per_address() {
        let mailer = Arc::new(MockMailer::default());
        let roster = Arc::new(StaticSupervisorRepository::with_emails(&[
            "alpha@example.com",
            "bravo@example.com",
        ]));

        dispatcher(mailer.clone(), roster)
            .notify_repeat_offenders(&[
                "123 Test Street".to_string(),
                "456 Other Ave".to_string(),
            ])
            .await
            .unwrap();

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 4);
        assert!(sent
            .iter()
            .all(|email| email.subject == "Repeat Offender Notification"));
        assert!(sent
            .iter()
            .any(|email| email.body.contains("123 Test Street")));
    }

    #[tokio::test]
    async fn route_issue_reported_alerts_and_logs_an_issue() {
        let mailer = Arc::new(MockMailer::default());
        let roster = Arc::new(StaticSupervisorRepository::with_emails(&["alpha@example.com"]));
        let issues = MockIssueRepository::default();
        let crew_id = Uuid::new_v4();
        let route_id = Uuid::new_v4();

        let outcome = dispatcher(mailer.clone(), roster)
            .route_issue_reported(&issues, crew_id, route_id, "123 Test Street")
            .await
            .unwrap();

        assert_eq!(outcome.delivered, 1);
        let stored = issues.issues.lock().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].address, "123 Test Street");
        assert_eq!(stored[0].issue_type, "Route Issue");
    }
}
