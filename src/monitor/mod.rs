use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::AlertPolicy;
use crate::db::assignment_repository::AssignmentRepository;
use crate::db::issue_repository::IssueRepository;
use crate::models::assignment::{Assignment, CheckpointLabel};
use crate::services::alerts::AlertDispatcher;
use crate::services::offender;
use crate::state::AppState;
use crate::utils::schedule::{checkpoint_at, next_trigger_after, CheckpointKind};

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("database error: {0}")]
    Store(#[from] sqlx::Error),
}

/// Which alert an assignment drew on a given day. Keys the re-alert
/// suppression under `AlertPolicy::Once`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum AlertSlot {
    Attendance,
    Status(CheckpointLabel),
}

#[derive(Default)]
struct FiredAlerts {
    date: Option<NaiveDate>,
    keys: HashSet<(Uuid, AlertSlot)>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    /// Assignments fetched for the day and checked against the gate.
    pub evaluated: usize,
    /// Assignments that drew an alert broadcast this tick.
    pub alerted: usize,
    /// Addresses the offender sweep reported this tick.
    pub swept_offenders: usize,
}

/// Watches the day's assignments at fixed checkpoint times and escalates
/// missing attendance confirmations and status updates to the supervisor
/// roster. Also runs the daily repeat-offender sweep.
pub struct Monitor {
    assignments: Arc<dyn AssignmentRepository>,
    issues: Arc<dyn IssueRepository>,
    dispatcher: AlertDispatcher,
    policy: AlertPolicy,
    timezone: Tz,
    offender_sweep_time: NaiveTime,
    fired: Mutex<FiredAlerts>,
}

impl Monitor {
    pub fn new(state: &AppState) -> Self {
        let dispatcher = AlertDispatcher::new(
            state.mailer.clone(),
            state.supervisors.clone(),
            state.config.alert_send_timeout,
        );
        Self {
            assignments: state.assignments.clone(),
            issues: state.issues.clone(),
            dispatcher,
            policy: state.config.alert_policy,
            timezone: state.config.timezone,
            offender_sweep_time: state.config.offender_sweep_time,
            fired: Mutex::new(FiredAlerts::default()),
        }
    }

    /// Evaluate one tick at the injected wall-clock instant.
    ///
    /// A `now` that matches no checkpoint (and is not the sweep time) is
    /// a no-op. A store failure fetching the day's assignments aborts
    /// only this invocation; the next tick retries on its own.
    pub async fn run_periodic_check(&self, now: DateTime<Tz>) -> Result<TickSummary, MonitorError> {
        let mut summary = TickSummary::default();
        let minute = now.time();

        if same_minute(minute, self.offender_sweep_time) {
            summary.swept_offenders = self.run_offender_sweep().await;
        }

        let Some(checkpoint) = checkpoint_at(minute) else {
            return Ok(summary);
        };

        let today = now.date_naive();
        let assignments = self.assignments.find_all_for_date(today).await?;
        summary.evaluated = assignments.len();
        debug!(
            date = %today,
            checkpoint = ?checkpoint.kind,
            count = assignments.len(),
            "evaluating assignments at checkpoint"
        );

        for assignment in &assignments {
            let Some((slot, subject, body)) = alert_for(assignment, checkpoint.kind) else {
                continue;
            };
            if !self.should_fire(today, assignment.id, slot) {
                continue;
            }

            let outcome = self.dispatcher.broadcast(&subject, &body).await?;
            summary.alerted += 1;
            info!(
                assignment_id = %assignment.id,
                crew_id = %assignment.crew_id,
                slot = ?slot,
                delivered = outcome.delivered,
                failed = outcome.failed,
                "assignment alert raised"
            );
        }

        Ok(summary)
    }

    /// Flag repeat offenders and notify supervisors about any found.
    /// Sweep failures are logged, never fatal to the surrounding tick.
    async fn run_offender_sweep(&self) -> usize {
        match offender::detect_repeat_offenders(self.issues.as_ref()).await {
            Ok(offenders) => {
                if offenders.is_empty() {
                    return 0;
                }
                match self.dispatcher.notify_repeat_offenders(&offenders).await {
                    Ok(()) => offenders.len(),
                    Err(err) => {
                        error!(?err, "repeat offender notification failed");
                        0
                    }
                }
            }
            Err(err) => {
                error!(?err, "repeat offender sweep failed");
                0
            }
        }
    }

    /// Whether this (assignment, slot) pair should alert today. Under
    /// `Once`, a pair alerts the first time only; the record resets when
    /// the date rolls over, so it cannot grow without bound.
    fn should_fire(&self, today: NaiveDate, assignment_id: Uuid, slot: AlertSlot) -> bool {
        let mut fired = self.fired.lock().unwrap();
        if fired.date != Some(today) {
            fired.date = Some(today);
            fired.keys.clear();
        }
        let fresh = fired.keys.insert((assignment_id, slot));
        match self.policy {
            AlertPolicy::EveryTick => true,
            AlertPolicy::Once => fresh,
        }
    }

    /// Run until the shutdown signal flips. Each iteration computes the
    /// next checkpoint instant directly and sleeps until it, so there is
    /// no poll interval to drift past a checkpoint.
    pub fn spawn(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                timezone = %self.timezone,
                policy = ?self.policy,
                "starting assignment monitor"
            );
            loop {
                let now = chrono::Utc::now().with_timezone(&self.timezone);
                let next = next_trigger_after(now, &[self.offender_sweep_time]);
                let wait = (next - now).to_std().unwrap_or_default();
                debug!(next = %next, "monitor sleeping until next checkpoint");

                tokio::select! {
                    _ = sleep(wait) => {
                        if let Err(err) = self.run_periodic_check(next).await {
                            error!(?err, at = %next, "monitor tick failed");
                        }
                    }
                    _ = shutdown.changed() => {
                        info!("assignment monitor stopping");
                        break;
                    }
                }
            }
        })
    }
}

fn same_minute(a: NaiveTime, b: NaiveTime) -> bool {
    use chrono::Timelike;
    a.hour() == b.hour() && a.minute() == b.minute()
}

/// The alert an assignment draws at a checkpoint, if its data is missing.
fn alert_for(
    assignment: &Assignment,
    kind: CheckpointKind,
) -> Option<(AlertSlot, String, String)> {
    match kind {
        CheckpointKind::AttendanceGate => {
            if assignment.attendance_confirmed && assignment.ppe_compliance {
                return None;
            }
            let body = format!(
                "Crew ID: {} for Assignment ID: {} has not confirmed attendance \
                 or PPE compliance by 8 AM. Please follow up immediately.",
                assignment.crew_id, assignment.id
            );
            Some((
                AlertSlot::Attendance,
                "Attendance/PPE Compliance Missing".to_string(),
                body,
            ))
        }
        CheckpointKind::StatusGate(label) => {
            if assignment.status_updates.get(label).is_some() {
                return None;
            }
            let body = format!(
                "Status update missing for Crew ID: {} on Assignment ID: {} \
                 at checkpoint: {}. Please follow up.",
                assignment.crew_id, assignment.id, label
            );
            Some((
                AlertSlot::Status(label),
                "Status Update Missing".to_string(),
                body,
            ))
        }
    }
}
