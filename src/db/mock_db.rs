use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use crate::db::assignment_repository::AssignmentRepository;
use crate::db::issue_repository::IssueRepository;
use crate::db::supervisor_repository::SupervisorRepository;
use crate::models::assignment::{Assignment, CheckpointLabel, NewAssignment, StatusUpdates};
use crate::models::issue::{Issue, NewIssue};
use crate::models::supervisor::Supervisor;

fn mock_failure() -> sqlx::Error {
    sqlx::Error::Protocol("mock store failure".into())
}

/// In-memory issue store mirroring the Postgres repository's semantics,
/// including the atomic repeat-flag recomputation on every save.
#[derive(Default)]
pub struct MockIssueRepository {
    pub issues: Mutex<Vec<Issue>>,
    pub should_fail: bool,
}

impl MockIssueRepository {
    pub fn with_issues(issues: Vec<Issue>) -> Self {
        Self {
            issues: Mutex::new(issues),
            should_fail: false,
        }
    }

    fn refresh_address(issues: &mut [Issue], address: &str) -> bool {
        let occurrences = issues.iter().filter(|i| i.address == address).count();
        let flag = occurrences > 1;
        for issue in issues.iter_mut().filter(|i| i.address == address) {
            issue.repeat_offender = flag;
        }
        flag
    }
}

#[async_trait]
impl IssueRepository for MockIssueRepository {
    async fn insert(&self, issue: NewIssue) -> Result<Issue, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        let mut issues = self.issues.lock().unwrap();
        let id = Uuid::new_v4();
        issues.push(Issue {
            id,
            crew_id: issue.crew_id,
            route_id: issue.route_id,
            address: issue.address.clone(),
            description: issue.description,
            issue_type: issue.issue_type,
            date_reported: issue.date_reported,
            repeat_offender: false,
        });
        Self::refresh_address(&mut issues, &issue.address);
        Ok(issues.iter().find(|i| i.id == id).cloned().unwrap())
    }

    async fn update(&self, issue: &Issue) -> Result<Issue, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        let mut issues = self.issues.lock().unwrap();
        let previous_address = issues
            .iter()
            .find(|i| i.id == issue.id)
            .map(|i| i.address.clone())
            .ok_or(sqlx::Error::RowNotFound)?;
        for stored in issues.iter_mut().filter(|i| i.id == issue.id) {
            *stored = issue.clone();
        }
        if previous_address != issue.address {
            Self::refresh_address(&mut issues, &previous_address);
        }
        Self::refresh_address(&mut issues, &issue.address);
        Ok(issues.iter().find(|i| i.id == issue.id).cloned().unwrap())
    }

    async fn find_by_id(&self, issue_id: Uuid) -> Result<Option<Issue>, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        Ok(self
            .issues
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.id == issue_id)
            .cloned())
    }

    async fn find_all(&self) -> Result<Vec<Issue>, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        Ok(self.issues.lock().unwrap().clone())
    }

    async fn delete(&self, issue_id: Uuid) -> Result<(), sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        let mut issues = self.issues.lock().unwrap();
        if let Some(pos) = issues.iter().position(|i| i.id == issue_id) {
            let address = issues.remove(pos).address;
            Self::refresh_address(&mut issues, &address);
        }
        Ok(())
    }

    async fn count_at_address(&self, address: &str) -> Result<i64, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        Ok(self
            .issues
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.address == address)
            .count() as i64)
    }

    async fn refresh_repeat_flags_for_address(&self, address: &str) -> Result<bool, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        let mut issues = self.issues.lock().unwrap();
        Ok(Self::refresh_address(&mut issues, address))
    }

    async fn refresh_all_repeat_flags(&self) -> Result<Vec<String>, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        let mut issues = self.issues.lock().unwrap();
        let addresses: Vec<String> = issues.iter().map(|i| i.address.clone()).collect();
        let mut offenders: Vec<String> = Vec::new();
        for address in &addresses {
            if Self::refresh_address(&mut issues, address) && !offenders.contains(address) {
                offenders.push(address.clone());
            }
        }
        offenders.sort();
        Ok(offenders)
    }
}

/// In-memory assignment store for monitor tests.
#[derive(Default)]
pub struct MockAssignmentRepository {
    pub assignments: Mutex<Vec<Assignment>>,
    pub should_fail: bool,
}

impl MockAssignmentRepository {
    pub fn with_assignments(assignments: Vec<Assignment>) -> Self {
        Self {
            assignments: Mutex::new(assignments),
            should_fail: false,
        }
    }
}

#[async_trait]
impl AssignmentRepository for MockAssignmentRepository {
    async fn insert(&self, assignment: NewAssignment) -> Result<Assignment, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        let stored = Assignment {
            id: Uuid::new_v4(),
            crew_id: assignment.crew_id,
            route_id: assignment.route_id,
            client_id: assignment.client_id,
            zone_id: assignment.zone_id,
            week_number: assignment.week_number,
            doc: assignment.doc,
            dow: assignment.dow,
            week_type: assignment.week_type,
            start_time: assignment.start_time,
            end_time: None,
            completion_time: 0.0,
            attendance_confirmed: false,
            ppe_compliance: false,
            status_updates: StatusUpdates::default(),
        };
        self.assignments.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, assignment_id: Uuid) -> Result<Option<Assignment>, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        Ok(self
            .assignments
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == assignment_id)
            .cloned())
    }

    async fn find_all(&self) -> Result<Vec<Assignment>, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        Ok(self.assignments.lock().unwrap().clone())
    }

    async fn find_all_for_date(&self, doc: NaiveDate) -> Result<Vec<Assignment>, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        Ok(self
            .assignments
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.doc == doc)
            .cloned()
            .collect())
    }

    async fn delete(&self, assignment_id: Uuid) -> Result<(), sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        self.assignments
            .lock()
            .unwrap()
            .retain(|a| a.id != assignment_id);
        Ok(())
    }

    async fn mark_attendance(
        &self,
        assignment_id: Uuid,
        attendance_confirmed: bool,
        ppe_compliance: bool,
    ) -> Result<(), sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        let mut assignments = self.assignments.lock().unwrap();
        for assignment in assignments.iter_mut().filter(|a| a.id == assignment_id) {
            assignment.attendance_confirmed = attendance_confirmed;
            assignment.ppe_compliance = ppe_compliance;
        }
        Ok(())
    }

    async fn update_status(
        &self,
        assignment_id: Uuid,
        label: CheckpointLabel,
        status: &str,
    ) -> Result<(), sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        let mut assignments = self.assignments.lock().unwrap();
        for assignment in assignments.iter_mut().filter(|a| a.id == assignment_id) {
            assignment.status_updates.set(label, status);
        }
        Ok(())
    }

    async fn mark_completion(
        &self,
        assignment_id: Uuid,
        end_time: NaiveTime,
    ) -> Result<(), sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        let mut assignments = self.assignments.lock().unwrap();
        for assignment in assignments.iter_mut().filter(|a| a.id == assignment_id) {
            assignment.end_time = Some(end_time);
            assignment.completion_time =
                Assignment::completion_hours(assignment.start_time, end_time);
        }
        Ok(())
    }
}

/// Fixed roster for tests.
#[derive(Default)]
pub struct StaticSupervisorRepository {
    pub supervisors: Mutex<Vec<Supervisor>>,
    pub should_fail: bool,
}

impl StaticSupervisorRepository {
    pub fn with_emails(emails: &[&str]) -> Self {
        let supervisors = emails
            .iter()
            .map(|email| Supervisor {
                id: Uuid::new_v4(),
                name: email.split('@').next().unwrap_or(email).to_string(),
                email: email.to_string(),
                phone: None,
            })
            .collect();
        Self {
            supervisors: Mutex::new(supervisors),
            should_fail: false,
        }
    }
}

#[async_trait]
impl SupervisorRepository for StaticSupervisorRepository {
    async fn list_all(&self) -> Result<Vec<Supervisor>, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        Ok(self.supervisors.lock().unwrap().clone())
    }

    async fn insert(
        &self,
        name: &str,
        email: &str,
        phone: Option<&str>,
    ) -> Result<Supervisor, sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        let supervisor = Supervisor {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.map(|p| p.to_string()),
        };
        self.supervisors.lock().unwrap().push(supervisor.clone());
        Ok(supervisor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::assignment::WeekType;

    fn new_assignment() -> NewAssignment {
        NewAssignment {
            crew_id: Uuid::new_v4(),
            route_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            zone_id: Uuid::new_v4(),
            week_number: 10,
            doc: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
            dow: "Monday".to_string(),
            week_type: WeekType::Regular,
            start_time: NaiveTime::from_hms_opt(6, 30, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn dispatch_day_lifecycle() {
        let repo = MockAssignmentRepository::default();
        let created = repo.insert(new_assignment()).await.unwrap();
        assert!(!created.attendance_confirmed);
        assert!(created.status_updates.get(CheckpointLabel::ElevenAm).is_none());

        repo.mark_attendance(created.id, true, true).await.unwrap();
        repo.update_status(created.id, CheckpointLabel::ElevenAm, "On track")
            .await
            .unwrap();
        repo.mark_completion(created.id, NaiveTime::from_hms_opt(14, 0, 0).unwrap())
            .await
            .unwrap();

        let done = repo.find_by_id(created.id).await.unwrap().unwrap();
        assert!(done.attendance_confirmed);
        assert!(done.ppe_compliance);
        assert_eq!(
            done.status_updates.get(CheckpointLabel::ElevenAm),
            Some("On track")
        );
        assert_eq!(done.end_time, NaiveTime::from_hms_opt(14, 0, 0));
        assert!((done.completion_time - 7.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn roster_additions_show_up_in_list_all() {
        let repo = StaticSupervisorRepository::default();
        repo.insert("Dana", "dana@example.com", Some("5550100"))
            .await
            .unwrap();

        let roster = repo.list_all().await.unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].email, "dana@example.com");
        assert_eq!(roster[0].phone.as_deref(), Some("5550100"));
    }

    #[tokio::test]
    async fn assignments_filter_by_collection_date() {
        let repo = MockAssignmentRepository::default();
        let mut monday = new_assignment();
        monday.doc = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let mut tuesday = new_assignment();
        tuesday.doc = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
        repo.insert(monday).await.unwrap();
        repo.insert(tuesday).await.unwrap();

        let found = repo
            .find_all_for_date(NaiveDate::from_ymd_opt(2025, 3, 3).unwrap())
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }
}
