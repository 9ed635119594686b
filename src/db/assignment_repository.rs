use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use crate::models::assignment::{Assignment, CheckpointLabel, NewAssignment};

/// Store contract for daily crew assignments.
///
/// The monitor only reads (`find_all_for_date`); the mutation methods are
/// the dispatch-side operations performed throughout the collection day.
#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    async fn insert(&self, assignment: NewAssignment) -> Result<Assignment, sqlx::Error>;
    async fn find_by_id(&self, assignment_id: Uuid) -> Result<Option<Assignment>, sqlx::Error>;
    async fn find_all(&self) -> Result<Vec<Assignment>, sqlx::Error>;
    async fn find_all_for_date(&self, doc: NaiveDate) -> Result<Vec<Assignment>, sqlx::Error>;
    async fn delete(&self, assignment_id: Uuid) -> Result<(), sqlx::Error>;

    async fn mark_attendance(
        &self,
        assignment_id: Uuid,
        attendance_confirmed: bool,
        ppe_compliance: bool,
    ) -> Result<(), sqlx::Error>;

    /// Record the operator's status text for one checkpoint slot.
    async fn update_status(
        &self,
        assignment_id: Uuid,
        label: CheckpointLabel,
        status: &str,
    ) -> Result<(), sqlx::Error>;

    /// Set `end_time` and the derived completion hours.
    async fn mark_completion(
        &self,
        assignment_id: Uuid,
        end_time: NaiveTime,
    ) -> Result<(), sqlx::Error>;
}
