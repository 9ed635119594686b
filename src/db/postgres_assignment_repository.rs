use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::assignment_repository::AssignmentRepository;
use crate::models::assignment::{Assignment, CheckpointLabel, NewAssignment, StatusUpdates};

pub struct PostgresAssignmentRepository {
    pub pool: PgPool,
}

const ASSIGNMENT_COLUMNS: &str = "id, crew_id, route_id, client_id, zone_id, week_number, doc, \
                                  dow, week_type, start_time, end_time, completion_time, \
                                  attendance_confirmed, ppe_compliance, status_updates";

#[async_trait]
impl AssignmentRepository for PostgresAssignmentRepository {
    async fn insert(&self, assignment: NewAssignment) -> Result<Assignment, sqlx::Error> {
        sqlx::query_as::<_, Assignment>(&format!(
            r#"
            INSERT INTO assignments (
                crew_id, route_id, client_id, zone_id, week_number, doc, dow, week_type,
                start_time, end_time, completion_time, attendance_confirmed, ppe_compliance,
                status_updates
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NULL, 0.0, false, false, $10)
            RETURNING {ASSIGNMENT_COLUMNS}
            "#
        ))
        .bind(assignment.crew_id)
        .bind(assignment.route_id)
        .bind(assignment.client_id)
        .bind(assignment.zone_id)
        .bind(assignment.week_number)
        .bind(assignment.doc)
        .bind(&assignment.dow)
        .bind(assignment.week_type.as_str())
        .bind(assignment.start_time)
        .bind(Json(StatusUpdates::default()))
        .fetch_one(&self.pool)
        .await
    }

    async fn find_by_id(&self, assignment_id: Uuid) -> Result<Option<Assignment>, sqlx::Error> {
        sqlx::query_as::<_, Assignment>(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE id = $1"
        ))
        .bind(assignment_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_all(&self) -> Result<Vec<Assignment>, sqlx::Error> {
        sqlx::query_as::<_, Assignment>(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments ORDER BY doc DESC, start_time"
        ))
        .fetch_all(&self.pool)
        .await
    }

    async fn find_all_for_date(&self, doc: NaiveDate) -> Result<Vec<Assignment>, sqlx::Error> {
        sqlx::query_as::<_, Assignment>(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE doc = $1 ORDER BY start_time"
        ))
        .bind(doc)
        .fetch_all(&self.pool)
        .await
    }

    async fn delete(&self, assignment_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM assignments WHERE id = $1")
            .bind(assignment_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_attendance(
        &self,
        assignment_id: Uuid,
        attendance_confirmed: bool,
        ppe_compliance: bool,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE assignments SET attendance_confirmed = $2, ppe_compliance = $3 WHERE id = $1",
        )
        .bind(assignment_id)
        .bind(attendance_confirmed)
        .bind(ppe_compliance)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_status(
        &self,
        assignment_id: Uuid,
        label: CheckpointLabel,
        status: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE assignments
            SET status_updates = jsonb_set(status_updates, ARRAY[$2], to_jsonb($3::text))
            WHERE id = $1
            "#,
        )
        .bind(assignment_id)
        .bind(label.as_str())
        .bind(status)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_completion(
        &self,
        assignment_id: Uuid,
        end_time: NaiveTime,
    ) -> Result<(), sqlx::Error> {
        // Completion hours derive from the stored start_time, on the same
        // calendar date as doc, so compute them in the statement itself.
        sqlx::query(
            r#"
            UPDATE assignments
            SET end_time = $2,
                completion_time = EXTRACT(EPOCH FROM ($2 - start_time)) / 3600.0
            WHERE id = $1
            "#,
        )
        .bind(assignment_id)
        .bind(end_time)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
