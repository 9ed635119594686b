use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::db::issue_repository::IssueRepository;
use crate::models::issue::{Issue, NewIssue};

pub struct PostgresIssueRepository {
    pub pool: PgPool,
}

const ISSUE_COLUMNS: &str = "id, crew_id, route_id, address, description, issue_type, \
                             date_reported, repeat_offender";

/// Recompute the flag for every row at `address` in one statement, so a
/// concurrent save at the same address cannot observe a half-applied
/// count.
async fn refresh_address_flags(
    conn: &mut PgConnection,
    address: &str,
) -> Result<bool, sqlx::Error> {
    let flag: Option<bool> = sqlx::query_scalar(
        r#"
        UPDATE issues
        SET repeat_offender = agg.occurrences > 1
        FROM (SELECT COUNT(*) AS occurrences FROM issues WHERE address = $1) AS agg
        WHERE issues.address = $1
        RETURNING issues.repeat_offender
        "#,
    )
    .bind(address)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(flag.unwrap_or(false))
}

#[async_trait]
impl IssueRepository for PostgresIssueRepository {
    async fn insert(&self, issue: NewIssue) -> Result<Issue, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO issues (crew_id, route_id, address, description, issue_type, date_reported)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(issue.crew_id)
        .bind(issue.route_id)
        .bind(&issue.address)
        .bind(&issue.description)
        .bind(&issue.issue_type)
        .bind(issue.date_reported)
        .fetch_one(&mut *tx)
        .await?;

        refresh_address_flags(&mut *tx, &issue.address).await?;

        let saved = sqlx::query_as::<_, Issue>(&format!(
            "SELECT {ISSUE_COLUMNS} FROM issues WHERE id = $1"
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(saved)
    }

    async fn update(&self, issue: &Issue) -> Result<Issue, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let previous_address: String =
            sqlx::query_scalar("SELECT address FROM issues WHERE id = $1")
                .bind(issue.id)
                .fetch_one(&mut *tx)
                .await?;

        sqlx::query(
            r#"
            UPDATE issues
            SET crew_id = $2,
                route_id = $3,
                address = $4,
                description = $5,
                issue_type = $6,
                date_reported = $7
            WHERE id = $1
            "#,
        )
        .bind(issue.id)
        .bind(issue.crew_id)
        .bind(issue.route_id)
        .bind(&issue.address)
        .bind(&issue.description)
        .bind(&issue.issue_type)
        .bind(issue.date_reported)
        .execute(&mut *tx)
        .await?;

        // A moved issue changes the count at both addresses.
        if previous_address != issue.address {
            refresh_address_flags(&mut *tx, &previous_address).await?;
        }
        refresh_address_flags(&mut *tx, &issue.address).await?;

        let saved = sqlx::query_as::<_, Issue>(&format!(
            "SELECT {ISSUE_COLUMNS} FROM issues WHERE id = $1"
        ))
        .bind(issue.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(saved)
    }

    async fn find_by_id(&self, issue_id: Uuid) -> Result<Option<Issue>, sqlx::Error> {
        sqlx::query_as::<_, Issue>(&format!(
            "SELECT {ISSUE_COLUMNS} FROM issues WHERE id = $1"
        ))
        .bind(issue_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_all(&self) -> Result<Vec<Issue>, sqlx::Error> {
        sqlx::query_as::<_, Issue>(&format!(
            "SELECT {ISSUE_COLUMNS} FROM issues ORDER BY date_reported DESC"
        ))
        .fetch_all(&self.pool)
        .await
    }

    async fn delete(&self, issue_id: Uuid) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let address: Option<String> =
            sqlx::query_scalar("DELETE FROM issues WHERE id = $1 RETURNING address")
                .bind(issue_id)
                .fetch_optional(&mut *tx)
                .await?;

        // Removing a row can drop the remaining issue at the address back
        // below the repeat threshold.
        if let Some(address) = address {
            refresh_address_flags(&mut *tx, &address).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn count_at_address(&self, address: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM issues WHERE address = $1")
            .bind(address)
            .fetch_one(&self.pool)
            .await
    }

    async fn refresh_repeat_flags_for_address(&self, address: &str) -> Result<bool, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        refresh_address_flags(&mut *conn, address).await
    }

    async fn refresh_all_repeat_flags(&self) -> Result<Vec<String>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE issues
            SET repeat_offender = agg.occurrences > 1
            FROM (SELECT address, COUNT(*) AS occurrences FROM issues GROUP BY address) AS agg
            WHERE issues.address = agg.address
            "#,
        )
        .execute(&mut *tx)
        .await?;

        let offenders: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT address
            FROM issues
            GROUP BY address
            HAVING COUNT(*) > 1
            ORDER BY address
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(offenders)
    }
}
