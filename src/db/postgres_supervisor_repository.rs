use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::supervisor_repository::SupervisorRepository;
use crate::models::supervisor::Supervisor;

pub struct PostgresSupervisorRepository {
    pub pool: PgPool,
}

#[async_trait]
impl SupervisorRepository for PostgresSupervisorRepository {
    async fn list_all(&self) -> Result<Vec<Supervisor>, sqlx::Error> {
        sqlx::query_as::<_, Supervisor>(
            "SELECT id, name, email, phone FROM supervisors ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn insert(
        &self,
        name: &str,
        email: &str,
        phone: Option<&str>,
    ) -> Result<Supervisor, sqlx::Error> {
        sqlx::query_as::<_, Supervisor>(
            r#"
            INSERT INTO supervisors (name, email, phone)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, phone
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(phone)
        .fetch_one(&self.pool)
        .await
    }
}
