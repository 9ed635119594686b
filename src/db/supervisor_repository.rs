use async_trait::async_trait;

use crate::models::supervisor::Supervisor;

/// The escalation roster. Every alert the monitor raises goes to each
/// supervisor returned by `list_all`.
#[async_trait]
pub trait SupervisorRepository: Send + Sync {
    async fn list_all(&self) -> Result<Vec<Supervisor>, sqlx::Error>;
    async fn insert(&self, name: &str, email: &str, phone: Option<&str>)
        -> Result<Supervisor, sqlx::Error>;
}
