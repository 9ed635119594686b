use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A member of the escalation roster. Alerts go to every supervisor on
/// record; `phone` is kept for an SMS channel the mail transport does not
/// cover yet.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Supervisor {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}
