use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// A problem logged by dispatch during a collection route.
///
/// `repeat_offender` is derived: it is true exactly when more than one
/// issue shares this row's `address`. The flag is recomputed in the store
/// whenever an issue at the address is saved, and by the batch detector in
/// `services::offender`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Issue {
    pub id: Uuid,
    pub crew_id: Uuid,
    pub route_id: Uuid,
    pub address: String,
    pub description: String,
    pub issue_type: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date_reported: OffsetDateTime,
    pub repeat_offender: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIssue {
    pub crew_id: Uuid,
    pub route_id: Uuid,
    pub address: String,
    pub description: String,
    pub issue_type: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date_reported: OffsetDateTime,
}
