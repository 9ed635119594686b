use async_trait::async_trait;
use uuid::Uuid;

use crate::models::issue::{Issue, NewIssue};

/// Store contract for logged issues.
///
/// Saving through `insert`/`update` also refreshes the derived
/// `repeat_offender` flag for every row at the saved address, atomically
/// in the store. `refresh_all_repeat_flags` is the batch recomputation the
/// offender detector runs; it commits all flag changes in one transaction
/// or none of them.
#[async_trait]
pub trait IssueRepository: Send + Sync {
    async fn insert(&self, issue: NewIssue) -> Result<Issue, sqlx::Error>;
    async fn update(&self, issue: &Issue) -> Result<Issue, sqlx::Error>;
    async fn find_by_id(&self, issue_id: Uuid) -> Result<Option<Issue>, sqlx::Error>;
    async fn find_all(&self) -> Result<Vec<Issue>, sqlx::Error>;
    async fn delete(&self, issue_id: Uuid) -> Result<(), sqlx::Error>;

    async fn count_at_address(&self, address: &str) -> Result<i64, sqlx::Error>;

    /// Recompute `repeat_offender` for every issue at `address` from the
    /// current row count. Returns the resulting flag value.
    async fn refresh_repeat_flags_for_address(&self, address: &str) -> Result<bool, sqlx::Error>;

    /// Recompute `repeat_offender` for the whole table and return the
    /// addresses that hold more than one issue, ordered by address.
    async fn refresh_all_repeat_flags(&self) -> Result<Vec<String>, sqlx::Error>;
}
