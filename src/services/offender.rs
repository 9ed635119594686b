use thiserror::Error;
use tracing::info;

use crate::db::issue_repository::IssueRepository;
use crate::models::issue::{Issue, NewIssue};

#[derive(Debug, Error)]
pub enum ReportIssueError {
    #[error("address and issue type are required")]
    MissingFields,
    #[error("database error: {0}")]
    Store(#[from] sqlx::Error),
}

/// Recompute the repeat-offender flag for every logged issue and return
/// the addresses holding more than one issue.
///
/// The store applies the whole pass in one transaction, so a failure
/// leaves every flag as it was. Running it twice on an unchanged issue
/// set yields the same flags and the same address list.
pub async fn detect_repeat_offenders(
    issues: &dyn IssueRepository,
) -> Result<Vec<String>, sqlx::Error> {
    let offenders = issues.refresh_all_repeat_flags().await?;
    if !offenders.is_empty() {
        info!(
            count = offenders.len(),
            "flagged repeat offender addresses"
        );
    }
    Ok(offenders)
}

/// Whether `address` already holds more than one logged issue.
pub async fn is_repeat_address(
    issues: &dyn IssueRepository,
    address: &str,
) -> Result<bool, sqlx::Error> {
    Ok(issues.count_at_address(address).await? > 1)
}

/// Validate and persist a dispatcher-reported issue. Saving also
/// refreshes the repeat flag for every issue at the address, so the
/// returned row carries the up-to-date flag.
pub async fn report_issue(
    issues: &dyn IssueRepository,
    new_issue: NewIssue,
) -> Result<Issue, ReportIssueError> {
    if new_issue.address.trim().is_empty() || new_issue.issue_type.trim().is_empty() {
        return Err(ReportIssueError::MissingFields);
    }

    let issue = issues.insert(new_issue).await?;
    info!(
        issue_id = %issue.id,
        address = %issue.address,
        repeat_offender = issue.repeat_offender,
        "issue recorded"
    );
    Ok(issue)
}

/// Validate and persist an edit to an existing issue. Moving an issue to
/// a different address refreshes the flags at both the old and the new
/// address.
pub async fn amend_issue(
    issues: &dyn IssueRepository,
    issue: &Issue,
) -> Result<Issue, ReportIssueError> {
    if issue.address.trim().is_empty() || issue.issue_type.trim().is_empty() {
        return Err(ReportIssueError::MissingFields);
    }
    Ok(issues.update(issue).await?)
}
