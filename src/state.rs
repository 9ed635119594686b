use crate::config::Config;
use crate::db::{
    assignment_repository::AssignmentRepository, issue_repository::IssueRepository,
    supervisor_repository::SupervisorRepository,
};
use crate::services::smtp_mailer::Mailer;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub issues: Arc<dyn IssueRepository>,
    pub assignments: Arc<dyn AssignmentRepository>,
    pub supervisors: Arc<dyn SupervisorRepository>,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<Config>,
}
