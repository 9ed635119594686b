pub mod assignment_repository;
pub mod issue_repository;
pub mod mock_db;
pub mod postgres_assignment_repository;
pub mod postgres_issue_repository;
pub mod postgres_supervisor_repository;
pub mod supervisor_repository;
