pub mod alerts;
pub mod offender;
pub mod smtp_mailer;
