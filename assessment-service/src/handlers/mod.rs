//! HTTP handlers for the assessment service.

pub mod health;
pub mod reports;
