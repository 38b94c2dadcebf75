//! Business rules. Handlers parse and authenticate; services decide.

pub mod admin;
pub mod auth;
pub mod contracts;
pub mod disputes;
pub mod invoices;
pub mod jobs;
pub mod messages;
pub mod notifications;
pub mod organizations;
pub mod payments;
pub mod proposals;
pub mod reconciliation;
pub mod reviews;
pub mod users;
