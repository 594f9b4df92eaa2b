//! HTTP handlers for all web routes.

pub mod drugs;
pub mod health;
pub mod home;
pub mod interactions;
