//! Entity services: authorize -> validate -> store operation -> shape response.
//!
//! Handlers stay thin; every permission decision in here goes through the
//! `authz` engine with a `Scope` loaded once per request.

pub mod issues;
pub mod projects;
pub mod tasks;
pub mod team_updates;
pub mod teams;
pub mod users;
