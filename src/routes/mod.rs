pub mod auth;
pub mod dashboard;
pub mod health;
pub mod issues;
pub mod projects;
pub mod tasks;
pub mod team_updates;
pub mod teams;
pub mod users;
