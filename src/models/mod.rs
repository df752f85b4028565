pub mod issue;
pub mod project;
pub mod task;
pub mod team;
pub mod team_update;
pub mod user;
