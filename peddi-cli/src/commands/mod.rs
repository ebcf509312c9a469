//! CLI command implementations

pub mod projects;
pub mod prs;

pub use projects::ProjectsArgs;
pub use prs::PrsArgs;
