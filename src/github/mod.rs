mod client;
mod error;
mod repository;
pub mod rest;

pub use client::GitHub;
pub use error::GitHubError;
pub use repository::Repository;

pub const GITHUB_HOST: &str = "github.com";
