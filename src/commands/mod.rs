pub mod get_github_repo;
pub mod get_sha;
pub mod remove_github_credentials;
pub mod resign_ipa;
pub mod set_build_number;
pub mod set_github_credentials;
pub mod set_github_status;
pub mod upload_hockey_app;
pub mod upload_itunes_connect;
pub mod utils;
