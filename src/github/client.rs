use reqwest::Client;

use super::GitHubError;
use crate::token::default_headers;

#[derive(Clone)]
#[repr(transparent)]
pub struct GitHub(pub(super) Client);

impl GitHub {
    pub fn new<T: AsRef<str>>(token: T) -> Result<Self, GitHubError> {
        Ok(Self(
            Client::builder()
                .default_headers(default_headers(Some(token.as_ref())))
                .build()?,
        ))
    }
}
