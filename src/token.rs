use std::borrow::Cow;

use anstream::println;
use bon::bon;
use inquire::{InquireError, Password, error::InquireResult, validator::Validation};
use owo_colors::OwoColorize;
use reqwest::{
    Client, StatusCode,
    header::{AUTHORIZATION, DNT, HeaderMap, HeaderValue, USER_AGENT},
};
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::debug;

use crate::{
    commands::utils::environment::is_unattended,
    credential::{CredentialError, CredentialStore},
    prompts::handle_inquire_error,
};

const GITHUB_API_ENDPOINT: &str = "https://api.github.com/octocat";

#[derive(Debug, Error)]
pub enum TokenError {
    #[error(
        "No token was provided or stored. Provide one with the `GITHUB_TOKEN` environment variable or `--token`, or store one with `set-github-credentials`."
    )]
    NoTokenUnattended,
    #[error("GitHub token is invalid.")]
    InvalidToken,
    #[error("Failed to connect to GitHub. Please check your internet connection.")]
    FailedToConnect,
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    #[error(transparent)]
    Inquire(#[from] InquireError),
}

pub struct TokenManager<'a> {
    token: Cow<'a, str>,
}

#[bon]
impl<'a> TokenManager<'a> {
    pub async fn handle<T>(
        token: Option<T>,
        store: &dyn CredentialStore,
    ) -> Result<Self, TokenError>
    where
        T: Into<Cow<'a, str>>,
    {
        // Token rules:
        // - If caller passed `--token`: validate it and fail if invalid.
        // - Otherwise try the credential store:
        //     * Unattended: if no token or if stored token is invalid -> error (never prompt).
        //     * Interactive: if no stored token or stored token is invalid -> prompt and store.

        let client = Client::builder()
            .default_headers(default_headers(None))
            .build()?;

        let unattended = is_unattended();

        let token_passed = token.is_some();

        let token = if let Some(token) = token.map(T::into) {
            Some(token)
        } else {
            match store.lookup()? {
                Some(token) => Some(Cow::Owned(token)),
                None if unattended => return Err(TokenError::NoTokenUnattended),
                None => None, // No stored token, must prompt
            }
        };

        if let Some(token) = token {
            match Self::validate(&client, &token).await {
                Ok(()) => return Ok(Self { token }),
                Err(TokenError::InvalidToken) if token_passed || unattended => {
                    return Err(TokenError::InvalidToken);
                }
                Err(TokenError::InvalidToken) => debug!("Stored token in {store} is invalid"),
                Err(err) => return Err(err),
            }
        }

        let validated_token = Self::prompt().client(&client).call()?;

        Self::store(store, &validated_token)?;

        Ok(Self {
            token: Cow::Owned(validated_token),
        })
    }

    #[builder]
    pub fn prompt(
        client: &Client,
        #[builder(default = "Enter a GitHub token with the repo:status scope")] message: &str,
    ) -> InquireResult<String> {
        tokio::task::block_in_place(|| {
            let rt = Handle::current();
            let client = client.clone();
            let validator = move |input: &str| match rt
                .block_on(async { Self::validate(&client, input).await })
            {
                Ok(()) => Ok(Validation::Valid),
                Err(err) => Ok(Validation::Invalid(err.into())),
            };

            Password::new(message)
                .with_validator(validator)
                .without_confirmation()
                .prompt()
                .map_err(handle_inquire_error)
        })
    }

    pub async fn validate(client: &Client, token: &str) -> Result<(), TokenError> {
        match client
            .get(GITHUB_API_ENDPOINT)
            .bearer_auth(token)
            .send()
            .await
        {
            Ok(response) => match response.status() {
                StatusCode::UNAUTHORIZED => Err(TokenError::InvalidToken),
                _ => Ok(()),
            },
            Err(error) => {
                if error.is_connect() {
                    Err(TokenError::FailedToConnect)
                } else {
                    Err(error.into())
                }
            }
        }
    }

    pub fn store(store: &dyn CredentialStore, token: &str) -> Result<(), TokenError> {
        store.store(token)?;
        println!("{} stored token in {store}", "Successfully".green());
        Ok(())
    }
}

impl AsRef<str> for TokenManager<'_> {
    fn as_ref(&self) -> &str {
        self.token.as_ref()
    }
}

const USER_AGENT_VALUE: HeaderValue =
    HeaderValue::from_static(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")));
const SEC_GPC: &str = "Sec-GPC";

pub fn default_headers(github_token: Option<&str>) -> HeaderMap {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(USER_AGENT, USER_AGENT_VALUE);
    default_headers.insert(DNT, HeaderValue::from(1));
    default_headers.insert(SEC_GPC, HeaderValue::from(1));
    if let Some(token) = github_token
        && let Ok(bearer_auth) = HeaderValue::from_str(&format!("Bearer {token}"))
    {
        default_headers.insert(AUTHORIZATION, bearer_auth);
    }
    default_headers
}
