use std::io;

use bon::Builder;
use camino::{Utf8Path, Utf8PathBuf};
use clap::ValueEnum;
use reqwest::{
    Body, Client, StatusCode,
    multipart::{Form, Part},
};
use thiserror::Error;
use tokio::fs::File;
use tracing::debug;

use crate::token::default_headers;

const API_URL: &str = "https://rink.hockeyapp.net/api/2/apps";
const TOKEN_HEADER: &str = "X-HockeyAppToken";
const OCTET_STREAM: &str = "application/octet-stream";

/// Release notes are Markdown.
const NOTES_TYPE_MARKDOWN: &str = "1";

#[derive(Debug, Error)]
pub enum HockeyAppError {
    #[error("HockeyApp rejected the upload with {status}: {body}")]
    Rejected { status: StatusCode, body: String },
    #[error("Failed to read {path}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
}

/// Who is told about a new version.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum Notification {
    DontNotify = 0,
    NotifyTestersWhoCanInstall = 1,
    NotifyAllTesters = 2,
}

/// Whether testers may download a new version.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum Availability {
    DontAllowToDownloadOrInstall = 1,
    AllowToDownloadOrInstall = 2,
}

/// The text fields sent alongside an upload.
#[derive(Builder, Debug)]
pub struct Release<'a> {
    notes: &'a str,
    commit_sha: &'a str,
    build_server_url: &'a str,
    notify: Option<Notification>,
    status: Option<Availability>,
    #[builder(default)]
    mandatory: bool,
    #[builder(default)]
    tags: &'a [String],
}

impl Release<'_> {
    fn fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("notes", self.notes.to_owned()),
            ("notes_type", NOTES_TYPE_MARKDOWN.to_owned()),
            ("commit_sha", self.commit_sha.to_owned()),
            ("build_server_url", self.build_server_url.to_owned()),
            ("mandatory", u8::from(self.mandatory).to_string()),
        ];
        if let Some(notify) = self.notify {
            fields.push(("notify", (notify as u8).to_string()));
        }
        if let Some(status) = self.status {
            fields.push(("status", (status as u8).to_string()));
        }
        if !self.tags.is_empty() {
            fields.push(("tags", self.tags.join(",")));
        }
        fields
    }
}

pub struct HockeyApp {
    client: Client,
    token: String,
}

impl HockeyApp {
    pub fn new<T: Into<String>>(token: T) -> Result<Self, HockeyAppError> {
        Ok(Self {
            client: Client::builder()
                .default_headers(default_headers(None))
                .build()?,
            token: token.into(),
        })
    }

    /// Uploads a new version of an app with its debug symbols.
    pub async fn upload(
        &self,
        app_id: &str,
        ipa: &Utf8Path,
        dsym: &Utf8Path,
        release: &Release<'_>,
    ) -> Result<(), HockeyAppError> {
        let form = release
            .fields()
            .into_iter()
            .fold(Form::new(), |form, (name, value)| form.text(name, value))
            .part("ipa", file_part(ipa).await?)
            .part("dsym", file_part(dsym).await?);

        let response = self
            .client
            .post(upload_endpoint(app_id))
            .header(TOKEN_HEADER, &self.token)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::CREATED {
            return Err(HockeyAppError::Rejected {
                status,
                body: response.text().await.unwrap_or_default(),
            });
        }

        debug!("HockeyApp accepted the upload: {}", response.text().await?);
        Ok(())
    }
}

fn upload_endpoint(app_id: &str) -> String {
    format!("{API_URL}/{app_id}/app_versions/upload")
}

async fn file_part(path: &Utf8Path) -> Result<Part, HockeyAppError> {
    let read_error = |source| HockeyAppError::Read {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).await.map_err(read_error)?;
    let length = file.metadata().await.map_err(read_error)?.len();

    let mut part = Part::stream_with_length(Body::from(file), length).mime_str(OCTET_STREAM)?;
    if let Some(file_name) = path.file_name() {
        part = part.file_name(file_name.to_owned());
    }
    Ok(part)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use clap::ValueEnum;
    use rstest::rstest;

    use super::{Availability, Notification, Release, upload_endpoint};

    #[test]
    fn endpoint() {
        assert_eq!(
            upload_endpoint("0873e2e98ad8b4b2b8fdd0ea1a4ad1c1"),
            "https://rink.hockeyapp.net/api/2/apps/0873e2e98ad8b4b2b8fdd0ea1a4ad1c1/app_versions/upload"
        );
    }

    #[test]
    fn minimal_release_fields() {
        let fields = Release::builder()
            .notes("Fix crash")
            .commit_sha("6dcb09b5b57875f334f61aebed695e2e4193db5e")
            .build_server_url("https://xcs.local/xcode/bots/abc/integrations")
            .build()
            .fields()
            .into_iter()
            .collect::<BTreeMap<_, _>>();

        assert_eq!(
            fields,
            BTreeMap::from([
                ("build_server_url", "https://xcs.local/xcode/bots/abc/integrations".to_owned()),
                ("commit_sha", "6dcb09b5b57875f334f61aebed695e2e4193db5e".to_owned()),
                ("mandatory", "0".to_owned()),
                ("notes", "Fix crash".to_owned()),
                ("notes_type", "1".to_owned()),
            ])
        );
    }

    #[test]
    fn full_release_fields() {
        let tags = vec!["qa".to_owned(), "beta".to_owned()];
        let fields = Release::builder()
            .notes("Fix crash")
            .commit_sha("6dcb09b")
            .build_server_url("https://xcs.local")
            .notify(Notification::NotifyAllTesters)
            .status(Availability::AllowToDownloadOrInstall)
            .mandatory(true)
            .tags(&tags)
            .build()
            .fields()
            .into_iter()
            .collect::<BTreeMap<_, _>>();

        assert_eq!(fields["notify"], "2");
        assert_eq!(fields["status"], "2");
        assert_eq!(fields["mandatory"], "1");
        assert_eq!(fields["tags"], "qa,beta");
    }

    #[rstest]
    #[case("dont_notify", Notification::DontNotify, 0)]
    #[case("notify_testers_who_can_install", Notification::NotifyTestersWhoCanInstall, 1)]
    #[case("notify_all_testers", Notification::NotifyAllTesters, 2)]
    fn notification_values(
        #[case] name: &str,
        #[case] expected: Notification,
        #[case] value: u8,
    ) {
        let notification = Notification::from_str(name, false).unwrap();
        assert_eq!(notification, expected);
        assert_eq!(notification as u8, value);
    }

    #[rstest]
    #[case("dont_allow_to_download_or_install", Availability::DontAllowToDownloadOrInstall, 1)]
    #[case("allow_to_download_or_install", Availability::AllowToDownloadOrInstall, 2)]
    fn availability_values(
        #[case] name: &str,
        #[case] expected: Availability,
        #[case] value: u8,
    ) {
        let availability = Availability::from_str(name, false).unwrap();
        assert_eq!(availability, expected);
        assert_eq!(availability as u8, value);
    }
}
