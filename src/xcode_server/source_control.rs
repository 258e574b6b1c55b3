use std::{fs, sync::LazyLock};

use camino::Utf8PathBuf;
use regex::Regex;

use super::XcodeServerError;
use crate::github::Repository;

const REVISION_KEY: &str = "DVTSourceControlLocationRevisionKey";
const REMOTE_URL_KEY: &str = "DVTSourceControlWorkspaceBlueprintRemoteRepositoryURLKey";

/// The log Xcode Server writes while checking out a bot's repository.
///
/// The log embeds the workspace blueprint as loosely formatted JSON, so values are found by key
/// rather than by parsing the whole document.
#[derive(Clone, Debug)]
pub struct SourceControlLog {
    path: Utf8PathBuf,
    contents: String,
}

impl SourceControlLog {
    pub const FILE_NAME: &'static str = "sourceControl.log";

    pub fn read<P: Into<Utf8PathBuf>>(path: P) -> Result<Self, XcodeServerError> {
        let path = path.into();
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Self::new(path, contents)),
            Err(source) => Err(XcodeServerError::Read { path, source }),
        }
    }

    pub fn new<P, C>(path: P, contents: C) -> Self
    where
        P: Into<Utf8PathBuf>,
        C: Into<String>,
    {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }

    /// The sha of the commit being integrated.
    pub fn sha(&self) -> Result<&str, XcodeServerError> {
        static REVISION_REGEX: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(&value_pattern(REVISION_KEY)).unwrap());

        self.value(&REVISION_REGEX, REVISION_KEY)
    }

    /// The GitHub repository being integrated.
    pub fn repository(&self) -> Result<Repository, XcodeServerError> {
        static REMOTE_URL_REGEX: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(&value_pattern(REMOTE_URL_KEY)).unwrap());

        // Forward slashes are escaped in the log, as in `github.com:owner\/repo.git`
        let remote = self
            .value(&REMOTE_URL_REGEX, REMOTE_URL_KEY)?
            .replace(r"\/", "/");

        Repository::from_remote(&remote).ok_or(XcodeServerError::UnsupportedRemote(remote))
    }

    fn value(&self, regex: &Regex, key: &'static str) -> Result<&str, XcodeServerError> {
        regex
            .captures(&self.contents)
            .and_then(|captures| captures.get(1))
            .map(|value| value.as_str())
            .ok_or_else(|| XcodeServerError::MissingSourceControlKey {
                key,
                path: self.path.clone(),
            })
    }
}

fn value_pattern(key: &str) -> String {
    format!(r#""{key}"\s*:\s*"([^"]*)""#)
}
