use std::fmt;

use super::GITHUB_HOST;

/// A GitHub repository identified by its owner and name.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Repository {
    owner: String,
    name: String,
}

impl Repository {
    pub fn new<O, N>(owner: O, name: N) -> Self
    where
        O: Into<String>,
        N: Into<String>,
    {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parses a git remote that points at GitHub.
    ///
    /// Xcode records remotes in scp-like form without the user, such as
    /// `github.com:owner/repo.git`. The `git@` and `https://` forms are accepted too.
    pub fn from_remote(remote: &str) -> Option<Self> {
        let path = remote
            .strip_prefix("https://")
            .or_else(|| remote.strip_prefix("ssh://git@"))
            .and_then(|rest| rest.strip_prefix(GITHUB_HOST)?.strip_prefix('/'))
            .or_else(|| {
                remote
                    .strip_prefix("git@")
                    .unwrap_or(remote)
                    .strip_prefix(GITHUB_HOST)?
                    .strip_prefix(':')
            })?;

        let path = path.trim_end_matches('/');
        let path = path.strip_suffix(".git").unwrap_or(path);
        let (owner, name) = path.split_once('/')?;

        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }

        Some(Self::new(owner, name))
    }

    #[inline]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}
