mod archive;
pub mod writer;

use std::{io, path::PathBuf};

pub use archive::IpaArchive;
use thiserror::Error;
use zip::result::ZipError;

use crate::info_plist::PlistFileError;

/// The single top-level directory of an application archive.
pub const PAYLOAD: &str = "Payload";

pub const APP_EXTENSION: &str = "app";

pub const INFO_PLIST: &str = "Info.plist";

/// The file name a provisioning profile is embedded under inside a bundle.
pub const EMBEDDED_PROFILE: &str = "embedded.mobileprovision";

#[derive(Debug, Error)]
pub enum IpaError {
    #[error("No {PAYLOAD}/*.{APP_EXTENSION} bundle was found in the archive")]
    NoBundle,
    #[error("Expected exactly one bundle in {PAYLOAD}/ but found {}", .0.join(", "))]
    AmbiguousBundle(Vec<String>),
    #[error("{0} was not found in the archive")]
    MissingInfoPlist(String),
    #[error("{path} is not a well-formed property list")]
    MalformedPlist {
        path: String,
        #[source]
        source: PlistFileError,
    },
    #[error("{} is not valid UTF-8", .0.display())]
    NonUtf8Path(PathBuf),
    #[error(transparent)]
    Zip(#[from] ZipError),
    #[error(transparent)]
    Io(#[from] io::Error),
}
