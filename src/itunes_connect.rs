use std::{
    fs,
    fs::File,
    io,
    io::BufReader,
    path::{Path, PathBuf},
};

use camino::Utf8Path;
use md5::{Digest, Md5};
use serde::Serialize;
use tempfile::TempDir;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::{
    info_plist::{InfoPlist, PlistFileError},
    process::ToolError,
};

pub const DEFAULT_TRANSPORTER: &str = "/Applications/Xcode.app/Contents/Applications/Application Loader.app/Contents/MacOS/itms/bin/iTMSTransporter";

const PACKAGE_DIR: &str = "package.itmsp";
const PAYLOAD_FILE: &str = "payload.ipa";
const METADATA_FILE: &str = "metadata.xml";

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

#[derive(Debug, Error)]
pub enum ItunesConnectError {
    #[error(transparent)]
    Metadata(#[from] quick_xml::SeError),
    #[error(transparent)]
    Plist(#[from] PlistFileError),
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// The `metadata.xml` of an iTunes Connect upload package.
#[derive(Serialize)]
#[serde(rename = "package")]
struct Package<'a> {
    #[serde(rename = "@version")]
    version: &'static str,
    #[serde(rename = "@xmlns")]
    xmlns: &'static str,
    software_assets: SoftwareAssets<'a>,
}

#[derive(Serialize)]
struct SoftwareAssets<'a> {
    #[serde(rename = "@apple_id")]
    apple_id: &'a str,
    #[serde(rename = "@bundle_short_version_string")]
    bundle_short_version_string: &'a str,
    #[serde(rename = "@bundle_version")]
    bundle_version: &'a str,
    #[serde(rename = "@bundle_identifier")]
    bundle_identifier: &'a str,
    asset: Asset<'a>,
}

#[derive(Serialize)]
struct Asset<'a> {
    #[serde(rename = "@type")]
    r#type: &'static str,
    data_file: DataFile<'a>,
}

#[derive(Serialize)]
struct DataFile<'a> {
    file_name: &'a str,
    checksum: Checksum<'a>,
    size: u64,
}

#[derive(Serialize)]
struct Checksum<'a> {
    #[serde(rename = "@type")]
    r#type: &'static str,
    #[serde(rename = "$text")]
    value: &'a str,
}

impl<'a> Package<'a> {
    fn new(
        apple_id: &'a str,
        info_plist: &'a InfoPlist,
        payload: &'a Payload,
    ) -> Result<Self, PlistFileError> {
        Ok(Self {
            version: "software5.2",
            xmlns: "http://apple.com/itunes/importer",
            software_assets: SoftwareAssets {
                apple_id,
                bundle_short_version_string: info_plist.bundle_short_version()?,
                bundle_version: info_plist.bundle_version()?,
                bundle_identifier: info_plist.bundle_identifier()?,
                asset: Asset {
                    r#type: "bundle",
                    data_file: DataFile {
                        file_name: PAYLOAD_FILE,
                        checksum: Checksum {
                            r#type: "md5",
                            value: &payload.md5,
                        },
                        size: payload.size,
                    },
                },
            },
        })
    }

    fn to_xml(&self) -> Result<String, quick_xml::SeError> {
        let mut xml = String::from(XML_DECLARATION);
        xml.push('\n');
        let mut serializer = quick_xml::se::Serializer::new(&mut xml);
        serializer.indent(' ', 4);
        self.serialize(serializer)?;
        xml.push('\n');
        Ok(xml)
    }
}

/// The uploaded IPA's size and lowercase hex MD5 digest.
#[derive(Clone, Debug, Eq, PartialEq)]
struct Payload {
    md5: String,
    size: u64,
}

impl Payload {
    fn digest(path: &Path) -> io::Result<Self> {
        let mut hasher = Md5::new();
        let size = io::copy(&mut BufReader::new(File::open(path)?), &mut hasher)?;
        Ok(Self {
            md5: base16ct::lower::encode_string(&hasher.finalize()),
            size,
        })
    }
}

/// An `.itmsp` package directory ready for `iTMSTransporter`.
///
/// The package lives in a temporary directory that is removed when this is dropped.
pub struct ItmsPackage {
    dir: TempDir,
}

impl ItmsPackage {
    pub fn create(
        ipa: &Utf8Path,
        apple_id: &str,
        info_plist: &InfoPlist,
    ) -> Result<Self, ItunesConnectError> {
        let dir = tempfile::Builder::new()
            .prefix(env!("CARGO_PKG_NAME"))
            .tempdir()?;
        let package = dir.path().join(PACKAGE_DIR);
        fs::create_dir(&package)?;

        let payload_path = package.join(PAYLOAD_FILE);
        fs::copy(ipa, &payload_path)?;
        let payload = Payload::digest(&payload_path)?;
        debug!("{PAYLOAD_FILE} is {} bytes with MD5 {}", payload.size, payload.md5);

        let metadata = Package::new(apple_id, info_plist, &payload)?.to_xml()?;
        fs::write(package.join(METADATA_FILE), metadata)?;

        Ok(Self { dir })
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().join(PACKAGE_DIR)
    }

    /// Removes the package, surfacing any error in doing so.
    pub fn close(self) -> io::Result<()> {
        self.dir.close()
    }
}

/// Apple's command-line uploader.
pub struct Transporter<'a> {
    pub program: &'a Utf8Path,
    pub apple_id: &'a str,
    pub username: &'a str,
    pub password: &'a str,
}

impl Transporter<'_> {
    pub fn upload_command(&self, package: &Path) -> Command {
        let mut command = Command::new(self.program);
        command
            .args(["-m", "upload", "-apple_id", self.apple_id])
            .args(["-u", self.username, "-p", self.password, "-f"])
            .arg(package);
        command
    }
}
