use std::{
    fmt::Write,
    fs, io,
    io::Cursor,
    sync::LazyLock,
};

use camino::{Utf8Path, Utf8PathBuf};
use plist::{Dictionary, Value};
use regex::Regex;
use thiserror::Error;
use walkdir::WalkDir;

pub const BUNDLE_IDENTIFIER: &str = "CFBundleIdentifier";
pub const BUNDLE_VERSION: &str = "CFBundleVersion";
pub const BUNDLE_SHORT_VERSION: &str = "CFBundleShortVersionString";

const PLIST_EXTENSION: &str = "plist";

#[derive(Debug, Error)]
pub enum PlistFileError {
    #[error("{path} does not exist{}", list_candidates(.candidates))]
    NotFound {
        path: Utf8PathBuf,
        candidates: Vec<Utf8PathBuf>,
    },
    #[error("The property list is not a dictionary")]
    NotADictionary,
    #[error("The property list has no {0} string")]
    MissingKey(&'static str),
    #[error("Can't figure out {BUNDLE_VERSION} from `{0}`")]
    UnparseableVersion(String),
    #[error(transparent)]
    Plist(#[from] plist::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

fn list_candidates(candidates: &[Utf8PathBuf]) -> String {
    if candidates.is_empty() {
        return String::new();
    }
    candidates.iter().fold(
        String::from(". Try one of these property lists:"),
        |mut message, candidate| {
            let _ = write!(message, "\n  {candidate}");
            message
        },
    )
}

/// The encoding a property list was read from, so that it can be written back the same way.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum PlistFormat {
    Binary,
    #[default]
    Xml,
}

impl PlistFormat {
    const BINARY_MAGIC: &'static [u8] = b"bplist";

    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.starts_with(Self::BINARY_MAGIC) {
            Self::Binary
        } else {
            Self::Xml
        }
    }
}

/// An application's `Info.plist`.
#[derive(Clone, Debug, PartialEq)]
pub struct InfoPlist {
    dictionary: Dictionary,
    format: PlistFormat,
}

impl InfoPlist {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PlistFileError> {
        let dictionary = Value::from_reader(Cursor::new(bytes))?
            .into_dictionary()
            .ok_or(PlistFileError::NotADictionary)?;

        Ok(Self {
            dictionary,
            format: PlistFormat::detect(bytes),
        })
    }

    /// Reads a property list from disk.
    ///
    /// If the file does not exist, the error lists the property lists that do exist beneath the
    /// current directory as Xcode Server triggers rarely run where users expect.
    pub fn open(path: &Utf8Path) -> Result<Self, PlistFileError> {
        if !path.is_file() {
            return Err(PlistFileError::NotFound {
                path: path.to_path_buf(),
                candidates: find_property_lists(Utf8Path::new(".")),
            });
        }

        Self::from_bytes(&fs::read(path)?)
    }

    pub fn save(&self, path: &Utf8Path) -> Result<(), PlistFileError> {
        match self.format {
            PlistFormat::Binary => plist::to_file_binary(path, &self.dictionary)?,
            PlistFormat::Xml => plist::to_file_xml(path, &self.dictionary)?,
        }
        Ok(())
    }

    #[inline]
    pub const fn format(&self) -> PlistFormat {
        self.format
    }

    pub fn string(&self, key: &'static str) -> Result<&str, PlistFileError> {
        self.dictionary
            .get(key)
            .and_then(Value::as_string)
            .ok_or(PlistFileError::MissingKey(key))
    }

    pub fn bundle_identifier(&self) -> Result<&str, PlistFileError> {
        self.string(BUNDLE_IDENTIFIER)
    }

    pub fn bundle_version(&self) -> Result<&str, PlistFileError> {
        self.string(BUNDLE_VERSION)
    }

    pub fn bundle_short_version(&self) -> Result<&str, PlistFileError> {
        self.string(BUNDLE_SHORT_VERSION)
    }

    /// Replaces the build component of `CFBundleVersion`, returning the new version.
    pub fn set_build_number(&mut self, build_number: u32) -> Result<String, PlistFileError> {
        let version = next_bundle_version(self.bundle_version()?, build_number)?;
        self.dictionary
            .insert(BUNDLE_VERSION.to_owned(), Value::String(version.clone()));
        Ok(version)
    }
}

/// Computes `major.minor.build` from an existing bundle version.
///
/// Officially `CFBundleVersion` is always three period-separated integers, but the minor and build
/// components are often omitted. A missing minor component becomes `0`.
pub fn next_bundle_version(current: &str, build_number: u32) -> Result<String, PlistFileError> {
    static VERSION_REGEX: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^(\d+)\.?(\d*)\.?(\d*)").unwrap());

    let captures = VERSION_REGEX
        .captures(current)
        .ok_or_else(|| PlistFileError::UnparseableVersion(current.to_owned()))?;

    let major = &captures[1];
    let minor = captures
        .get(2)
        .map(|minor| minor.as_str())
        .filter(|minor| !minor.is_empty())
        .unwrap_or("0");

    Ok(format!("{major}.{minor}.{build_number}"))
}

fn find_property_lists(root: &Utf8Path) -> Vec<Utf8PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| Utf8PathBuf::from_path_buf(entry.into_path()).ok())
        .filter(|path| {
            path.extension()
                .is_some_and(|extension| extension.eq_ignore_ascii_case(PLIST_EXTENSION))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use camino::Utf8Path;
    use indoc::indoc;
    use rstest::rstest;
    use tempfile::TempDir;

    use super::{InfoPlist, PlistFileError, PlistFormat, next_bundle_version};

    const INFO_PLIST: &str = indoc! {r#"
        <?xml version="1.0" encoding="UTF-8"?>
        <!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
        <plist version="1.0">
        <dict>
            <key>CFBundleIdentifier</key>
            <string>com.example.app</string>
            <key>CFBundleShortVersionString</key>
            <string>1.4</string>
            <key>CFBundleVersion</key>
            <string>1.4</string>
            <key>UIRequiredDeviceCapabilities</key>
            <array>
                <string>armv7</string>
            </array>
        </dict>
        </plist>
    "#};

    #[rstest]
    #[case("1.2.3", 42, "1.2.42")]
    #[case("1.2", 42, "1.2.42")]
    #[case("1", 42, "1.0.42")]
    #[case("7.", 3, "7.0.3")]
    #[case("10.4.1b", 9, "10.4.9")]
    fn bundle_versions(#[case] current: &str, #[case] build: u32, #[case] expected: &str) {
        assert_eq!(next_bundle_version(current, build).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("v1.2")]
    #[case("beta")]
    fn unparseable_bundle_versions(#[case] current: &str) {
        assert!(matches!(
            next_bundle_version(current, 1),
            Err(PlistFileError::UnparseableVersion(version)) if version == current
        ));
    }

    #[test]
    fn reads_bundle_keys() {
        let info = InfoPlist::from_bytes(INFO_PLIST.as_bytes()).unwrap();
        assert_eq!(info.bundle_identifier().unwrap(), "com.example.app");
        assert_eq!(info.bundle_short_version().unwrap(), "1.4");
        assert_eq!(info.format(), PlistFormat::Xml);
    }

    #[test]
    fn missing_key() {
        let info = InfoPlist::from_bytes(b"<plist version=\"1.0\"><dict/></plist>").unwrap();
        assert!(matches!(
            info.bundle_identifier(),
            Err(PlistFileError::MissingKey("CFBundleIdentifier"))
        ));
    }

    #[test]
    fn rejects_non_dictionary() {
        let result = InfoPlist::from_bytes(b"<plist version=\"1.0\"><string>app</string></plist>");
        assert!(matches!(result, Err(PlistFileError::NotADictionary)));
    }

    #[test]
    fn set_build_number_preserves_other_keys() {
        let dir = TempDir::new().unwrap();
        let path = Utf8Path::from_path(dir.path()).unwrap().join("Info.plist");
        std::fs::write(&path, INFO_PLIST).unwrap();

        let mut info = InfoPlist::open(&path).unwrap();
        assert_eq!(info.set_build_number(17).unwrap(), "1.4.17");
        info.save(&path).unwrap();

        let saved = InfoPlist::open(&path).unwrap();
        assert_eq!(saved.bundle_version().unwrap(), "1.4.17");
        assert_eq!(saved.bundle_identifier().unwrap(), "com.example.app");
        assert_eq!(saved.format(), PlistFormat::Xml);
    }

    #[test]
    fn binary_plists_stay_binary() {
        let dir = TempDir::new().unwrap();
        let path = Utf8Path::from_path(dir.path()).unwrap().join("Info.plist");
        let xml = InfoPlist::from_bytes(INFO_PLIST.as_bytes()).unwrap();
        plist::to_file_binary(&path, &xml.dictionary).unwrap();

        let mut info = InfoPlist::open(&path).unwrap();
        assert_eq!(info.format(), PlistFormat::Binary);
        info.set_build_number(2).unwrap();
        info.save(&path).unwrap();

        assert!(std::fs::read(&path).unwrap().starts_with(b"bplist00"));
        assert_eq!(
            InfoPlist::open(&path).unwrap().bundle_version().unwrap(),
            "1.4.2"
        );
    }

    #[test]
    fn missing_file() {
        let result = InfoPlist::open(Utf8Path::new("does/not/exist/Info.plist"));
        assert!(matches!(result, Err(PlistFileError::NotFound { .. })));
    }
}
