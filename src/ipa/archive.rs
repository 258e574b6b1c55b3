use std::{
    collections::BTreeSet,
    fs::File,
    io::{BufReader, Read, Seek},
    path::Path,
};

use camino::Utf8Path;
use tracing::debug;
use zip::{ZipArchive, result::ZipError};

use super::{APP_EXTENSION, INFO_PLIST, IpaError, PAYLOAD};
use crate::info_plist::InfoPlist;

/// An application archive with exactly one `Payload/<AppName>.app` bundle.
pub struct IpaArchive<R: Read + Seek> {
    archive: ZipArchive<R>,
    bundle: String,
}

impl IpaArchive<BufReader<File>> {
    pub fn open(path: &Utf8Path) -> Result<Self, IpaError> {
        debug!("Opening {path}");
        Self::new(BufReader::new(File::open(path)?))
    }
}

impl<R: Read + Seek> IpaArchive<R> {
    /// Reads the archive's central directory and determines its bundle.
    ///
    /// This fails before anything is extracted if the archive contains no bundle or more than one.
    pub fn new(reader: R) -> Result<Self, IpaError> {
        let archive = ZipArchive::new(reader)?;

        let mut bundles = bundle_names(archive.file_names())
            .into_iter()
            .map(str::to_owned)
            .collect::<Vec<_>>();

        let bundle = match bundles.len() {
            0 => return Err(IpaError::NoBundle),
            1 => bundles.swap_remove(0),
            _ => return Err(IpaError::AmbiguousBundle(bundles)),
        };

        Ok(Self { archive, bundle })
    }

    /// The bundle directory's name, such as `App.app`.
    #[inline]
    pub fn bundle_name(&self) -> &str {
        &self.bundle
    }

    /// The explicit directory entries, such as `Payload/App.app/`.
    ///
    /// Many archivers only store files, so these are recorded to write the same entries back.
    pub fn directory_entries(&self) -> BTreeSet<String> {
        self.archive
            .file_names()
            .filter(|name| name.ends_with('/'))
            .map(str::to_owned)
            .collect()
    }

    /// The top-level files and directories that sit beside `Payload/`, such as `SwiftSupport/`.
    pub fn outside_payload(&self) -> Vec<String> {
        outside_payload(self.archive.file_names())
            .into_iter()
            .map(str::to_owned)
            .collect()
    }

    pub fn info_plist_path(&self) -> String {
        format!("{PAYLOAD}/{}/{INFO_PLIST}", self.bundle)
    }

    /// Reads and parses the bundle's `Info.plist`.
    ///
    /// Compressed members can't be seeked, so the member is read fully into memory first.
    pub fn info_plist(&mut self) -> Result<InfoPlist, IpaError> {
        let path = self.info_plist_path();

        let buffer = match self.archive.by_name(&path) {
            Ok(mut member) => {
                let mut buffer = Vec::new();
                member.read_to_end(&mut buffer)?;
                buffer
            }
            Err(ZipError::FileNotFound) => return Err(IpaError::MissingInfoPlist(path)),
            Err(error) => return Err(error.into()),
        };

        InfoPlist::from_bytes(&buffer).map_err(|source| IpaError::MalformedPlist { path, source })
    }

    /// Extracts every member beneath `destination`, preserving unix permissions and symlinks.
    ///
    /// Members whose names would escape `destination` are rejected.
    pub fn extract(&mut self, destination: &Path) -> Result<(), IpaError> {
        debug!(
            "Extracting {} members to {}",
            self.archive.len(),
            destination.display()
        );
        self.archive.extract(destination)?;
        Ok(())
    }
}

/// Collects the distinct `<name>.app` directories directly inside `Payload/`.
///
/// Archives don't always contain explicit directory entries, so a bundle is recognised from any
/// member path that has a `.app` directory as its second segment.
fn bundle_names<'name>(names: impl Iterator<Item = &'name str>) -> BTreeSet<&'name str> {
    names
        .filter_map(|name| {
            let mut segments = name.split('/');
            if segments.next()? != PAYLOAD {
                return None;
            }
            let bundle = segments.next()?;
            // There must be something after the bundle, even if only the trailing slash of a
            // directory entry, otherwise it's a file named like a bundle
            segments.next()?;
            Utf8Path::new(bundle)
                .extension()
                .is_some_and(|extension| extension == APP_EXTENSION)
                .then_some(bundle)
        })
        .collect()
}

fn outside_payload<'name>(names: impl Iterator<Item = &'name str>) -> BTreeSet<&'name str> {
    names
        .filter_map(|name| match name.split_once('/') {
            Some((PAYLOAD, _)) => None,
            Some((top, _)) => Some(&name[..=top.len()]),
            None => Some(name),
        })
        .collect()
}
