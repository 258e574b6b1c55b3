use std::{
    collections::BTreeSet,
    fs,
    fs::File,
    io,
    io::{BufWriter, Write},
    path::{Component, Path},
};

use tracing::debug;
use walkdir::WalkDir;
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use super::IpaError;

/// Which directories are written as their own directory entries.
#[derive(Clone, Copy, Debug)]
pub enum DirectoryEntries<'names> {
    All,
    /// Only these entries, named with a trailing `/`
    Only(&'names BTreeSet<String>),
}

impl DirectoryEntries<'_> {
    fn includes(self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(names) => names.contains(name),
        }
    }
}

/// Writes the directory `base/root` into a new zip archive at `output`.
///
/// Member names are relative to `base` and use `/` separators, so every member begins with
/// `root/` no matter where `base` lives on disk. Symlinks are stored as symlinks. Returns the
/// number of members written.
pub fn write_tree(
    base: &Path,
    root: &str,
    output: &Path,
    directories: DirectoryEntries<'_>,
    compression_method: CompressionMethod,
) -> Result<usize, IpaError> {
    let mut zip = ZipWriter::new(BufWriter::new(File::create(output)?));
    let options = SimpleFileOptions::default().compression_method(compression_method);
    let mut members = 0;

    for entry in WalkDir::new(base.join(root))
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(io::Error::from)?;
        let name = member_name(base, entry.path())?;
        let metadata = entry.path().symlink_metadata()?;

        if metadata.is_dir() {
            let name = format!("{name}/");
            if !directories.includes(&name) {
                continue;
            }
            zip.add_directory(name, options)?;
        } else if metadata.is_symlink() {
            let target = fs::read_link(entry.path())?;
            let target = target
                .to_str()
                .ok_or_else(|| IpaError::NonUtf8Path(target.clone()))?;
            zip.add_symlink(name, target, options)?;
        } else {
            zip.start_file(name, options.unix_permissions(unix_mode(&metadata)))?;
            io::copy(&mut File::open(entry.path())?, &mut zip)?;
        }
        members += 1;
    }

    zip.finish()?.flush()?;
    debug!("Wrote {members} members to {}", output.display());

    Ok(members)
}

fn member_name(base: &Path, path: &Path) -> Result<String, IpaError> {
    let relative = path
        .strip_prefix(base)
        .map_err(|_| IpaError::NonUtf8Path(path.to_path_buf()))?;

    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(segment) => Some(segment),
            _ => None,
        })
        .map(|segment| {
            segment
                .to_str()
                .ok_or_else(|| IpaError::NonUtf8Path(path.to_path_buf()))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(|segments| segments.join("/"))
}

#[cfg(unix)]
fn unix_mode(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;

    metadata.permissions().mode()
}

#[cfg(not(unix))]
fn unix_mode(metadata: &fs::Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeSet, fs, fs::File, path::Path};

    use tempfile::TempDir;
    use zip::{CompressionMethod, ZipArchive};

    use super::{DirectoryEntries, member_name, write_tree};

    #[test]
    fn member_names_are_relative_to_base() {
        let base = Path::new("/tmp/cavejohnsonXYZ");
        assert_eq!(
            member_name(base, &base.join("Payload/App.app/Info.plist")).unwrap(),
            "Payload/App.app/Info.plist"
        );
        assert_eq!(member_name(base, &base.join("Payload")).unwrap(), "Payload");
    }

    #[test]
    fn writes_tree_under_root_segment() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("work");
        let bundle = base.join("Payload/App.app");
        fs::create_dir_all(bundle.join("Base.lproj")).unwrap();
        fs::write(bundle.join("Info.plist"), "plist").unwrap();
        fs::write(bundle.join("Base.lproj/Main.strings"), "strings").unwrap();
        fs::write(base.join("entitlements.plist"), "not archived").unwrap();

        let output = dir.path().join("App.ipa");
        let written = write_tree(
            &base,
            "Payload",
            &output,
            DirectoryEntries::All,
            CompressionMethod::Deflated,
        )
        .unwrap();

        let archive = ZipArchive::new(File::open(&output).unwrap()).unwrap();
        let mut names = archive.file_names().collect::<Vec<_>>();
        names.sort_unstable();
        assert_eq!(
            names,
            [
                "Payload/",
                "Payload/App.app/",
                "Payload/App.app/Base.lproj/",
                "Payload/App.app/Base.lproj/Main.strings",
                "Payload/App.app/Info.plist",
            ]
        );
        assert_eq!(written, names.len());
    }

    #[test]
    fn writes_only_listed_directory_entries() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("work");
        let bundle = base.join("Payload/App.app");
        fs::create_dir_all(bundle.join("Base.lproj")).unwrap();
        fs::write(bundle.join("Info.plist"), "plist").unwrap();
        fs::write(bundle.join("Base.lproj/Main.strings"), "strings").unwrap();

        let output = dir.path().join("App.ipa");
        let directories = BTreeSet::from([String::from("Payload/App.app/")]);
        let written = write_tree(
            &base,
            "Payload",
            &output,
            DirectoryEntries::Only(&directories),
            CompressionMethod::Deflated,
        )
        .unwrap();

        let archive = ZipArchive::new(File::open(&output).unwrap()).unwrap();
        let mut names = archive.file_names().collect::<Vec<_>>();
        names.sort_unstable();
        assert_eq!(
            names,
            [
                "Payload/App.app/",
                "Payload/App.app/Base.lproj/Main.strings",
                "Payload/App.app/Info.plist",
            ]
        );
        assert_eq!(written, names.len());
    }

    #[test]
    fn members_are_deflated() {
        let dir = TempDir::new().unwrap();
        let base = dir.path();
        fs::create_dir_all(base.join("dSYMs/App.app.dSYM")).unwrap();
        fs::write(base.join("dSYMs/App.app.dSYM/Info.plist"), "a".repeat(4096)).unwrap();

        let output = base.join("dSYMs.zip");
        write_tree(
            base,
            "dSYMs",
            &output,
            DirectoryEntries::All,
            CompressionMethod::Deflated,
        )
        .unwrap();

        let mut archive = ZipArchive::new(File::open(&output).unwrap()).unwrap();
        let member = archive.by_name("dSYMs/App.app.dSYM/Info.plist").unwrap();
        assert_eq!(member.compression(), CompressionMethod::Deflated);
        assert!(member.compressed_size() < member.size());
    }

    #[cfg(unix)]
    #[test]
    fn preserves_symlinks_and_permissions() {
        use std::os::unix::fs::{PermissionsExt, symlink};

        let dir = TempDir::new().unwrap();
        let base = dir.path().join("work");
        let framework = base.join("Payload/App.app/Frameworks/Kit.framework");
        fs::create_dir_all(framework.join("Versions/A")).unwrap();
        let binary = framework.join("Versions/A/Kit");
        fs::write(&binary, "kit").unwrap();
        fs::set_permissions(&binary, fs::Permissions::from_mode(0o755)).unwrap();
        symlink("Versions/A/Kit", framework.join("Kit")).unwrap();

        let output = dir.path().join("App.ipa");
        write_tree(
            &base,
            "Payload",
            &output,
            DirectoryEntries::All,
            CompressionMethod::Deflated,
        )
        .unwrap();

        let mut archive = ZipArchive::new(File::open(&output).unwrap()).unwrap();
        let binary = archive
            .by_name("Payload/App.app/Frameworks/Kit.framework/Versions/A/Kit")
            .unwrap();
        assert_eq!(binary.unix_mode().map(|mode| mode & 0o777), Some(0o755));
        drop(binary);

        let link = archive
            .by_name("Payload/App.app/Frameworks/Kit.framework/Kit")
            .unwrap();
        assert_eq!(
            link.unix_mode().map(|mode| mode & 0o170_000),
            Some(0o120_000)
        );
    }
}
