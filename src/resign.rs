use std::{fs, io, path::PathBuf};

use bon::Builder;
use camino::Utf8Path;
use clap::ValueEnum;
use strum::Display;
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, info, warn};
use zip::CompressionMethod;

use crate::{
    info_plist::PlistFileError,
    ipa::{
        EMBEDDED_PROFILE, IpaArchive, IpaError, PAYLOAD,
        writer::{self, DirectoryEntries},
    },
    provisioning::{ProfileError, ProvisioningProfile},
    signing::{SignError, SignRequest, Signer},
};

const WORKING_DIR_PREFIX: &str = env!("CARGO_PKG_NAME");
const ENTITLEMENTS_FILE: &str = "entitlements.plist";

#[derive(Debug, Error)]
pub enum ResignError {
    #[error(
        "The provisioning profile's application identifier {application_identifier} does not match the bundle identifier {bundle_identifier}"
    )]
    IdentifierMismatch {
        application_identifier: String,
        bundle_identifier: String,
    },
    #[error("{} was not extracted as a directory", .0.display())]
    BundleMissing(PathBuf),
    #[error(transparent)]
    Ipa(#[from] IpaError),
    #[error(transparent)]
    Plist(#[from] PlistFileError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Sign(#[from] SignError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// What to do when a profile's application identifier doesn't cover the bundle identifier.
#[derive(Clone, Copy, Debug, Default, Display, Eq, PartialEq, ValueEnum)]
#[strum(serialize_all = "lowercase")]
pub enum IdentityPolicy {
    /// Warn and carry on, leaving `codesign` to reject a truly incompatible identity
    #[default]
    Lenient,
    /// Refuse to re-sign
    Strict,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IdentityCheck {
    Match,
    Mismatch,
}

impl IdentityCheck {
    /// A profile covers a bundle when its application identifier ends with the bundle identifier,
    /// as in `TEAMID.com.example.app` covering `com.example.app`.
    pub fn evaluate(application_identifier: &str, bundle_identifier: &str) -> Self {
        if application_identifier.ends_with(bundle_identifier) {
            Self::Match
        } else {
            Self::Mismatch
        }
    }
}

/// Re-signs an application archive with a different provisioning profile.
#[derive(Builder)]
pub struct Resigner<'a> {
    signer: &'a dyn Signer,
    /// The replacement `.mobileprovision`
    profile: &'a Utf8Path,
    /// The name of a signing identity in the host's keychain
    identity: &'a str,
    input: &'a Utf8Path,
    output: &'a Utf8Path,
    #[builder(default)]
    policy: IdentityPolicy,
    /// Where the working directory is created, defaulting to the system's temporary directory
    temp_root: Option<&'a Utf8Path>,
}

impl Resigner<'_> {
    /// Runs the whole pipeline, writing the re-signed archive only once everything else succeeded.
    ///
    /// The working directory is removed on every path out of this function.
    pub fn run(&self) -> Result<(), ResignError> {
        let profile = ProvisioningProfile::from_plist(
            &self.signer.decode_profile(self.profile.as_std_path())?,
        )?;
        debug!(
            "Re-signing with the {} provisioning profile granting {} entitlements",
            profile.name().unwrap_or(profile.application_identifier()),
            profile.entitlements().len()
        );

        let mut ipa = IpaArchive::open(self.input)?;
        let info_plist = ipa.info_plist()?;
        self.check_identity(
            profile.application_identifier(),
            info_plist.bundle_identifier()?,
        )?;

        let directories = ipa.directory_entries();
        let outside_payload = ipa.outside_payload();
        if !outside_payload.is_empty() {
            warn!(
                "Leaving {} out of the re-signed archive",
                outside_payload.join(", ")
            );
        }

        let working_dir = self.working_dir()?;
        debug!("Working in {}", working_dir.path().display());
        ipa.extract(working_dir.path())?;

        let bundle = working_dir.path().join(PAYLOAD).join(ipa.bundle_name());
        if !bundle.is_dir() {
            return Err(ResignError::BundleMissing(bundle));
        }

        fs::copy(self.profile, bundle.join(EMBEDDED_PROFILE))?;

        let entitlements = working_dir.path().join(ENTITLEMENTS_FILE);
        profile.write_entitlements(&entitlements)?;

        info!("Signing {} as {}", ipa.bundle_name(), self.identity);
        self.signer.sign(&SignRequest {
            bundle: &bundle,
            identity: self.identity,
            entitlements: &entitlements,
            force: true,
        })?;

        if let Err(error) = writer::write_tree(
            working_dir.path(),
            PAYLOAD,
            self.output.as_std_path(),
            DirectoryEntries::Only(&directories),
            CompressionMethod::Deflated,
        ) {
            if let Err(cleanup) = discard_partial_output(self.output) {
                warn!(
                    "Failed to remove the partially written {}: {cleanup}",
                    self.output
                );
            }
            return Err(error.into());
        }

        working_dir.close()?;
        info!("Re-signed {} to {}", self.input, self.output);

        Ok(())
    }

    fn check_identity(
        &self,
        application_identifier: &str,
        bundle_identifier: &str,
    ) -> Result<(), ResignError> {
        match (
            IdentityCheck::evaluate(application_identifier, bundle_identifier),
            self.policy,
        ) {
            (IdentityCheck::Match, _) => Ok(()),
            (IdentityCheck::Mismatch, IdentityPolicy::Lenient) => {
                warn!(
                    "Provisioning profile application identifier {application_identifier} doesn't match bundle identifier {bundle_identifier}"
                );
                Ok(())
            }
            (IdentityCheck::Mismatch, IdentityPolicy::Strict) => {
                Err(ResignError::IdentifierMismatch {
                    application_identifier: application_identifier.to_owned(),
                    bundle_identifier: bundle_identifier.to_owned(),
                })
            }
        }
    }

    fn working_dir(&self) -> io::Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKING_DIR_PREFIX);
        match self.temp_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
    }
}

/// Removes an archive that failed to be written, if any of it was created.
fn discard_partial_output(output: &Utf8Path) -> io::Result<()> {
    match fs::remove_file(output) {
        Err(error) if error.kind() != io::ErrorKind::NotFound => Err(error),
        _ => Ok(()),
    }
}
