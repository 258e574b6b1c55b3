use std::{fs, path::Path, process::Command};

use tracing::warn;

use super::{SignError, SignRequest, Signer};
use crate::{
    process,
    provisioning::{ProfileError, embedded_plist},
};

const SECURITY: &str = "security";
const CODESIGN: &str = "codesign";

/// Signs with the host's `codesign` and decodes profiles with `security`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Codesign;

impl Codesign {
    fn decode_command(profile: &Path) -> Command {
        let mut command = Command::new(SECURITY);
        command.args(["cms", "-D", "-i"]).arg(profile);
        command
    }

    fn sign_command(request: &SignRequest<'_>) -> Command {
        let mut command = Command::new(CODESIGN);
        command.arg("--entitlements").arg(request.entitlements);
        if request.force {
            command.arg("-f");
        }
        command.arg("-s").arg(request.identity).arg(request.bundle);
        command
    }
}

impl Signer for Codesign {
    fn decode_profile(&self, profile: &Path) -> Result<Vec<u8>, SignError> {
        match process::run(&mut Self::decode_command(profile)) {
            Ok(plist) => Ok(plist),
            Err(error) if error.is_not_found() => {
                warn!(
                    "`{SECURITY}` is unavailable so the signature of {} will not be verified",
                    profile.display()
                );
                let signed = fs::read(profile)?;
                embedded_plist(&signed)
                    .map(<[u8]>::to_vec)
                    .ok_or_else(|| ProfileError::NoEmbeddedPlist.into())
            }
            Err(error) => Err(error.into()),
        }
    }

    fn sign(&self, request: &SignRequest<'_>) -> Result<(), SignError> {
        process::run(&mut Self::sign_command(request))?;
        Ok(())
    }
}
