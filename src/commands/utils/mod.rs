pub mod credentials;
pub mod environment;

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::eyre::{Result, bail};

use crate::xcode_server::XcodeServer;

pub const SPINNER_TICK_RATE: Duration = Duration::from_millis(50);

/// Returns the given IPA path, or the integration's product when none was given.
pub fn ipa_path(path: Option<Utf8PathBuf>, xcode_server: &XcodeServer) -> Result<Utf8PathBuf> {
    let path = match path {
        Some(path) => path,
        None => xcode_server.product_path()?,
    };

    ensure_exists(&path)?;
    Ok(path)
}

pub fn ensure_exists(path: &Utf8Path) -> Result<()> {
    if !path.exists() {
        bail!("{path} does not exist");
    }
    Ok(())
}
