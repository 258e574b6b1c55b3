use std::{env, sync::LazyLock};

use crate::xcode_server::OUTPUT_DIR;

pub static CI: LazyLock<bool> =
    LazyLock::new(|| env::var("CI").is_ok_and(|ci| ci.parse() == Ok(true)));

/// Whether this is running inside an Xcode Server trigger, where nobody can answer a prompt.
pub static XCODE_SERVER: LazyLock<bool> =
    LazyLock::new(|| env::var_os("XCS").is_some() || env::var_os(OUTPUT_DIR).is_some());

/// Whether prompting for input is impossible.
pub fn is_unattended() -> bool {
    *CI || *XCODE_SERVER
}
