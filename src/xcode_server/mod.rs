mod integration_result;
mod source_control;

use std::{env, io, num::ParseIntError, process::Command};

use bon::Builder;
use camino::{Utf8Path, Utf8PathBuf};
pub use integration_result::IntegrationResult;
pub use source_control::SourceControlLog;
use thiserror::Error;

use crate::process::{self, ToolError};

pub const OUTPUT_DIR: &str = "XCS_OUTPUT_DIR";
pub const PRODUCT: &str = "XCS_PRODUCT";
pub const ARCHIVE: &str = "XCS_ARCHIVE";
pub const INTEGRATION_RESULT: &str = "XCS_INTEGRATION_RESULT";
pub const INTEGRATION_NUMBER: &str = "XCS_INTEGRATION_NUMBER";
pub const BOT_TINY_ID: &str = "XCS_BOT_TINY_ID";
pub const BOT_NAME: &str = "XCS_BOT_NAME";

#[derive(Debug, Error)]
pub enum XcodeServerError {
    #[error("${0} is not set. Is this running inside an Xcode Server trigger?")]
    MissingVariable(&'static str),
    #[error("${INTEGRATION_NUMBER} is not a build number: {value}")]
    InvalidIntegrationNumber {
        value: String,
        #[source]
        source: ParseIntError,
    },
    #[error("Unknown integration result `{0}`")]
    UnknownIntegrationResult(String),
    #[error("{key} was not found in {path}")]
    MissingSourceControlKey {
        key: &'static str,
        path: Utf8PathBuf,
    },
    #[error("{0} is not a GitHub repository")]
    UnsupportedRemote(String),
    #[error("Failed to read {path}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to determine this host's name")]
    Hostname(#[source] ToolError),
}

/// The environment Xcode Server passes to a bot's trigger scripts.
#[derive(Builder, Clone, Debug, Default)]
pub struct XcodeServer {
    #[builder(into)]
    output_dir: Option<Utf8PathBuf>,
    #[builder(into)]
    product: Option<String>,
    #[builder(into)]
    archive: Option<Utf8PathBuf>,
    #[builder(into)]
    integration_result: Option<String>,
    #[builder(into)]
    integration_number: Option<String>,
    #[builder(into)]
    bot_tiny_id: Option<String>,
    #[builder(into)]
    bot_name: Option<String>,
}

impl XcodeServer {
    pub fn from_env() -> Self {
        let var = |name| env::var(name).ok();

        Self {
            output_dir: var(OUTPUT_DIR).map(Utf8PathBuf::from),
            product: var(PRODUCT),
            archive: var(ARCHIVE).map(Utf8PathBuf::from),
            integration_result: var(INTEGRATION_RESULT),
            integration_number: var(INTEGRATION_NUMBER),
            bot_tiny_id: var(BOT_TINY_ID),
            bot_name: var(BOT_NAME),
        }
    }

    pub fn output_dir(&self) -> Result<&Utf8Path, XcodeServerError> {
        self.output_dir
            .as_deref()
            .ok_or(XcodeServerError::MissingVariable(OUTPUT_DIR))
    }

    /// The path of the IPA the integration produced.
    pub fn product_path(&self) -> Result<Utf8PathBuf, XcodeServerError> {
        let product = self
            .product
            .as_deref()
            .ok_or(XcodeServerError::MissingVariable(PRODUCT))?;
        Ok(self.output_dir()?.join(product))
    }

    /// The `.xcarchive` the integration produced.
    pub fn archive(&self) -> Result<&Utf8Path, XcodeServerError> {
        self.archive
            .as_deref()
            .ok_or(XcodeServerError::MissingVariable(ARCHIVE))
    }

    pub fn integration_result(&self) -> Result<IntegrationResult, XcodeServerError> {
        let result = self
            .integration_result
            .as_deref()
            .ok_or(XcodeServerError::MissingVariable(INTEGRATION_RESULT))?;
        result
            .parse()
            .map_err(|_| XcodeServerError::UnknownIntegrationResult(result.to_owned()))
    }

    pub fn integration_number(&self) -> Result<u32, XcodeServerError> {
        let number = self
            .integration_number
            .as_deref()
            .ok_or(XcodeServerError::MissingVariable(INTEGRATION_NUMBER))?;
        number
            .trim()
            .parse()
            .map_err(|source| XcodeServerError::InvalidIntegrationNumber {
                value: number.to_owned(),
                source,
            })
    }

    pub fn bot_name(&self) -> Result<&str, XcodeServerError> {
        self.bot_name
            .as_deref()
            .ok_or(XcodeServerError::MissingVariable(BOT_NAME))
    }

    pub fn bot_tiny_id(&self) -> Result<&str, XcodeServerError> {
        self.bot_tiny_id
            .as_deref()
            .ok_or(XcodeServerError::MissingVariable(BOT_TINY_ID))
    }

    /// Reads the `sourceControl.log` Xcode Server writes beside the product.
    pub fn source_control_log(&self) -> Result<SourceControlLog, XcodeServerError> {
        SourceControlLog::read(self.output_dir()?.join(SourceControlLog::FILE_NAME))
    }

    /// The web page listing the bot's integrations on this server.
    pub fn integration_url(&self) -> Result<String, XcodeServerError> {
        let output = process::run(&mut Command::new("hostname"))
            .map_err(XcodeServerError::Hostname)?;
        self.integration_url_on(String::from_utf8_lossy(&output).trim())
    }

    fn integration_url_on(&self, hostname: &str) -> Result<String, XcodeServerError> {
        Ok(format!(
            "https://{hostname}/xcode/bots/{}/integrations",
            self.bot_tiny_id()?
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use camino::Utf8Path;
    use tempfile::TempDir;

    use super::{
        IntegrationResult, PRODUCT, SourceControlLog, XcodeServer, XcodeServerError,
    };

    #[test]
    fn product_path() {
        let server = XcodeServer::builder()
            .output_dir("/Library/Developer/XcodeServer/IntegrationAssets/abc-App/12")
            .product("App.ipa")
            .build();
        assert_eq!(
            server.product_path().unwrap(),
            "/Library/Developer/XcodeServer/IntegrationAssets/abc-App/12/App.ipa"
        );
    }

    #[test]
    fn missing_product() {
        let server = XcodeServer::builder().output_dir("/tmp").build();
        assert!(matches!(
            server.product_path(),
            Err(XcodeServerError::MissingVariable(PRODUCT))
        ));
    }

    #[test]
    fn integration_number() {
        let server = XcodeServer::builder().integration_number("42").build();
        assert_eq!(server.integration_number().unwrap(), 42);

        let server = XcodeServer::builder().integration_number("forty-two").build();
        assert!(matches!(
            server.integration_number(),
            Err(XcodeServerError::InvalidIntegrationNumber { .. })
        ));
    }

    #[test]
    fn integration_result() {
        let server = XcodeServer::builder()
            .integration_result("test-failures")
            .build();
        assert_eq!(
            server.integration_result().unwrap(),
            IntegrationResult::TestFailures
        );

        let server = XcodeServer::builder()
            .integration_result("trigger-error")
            .build();
        assert!(matches!(
            server.integration_result(),
            Err(XcodeServerError::UnknownIntegrationResult(result)) if result == "trigger-error"
        ));
    }

    #[test]
    fn integration_url() {
        let server = XcodeServer::builder().bot_tiny_id("4f1e0a2").build();
        assert_eq!(
            server.integration_url_on("xcs.example.com").unwrap(),
            "https://xcs.example.com/xcode/bots/4f1e0a2/integrations"
        );
    }

    #[test]
    fn reads_source_control_log_from_output_dir() {
        let dir = TempDir::new().unwrap();
        let output_dir = Utf8Path::from_path(dir.path()).unwrap();
        fs::write(
            output_dir.join(SourceControlLog::FILE_NAME),
            r#""DVTSourceControlLocationRevisionKey" : "6dcb09b5b57875f334f61aebed695e2e4193db5e""#,
        )
        .unwrap();

        let server = XcodeServer::builder().output_dir(output_dir).build();
        assert_eq!(
            server.source_control_log().unwrap().sha().unwrap(),
            "6dcb09b5b57875f334f61aebed695e2e4193db5e"
        );
    }
}
