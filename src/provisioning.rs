use std::{io::Cursor, path::Path};

use plist::{Dictionary, Value};
use thiserror::Error;

pub const ENTITLEMENTS: &str = "Entitlements";
pub const APPLICATION_IDENTIFIER_ENTITLEMENT: &str = "application-identifier";
pub const APPLICATION_IDENTIFIER: &str = "ApplicationIdentifier";
const NAME: &str = "Name";

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("The provisioning profile is not a dictionary")]
    NotADictionary,
    #[error("The provisioning profile has no {ENTITLEMENTS} dictionary")]
    MissingEntitlements,
    #[error("The provisioning profile has no application identifier")]
    MissingApplicationIdentifier,
    #[error("No property list was found inside the provisioning profile")]
    NoEmbeddedPlist,
    #[error(transparent)]
    Plist(#[from] plist::Error),
}

/// The decoded contents of a `.mobileprovision` file.
#[derive(Clone, Debug, PartialEq)]
pub struct ProvisioningProfile {
    name: Option<String>,
    application_identifier: String,
    entitlements: Dictionary,
}

impl ProvisioningProfile {
    /// Parses the property list that was decoded from a signed provisioning profile.
    pub fn from_plist(bytes: &[u8]) -> Result<Self, ProfileError> {
        let mut profile = Value::from_reader(Cursor::new(bytes))?
            .into_dictionary()
            .ok_or(ProfileError::NotADictionary)?;

        let entitlements = profile
            .remove(ENTITLEMENTS)
            .and_then(Value::into_dictionary)
            .ok_or(ProfileError::MissingEntitlements)?;

        let application_identifier = entitlements
            .get(APPLICATION_IDENTIFIER_ENTITLEMENT)
            .or_else(|| profile.get(APPLICATION_IDENTIFIER))
            .and_then(Value::as_string)
            .ok_or(ProfileError::MissingApplicationIdentifier)?
            .to_owned();

        Ok(Self {
            name: profile
                .remove(NAME)
                .and_then(Value::into_string),
            application_identifier,
            entitlements,
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The identifier the profile authorizes, such as `TEAMID.com.example.app` or `TEAMID.*`.
    pub fn application_identifier(&self) -> &str {
        &self.application_identifier
    }

    pub const fn entitlements(&self) -> &Dictionary {
        &self.entitlements
    }

    /// Writes the entitlements as a standalone XML property list for `codesign`.
    pub fn write_entitlements(&self, path: &Path) -> Result<(), ProfileError> {
        plist::to_file_xml(path, &self.entitlements)?;
        Ok(())
    }
}

/// Finds the property list inside a CMS-signed provisioning profile without verifying the
/// signature.
pub fn embedded_plist(profile: &[u8]) -> Option<&[u8]> {
    const XML_START: &[u8] = b"<?xml";
    const PLIST_END: &[u8] = b"</plist>";

    let start = profile
        .windows(XML_START.len())
        .position(|window| window == XML_START)?;
    let end = profile
        .windows(PLIST_END.len())
        .rposition(|window| window == PLIST_END)?
        + PLIST_END.len();

    (start < end).then(|| &profile[start..end])
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use plist::Value;
    use tempfile::TempDir;

    use super::{ProfileError, ProvisioningProfile, embedded_plist};

    const PROFILE: &str = indoc! {r#"
        <?xml version="1.0" encoding="UTF-8"?>
        <!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
        <plist version="1.0">
        <dict>
            <key>Name</key>
            <string>Example Ad Hoc</string>
            <key>Entitlements</key>
            <dict>
                <key>application-identifier</key>
                <string>TEAMID.com.example.app</string>
                <key>get-task-allow</key>
                <false/>
                <key>keychain-access-groups</key>
                <array>
                    <string>TEAMID.*</string>
                </array>
            </dict>
        </dict>
        </plist>
    "#};

    #[test]
    fn reads_profile() {
        let profile = ProvisioningProfile::from_plist(PROFILE.as_bytes()).unwrap();
        assert_eq!(profile.name(), Some("Example Ad Hoc"));
        assert_eq!(profile.application_identifier(), "TEAMID.com.example.app");
        assert_eq!(
            profile.entitlements().get("get-task-allow"),
            Some(&Value::Boolean(false))
        );
    }

    #[test]
    fn falls_back_to_top_level_application_identifier() {
        let profile = ProvisioningProfile::from_plist(indoc! {br#"
            <plist version="1.0">
            <dict>
                <key>ApplicationIdentifier</key>
                <string>TEAMID.com.example.app</string>
                <key>Entitlements</key>
                <dict/>
            </dict>
            </plist>
        "#})
        .unwrap();
        assert_eq!(profile.application_identifier(), "TEAMID.com.example.app");
    }

    #[test]
    fn requires_entitlements() {
        let result = ProvisioningProfile::from_plist(
            br#"<plist version="1.0"><dict><key>Name</key><string>x</string></dict></plist>"#,
        );
        assert!(matches!(result, Err(ProfileError::MissingEntitlements)));
    }

    #[test]
    fn requires_application_identifier() {
        let result = ProvisioningProfile::from_plist(
            br#"<plist version="1.0"><dict><key>Entitlements</key><dict/></dict></plist>"#,
        );
        assert!(matches!(
            result,
            Err(ProfileError::MissingApplicationIdentifier)
        ));
    }

    #[test]
    fn finds_plist_inside_signed_profile() {
        let mut signed = b"\x30\x82\x1f\x4a\x06\x09*\x86H\x86\xf7\r\x01\x07\x02".to_vec();
        signed.extend_from_slice(PROFILE.trim_end().as_bytes());
        signed.extend_from_slice(b"\xa0\x82\x0d\x1c\x30\x82");

        let plist = embedded_plist(&signed).unwrap();
        assert_eq!(plist, PROFILE.trim_end().as_bytes());
        assert!(ProvisioningProfile::from_plist(plist).is_ok());
    }

    #[test]
    fn no_plist_inside_profile() {
        assert_eq!(embedded_plist(b"\x30\x82 not a profile"), None);
    }

    #[test]
    fn writes_entitlements_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("entitlements.plist");
        let profile = ProvisioningProfile::from_plist(PROFILE.as_bytes()).unwrap();

        profile.write_entitlements(&path).unwrap();

        let written = Value::from_file(&path).unwrap().into_dictionary().unwrap();
        assert_eq!(&written, profile.entitlements());
        assert!(!written.contains_key("Name"));
    }
}
