use strum::{Display, EnumString};

use crate::github::rest::CommitState;

/// How an Xcode Server integration ended.
#[derive(Clone, Copy, Debug, Display, EnumString, Eq, PartialEq)]
#[strum(serialize_all = "kebab-case")]
pub enum IntegrationResult {
    /// The integration is still running
    Unknown,
    BuildErrors,
    TestFailures,
    Warnings,
    AnalyzerWarnings,
    Succeeded,
}

impl From<IntegrationResult> for CommitState {
    fn from(result: IntegrationResult) -> Self {
        match result {
            IntegrationResult::Unknown => Self::Pending,
            IntegrationResult::BuildErrors => Self::Error,
            IntegrationResult::TestFailures
            | IntegrationResult::Warnings
            | IntegrationResult::AnalyzerWarnings => Self::Failure,
            IntegrationResult::Succeeded => Self::Success,
        }
    }
}
