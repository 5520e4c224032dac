//! Scheduler failure classification
//!
//! Maps the free-form failure text reported back by the scheduler onto a fixed
//! set of reason identifiers. Rules are checked in table order and the first
//! match wins; every input classifies to something.

use serde::{Deserialize, Serialize};
use std::fmt;

const STAGING_FAILED: &str = "staging failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureId {
    StagingError,
    InsufficientResources,
    NoCompatibleCell,
    CellCommunicationError,
    #[serde(rename = "NoAppDetectedError")]
    BuildpackDetectFailed,
    BuildpackCompileFailed,
    BuildpackReleaseFailed,
    #[serde(rename = "CNBGenericBuildFailed")]
    CnbGenericBuildFailed,
    #[serde(rename = "CNBDownloadBuildpackFailed")]
    CnbDownloadBuildpackFailed,
    #[serde(rename = "CNBDetectFailed")]
    CnbDetectFailed,
    #[serde(rename = "CNBBuildFailed")]
    CnbBuildFailed,
    #[serde(rename = "CNBExportFailed")]
    CnbExportFailed,
    #[serde(rename = "CNBLaunchFailed")]
    CnbLaunchFailed,
    #[serde(rename = "CNBRestoreFailed")]
    CnbRestoreFailed,
}

impl FailureId {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureId::StagingError => "StagingError",
            FailureId::InsufficientResources => "InsufficientResources",
            FailureId::NoCompatibleCell => "NoCompatibleCell",
            FailureId::CellCommunicationError => "CellCommunicationError",
            FailureId::BuildpackDetectFailed => "NoAppDetectedError",
            FailureId::BuildpackCompileFailed => "BuildpackCompileFailed",
            FailureId::BuildpackReleaseFailed => "BuildpackReleaseFailed",
            FailureId::CnbGenericBuildFailed => "CNBGenericBuildFailed",
            FailureId::CnbDownloadBuildpackFailed => "CNBDownloadBuildpackFailed",
            FailureId::CnbDetectFailed => "CNBDetectFailed",
            FailureId::CnbBuildFailed => "CNBBuildFailed",
            FailureId::CnbExportFailed => "CNBExportFailed",
            FailureId::CnbLaunchFailed => "CNBLaunchFailed",
            FailureId::CnbRestoreFailed => "CNBRestoreFailed",
        }
    }
}

impl fmt::Display for FailureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReason {
    pub id: FailureId,
    pub message: String,
}

/// Builder exit codes appear as message suffixes
const SUFFIX_RULES: &[(&str, FailureId)] = &[
    ("222", FailureId::BuildpackDetectFailed),
    ("223", FailureId::BuildpackCompileFailed),
    ("224", FailureId::BuildpackReleaseFailed),
    ("231", FailureId::CnbGenericBuildFailed),
    ("232", FailureId::CnbDownloadBuildpackFailed),
    ("233", FailureId::CnbDetectFailed),
    ("234", FailureId::CnbBuildFailed),
    ("235", FailureId::CnbExportFailed),
    ("236", FailureId::CnbLaunchFailed),
    ("237", FailureId::CnbRestoreFailed),
];

const PREFIX_RULES: &[(&str, FailureId)] = &[
    ("insufficient resources", FailureId::InsufficientResources),
    ("found no compatible cell", FailureId::NoCompatibleCell),
];

const EXACT_RULES: &[(&str, FailureId)] = &[
    (
        "unable to communicate to compatible cells",
        FailureId::CellCommunicationError,
    ),
    ("missing docker image download url", FailureId::StagingError),
    ("missing docker registry", FailureId::StagingError),
    ("missing docker credentials", FailureId::StagingError),
    ("invalid docker registry address", FailureId::StagingError),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct FailureClassifier;

impl FailureClassifier {
    pub fn classify(&self, message: &str) -> FailureReason {
        if let Some((_, id)) = SUFFIX_RULES
            .iter()
            .find(|(suffix, _)| message.ends_with(suffix))
        {
            return FailureReason {
                id: *id,
                message: STAGING_FAILED.to_string(),
            };
        }

        let passthrough = PREFIX_RULES
            .iter()
            .find(|(prefix, _)| message.starts_with(prefix))
            .or_else(|| EXACT_RULES.iter().find(|(exact, _)| message == *exact));

        match passthrough {
            Some((_, id)) => FailureReason {
                id: *id,
                message: message.to_string(),
            },
            None => FailureReason {
                id: FailureId::StagingError,
                message: STAGING_FAILED.to_string(),
            },
        }
    }
}
