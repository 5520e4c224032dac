//! Scheduler action tree
//!
//! Mirrors the scheduler's `Action` one-of: each variant serializes under its
//! `*_action` key so the JSON form matches the external recipe schema.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    pub name: String,
    pub value: String,
}

impl EnvironmentVariable {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nofile: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "download_action")]
    Download(DownloadAction),
    #[serde(rename = "upload_action")]
    Upload(UploadAction),
    #[serde(rename = "run_action")]
    Run(RunAction),
    #[serde(rename = "timeout_action")]
    Timeout(TimeoutAction),
    #[serde(rename = "emit_progress_action")]
    EmitProgress(EmitProgressAction),
    #[serde(rename = "try_action")]
    Try(TryAction),
    #[serde(rename = "serial_action")]
    Serial(SerialAction),
    #[serde(rename = "parallel_action")]
    Parallel(ParallelAction),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadAction {
    pub artifact: String,
    pub from: String,
    pub to: String,
    pub cache_key: String,
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum_algorithm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum_value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadAction {
    pub artifact: String,
    pub from: String,
    pub to: String,
    pub user: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunAction {
    pub path: String,
    pub args: Vec<String>,
    #[serde(default)]
    pub dir: String,
    pub env: Vec<EnvironmentVariable>,
    pub resource_limits: ResourceLimits,
    pub user: String,
    #[serde(default)]
    pub log_source: String,
    #[serde(default)]
    pub suppress_log_output: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutAction {
    pub action: Box<Action>,
    pub timeout_ms: u64,
    #[serde(default)]
    pub log_source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitProgressAction {
    pub action: Box<Action>,
    pub start_message: String,
    pub success_message: String,
    pub failure_message_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TryAction {
    pub action: Box<Action>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialAction {
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParallelAction {
    pub actions: Vec<Action>,
}

impl Action {
    pub fn serial(actions: Vec<Action>) -> Self {
        Action::Serial(SerialAction { actions })
    }

    pub fn parallel(actions: Vec<Action>) -> Self {
        Action::Parallel(ParallelAction { actions })
    }

    pub fn timeout(action: Action, timeout_ms: u64) -> Self {
        Action::Timeout(TimeoutAction {
            action: Box::new(action),
            timeout_ms,
            log_source: String::new(),
        })
    }

    pub fn try_action(action: Action) -> Self {
        Action::Try(TryAction {
            action: Box::new(action),
        })
    }

    pub fn emit_progress(
        action: Action,
        start_message: &str,
        success_message: &str,
        failure_message_prefix: &str,
    ) -> Self {
        Action::EmitProgress(EmitProgressAction {
            action: Box::new(action),
            start_message: start_message.to_string(),
            success_message: success_message.to_string(),
            failure_message_prefix: failure_message_prefix.to_string(),
        })
    }

    pub fn as_timeout(&self) -> Option<&TimeoutAction> {
        match self {
            Action::Timeout(timeout) => Some(timeout),
            _ => None,
        }
    }

    /// Depth-first search for the first run action in the tree
    pub fn find_run(&self) -> Option<&RunAction> {
        match self {
            Action::Run(run) => Some(run),
            Action::Timeout(TimeoutAction { action, .. })
            | Action::EmitProgress(EmitProgressAction { action, .. })
            | Action::Try(TryAction { action }) => action.find_run(),
            Action::Serial(SerialAction { actions }) | Action::Parallel(ParallelAction { actions }) => {
                actions.iter().find_map(Action::find_run)
            }
            Action::Download(_) | Action::Upload(_) => None,
        }
    }

    /// All download actions in tree order, including those wrapped in `try`
    pub fn downloads(&self) -> Vec<&DownloadAction> {
        let mut found = Vec::new();
        self.collect_downloads(&mut found);
        found
    }

    fn collect_downloads<'a>(&'a self, found: &mut Vec<&'a DownloadAction>) {
        match self {
            Action::Download(download) => found.push(download),
            Action::Timeout(TimeoutAction { action, .. })
            | Action::EmitProgress(EmitProgressAction { action, .. })
            | Action::Try(TryAction { action }) => action.collect_downloads(found),
            Action::Serial(SerialAction { actions }) | Action::Parallel(ParallelAction { actions }) => {
                for action in actions {
                    action.collect_downloads(found);
                }
            }
            Action::Run(_) | Action::Upload(_) => {}
        }
    }
}
