use std::process::ExitStatus;
use thiserror::Error;

/// Launch failures, one variant per stage that can abort the sequence.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("environment manager `{manager}` is not usable: {reason}")]
    ManagerUnavailable { manager: String, reason: String },

    #[error("runtime environment `{0}` not found — create it before launching")]
    EnvNotFound(String),

    #[error("setup failed: {0}")]
    Setup(String),

    #[error("{stage} command is empty")]
    EmptyCommand { stage: &'static str },

    #[error("failed to spawn {stage} (`{program}`): {source}")]
    Spawn {
        stage: &'static str,
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("backend exited during startup: {0}")]
    BackendExited(ExitStatus),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
