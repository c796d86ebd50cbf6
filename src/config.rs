//! Launcher configuration
//!
//! All tunable parameters in one place. Loaded from TOML at startup,
//! falls back to defaults if no config file exists. The defaults reproduce
//! the stock PALA deployment: `pala-env`, `python main.py` backend,
//! `streamlit run the_conscious_mind.py` UI.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level launcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    /// Log planned commands without spawning anything.
    /// Kept ahead of the table sections so TOML serialization stays valid.
    pub dry_run: bool,
    /// Runtime environment (activation stage).
    pub env: EnvConfig,
    /// Boot-up ritual parameters (setup stage).
    pub setup: SetupConfig,
    /// Backend process (detached).
    pub backend: ProcessConfig,
    /// UI process (foreground).
    pub ui: ProcessConfig,
    /// Backend readiness probing.
    pub readiness: ReadinessConfig,
    /// Teardown parameters.
    pub teardown: TeardownConfig,
}

/// Which environment manager wraps spawned commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnvManager {
    /// Commands run via `conda run --name <env>`.
    Conda,
    /// Commands run directly — no wrapping. For deployments that manage
    /// their own interpreter, and for tests.
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    /// Name of the pre-existing environment. Activation fails if missing.
    pub name: String,
    pub manager: EnvManager,
    /// Path or name of the conda binary.
    pub conda_bin: String,
    /// Python version the environment is expected to carry.
    pub python_version: String,
    /// Packages the setup stage ensures are installed.
    pub packages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SetupConfig {
    /// Workspace root — core directories, audit log and spawned processes
    /// all live under here.
    pub workspace: PathBuf,
    /// Core directories created by the boot-up ritual.
    pub core_dirs: Vec<String>,
    /// Audit log file name, relative to the workspace.
    pub audit_log: String,
    /// Overwrite the audit log on each launch for a clean slate.
    pub reset_audit_log: bool,
    /// Abort the launch on setup failure instead of warning.
    pub strict: bool,
    /// Skip the ritual entirely (environment already prepared).
    pub skip: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// Argv run inside the environment, cwd = workspace.
    pub command: Vec<String>,
}

/// How the launcher decides the backend is ready for the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeKind {
    /// Wait until the audit log grows past its size at backend start.
    /// The backend writes its boot events there.
    LogFile,
    /// Wait until a TCP connect to `tcp_addr` succeeds.
    Tcp,
    /// Legacy fixed delay, no readiness signal.
    Delay,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    pub probe: ProbeKind,
    /// Give up probing after this many seconds. The launch continues with
    /// a warning; only an observed backend death aborts.
    pub timeout_secs: u64,
    /// Poll interval in milliseconds.
    pub poll_ms: u64,
    /// Fixed delay in seconds for the `delay` probe.
    pub delay_secs: u64,
    /// Address for the `tcp` probe.
    pub tcp_addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TeardownConfig {
    /// Seconds the backend gets to exit after SIGTERM before SIGKILL.
    pub grace_secs: u64,
}

// ============================================================
// Defaults
// ============================================================

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            env: EnvConfig::default(),
            setup: SetupConfig::default(),
            backend: ProcessConfig {
                command: vec!["python".into(), "main.py".into()],
            },
            ui: ProcessConfig {
                command: vec![
                    "streamlit".into(),
                    "run".into(),
                    "the_conscious_mind.py".into(),
                ],
            },
            readiness: ReadinessConfig::default(),
            teardown: TeardownConfig::default(),
        }
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            name: "pala-env".into(),
            manager: EnvManager::Conda,
            conda_bin: "conda".into(),
            python_version: "3.10".into(),
            packages: [
                "streamlit",
                "ollama",
                "langgraph",
                "numpy",
                "psutil",
                "python-dateutil",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            workspace: PathBuf::from("."),
            core_dirs: [
                "message_bus",
                "memory_bus",
                "data_bus",
                "internal_goals",
                "emotional_state",
                "log_history",
                "agent_logs",
                "tools",
            ]
            .map(String::from)
            .to_vec(),
            audit_log: "pala_audit.log".into(),
            reset_audit_log: true,
            strict: false,
            skip: false,
        }
    }
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
        }
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            probe: ProbeKind::LogFile,
            timeout_secs: 30,
            poll_ms: 250,
            delay_secs: 5,
            tcp_addr: "127.0.0.1:8501".into(),
        }
    }
}

impl Default for TeardownConfig {
    fn default() -> Self {
        Self { grace_secs: 5 }
    }
}

// ============================================================
// Loading
// ============================================================

impl LauncherConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {} — using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!("No config at {} — using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the current config as TOML (for generating a default config file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// Path of the audit log under the workspace.
    pub fn audit_log_path(&self) -> PathBuf {
        self.setup.workspace.join(&self.setup.audit_log)
    }
}
