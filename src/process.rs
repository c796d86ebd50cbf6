//! Backend and UI process handling.
//!
//! The backend runs detached with its handle retained so teardown can
//! terminate it rather than leave it orphaned. The UI runs in the
//! foreground and owns the terminal until it exits.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{info, warn};

use crate::config::ProcessConfig;
use crate::error::LaunchError;
use crate::runtime::RuntimeEnv;

/// Detached backend child plus the pid recorded at spawn time.
#[derive(Debug)]
pub struct BackendHandle {
    child: Child,
    pid: Option<u32>,
}

/// Send a signal to a pid through the system `kill` binary.
async fn signal(pid: u32, sig: &str) {
    let _ = Command::new("kill")
        .arg(sig)
        .arg(pid.to_string())
        .status()
        .await;
}

pub fn spawn_backend(
    env: &RuntimeEnv,
    cfg: &ProcessConfig,
    workspace: &std::path::Path,
) -> Result<BackendHandle, LaunchError> {
    if cfg.command.is_empty() {
        return Err(LaunchError::EmptyCommand { stage: "backend" });
    }
    let mut cmd = env.command(&cfg.command);
    cmd.current_dir(workspace)
        .stdin(Stdio::null())
        .kill_on_drop(true);

    let child = cmd.spawn().map_err(|source| LaunchError::Spawn {
        stage: "backend",
        program: cfg.command[0].clone(),
        source,
    })?;
    let pid = child.id();
    info!("Backend started: {} (pid {:?})", env.render(&cfg.command), pid);
    Ok(BackendHandle { child, pid })
}

impl BackendHandle {
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Non-blocking exit check. `Some` once the backend has died.
    pub fn exit_status(&mut self) -> Option<ExitStatus> {
        self.child.try_wait().ok().flatten()
    }

    pub fn is_alive(&mut self) -> bool {
        self.exit_status().is_none()
    }

    /// Terminate the backend: SIGTERM, wait out the grace period, then
    /// SIGKILL. Returns the exit status when one was collected.
    pub async fn terminate(mut self, grace: Duration) -> Option<ExitStatus> {
        if let Some(status) = self.exit_status() {
            info!("Backend already exited: {status}");
            return Some(status);
        }
        if let Some(pid) = self.child.id() {
            info!("Stopping backend (pid {pid})");
            signal(pid, "-TERM").await;
        }
        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                info!("Backend stopped: {status}");
                Some(status)
            }
            Ok(Err(e)) => {
                warn!("Backend wait failed: {e}");
                None
            }
            Err(_) => {
                warn!(
                    "Backend ignored SIGTERM for {}s, killing",
                    grace.as_secs_f32()
                );
                let _ = self.child.start_kill();
                self.child.wait().await.ok()
            }
        }
    }
}

/// Outcome of the foreground UI run.
#[derive(Debug)]
pub struct UiExit {
    pub status: ExitStatus,
    /// True when Ctrl-C ended the run rather than the UI itself.
    pub interrupted: bool,
}

/// Run the UI in the foreground, blocking until it exits. Ctrl-C is
/// forwarded to the UI child and still resolves to a `UiExit`, so the
/// caller always reaches teardown.
pub async fn run_ui(
    env: &RuntimeEnv,
    cfg: &ProcessConfig,
    workspace: &std::path::Path,
) -> Result<UiExit, LaunchError> {
    if cfg.command.is_empty() {
        return Err(LaunchError::EmptyCommand { stage: "ui" });
    }
    let mut cmd = env.command(&cfg.command);
    cmd.current_dir(workspace).kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|source| LaunchError::Spawn {
        stage: "ui",
        program: cfg.command[0].clone(),
        source,
    })?;
    info!("UI started: {} (pid {:?})", env.render(&cfg.command), child.id());

    tokio::select! {
        status = child.wait() => Ok(UiExit {
            status: status?,
            interrupted: false,
        }),
        signal_result = tokio::signal::ctrl_c() => {
            if let Err(e) = signal_result {
                // handler registration failed, not a real interrupt
                warn!("Interrupt handler unavailable ({e}), waiting for UI exit");
                let status = child.wait().await?;
                return Ok(UiExit { status, interrupted: false });
            }
            info!("Interrupt received, stopping UI");
            if let Some(pid) = child.id() {
                signal(pid, "-INT").await;
            }
            let status = match tokio::time::timeout(Duration::from_secs(5), child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    warn!("UI ignored interrupt, killing");
                    let _ = child.start_kill();
                    child.wait().await?
                }
            };
            Ok(UiExit { status, interrupted: true })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EnvConfig, EnvManager};

    fn sh(script: &str) -> ProcessConfig {
        ProcessConfig {
            command: vec!["sh".into(), "-c".into(), script.into()],
        }
    }

    async fn bare_env() -> RuntimeEnv {
        RuntimeEnv::activate(&EnvConfig {
            manager: EnvManager::None,
            ..EnvConfig::default()
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn backend_terminates_gracefully_on_sigterm() {
        let dir = tempfile::tempdir().unwrap();
        let env = bare_env().await;
        let cfg =
            sh("trap 'touch stopped; exit 0' TERM; touch started; while :; do sleep 0.05; done");

        let mut backend = spawn_backend(&env, &cfg, dir.path()).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(backend.is_alive());
        assert!(dir.path().join("started").exists());

        let status = backend.terminate(Duration::from_secs(5)).await;
        assert!(status.is_some_and(|s| s.success()));
        assert!(dir.path().join("stopped").exists());
    }

    #[tokio::test]
    async fn stubborn_backend_gets_killed_after_grace() {
        let dir = tempfile::tempdir().unwrap();
        let env = bare_env().await;
        let cfg = sh("trap '' TERM; while :; do sleep 0.05; done");

        let backend = spawn_backend(&env, &cfg, dir.path()).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let status = backend.terminate(Duration::from_millis(300)).await;
        // killed, so no success status
        assert!(status.map_or(true, |s| !s.success()));
    }

    #[tokio::test]
    async fn dead_backend_reports_exit_status() {
        let dir = tempfile::tempdir().unwrap();
        let env = bare_env().await;
        let mut backend = spawn_backend(&env, &sh("exit 3"), dir.path()).unwrap();

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!backend.is_alive());
        assert_eq!(backend.exit_status().and_then(|s| s.code()), Some(3));
    }

    #[tokio::test]
    async fn ui_exit_code_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let env = bare_env().await;

        let exit = run_ui(&env, &sh("exit 5"), dir.path()).await.unwrap();
        assert_eq!(exit.status.code(), Some(5));
        assert!(!exit.interrupted);
    }

    #[tokio::test]
    async fn empty_commands_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let env = bare_env().await;
        let empty = ProcessConfig { command: Vec::new() };

        assert!(matches!(
            spawn_backend(&env, &empty, dir.path()),
            Err(LaunchError::EmptyCommand { stage: "backend" })
        ));
        assert!(matches!(
            run_ui(&env, &empty, dir.path()).await,
            Err(LaunchError::EmptyCommand { stage: "ui" })
        ));
    }
}
