//! Runtime environment activation.
//!
//! Thin async wrapper over the `conda` binary. Activation here means
//! verifying the manager is callable and the named environment exists —
//! there is no fallback environment and no retry. Commands later run
//! through `conda run`, which gives the same interpreter and library set
//! an interactive `conda activate` would.

use tokio::process::Command;
use tracing::info;

use crate::config::{EnvConfig, EnvManager};
use crate::error::LaunchError;

/// Handle on an activated environment. Cheap to clone; carries no OS
/// resources, only the knowledge of how to wrap commands.
#[derive(Debug, Clone)]
pub struct RuntimeEnv {
    name: String,
    manager: EnvManager,
    conda_bin: String,
}

async fn run_conda(bin: &str, args: &[&str]) -> Result<String, String> {
    let output = Command::new(bin)
        .args(args)
        .output()
        .await
        .map_err(|e| format!("conda exec failed: {e}"))?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(format!("conda error: {stderr}"))
    }
}

/// Parse `conda env list` output: env name is the first column, `#` lines
/// are comments.
pub fn env_list_contains(output: &str, name: &str) -> bool {
    output
        .lines()
        .filter(|l| !l.trim_start().starts_with('#'))
        .filter_map(|l| l.split_whitespace().next())
        .any(|first| first == name)
}

impl RuntimeEnv {
    /// Verify the environment exists and return a handle on it.
    /// Fatal on a missing manager or environment — the launch must not
    /// proceed past a failed activation.
    pub async fn activate(cfg: &EnvConfig) -> Result<Self, LaunchError> {
        match cfg.manager {
            EnvManager::None => {
                info!("No environment manager — commands run directly");
            }
            EnvManager::Conda => {
                let listing = run_conda(&cfg.conda_bin, &["env", "list"])
                    .await
                    .map_err(|reason| LaunchError::ManagerUnavailable {
                        manager: cfg.conda_bin.clone(),
                        reason,
                    })?;
                if !env_list_contains(&listing, &cfg.name) {
                    return Err(LaunchError::EnvNotFound(cfg.name.clone()));
                }
                info!("Activated conda environment `{}`", cfg.name);
            }
        }
        Ok(Self {
            name: cfg.name.clone(),
            manager: cfg.manager,
            conda_bin: cfg.conda_bin.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Build a command that runs `argv` inside the environment.
    /// `--no-capture-output` keeps the child's streams live so the UI can
    /// own the terminal. `argv` must be non-empty.
    pub fn command(&self, argv: &[String]) -> Command {
        match self.manager {
            EnvManager::None => {
                let mut cmd = Command::new(&argv[0]);
                cmd.args(&argv[1..]);
                cmd
            }
            EnvManager::Conda => {
                let mut cmd = Command::new(&self.conda_bin);
                cmd.args(["run", "--no-capture-output", "--name", &self.name]);
                cmd.args(argv);
                cmd
            }
        }
    }

    /// The argv the environment wrapper would execute, for logs and dry runs.
    pub fn render(&self, argv: &[String]) -> String {
        match self.manager {
            EnvManager::None => argv.join(" "),
            EnvManager::Conda => format!(
                "{} run --no-capture-output --name {} {}",
                self.conda_bin,
                self.name,
                argv.join(" ")
            ),
        }
    }

    /// Install packages into the environment via pip. Used by the setup
    /// stage; a no-op without a manager.
    pub async fn install_packages(&self, packages: &[String]) -> Result<(), String> {
        if packages.is_empty() || self.manager == EnvManager::None {
            return Ok(());
        }
        let mut args: Vec<&str> = vec!["run", "--name", &self.name, "pip", "install"];
        args.extend(packages.iter().map(String::as_str));
        run_conda(&self.conda_bin, &args).await.map(|_| ())
    }

    /// Release the handle. `conda run` leaves nothing activated in this
    /// process, so this only marks the end of the sequence.
    pub fn deactivate(self) {
        info!("Deactivated environment `{}`", self.name);
    }
}
