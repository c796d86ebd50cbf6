//! The boot-up ritual: environment integrity plus workspace layout.
//!
//! Ensures the required packages are present, creates the core bus
//! directories every agent expects, and resets the audit log so each
//! launch starts from a clean slate. Whether a failure here aborts the
//! launch is the caller's decision (`setup.strict`).

use tracing::{debug, info};

use crate::audit::AuditLog;
use crate::config::{EnvConfig, SetupConfig};
use crate::error::LaunchError;
use crate::runtime::RuntimeEnv;

pub async fn run_setup(
    env: &RuntimeEnv,
    env_cfg: &EnvConfig,
    cfg: &SetupConfig,
    audit: &AuditLog,
) -> Result<(), LaunchError> {
    info!("Beginning boot-up ritual in {}", cfg.workspace.display());

    env.install_packages(&env_cfg.packages)
        .await
        .map_err(LaunchError::Setup)?;

    for dir in &cfg.core_dirs {
        let path = cfg.workspace.join(dir);
        if path.is_dir() {
            debug!("Directory `{dir}` already exists, skipping");
        } else {
            std::fs::create_dir_all(&path)?;
            info!("Created directory {}", path.display());
        }
    }

    if cfg.reset_audit_log {
        audit.reset()?;
        info!("Reset audit log {}", audit.path().display());
    }

    if !env_cfg.packages.is_empty() {
        audit.append(
            "SYSTEM_UPDATE",
            serde_json::json!({"message": "Libraries installed.", "packages": env_cfg.packages}),
        );
    }
    audit.append(
        "BOOT_UP_RITUAL_COMPLETED",
        serde_json::json!({"message": "Boot-Up Ritual completed successfully."}),
    );
    info!("Boot-up ritual complete");
    Ok(())
}
