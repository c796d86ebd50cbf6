//! The launch sequence: activate → setup → backend → readiness → UI →
//! teardown. One pass, top to bottom. Only activation failure, a backend
//! that dies during startup, or a failed spawn abort the sequence; the UI
//! exit code becomes the launcher's own.

use std::time::Duration;
use tracing::{error, info, warn};

use crate::audit::AuditLog;
use crate::config::LauncherConfig;
use crate::error::LaunchError;
use crate::process::{self, BackendHandle};
use crate::readiness::{self, Readiness};
use crate::runtime::RuntimeEnv;
use crate::setup;

/// Run the full launch sequence and return the process exit code.
pub async fn run(config: LauncherConfig) -> Result<i32, LaunchError> {
    // 1. Activation — fatal on failure, nothing else runs.
    let env = RuntimeEnv::activate(&config.env).await?;
    let audit = AuditLog::new(config.audit_log_path());

    if config.dry_run {
        info!("Dry run — nothing will be spawned");
        info!("  setup:   boot-up ritual in {}", config.setup.workspace.display());
        info!("  backend: {}", env.render(&config.backend.command));
        info!("  ui:      {}", env.render(&config.ui.command));
        env.deactivate();
        return Ok(0);
    }

    // 2. Boot-up ritual. A failure is an explicit warning, or an abort
    // under strict mode.
    if config.setup.skip {
        info!("Setup skipped");
    } else if let Err(e) = setup::run_setup(&env, &config.env, &config.setup, &audit).await {
        if config.setup.strict {
            error!("Setup failed (strict mode): {e}");
            env.deactivate();
            return Err(e);
        }
        warn!("Setup failed, continuing: {e}");
        audit.append(
            "SYSTEM_ERROR",
            serde_json::json!({"message": format!("Setup failed: {e}")}),
        );
    }

    // Emitted after the ritual so the audit-log reset cannot wipe it.
    audit.append(
        "LAUNCH_STARTED",
        serde_json::json!({
            "environment": env.name(),
            "workspace": config.setup.workspace.display().to_string(),
        }),
    );

    // 3. Backend, detached. The audit baseline is sampled before the spawn
    // so the log-file probe only sees backend writes.
    audit.append(
        "BACKEND_STARTED",
        serde_json::json!({"command": config.backend.command}),
    );
    let baseline = audit.len();
    let mut backend =
        match process::spawn_backend(&env, &config.backend, &config.setup.workspace) {
            Ok(backend) => backend,
            Err(e) => {
                env.deactivate();
                return Err(e);
            }
        };
    info!("Backend pid: {:?}", backend.pid());

    // 4. Readiness instead of a blind sleep. A dead backend aborts here.
    match readiness::wait_ready(&config.readiness, &mut backend, &audit, baseline).await {
        Ok(Readiness::Ready) => {
            audit.append("BACKEND_READY", serde_json::json!({}));
        }
        Ok(Readiness::TimedOut) => {
            audit.append(
                "SYSTEM_ERROR",
                serde_json::json!({"message": "Backend readiness probe timed out."}),
            );
        }
        Err(e) => {
            error!("Backend failed during startup: {e}");
            audit.append(
                "SYSTEM_ERROR",
                serde_json::json!({"message": format!("Backend failed during startup: {e}")}),
            );
            env.deactivate();
            return Err(e);
        }
    }

    // 5. UI, foreground. A spawn failure must still tear the backend down.
    let ui_exit = match process::run_ui(&env, &config.ui, &config.setup.workspace).await {
        Ok(exit) => exit,
        Err(e) => {
            error!("UI failed: {e}");
            teardown(backend, &config, &audit, None).await;
            env.deactivate();
            return Err(e);
        }
    };
    if ui_exit.interrupted {
        info!("UI interrupted");
    } else {
        info!("UI exited: {}", ui_exit.status);
    }

    // 6. Teardown, exactly once, regardless of how the UI went.
    let code = ui_exit.status.code().unwrap_or(130);
    teardown(backend, &config, &audit, Some(code)).await;
    env.deactivate();
    println!("PALA system shut down.");
    Ok(code)
}

async fn teardown(
    backend: BackendHandle,
    config: &LauncherConfig,
    audit: &AuditLog,
    ui_code: Option<i32>,
) {
    let grace = Duration::from_secs(config.teardown.grace_secs);
    let backend_status = backend.terminate(grace).await;
    audit.append(
        "LAUNCH_FINISHED",
        serde_json::json!({
            "ui_exit_code": ui_code,
            "backend_exit": backend_status.map(|s| s.to_string()),
        }),
    );
}
