//! End-to-end launch sequence tests, run against throwaway shell processes
//! in a temp workspace so no conda installation is needed.

use pala_launcher::config::{
    EnvConfig, EnvManager, LauncherConfig, ProbeKind, ProcessConfig, ReadinessConfig,
    SetupConfig, TeardownConfig,
};
use pala_launcher::error::LaunchError;
use pala_launcher::launcher;
use std::path::Path;

fn sh(script: &str) -> ProcessConfig {
    ProcessConfig {
        command: vec!["sh".into(), "-c".into(), script.into()],
    }
}

fn base_config(workspace: &Path) -> LauncherConfig {
    LauncherConfig {
        env: EnvConfig {
            manager: EnvManager::None,
            packages: Vec::new(),
            ..EnvConfig::default()
        },
        setup: SetupConfig {
            workspace: workspace.to_path_buf(),
            ..SetupConfig::default()
        },
        readiness: ReadinessConfig {
            probe: ProbeKind::LogFile,
            timeout_secs: 10,
            poll_ms: 50,
            delay_secs: 1,
            tcp_addr: "127.0.0.1:1".into(),
        },
        teardown: TeardownConfig { grace_secs: 5 },
        ..LauncherConfig::default()
    }
}

#[tokio::test]
async fn full_sequence_orders_stages_and_tears_down() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config(dir.path());

    // Backend marks its start, writes a boot event to the audit log (the
    // readiness signal), then idles until SIGTERM.
    config.backend = sh(
        "touch backend_started; \
         echo '{\"event\":\"boot\"}' >> pala_audit.log; \
         trap 'touch backend_stopped; exit 0' TERM; \
         while :; do sleep 0.05; done",
    );
    // UI can only see the marker if the backend really started first.
    config.ui = sh("test -f backend_started && touch ui_saw_backend; exit 7");

    let code = launcher::run(config).await.unwrap();

    // UI exit code is forwarded
    assert_eq!(code, 7);
    // ordering: backend before UI
    assert!(dir.path().join("backend_started").exists());
    assert!(dir.path().join("ui_saw_backend").exists());
    // teardown terminated the backend
    assert!(dir.path().join("backend_stopped").exists());

    // boot-up ritual ran
    for core_dir in &SetupConfig::default().core_dirs {
        assert!(dir.path().join(core_dir).is_dir(), "missing {core_dir}");
    }

    // lifecycle events landed in the audit log
    let audit = std::fs::read_to_string(dir.path().join("pala_audit.log")).unwrap();
    assert!(audit.contains("BOOT_UP_RITUAL_COMPLETED"));
    assert!(audit.contains("LAUNCH_STARTED"));
    assert!(audit.contains("BACKEND_STARTED"));
    assert!(audit.contains("BACKEND_READY"));
    assert!(audit.contains("LAUNCH_FINISHED"));
}

#[tokio::test]
async fn setup_failure_warns_and_launch_continues_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config(dir.path());
    // a plain file where a core directory must go makes the ritual fail
    std::fs::write(dir.path().join("message_bus"), "not a directory").unwrap();
    config.backend = sh(
        "touch backend_started; \
         echo '{\"event\":\"boot\"}' >> pala_audit.log; \
         trap 'exit 0' TERM; \
         while :; do sleep 0.05; done",
    );
    config.ui = sh("touch ui_ran; exit 0");

    let code = launcher::run(config).await.unwrap();

    assert_eq!(code, 0);
    assert!(dir.path().join("backend_started").exists());
    assert!(dir.path().join("ui_ran").exists());

    let audit = std::fs::read_to_string(dir.path().join("pala_audit.log")).unwrap();
    assert!(audit.contains("SYSTEM_ERROR"));
    assert!(audit.contains("Setup failed"));
    assert!(audit.contains("LAUNCH_FINISHED"));
}

#[tokio::test]
async fn setup_failure_aborts_under_strict_mode() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config(dir.path());
    config.setup.strict = true;
    std::fs::write(dir.path().join("message_bus"), "not a directory").unwrap();
    config.backend = sh("touch backend_ran");
    config.ui = sh("touch ui_ran");

    let err = launcher::run(config).await.unwrap_err();
    assert!(matches!(err, LaunchError::Io(_)));
    assert!(!dir.path().join("backend_ran").exists());
    assert!(!dir.path().join("ui_ran").exists());
}

#[tokio::test]
async fn failed_activation_runs_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config(dir.path());
    config.env = EnvConfig {
        manager: EnvManager::Conda,
        conda_bin: "/nonexistent/conda-bin".into(),
        ..EnvConfig::default()
    };
    config.backend = sh("touch backend_ran");
    config.ui = sh("touch ui_ran");

    let err = launcher::run(config).await.unwrap_err();
    assert!(matches!(err, LaunchError::ManagerUnavailable { .. }));

    // no setup, no backend, no UI, no audit log
    assert!(!dir.path().join("message_bus").exists());
    assert!(!dir.path().join("backend_ran").exists());
    assert!(!dir.path().join("ui_ran").exists());
    assert!(!dir.path().join("pala_audit.log").exists());
}

#[tokio::test]
async fn backend_death_during_startup_aborts_before_ui() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config(dir.path());
    config.backend = sh("exit 9");
    config.ui = sh("touch ui_ran");

    let err = launcher::run(config).await.unwrap_err();
    assert!(matches!(err, LaunchError::BackendExited(_)));
    assert!(!dir.path().join("ui_ran").exists());
}

#[tokio::test]
async fn ui_spawn_failure_still_terminates_backend() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config(dir.path());
    config.backend = sh(
        "echo '{\"event\":\"boot\"}' >> pala_audit.log; \
         trap 'touch backend_stopped; exit 0' TERM; \
         while :; do sleep 0.05; done",
    );
    config.ui = ProcessConfig {
        command: vec!["/nonexistent/ui-program".into()],
    };

    let err = launcher::run(config).await.unwrap_err();
    assert!(matches!(err, LaunchError::Spawn { stage: "ui", .. }));
    assert!(dir.path().join("backend_stopped").exists());
}

#[tokio::test]
async fn legacy_delay_probe_still_orders_backend_before_ui() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config(dir.path());
    config.readiness.probe = ProbeKind::Delay;
    config.readiness.delay_secs = 1;
    config.backend = sh(
        "touch backend_started; \
         trap 'exit 0' TERM; \
         while :; do sleep 0.05; done",
    );
    config.ui = sh("test -f backend_started && touch ui_saw_backend; exit 0");

    let code = launcher::run(config).await.unwrap();
    assert_eq!(code, 0);
    assert!(dir.path().join("ui_saw_backend").exists());
}

#[tokio::test]
async fn dry_run_spawns_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config(dir.path());
    config.dry_run = true;
    config.backend = sh("touch backend_ran");
    config.ui = sh("touch ui_ran");

    let code = launcher::run(config).await.unwrap();
    assert_eq!(code, 0);
    assert!(!dir.path().join("backend_ran").exists());
    assert!(!dir.path().join("ui_ran").exists());
    assert!(!dir.path().join("message_bus").exists());
}
