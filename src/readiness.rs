//! Backend readiness probing.
//!
//! An explicit readiness signal between backend start and UI start, with a
//! fixed `delay` mode kept for deployments that want the old blind pause.
//! Every probe also watches backend liveness: a backend that dies during
//! the startup window aborts the launch instead of being slept past.

use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::audit::AuditLog;
use crate::config::{ProbeKind, ReadinessConfig};
use crate::error::LaunchError;
use crate::process::BackendHandle;

/// Probe outcome. A timeout is not fatal — the launch continues with a
/// warning; only an observed backend death aborts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    TimedOut,
}

/// `baseline_len` is the audit log size sampled before the backend was
/// spawned (and after the launcher's own writes), so only backend activity
/// can grow the file past it.
pub async fn wait_ready(
    cfg: &ReadinessConfig,
    backend: &mut BackendHandle,
    audit: &AuditLog,
    baseline_len: u64,
) -> Result<Readiness, LaunchError> {
    let poll = Duration::from_millis(cfg.poll_ms.max(10));
    let started = Instant::now();

    let deadline = match cfg.probe {
        ProbeKind::Delay => Duration::from_secs(cfg.delay_secs),
        _ => Duration::from_secs(cfg.timeout_secs),
    };

    info!(
        "Waiting for backend readiness ({:?}, up to {}s)",
        cfg.probe,
        deadline.as_secs()
    );

    loop {
        if let Some(status) = backend.exit_status() {
            return Err(LaunchError::BackendExited(status));
        }

        let ready = match cfg.probe {
            // the legacy delay never signals; it only runs out the clock
            ProbeKind::Delay => false,
            ProbeKind::LogFile => audit.len() > baseline_len,
            // each connect attempt is capped at one poll interval so an
            // unresponsive address cannot stall the loop past the deadline
            ProbeKind::Tcp => matches!(
                tokio::time::timeout(poll, tokio::net::TcpStream::connect(&cfg.tcp_addr)).await,
                Ok(Ok(_))
            ),
        };

        if ready {
            info!("Backend ready after {:.1}s", started.elapsed().as_secs_f32());
            return Ok(Readiness::Ready);
        }

        if started.elapsed() >= deadline {
            return match cfg.probe {
                ProbeKind::Delay => {
                    info!("Fixed delay of {}s elapsed", cfg.delay_secs);
                    Ok(Readiness::Ready)
                }
                _ => {
                    warn!(
                        "Backend not ready after {}s — continuing anyway",
                        cfg.timeout_secs
                    );
                    Ok(Readiness::TimedOut)
                }
            };
        }

        tokio::time::sleep(poll).await;
    }
}
