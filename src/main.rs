//! pala-launcher — boot sequencer for the PALA agent system
//!
//! Usage:
//!   pala-launcher                       → full launch (activate, setup, backend, UI)
//!   pala-launcher --skip-setup          → assume the workspace is already prepared
//!   pala-launcher --dry-run             → show the planned commands, spawn nothing
//!   pala-launcher --print-config        → emit the default TOML config

use clap::Parser;
use pala_launcher::config::LauncherConfig;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "pala-launcher",
    about = "Boot sequencer for the PALA agent system",
    version = env!("CARGO_PKG_VERSION"),
    long_about = "Activates the pala-env runtime environment, performs the boot-up ritual,\n\
                  starts the backend, waits for it to become ready, then runs the UI in\n\
                  the foreground. Tears the backend down when the UI exits."
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, default_value = "pala-launcher.toml")]
    config: PathBuf,

    /// Workspace root (overrides [setup].workspace)
    #[arg(short, long)]
    workspace: Option<PathBuf>,

    /// Environment name (overrides [env].name)
    #[arg(short, long)]
    env: Option<String>,

    /// Skip the boot-up ritual
    #[arg(long, default_value_t = false)]
    skip_setup: bool,

    /// Abort the launch if the boot-up ritual fails
    #[arg(long, default_value_t = false)]
    strict_setup: bool,

    /// Show the planned commands without spawning anything
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Print the default configuration as TOML and exit
    #[arg(long, default_value_t = false)]
    print_config: bool,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pala_launcher=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", LauncherConfig::default().to_toml());
        return Ok(());
    }

    init_tracing();

    let mut config = LauncherConfig::load(&cli.config);
    if let Some(workspace) = cli.workspace {
        config.setup.workspace = workspace;
    }
    if let Some(env) = cli.env {
        config.env.name = env;
    }
    config.setup.skip |= cli.skip_setup;
    config.setup.strict |= cli.strict_setup;
    config.dry_run |= cli.dry_run;

    match pala_launcher::launcher::run(config).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            tracing::error!("Launch failed: {e}");
            std::process::exit(1);
        }
    }
}
