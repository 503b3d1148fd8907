//! VMBR CLI - point-in-time VM backup and restore.

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use vmbr_cloud::HttpCloudClient;
use vmbr_transfer::RcdTransferBackend;

mod config;

/// VMBR - snapshot VMs into image repositories and bring them back
#[derive(Parser)]
#[command(name = "vmbr")]
#[command(about = "Point-in-time VM backup and restore", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Snapshot a VM and export the image to the object store
    Backup,

    /// Upload an image as a new tag and boot a VM from it
    Restore,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // Cooperative cancellation: ctrl-c flips the token, the workflows
    // notice between poll iterations. A cancelled run restarts from the
    // beginning; no step is resumable.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling run");
            signal_cancel.cancel();
        }
    });

    let result = match cli.command {
        Commands::Backup => backup(&cancel).await,
        Commands::Restore => restore(&cancel).await,
    };

    if let Err(e) = result {
        error!(error = %e, "run failed");
        std::process::exit(1);
    }
}

async fn backup(cancel: &CancellationToken) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::load_backup_from_env()?;
    info!(
        vm = %cfg.request.vm_name,
        repository = %cfg.request.repo_name,
        date_tag = %cfg.request.date_tag,
        "starting backup"
    );

    let client = HttpCloudClient::new(&cfg.api.base_url, &cfg.api.token, &cfg.api.project);
    let backend = RcdTransferBackend::new(&cfg.rcd_url);

    let outcome = vmbr_workflow::run_backup(&client, &client, &backend, &cfg.request, cancel).await?;
    info!(
        repository_id = %outcome.repository_id,
        tag_id = %outcome.tag_id,
        "backup completed"
    );
    Ok(())
}

async fn restore(cancel: &CancellationToken) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::load_restore_from_env()?;
    info!(
        repository = %cfg.request.repo_name,
        date_tag = %cfg.request.date_tag,
        "starting restore"
    );

    let client = HttpCloudClient::new(&cfg.api.base_url, &cfg.api.token, &cfg.api.project);
    let backend = RcdTransferBackend::new(&cfg.rcd_url);

    let server_id =
        vmbr_workflow::run_restore(&client, &client, &backend, &cfg.request, cancel).await?;
    info!(server_id = %server_id, "restore completed");
    Ok(())
}
