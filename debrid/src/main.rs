mod commands;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;

use debrid_core::models::SourceId;
use debrid_core::provider::SourceContext;
use debrid_core::service::TracingHistoryRecorder;
use debrid_core::store::FileStore;
use debrid_core::{logging, Config, DebridManager};

use commands::PrintUrl;

#[derive(Parser, Debug)]
#[command(name = "debrid")]
#[command(about = "Resolve magnets through debrid services", long_about = None)]
struct Args {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, short, env = "DEBRID_CONFIG", default_value = "debrid.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in to a service, with an API key or its interactive flow
    Login {
        source: SourceId,
        /// Use this API key instead of the interactive login
        #[arg(long, env = "DEBRID_API_KEY")]
        api_key: Option<String>,
    },
    /// Remove the stored credentials of a service
    Logout { source: SourceId },
    /// Make a logged-in service the active one
    Select { source: SourceId },
    /// Show services, login state and the active service
    Status,
    /// Look magnets or hashes up on every logged-in service
    Check {
        #[arg(required = true)]
        magnets: Vec<String>,
    },
    /// Resolve a magnet or hash to a download URL on the active service
    Resolve {
        magnet: String,
        /// File id to pick when the magnet holds several files
        #[arg(long)]
        file: Option<u64>,
        /// Delete the remote job if the content is still being cached
        #[arg(long)]
        abandon: bool,
    },
    /// List the active service's cloud magnets and downloads
    Cloud {
        /// Ignore the listing cache
        #[arg(long)]
        refresh: bool,
    },
    /// Delete a cloud download
    DeleteDownload { id: String },
    /// Delete a cloud magnet (the most recent one when no id is given)
    DeleteMagnet { id: Option<String> },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load configuration
    let config = Config::load(Some(&args.config))?;
    if let Err(problems) = config.validate() {
        for problem in &problems {
            eprintln!("Config validation error: {problem}");
        }
        return Err(anyhow::anyhow!(
            "Configuration validation failed with {} error(s)",
            problems.len()
        ));
    }

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;

    // 3. Open the state directory and build the sources
    let store = Arc::new(FileStore::open(&config.store.state_dir)?);
    info!(dir = %config.store.state_dir.display(), "Opened state directory");
    let ctx = SourceContext::new(store.clone(), store)
        .with_agent(config.app.agent.as_str())
        .with_timeout(Duration::from_secs(config.app.request_timeout_secs))?;
    let mut manager = DebridManager::from_config(&config, &ctx, Arc::new(TracingHistoryRecorder), Arc::new(PrintUrl));

    // Ctrl-C cancels device polling and resolution
    let cancel = CancellationToken::new();
    let signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal.cancel();
        }
    });

    match args.command {
        Command::Login { source, api_key } => commands::login(&mut manager, source, api_key.as_deref(), &cancel).await,
        Command::Logout { source } => {
            manager.logout(source).await?;
            println!("Logged out of {source}");
            Ok(())
        }
        Command::Select { source } => {
            manager.select_source(source)?;
            println!("{source} is now the active service");
            Ok(())
        }
        Command::Status => {
            commands::status(&manager);
            Ok(())
        }
        Command::Check { magnets } => commands::check(&mut manager, &magnets).await,
        Command::Resolve { magnet, file, abandon } => {
            commands::resolve(&mut manager, &magnet, file, abandon, &cancel).await
        }
        Command::Cloud { refresh } => commands::cloud(&mut manager, refresh).await,
        Command::DeleteDownload { id } => {
            manager.delete_cloud_download(&id).await?;
            println!("Deleted download {id}");
            Ok(())
        }
        Command::DeleteMagnet { id } => {
            manager.delete_cloud_magnet(id.as_deref()).await?;
            println!("Deleted magnet {}", id.as_deref().unwrap_or("(most recent)"));
            Ok(())
        }
    }
}
