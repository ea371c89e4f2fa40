use anyhow::{anyhow, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use debrid_core::auth::AuthOutcome;
use debrid_core::models::{AvailabilityEntry, DownloadOutcome, SourceId};
use debrid_core::service::{report_error, ActionRunner};
use debrid_core::{DebridError, DebridManager, LoginStep, Magnet, Presentation};

/// Default action of the command line: print the final URL
pub struct PrintUrl;

impl ActionRunner for PrintUrl {
    fn run_default(&self, url: &str) {
        println!("{url}");
    }
}

/// Accept either a magnet link or a bare hash
fn parse_magnet(input: &str) -> Result<Magnet> {
    let magnet = if input.starts_with("magnet:") || input.contains("magnet%3A") {
        Magnet::from_link(input)
    } else {
        Magnet::from_hash(input.trim())
    };

    if magnet.hash.is_none() {
        return Err(anyhow!("{input} does not contain a usable info hash"));
    }
    Ok(magnet)
}

/// Turn a failure into the process result its presentation calls for
fn present(source: SourceId, operation: &str, error: &DebridError, cancel_notice: Option<&str>) -> Result<()> {
    match report_error(source, operation, error, cancel_notice) {
        Presentation::Silent => Ok(()),
        Presentation::Notice(message) => {
            eprintln!("{message}");
            Ok(())
        }
        Presentation::Alert(message) => Err(anyhow!(message)),
    }
}

pub async fn login(
    manager: &mut DebridManager,
    source: SourceId,
    api_key: Option<&str>,
    cancel: &CancellationToken,
) -> Result<()> {
    let step = match manager.login(source, api_key).await {
        Ok(step) => step,
        Err(error) => return present(source, "authentication", &error, Some("Login cancelled")),
    };

    match step {
        LoginStep::Enabled => println!("Logged in to {source}"),
        LoginStep::Device(pending) => {
            println!("Open {} and enter the code {}", pending.verification_url, pending.user_code);
            match manager.complete_device_login(source, pending, cancel).await? {
                AuthOutcome::Success => println!("Logged in to {source}"),
                AuthOutcome::Timeout => return Err(anyhow!("{source} login timed out")),
                AuthOutcome::Cancelled => eprintln!("Login cancelled"),
            }
        }
        LoginStep::Redirect(url) => {
            println!("Open this URL and paste the address you are redirected to:\n{url}");
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            let callback = tokio::select! {
                () = cancel.cancelled() => {
                    eprintln!("Login cancelled");
                    return Ok(());
                }
                line = lines.next_line() => line?.ok_or_else(|| anyhow!("No callback URL was entered"))?,
            };
            if let Err(error) = manager.handle_auth_callback(callback.trim()).await {
                return present(source, "authentication error (callback)", &error, None);
            }
            println!("Logged in to {source}");
        }
    }

    if let Some(selected) = manager.selected() {
        println!("Active service: {selected}");
    }
    Ok(())
}

pub fn status(manager: &DebridManager) {
    for source in manager.sources() {
        let id = source.id();
        let marker = if manager.selected() == Some(id) { "*" } else { " " };
        let state = if source.is_logged_in() { "logged in" } else { "logged out" };
        match manager.masked_manual_key(id) {
            Some(key) => println!("{marker} {:<11} {state} (API key {key})", id.as_str()),
            None => println!("{marker} {:<11} {state}", id.as_str()),
        }
    }
    if manager.sources().is_empty() {
        println!("No services are enabled in the configuration");
    }
}

fn print_files(entry: &AvailabilityEntry) {
    for file in &entry.files {
        println!("    [{}] {}", file.id, file.name);
    }
}

pub async fn check(manager: &mut DebridManager, inputs: &[String]) -> Result<()> {
    let magnets = inputs.iter().map(|input| parse_magnet(input)).collect::<Result<Vec<_>>>()?;
    manager.populate_availability(&magnets).await;

    for magnet in &magnets {
        let hash = magnet.hash.as_deref().unwrap_or_default();
        let cached_on: Vec<&str> = manager
            .sources()
            .iter()
            .filter(|source| source.state().entry_for(hash).is_some())
            .map(|source| source.id().abbreviation())
            .collect();

        println!("{hash}  {:<8}  [{}]", manager.match_status(magnet).label(), cached_on.join(" "));
        if let Some(entry) = manager.active().and_then(|source| source.state().entry_for(hash)) {
            print_files(entry);
        }
    }
    Ok(())
}

pub async fn resolve(
    manager: &mut DebridManager,
    input: &str,
    file: Option<u64>,
    abandon: bool,
    cancel: &CancellationToken,
) -> Result<()> {
    let magnet = parse_magnet(input)?;
    let source = manager
        .selected()
        .ok_or_else(|| anyhow!("No debrid service is selected; log in or run `debrid select`"))?;

    manager.populate_availability(std::slice::from_ref(&magnet)).await;
    if let Err(error) = manager.preselect(&magnet, file) {
        tracing::debug!(error = %error, "Resolving without a preselected item");
    }

    let outcome = match manager.resolve_and_download(&magnet, cancel).await {
        Ok(outcome) => outcome,
        Err(error) if error.is_caching() => {
            eprintln!("The content is still being cached by {source}");
            if abandon {
                manager.delete_and_abandon(&magnet).await?;
                eprintln!("Deleted the remote job");
            } else {
                eprintln!("Run again with --abandon to delete the remote job");
            }
            return Ok(());
        }
        Err(error) => return present(source, "download", &error, Some("Download cancelled")),
    };

    match outcome {
        // The default action already printed the URL
        DownloadOutcome::Ready { .. } => Ok(()),
        DownloadOutcome::NeedsSelection(entry) => match file {
            Some(id) => {
                let chosen = manager.choose_file(id)?.clone();
                match manager.unrestrict_selected(&chosen, cancel).await {
                    Ok(_) => Ok(()),
                    Err(error) => present(source, "unrestrict", &error, Some("Unrestrict cancelled")),
                }
            }
            None => {
                println!("{source} returned several files; pick one with --file:");
                print_files(&entry);
                Ok(())
            }
        },
    }
}

pub async fn cloud(manager: &mut DebridManager, refresh: bool) -> Result<()> {
    let source = manager.selected().ok_or_else(|| anyhow!("No debrid service is selected"))?;
    if let Err(error) = manager.refresh_cloud(refresh).await {
        return present(source, "cloud fetch", &error, None);
    }

    println!("Magnets:");
    for magnet in manager.cloud_magnets() {
        println!("  {}  {:<12} {}", magnet.id, magnet.status, magnet.filename);
    }
    println!("Downloads:");
    for download in manager.cloud_downloads() {
        println!("  {}  {}", download.filename, download.link);
    }
    Ok(())
}
