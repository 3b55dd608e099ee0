use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ticket_monitor::cache::{CacheConfig, CachedTicketClient};
use ticket_monitor::config::Config;
use ticket_monitor::monitor::{ControlEvent, Monitor, spawn_config_watcher};
use ticket_monitor::notify;
use ticket_monitor::railway::{TicketClient, TicketClientConfig};
use ticket_monitor::stations::{StationClient, StationClientConfig, StationDirectory};

/// The live configuration file.
const CONFIG_FILE: &str = "config.yml";

/// The file observed for change notifications. Distinct from the live
/// config file.
const WATCHED_FILE: &str = "config.json";

const BANNER: &str = r"
           __________  ________  ___
          / ____/ __ \/_  __/  |/  /
         / /   / /_/ / / / / /|_/ /
        / /___/ _  _/ / / / /  / /
        \____/_/ |_| /_/ /_/  /_/
";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("{BANNER}");

    // Configuration errors are fatal before anything else starts.
    let config = match Config::load(CONFIG_FILE) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "could not load {CONFIG_FILE}");
            eprintln!("配置文件错误：{e}");
            std::process::exit(1);
        }
    };

    // Channels are built early so later startup failures can still be
    // pushed out as a last-gasp alert.
    let channels = notify::build_channels(&config.notifications);

    let station_client = match StationClient::new(StationClientConfig::new()) {
        Ok(client) => client,
        Err(e) => return die(&channels, &e.to_string()).await,
    };

    info!("fetching station directory");
    let stations = match StationDirectory::fetch(station_client).await {
        Ok(stations) => stations,
        Err(e) => return die(&channels, &e.to_string()).await,
    };
    info!(stations = stations.len().await, "station directory loaded");

    let ticket_client = match TicketClient::new(TicketClientConfig::new()) {
        Ok(client) => client,
        Err(e) => return die(&channels, &e.to_string()).await,
    };
    let client = Arc::new(CachedTicketClient::new(ticket_client, CacheConfig::default()));
    let sweeper = client.spawn_sweeper();

    let (control_tx, control_rx) = mpsc::channel(8);

    let watcher = spawn_config_watcher(WATCHED_FILE, control_tx.clone());
    info!(watched = WATCHED_FILE, "config hot reload enabled");

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = control_tx.send(ControlEvent::Shutdown).await;
        }
    });

    let monitor = Monitor::new(config, CONFIG_FILE, client, stations);
    monitor.run(control_rx).await;

    watcher.abort();
    sweeper.abort();
    info!("monitor exited");
}

/// Report a fatal startup error, attempt a last-gasp alert, and exit
/// non-zero.
async fn die(channels: &[Arc<dyn notify::Channel>], detail: &str) {
    error!(error = detail, "fatal startup error");
    Monitor::last_gasp(channels, detail).await;
    std::process::exit(1);
}
