//! Monitor loop.
//!
//! Drives the whole system: on every interval tick, each watch is
//! queried, matching trains are evaluated, and alerts fan out to the
//! channel set. The loop also consumes control events for hot config
//! reload and shutdown.
//!
//! The interval does not re-anchor after a slow cycle; cycles run as
//! their own tasks, so a cycle that overruns the interval overlaps the
//! next one rather than delaying it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, Interval};
use tracing::{debug, error, info, warn};

use crate::cache::CachedTicketClient;
use crate::config::Config;
use crate::domain::{AlertMessage, SeatCategory, Watch, WatchError};
use crate::evaluate;
use crate::notify::{self, Channel};
use crate::railway::{RailwayError, TrainRecord};
use crate::stations::StationDirectory;

/// Delay before the very first poll cycle after startup or reload.
const STARTUP_DELAY: Duration = Duration::from_secs(5);

/// Grace period for the final alert at shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Control events consumed by the monitor loop.
#[derive(Debug)]
pub enum ControlEvent {
    /// The config file changed; rebuild channels and re-validate watches.
    Reload,

    /// Stop polling and exit.
    Shutdown,
}

/// Failures that abort one watch within a cycle.
///
/// Reported through the channel set; the remaining watches proceed.
#[derive(Debug, thiserror::Error)]
enum WatchCheckError {
    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error("unknown station name {0:?}")]
    UnknownStation(String),

    #[error(transparent)]
    Railway(#[from] RailwayError),
}

/// The monitor: owns the configuration, the channel set, and the
/// polling loop.
pub struct Monitor {
    client: Arc<CachedTicketClient>,
    stations: StationDirectory,
    config: Config,
    config_path: PathBuf,
    channels: Vec<Arc<dyn Channel>>,
}

impl Monitor {
    /// Create a monitor from validated configuration.
    ///
    /// Channels that fail construction are skipped with a warning.
    pub fn new(
        config: Config,
        config_path: impl Into<PathBuf>,
        client: Arc<CachedTicketClient>,
        stations: StationDirectory,
    ) -> Self {
        let channels = notify::build_channels(&config.notifications);
        if channels.is_empty() {
            warn!("no notification channels configured");
        }

        Self {
            client,
            stations,
            config,
            config_path: config_path.into(),
            channels,
        }
    }

    /// Run until a shutdown event arrives (or the control channel
    /// closes).
    pub async fn run(mut self, mut control: mpsc::Receiver<ControlEvent>) {
        self.announce_config().await;
        info!(
            delay_secs = STARTUP_DELAY.as_secs(),
            "first poll scheduled; press ctrl-c to stop"
        );

        let mut ticker = self.new_ticker();
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.spawn_cycle();
                }
                event = control.recv() => match event {
                    Some(ControlEvent::Reload) => {
                        if self.reload().await {
                            ticker = self.new_ticker();
                        }
                        // On failure the previous ticker keeps running.
                    }
                    Some(ControlEvent::Shutdown) | None => break,
                },
            }
        }

        self.shutdown().await;
    }

    /// Interval with the startup delay before its first tick.
    fn new_ticker(&self) -> Interval {
        tokio::time::interval_at(Instant::now() + STARTUP_DELAY, self.config.poll_interval())
    }

    /// Start one poll cycle as its own task.
    fn spawn_cycle(&self) {
        let cycle = Cycle {
            client: Arc::clone(&self.client),
            stations: self.stations.clone(),
            watches: self.config.watch.clone(),
            channels: self.channels.clone(),
            delay: self.config.request_delay(),
        };
        tokio::spawn(async move { cycle.run().await });
    }

    /// Reload configuration from disk. Returns whether the reload
    /// succeeded (and the caller should restart the interval timer).
    async fn reload(&mut self) -> bool {
        info!(path = %self.config_path.display(), "configuration change detected, reloading");

        let config = match Config::load(&self.config_path) {
            Ok(config) => config,
            Err(e) => {
                error!(error = %e, "configuration reload failed");
                self.alert(format!("配置文件重新加载失败：{e}")).await;
                return false;
            }
        };

        notify::dispose_all(&self.channels).await;
        self.channels = notify::build_channels(&config.notifications);
        self.config = config;

        self.announce_config().await;
        self.alert("配置文件已重新加载，监控已重新启动".to_string())
            .await;
        info!("configuration reloaded");
        true
    }

    /// Send the configuration echo so users can verify their channels.
    async fn announce_config(&self) {
        let descriptions: Vec<String> = self
            .channels
            .iter()
            .map(|channel| channel.describe())
            .collect();
        let summary = self.config.summary(&descriptions);
        println!("{summary}");

        self.alert(summary).await;
        info!("configuration alert attempted; check channel setup if it did not arrive");
    }

    /// Final alert and channel teardown.
    async fn shutdown(self) {
        info!("monitor stopping");
        let message = AlertMessage::new("车票监控程序已停止");
        if tokio::time::timeout(SHUTDOWN_GRACE, notify::fan_out(&self.channels, &message))
            .await
            .is_err()
        {
            warn!("final alert did not complete within the grace period");
        }
        notify::dispose_all(&self.channels).await;
    }

    async fn alert(&self, content: String) {
        let message = AlertMessage::new(content);
        notify::fan_out(&self.channels, &message).await;
    }

    /// Entry point for fatal errors outside the loop: one last-gasp
    /// alert through the given channels, bounded by the shutdown grace
    /// period.
    pub async fn last_gasp(channels: &[Arc<dyn Channel>], detail: &str) {
        let message = AlertMessage::new(format!("车票监控程序异常退出：{detail}"));
        let _ = tokio::time::timeout(SHUTDOWN_GRACE, notify::fan_out(channels, &message)).await;
    }
}

/// One poll cycle over every watch.
struct Cycle {
    client: Arc<CachedTicketClient>,
    stations: StationDirectory,
    watches: Vec<Watch>,
    channels: Vec<Arc<dyn Channel>>,
    delay: Duration,
}

impl Cycle {
    async fn run(&self) {
        info!("poll cycle started");

        for watch in &self.watches {
            if let Err(e) = self.check_watch(watch).await {
                error!(
                    date = %watch.date,
                    from = %watch.from,
                    to = %watch.to,
                    error = %e,
                    "watch check failed"
                );
                self.alert(format!("错误：{e}")).await;
            }
        }

        // Force fresh queries next cycle instead of relying on TTL alone.
        let stats = self.client.cache_stats().await;
        debug!(
            total = stats.total,
            valid = stats.valid,
            expired = stats.expired,
            "clearing ticket cache"
        );
        self.client.clear_cache().await;
        info!("poll cycle finished");
    }

    async fn check_watch(&self, watch: &Watch) -> Result<(), WatchCheckError> {
        info!(date = %watch.date, from = %watch.from, to = %watch.to, "checking watch");

        let date = watch.travel_date()?;
        let from = self
            .stations
            .code_of(&watch.from)
            .await
            .ok_or_else(|| WatchCheckError::UnknownStation(watch.from.clone()))?;
        let to = self
            .stations
            .code_of(&watch.to)
            .await
            .ok_or_else(|| WatchCheckError::UnknownStation(watch.to.clone()))?;

        let result = self
            .client
            .fetch_availability(date, from, to, Some(self.delay))
            .await?;

        for row in &result.data.result {
            let record = match TrainRecord::parse(row) {
                Ok(record) => record,
                Err(e) => {
                    warn!(error = %e, "skipping unparseable train row");
                    continue;
                }
            };

            if watch.trains.is_empty() {
                self.report_train(&record, None, false).await?;
            } else {
                let from_name = self.stations.name_of(record.from_telecode).await;
                let to_name = self.stations.name_of(record.to_telecode).await;
                for filter in &watch.trains {
                    if filter.matches(
                        &record.train_code,
                        from_name.as_deref(),
                        to_name.as_deref(),
                    ) {
                        self.report_train(
                            &record,
                            filter.seat_category.as_deref(),
                            filter.check_round_trip,
                        )
                        .await?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Evaluate one train and fan out an alert when seats are found.
    async fn report_train(
        &self,
        record: &TrainRecord,
        seat_filter: Option<&[SeatCategory]>,
        check_round_trip: bool,
    ) -> Result<(), RailwayError> {
        let from_name = self.display_name(record.from_telecode).await;
        let to_name = self.display_name(record.to_telecode).await;
        let description = format!("{} {from_name}→{to_name}", record.train_code);

        let evaluation = evaluate::evaluate(
            &self.client,
            record,
            seat_filter,
            check_round_trip,
            Some(self.delay),
        )
        .await?;

        let mut summary = evaluation.summary;
        if !evaluation.has_availability
            && let Some(categories) = seat_filter
        {
            let labels: Vec<&str> = categories.iter().map(|c| c.label()).collect();
            summary = format!("{} {summary}", labels.join("/"));
        }

        info!(train = %description, %summary);

        if evaluation.has_availability {
            let message = AlertMessage::new(format!("{description}\n{summary}"));
            let channels = self.channels.clone();
            // Fan out without blocking the rest of the cycle.
            tokio::spawn(async move { notify::fan_out(&channels, &message).await });
        }

        Ok(())
    }

    async fn display_name(&self, code: crate::domain::Telecode) -> String {
        self.stations
            .name_of(code)
            .await
            .unwrap_or_else(|| code.to_string())
    }

    async fn alert(&self, content: String) {
        let message = AlertMessage::new(content);
        notify::fan_out(&self.channels, &message).await;
    }
}

/// Spawn the config-file watcher that drives hot reload.
///
/// Polls the watched file's mtime once a second and emits a reload event
/// shortly after it changes. Note: the watched filename is distinct from
/// the live config file read on reload.
pub fn spawn_config_watcher(
    watched_path: impl Into<PathBuf>,
    control: mpsc::Sender<ControlEvent>,
) -> tokio::task::JoinHandle<()> {
    let watched_path = watched_path.into();

    fn mtime(path: &std::path::Path) -> Option<std::time::SystemTime> {
        std::fs::metadata(path).and_then(|m| m.modified()).ok()
    }

    tokio::spawn(async move {
        let mut last = mtime(&watched_path);
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        loop {
            ticker.tick().await;
            let current = mtime(&watched_path);
            if let Some(current_mtime) = current
                && last.is_none_or(|previous| current_mtime > previous)
            {
                if last.is_some() {
                    // Give the writer a moment to finish the file.
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    if control.send(ControlEvent::Reload).await.is_err() {
                        return;
                    }
                }
                last = Some(current_mtime);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::io::Write;
    use std::sync::Mutex;

    use crate::cache::CacheConfig;
    use crate::domain::Telecode;
    use crate::notify::DeliveryError;
    use crate::railway::{TicketClient, TicketClientConfig};
    use crate::stations::{StationClient, StationClientConfig};

    struct TestChannel {
        delivered: Mutex<Vec<String>>,
        disposed: Mutex<bool>,
    }

    impl TestChannel {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                delivered: Mutex::new(Vec::new()),
                disposed: Mutex::new(false),
            })
        }
    }

    #[async_trait]
    impl Channel for TestChannel {
        fn describe(&self) -> String {
            "test channel".to_string()
        }

        async fn send(&self, message: &AlertMessage) -> Result<(), DeliveryError> {
            self.delivered.lock().unwrap().push(message.content.clone());
            Ok(())
        }

        async fn dispose(&self) {
            *self.disposed.lock().unwrap() = true;
        }
    }

    fn offline_client() -> Arc<CachedTicketClient> {
        let client = TicketClient::new(TicketClientConfig::new()).unwrap();
        Arc::new(CachedTicketClient::new(client, CacheConfig::default()))
    }

    fn empty_directory() -> StationDirectory {
        StationDirectory::empty(StationClient::new(StationClientConfig::new()).unwrap())
    }

    fn watch(date: &str) -> Watch {
        serde_yaml::from_str(&format!("{{date: \"{date}\", from: 北京南, to: 上海虹桥}}"))
            .unwrap()
    }

    #[tokio::test]
    async fn out_of_window_date_is_reported_and_cycle_continues() {
        let channel = TestChannel::new();
        let stations = empty_directory();
        stations.insert("北京南", Telecode::parse("VNP").unwrap()).await;
        stations.insert("上海虹桥", Telecode::parse("AOH").unwrap()).await;

        let cycle = Cycle {
            client: offline_client(),
            stations,
            watches: vec![watch("19990101")],
            channels: vec![channel.clone()],
            delay: Duration::ZERO,
        };

        cycle.run().await;

        let delivered = channel.delivered.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert!(delivered[0].starts_with("错误："), "got: {}", delivered[0]);
        assert!(delivered[0].contains("bookable window"));
    }

    #[tokio::test]
    async fn unknown_station_is_reported() {
        let channel = TestChannel::new();

        let cycle = Cycle {
            client: offline_client(),
            stations: empty_directory(),
            watches: vec![watch("20990101")],
            channels: vec![channel.clone()],
            delay: Duration::ZERO,
        };

        cycle.run().await;

        let delivered = channel.delivered.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert!(delivered[0].contains("北京南"));
    }

    #[tokio::test]
    async fn reload_swaps_and_disposes_channels() {
        let old_channel = TestChannel::new();

        let mut config_file = tempfile::NamedTempFile::new().unwrap();
        config_file
            .write_all(
                r#"
watch:
  - date: "20260815"
    from: 北京
    to: 上海
notifications:
  - type: HTTP
    url: http://127.0.0.1:9/hook
"#
                .as_bytes(),
            )
            .unwrap();

        let mut monitor = Monitor {
            client: offline_client(),
            stations: empty_directory(),
            config: Config::from_yaml("watch: [{date: \"20260815\", from: a, to: b}]").unwrap(),
            config_path: config_file.path().to_path_buf(),
            channels: vec![old_channel.clone()],
        };

        assert!(monitor.reload().await);

        assert!(*old_channel.disposed.lock().unwrap());
        assert_eq!(monitor.channels.len(), 1);
        assert!(monitor.channels[0].describe().starts_with("HTTP 推送"));
        assert_eq!(monitor.config.watch[0].from, "北京");
    }

    #[tokio::test]
    async fn failed_reload_keeps_old_channels_and_alerts() {
        let old_channel = TestChannel::new();

        let mut monitor = Monitor {
            client: offline_client(),
            stations: empty_directory(),
            config: Config::from_yaml("watch: [{date: \"20260815\", from: a, to: b}]").unwrap(),
            config_path: PathBuf::from("/nonexistent/config.yml"),
            channels: vec![old_channel.clone()],
        };

        assert!(!monitor.reload().await);

        assert!(!*old_channel.disposed.lock().unwrap());
        let delivered = old_channel.delivered.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert!(delivered[0].contains("配置文件重新加载失败"));
    }
}
