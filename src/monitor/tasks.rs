use anyhow::{Context, Result};
use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::controller::SeatMonitor;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info};

/// The flush and heartbeat tickers. Both stop when the token is cancelled.
pub struct BackgroundTasks {
    cancel_token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundTasks {
    pub fn spawn(monitor: SeatMonitor, cancel_token: CancellationToken) -> Self {
        let flush_every = period(monitor.settings().flush_interval_secs);
        let heartbeat_every = period(monitor.settings().heartbeat_interval_secs);

        let handles = vec![
            tokio::spawn(flush_loop(monitor.clone(), flush_every, cancel_token.clone())),
            tokio::spawn(heartbeat_loop(monitor, heartbeat_every, cancel_token.clone())),
        ];

        Self {
            cancel_token,
            handles,
        }
    }

    pub async fn shutdown(self) -> Result<()> {
        self.cancel_token.cancel();
        for handle in self.handles {
            handle.await.context("background task failed to join")?;
        }
        Ok(())
    }
}

fn period(secs: u64) -> Duration {
    Duration::from_secs(secs.max(1))
}

/// First tick lands one full period after start.
fn ticker(every: Duration) -> time::Interval {
    let mut ticker = time::interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn flush_loop(monitor: SeatMonitor, every: Duration, cancel_token: CancellationToken) {
    let mut ticker = ticker(every);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match monitor.flush(Utc::now()).await {
                    Ok(_) => {}
                    Err(err) => log_error!("aggregate flush failed, keeping buffer: {err}"),
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("flush loop shutting down");
                break;
            }
        }
    }
}

async fn heartbeat_loop(monitor: SeatMonitor, every: Duration, cancel_token: CancellationToken) {
    let mut ticker = ticker(every);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let reached = monitor.heartbeat(Utc::now());
                log_debug!("heartbeat sent to {} observers", reached);
            }
            _ = cancel_token.cancelled() => {
                log_info!("heartbeat loop shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::distributor::ObserverHub;
    use crate::settings::Settings;
    use std::sync::Arc;
    use uuid::Uuid;

    async fn monitor(settings: Settings) -> SeatMonitor {
        SeatMonitor::new(Database::in_memory().unwrap(), ObserverHub::new(), Arc::new(settings))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn heartbeat_reaches_observers_each_period() {
        let monitor = monitor(Settings {
            heartbeat_interval_secs: 1,
            flush_interval_secs: 3600,
            ..Settings::default()
        })
        .await;
        let mut observer = monitor.hub().register(Uuid::new_v4());
        let tasks = BackgroundTasks::spawn(monitor, CancellationToken::new());

        for _ in 0..2 {
            let message = time::timeout(Duration::from_secs(3), observer.recv())
                .await
                .unwrap()
                .unwrap();
            assert!(message.contains(r#""type":"heartbeat""#));
        }

        tasks.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn flush_ticker_writes_buckets() {
        let monitor = monitor(Settings {
            heartbeat_interval_secs: 3600,
            flush_interval_secs: 1,
            ..Settings::default()
        })
        .await;
        monitor
            .ingest(Uuid::new_v4(), r#"{"sensors": {"seat_top_left": 100}}"#)
            .await
            .unwrap();

        let tasks = BackgroundTasks::spawn(monitor.clone(), CancellationToken::new());
        time::sleep(Duration::from_millis(1500)).await;
        tasks.shutdown().await.unwrap();

        // one packet plus one bucket
        assert_eq!(monitor.health().await.unwrap().log_entries, 2);
    }
}
