use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::signal;

use common::req::{
    Esp32Alert, Esp32AlertKind, Esp32AlertStatus, Esp32Snapshot, LoadFlags, LoadStatus, Severity,
};

use crate::utils::ms_since_epoch;

const POLL_INTERVAL: Duration = Duration::from_secs(2);
const FETCH_TIMEOUT: Duration = Duration::from_secs(5);
const HISTORY_CAP: usize = 50;

const SHORT_CIRCUIT_MESSAGE: &str = "Short circuit";

/// Raw payload served by the device at `/main.json`.
#[derive(Debug, serde::Deserialize)]
pub struct DeviceReport {
    pub load1: String,
    pub load1_class: String,
    pub load2: String,
    pub load2_class: String,
    pub load3: String,
    pub load3_class: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Default)]
struct Esp32State {
    snapshot: Esp32Snapshot,
    history: VecDeque<Esp32Alert>, // newest first
}

/// Shared view of the poller-owned state. The poller task is the only
/// writer of the snapshot; handlers read it and flip history statuses.
#[derive(Clone, Default)]
pub struct Esp32Handle {
    state: Arc<Mutex<Esp32State>>,
}

impl Esp32Handle {
    fn lock(&self) -> std::sync::MutexGuard<'_, Esp32State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> Esp32Snapshot {
        self.lock().snapshot.clone()
    }

    pub fn alerts(&self, status: Option<Esp32AlertStatus>) -> Vec<Esp32Alert> {
        self.lock()
            .history
            .iter()
            .filter(|a| status.map_or(true, |s| a.status == s))
            .cloned()
            .collect()
    }

    pub fn acknowledge(&self, id: i64, now_ms: i64) -> Option<Esp32Alert> {
        let mut state = self.lock();
        state.history.iter_mut().find(|a| a.id == id).map(|a| {
            a.status = Esp32AlertStatus::Acknowledged;
            a.acknowledged_at = Some(now_ms);
            a.clone()
        })
    }

    pub fn resolve(&self, id: i64, now_ms: i64) -> Option<Esp32Alert> {
        let mut state = self.lock();
        state.history.iter_mut().find(|a| a.id == id).map(|a| {
            a.status = Esp32AlertStatus::Resolved;
            a.resolved_at = Some(now_ms);
            a.clone()
        })
    }

    pub fn mark_disconnected(&self) {
        self.lock().snapshot.is_connected = false;
    }

    /// Fold one device report into the snapshot and, when a fault is
    /// present, into the history. Consecutive reports with an identical
    /// fault signature (kind + per-load flags) collapse into one entry;
    /// the history keeps at most the latest 50.
    pub fn apply_report(&self, report: &DeviceReport, now_ms: i64) {
        let load = |text: &str, class: &str| LoadStatus {
            status: text.to_string(),
            class: class.to_string(),
            fault: class == "danger",
        };
        let short_circuit = report.message == SHORT_CIRCUIT_MESSAGE;
        let snapshot = Esp32Snapshot {
            load1: load(&report.load1, &report.load1_class),
            load2: load(&report.load2, &report.load2_class),
            load3: load(&report.load3, &report.load3_class),
            message: report.message.clone(),
            message_class: if short_circuit { "danger" } else { "hide" }.to_string(),
            last_update: now_ms,
            is_connected: true,
        };
        let loads = LoadFlags {
            load1: snapshot.load1.fault,
            load2: snapshot.load2.fault,
            load3: snapshot.load3.fault,
        };

        let mut state = self.lock();
        if short_circuit || loads.load1 || loads.load2 || loads.load3 {
            let kind = if short_circuit {
                Esp32AlertKind::ShortCircuit
            } else {
                Esp32AlertKind::Overload
            };
            let duplicate = state
                .history
                .front()
                .map(|last| last.kind == kind && last.loads == loads)
                .unwrap_or(false);
            if !duplicate {
                state.history.push_front(Esp32Alert {
                    id: now_ms,
                    timestamp: now_ms,
                    kind,
                    severity: if short_circuit {
                        Severity::Critical
                    } else {
                        Severity::High
                    },
                    message: if report.message.is_empty() {
                        "Overload detected".to_string()
                    } else {
                        report.message.clone()
                    },
                    loads,
                    status: Esp32AlertStatus::Active,
                    acknowledged_at: None,
                    resolved_at: None,
                });
                state.history.truncate(HISTORY_CAP);
            }
        }
        state.snapshot = snapshot;
    }
}

/// Spawn the device poller. The returned handle is the only way to reach
/// the poller's state.
pub fn spawn_poller(device_url: String) -> Esp32Handle {
    let handle = Esp32Handle::default();
    let state = handle.clone();

    actix_web::rt::spawn(async move {
        let client = match reqwest::Client::builder().timeout(FETCH_TIMEOUT).build() {
            Ok(client) => client,
            Err(err) => {
                log::error!("esp32 poller: building http client failed: {err}");
                return;
            }
        };
        log::info!("polling esp32 at {device_url}");
        let mut interval = tokio::time::interval(POLL_INTERVAL);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match fetch_report(&client, &device_url).await {
                        Ok(report) => state.apply_report(&report, ms_since_epoch()),
                        Err(err) => {
                            log::warn!("esp32 fetch failed: {err}");
                            state.mark_disconnected();
                        }
                    }
                }
                Ok(()) = signal::ctrl_c() => { break; }
            }
        }
    });

    handle
}

async fn fetch_report(
    client: &reqwest::Client,
    device_url: &str,
) -> Result<DeviceReport, reqwest::Error> {
    client
        .get(format!("{device_url}/main.json"))
        .send()
        .await?
        .json::<DeviceReport>()
        .await
}
