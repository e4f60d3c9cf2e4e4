//! Link source adapter
//!
//! Translates the three discovery channels into scheduler calls:
//!
//! - bulk scans admit every classified address at `low`
//! - viewport entry admits at `low` and boosts to `normal`; exit restores
//! - hover admits at `low` and boosts to `realtime`; leave restores
//!
//! Scans and viewport entries are refused while the connection gate is closed.
//! Hover is not gated.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::classify::Classifier;
use crate::scheduler::{Priority, Scheduler};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum EffectiveType {
    #[serde(rename = "slow-2g")]
    Slow2g,
    #[serde(rename = "2g")]
    TwoG,
    #[serde(rename = "3g")]
    ThreeG,
    #[serde(rename = "4g")]
    FourG,
}

impl EffectiveType {
    pub fn is_slow(&self) -> bool {
        matches!(self, EffectiveType::Slow2g | EffectiveType::TwoG)
    }
}

/// What the environment reports about the current connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConnectionInfo {
    pub effective_type: EffectiveType,
    #[serde(default)]
    pub save_data: bool,
}

impl Default for ConnectionInfo {
    fn default() -> Self {
        Self {
            effective_type: EffectiveType::FourG,
            save_data: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateReason {
    SlowConnection,
    DataSaver,
}

impl fmt::Display for GateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateReason::SlowConnection => f.write_str("slow connection"),
            GateReason::DataSaver => f.write_str("data saver mode"),
        }
    }
}

/// Admission gate based on connection quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionGate {
    pub avoid_slow_connections: bool,
    pub avoid_data_saver: bool,
}

impl ConnectionGate {
    /// Returns why admission is refused, or `None` when open.
    pub fn check(&self, connection: &ConnectionInfo) -> Option<GateReason> {
        if self.avoid_slow_connections && connection.effective_type.is_slow() {
            return Some(GateReason::SlowConnection);
        }
        if self.avoid_data_saver && connection.save_data {
            return Some(GateReason::DataSaver);
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoostSwitches {
    pub viewport: bool,
    pub hover: bool,
}

impl Default for BoostSwitches {
    fn default() -> Self {
        Self {
            viewport: true,
            hover: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    HoverEnter,
    HoverLeave,
    ViewportEnter,
    ViewportExit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalOutcome {
    Applied,
    /// The boost channel for this signal is switched off.
    Disabled,
    /// The classifier ignores this address.
    Rejected,
    /// Restore for an address never admitted.
    Unknown,
    Gated,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ScanReport {
    pub admitted: usize,
    pub already_known: usize,
    pub rejected: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gated: Option<GateReason>,
}

pub struct LinkFeed {
    scheduler: Scheduler,
    classifier: Classifier,
    gate: ConnectionGate,
    boosts: BoostSwitches,
    connection: RwLock<ConnectionInfo>,
}

impl LinkFeed {
    pub fn new(
        scheduler: Scheduler,
        classifier: Classifier,
        gate: ConnectionGate,
        boosts: BoostSwitches,
        connection: ConnectionInfo,
    ) -> Self {
        Self {
            scheduler,
            classifier,
            gate,
            boosts,
            connection: RwLock::new(connection),
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn connection(&self) -> ConnectionInfo {
        *self.connection.read()
    }

    pub fn set_connection(&self, connection: ConnectionInfo) {
        info!(?connection, "Connection info updated");
        *self.connection.write() = connection;
    }

    /// Why scans are currently refused, if they are.
    pub fn gate_reason(&self) -> Option<GateReason> {
        self.gate.check(&self.connection.read())
    }

    /// Bulk scan: admits every classified address at `low`.
    pub async fn scan<I, S>(&self, addresses: I) -> ScanReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if let Some(reason) = self.gate_reason() {
            warn!(%reason, "Prefetching skipped");
            return ScanReport {
                gated: Some(reason),
                ..ScanReport::default()
            };
        }

        let mut report = ScanReport::default();
        for address in addresses {
            let address = address.as_ref().trim();
            let Some(method) = self.classifier.classify(address) else {
                report.rejected += 1;
                continue;
            };
            let admission = self
                .scheduler
                .admit_or_get(address, method, Priority::Low)
                .await;
            if admission.inserted {
                report.admitted += 1;
            } else {
                report.already_known += 1;
            }
        }

        debug!(
            admitted = report.admitted,
            already_known = report.already_known,
            rejected = report.rejected,
            "Link scan finished"
        );
        report
    }

    pub async fn signal(&self, address: &str, signal: Signal) -> SignalOutcome {
        match signal {
            Signal::HoverEnter => self.hover_enter(address).await,
            Signal::HoverLeave => self.hover_leave(address).await,
            Signal::ViewportEnter => self.viewport_enter(address).await,
            Signal::ViewportExit => self.viewport_exit(address).await,
        }
    }

    pub async fn viewport_enter(&self, address: &str) -> SignalOutcome {
        if !self.boosts.viewport {
            return SignalOutcome::Disabled;
        }
        if let Some(reason) = self.gate_reason() {
            debug!(address, %reason, "Viewport boost skipped");
            return SignalOutcome::Gated;
        }
        self.admit_and_boost(address, Priority::Normal).await
    }

    /// Restores the exiting link's own priority.
    pub async fn viewport_exit(&self, address: &str) -> SignalOutcome {
        if !self.boosts.viewport {
            return SignalOutcome::Disabled;
        }
        self.restore(address).await
    }

    pub async fn hover_enter(&self, address: &str) -> SignalOutcome {
        if !self.boosts.hover {
            return SignalOutcome::Disabled;
        }
        self.admit_and_boost(address, Priority::Realtime).await
    }

    pub async fn hover_leave(&self, address: &str) -> SignalOutcome {
        if !self.boosts.hover {
            return SignalOutcome::Disabled;
        }
        self.restore(address).await
    }

    async fn admit_and_boost(&self, address: &str, priority: Priority) -> SignalOutcome {
        let address = address.trim();
        let Some(method) = self.classifier.classify(address) else {
            return SignalOutcome::Rejected;
        };
        self.scheduler
            .admit_or_get(address, method, Priority::Low)
            .await;
        self.scheduler.boost(address, priority).await;
        SignalOutcome::Applied
    }

    async fn restore(&self, address: &str) -> SignalOutcome {
        if self.scheduler.restore(address.trim()).await {
            SignalOutcome::Applied
        } else {
            SignalOutcome::Unknown
        }
    }
}

/// Parses a link list: one address per line, blank lines and `#` comments skipped.
pub fn parse_link_list(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
        .collect()
}

/// Re-reads `path` every `interval` and scans its addresses.
///
/// New lines appended to the file are picked up on the next tick; addresses
/// already registered are deduplicated by the scheduler.
pub fn spawn_periodic_scan(
    feed: Arc<LinkFeed>,
    path: PathBuf,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match tokio::fs::read_to_string(&path).await {
                Ok(contents) => {
                    let report = feed.scan(parse_link_list(&contents)).await;
                    if report.admitted > 0 {
                        info!(
                            path = %path.display(),
                            admitted = report.admitted,
                            "Periodic scan admitted new links"
                        );
                    }
                }
                Err(error) => {
                    warn!(path = %path.display(), %error, "Periodic scan could not read link list");
                }
            }
        }
    })
}
