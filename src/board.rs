//! Status board: latest snapshot per address, with finished rows fading out.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::scheduler::{ResourceSnapshot, Scheduler};

#[derive(Debug, Clone, Serialize)]
pub struct BoardRow {
    #[serde(flatten)]
    pub resource: ResourceSnapshot,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    touched: Instant,
}

/// Observer table of resource snapshots.
///
/// Rows are only dropped when a `removed` event arrives; [`StatusBoard::fade`]
/// asks the scheduler to emit that event for rows finished longer than the
/// fade-out delay.
#[derive(Debug)]
pub struct StatusBoard {
    rows: RwLock<BTreeMap<String, BoardRow>>,
    fadeout_delay: Duration,
}

impl StatusBoard {
    /// Creates a board and subscribes it to `scheduler`'s events.
    pub fn attach(scheduler: &Scheduler, fadeout_delay: Duration) -> Arc<Self> {
        let board = Arc::new(Self {
            rows: RwLock::new(BTreeMap::new()),
            fadeout_delay,
        });

        let sink = Arc::clone(&board);
        scheduler.on_resource_queued(move |snapshot| sink.upsert(snapshot));
        let sink = Arc::clone(&board);
        scheduler.on_resource_updated(move |snapshot| sink.upsert(snapshot));
        let sink = Arc::clone(&board);
        scheduler.on_resource_removed(move |snapshot| sink.remove(&snapshot.address));

        board
    }

    fn upsert(&self, snapshot: &ResourceSnapshot) {
        self.rows.write().insert(
            snapshot.address.clone(),
            BoardRow {
                resource: snapshot.clone(),
                updated_at: Utc::now(),
                touched: Instant::now(),
            },
        );
    }

    fn remove(&self, address: &str) {
        if self.rows.write().remove(address).is_some() {
            debug!(address, "Board row removed");
        }
    }

    pub fn rows(&self) -> Vec<BoardRow> {
        self.rows.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Addresses of finished rows untouched for at least the fade-out delay.
    pub fn faded(&self, now: Instant) -> Vec<String> {
        self.rows
            .read()
            .values()
            .filter(|row| row.resource.state.is_terminal())
            .filter(|row| now.saturating_duration_since(row.touched) >= self.fadeout_delay)
            .map(|row| row.resource.address.clone())
            .collect()
    }

    /// Requests removal of every faded row. Returns how many were requested.
    pub async fn fade(&self, scheduler: &Scheduler, now: Instant) -> usize {
        let faded = self.faded(now);
        let mut removed = 0;
        for address in &faded {
            if scheduler.notify_removed(address).await {
                removed += 1;
            }
        }
        removed
    }

    /// Runs [`StatusBoard::fade`] on a fixed period.
    pub fn spawn_fader(self: &Arc<Self>, scheduler: Scheduler, period: Duration) -> JoinHandle<()> {
        let board = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let removed = board.fade(&scheduler, Instant::now()).await;
                if removed > 0 {
                    debug!(removed, "Faded finished board rows");
                }
            }
        })
    }

    /// Plain-text table of the current rows.
    pub fn render(&self) -> String {
        let rows = self.rows.read();
        let width = rows
            .keys()
            .map(|address| address.len())
            .max()
            .unwrap_or(0)
            .max("ADDRESS".len());

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<width$}  {:<13}  {:<8}  STATE",
            "ADDRESS", "METHOD", "PRIORITY"
        );
        for row in rows.values() {
            let _ = writeln!(
                out,
                "{:<width$}  {:<13}  {:<8}  {}",
                row.resource.address,
                row.resource.method.as_str(),
                row.resource.priority.as_str(),
                row.resource.state,
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issuer::DryRunIssuer;
    use crate::scheduler::{Method, MethodToggles, Priority, SchedulerPolicy, State};

    fn scheduler() -> Scheduler {
        let policy = SchedulerPolicy::new(1, MethodToggles::all(true));
        Scheduler::new(policy, Arc::new(DryRunIssuer::new()))
    }

    #[tokio::test]
    async fn test_board_tracks_latest_snapshot() {
        let scheduler = scheduler();
        let board = StatusBoard::attach(&scheduler, Duration::from_secs(5));

        scheduler
            .admit_or_get("https://a.test/", Method::Prefetch, Priority::Low)
            .await;
        scheduler.wait_idle().await;

        let rows = board.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].resource.state, State::Done);
        assert!(board.render().contains("https://a.test/"));
    }

    #[tokio::test]
    async fn test_fade_removes_finished_rows_only() {
        let scheduler = scheduler();
        let board = StatusBoard::attach(&scheduler, Duration::from_millis(0));

        scheduler
            .admit_or_get("https://a.test/", Method::Prefetch, Priority::Low)
            .await;
        scheduler.wait_idle().await;
        scheduler
            .admit_or_get("https://b.test/", Method::Prefetch, Priority::Low)
            .await;
        scheduler.abort("https://b.test/").await;
        scheduler.wait_idle().await;

        // Both rows are terminal now
        let removed = board.fade(&scheduler, Instant::now()).await;
        assert_eq!(removed, 2);
        assert!(board.is_empty());

        // Registry still deduplicates faded addresses
        let again = scheduler
            .admit_or_get("https://a.test/", Method::Prefetch, Priority::Low)
            .await;
        assert!(!again.inserted);
    }

    #[tokio::test]
    async fn test_fade_respects_delay() {
        let scheduler = scheduler();
        let board = StatusBoard::attach(&scheduler, Duration::from_secs(60));

        scheduler
            .admit_or_get("https://a.test/", Method::Prefetch, Priority::Low)
            .await;
        scheduler.wait_idle().await;

        assert!(board.faded(Instant::now()).is_empty());
        assert_eq!(board.faded(Instant::now() + Duration::from_secs(61)).len(), 1);
    }
}
