//! Live summary statistics for one account.
//!
//! A [`LedgerSession`] owns a background task that keeps a [`StatsSnapshot`]
//! current. It re-reads on a fixed poll, on `refresh_now`, and shortly after
//! ledger change notifications. Notifications are debounced so a burst of
//! writes costs one re-read, and a poll that lands within the cache window of
//! the previous refresh is skipped.

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::SessionConfig;
use crate::events::{ChangeNotifier, LedgerChanged};
use crate::reports::aggregation::period_totals;
use crate::reports::filter::{first_of_month, last_of_month};
use crate::traits::*;
use crate::types::*;

/// Sidebar figures for an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickStats {
    /// Scheduled items not yet paid
    pub pending_scheduled: usize,
    /// Projects in progress
    pub active_projects: usize,
    /// Income minus expenses for the current calendar month
    pub monthly_balance: BigDecimal,
}

impl Default for QuickStats {
    fn default() -> Self {
        Self {
            pending_scheduled: 0,
            active_projects: 0,
            monthly_balance: BigDecimal::from(0),
        }
    }
}

/// Latest published stats. `generation` increases by one per successful
/// refresh; it is 0 until the first one completes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub stats: QuickStats,
    pub generation: u64,
    pub refreshed_at: Option<DateTime<Utc>>,
}

/// Read the quick stats of `owner_id` for the month containing `today`
pub async fn quick_stats<S: LedgerStorage + ?Sized>(
    storage: &S,
    owner_id: &str,
    today: NaiveDate,
) -> LedgerResult<QuickStats> {
    let pending_scheduled = storage
        .list_scheduled(owner_id)
        .await?
        .iter()
        .filter(|s| !s.is_paid())
        .count();
    let active_projects = storage
        .list_projects(owner_id, Some(ProjectStatus::InProgress))
        .await?
        .len();
    let month = storage
        .list_transactions(
            owner_id,
            Some(first_of_month(today)),
            Some(last_of_month(today)),
        )
        .await?;

    Ok(QuickStats {
        pending_scheduled,
        active_projects,
        monthly_balance: period_totals(&month).balance,
    })
}

#[derive(Debug)]
enum Command {
    Refresh,
    Shutdown,
}

/// Handle to a running session task. Dropping the handle stops the task.
pub struct LedgerSession {
    snapshot: watch::Receiver<StatsSnapshot>,
    commands: mpsc::Sender<Command>,
    task: JoinHandle<()>,
}

impl LedgerSession {
    /// Start the refresh task. The first refresh runs immediately.
    pub fn spawn<S>(
        storage: S,
        owner_id: impl Into<String>,
        clock: Arc<dyn Clock>,
        notifier: &ChangeNotifier,
        config: SessionConfig,
    ) -> Self
    where
        S: LedgerStorage + 'static,
    {
        let (sender, snapshot) = watch::channel(StatsSnapshot::default());
        let (commands, receiver) = mpsc::channel(8);
        let refresher = Refresher {
            storage,
            owner_id: owner_id.into(),
            clock,
            cache_ttl: config.cache_ttl(),
            last_refresh: None,
            sender,
        };
        let task = tokio::spawn(run(
            refresher,
            receiver,
            notifier.subscribe(),
            config.poll_interval(),
            config.debounce(),
        ));

        Self {
            snapshot,
            commands,
            task,
        }
    }

    /// Receiver that observes every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<StatsSnapshot> {
        self.snapshot.clone()
    }

    /// The most recently published snapshot
    pub fn snapshot(&self) -> StatsSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Ask for an immediate refresh that bypasses the cache window. Requests
    /// made while others are queued are coalesced.
    pub fn refresh_now(&self) {
        if let Err(mpsc::error::TrySendError::Closed(_)) = self.commands.try_send(Command::Refresh) {
            tracing::debug!("refresh requested after session stopped");
        }
    }

    /// Stop the task and wait for it to finish
    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown).await;
        if let Err(err) = self.task.await {
            tracing::warn!(error = %err, "ledger session task failed");
        }
    }
}

struct Refresher<S> {
    storage: S,
    owner_id: String,
    clock: Arc<dyn Clock>,
    cache_ttl: Duration,
    last_refresh: Option<Instant>,
    sender: watch::Sender<StatsSnapshot>,
}

impl<S: LedgerStorage> Refresher<S> {
    async fn refresh(&mut self, forced: bool) {
        if !forced
            && self
                .last_refresh
                .is_some_and(|at| at.elapsed() < self.cache_ttl)
        {
            tracing::trace!(owner_id = %self.owner_id, "refresh skipped, cached");
            return;
        }

        match quick_stats(&self.storage, &self.owner_id, self.clock.today()).await {
            Ok(stats) => {
                self.last_refresh = Some(Instant::now());
                let refreshed_at = self.clock.now();
                self.sender.send_modify(|snapshot| {
                    snapshot.stats = stats;
                    snapshot.generation += 1;
                    snapshot.refreshed_at = Some(refreshed_at);
                });
            }
            Err(err) => {
                tracing::warn!(owner_id = %self.owner_id, error = %err, "stats refresh failed, keeping last snapshot");
            }
        }
    }
}

async fn run<S: LedgerStorage>(
    mut refresher: Refresher<S>,
    mut commands: mpsc::Receiver<Command>,
    mut changes: broadcast::Receiver<LedgerChanged>,
    poll_interval: Duration,
    debounce: Duration,
) {
    let mut poll = time::interval(poll_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let pending = time::sleep(debounce);
    tokio::pin!(pending);
    let mut armed = false;
    let mut listening = true;

    tracing::debug!(owner_id = %refresher.owner_id, "ledger session started");
    loop {
        tokio::select! {
            _ = poll.tick() => refresher.refresh(false).await,
            command = commands.recv() => match command {
                Some(Command::Refresh) => refresher.refresh(true).await,
                Some(Command::Shutdown) | None => break,
            },
            change = changes.recv(), if listening => match change {
                Ok(change) if change.owner_id != refresher.owner_id => {}
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {
                    pending.as_mut().reset(Instant::now() + debounce);
                    armed = true;
                }
                Err(broadcast::error::RecvError::Closed) => listening = false,
            },
            _ = &mut pending, if armed => {
                armed = false;
                refresher.refresh(true).await;
            }
        }
    }
    tracing::debug!(owner_id = %refresher.owner_id, "ledger session stopped");
}
