//! Per-sheet lease driver
//!
//! Holding the lease: renew it every interval. Not holding it: poll the
//! status every interval without acquiring. Status changes are published on
//! a watch channel.

use crate::error::LeaseError;
use crate::lease::{Lease, LeaseApi, LeaseStatus, SessionContext};
use chrono::{DateTime, Utc};
use sheet_graph::SheetId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Default heartbeat and poll period
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(10);

struct Shared {
    api: Arc<dyn LeaseApi>,
    sheet: SheetId,
    ctx: SessionContext,
    status: watch::Sender<LeaseStatus>,
    /// Bumped by every takeover; driver results from an older generation are dropped
    generation: AtomicU64,
}

impl Shared {
    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn publish(&self, next: LeaseStatus) {
        self.publish_since(self.generation(), next);
    }

    /// Publish a result of a request started at generation `started`
    fn publish_since(&self, started: u64, next: LeaseStatus) {
        self.status.send_if_modified(|current| {
            if self.generation() != started {
                debug!(sheet = %self.sheet, status = %next.describe(), "stale lease result ignored");
                return false;
            }
            if *current == next {
                return false;
            }
            info!(sheet = %self.sheet, status = %next.describe(), "lease status changed");
            *current = next;
            true
        });
    }

    /// Publish `next` and drop every result still in flight
    fn supersede(&self, next: LeaseStatus) {
        self.status.send_modify(|current| {
            self.generation.fetch_add(1, Ordering::AcqRel);
            info!(sheet = %self.sheet, status = %next.describe(), "lease status changed");
            *current = next;
        });
    }

    fn current(&self) -> LeaseStatus {
        self.status.borrow().clone()
    }

    /// Keep the last save time across renewals
    fn keep_saved(&self, mut lease: Lease) -> Lease {
        if let LeaseStatus::Held(previous) = &*self.status.borrow() {
            lease.last_saved_at = lease.last_saved_at.or(previous.last_saved_at);
        }
        lease
    }

    async fn recheck(&self, started: u64) {
        match self.api.peek(self.sheet).await {
            Ok(lease) => {
                let observed = LeaseStatus::observe(lease, &self.ctx);
                let observed = match observed {
                    LeaseStatus::Held(lease) => LeaseStatus::Held(self.keep_saved(lease)),
                    other => other,
                };
                debug!(sheet = %self.sheet, status = %observed.describe(), "lease polled");
                self.publish_since(started, observed);
            }
            Err(e) => debug!(sheet = %self.sheet, error = %e, "lease poll failed"),
        }
    }

    async fn heartbeat(&self, started: u64) {
        match self.api.acquire(self.sheet, &self.ctx).await {
            Ok(lease) => {
                let lease = self.keep_saved(lease);
                self.publish_since(started, LeaseStatus::Held(lease));
            }
            Err(LeaseError::Locked { holder }) => {
                warn!(sheet = %self.sheet, %holder, "lease lost");
                self.publish_since(started, LeaseStatus::HeldElsewhere { holder });
            }
            Err(e) => {
                debug!(sheet = %self.sheet, error = %e, "heartbeat failed, re-checking status");
                self.recheck(started).await;
            }
        }
    }

    async fn tick(&self) {
        let started = self.generation();
        if self.current().is_editable() {
            self.heartbeat(started).await;
        } else {
            self.recheck(started).await;
        }
    }
}

/// Lease handle for one open sheet
///
/// The background driver stops when the session is closed or dropped.
pub struct LeaseSession {
    shared: Arc<Shared>,
    driver: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for LeaseSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeaseSession")
            .field("sheet", &self.shared.sheet)
            .field("ctx", &self.shared.ctx)
            .field("status", &self.shared.current())
            .finish()
    }
}

impl LeaseSession {
    /// Open the lease for `sheet`
    ///
    /// Peeks first. A lease held by a different (identity, tab) leaves the
    /// session read-only without acquiring; otherwise the lease is acquired.
    /// A background task then renews or polls every `period`.
    pub async fn open(
        api: Arc<dyn LeaseApi>,
        sheet: SheetId,
        ctx: SessionContext,
        period: Duration,
    ) -> Self {
        let (status, _) = watch::channel(LeaseStatus::Unknown);
        let shared = Arc::new(Shared {
            api,
            sheet,
            ctx,
            status,
            generation: AtomicU64::new(0),
        });

        match shared.api.peek(sheet).await {
            Ok(Some(lease)) if !lease.is_held_by(&shared.ctx) => {
                shared.publish(LeaseStatus::observe(Some(lease), &shared.ctx));
            }
            Ok(_) => shared.heartbeat(shared.generation()).await,
            Err(e) => {
                debug!(sheet = %sheet, error = %e, "lease peek failed, acquiring");
                shared.heartbeat(shared.generation()).await;
            }
        }

        let driver = tokio::spawn(drive(Arc::clone(&shared), period));
        Self {
            shared,
            driver: Some(driver),
        }
    }

    /// Leased sheet
    #[inline]
    #[must_use]
    pub fn sheet(&self) -> SheetId {
        self.shared.sheet
    }

    /// Session identity
    #[inline]
    #[must_use]
    pub fn context(&self) -> &SessionContext {
        &self.shared.ctx
    }

    /// Current status
    #[must_use]
    pub fn status(&self) -> LeaseStatus {
        self.shared.current()
    }

    /// Whether mutations are allowed right now
    #[must_use]
    pub fn is_editable(&self) -> bool {
        self.shared.status.borrow().is_editable()
    }

    /// Watch status changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LeaseStatus> {
        self.shared.status.subscribe()
    }

    /// Run one heartbeat or poll immediately
    pub async fn refresh(&self) {
        self.shared.tick().await;
    }

    /// Force-acquire the lease regardless of the holder
    ///
    /// Callers confirm with the user first. Polls and heartbeats already in
    /// flight cannot overwrite the new status.
    ///
    /// # Errors
    /// - any error from the lease server; the status is left unchanged
    pub async fn take_over(&self) -> Result<Lease, LeaseError> {
        let lease = self.shared.api.force(self.shared.sheet, &self.shared.ctx).await?;
        info!(sheet = %self.shared.sheet, user = %self.shared.ctx.identity(), "lease taken over");
        self.shared.supersede(LeaseStatus::Held(lease.clone()));
        Ok(lease)
    }

    /// Record a successful save on the held lease
    ///
    /// # Errors
    /// - `LeaseError::NotHeld` when this session does not hold the lease
    pub fn mark_saved(&self, at: DateTime<Utc>) -> Result<(), LeaseError> {
        let mut held = false;
        self.shared.status.send_if_modified(|status| match status {
            LeaseStatus::Held(lease) => {
                lease.last_saved_at = Some(at);
                held = true;
                true
            }
            _ => false,
        });
        if held {
            Ok(())
        } else {
            Err(LeaseError::NotHeld)
        }
    }

    /// Stop the driver and release the lease if held
    ///
    /// Release is best effort; failures are logged and swallowed.
    pub async fn close(mut self) {
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
        if !self.shared.current().is_editable() {
            return;
        }
        match self.shared.api.release(self.shared.sheet, &self.shared.ctx).await {
            Ok(()) => info!(sheet = %self.shared.sheet, "lease released"),
            Err(e) => warn!(sheet = %self.shared.sheet, error = %e, "lease release failed"),
        }
        self.shared.publish(LeaseStatus::Free);
    }
}

impl Drop for LeaseSession {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }
}

async fn drive(shared: Arc<Shared>, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        shared.tick().await;
    }
}
