//! Lease records, session identity and the lease server seam

use crate::error::LeaseError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sheet_graph::SheetId;
use uuid::Uuid;

/// Who is editing, from which tab
///
/// The tab id is generated once and kept for the lifetime of the context, so
/// two editors opened by the same identity never share one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    identity: String,
    tab_id: String,
}

impl SessionContext {
    /// Context for `identity` with a fresh tab id
    #[must_use]
    pub fn new(identity: impl Into<String>) -> Self {
        Self::with_tab(identity, Uuid::new_v4().to_string())
    }

    /// Context with an explicit tab id
    #[must_use]
    pub fn with_tab(identity: impl Into<String>, tab_id: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            tab_id: tab_id.into(),
        }
    }

    /// User identity
    #[inline]
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Tab id
    #[inline]
    #[must_use]
    pub fn tab_id(&self) -> &str {
        &self.tab_id
    }
}

/// Lease as stored by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    /// Leased sheet
    pub sheet_id: SheetId,
    /// Holder identity
    pub user: String,
    /// Holder tab
    pub tab_id: String,
    /// First acquisition
    pub acquired_at: DateTime<Utc>,
    /// Last heartbeat
    pub last_heartbeat: DateTime<Utc>,
    /// Last successful save by the holder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_saved_at: Option<DateTime<Utc>>,
}

impl Lease {
    /// Lease held by `ctx` as of now
    #[must_use]
    pub fn new(sheet_id: SheetId, ctx: &SessionContext) -> Self {
        let now = Utc::now();
        Self {
            sheet_id,
            user: ctx.identity().to_string(),
            tab_id: ctx.tab_id().to_string(),
            acquired_at: now,
            last_heartbeat: now,
            last_saved_at: None,
        }
    }

    /// Whether `ctx` is the exact holder
    #[must_use]
    pub fn is_held_by(&self, ctx: &SessionContext) -> bool {
        self.user == ctx.identity() && self.tab_id == ctx.tab_id()
    }

    /// Whether `ctx`'s identity holds it from a different tab
    #[must_use]
    pub fn is_other_tab_of(&self, ctx: &SessionContext) -> bool {
        self.user == ctx.identity() && self.tab_id != ctx.tab_id()
    }
}

/// Lease as seen by one session
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LeaseStatus {
    /// Not checked yet
    #[default]
    Unknown,
    /// Nobody holds it; this session did not acquire
    Free,
    /// This session holds it
    Held(Lease),
    /// The same identity holds it from another tab
    HeldInAnotherTab(Lease),
    /// Someone else holds it
    HeldElsewhere {
        /// Holder identity
        holder: String,
    },
}

impl LeaseStatus {
    /// Status implied by a peeked lease record
    #[must_use]
    pub fn observe(lease: Option<Lease>, ctx: &SessionContext) -> Self {
        match lease {
            None => Self::Free,
            Some(lease) if lease.is_held_by(ctx) => Self::Held(lease),
            Some(lease) if lease.is_other_tab_of(ctx) => Self::HeldInAnotherTab(lease),
            Some(lease) => Self::HeldElsewhere { holder: lease.user },
        }
    }

    /// Whether mutations are allowed
    #[inline]
    #[must_use]
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Held(_))
    }

    /// Holder identity, when known and not this session
    #[must_use]
    pub fn holder(&self) -> Option<&str> {
        match self {
            Self::HeldElsewhere { holder } => Some(holder),
            Self::HeldInAnotherTab(lease) => Some(&lease.user),
            _ => None,
        }
    }

    /// Short description for status displays
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Unknown => "checking lease".to_string(),
            Self::Free => "read-only: not editing".to_string(),
            Self::Held(_) => "editing".to_string(),
            Self::HeldInAnotherTab(_) => "read-only: held by you in another tab".to_string(),
            Self::HeldElsewhere { holder } => format!("read-only: locked by {holder}"),
        }
    }
}

/// Lease server operations
#[async_trait]
pub trait LeaseApi: Send + Sync {
    /// Current lease, if any, without acquiring
    async fn peek(&self, sheet: SheetId) -> Result<Option<Lease>, LeaseError>;

    /// Acquire or renew the lease
    ///
    /// Fails with [`LeaseError::Locked`] when another session holds it.
    async fn acquire(&self, sheet: SheetId, ctx: &SessionContext) -> Result<Lease, LeaseError>;

    /// Give the lease up
    async fn release(&self, sheet: SheetId, ctx: &SessionContext) -> Result<(), LeaseError>;

    /// Acquire regardless of the current holder
    async fn force(&self, sheet: SheetId, ctx: &SessionContext) -> Result<Lease, LeaseError>;
}
