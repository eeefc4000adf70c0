//! Sheet Lease
//!
//! Single-writer edit lease per sheet.
//!
//! # Core Concepts
//!
//! - [`SessionContext`]: identity plus a tab id fixed for the context's lifetime
//! - [`LeaseApi`]: lease server seam (peek, acquire, release, force)
//! - [`LeaseSession`]: opens the lease, renews it while held, polls while not
//!   held, and publishes [`LeaseStatus`] on a watch channel
//!
//! Only [`LeaseStatus::Held`] permits editing. A lease held by the same
//! identity from another tab is treated as read-only and never acquired
//! implicitly; [`LeaseSession::take_over`] is the explicit way in.
//!
//! # Example
//!
//! ```rust
//! use sheet_graph::SheetId;
//! use sheet_lease::{Lease, LeaseStatus, SessionContext};
//!
//! let me = SessionContext::new("ann");
//! let bob = SessionContext::new("bob");
//! let status = LeaseStatus::observe(Some(Lease::new(SheetId::new(), &bob)), &me);
//! assert!(!status.is_editable());
//! assert_eq!(status.holder(), Some("bob"));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod lease;
pub mod session;

pub use error::LeaseError;
pub use lease::{Lease, LeaseApi, LeaseStatus, SessionContext};
pub use session::{LeaseSession, DEFAULT_HEARTBEAT};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
