//! Sheet Client
//!
//! HTTP bindings for the remote services an editing session talks to.
//!
//! # Core Concepts
//!
//! - [`ApiClient`]: one `reqwest` client per server, sending the user
//!   identity in the `X-User-Name` header
//! - Evaluator: `POST /calculate/:id`, `POST /calculate/preview`,
//!   `POST /sheets/:id/sweep`
//! - Lease: `GET|POST|DELETE /api/sheets/:id/lock`, `POST …/lock/force`;
//!   a 409 answer `Locked by X` becomes [`sheet_lease::LeaseError::Locked`]
//! - [`SheetStore`]: `GET /sheets/:id` and `PUT /sheets/:id`
//!
//! # Example
//!
//! ```rust
//! use sheet_client::{ApiClient, ClientConfig};
//!
//! let config = ClientConfig::new("http://localhost:8000", "ann").unwrap();
//! let client = ApiClient::new(config).unwrap();
//! assert_eq!(client.config().identity, "ann");
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod client;
pub mod error;
mod evaluator;
mod lease;
pub mod store;

pub use client::{ApiClient, ClientConfig, DEFAULT_TIMEOUT, USER_HEADER};
pub use error::ClientError;
pub use store::SheetStore;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
