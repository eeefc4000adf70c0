//! Sheet Editor
//!
//! Editing session for one sheet: every mutation is checked against the
//! edit lease, recorded for undo, announced to subscribers and followed by
//! a debounced preview.
//!
//! # Core Concepts
//!
//! - [`Editor`]: the session; owns the live graph, history and lease
//! - [`Backends`]: the store, evaluator, lease server and sheet source it talks to
//! - [`EditorConfig`]: delays, history depth, save retry, loaded from TOML
//! - [`EditorError`]: one error type over every layer
//!
//! # Example
//!
//! ```rust
//! use sheet_editor::EditorConfig;
//! use std::time::Duration;
//!
//! let config = EditorConfig::from_toml_str("identity = \"ann\"\nheartbeat_secs = 5").unwrap();
//! assert_eq!(config.heartbeat(), Duration::from_secs(5));
//! assert_eq!(config.save_attempts, 3);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod session;

pub use config::EditorConfig;
pub use error::EditorError;
pub use session::{Backends, Editor, OpenReport};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
