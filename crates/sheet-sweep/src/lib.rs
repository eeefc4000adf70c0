//! Sheet Sweep
//!
//! Turns parameter sweep results into chart descriptions.
//!
//! # Core Concepts
//!
//! - [`classify`]: each axis and output column is numeric or categorical
//! - [`ChartStrategy`]: builds axes and series for one column shape
//! - [`StrategyRegistry`]: ordered, extensible list; first match wins
//! - [`SweepPlanner`]: one chart per output, stacked in evenly sized grid rows
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use sheet_sweep::{SweepData, SweepPlanner};
//!
//! let data = SweepData::new(vec!["rate".into()], vec!["total".into()])
//!     .with_row(vec![json!(1)], vec![json!(10)])
//!     .with_row(vec![json!(2)], vec![json!(20)]);
//!
//! let panels = SweepPlanner::new().plan(&data).unwrap();
//! assert_eq!(panels[0].strategy, "line");
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod charts;
pub mod classify;
pub mod data;
pub mod error;
pub mod layout;
pub mod planner;
pub mod strategy;

pub use classify::{classify, ColumnKind};
pub use data::{SweepData, SweepRow};
pub use error::SweepError;
pub use layout::{GridLayout, GridRect, Viewport};
pub use planner::{Choice, SweepPlanner};
pub use strategy::{
    AxisDef, AxisScale, ChartBody, ChartPanel, ChartStrategy, Coord, Series, SeriesKind, Shape,
    StrategyRegistry,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
