//! Sweep result table

use crate::error::SweepError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One evaluated point of a sweep
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SweepRow {
    /// Axis values, aligned with [`SweepData::axes`]
    #[serde(default)]
    pub inputs: Vec<Value>,
    /// Output values, aligned with [`SweepData::outputs`]
    #[serde(default)]
    pub outputs: Vec<Value>,
}

impl SweepRow {
    /// Row from axis and output values
    #[must_use]
    pub fn new(inputs: Vec<Value>, outputs: Vec<Value>) -> Self {
        Self { inputs, outputs }
    }
}

/// Sweep results: swept axes, observed outputs and the evaluated rows
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SweepData {
    /// Swept input names
    #[serde(default)]
    pub axes: Vec<String>,
    /// Output names
    #[serde(default)]
    pub outputs: Vec<String>,
    /// Evaluated points
    #[serde(default)]
    pub rows: Vec<SweepRow>,
}

impl SweepData {
    /// Empty table with the given columns
    #[must_use]
    pub fn new(axes: Vec<String>, outputs: Vec<String>) -> Self {
        Self {
            axes,
            outputs,
            rows: Vec::new(),
        }
    }

    /// Append a row
    #[must_use]
    pub fn with_row(mut self, inputs: Vec<Value>, outputs: Vec<Value>) -> Self {
        self.rows.push(SweepRow::new(inputs, outputs));
        self
    }

    /// Check every row against the declared columns
    ///
    /// # Errors
    /// - `SweepError::RowWidth` for the first mismatched row
    pub fn validate(&self) -> Result<(), SweepError> {
        for (row, r) in self.rows.iter().enumerate() {
            if r.inputs.len() != self.axes.len() {
                return Err(SweepError::RowWidth {
                    row,
                    what: "axis",
                    expected: self.axes.len(),
                    found: r.inputs.len(),
                });
            }
            if r.outputs.len() != self.outputs.len() {
                return Err(SweepError::RowWidth {
                    row,
                    what: "output",
                    expected: self.outputs.len(),
                    found: r.outputs.len(),
                });
            }
        }
        Ok(())
    }

    /// Values of axis `i`, one per row
    pub fn axis(&self, i: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().map(move |r| r.inputs.get(i).unwrap_or(&Value::Null))
    }

    /// Values of output `j`, one per row
    pub fn output(&self, j: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().map(move |r| r.outputs.get(j).unwrap_or(&Value::Null))
    }
}
