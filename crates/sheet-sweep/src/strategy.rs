//! Chart strategy trait, chart description types and the ordered registry

use crate::classify::{classify, ColumnKind};
use crate::data::SweepData;
use crate::layout::GridRect;
use serde::Serialize;
use std::fmt;

/// Column kinds one output is charted against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    /// Kind of each swept axis
    pub axes: Vec<ColumnKind>,
    /// Kind of the output column
    pub output: ColumnKind,
}

impl Shape {
    /// Classify the axes of `data` and its `output` column
    #[must_use]
    pub fn of(data: &SweepData, output: usize) -> Self {
        Self {
            axes: (0..data.axes.len()).map(|i| classify(data.axis(i))).collect(),
            output: classify(data.output(output)),
        }
    }

    /// Shape from explicit kinds
    #[must_use]
    pub fn new(axes: Vec<ColumnKind>, output: ColumnKind) -> Self {
        Self { axes, output }
    }

    /// Number of numeric axes
    #[must_use]
    pub fn numeric_axes(&self) -> usize {
        self.axes.iter().filter(|k| **k == ColumnKind::Numeric).count()
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let axes: Vec<String> = self.axes.iter().map(ToString::to_string).collect();
        write!(f, "axes [{}], output {}", axes.join(", "), self.output)
    }
}

/// Axis scale
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase", tag = "type", content = "categories")]
pub enum AxisScale {
    /// Continuous numbers
    Value,
    /// Discrete labels in display order
    Category(Vec<String>),
}

/// Axis definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisDef {
    /// Axis title
    pub name: String,
    /// Scale
    pub scale: AxisScale,
}

impl AxisDef {
    /// Continuous axis
    #[must_use]
    pub fn value(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scale: AxisScale::Value,
        }
    }

    /// Category axis
    #[must_use]
    pub fn category(name: impl Into<String>, categories: Vec<String>) -> Self {
        Self {
            name: name.into(),
            scale: AxisScale::Category(categories),
        }
    }
}

/// One coordinate of a data point
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Coord {
    /// Number
    Num(f64),
    /// Category label
    Cat(String),
}

/// How a series is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    /// Polyline over x
    Line,
    /// Bars per category
    Bar,
    /// 3D surface over (x, y)
    Surface,
    /// Colored cells over (x, y)
    Heatmap,
    /// Horizontal `[start, end, value]` segments
    Timeline,
    /// Points
    Scatter,
}

/// Data series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    /// Legend name
    pub name: String,
    /// Drawing style
    pub kind: SeriesKind,
    /// Points; coordinate arity depends on `kind`
    pub points: Vec<Vec<Coord>>,
}

impl Series {
    /// Empty series
    #[must_use]
    pub fn new(name: impl Into<String>, kind: SeriesKind) -> Self {
        Self {
            name: name.into(),
            kind,
            points: Vec::new(),
        }
    }
}

/// Axes and series produced by a strategy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartBody {
    /// Horizontal axis
    pub x_axis: AxisDef,
    /// Vertical axis
    pub y_axis: AxisDef,
    /// Depth or color axis
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_axis: Option<AxisDef>,
    /// Series
    pub series: Vec<Series>,
}

/// Chart for one output, placed in its grid row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPanel {
    /// Output column charted
    pub output: String,
    /// Strategy that produced the chart
    pub strategy: &'static str,
    /// Grid placement
    pub grid: GridRect,
    /// Axes and series
    #[serde(flatten)]
    pub body: ChartBody,
}

/// Chart builder for one column shape
pub trait ChartStrategy: Send + Sync + fmt::Debug {
    /// Strategy name
    fn name(&self) -> &'static str;

    /// Whether this strategy handles `shape`
    fn matches(&self, shape: &Shape) -> bool;

    /// Build axes and series for output `output` of `data`
    ///
    /// Only called when [`ChartStrategy::matches`] accepted `shape`.
    fn build(&self, data: &SweepData, output: usize, shape: &Shape) -> ChartBody;
}

/// Ordered strategy list; the first match wins
#[derive(Debug, Default)]
pub struct StrategyRegistry {
    strategies: Vec<Box<dyn ChartStrategy>>,
}

impl StrategyRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Registry with the built-in strategies in precedence order
    #[must_use]
    pub fn with_defaults() -> Self {
        use crate::charts::{
            BarChart, HeatmapChart, LineChart, MultiLineChart, ScatterChart, SurfaceChart,
            TimelineChart,
        };

        let mut registry = Self::new();
        registry.register(LineChart);
        registry.register(MultiLineChart);
        registry.register(SurfaceChart);
        registry.register(HeatmapChart);
        registry.register(BarChart);
        registry.register(TimelineChart);
        registry.register(ScatterChart);
        registry
    }

    /// Append a strategy with the lowest precedence
    pub fn register(&mut self, strategy: impl ChartStrategy + 'static) {
        self.strategies.push(Box::new(strategy));
    }

    /// Insert a strategy at `index` (clamped), taking precedence over later ones
    pub fn insert(&mut self, index: usize, strategy: impl ChartStrategy + 'static) {
        let index = index.min(self.strategies.len());
        self.strategies.insert(index, Box::new(strategy));
    }

    /// Remove a strategy by name
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.strategies.len();
        self.strategies.retain(|s| s.name() != name);
        self.strategies.len() != before
    }

    /// Check if a strategy is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.strategies.iter().any(|s| s.name() == name)
    }

    /// Registered names in precedence order
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Get number of registered strategies
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// First strategy handling `shape`
    #[must_use]
    pub fn select(&self, shape: &Shape) -> Option<&dyn ChartStrategy> {
        self.strategies
            .iter()
            .find(|s| s.matches(shape))
            .map(|s| s.as_ref())
    }
}
