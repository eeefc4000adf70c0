//! Chart plan for a whole sweep result

use crate::data::SweepData;
use crate::error::SweepError;
use crate::layout::{GridLayout, Viewport};
use crate::strategy::{ChartPanel, Shape, StrategyRegistry};
use tracing::debug;

/// Strategy chosen for one output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    /// Output column
    pub output: String,
    /// Column shape
    pub shape: Shape,
    /// Chosen strategy, if any matched
    pub strategy: Option<&'static str>,
}

/// Picks a chart strategy per output and stacks the charts
#[derive(Debug)]
pub struct SweepPlanner {
    registry: StrategyRegistry,
    viewport: Viewport,
    layout: GridLayout,
}

impl Default for SweepPlanner {
    fn default() -> Self {
        Self::new()
    }
}

impl SweepPlanner {
    /// Planner with the default strategies and geometry
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(StrategyRegistry::with_defaults())
    }

    /// Planner over a custom registry
    #[must_use]
    pub fn with_registry(registry: StrategyRegistry) -> Self {
        Self {
            registry,
            viewport: Viewport::default(),
            layout: GridLayout::default(),
        }
    }

    /// Set the viewport
    #[inline]
    #[must_use]
    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    /// Set margins and gap
    #[inline]
    #[must_use]
    pub fn with_layout(mut self, layout: GridLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Strategy registry
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Mutable strategy registry
    #[inline]
    pub fn registry_mut(&mut self) -> &mut StrategyRegistry {
        &mut self.registry
    }

    /// Strategy selection per output, without building charts
    #[must_use]
    pub fn choose(&self, data: &SweepData) -> Vec<Choice> {
        data.outputs
            .iter()
            .enumerate()
            .map(|(j, output)| {
                let shape = Shape::of(data, j);
                let strategy = self.registry.select(&shape).map(|s| s.name());
                Choice {
                    output: output.clone(),
                    shape,
                    strategy,
                }
            })
            .collect()
    }

    /// Build one chart per output, stacked vertically
    ///
    /// # Errors
    /// - `SweepError::RowWidth` for malformed rows
    /// - `SweepError::NoStrategy` when an output matches no strategy
    pub fn plan(&self, data: &SweepData) -> Result<Vec<ChartPanel>, SweepError> {
        data.validate()?;
        let grids = self.layout.rows(self.viewport, data.outputs.len());

        data.outputs
            .iter()
            .enumerate()
            .zip(grids)
            .map(|((j, output), grid)| {
                let shape = Shape::of(data, j);
                let strategy = self.registry.select(&shape).ok_or_else(|| {
                    SweepError::NoStrategy {
                        output: output.clone(),
                        shape: shape.to_string(),
                    }
                })?;
                debug!(output = %output, strategy = strategy.name(), %shape, "chart strategy selected");
                Ok(ChartPanel {
                    output: output.clone(),
                    strategy: strategy.name(),
                    grid,
                    body: strategy.build(data, j, &shape),
                })
            })
            .collect()
    }
}
