//! Grid geometry for stacked charts

use serde::{Deserialize, Serialize};

/// Drawing area available to the charts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in pixels
    pub width: f64,
    /// Height in pixels
    pub height: f64,
}

impl Viewport {
    /// Viewport of the given size
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(960.0, 640.0)
    }
}

/// Placement of one chart grid
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GridRect {
    /// Distance from the left edge
    pub left: f64,
    /// Distance from the top edge
    pub top: f64,
    /// Grid width
    pub width: f64,
    /// Grid height
    pub height: f64,
}

/// Margins and the fixed gap between stacked grids
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridLayout {
    /// Vertical gap between grids
    pub gap: f64,
    /// Top margin
    pub top: f64,
    /// Bottom margin
    pub bottom: f64,
    /// Left margin
    pub left: f64,
    /// Right margin
    pub right: f64,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            gap: 60.0,
            top: 40.0,
            bottom: 40.0,
            left: 60.0,
            right: 40.0,
        }
    }
}

impl GridLayout {
    /// Set the gap between grids
    #[inline]
    #[must_use]
    pub fn with_gap(mut self, gap: f64) -> Self {
        self.gap = gap;
        self
    }

    /// Stack `count` grids vertically, each sized evenly
    #[must_use]
    pub fn rows(&self, viewport: Viewport, count: usize) -> Vec<GridRect> {
        if count == 0 {
            return Vec::new();
        }
        let n = count as f64;
        let usable = viewport.height - self.top - self.bottom - self.gap * (n - 1.0);
        let height = (usable / n).max(0.0);
        let width = (viewport.width - self.left - self.right).max(0.0);

        (0..count)
            .map(|i| GridRect {
                left: self.left,
                top: self.top + i as f64 * (height + self.gap),
                width,
                height,
            })
            .collect()
    }
}
