//! Built-in chart strategies

use crate::classify::{as_category, as_number, categories, is_absent, ColumnKind};
use crate::data::SweepData;
use crate::strategy::{AxisDef, ChartBody, ChartStrategy, Coord, Series, SeriesKind, Shape};
use indexmap::IndexMap;
use serde_json::Value;

use ColumnKind::{Categorical, Numeric};

fn axis_name(data: &SweepData, i: usize) -> String {
    data.axes.get(i).cloned().unwrap_or_default()
}

fn output_name(data: &SweepData, j: usize) -> String {
    data.outputs.get(j).cloned().unwrap_or_default()
}

/// `(x, y)` pairs with both coordinates numeric, sorted by x
fn numeric_pairs<'a>(
    xs: impl Iterator<Item = &'a Value>,
    ys: impl Iterator<Item = &'a Value>,
) -> Vec<(f64, f64)> {
    let mut pairs: Vec<(f64, f64)> = xs
        .zip(ys)
        .filter_map(|(x, y)| Some((as_number(x)?, as_number(y)?)))
        .collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    pairs
}

fn line_points(pairs: Vec<(f64, f64)>) -> Vec<Vec<Coord>> {
    pairs
        .into_iter()
        .map(|(x, y)| vec![Coord::Num(x), Coord::Num(y)])
        .collect()
}

/// Index of the first axis of `kind`
fn axis_of(shape: &Shape, kind: ColumnKind) -> usize {
    shape.axes.iter().position(|k| *k == kind).unwrap_or(0)
}

/// One numeric axis, numeric output
#[derive(Debug, Clone, Copy, Default)]
pub struct LineChart;

impl ChartStrategy for LineChart {
    fn name(&self) -> &'static str {
        "line"
    }

    fn matches(&self, shape: &Shape) -> bool {
        shape.axes == [Numeric] && shape.output == Numeric
    }

    fn build(&self, data: &SweepData, output: usize, _: &Shape) -> ChartBody {
        let name = output_name(data, output);
        let mut series = Series::new(name.clone(), SeriesKind::Line);
        series.points = line_points(numeric_pairs(data.axis(0), data.output(output)));
        ChartBody {
            x_axis: AxisDef::value(axis_name(data, 0)),
            y_axis: AxisDef::value(name),
            z_axis: None,
            series: vec![series],
        }
    }
}

/// One numeric and one categorical axis, numeric output: a line per category
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiLineChart;

impl ChartStrategy for MultiLineChart {
    fn name(&self) -> &'static str {
        "multi_line"
    }

    fn matches(&self, shape: &Shape) -> bool {
        shape.axes.len() == 2 && shape.numeric_axes() == 1 && shape.output == Numeric
    }

    fn build(&self, data: &SweepData, output: usize, shape: &Shape) -> ChartBody {
        let x = axis_of(shape, Numeric);
        let group = axis_of(shape, Categorical);

        let mut lines: IndexMap<String, Vec<(f64, f64)>> = IndexMap::new();
        for row in &data.rows {
            let (Some(xv), Some(gv), Some(yv)) =
                (row.inputs.get(x), row.inputs.get(group), row.outputs.get(output))
            else {
                continue;
            };
            if let (Some(xn), Some(yn)) = (as_number(xv), as_number(yv)) {
                lines.entry(as_category(gv)).or_default().push((xn, yn));
            }
        }

        let series = lines
            .into_iter()
            .map(|(category, mut pairs)| {
                pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
                let mut s = Series::new(category, SeriesKind::Line);
                s.points = line_points(pairs);
                s
            })
            .collect();

        ChartBody {
            x_axis: AxisDef::value(axis_name(data, x)),
            y_axis: AxisDef::value(output_name(data, output)),
            z_axis: None,
            series,
        }
    }
}

/// Two numeric axes, numeric output
#[derive(Debug, Clone, Copy, Default)]
pub struct SurfaceChart;

impl ChartStrategy for SurfaceChart {
    fn name(&self) -> &'static str {
        "surface"
    }

    fn matches(&self, shape: &Shape) -> bool {
        shape.axes == [Numeric, Numeric] && shape.output == Numeric
    }

    fn build(&self, data: &SweepData, output: usize, _: &Shape) -> ChartBody {
        let name = output_name(data, output);
        let mut series = Series::new(name.clone(), SeriesKind::Surface);
        series.points = data
            .rows
            .iter()
            .filter_map(|row| {
                let x = as_number(row.inputs.first()?)?;
                let y = as_number(row.inputs.get(1)?)?;
                let z = as_number(row.outputs.get(output)?)?;
                Some(vec![Coord::Num(x), Coord::Num(y), Coord::Num(z)])
            })
            .collect();
        ChartBody {
            x_axis: AxisDef::value(axis_name(data, 0)),
            y_axis: AxisDef::value(axis_name(data, 1)),
            z_axis: Some(AxisDef::value(name)),
            series: vec![series],
        }
    }
}

/// Two axes where both are categorical or the output is categorical
#[derive(Debug, Clone, Copy, Default)]
pub struct HeatmapChart;

impl ChartStrategy for HeatmapChart {
    fn name(&self) -> &'static str {
        "heatmap"
    }

    fn matches(&self, shape: &Shape) -> bool {
        shape.axes.len() == 2 && (shape.numeric_axes() == 0 || shape.output == Categorical)
    }

    fn build(&self, data: &SweepData, output: usize, shape: &Shape) -> ChartBody {
        let name = output_name(data, output);
        let mut series = Series::new(name.clone(), SeriesKind::Heatmap);
        series.points = data
            .rows
            .iter()
            .filter_map(|row| {
                let x = row.inputs.first().filter(|v| !is_absent(v))?;
                let y = row.inputs.get(1).filter(|v| !is_absent(v))?;
                let value = row.outputs.get(output).filter(|v| !is_absent(v))?;
                let value = match shape.output {
                    Numeric => Coord::Num(as_number(value)?),
                    Categorical => Coord::Cat(as_category(value)),
                };
                Some(vec![Coord::Cat(as_category(x)), Coord::Cat(as_category(y)), value])
            })
            .collect();

        let color = match shape.output {
            Numeric => AxisDef::value(name),
            Categorical => AxisDef::category(name, categories(data.output(output))),
        };
        ChartBody {
            x_axis: AxisDef::category(axis_name(data, 0), categories(data.axis(0))),
            y_axis: AxisDef::category(axis_name(data, 1), categories(data.axis(1))),
            z_axis: Some(color),
            series: vec![series],
        }
    }
}

/// One categorical axis, numeric output
#[derive(Debug, Clone, Copy, Default)]
pub struct BarChart;

impl ChartStrategy for BarChart {
    fn name(&self) -> &'static str {
        "bar"
    }

    fn matches(&self, shape: &Shape) -> bool {
        shape.axes == [Categorical] && shape.output == Numeric
    }

    fn build(&self, data: &SweepData, output: usize, _: &Shape) -> ChartBody {
        let name = output_name(data, output);
        let mut series = Series::new(name.clone(), SeriesKind::Bar);
        series.points = data
            .axis(0)
            .zip(data.output(output))
            .filter(|(x, _)| !is_absent(x))
            .filter_map(|(x, y)| Some(vec![Coord::Cat(as_category(x)), Coord::Num(as_number(y)?)]))
            .collect();
        ChartBody {
            x_axis: AxisDef::category(axis_name(data, 0), categories(data.axis(0))),
            y_axis: AxisDef::value(name),
            z_axis: None,
            series: vec![series],
        }
    }
}

/// One numeric axis, categorical output: contiguous runs of the same value
#[derive(Debug, Clone, Copy, Default)]
pub struct TimelineChart;

impl ChartStrategy for TimelineChart {
    fn name(&self) -> &'static str {
        "timeline"
    }

    fn matches(&self, shape: &Shape) -> bool {
        shape.axes == [Numeric] && shape.output == Categorical
    }

    fn build(&self, data: &SweepData, output: usize, _: &Shape) -> ChartBody {
        let name = output_name(data, output);

        let mut samples: Vec<(f64, Option<String>)> = data
            .axis(0)
            .zip(data.output(output))
            .filter_map(|(x, y)| {
                let label = (!is_absent(y)).then(|| as_category(y));
                Some((as_number(x)?, label))
            })
            .collect();
        samples.sort_by(|a, b| a.0.total_cmp(&b.0));

        // An absent value ends the current run
        let mut runs: Vec<(f64, f64, String)> = Vec::new();
        let mut open = false;
        for (x, label) in samples {
            let Some(label) = label else {
                open = false;
                continue;
            };
            match runs.last_mut() {
                Some(run) if open && run.2 == label => run.1 = x,
                _ => {
                    runs.push((x, x, label));
                    open = true;
                }
            }
        }

        let mut series = Series::new(name.clone(), SeriesKind::Timeline);
        series.points = runs
            .into_iter()
            .map(|(start, end, label)| vec![Coord::Num(start), Coord::Num(end), Coord::Cat(label)])
            .collect();
        ChartBody {
            x_axis: AxisDef::value(axis_name(data, 0)),
            y_axis: AxisDef::category(name, categories(data.output(output))),
            z_axis: None,
            series: vec![series],
        }
    }
}

/// One categorical axis, categorical output
#[derive(Debug, Clone, Copy, Default)]
pub struct ScatterChart;

impl ChartStrategy for ScatterChart {
    fn name(&self) -> &'static str {
        "scatter"
    }

    fn matches(&self, shape: &Shape) -> bool {
        shape.axes == [Categorical] && shape.output == Categorical
    }

    fn build(&self, data: &SweepData, output: usize, _: &Shape) -> ChartBody {
        let name = output_name(data, output);
        let mut series = Series::new(name.clone(), SeriesKind::Scatter);
        series.points = data
            .axis(0)
            .zip(data.output(output))
            .filter(|(x, y)| !is_absent(x) && !is_absent(y))
            .map(|(x, y)| vec![Coord::Cat(as_category(x)), Coord::Cat(as_category(y))])
            .collect();
        ChartBody {
            x_axis: AxisDef::category(axis_name(data, 0), categories(data.axis(0))),
            y_axis: AxisDef::category(name, categories(data.output(output))),
            z_axis: None,
            series: vec![series],
        }
    }
}
