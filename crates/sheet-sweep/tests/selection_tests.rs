//! Strategy selection over realistic sweep results

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use sheet_sweep::{
    AxisScale, ColumnKind, Coord, GridLayout, SeriesKind, SweepData, SweepError, SweepPlanner,
    Viewport,
};

fn sweep(axes: &[&str], outputs: &[&str], rows: Vec<(Vec<Value>, Vec<Value>)>) -> SweepData {
    let mut data = SweepData::new(
        axes.iter().map(|s| (*s).to_string()).collect(),
        outputs.iter().map(|s| (*s).to_string()).collect(),
    );
    for (inputs, outputs) in rows {
        data = data.with_row(inputs, outputs);
    }
    data
}

#[test]
fn numeric_axis_with_label_output_is_a_timeline() {
    let data = sweep(
        &["temperature"],
        &["phase"],
        vec![
            (vec![json!(-10)], vec![json!("solid")]),
            (vec![json!(0)], vec![json!("solid")]),
            (vec![json!(50)], vec![json!("liquid")]),
            (vec![json!(100)], vec![json!("gas")]),
            (vec![json!("inf")], vec![json!("gas")]),
        ],
    );

    let panels = SweepPlanner::new().plan(&data).unwrap();
    assert_eq!(panels.len(), 1);
    assert_eq!(panels[0].strategy, "timeline");

    let series = &panels[0].body.series[0];
    assert_eq!(series.kind, SeriesKind::Timeline);
    assert_eq!(
        series.points,
        vec![
            vec![Coord::Num(-10.0), Coord::Num(0.0), Coord::Cat("solid".into())],
            vec![Coord::Num(50.0), Coord::Num(50.0), Coord::Cat("liquid".into())],
            vec![Coord::Num(100.0), Coord::Num(f64::INFINITY), Coord::Cat("gas".into())],
        ]
    );
}

#[test]
fn label_axis_with_numeric_output_is_a_bar_chart() {
    let data = sweep(
        &["material"],
        &["cost"],
        vec![
            (vec![json!("steel")], vec![json!(12.5)]),
            (vec![json!("oak")], vec![json!("7")]),
            (vec![json!("glass")], vec![Value::Null]),
        ],
    );

    let panels = SweepPlanner::new().plan(&data).unwrap();
    assert_eq!(panels[0].strategy, "bar");
    assert_eq!(
        panels[0].body.x_axis.scale,
        AxisScale::Category(vec!["steel".into(), "oak".into(), "glass".into()])
    );
    assert_eq!(panels[0].body.series[0].points.len(), 2);
}

#[test]
fn two_numeric_axes_make_a_surface() {
    let mut rows = Vec::new();
    for x in 0..3 {
        for y in 0..3 {
            rows.push((vec![json!(x), json!(y)], vec![json!(x * y)]));
        }
    }
    let data = sweep(&["w", "h"], &["area"], rows);

    let panels = SweepPlanner::new().plan(&data).unwrap();
    assert_eq!(panels[0].strategy, "surface");
    assert_eq!(panels[0].body.series[0].points.len(), 9);
    assert_eq!(panels[0].body.z_axis.as_ref().map(|a| a.name.as_str()), Some("area"));
}

#[test]
fn outputs_stack_in_grid_rows() {
    let data = sweep(
        &["x"],
        &["a", "b", "c"],
        vec![(vec![json!(1)], vec![json!(1), json!("k"), json!(2)])],
    );
    let planner = SweepPlanner::new()
        .with_viewport(Viewport::new(800.0, 1000.0))
        .with_layout(GridLayout::default().with_gap(30.0));

    let panels = planner.plan(&data).unwrap();
    let strategies: Vec<_> = panels.iter().map(|p| p.strategy).collect();
    assert_eq!(strategies, vec!["line", "timeline", "line"]);

    // 1000 - 40 - 40 - 2 * 30 = 860 split three ways
    let height = 860.0 / 3.0;
    for (i, panel) in panels.iter().enumerate() {
        assert!((panel.grid.height - height).abs() < 1e-9);
        assert!((panel.grid.top - (40.0 + i as f64 * (height + 30.0))).abs() < 1e-9);
    }
}

#[test]
fn choose_reports_shapes() {
    let data = sweep(
        &["mode", "t"],
        &["v"],
        vec![(vec![json!("eco"), json!(1)], vec![json!(3)])],
    );
    let choices = SweepPlanner::new().choose(&data);
    assert_eq!(choices[0].strategy, Some("multi_line"));
    assert_eq!(
        choices[0].shape.axes,
        vec![ColumnKind::Categorical, ColumnKind::Numeric]
    );
}

#[test]
fn three_axes_have_no_strategy() {
    let data = sweep(
        &["a", "b", "c"],
        &["v"],
        vec![(vec![json!(1), json!(2), json!(3)], vec![json!(4)])],
    );
    let err = SweepPlanner::new().plan(&data).unwrap_err();
    assert!(matches!(err, SweepError::NoStrategy { ref output, .. } if output == "v"));
}
