use chrono::{NaiveDate, NaiveDateTime};
use figanos::charts::ShowCoords;
use figanos::figure::{Glyph, Ticks};
use figanos::naming::resolve_color;
use figanos::options::kwargs;
use figanos::{
    DiagnosticKind, HeatmapOptions, LabeledArray, LabeledTable, LegendMode, Locale, PlotError,
    StripesOptions, TimeseriesOptions, heatmap, stripes, timeseries,
};

fn years(n: usize) -> Vec<NaiveDateTime> {
    (0..n)
        .map(|i| {
            NaiveDate::from_ymd_opt(2000 + i as i32, 7, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        })
        .collect()
}

fn percentile_ensemble() -> LabeledArray {
    // time x percentiles
    let values = vec![
        0.5, 1.0, 1.5, //
        0.7, 1.2, 1.9, //
        0.9, 1.6, 2.4,
    ];
    LabeledArray::new(&["time", "percentiles"], &[3, 3], values)
        .unwrap()
        .named("tas")
        .with_attr("long_name", "Mean temperature")
        .with_attr("units", "K")
        .with_coord("time", years(3))
        .unwrap()
        .with_coord("percentiles", vec![10_i64, 50, 90])
        .unwrap()
}

fn quiet(legend: LegendMode, locale: Locale) -> TimeseriesOptions {
    TimeseriesOptions {
        legend,
        locale,
        show_lat_lon: ShowCoords::Off,
        ..Default::default()
    }
}

#[test]
fn percentile_ensemble_draws_middle_line_and_band() {
    let data = vec![("ssp245", percentile_ensemble())];
    let fig = timeseries(data, &quiet(LegendMode::Full, Locale::En)).unwrap();

    let line = fig.lines().next().unwrap();
    assert_eq!(line.label, "SSP2-4.5");
    assert_eq!(line.points.iter().map(|p| p.1).collect::<Vec<_>>(), vec![1.0, 1.2, 1.6]);
    assert_eq!(Some(line.color), resolve_color("SSP2-4.5"));

    let band = fig.bands().next().unwrap();
    assert_eq!(band.lower, vec![0.5, 0.7, 0.9]);
    assert_eq!(band.upper, vec![1.5, 1.9, 2.4]);
    assert_eq!((band.color.r, band.color.g, band.color.b), (line.color.r, line.color.g, line.color.b));
    assert!(band.color.a < 255);

    assert_eq!(fig.legend_labels(), vec!["SSP2-4.5", "10th-90th percentiles"]);
    let legend = fig.axes.legend.as_ref().unwrap();
    assert_eq!(legend.entries[1].glyph, Glyph::Patch);
}

#[test]
fn band_label_is_translated() {
    let data = vec![("ssp245", percentile_ensemble())];
    let fig = timeseries(data, &quiet(LegendMode::Full, Locale::Fr)).unwrap();
    assert_eq!(fig.legend_labels()[1], "10e-90e percentiles");
    assert_eq!(fig.axes.xlabel.as_deref(), Some("Temps"));
}

fn realizations() -> LabeledArray {
    LabeledArray::new(&["realization", "time"], &[3, 2], vec![1.0, 2.0, 1.5, 2.5, 0.5, 1.0])
        .unwrap()
        .named("tas")
        .with_coord("realization", vec![0_i64, 1, 2])
        .unwrap()
        .with_coord("time", years(2))
        .unwrap()
}

#[test]
fn styled_realizations_share_one_legend_entry() {
    let opts = TimeseriesOptions {
        plot_kw: kwargs(serde_json::json!({"ssp245": {"linewidth": 2.0}})),
        ..quiet(LegendMode::Lines, Locale::En)
    };
    let fig = timeseries(vec![("ssp245", realizations())], &opts).unwrap();
    let lines: Vec<_> = fig.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines.iter().all(|l| l.color == lines[0].color && l.width == 2.0));
    assert_eq!(fig.legend_labels(), vec!["SSP2-4.5"]);
}

#[test]
fn plain_realizations_are_labelled_by_member() {
    let fig = timeseries(vec![("model", realizations())], &quiet(LegendMode::Lines, Locale::En)).unwrap();
    assert_eq!(fig.legend_labels(), vec!["model_0", "model_1", "model_2"]);

    let t = LabeledTable::new().with_var("tas", realizations());
    let fig = timeseries(vec![("obs", t)], &quiet(LegendMode::Lines, Locale::En)).unwrap();
    assert_eq!(fig.lines().count(), 3);
    assert_eq!(fig.legend_labels(), vec!["obs_0", "obs_1", "obs_2"]);
    assert_eq!(fig.lines().nth(2).unwrap().points[1].1, 1.0);
}

#[test]
fn percentile_dimension_inside_a_table() {
    let t = LabeledTable::new().with_var("tas", percentile_ensemble());
    let fig = timeseries(vec![("ssp245", t)], &quiet(LegendMode::Full, Locale::En)).unwrap();
    assert_eq!(fig.lines().count(), 1);
    assert_eq!(fig.lines().next().unwrap().label, "SSP2-4.5_tas");
    assert_eq!(fig.bands().next().unwrap().lower, vec![0.5, 0.7, 0.9]);
}

#[test]
fn percentile_variables_form_an_ensemble() {
    let member = |name: &str, values: Vec<f64>| {
        LabeledArray::from_vec("time", values)
            .named(name)
            .with_coord("time", years(2))
            .unwrap()
    };
    let t = LabeledTable::new()
        .with_var("tas_p90", member("tas_p90", vec![3.0, 4.0]))
        .with_var("tas_p10", member("tas_p10", vec![0.0, 1.0]))
        .with_var("tas_p50", member("tas_p50", vec![1.5, 2.5]));
    let fig = timeseries(vec![("obs", t)], &quiet(LegendMode::Full, Locale::En)).unwrap();
    assert_eq!(fig.lines().next().unwrap().points[0].1, 1.5);
    let band = fig.bands().next().unwrap();
    assert_eq!((band.lower.clone(), band.upper.clone()), (vec![0.0, 1.0], vec![3.0, 4.0]));
    assert_eq!(fig.legend_labels(), vec!["obs", "10th-90th percentiles"]);
}

#[test]
fn lines_legend_skips_the_band() {
    let data = vec![("ssp245", percentile_ensemble())];
    let fig = timeseries(data, &quiet(LegendMode::Lines, Locale::En)).unwrap();
    assert_eq!(fig.legend_labels(), vec!["SSP2-4.5"]);
}

#[test]
fn min_max_table_is_an_ensemble() {
    let member = |name: &str, values: Vec<f64>| {
        LabeledArray::from_vec("time", values)
            .named(name)
            .with_coord("time", years(2))
            .unwrap()
    };
    let t = LabeledTable::new()
        .with_var("tas_min", member("tas_min", vec![0.0, 1.0]))
        .with_var("tas_mean", member("tas_mean", vec![1.0, 2.0]))
        .with_var("tas_max", member("tas_max", vec![2.0, 3.0]));
    let fig = timeseries(vec![("obs", t)], &quiet(LegendMode::Full, Locale::En)).unwrap();
    assert_eq!(fig.lines().count(), 1);
    assert_eq!(fig.bands().next().unwrap().upper, vec![2.0, 3.0]);
    assert_eq!(fig.legend_labels(), vec!["obs", "min-max range"]);
}

#[test]
fn edge_legend_writes_labels_outside_the_axes() {
    let series = |v: Vec<f64>| {
        LabeledArray::from_vec("time", v)
            .named("tas")
            .with_coord("time", years(2))
            .unwrap()
    };
    let data = vec![("rcp45", series(vec![1.0, 2.0])), ("rcp85", series(vec![1.0, 3.0]))];
    let fig = timeseries(data, &quiet(LegendMode::Edge, Locale::En)).unwrap();
    assert!(fig.axes.legend.is_none());
    let texts: Vec<_> = fig.texts().collect();
    assert_eq!(texts.len(), 2);
    assert_eq!(texts[0].text, "RCP4.5");
    assert_eq!(texts[1].y, 3.0);
    assert!(texts.iter().all(|t| t.x > 1.0));
}

#[test]
fn colliding_keys_are_rejected() {
    let a = LabeledArray::from_vec("time", vec![1.0, 2.0])
        .with_coord("time", years(2))
        .unwrap();
    let data = vec![("ssp245", a.clone()), ("SSP245", a)];
    assert!(matches!(
        timeseries(data, &TimeseriesOptions::default()),
        Err(PlotError::Value(_))
    ));
}

#[test]
fn missing_time_dimension() {
    let a = LabeledArray::from_vec("x", vec![1.0, 2.0]);
    let err = timeseries(a, &TimeseriesOptions::default()).unwrap_err();
    assert!(err.to_string().starts_with("value error:"));
}

#[test]
fn heatmap_with_missing_attributes_reports_them() {
    let a = LabeledArray::new(&["model", "month"], &[2, 2], vec![1.0, 2.0, 3.0, 4.0])
        .unwrap()
        .with_coord("model", vec!["a", "b"])
        .unwrap()
        .with_coord("month", vec!["Jan", "Feb"])
        .unwrap();
    let fig = heatmap(a, &HeatmapOptions::default()).unwrap();
    assert!(matches!(fig.axes.xticks, Ticks::Fixed(ref t) if t.len() == 2));
    assert!(fig.diagnostics.has(DiagnosticKind::MissingAttribute));
}

#[test]
fn stripes_accept_a_scenario_mapping() {
    let anomalies = |v: Vec<f64>| {
        LabeledArray::from_vec("time", v)
            .named("tas")
            .with_coord("time", vec![2000.0, 2001.0, 2002.0])
            .unwrap()
    };
    let data = vec![
        ("ssp126", anomalies(vec![0.1, 0.2, 0.1])),
        ("ssp585", anomalies(vec![0.3, 0.8, 1.4])),
    ];
    let fig = stripes(data, &StripesOptions::default()).unwrap();
    assert_eq!(fig.meshes().map(|m| m.cells.len()).sum::<usize>(), 6);
    assert!(fig.colorbar.is_some());
}

#[test]
fn non_standard_calendar_is_converted() {
    use figanos::calendar::{Calendar, CfDatetime};
    use figanos::models::CoordValues;

    let time = CoordValues::CfTime {
        calendar: Calendar::Day360,
        dates: vec![CfDatetime::new(2000, 2, 30), CfDatetime::new(2000, 12, 30)],
    };
    let a = LabeledArray::from_vec("time", vec![1.0, 2.0])
        .named("tas")
        .with_coord("time", time)
        .unwrap();
    let fig = timeseries(a, &quiet(LegendMode::Lines, Locale::En)).unwrap();
    assert!(fig.diagnostics.has(DiagnosticKind::CalendarConverted));
    let line = fig.lines().next().unwrap();
    assert_eq!(line.points.len(), 2);
    assert!(line.points[0].0 > 2000.0 && line.points[1].0 < 2001.0);
}
