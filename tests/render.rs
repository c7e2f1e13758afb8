use std::fs;

use figanos::charts::{ShowCoords, SizeSource};
use figanos::{
    Figure, GridmapOptions, HatchmapOptions, HeatmapOptions, LabeledArray, LabeledTable, LegendMode,
    PartitionOptions, ScattermapOptions, StripesOptions, TaylorOptions, TimeseriesOptions,
    TriheatmapOptions, ViolinOptions, gridmap, hatchmap, heatmap, partition, scattermap, stripes,
    taylordiagram, timeseries, triheatmap, violin,
};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn field(name: &str, values: Vec<f64>) -> LabeledArray {
    LabeledArray::new(&["lat", "lon"], &[2, 3], values)
        .unwrap()
        .named(name)
        .with_attr("long_name", "Mean temperature")
        .with_attr("units", "K")
        .with_coord("lat", vec![45.0, 46.0])
        .unwrap()
        .with_coord("lon", vec![-75.0, -74.0, -73.0])
        .unwrap()
}

fn yearly(name: &str, values: Vec<f64>) -> LabeledArray {
    let years: Vec<f64> = (0..values.len()).map(|i| 1990.0 + i as f64).collect();
    LabeledArray::from_vec("time", values)
        .named(name)
        .with_attr("long_name", "Temperature anomaly")
        .with_attr("units", "K")
        .with_coord("time", years)
        .unwrap()
}

fn assert_svg(fig: &Figure) -> String {
    let svg = fig.to_svg_string().unwrap();
    assert!(svg.starts_with("<svg"), "not an svg document");
    assert!(svg.trim_end().ends_with("</svg>"));
    svg
}

#[test]
fn timeseries_with_every_legend_mode() {
    init_logs();
    for legend in [LegendMode::Full, LegendMode::Lines, LegendMode::InPlot, LegendMode::Edge, LegendMode::None] {
        let data = vec![
            ("ssp245", yearly("tas", vec![0.1, 0.4, 0.3, 0.9])),
            ("ssp585", yearly("tas", vec![0.2, 0.7, 1.1, 1.8])),
        ];
        let opts = TimeseriesOptions {
            legend,
            show_lat_lon: ShowCoords::Off,
            ..Default::default()
        };
        let fig = timeseries(data, &opts).unwrap();
        let svg = assert_svg(&fig);
        assert!(svg.contains("<polyline") || svg.contains("<path"));
    }
}

#[test]
fn maps_render_cells_and_colorbar() {
    init_logs();
    let fig = gridmap(
        field("tas", vec![1.0, 2.0, 3.0, 4.0, f64::NAN, 6.0]),
        &GridmapOptions::default(),
    )
    .unwrap();
    let svg = assert_svg(&fig);
    assert!(svg.contains("<polygon"));
    assert!(svg.contains("<rect"));

    let data = vec![
        ("agree", field("agree", vec![1.0, 0.0, 1.0, 1.0, 0.0, 1.0])),
        ("signif", field("signif", vec![1.0; 6])),
    ];
    assert_svg(&hatchmap(data, &HatchmapOptions::default()).unwrap());
}

#[test]
fn station_sizes_render_with_a_size_legend() {
    init_logs();
    let stations = |name: &str, values: Vec<f64>| {
        let n = values.len();
        LabeledArray::from_vec("site", values)
            .named(name)
            .with_aux_coord("lat", &["site"], (0..n).map(|i| 45.0 + i as f64).collect::<Vec<_>>())
            .unwrap()
            .with_aux_coord("lon", &["site"], (0..n).map(|i| -75.0 + i as f64).collect::<Vec<_>>())
            .unwrap()
    };
    let t = LabeledTable::new()
        .with_var("pr", stations("pr", vec![1.0, 2.0, 3.0]))
        .with_var("elev", stations("elev", vec![100.0, 200.0, 300.0]));
    let opts = ScattermapOptions {
        sizes: Some(SizeSource::Named("elev".into())),
        ..Default::default()
    };
    assert_svg(&scattermap(t, &opts).unwrap());
}

#[test]
fn categorical_charts_render() {
    init_logs();
    let scores = LabeledArray::new(&["model", "season"], &[2, 2], vec![0.1, -0.2, 0.3, 0.4])
        .unwrap()
        .named("bias")
        .with_coord("model", vec!["m1", "m2"])
        .unwrap()
        .with_coord("season", vec!["DJF", "JJA"])
        .unwrap();
    assert_svg(&heatmap(scores, &HeatmapOptions::default()).unwrap());

    let split = LabeledArray::new(&["season", "model", "index"], &[4, 2, 2], (0..16).map(f64::from).collect())
        .unwrap()
        .named("bias")
        .with_coord("season", vec!["DJF", "MAM", "JJA", "SON"])
        .unwrap();
    let svg = assert_svg(&triheatmap(split, "season", &TriheatmapOptions::default()).unwrap());
    assert!(svg.contains("<polygon"));

    let sample = LabeledArray::from_vec("realization", (0..30).map(|i| (i % 7) as f64).collect())
        .named("pr")
        .with_attr("long_name", "Precipitation")
        .with_attr("units", "mm");
    assert_svg(&violin(sample, &ViolinOptions::default()).unwrap());
}

#[test]
fn taylor_partition_and_stripes_render() {
    init_logs();
    let stats = |std: f64, corr: f64| {
        LabeledArray::from_vec("taylor_param", vec![2.0, std, corr])
            .named("tas")
            .with_attr("units", "K")
            .with_coord("taylor_param", vec!["ref_std", "sim_std", "corr"])
            .unwrap()
    };
    let data = vec![("model_a", stats(2.5, 0.8)), ("model_b", stats(1.5, 0.6))];
    assert_svg(&taylordiagram(data, &TaylorOptions::default()).unwrap());

    let values = vec![
        20.0, 10.0, 70.0, 100.0, //
        30.0, 20.0, 50.0, 100.0,
    ];
    let fractions = LabeledArray::new(&["time", "uncertainty"], &[2, 4], values)
        .unwrap()
        .named("tas")
        .with_attr("units", "%")
        .with_coord("time", vec![2000.0, 2020.0])
        .unwrap()
        .with_coord("uncertainty", vec!["model", "scenario", "variability", "total"])
        .unwrap();
    assert_svg(&partition(fractions, &PartitionOptions::default()).unwrap());

    let fig = stripes(yearly("tas", vec![-0.4, -0.1, 0.2, 0.8]), &StripesOptions::default()).unwrap();
    assert_svg(&fig);
}

#[test]
fn files_follow_the_extension() {
    init_logs();
    let dir = tempfile::tempdir().unwrap();
    let fig = stripes(yearly("tas", vec![-0.4, 0.1, 0.9]), &StripesOptions::default()).unwrap();

    let svg_path = dir.path().join("stripes.SVG");
    fig.save(&svg_path).unwrap();
    let text = fs::read_to_string(&svg_path).unwrap();
    assert!(text.starts_with("<svg"));

    let png_path = dir.path().join("stripes.png");
    fig.save(&png_path).unwrap();
    let bytes = fs::read(&png_path).unwrap();
    assert_eq!(&bytes[1..4], b"PNG");
}

#[test]
fn figure_size_follows_fig_kw() {
    init_logs();
    let opts = StripesOptions {
        fig_kw: figanos::options::kwargs(serde_json::json!({"figsize": [4, 2]})),
        ..Default::default()
    };
    let fig = stripes(yearly("tas", vec![0.0, 1.0]), &opts).unwrap();
    assert_eq!(fig.size, (400, 200));
    let svg = assert_svg(&fig);
    assert!(svg.contains("width=\"400\""));
}
