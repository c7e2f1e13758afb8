//! Taylor diagrams: standard deviation as the radius, correlation as the
//! angle, distance to the reference point as the centered RMS error.

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{PlotError, Result};
use crate::figure::{
    Artist, ChartKind, Figure, Glyph, Legend, LegendEntry, LegendPlacement, LineArtist,
    ScatterArtist, TextArtist, TextCoords, Ticks,
};
use crate::layout::{HAlign, Loc, VAlign};
use crate::models::{DataInput, Entry, LabeledArray, NO_LABEL, format_number};
use crate::naming::{self, resolve_color};
use crate::options::{Kwargs, get_color, get_f64, get_str, label_with_units, per_entry_kw};
use crate::style::{LineDash, MARKER_SEQUENCE, MarkerShape, Rgba};
use crate::terms::{self, Locale};

/// Dimension holding `ref_std`, `sim_std` and `corr`.
pub const TAYLOR_DIM: &str = "taylor_param";

/// Correlation values labelled on the outer rim.
const CORR_TICKS: [f64; 10] = [0.0, 0.2, 0.4, 0.6, 0.7, 0.8, 0.9, 0.95, 0.99, 1.0];
const REFERENCE_COLOR: Rgba = Rgba::rgb_const(0x15, 0x45, 0x04);
const POINT_SIZE: f64 = 49.0;
const ARC_STEPS: usize = 90;

#[derive(Debug, Clone, PartialEq)]
pub struct TaylorOptions {
    pub fig_kw: Kwargs,
    /// Marker options per data key; the `reference` key styles the
    /// reference point.
    pub plot_kw: Kwargs,
    /// Radius range as multiples of the largest standard deviation.
    pub std_range: (f64, f64),
    /// Number of RMSE contours; 0 disables them.
    pub contours: usize,
    pub contours_kw: Kwargs,
    /// Draw an arc at the reference standard deviation.
    pub ref_std_line: bool,
    /// Attribute (or stacked dimension) choosing the marker of each point.
    pub markers_key: Option<String>,
    /// Attribute (or stacked dimension) choosing the color of each point.
    pub colors_key: Option<String>,
    pub locale: Locale,
}

impl Default for TaylorOptions {
    fn default() -> Self {
        Self {
            fig_kw: Kwargs::new(),
            plot_kw: Kwargs::new(),
            std_range: (0.0, 1.5),
            contours: 4,
            contours_kw: Kwargs::new(),
            ref_std_line: false,
            markers_key: None,
            colors_key: None,
            locale: Locale::En,
        }
    }
}

struct Point {
    key: String,
    array: LabeledArray,
    sim_std: f64,
    corr: f64,
    kw: Kwargs,
}

/// Build a Taylor diagram from arrays with a [`TAYLOR_DIM`] dimension.
/// Any other dimension is unstacked into one point per label.
pub fn taylordiagram(data: impl Into<DataInput>, opts: &TaylorOptions) -> Result<Figure> {
    let mut fig = Figure::new(ChartKind::Taylor, opts.locale);
    fig.apply_fig_kw(&opts.fig_kw);
    let mut diags = Diagnostics::new();

    let data = naming::process_keys(data.into())?;
    let mut plot_kw = if data.bare {
        opts.plot_kw.clone()
    } else {
        naming::process_kw_keys(&opts.plot_kw)?
    };
    let ref_kw = match plot_kw.remove("reference") {
        Some(serde_json::Value::Object(m)) => m,
        _ => Kwargs::new(),
    };
    let kws = per_entry_kw(&plot_kw, &data)?;

    let mut members = Vec::new();
    for ((key, entry), kw) in data.entries.iter().zip(kws) {
        let Entry::Array(array) = entry else {
            return Err(PlotError::type_err("All entries in 'data' must be labeled arrays."));
        };
        if !array.has_dim(TAYLOR_DIM) {
            return Err(PlotError::value(
                "All arrays must contain a 'taylor_param' dimension.",
            ));
        }
        if key == "reference" {
            return Err(PlotError::value("'reference' is not allowed as a key in data."));
        }
        for (sub, member) in unstack(key, array)? {
            members.push((sub, member, kw.clone()));
        }
    }

    let mut ref_stds = Vec::with_capacity(members.len());
    let mut points = Vec::with_capacity(members.len());
    let mut negative = Vec::new();
    for (key, array, kw) in members {
        let ref_std = param(&array, "ref_std")?;
        let sim_std = param(&array, "sim_std")?;
        let corr = param(&array, "corr")?;
        ref_stds.push(ref_std);
        if corr < 0.0 {
            negative.push(key);
            continue;
        }
        points.push(Point {
            key,
            array,
            sim_std,
            corr,
            kw,
        });
    }
    if !negative.is_empty() {
        diags.warn(
            DiagnosticKind::NegativeCorrelation,
            format!(
                "{} points with negative correlations will not be plotted: {}",
                negative.len(),
                negative.join(", ")
            ),
        );
    }
    let ref_std = *ref_stds
        .first()
        .ok_or_else(|| PlotError::value("no data to plot"))?;
    if ref_stds.iter().any(|s| *s != ref_std) {
        return Err(PlotError::value(
            "All reference standard deviation values must be identical",
        ));
    }
    let max_std = points.iter().map(|p| p.sim_std).fold(ref_std, f64::max);
    let (rmin, rmax) = (opts.std_range.0 * max_std, opts.std_range.1 * max_std);

    let first = data.first()?;
    let units = first.attrs().get("units").map(|v| v.as_text()).unwrap_or_default();
    let std_label = terms::capitalize(&label_with_units(
        &terms::localized_term("standard deviation", opts.locale),
        &units,
    ));
    let corr_type = first
        .attrs()
        .get("correlation_type")
        .map(|v| v.as_text())
        .unwrap_or_default();
    let corr_term = if corr_type.contains("Pearson") {
        "pearson correlation"
    } else {
        "correlation"
    };
    let corr_label = terms::capitalize(&terms::localized_term(corr_term, opts.locale));

    draw_frame(&mut fig, rmax, &corr_label);
    fig.axes.xlim = Some((rmin.min(0.0), rmax));
    fig.axes.ylim = Some((rmin.min(0.0), rmax));
    fig.axes.ylabel = Some(std_label);
    fig.axes.equal_aspect = true;
    fig.axes.frame = false;

    let mut legend = Vec::new();

    if opts.ref_std_line {
        fig.axes.push(Artist::Line(arc(ref_std, Rgba::BLACK, 0.5, LineDash::Solid)));
    }
    if opts.contours > 0 {
        if let Some(entry) = draw_rmse_contours(&mut fig, ref_std, rmax, opts) {
            legend.push(entry);
        }
    }

    let ref_color = get_color(&ref_kw, "color").unwrap_or(REFERENCE_COLOR);
    let ref_marker = get_str(&ref_kw, "marker")
        .and_then(MarkerShape::from_code)
        .unwrap_or(MarkerShape::Square);
    let ref_label = get_str(&ref_kw, "label")
        .map(String::from)
        .unwrap_or_else(|| terms::localized_term("reference", opts.locale));
    fig.axes.push(point(ref_label.clone(), (ref_std, 0.0), ref_color, ref_marker));
    legend.push(LegendEntry {
        label: ref_label,
        color: ref_color,
        glyph: Glyph::Marker {
            shape: ref_marker,
            size: POINT_SIZE.sqrt(),
        },
    });

    let marker_groups = groups(&points, opts.markers_key.as_deref())?;
    let color_groups = groups(&points, opts.colors_key.as_deref())?;
    let keyed = opts.markers_key.is_some() || opts.colors_key.is_some();
    let markers: Vec<MarkerShape> = MARKER_SEQUENCE
        .chars()
        .filter_map(|c| MarkerShape::from_code(&c.to_string()))
        .collect();

    let mut cycle = 0usize;
    let mut group_colors: Vec<(String, Rgba)> = Vec::new();
    for (i, p) in points.iter().enumerate() {
        let theta = p.corr.clamp(0.0, 1.0).acos();
        let xy = (p.sim_std * theta.cos(), p.sim_std * theta.sin());

        let marker = match &marker_groups {
            Some((idx, _)) => markers[idx[i] % markers.len()],
            None => get_str(&p.kw, "marker")
                .and_then(MarkerShape::from_code)
                .unwrap_or(MarkerShape::Circle),
        };
        let color = match &color_groups {
            Some((idx, names)) => {
                let name = &names[idx[i]];
                match group_colors.iter().find(|(n, _)| n == name) {
                    Some((_, c)) => *c,
                    None => {
                        let c = resolve_color(name).unwrap_or_else(|| {
                            cycle += 1;
                            fig.style.cycle_color(cycle - 1)
                        });
                        group_colors.push((name.clone(), c));
                        c
                    }
                }
            }
            None => get_color(&p.kw, "color")
                .or_else(|| resolve_color(&p.key))
                .unwrap_or_else(|| {
                    cycle += 1;
                    fig.style.cycle_color(cycle - 1)
                }),
        };
        let label = if keyed {
            String::new()
        } else if p.key == NO_LABEL {
            p.array.name().unwrap_or(NO_LABEL).to_string()
        } else {
            p.key.clone()
        };
        if !keyed && crate::figure::is_legend_label(&label) {
            legend.push(LegendEntry {
                label: label.clone(),
                color,
                glyph: Glyph::Marker {
                    shape: marker,
                    size: POINT_SIZE.sqrt(),
                },
            });
        }
        fig.axes.push(point(label, xy, color, marker));
    }

    if let Some((_, names)) = &marker_groups {
        for (j, name) in names.iter().enumerate() {
            legend.push(LegendEntry {
                label: name.clone(),
                color: Rgba::BLACK,
                glyph: Glyph::Marker {
                    shape: markers[j % markers.len()],
                    size: POINT_SIZE.sqrt(),
                },
            });
        }
    }
    for (name, color) in group_colors {
        legend.push(LegendEntry {
            label: name,
            color,
            glyph: Glyph::Line {
                dash: LineDash::Solid,
                width: 2.0,
            },
        });
    }

    fig.axes.legend = Some(Legend {
        title: None,
        entries: legend,
        placement: LegendPlacement::Inside(Loc::from("upper right").resolve()?),
    });
    fig.diagnostics.append(&mut diags);
    Ok(fig)
}

/// One member per label combination of the dimensions other than
/// [`TAYLOR_DIM`], keyed `key-label`. The label is also stored as an
/// attribute named after its dimension.
fn unstack(key: &str, array: &LabeledArray) -> Result<Vec<(String, LabeledArray)>> {
    let Some(dim) = array.dims().iter().find(|d| *d != TAYLOR_DIM).cloned() else {
        return Ok(vec![(key.to_string(), array.clone())]);
    };
    let mut out = Vec::new();
    for (i, label) in array.coord_labels(&dim).into_iter().enumerate() {
        let mut member = array.isel(&dim, i)?;
        member.set_attr(dim.clone(), label.clone());
        let sub = if key == NO_LABEL {
            label
        } else {
            format!("{key}-{label}")
        };
        out.extend(unstack(&sub, &member)?);
    }
    Ok(out)
}

fn param(array: &LabeledArray, name: &str) -> Result<f64> {
    array
        .sel(TAYLOR_DIM, name)?
        .values()
        .first()
        .copied()
        .ok_or_else(|| PlotError::value(format!("'{name}' has no value")))
}

/// Group index of every point plus the group names in first-seen order.
fn groups(points: &[Point], key: Option<&str>) -> Result<Option<(Vec<usize>, Vec<String>)>> {
    let Some(key) = key else {
        return Ok(None);
    };
    let mut names: Vec<String> = Vec::new();
    let mut idx = Vec::with_capacity(points.len());
    for p in points {
        let value = p.array.attr_text(key).ok_or_else(|| {
            PlotError::key(format!("'{key}' not found in the attributes of '{}'", p.key))
        })?;
        let i = match names.iter().position(|n| *n == value) {
            Some(i) => i,
            None => {
                names.push(value);
                names.len() - 1
            }
        };
        idx.push(i);
    }
    Ok(Some((idx, names)))
}

fn point(label: String, xy: (f64, f64), color: Rgba, marker: MarkerShape) -> Artist {
    Artist::Scatter(ScatterArtist {
        label,
        points: vec![xy],
        colors: vec![color],
        sizes: vec![POINT_SIZE],
        marker,
        edge: None,
    })
}

/// Quarter circle of radius `r` around the origin.
fn arc(r: f64, color: Rgba, width: f64, dash: LineDash) -> LineArtist {
    LineArtist {
        label: String::new(),
        points: (0..=ARC_STEPS)
            .map(|i| {
                let t = std::f64::consts::FRAC_PI_2 * i as f64 / ARC_STEPS as f64;
                (r * t.cos(), r * t.sin())
            })
            .collect(),
        color,
        width,
        dash,
        marker: None,
    }
}

/// Outer rim, correlation spokes with their labels, and the axis name of
/// the angular axis.
fn draw_frame(fig: &mut Figure, rmax: f64, corr_label: &str) {
    fig.axes.push(Artist::Line(arc(rmax, Rgba::BLACK, 1.0, LineDash::Solid)));
    let grid = Rgba::rgb(190, 190, 190);
    for c in CORR_TICKS {
        let t = c.acos();
        let (x, y) = (t.cos(), t.sin());
        fig.axes.push(Artist::Line(LineArtist {
            label: String::new(),
            points: vec![(0.0, 0.0), (rmax * x, rmax * y)],
            color: grid,
            width: 0.5,
            dash: LineDash::Dot,
            marker: None,
        }));
        let mut label = TextArtist::new(format_number(c), rmax * 1.02 * x, rmax * 1.02 * y, TextCoords::Data)
            .aligned(HAlign::Left, VAlign::Center);
        label.rotation = t.to_degrees();
        label.size_scale = 0.8;
        fig.axes.push(Artist::Text(label));
    }
    let t = std::f64::consts::FRAC_PI_4;
    let mut name = TextArtist::new(corr_label, rmax * 1.12 * t.cos(), rmax * 1.12 * t.sin(), TextCoords::Data)
        .aligned(HAlign::Center, VAlign::Center);
    name.rotation = -45.0;
    fig.axes.push(Artist::Text(name));
    fig.axes.xticks = Ticks::Auto;
    fig.axes.yticks = Ticks::Auto;
}

/// Round `x` up to 1, 2, 2.5 or 5 times a power of ten.
fn nice_step(x: f64) -> f64 {
    if x.is_nan() || x <= 0.0 {
        return 1.0;
    }
    let mag = 10f64.powf(x.log10().floor());
    [1.0, 2.0, 2.5, 5.0, 10.0]
        .into_iter()
        .map(|m| m * mag)
        .find(|s| *s >= x)
        .unwrap_or(10.0 * mag)
}

/// Centered RMS error levels: circles around the reference point, clipped
/// to the diagram. Returns the legend entry of the contours.
fn draw_rmse_contours(fig: &mut Figure, ref_std: f64, rmax: f64, opts: &TaylorOptions) -> Option<LegendEntry> {
    let max_rms = (ref_std * ref_std + rmax * rmax).sqrt();
    let step = nice_step(max_rms / (opts.contours + 1) as f64);
    let color = get_color(&opts.contours_kw, "colors")
        .or_else(|| get_color(&opts.contours_kw, "color"))
        .unwrap_or(Rgba::rgb(128, 128, 128));
    let width = get_f64(&opts.contours_kw, "linewidths").unwrap_or(0.5);
    let dash = get_str(&opts.contours_kw, "linestyles")
        .and_then(LineDash::from_code)
        .unwrap_or(LineDash::Dash);

    let mut drawn = false;
    for k in 1..=opts.contours {
        let level = step * k as f64;
        if level >= max_rms {
            break;
        }
        let points: Vec<(f64, f64)> = (0..=2 * ARC_STEPS)
            .map(|i| std::f64::consts::PI * i as f64 / (2 * ARC_STEPS) as f64)
            .map(|t| (ref_std + level * t.cos(), level * t.sin()))
            .map(|(x, y)| if x >= 0.0 && x.hypot(y) <= rmax { (x, y) } else { (f64::NAN, f64::NAN) })
            .collect();
        let Some(&(lx, ly)) = points.iter().filter(|(x, _)| x.is_finite()).max_by(|a, b| a.1.total_cmp(&b.1))
        else {
            continue;
        };
        fig.axes.push(Artist::Line(LineArtist {
            label: String::new(),
            points,
            color,
            width,
            dash,
            marker: None,
        }));
        fig.axes.push(Artist::Text(
            TextArtist::new(format_number(level), lx, ly, TextCoords::Data)
                .aligned(HAlign::Center, VAlign::Bottom)
                .colored(color),
        ));
        drawn = true;
    }
    drawn.then(|| LegendEntry {
        label: terms::localized_term("rmse", opts.locale),
        color,
        glyph: Glyph::Line { dash, width },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(name: &str, ref_std: f64, sim_std: f64, corr: f64) -> LabeledArray {
        LabeledArray::from_vec(TAYLOR_DIM, vec![ref_std, sim_std, corr])
            .named(name)
            .with_attr("units", "K")
            .with_attr("correlation_type", "Pearson correlation coefficient")
            .with_coord(TAYLOR_DIM, vec!["ref_std", "sim_std", "corr"])
            .unwrap()
    }

    #[test]
    fn points_and_reference() {
        let data = vec![("model_a", stats("tas", 2.0, 2.5, 0.8)), ("model_b", stats("tas", 2.0, 1.5, 0.6))];
        let fig = taylordiagram(data, &TaylorOptions::default()).unwrap();
        let labels = fig.legend_labels();
        assert_eq!(labels[0], "rmse");
        assert_eq!(labels[1], "reference");
        assert!(labels.contains(&"model_a"));
        let a = fig.scatters().find(|s| s.label == "model_a").unwrap();
        assert!((a.points[0].0 - 2.0).abs() < 1e-9);
        assert!((a.points[0].1 - 1.5).abs() < 1e-9);
        assert_eq!(fig.axes.ylabel.as_deref(), Some("Standard deviation (K)"));
        assert!(fig.texts().any(|t| t.text == "Pearson correlation"));
    }

    #[test]
    fn negative_correlation_is_skipped() {
        let data = vec![("a", stats("tas", 1.0, 1.0, -0.2)), ("b", stats("tas", 1.0, 1.2, 0.9))];
        let fig = taylordiagram(data, &TaylorOptions::default()).unwrap();
        assert!(fig.diagnostics.iter().any(|d| d.kind == DiagnosticKind::NegativeCorrelation
            && d.message == "1 points with negative correlations will not be plotted: a"));
        assert!(fig.scatters().all(|s| s.label != "a"));
    }

    #[test]
    fn reference_std_must_agree() {
        let data = vec![("a", stats("tas", 1.0, 1.0, 0.5)), ("b", stats("tas", 1.1, 1.2, 0.9))];
        assert!(matches!(
            taylordiagram(data, &TaylorOptions::default()),
            Err(PlotError::Value(_))
        ));
    }

    #[test]
    fn reserved_and_missing_dims() {
        let bad = LabeledArray::from_vec("x", vec![1.0, 1.0, 0.5]);
        assert!(matches!(
            taylordiagram(bad, &TaylorOptions::default()),
            Err(PlotError::Value(_))
        ));
        let data = vec![("reference", stats("tas", 1.0, 1.0, 0.5))];
        assert!(matches!(
            taylordiagram(data, &TaylorOptions::default()),
            Err(PlotError::Value(m)) if m.contains("'reference'")
        ));
    }

    #[test]
    fn extra_dimension_is_unstacked_and_keyed() {
        let a = LabeledArray::new(&["season", TAYLOR_DIM], &[2, 3], vec![1.0, 1.1, 0.7, 1.0, 0.9, 0.8])
            .unwrap()
            .with_coord("season", vec!["DJF", "JJA"])
            .unwrap()
            .with_coord(TAYLOR_DIM, vec!["ref_std", "sim_std", "corr"])
            .unwrap();
        let opts = TaylorOptions {
            markers_key: Some("season".into()),
            ..Default::default()
        };
        let fig = taylordiagram(vec![("m1", a)], &opts).unwrap();
        let labels = fig.legend_labels();
        assert!(labels.contains(&"DJF") && labels.contains(&"JJA"));
        assert_eq!(fig.scatters().filter(|s| s.label.is_empty()).count(), 2);
    }
}
