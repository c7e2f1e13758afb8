//! Point data on a map, colored by value and optionally sized by a second
//! variable.

use serde::{Deserialize, Serialize};

use crate::charts::gridmap::grid_norm;
use crate::charts::{
    CoordParam, ShowCoords, annotate_coords, finite_range, levels_from_kw, resolve_cmap,
    setup_map_axes, single_array, unnest_kw,
};
use crate::colormap::{Divergent, Levels, linspace};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{PlotError, Result};
use crate::figure::{
    Artist, ChartKind, Colorbar, Figure, Glyph, Legend, LegendEntry, LegendPlacement, Orientation,
    ScatterArtist, Title,
};
use crate::layout::{HAlign, Loc, wrap_text};
use crate::models::{DataInput, Entry, LabeledArray, format_number};
use crate::naming;
use crate::options::{Kwargs, UseAttrs, get_color, get_f64, get_str, label_with_units, resolve_plot_attrs};
use crate::projection::{Projection, rotated_pole_of, take_extent};
use crate::style::{MarkerShape, Rgba};
use crate::terms::Locale;

/// Variable setting the point sizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeSource {
    /// The plotted values themselves.
    Data,
    /// A variable of the same table, or a coordinate of the array.
    Named(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScattermapOptions {
    pub use_attrs: UseAttrs,
    pub fig_kw: Kwargs,
    /// `cmap`, `levels`, `vmin`, `vmax`, `marker`, `edgecolors`,
    /// `markersize` (constant point size), `xlim`/`ylim`.
    pub plot_kw: Kwargs,
    pub projection: Projection,
    pub transform: Option<Projection>,
    pub sizes: Option<SizeSource>,
    /// Smallest and largest marker area, in points^2.
    pub size_range: (f64, f64),
    pub cmap: Option<String>,
    pub levels: Option<Levels>,
    pub divergent: Divergent,
    pub show_time: ShowCoords,
    pub frame: bool,
    pub locale: Locale,
}

impl Default for ScattermapOptions {
    fn default() -> Self {
        Self {
            use_attrs: UseAttrs::new(),
            fig_kw: Kwargs::new(),
            plot_kw: Kwargs::new(),
            projection: Projection::default(),
            transform: None,
            sizes: None,
            size_range: (10.0, 60.0),
            cmap: None,
            levels: None,
            divergent: Divergent::Off,
            show_time: ShowCoords::Off,
            frame: false,
            locale: Locale::En,
        }
    }
}

const DEFAULT_POINT_SIZE: f64 = 20.0;
const MAX_SIZE_LEGEND_ENTRIES: usize = 6;

/// Plot point values on a map with a vertical colorbar, and a size legend
/// when sizes come from data.
pub fn scattermap(data: impl Into<DataInput>, opts: &ScattermapOptions) -> Result<Figure> {
    let mut fig = Figure::new(ChartKind::Scattermap, opts.locale);
    fig.apply_fig_kw(&opts.fig_kw);
    let mut diags = Diagnostics::new();

    let data = naming::process_keys(data.into())?;
    let mut plot_kw = unnest_kw(&opts.plot_kw, &data);
    let (entry, array) = single_array(&data, &mut diags)?;

    let (xs, ys, source) = point_coords(&entry, &array, &mut diags)?;
    let source = opts.transform.unwrap_or(source);

    let use_attrs = opts.use_attrs.merge_defaults(&[
        ("cbar_label", "long_name"),
        ("cbar_units", "units"),
        ("title", "description"),
    ]);
    let attrs = resolve_plot_attrs(&use_attrs, &entry, opts.locale, (18, 30), &mut diags);

    // Size variable, checked before anything is masked.
    let size_var = match &opts.sizes {
        Some(src) => Some(size_variable(src, &entry, &array)?),
        None => None,
    };

    let values = array.values();
    let mut keep: Vec<bool> = values.iter().map(|v| v.is_finite()).collect();
    report_nan(&keep, "when plotting the color values", &mut diags);
    if let Some(sv) = &size_var {
        let size_ok: Vec<bool> = sv.values().iter().map(|v| v.is_finite()).collect();
        report_nan(&size_ok, "when setting the point size", &mut diags);
        keep.iter_mut().zip(size_ok).for_each(|(k, ok)| *k &= ok);
    }

    let cmap_name = opts.cmap.clone().or_else(|| get_str(&plot_kw, "cmap").map(String::from));
    let cmap = resolve_cmap(cmap_name.as_deref(), &array, opts.divergent.is_on(), &mut diags)?;
    let (dmin, dmax) = finite_range(masked(values, &keep))
        .ok_or_else(|| PlotError::value("data has no finite values"))?;
    let vmin = get_f64(&plot_kw, "vmin").unwrap_or(dmin);
    let vmax = get_f64(&plot_kw, "vmax").unwrap_or(dmax);
    let levels = opts.levels.clone().or_else(|| levels_from_kw(&plot_kw));
    let norm = grid_norm(vmin, vmax, levels.as_ref(), opts.divergent, &mut diags)?;

    let constant_size = get_f64(&plot_kw, "markersize")
        .or_else(|| get_f64(&plot_kw, "s"))
        .unwrap_or(DEFAULT_POINT_SIZE);
    let (sizes, size_data_range) = match &size_var {
        Some(sv) => {
            let kept: Vec<f64> = masked(sv.values(), &keep).collect();
            let range = finite_range(kept.iter().copied())
                .ok_or_else(|| PlotError::value("size variable has no finite values"))?;
            (norm2range(&kept, opts.size_range, range), Some(range))
        }
        None => (vec![constant_size; keep.iter().filter(|k| **k).count()], None),
    };

    let marker = get_str(&plot_kw, "marker")
        .and_then(MarkerShape::from_code)
        .unwrap_or(MarkerShape::Circle);
    let edge = get_color(&plot_kw, "edgecolors").or_else(|| get_color(&plot_kw, "edgecolor"));

    let mut points = Vec::new();
    let mut colors = Vec::new();
    let mut point_sizes = Vec::new();
    let mut kept_sizes = sizes.into_iter();
    for (i, ok) in keep.iter().enumerate() {
        if !ok {
            continue;
        }
        let size = kept_sizes.next().unwrap_or(constant_size);
        if let Some(p) = opts.projection.transform_from(&source, xs[i], ys[i]) {
            points.push(p);
            colors.push(cmap.map(&norm, values[i]));
            point_sizes.push(size);
        }
    }
    fig.axes.push(Artist::Scatter(ScatterArtist {
        label: String::new(),
        points,
        colors,
        sizes: point_sizes,
        marker,
        edge,
    }));

    let extent = take_extent(&mut plot_kw, &mut diags);
    setup_map_axes(&mut fig, &source, &opts.projection, extent, opts.frame);

    if let (Some(sv), Some(range), Some(src)) = (&size_var, size_data_range, &opts.sizes) {
        let entries = size_legend_entries(range, opts.size_range, marker);
        if !entries.is_empty() {
            fig.axes.legend = Some(Legend {
                title: Some(size_legend_title(sv, src)),
                entries,
                placement: LegendPlacement::Inside(Loc::from("lower left").resolve()?),
            });
        }
    }

    fig.axes.title = attrs.title.map(|text| Title {
        text,
        loc: HAlign::Center,
    });
    fig.suptitle = attrs.suptitle;
    fig.colorbar = Some(Colorbar {
        ticks: norm.boundaries().map(<[f64]>::to_vec),
        cmap,
        norm,
        label: attrs.cbar_label,
        orientation: Orientation::Vertical,
    });

    fig.diagnostics.append(&mut diags);
    annotate_coords(&mut fig, &array, &opts.show_time, CoordParam::Time)?;
    Ok(fig)
}

fn masked<'a>(values: &'a [f64], keep: &'a [bool]) -> impl Iterator<Item = f64> + 'a {
    values.iter().zip(keep).filter(|(_, k)| **k).map(|(v, _)| *v)
}

fn report_nan(finite: &[bool], what: &str, diags: &mut Diagnostics) {
    let n = finite.iter().filter(|ok| !**ok).count();
    if n > 0 {
        diags.warn(
            DiagnosticKind::DroppedNan,
            format!("{n} nan values were dropped {what}"),
        );
    }
}

/// Values of a coordinate spanning exactly the array's dimensions.
fn point_coord(array: &LabeledArray, name: &str) -> Option<Vec<f64>> {
    let c = array.coord(name)?;
    if c.dims != array.dims() || c.values.len() != array.size() {
        return None;
    }
    (0..c.values.len()).map(|i| c.values.as_f64(i)).collect()
}

/// Position of every element as `(x, y)` lists, plus the coordinate
/// system they are expressed in. Points carry `lon`/`lat` (or
/// `rlon`/`rlat`) coordinates; a 2-D grid along those dimensions is
/// expanded to one point per cell.
fn point_coords(
    entry: &Entry,
    array: &LabeledArray,
    diags: &mut Diagnostics,
) -> Result<(Vec<f64>, Vec<f64>, Projection)> {
    for (xname, yname, rotated) in [("lon", "lat", false), ("rlon", "rlat", true)] {
        let pair = match (point_coord(array, xname), point_coord(array, yname)) {
            (Some(x), Some(y)) => Some((x, y)),
            _ if array.ndim() == 2 && array.has_dim(xname) && array.has_dim(yname) => {
                if array.dims()[0] != yname {
                    return Err(PlotError::value(format!(
                        "grid data must be ordered ({yname}, {xname})"
                    )));
                }
                let xc = array.coord_f64(xname);
                let yc = array.coord_f64(yname);
                let xs = yc.iter().flat_map(|_| xc.iter().copied()).collect();
                let ys = yc.iter().flat_map(|y| std::iter::repeat_n(*y, xc.len())).collect();
                Some((xs, ys))
            }
            _ => None,
        };
        if let Some((xs, ys)) = pair {
            let source = if rotated {
                rotated_pole_of(entry, diags).unwrap_or(Projection::PlateCarree)
            } else {
                Projection::PlateCarree
            };
            return Ok((xs, ys, source));
        }
    }
    Err(PlotError::value(
        "point data needs 'lat' and 'lon' (or 'rlat' and 'rlon') coordinates",
    ))
}

fn size_variable(src: &SizeSource, entry: &Entry, array: &LabeledArray) -> Result<LabeledArray> {
    let sv = match src {
        SizeSource::Data => Some(array.clone()),
        SizeSource::Named(name) => match entry {
            Entry::Table(t) => t.var(name).map(LabeledArray::squeeze),
            Entry::Array(_) => None,
        }
        .or_else(|| {
            let values = point_coord(array, name)?;
            array.with_values(values).ok().map(|a| a.named(name.clone()))
        }),
    };
    let sv = sv.ok_or_else(|| {
        let name = match src {
            SizeSource::Data => array.name().unwrap_or_default().to_string(),
            SizeSource::Named(n) => n.clone(),
        };
        PlotError::value(format!("{name} not found"))
    })?;
    if sv.size() != array.size() {
        return Err(PlotError::value(
            "size variable must have the same shape as the plotted data",
        ));
    }
    Ok(sv)
}

/// Map `data` linearly from `data_range` onto `target`.
pub fn norm2range(data: &[f64], target: (f64, f64), data_range: (f64, f64)) -> Vec<f64> {
    let (a, b) = data_range;
    data.iter()
        .map(|v| {
            if b > a {
                target.0 + (v - a) / (b - a) * (target.1 - target.0)
            } else {
                (target.0 + target.1) / 2.0
            }
        })
        .collect()
}

fn rounding_for(ratio: f64) -> f64 {
    [1000.0, 100.0, 10.0, 1.0, 0.1, 0.01, 0.001]
        .into_iter()
        .find(|r| ratio >= *r)
        .unwrap_or(0.0001)
}

/// Size legend: one entry per 10 points^2 of marker-size span, values
/// rounded according to the data range, at most
/// [`MAX_SIZE_LEGEND_ENTRIES`] entries.
fn size_legend_entries(data_range: (f64, f64), sizes: (f64, f64), marker: MarkerShape) -> Vec<LegendEntry> {
    let n = (((sizes.1 - sizes.0) / 10.0).round() as usize).max(1);
    let (lo, hi) = data_range;
    let ratio = (hi - lo).abs() / n as f64;
    let rounding = rounding_for(ratio);
    let mut values: Vec<f64> = linspace(lo, hi, n)
        .into_iter()
        .map(|v| rounding * (v / rounding).round())
        .collect();
    values.sort_by(f64::total_cmp);
    values.dedup();

    let legend_sizes = norm2range(&values, sizes, data_range);
    let entries: Vec<LegendEntry> = values
        .iter()
        .zip(legend_sizes)
        .map(|(v, s)| LegendEntry {
            label: if v.fract() == 0.0 {
                format!("{}", *v as i64)
            } else {
                format_number(*v)
            },
            color: Rgba::BLACK,
            glyph: Glyph::Marker {
                shape: marker,
                size: s.abs().sqrt(),
            },
        })
        .collect();
    if entries.len() > MAX_SIZE_LEGEND_ENTRIES {
        entries.into_iter().step_by(2).take(MAX_SIZE_LEGEND_ENTRIES / 2 + 1).collect()
    } else {
        entries
    }
}

fn size_legend_title(sv: &LabeledArray, src: &SizeSource) -> String {
    let fallback = || match src {
        SizeSource::Named(n) => n.clone(),
        SizeSource::Data => sv.name().unwrap_or_default().to_string(),
    };
    match sv.attr_text("long_name") {
        Some(long_name) => {
            let mut d = Diagnostics::new();
            let units = sv.attr_text("units").unwrap_or_default();
            label_with_units(&wrap_text(&long_name, 1, 15, &mut d), &units)
        }
        None => fallback(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LabeledTable;

    fn stations(values: Vec<f64>) -> LabeledArray {
        let n = values.len();
        LabeledArray::from_vec("site", values)
            .named("pr")
            .with_aux_coord("lat", &["site"], (0..n).map(|i| 45.0 + i as f64).collect::<Vec<_>>())
            .unwrap()
            .with_aux_coord("lon", &["site"], (0..n).map(|i| -75.0 + i as f64).collect::<Vec<_>>())
            .unwrap()
    }

    #[test]
    fn nan_points_are_dropped_and_reported() {
        let fig = scattermap(stations(vec![1.0, f64::NAN, 3.0]), &ScattermapOptions::default()).unwrap();
        let s = fig.scatters().next().unwrap();
        assert_eq!(s.points.len(), 2);
        assert!(fig.diagnostics.iter().any(|d| d.message
            == "1 nan values were dropped when plotting the color values"));
    }

    #[test]
    fn sizes_from_table_variable() {
        let t = LabeledTable::new()
            .with_var("pr", stations(vec![1.0, 2.0, 3.0]))
            .with_var(
                "elev",
                stations(vec![100.0, 200.0, 300.0])
                    .named("elev")
                    .with_attr("long_name", "Elevation")
                    .with_attr("units", "m"),
            );
        let opts = ScattermapOptions {
            sizes: Some(SizeSource::Named("elev".into())),
            ..Default::default()
        };
        let fig = scattermap(t, &opts).unwrap();
        let s = fig.scatters().next().unwrap();
        assert_eq!(s.sizes, vec![10.0, 35.0, 60.0]);
        let legend = fig.axes.legend.as_ref().unwrap();
        assert_eq!(legend.title.as_deref(), Some("Elevation (m)"));
        assert!(legend.entries.len() <= MAX_SIZE_LEGEND_ENTRIES);
        assert_eq!(legend.entries[0].label, "100");
    }

    #[test]
    fn unknown_size_variable() {
        let opts = ScattermapOptions {
            sizes: Some(SizeSource::Named("height".into())),
            ..Default::default()
        };
        let err = scattermap(stations(vec![1.0]), &opts).unwrap_err();
        assert!(matches!(&err, PlotError::Value(m) if m == "height not found"));
    }

    #[test]
    fn size_scaling() {
        assert_eq!(norm2range(&[0.0, 5.0, 10.0], (10.0, 60.0), (0.0, 10.0)), vec![10.0, 35.0, 60.0]);
        assert_eq!(rounding_for(40.0), 10.0);
        assert_eq!(rounding_for(0.00002), 0.0001);
    }
}
