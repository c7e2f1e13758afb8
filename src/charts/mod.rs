//! Chart entry points and the helpers they share.
//!
//! Every chart follows the same sequence: normalize the input into named
//! entries, validate it, classify or select what to draw, merge options with
//! defaults, emit artists into a [`Figure`], then finalize labels, legend and
//! annotations. Hard failures abort with a [`PlotError`](crate::PlotError);
//! soft ones end up in [`Figure::diagnostics`].

pub mod gridmap;
pub mod hatchmap;
pub mod heatmap;
pub mod partition;
pub mod scattermap;
pub mod stripes;
pub mod taylor;
pub mod timeseries;
pub mod triheatmap;
pub mod violin;

pub use gridmap::{GridmapOptions, gridmap};
pub use hatchmap::{HatchmapOptions, hatchmap};
pub use heatmap::{HeatmapOptions, heatmap};
pub use partition::{PartitionOptions, partition};
pub use scattermap::{ScattermapOptions, SizeSource, scattermap};
pub use stripes::{StripesOptions, stripes};
pub use taylor::{TaylorOptions, taylordiagram};
pub use timeseries::{TimeseriesOptions, timeseries};
pub use triheatmap::{TriheatmapOptions, triheatmap};
pub use violin::{ViolinColor, ViolinOptions, violin};

use serde::{Deserialize, Serialize};

use crate::calendar::convert_axis;
use crate::colormap::{self, Colormap, Levels};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{PlotError, Result};
use crate::figure::{Artist, Figure, MeshCell, TextArtist, Ticks};
use crate::layout::Loc;
use crate::models::{CoordValues, Entry, LabeledArray, NamedData};
use crate::options::{Kwargs, get_color, get_f64, get_str};
use crate::projection::{Projection, cell_edges};
use crate::style::{LineDash, MarkerShape, Rgba, Style};

/// Whether and where to write a coordinate annotation (`lat=…, lon=…` or the
/// time stamp) on the axes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum ShowCoords {
    #[default]
    Off,
    /// At the chart's default location (lower right).
    On,
    At(Loc),
}

impl ShowCoords {
    fn loc(&self) -> Option<Loc> {
        match self {
            ShowCoords::Off => None,
            ShowCoords::On => Some(Loc::from("lower right")),
            ShowCoords::At(loc) => Some(loc.clone()),
        }
    }
}

impl From<bool> for ShowCoords {
    fn from(on: bool) -> Self {
        if on { ShowCoords::On } else { ShowCoords::Off }
    }
}

impl From<&str> for ShowCoords {
    fn from(loc: &str) -> Self {
        ShowCoords::At(Loc::from(loc))
    }
}

impl From<Loc> for ShowCoords {
    fn from(loc: Loc) -> Self {
        ShowCoords::At(loc)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CoordParam {
    Location,
    Time,
}

/// Text of a scalar-coordinate annotation; `None` with a diagnostic when
/// the coordinates are missing.
pub(crate) fn coord_text(array: &LabeledArray, param: CoordParam, diags: &mut Diagnostics) -> Option<String> {
    match param {
        CoordParam::Location => {
            let lat = array.scalar_coord("lat").and_then(|c| c.as_f64(0));
            let lon = array.scalar_coord("lon").and_then(|c| c.as_f64(0));
            match (lat, lon) {
                (Some(lat), Some(lon)) => Some(format!("lat={lat:.2}, lon={lon:.2}")),
                _ => {
                    diags.warn(
                        DiagnosticKind::MissingCoordinate,
                        "show_lat_lon set to True, but \"lat\" and/or \"lon\" not found in coords",
                    );
                    None
                }
            }
        }
        CoordParam::Time => match array.scalar_coord("time").and_then(|c| c.label(0)) {
            Some(t) => Some(t),
            None => {
                diags.warn(
                    DiagnosticKind::MissingCoordinate,
                    "show_time set to True, but \"time\" not found in coords",
                );
                None
            }
        },
    }
}

/// Add a coordinate annotation on a white background.
pub(crate) fn annotate_coords(
    fig: &mut Figure,
    array: &LabeledArray,
    show: &ShowCoords,
    param: CoordParam,
) -> Result<()> {
    let Some(loc) = show.loc() else {
        return Ok(());
    };
    let anchor = loc.resolve()?;
    if let Some(text) = coord_text(array, param, &mut fig.diagnostics) {
        fig.axes.push(Artist::Text(
            TextArtist::at_anchor(text, anchor).with_background(Rgba::WHITE),
        ));
    }
    Ok(())
}

/// Convert a non-standard calendar time axis to the standard calendar.
/// Returns whether a conversion happened.
fn standardize_time(array: &LabeledArray) -> Result<(LabeledArray, bool)> {
    let Some(CoordValues::CfTime { calendar, dates }) = array.coord("time").map(|c| &c.values) else {
        return Ok((array.clone(), false));
    };
    let (converted, keep) = convert_axis(dates, *calendar);
    let mut out = if keep.len() == dates.len() {
        array.clone()
    } else {
        array.take("time", &keep)?
    };
    out.replace_coord("time", CoordValues::Time(converted));
    Ok((out, true))
}

/// Require a `time` dimension and bring its coordinate to the standard
/// calendar, reporting a conversion once per entry.
pub(crate) fn ensure_time_index(entry: &Entry, diags: &mut Diagnostics) -> Result<Entry> {
    if !entry.has_dim("time") {
        return Err(PlotError::value(format!(
            "data must have a 'time' dimension (dimensions: {:?})",
            entry.dims()
        )));
    }
    let mut converted = false;
    let out = entry.try_map(|a| {
        if !a.has_dim("time") {
            return Ok(a.clone());
        }
        let (arr, did) = standardize_time(a)?;
        converted |= did;
        Ok(arr)
    })?;
    if converted {
        diags.warn(
            DiagnosticKind::CalendarConverted,
            "Non-standard calendar times converted to the 'standard' calendar.",
        );
    }
    Ok(out)
}

/// Time positions (decimal years) of the `time` axis.
pub(crate) fn time_positions(array: &LabeledArray) -> Result<Vec<f64>> {
    let coord = array
        .coord("time")
        .filter(|c| c.dims.len() == 1)
        .ok_or_else(|| PlotError::value("'time' coordinate not found"))?;
    (0..coord.values.len())
        .map(|i| {
            coord
                .values
                .as_f64(i)
                .ok_or_else(|| PlotError::value("'time' coordinate is not numeric or temporal"))
        })
        .collect()
}

/// `(time, value)` pairs of a series. Other size-1 dimensions are dropped;
/// any other dimension left over is an error.
pub(crate) fn time_series_points(array: &LabeledArray) -> Result<Vec<(f64, f64)>> {
    let mut a = array.clone();
    while let Some(d) = a
        .dims()
        .iter()
        .zip(a.shape())
        .find(|(d, n)| **n == 1 && d.as_str() != "time")
        .map(|(d, _)| d.clone())
    {
        a = a.isel(&d, 0)?;
    }
    if a.ndim() != 1 || a.dims()[0] != "time" {
        return Err(PlotError::value(format!(
            "expected a 1-D series along 'time', got dimensions {:?}",
            array.dims()
        )));
    }
    let xs = time_positions(&a)?;
    Ok(xs.into_iter().zip(a.values().iter().copied()).collect())
}

/// For single-entry charts: the entry's options when `plot_kw` is nested
/// under the data key, else `plot_kw` itself.
pub(crate) fn unnest_kw(plot_kw: &Kwargs, data: &NamedData) -> Kwargs {
    if data.bare {
        return plot_kw.clone();
    }
    match data.keys().next().and_then(|k| plot_kw.get(k)) {
        Some(serde_json::Value::Object(m)) => m.clone(),
        _ => plot_kw.clone(),
    }
}

/// The one entry of a single-entry chart, plus the array to draw (a
/// table contributes its first variable). Size-1 dimensions are squeezed.
pub(crate) fn single_array(data: &NamedData, diags: &mut Diagnostics) -> Result<(Entry, LabeledArray)> {
    if !data.bare && data.len() != 1 {
        return Err(PlotError::value("If `data` is a dict, it must be of length 1."));
    }
    let entry = data.first()?.clone();
    let array = match &entry {
        Entry::Array(a) => a.squeeze(),
        Entry::Table(t) => {
            if t.len() > 1 {
                diags.warn(
                    DiagnosticKind::FirstVariableOnly,
                    "data is a table; only the first variable will be used in plot",
                );
            }
            t.first_var()
                .ok_or_else(|| PlotError::value("dataset has no variables"))?
                .squeeze()
        }
    };
    Ok((entry, array))
}

/// Palette by explicit name, or from the variable group of `array`.
pub(crate) fn resolve_cmap(
    cmap: Option<&str>,
    array: &LabeledArray,
    divergent: bool,
    diags: &mut Diagnostics,
) -> Result<Colormap> {
    match cmap {
        Some(name) => colormap::load_palette(name),
        None => {
            let group = colormap::var_group_of(array, diags);
            colormap::build_colormap(Some(&group), divergent, None)
        }
    }
}

/// NaN-aware (min, max).
pub(crate) fn finite_range(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Line appearance read from per-entry options.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LineStyle {
    pub color: Option<Rgba>,
    pub width: f64,
    pub dash: LineDash,
    pub marker: Option<MarkerShape>,
    pub alpha: Option<f64>,
}

impl LineStyle {
    pub fn from_kw(kw: &Kwargs, style: &Style) -> Self {
        let width = get_f64(kw, "linewidth")
            .or_else(|| get_f64(kw, "lw"))
            .unwrap_or(style.line_width);
        let dash = get_str(kw, "linestyle")
            .or_else(|| get_str(kw, "ls"))
            .and_then(LineDash::from_code)
            .unwrap_or(LineDash::Solid);
        Self {
            color: get_color(kw, "color").or_else(|| get_color(kw, "c")),
            width,
            dash,
            marker: get_str(kw, "marker").and_then(MarkerShape::from_code),
            alpha: get_f64(kw, "alpha"),
        }
    }

    /// The explicit color, else the next one of the style cycle.
    pub fn resolve_color(&self, style: &Style, cycle: &mut usize) -> Rgba {
        let c = match self.color {
            Some(c) => c,
            None => {
                let c = style.cycle_color(*cycle);
                *cycle += 1;
                c
            }
        };
        match self.alpha {
            Some(a) => c.with_alpha(a),
            None => c,
        }
    }
}

/// Quadrilateral cells of a 2-D `(y, x)` grid, moved into `target`.
/// Cells with a NaN value or any corner outside the projection are
/// skipped.
pub(crate) fn grid_cells<F>(
    array: &LabeledArray,
    ydim: &str,
    xdim: &str,
    source: &Projection,
    target: &Projection,
    mut color_of: F,
) -> Result<Vec<MeshCell>>
where
    F: FnMut(f64) -> Option<Rgba>,
{
    let a = array.transpose(&[ydim, xdim])?;
    let xs = cell_edges(&axis_positions(&a, xdim));
    let ys = cell_edges(&axis_positions(&a, ydim));
    let nx = xs.len().saturating_sub(1);
    let ny = ys.len().saturating_sub(1);
    let mut cells = Vec::with_capacity(nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            let Some(v) = a.get(&[j, i]) else { continue };
            if !v.is_finite() {
                continue;
            }
            let Some(color) = color_of(v) else { continue };
            let corners = [(xs[i], ys[j]), (xs[i + 1], ys[j]), (xs[i + 1], ys[j + 1]), (xs[i], ys[j + 1])];
            let polygon: Option<Vec<(f64, f64)>> = corners
                .iter()
                .map(|(x, y)| target.transform_from(source, *x, *y))
                .collect();
            if let Some(polygon) = polygon {
                cells.push(MeshCell { polygon, color });
            }
        }
    }
    Ok(cells)
}

/// `levels` option: a count or explicit boundaries.
pub(crate) fn levels_from_kw(kw: &Kwargs) -> Option<Levels> {
    match kw.get("levels")? {
        serde_json::Value::Number(n) => n.as_u64().map(|n| Levels::Count(n as usize)),
        serde_json::Value::Array(items) => Some(Levels::Boundaries(
            items.iter().filter_map(serde_json::Value::as_f64).collect(),
        )),
        _ => None,
    }
}

/// Common map axes: equal aspect, no ticks, optional extent taken from
/// `xlim`/`ylim` in transform coordinates.
pub(crate) fn setup_map_axes(
    fig: &mut Figure,
    source: &Projection,
    target: &Projection,
    extent: Option<[f64; 4]>,
    frame: bool,
) {
    fig.axes.equal_aspect = true;
    fig.axes.frame = frame;
    fig.axes.xticks = Ticks::Hidden;
    fig.axes.yticks = Ticks::Hidden;
    if let Some((xlim, ylim)) = extent.and_then(|e| target.extent_from(source, e)) {
        fig.axes.xlim = Some(xlim);
        fig.axes.ylim = Some(ylim);
    }
}

/// Numeric positions along `dim`: the coordinate when numeric, else 0..n.
pub(crate) fn axis_positions(array: &LabeledArray, dim: &str) -> Vec<f64> {
    let n = array.dim_size(dim).unwrap_or(0);
    let coord = array.coord_f64(dim);
    if coord.len() == n && coord.iter().all(|v| v.is_finite()) {
        coord
    } else {
        (0..n).map(|i| i as f64).collect()
    }
}

/// Grid dimension pair `(y, x)` of a map array.
pub(crate) fn map_dims(array: &LabeledArray) -> Result<(&'static str, &'static str)> {
    if array.has_dim("lat") && array.has_dim("lon") {
        Ok(("lat", "lon"))
    } else if array.has_dim("rlat") && array.has_dim("rlon") {
        Ok(("rlat", "rlon"))
    } else {
        Err(PlotError::value(format!(
            "map data needs (lat, lon) or (rlat, rlon) dimensions, got {:?}",
            array.dims()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{Calendar, CfDatetime};

    #[test]
    fn noleap_axis_is_converted_once() {
        let dates = vec![CfDatetime::new(2000, 1, 1), CfDatetime::new(2001, 1, 1)];
        let a = LabeledArray::from_vec("time", vec![1.0, 2.0])
            .with_coord(
                "time",
                CoordValues::CfTime {
                    calendar: Calendar::NoLeap,
                    dates,
                },
            )
            .unwrap();
        let mut d = Diagnostics::new();
        let out = ensure_time_index(&Entry::from(a), &mut d).unwrap();
        assert_eq!(d.count(DiagnosticKind::CalendarConverted), 1);
        let pts = time_series_points(out.as_array().unwrap()).unwrap();
        assert_eq!(pts[0], (2000.0, 1.0));
    }

    #[test]
    fn time_dimension_required() {
        let mut d = Diagnostics::new();
        let a = LabeledArray::from_vec("x", vec![1.0]);
        assert!(matches!(
            ensure_time_index(&Entry::from(a), &mut d),
            Err(PlotError::Value(_))
        ));
    }

    #[test]
    fn location_text_needs_both_coords() {
        let mut d = Diagnostics::new();
        let a = LabeledArray::from_vec("time", vec![1.0])
            .with_scalar_coord("lat", vec![45.5])
            .unwrap()
            .with_scalar_coord("lon", vec![-73.25])
            .unwrap();
        assert_eq!(
            coord_text(&a, CoordParam::Location, &mut d).as_deref(),
            Some("lat=45.50, lon=-73.25")
        );
        let b = LabeledArray::from_vec("time", vec![1.0]);
        assert_eq!(coord_text(&b, CoordParam::Location, &mut d), None);
        assert!(d.has(DiagnosticKind::MissingCoordinate));
    }
}
