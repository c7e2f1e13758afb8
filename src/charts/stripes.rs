//! Climate stripes: one colored bar per year, one row per series.

use crate::charts::{finite_range, time_positions};
use crate::colormap::{self, Normalization};
use crate::diagnostics::Diagnostics;
use crate::error::{PlotError, Result};
use crate::figure::{
    Artist, ChartKind, Colorbar, Figure, LineArtist, MeshArtist, MeshCell, Orientation, TextArtist,
    TextCoords, Ticks,
};
use crate::layout::{HAlign, VAlign, wrap_text};
use crate::models::{DataInput, Entry, LabeledArray, NO_LABEL};
use crate::naming;
use crate::options::{Kwargs, get_attribute, label_with_units};
use crate::style::{LineDash, Rgba};
use crate::terms::Locale;

#[derive(Debug, Clone, PartialEq)]
pub struct StripesOptions {
    pub fig_kw: Kwargs,
    /// Palette file name; chosen from the variable group when `None`.
    pub cmap: Option<String>,
    /// Value at the center of the palette; `None` for a linear scale.
    pub cmap_center: Option<f64>,
    /// Year splitting history from projections. Rows are separated from
    /// this year on and labelled with their key.
    pub divide: Option<i32>,
    pub colorbar: bool,
    pub locale: Locale,
}

impl Default for StripesOptions {
    fn default() -> Self {
        Self {
            fig_kw: Kwargs::new(),
            cmap: None,
            cmap_center: Some(0.0),
            divide: None,
            colorbar: true,
            locale: Locale::En,
        }
    }
}

const SEPARATOR_WIDTH: f64 = 2.0;
const LABEL_SCALE: f64 = 14.0 / 12.0;

/// Draw each series as a row of yearly stripes sharing one color scale.
/// The first entry is the bottom row.
pub fn stripes(data: impl Into<DataInput>, opts: &StripesOptions) -> Result<Figure> {
    let mut fig = Figure::new(ChartKind::Stripes, opts.locale);
    fig.apply_fig_kw(&opts.fig_kw);
    let mut diags = Diagnostics::new();

    let data = naming::process_keys(data.into())?;
    let mut rows: Vec<(String, LabeledArray)> = Vec::with_capacity(data.len());
    for (key, entry) in &data.entries {
        let array = match entry {
            Entry::Array(a) => a.clone(),
            Entry::Table(t) => t
                .first_var()
                .cloned()
                .ok_or_else(|| PlotError::value(format!("dataset '{key}' has no variables")))?,
        };
        rows.push((key.clone(), array.squeeze()));
    }
    let (_, first) = rows
        .first()
        .ok_or_else(|| PlotError::value("no data to plot"))?;

    let years: Vec<f64> = time_positions(first)?.into_iter().map(f64::floor).collect();
    let dt = constant_step(&years)?;
    let (ymin, ymax) = finite_range(years.iter().copied())
        .ok_or_else(|| PlotError::value("no time steps to plot"))?;
    let (x0, x1) = (ymin - 0.5 * dt, ymax + 0.5 * dt);

    let (vmin, vmax) = finite_range(rows.iter().flat_map(|(_, a)| a.values().iter().copied()))
        .ok_or_else(|| PlotError::value("data has no finite values"))?;
    let cmap = match &opts.cmap {
        Some(name) => colormap::load_palette(name)?,
        None => {
            let group = colormap::var_group_of(first, &mut diags);
            colormap::build_colormap(Some(&group), true, None)?
        }
    };
    let norm = match opts.cmap_center {
        Some(center) if vmin < center && center < vmax => Normalization::TwoSlope { vmin, center, vmax },
        _ => Normalization::Linear { vmin, vmax },
    };

    let n = rows.len() as f64;
    let divide_x = opts.divide.map(|d| d as f64 - 0.5 * dt);
    let mut cells = Vec::new();
    let mut decorations = Vec::new();
    for (k, (key, array)) in rows.iter().enumerate() {
        let (y0, y1) = (k as f64 / n, (k + 1) as f64 / n);
        let xs: Vec<f64> = time_positions(array)?.into_iter().map(f64::floor).collect();
        for (x, v) in xs.iter().zip(array.values()) {
            if !v.is_finite() {
                continue;
            }
            let (a, b) = (x - 0.5 * dt, x + 0.5 * dt);
            cells.push(MeshCell {
                polygon: vec![(a, y0), (b, y0), (b, y1), (a, y1)],
                color: cmap.map(&norm, *v),
            });
        }
        if k > 0 {
            decorations.push(Artist::Line(LineArtist {
                label: String::new(),
                points: vec![(divide_x.unwrap_or(x0), y0), (x1, y0)],
                color: Rgba::WHITE,
                width: SEPARATOR_WIDTH,
                dash: LineDash::Solid,
                marker: None,
            }));
        }
        if opts.divide.is_some() && key != NO_LABEL {
            let mut label = TextArtist::new(key.clone(), 0.99, (y0 + y1) / 2.0, TextCoords::Blended)
                .aligned(HAlign::Right, VAlign::Center)
                .colored(Rgba::WHITE);
            label.size_scale = LABEL_SCALE;
            decorations.push(Artist::Text(label));
        }
    }
    fig.axes.push(Artist::Mesh(MeshArtist { cells, edge: None }));
    fig.axes.artists.extend(decorations);

    fig.axes.xlim = Some((x0, x1));
    fig.axes.ylim = Some((0.0, 1.0));
    fig.axes.yticks = Ticks::Hidden;
    fig.axes.frame = false;

    if opts.colorbar {
        let long_name = get_attribute("long_name", &Entry::Array(first.clone()), opts.locale, &mut diags);
        let label = if long_name.is_empty() {
            None
        } else {
            let units = first.attr_text("units").unwrap_or_default();
            Some(wrap_text(&label_with_units(&long_name, &units), 18, 40, &mut diags))
        };
        fig.colorbar = Some(Colorbar {
            ticks: Some(colorbar_ticks(vmin, vmax)),
            cmap,
            norm,
            label,
            orientation: Orientation::Horizontal,
        });
    }
    fig.diagnostics.append(&mut diags);
    Ok(fig)
}

/// The step between consecutive years; it must not vary.
fn constant_step(years: &[f64]) -> Result<f64> {
    let steps: Vec<f64> = years.windows(2).map(|w| w[1] - w[0]).collect();
    match steps.first() {
        None => Ok(1.0),
        Some(first) if steps.iter().all(|s| s == first) => Ok(*first),
        Some(_) => Err(PlotError::value(
            "Time delta between each array element must be constant",
        )),
    }
}

/// Every second integer from `floor(vmin)` up to, not including,
/// `ceil(vmax)`.
fn colorbar_ticks(vmin: f64, vmax: f64) -> Vec<f64> {
    let mut out = Vec::new();
    let mut t = vmin.floor();
    while t < vmax.ceil() {
        out.push(t);
        t += 2.0;
    }
    out
}
