//! Violin plots of value distributions, one violin per variable.

use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::error::{PlotError, Result};
use crate::figure::{Artist, ChartKind, Figure, Orientation, Ticks, Title, ViolinArtist};
use crate::layout::HAlign;
use crate::models::{DataInput, Entry, NamedData};
use crate::naming;
use crate::options::{Kwargs, UseAttrs, resolve_plot_attrs};
use crate::style::{self, Rgba, Style};
use crate::terms::Locale;

/// Violin fill color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ViolinColor {
    /// Any color string understood by the style module.
    Name(String),
    /// Position in the style color cycle.
    Index(usize),
    /// One color per violin, repeated when shorter.
    List(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViolinOptions {
    pub use_attrs: UseAttrs,
    pub fig_kw: Kwargs,
    pub plot_kw: Kwargs,
    pub color: Option<ViolinColor>,
    pub orient: Orientation,
    pub locale: Locale,
}

impl Default for ViolinOptions {
    fn default() -> Self {
        Self {
            use_attrs: UseAttrs::new(),
            fig_kw: Kwargs::new(),
            plot_kw: Kwargs::new(),
            color: None,
            orient: Orientation::Vertical,
            locale: Locale::En,
        }
    }
}

/// Points of each density outline.
const GRID_SIZE: usize = 100;
/// Outline extends this many bandwidths past the extreme values.
const CUT: f64 = 2.0;
/// Largest half width of a violin, in category units.
const HALF_WIDTH: f64 = 0.4;

/// Plot the distribution of every variable as a violin.
pub fn violin(data: impl Into<DataInput>, opts: &ViolinOptions) -> Result<Figure> {
    let mut fig = Figure::new(ChartKind::Violin, opts.locale);
    fig.apply_fig_kw(&opts.fig_kw);
    let mut diags = Diagnostics::new();

    let data = naming::process_keys(data.into())?;
    let columns = columns_of(&data);
    if columns.is_empty() {
        return Err(PlotError::value("no data to plot"));
    }
    let colors = violin_colors(opts.color.as_ref(), &fig.style, columns.len())?;

    let horizontal = opts.orient == Orientation::Horizontal;
    let defaults: &[(&str, &str)] = if horizontal {
        &[("title", "description"), ("xlabel", "long_name"), ("xunits", "units")]
    } else {
        &[("title", "description"), ("ylabel", "long_name"), ("yunits", "units")]
    };
    let use_attrs = opts.use_attrs.merge_defaults(defaults);
    let first = data.first()?;
    let attrs = resolve_plot_attrs(&use_attrs, first, opts.locale, (35, 48), &mut diags);

    let mut ticks = Vec::with_capacity(columns.len());
    for (i, ((label, values), color)) in columns.into_iter().zip(colors).enumerate() {
        let position = i as f64;
        ticks.push((position, label.clone()));
        let Some(artist) = violin_artist(label, position, &values, color, horizontal) else {
            continue;
        };
        fig.axes.push(Artist::Violin(artist));
    }

    if horizontal {
        fig.axes.yticks = Ticks::Fixed(ticks);
        fig.axes.xlabel = attrs.xlabel;
        fig.axes.grid = true;
    } else {
        fig.axes.xticks = Ticks::Fixed(ticks);
        fig.axes.ylabel = attrs.ylabel;
    }
    fig.axes.title = attrs.title.map(|text| Title {
        text,
        loc: HAlign::Left,
    });
    fig.suptitle = attrs.suptitle;
    fig.diagnostics.append(&mut diags);
    Ok(fig)
}

/// `(label, finite values)` of every violin, in input order.
fn columns_of(data: &NamedData) -> Vec<(String, Vec<f64>)> {
    let finite = |vs: &[f64]| vs.iter().copied().filter(|v| v.is_finite()).collect::<Vec<_>>();
    let mut out = Vec::new();
    for (key, entry) in &data.entries {
        match entry {
            Entry::Array(a) => {
                let label = if data.bare {
                    a.name().unwrap_or_default().to_string()
                } else {
                    key.clone()
                };
                out.push((label, finite(a.values())));
            }
            Entry::Table(t) => {
                for v in t.vars() {
                    let var = v.name().unwrap_or_default();
                    let label = if data.bare {
                        var.to_string()
                    } else if t.len() == 1 {
                        key.clone()
                    } else {
                        format!("{key}_{var}")
                    };
                    out.push((label, finite(v.values())));
                }
            }
        }
    }
    out
}

fn violin_colors(color: Option<&ViolinColor>, style: &Style, n: usize) -> Result<Vec<Rgba>> {
    let parse = |s: &str| {
        style::parse_color(&serde_json::Value::from(s))
            .ok_or_else(|| PlotError::value(format!("invalid color '{s}'")))
    };
    match color {
        None => Ok(vec![style.cycle_color(0); n]),
        Some(ViolinColor::Name(s)) => Ok(vec![parse(s)?; n]),
        Some(ViolinColor::Index(i)) => {
            if *i >= style.color_cycle.len() {
                return Err(PlotError::value("Index out of range of stylesheet colors"));
            }
            Ok(vec![style.cycle_color(*i); n])
        }
        Some(ViolinColor::List(list)) if !list.is_empty() => {
            let parsed = list.iter().map(|s| parse(s)).collect::<Result<Vec<_>>>()?;
            Ok((0..n).map(|i| parsed[i % parsed.len()]).collect())
        }
        Some(ViolinColor::List(_)) => Ok(vec![style.cycle_color(0); n]),
    }
}

fn violin_artist(
    label: String,
    position: f64,
    values: &[f64],
    color: Rgba,
    horizontal: bool,
) -> Option<ViolinArtist> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let (&min, &max) = (sorted.first()?, sorted.last()?);
    let curve = kde_outline(&sorted);
    Some(ViolinArtist {
        label,
        position,
        curve,
        median: quantile(&sorted, 0.5),
        q1: quantile(&sorted, 0.25),
        q3: quantile(&sorted, 0.75),
        min,
        max,
        color,
        horizontal,
    })
}

/// Linear-interpolated quantile of sorted values.
pub(crate) fn quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = q * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
        }
    }
}

/// Scott's rule: `n^(-1/5)` times the sample standard deviation.
pub(crate) fn scott_bandwidth(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if values.len() < 2 {
        return 1.0;
    }
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let bw = var.sqrt() * n.powf(-0.2);
    if bw > 0.0 { bw } else { 1.0 }
}

/// Gaussian kernel density outline scaled to [`HALF_WIDTH`].
fn kde_outline(sorted: &[f64]) -> Vec<(f64, f64)> {
    let bw = scott_bandwidth(sorted);
    let (lo, hi) = (sorted[0] - CUT * bw, sorted[sorted.len() - 1] + CUT * bw);
    let norm = 1.0 / (sorted.len() as f64 * bw * (2.0 * std::f64::consts::PI).sqrt());
    let grid = crate::colormap::linspace(lo, hi, GRID_SIZE);
    let density: Vec<f64> = grid
        .iter()
        .map(|x| {
            norm * sorted
                .iter()
                .map(|v| (-0.5 * ((x - v) / bw).powi(2)).exp())
                .sum::<f64>()
        })
        .collect();
    let peak = density.iter().copied().fold(0.0, f64::max);
    let scale = if peak > 0.0 { HALF_WIDTH / peak } else { 0.0 };
    grid.into_iter().zip(density).map(|(x, d)| (x, d * scale)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LabeledArray, LabeledTable};

    fn sample(name: &str, shift: f64) -> LabeledArray {
        LabeledArray::from_vec("realization", (0..20).map(|i| i as f64 * 0.5 + shift).collect())
            .named(name)
            .with_attr("long_name", "Precipitation")
            .with_attr("units", "mm")
    }

    #[test]
    fn one_violin_per_table_variable() {
        let t = LabeledTable::new()
            .with_var("pr_a", sample("pr_a", 0.0))
            .with_var("pr_b", sample("pr_b", 2.0));
        let fig = violin(t, &ViolinOptions::default()).unwrap();
        let v: Vec<_> = fig.violins().collect();
        assert_eq!(v.len(), 2);
        assert_eq!(v[1].label, "pr_b");
        assert_eq!(v[0].median, 4.75);
        assert!(v[0].curve.iter().all(|(_, w)| *w <= HALF_WIDTH + 1e-12));
        assert_eq!(fig.axes.ylabel.as_deref(), Some("Precipitation (mm)"));
    }

    #[test]
    fn horizontal_labels_x_axis() {
        let opts = ViolinOptions {
            orient: Orientation::Horizontal,
            ..Default::default()
        };
        let fig = violin(sample("pr", 0.0), &opts).unwrap();
        assert!(fig.axes.ylabel.is_none());
        assert!(fig.axes.xlabel.is_some());
        assert!(fig.axes.grid);
    }

    #[test]
    fn color_index_must_exist() {
        let opts = ViolinOptions {
            color: Some(ViolinColor::Index(99)),
            ..Default::default()
        };
        assert!(matches!(violin(sample("pr", 0.0), &opts), Err(PlotError::Value(_))));
    }

    #[test]
    fn quantiles_interpolate() {
        let s = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&s, 0.5), 2.5);
        assert_eq!(quantile(&s, 0.25), 1.75);
    }
}
