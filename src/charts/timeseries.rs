//! Line charts of one or several time series, ensembles drawn as a middle
//! line with a shaded band.

use crate::charts::{
    CoordParam, LineStyle, ShowCoords, annotate_coords, ensure_time_index, time_series_points,
};
use crate::classify::{PERCENTILES_DIM, REALIZATION_DIM, ShapeCategory, classify};
use crate::diagnostics::Diagnostics;
use crate::ensemble::{fill_between_label, sort_lines};
use crate::error::{PlotError, Result};
use crate::figure::{
    Artist, BandArtist, ChartKind, Figure, Glyph, Legend, LegendEntry, LegendMode, LineArtist,
    TextArtist, TextCoords, Title, is_legend_label,
};
use crate::layout::{HAlign, VAlign};
use crate::models::{DataInput, Entry, LabeledArray};
use crate::naming::{self, resolve_color};
use crate::options::{Kwargs, UseAttrs, per_entry_kw, resolve_plot_attrs, strip_label, with_default};
use crate::style::{Rgba, Style};
use crate::terms::{self, Locale};

/// Options of [`timeseries`].
#[derive(Debug, Clone, PartialEq)]
pub struct TimeseriesOptions {
    pub use_attrs: UseAttrs,
    pub fig_kw: Kwargs,
    /// Line options; nested by data key when the data is a mapping.
    pub plot_kw: Kwargs,
    pub legend: LegendMode,
    pub show_lat_lon: ShowCoords,
    pub locale: Locale,
}

impl Default for TimeseriesOptions {
    fn default() -> Self {
        Self {
            use_attrs: UseAttrs::new(),
            fig_kw: Kwargs::new(),
            plot_kw: Kwargs::new(),
            legend: LegendMode::Lines,
            show_lat_lon: ShowCoords::On,
            locale: Locale::En,
        }
    }
}

/// Line fraction by which `in_plot` labels extend the x axis.
const IN_PLOT_AXIS_FACTOR: f64 = 0.15;
/// Gap between a line end and its `in_plot` label, as a fraction of the range.
const IN_PLOT_LABEL_GAP: f64 = 0.02;

/// Plot time series from arrays, tables or a mapping of either.
///
/// Each entry is classified and drawn according to its ensemble
/// convention: one line per realization, a middle line plus a shaded band
/// for percentile or min/max ensembles, one line per variable for plain
/// tables, one line for plain arrays.
pub fn timeseries(data: impl Into<DataInput>, opts: &TimeseriesOptions) -> Result<Figure> {
    let mut fig = Figure::new(ChartKind::Timeseries, opts.locale);
    fig.apply_fig_kw(&opts.fig_kw);
    let mut diags = Diagnostics::new();

    let data = naming::process_keys(data.into())?;
    let plot_kw = if data.bare {
        opts.plot_kw.clone()
    } else {
        naming::process_kw_keys(&opts.plot_kw)?
    };
    let kws = per_entry_kw(&plot_kw, &data)?;

    let mut entries = Vec::with_capacity(data.len());
    for (name, entry) in &data.entries {
        entries.push((name.clone(), ensure_time_index(entry, &mut diags)?));
    }

    let use_attrs = opts.use_attrs.merge_defaults(&[
        ("title", "description"),
        ("ylabel", "long_name"),
        ("yunits", "units"),
    ]);

    let mut ctx = DrawContext {
        style: fig.style.clone(),
        legend: opts.legend,
        locale: opts.locale,
        bare: data.bare,
        cycle: 0,
        artists: Vec::new(),
    };
    for ((name, entry), kw) in entries.iter().zip(kws) {
        let kw = match resolve_color(name) {
            Some(c) => with_default(kw, "color", c.to_hex()),
            None => kw,
        };
        let kw = strip_label(kw, name, &mut diags);
        ctx.draw_entry(name, entry, &kw)?;
    }
    fig.axes.artists = ctx.artists;
    fig.axes.x_time = true;

    let (_, first) = entries
        .first()
        .ok_or_else(|| PlotError::value("no data to plot"))?;
    let attrs = resolve_plot_attrs(&use_attrs, first, opts.locale, (35, 48), &mut diags);
    fig.axes.title = attrs.title.map(|text| Title {
        text,
        loc: HAlign::Left,
    });
    fig.axes.ylabel = attrs.ylabel;
    fig.suptitle = attrs.suptitle;
    fig.axes.xlabel = Some(terms::capitalize(&terms::localized_term("time", opts.locale)));

    fig.diagnostics.append(&mut diags);
    if let Some(a) = first.first_array() {
        let a = a.clone();
        annotate_coords(&mut fig, &a, &opts.show_lat_lon, CoordParam::Location)?;
    }

    finalize_legend(&mut fig, opts.legend);
    Ok(fig)
}

struct DrawContext {
    style: Style,
    legend: LegendMode,
    locale: Locale,
    bare: bool,
    cycle: usize,
    artists: Vec<Artist>,
}

impl DrawContext {
    fn line(&mut self, label: String, points: Vec<(f64, f64)>, ls: &LineStyle) -> Rgba {
        let color = ls.resolve_color(&self.style, &mut self.cycle);
        self.artists.push(Artist::Line(LineArtist {
            label,
            points,
            color,
            width: ls.width,
            dash: ls.dash,
            marker: ls.marker,
        }));
        color
    }

    fn band(
        &mut self,
        label: Option<String>,
        lower: &LabeledArray,
        upper: &LabeledArray,
        color: Rgba,
    ) -> Result<()> {
        let lo = time_series_points(lower)?;
        let hi = time_series_points(upper)?;
        self.artists.push(Artist::Band(BandArtist {
            label,
            xs: lo.iter().map(|p| p.0).collect(),
            lower: lo.iter().map(|p| p.1).collect(),
            upper: hi.iter().map(|p| p.1).collect(),
            color: color.with_alpha(0.2),
        }));
        Ok(())
    }

    /// One line per realization. A non-empty option map means every line
    /// looks the same, so only the first one is labelled.
    fn realizations(&mut self, name: &str, array: &LabeledArray, kw: &Kwargs) -> Result<()> {
        let ls = LineStyle::from_kw(kw, &self.style);
        let labels = array.coord_labels(REALIZATION_DIM);
        let mut labelled = false;
        for (i, r) in labels.iter().enumerate() {
            let label = if !kw.is_empty() {
                if labelled || self.bare {
                    String::new()
                } else {
                    labelled = true;
                    name.to_string()
                }
            } else if self.bare {
                r.clone()
            } else {
                format!("{name}_{r}")
            };
            let member = array.isel(REALIZATION_DIM, i)?;
            self.line(label, time_series_points(&member)?, &ls);
        }
        Ok(())
    }

    /// Middle line plus shaded band from three named members.
    fn ensemble(
        &mut self,
        label: &str,
        members: &[(String, LabeledArray)],
        category: ShapeCategory,
        kw: &Kwargs,
    ) -> Result<()> {
        let names: Vec<&str> = members.iter().map(|(n, _)| n.as_str()).collect();
        let sorted = sort_lines(&names)?;
        let get = |n: &str| {
            members
                .iter()
                .find(|(m, _)| m == n)
                .map(|(_, a)| a)
                .ok_or_else(|| PlotError::value(format!("member '{n}' not found")))
        };
        let ls = LineStyle::from_kw(kw, &self.style);
        let color = self.line(label.to_string(), time_series_points(get(&sorted.middle)?)?, &ls);
        let band_label = fill_between_label(&sorted, category, self.legend, self.locale)?;
        self.band(band_label, get(&sorted.lower)?, get(&sorted.upper)?, color)
    }

    fn draw_entry(&mut self, name: &str, entry: &Entry, kw: &Kwargs) -> Result<()> {
        let category = classify(entry);
        match (category, entry) {
            (ShapeCategory::EnsRealsDa, Entry::Array(a)) => self.realizations(name, a, kw),
            (ShapeCategory::EnsRealsDs, Entry::Table(t)) => {
                if t.len() >= 2 {
                    return Err(PlotError::type_err(
                        "To plot multiple ensembles containing realizations, use arrays outside a table",
                    ));
                }
                for v in t.vars() {
                    self.realizations(name, v, kw)?;
                }
                Ok(())
            }
            (ShapeCategory::EnsPctDimDs, Entry::Table(t)) => {
                for v in t.vars() {
                    let var = v.name().unwrap_or_default();
                    let sub_name = if self.bare {
                        var.to_string()
                    } else {
                        format!("{name}_{var}")
                    };
                    let members = split_percentiles(v)?;
                    self.ensemble(&sub_name, &members, category, kw)?;
                }
                Ok(())
            }
            (ShapeCategory::EnsPctDimDa, Entry::Array(a)) => {
                let members = split_percentiles(a)?;
                self.ensemble(name, &members, category, kw)
            }
            (ShapeCategory::EnsPctVarDs | ShapeCategory::EnsStatsVarDs, Entry::Table(t)) => {
                let members: Vec<(String, LabeledArray)> = t
                    .vars()
                    .iter()
                    .map(|v| (v.name().unwrap_or_default().to_string(), v.clone()))
                    .collect();
                self.ensemble(name, &members, category, kw)
            }
            (ShapeCategory::Ds, Entry::Table(t)) => {
                let ls = LineStyle::from_kw(kw, &self.style);
                let mut labelled = false;
                for v in t.vars() {
                    let var = v.name().unwrap_or_default();
                    let label = if !kw.is_empty() {
                        if labelled {
                            String::new()
                        } else {
                            labelled = true;
                            name.to_string()
                        }
                    } else if self.bare {
                        var.to_string()
                    } else {
                        format!("{name}_{var}")
                    };
                    self.line(label, time_series_points(v)?, &ls);
                }
                Ok(())
            }
            (ShapeCategory::Da, Entry::Array(a)) => {
                let ls = LineStyle::from_kw(kw, &self.style);
                self.line(name.to_string(), time_series_points(a)?, &ls);
                Ok(())
            }
            (category, _) => Err(PlotError::value(format!(
                "Data structure not supported ({category})"
            ))),
        }
    }
}

/// Members of a `percentiles` dimension, named by their percentile.
fn split_percentiles(array: &LabeledArray) -> Result<Vec<(String, LabeledArray)>> {
    array
        .coord_labels(PERCENTILES_DIM)
        .into_iter()
        .enumerate()
        .map(|(i, label)| Ok((label, array.isel(PERCENTILES_DIM, i)?)))
        .collect()
}

fn finalize_legend(fig: &mut Figure, mode: LegendMode) {
    let mut entries = Vec::new();
    for a in &fig.axes.artists {
        match a {
            Artist::Line(l) if is_legend_label(&l.label) => entries.push(LegendEntry {
                label: l.label.clone(),
                color: l.color,
                glyph: Glyph::Line {
                    dash: l.dash,
                    width: l.width,
                },
            }),
            Artist::Band(b) => {
                if let Some(label) = b.label.as_deref().filter(|l| is_legend_label(l)) {
                    entries.push(LegendEntry {
                        label: label.to_string(),
                        color: b.color,
                        glyph: Glyph::Patch,
                    });
                }
            }
            _ => {}
        }
    }
    if entries.is_empty() {
        return;
    }
    match mode {
        LegendMode::None => {}
        LegendMode::Full | LegendMode::Lines => {
            fig.axes.legend = Some(Legend {
                entries,
                ..Legend::default()
            });
        }
        LegendMode::InPlot | LegendMode::Edge => split_legend(fig, mode == LegendMode::InPlot),
    }
}

/// Write each labelled line's name next to its last point instead of
/// drawing a legend box.
fn split_legend(fig: &mut Figure, in_plot: bool) {
    let Some(((x0, x1), _)) = fig.axes.data_bounds() else {
        return;
    };
    let span = x1 - x0;
    if in_plot {
        fig.axes.xlim = Some((x0, x1 + span * IN_PLOT_AXIS_FACTOR));
    }
    let labels: Vec<TextArtist> = fig
        .lines()
        .filter(|l| is_legend_label(&l.label))
        .filter_map(|l| {
            let (x, y) = l.points.iter().rev().find(|(_, y)| y.is_finite())?;
            let text = if in_plot {
                TextArtist::new(l.label.clone(), x + span * IN_PLOT_LABEL_GAP, *y, TextCoords::Data)
            } else {
                TextArtist::new(l.label.clone(), 1.01, *y, TextCoords::Blended)
            };
            Some(text.aligned(HAlign::Left, VAlign::Center).colored(l.color))
        })
        .collect();
    fig.axes.artists.extend(labels.into_iter().map(Artist::Text));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LabeledTable;
    use chrono::NaiveDate;

    fn series(name: &str, values: Vec<f64>) -> LabeledArray {
        let times: Vec<_> = (0..values.len())
            .map(|i| {
                NaiveDate::from_ymd_opt(2000 + i as i32, 1, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
            })
            .collect();
        LabeledArray::from_vec("time", values)
            .named(name)
            .with_coord("time", times)
            .unwrap()
    }

    #[test]
    fn in_plot_labels_follow_line_ends() {
        let data = vec![("a", series("a", vec![1.0, 2.0])), ("b", series("b", vec![3.0, 4.0]))];
        let opts = TimeseriesOptions {
            legend: LegendMode::InPlot,
            show_lat_lon: ShowCoords::Off,
            ..Default::default()
        };
        let fig = timeseries(data, &opts).unwrap();
        assert!(fig.axes.legend.is_none());
        let texts: Vec<&str> = fig.texts().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b"]);
        let (lo, hi) = fig.axes.xlim.unwrap();
        assert!(hi > 2001.0 && lo == 2000.0);
    }

    #[test]
    fn plain_table_one_line_per_variable() {
        let t = LabeledTable::new()
            .with_var("tg", series("tg", vec![1.0, 2.0]))
            .with_var("tx", series("tx", vec![2.0, 3.0]));
        let opts = TimeseriesOptions {
            show_lat_lon: ShowCoords::Off,
            ..Default::default()
        };
        let fig = timeseries(t, &opts).unwrap();
        let labels: Vec<&str> = fig.lines().map(|l| l.label.as_str()).collect();
        assert_eq!(labels, vec!["tg", "tx"]);
        assert_ne!(fig.lines().next().unwrap().color, fig.lines().nth(1).unwrap().color);
    }

    #[test]
    fn caller_label_is_stripped() {
        let opts = TimeseriesOptions {
            plot_kw: crate::options::kwargs(serde_json::json!({"label": "mine", "lw": 3})),
            show_lat_lon: ShowCoords::Off,
            ..Default::default()
        };
        let fig = timeseries(series("tas", vec![1.0, 2.0]), &opts).unwrap();
        assert!(fig.diagnostics.has(crate::diagnostics::DiagnosticKind::LabelIgnored));
        assert_eq!(fig.lines().next().unwrap().width, 3.0);
        assert!(fig.legend_labels().is_empty());
    }
}
