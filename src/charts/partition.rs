//! Uncertainty partition: stacked shares of each uncertainty source over
//! time, summing to 100 %.

use crate::charts::{single_array, time_positions};
use crate::diagnostics::Diagnostics;
use crate::error::{PlotError, Result};
use crate::figure::{
    Artist, BandArtist, ChartKind, Figure, Glyph, Legend, LegendEntry, LegendPlacement, LineArtist,
    Ticks, Title,
};
use crate::layout::HAlign;
use crate::models::{AttrValue, DataInput};
use crate::naming;
use crate::options::{Kwargs, get_attribute, get_color, get_f64, get_str, label_with_units};
use crate::style::{LineDash, Rgba};
use crate::terms::{self, Locale};

/// Dimension listing the uncertainty sources.
pub const UNCERTAINTY_DIM: &str = "uncertainty";

#[derive(Debug, Clone, PartialEq)]
pub struct PartitionOptions {
    pub fig_kw: Kwargs,
    /// Band options, either flat or nested by uncertainty source.
    pub fill_kw: Kwargs,
    /// Separator line options.
    pub line_kw: Kwargs,
    /// Plot lead time from this year instead of calendar years.
    pub start_year: Option<i32>,
    /// Append the number of members of each source to its label.
    pub show_num: bool,
    pub locale: Locale,
}

impl Default for PartitionOptions {
    fn default() -> Self {
        Self {
            fig_kw: Kwargs::new(),
            fill_kw: Kwargs::new(),
            line_kw: Kwargs::new(),
            start_year: None,
            show_num: true,
            locale: Locale::En,
        }
    }
}

/// Stack the fraction of total variance of each uncertainty source; the
/// space left up to 100 % is internal variability.
pub fn partition(data: impl Into<DataInput>, opts: &PartitionOptions) -> Result<Figure> {
    let mut fig = Figure::new(ChartKind::Partition, opts.locale);
    fig.apply_fig_kw(&opts.fig_kw);
    let mut diags = Diagnostics::new();

    let data = naming::process_keys(data.into())?;
    let (entry, array) = single_array(&data, &mut diags)?;

    let units = array.attr_text("units").unwrap_or_default();
    if units != "%" {
        return Err(PlotError::value(
            "The units are not %. Use `fraction=True` in the xclim function call.",
        ));
    }
    if !array.has_dim(UNCERTAINTY_DIM) {
        return Err(PlotError::value(format!(
            "data must have an '{UNCERTAINTY_DIM}' dimension (dimensions: {:?})",
            array.dims()
        )));
    }

    let years = time_positions(&array)?;
    let (array, xs) = match opts.start_year {
        Some(start) => {
            let keep: Vec<usize> = (0..years.len()).filter(|i| years[*i] >= start as f64).collect();
            let xs = keep.iter().map(|i| years[*i] - start as f64).collect();
            (array.take("time", &keep)?, xs)
        }
        None => (array, years),
    };
    if xs.is_empty() {
        return Err(PlotError::value("no time steps left to plot"));
    }

    let series = |label: &str| -> Result<Vec<f64>> {
        let s = array.sel(UNCERTAINTY_DIM, label)?;
        if s.ndim() != 1 || s.size() != xs.len() {
            return Err(PlotError::value("partition data must only vary along 'time'"));
        }
        Ok(s.values().to_vec())
    };

    let mut legend = Vec::new();
    let mut separators = Vec::new();
    let mut past = vec![0.0; xs.len()];
    let mut cycle = 0usize;
    for u in array.coord_labels(UNCERTAINTY_DIM) {
        if u == "total" || u == "variability" {
            continue;
        }
        let present: Vec<f64> = past.iter().zip(series(&u)?).map(|(a, b)| a + b).collect();
        let num = array.attr(&u).and_then(AttrValue::as_list).map_or(0, <[String]>::len);
        let label = if opts.show_num && num > 0 {
            format!("{u} ({num})")
        } else {
            u.clone()
        };
        let color = band_color(&opts.fill_kw, &u, &fig, &mut cycle);
        legend.push(LegendEntry {
            label: label.clone(),
            color,
            glyph: Glyph::Patch,
        });
        fig.axes.push(Artist::Band(BandArtist {
            label: Some(label),
            xs: xs.clone(),
            lower: past,
            upper: present.clone(),
            color,
        }));
        separators.push(present.clone());
        past = present;
    }

    let variability = terms::localized_term("variability", opts.locale);
    let color = band_color(&opts.fill_kw, "variability", &fig, &mut cycle);
    legend.push(LegendEntry {
        label: variability.clone(),
        color,
        glyph: Glyph::Patch,
    });
    fig.axes.push(Artist::Band(BandArtist {
        label: Some(variability),
        xs: xs.clone(),
        lower: past,
        upper: vec![100.0; xs.len()],
        color,
    }));

    let line_color = get_color(&opts.line_kw, "color").unwrap_or(Rgba::BLACK);
    let line_width = get_f64(&opts.line_kw, "lw")
        .or_else(|| get_f64(&opts.line_kw, "linewidth"))
        .unwrap_or(2.0);
    let dash = get_str(&opts.line_kw, "ls")
        .and_then(LineDash::from_code)
        .unwrap_or(LineDash::Solid);
    for ys in separators {
        fig.axes.push(Artist::Line(LineArtist {
            label: String::new(),
            points: xs.iter().copied().zip(ys).collect(),
            color: line_color,
            width: line_width,
            dash,
            marker: None,
        }));
    }

    let long_name = get_attribute("long_name", &entry, opts.locale, &mut diags);
    fig.axes.ylabel = Some(label_with_units(&long_name, &units));
    fig.axes.xlabel = Some(match opts.start_year {
        Some(start) => terms::capitalize(&terms::fill(
            &terms::localized_term("lead time (years from {})", opts.locale),
            &[&start.to_string()],
        )),
        None => terms::capitalize(&terms::localized_term("time", opts.locale)),
    });
    if let Some(description) = array.attr_text("description") {
        fig.axes.title = Some(Title {
            text: description,
            loc: HAlign::Left,
        });
    }

    let (x0, x1) = (xs[0], xs[xs.len() - 1]);
    fig.axes.xlim = Some((x0, x1));
    fig.axes.ylim = Some((0.0, 100.0));
    fig.axes.xticks = Ticks::Fixed(every(x0, x1, 20.0));
    fig.axes.yticks = Ticks::Fixed(every(0.0, 100.0, 10.0));
    fig.axes.legend = Some(Legend {
        title: None,
        entries: legend,
        placement: LegendPlacement::Right,
    });
    fig.diagnostics.append(&mut diags);
    Ok(fig)
}

/// Color of a band: `fill_kw[source].color`, else a flat `fill_kw.color`,
/// else the next color of the cycle.
fn band_color(fill_kw: &Kwargs, source: &str, fig: &Figure, cycle: &mut usize) -> Rgba {
    let nested = match fill_kw.get(source) {
        Some(serde_json::Value::Object(m)) => get_color(m, "color"),
        _ => None,
    };
    nested.or_else(|| get_color(fill_kw, "color")).unwrap_or_else(|| {
        *cycle += 1;
        fig.style.cycle_color(*cycle - 1)
    })
}

/// Ticks at the multiples of `step` within `[lo, hi]`.
fn every(lo: f64, hi: f64, step: f64) -> Vec<(f64, String)> {
    let mut out = Vec::new();
    let mut t = (lo / step).ceil() * step;
    while t <= hi + 1e-9 {
        out.push((t, format!("{t:.0}")));
        t += step;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LabeledArray;

    fn fractions(units: &str) -> LabeledArray {
        // time x uncertainty: model, scenario, variability, total
        let values = vec![
            20.0, 10.0, 70.0, 100.0, //
            30.0, 20.0, 50.0, 100.0, //
            40.0, 30.0, 30.0, 100.0,
        ];
        LabeledArray::new(&["time", UNCERTAINTY_DIM], &[3, 4], values)
            .unwrap()
            .named("tas")
            .with_attr("units", units)
            .with_attr("long_name", "Fraction of total variance")
            .with_attr("model", vec!["m1", "m2", "m3"])
            .with_coord("time", vec![2000.0, 2020.0, 2040.0])
            .unwrap()
            .with_coord(UNCERTAINTY_DIM, vec!["model", "scenario", "variability", "total"])
            .unwrap()
    }

    #[test]
    fn bands_stack_to_one_hundred() {
        let fig = partition(fractions("%"), &PartitionOptions::default()).unwrap();
        let bands: Vec<_> = fig.bands().collect();
        assert_eq!(bands.len(), 3);
        assert_eq!(bands[0].label.as_deref(), Some("model (3)"));
        assert_eq!(bands[1].label.as_deref(), Some("scenario"));
        assert_eq!(bands[1].upper, vec![30.0, 50.0, 70.0]);
        assert_eq!(bands[2].upper, vec![100.0; 3]);
        assert_eq!(fig.lines().count(), 2);
        assert_eq!(fig.axes.ylabel.as_deref(), Some("Fraction of total variance (%)"));
    }

    #[test]
    fn start_year_gives_lead_time() {
        let opts = PartitionOptions {
            start_year: Some(2020),
            ..Default::default()
        };
        let fig = partition(fractions("%"), &opts).unwrap();
        assert_eq!(fig.bands().next().unwrap().xs, vec![0.0, 20.0]);
        assert_eq!(fig.axes.xlabel.as_deref(), Some("Lead time (years from 2020)"));
    }

    #[test]
    fn units_must_be_percent() {
        assert!(matches!(
            partition(fractions("1"), &PartitionOptions::default()),
            Err(PlotError::Value(m)) if m.starts_with("The units are not %")
        ));
    }
}
