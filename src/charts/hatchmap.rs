//! Hatched regions on a map: one hatch pattern per mask, or one per level
//! bin of a single field.

use crate::charts::{CoordParam, ShowCoords, annotate_coords, grid_cells, levels_from_kw, map_dims, setup_map_axes};
use crate::colormap::{Levels, build_norm};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{PlotError, Result};
use crate::figure::{
    Artist, ChartKind, Figure, Glyph, HatchArtist, Legend, LegendEntry, LegendPlacement, Title,
};
use crate::layout::{HAlign, Loc};
use crate::models::{DataInput, Entry, LabeledArray, NO_LABEL, NamedData};
use crate::naming;
use crate::options::{Kwargs, UseAttrs, get_color, resolve_plot_attrs};
use crate::projection::{Projection, infer_transform, take_extent};
use crate::style::Rgba;
use crate::terms::Locale;

/// Patterns handed out in order to entries without an explicit one.
pub const DEFAULT_HATCHES: [&str; 20] = [
    "/", "\\", "|", "-", "+", "x", "o", "O", ".", "*", "//", "\\\\", "||", "--", "++", "xx", "oo",
    "OO", "..", "**",
];

#[derive(Debug, Clone, PartialEq)]
pub struct HatchmapOptions {
    pub use_attrs: UseAttrs,
    pub fig_kw: Kwargs,
    /// Per-entry options (`hatches`, `color`, `levels`), nested by key when
    /// there are several entries. `xlim`/`ylim` set the map extent.
    pub plot_kw: Kwargs,
    pub projection: Projection,
    pub transform: Option<Projection>,
    pub show_time: ShowCoords,
    pub frame: bool,
    pub locale: Locale,
}

impl Default for HatchmapOptions {
    fn default() -> Self {
        Self {
            use_attrs: UseAttrs::new(),
            fig_kw: Kwargs::new(),
            plot_kw: Kwargs::new(),
            projection: Projection::default(),
            transform: None,
            show_time: ShowCoords::Off,
            frame: false,
            locale: Locale::En,
        }
    }
}

/// Hatch the cells of each mask (finite, non-zero values) with its own
/// pattern, or with `levels` on a single field, hatch each level bin.
pub fn hatchmap(data: impl Into<DataInput>, opts: &HatchmapOptions) -> Result<Figure> {
    let mut fig = Figure::new(ChartKind::Hatchmap, opts.locale);
    fig.apply_fig_kw(&opts.fig_kw);
    let mut diags = Diagnostics::new();

    let data = naming::process_keys(data.into())?;
    let has_table = data.entries.iter().any(|(_, e)| e.is_table());
    let entries = hatch_entries(&data, &mut diags)?;
    let first_entry = data.first()?;
    let mut plot_kw = if data.bare {
        opts.plot_kw.clone()
    } else {
        naming::process_kw_keys(&opts.plot_kw)?
    };
    let extent_source = take_extent(&mut plot_kw, &mut diags);
    let kws: Vec<Kwargs> = entries
        .iter()
        .map(|(name, _)| match plot_kw.get(name) {
            Some(serde_json::Value::Object(m)) => m.clone(),
            _ if entries.len() == 1 => plot_kw.clone(),
            _ => Kwargs::new(),
        })
        .collect();

    let transform = match opts.transform {
        Some(t) => Some(t),
        None => infer_transform(first_entry, &mut diags),
    };
    let source = transform.unwrap_or(Projection::PlateCarree);

    let mut legend = Vec::new();
    let levels_requested = kws.iter().any(|kw| kw.contains_key("levels"));
    if levels_requested {
        if entries.len() > 1 {
            return Err(PlotError::type_err(
                "To plot levels only one labeled array or table accepted",
            ));
        }
        let (_, array) = &entries[0];
        let kw = &kws[0];
        let levels = levels_from_kw(kw)
            .ok_or_else(|| PlotError::value("levels must be a number or a list of numbers"))?;
        let color = get_color(kw, "color").unwrap_or(Rgba::BLACK);
        for h in level_hatches(array, &levels, color, &source, &opts.projection, &mut diags)? {
            legend.push(LegendEntry {
                label: h.label.clone(),
                color,
                glyph: Glyph::Hatch(h.pattern.clone()),
            });
            fig.axes.push(Artist::Hatch(h));
        }
    } else {
        for (n, ((name, array), kw)) in entries.iter().zip(&kws).enumerate() {
            let pattern = hatch_pattern(kw, n, &mut diags);
            let color = get_color(kw, "color").unwrap_or(Rgba::BLACK);
            let (ydim, xdim) = map_dims(array)?;
            let cells = grid_cells(array, ydim, xdim, &source, &opts.projection, |v| {
                (v != 0.0).then_some(color)
            })?;
            if name != NO_LABEL {
                legend.push(LegendEntry {
                    label: name.clone(),
                    color,
                    glyph: Glyph::Hatch(pattern.clone()),
                });
            }
            fig.axes.push(Artist::Hatch(HatchArtist {
                label: name.clone(),
                cells: cells.into_iter().map(|c| c.polygon).collect(),
                pattern,
                color,
            }));
        }
    }

    let extent = if transform.is_some() { extent_source } else { None };
    setup_map_axes(&mut fig, &source, &opts.projection, extent, opts.frame);

    let defaults: &[(&str, &str)] = if has_table { &[("title", "description")] } else { &[] };
    let use_attrs = opts.use_attrs.merge_defaults(defaults);
    let attrs = resolve_plot_attrs(&use_attrs, first_entry, opts.locale, (35, 60), &mut diags);
    fig.axes.title = attrs.title.map(|text| Title {
        text,
        loc: HAlign::Center,
    });
    fig.suptitle = attrs.suptitle;
    if !legend.is_empty() {
        fig.axes.legend = Some(Legend {
            title: None,
            entries: legend,
            placement: LegendPlacement::Inside(Loc::from("lower right").resolve()?),
        });
    }

    fig.diagnostics.append(&mut diags);
    let first_array = entries[0].1.clone();
    annotate_coords(&mut fig, &first_array, &opts.show_time, CoordParam::Time)?;
    Ok(fig)
}

/// `(name, array)` of every hatched field. A bare table contributes every
/// variable; a table under a key contributes its first variable.
fn hatch_entries(data: &NamedData, diags: &mut Diagnostics) -> Result<Vec<(String, LabeledArray)>> {
    let mut out = Vec::new();
    for (key, entry) in &data.entries {
        match entry {
            Entry::Array(a) => {
                let name = if data.bare {
                    a.name().unwrap_or(NO_LABEL).to_string()
                } else {
                    key.clone()
                };
                out.push((name, a.squeeze()));
            }
            Entry::Table(t) if data.bare => {
                for v in t.vars() {
                    out.push((v.name().unwrap_or(NO_LABEL).to_string(), v.squeeze()));
                }
            }
            Entry::Table(t) => {
                if t.len() > 1 {
                    diags.warn(
                        DiagnosticKind::FirstVariableOnly,
                        "Only first variable of table is plotted.",
                    );
                }
                let v = t
                    .first_var()
                    .ok_or_else(|| PlotError::value(format!("dataset '{key}' has no variables")))?;
                out.push((key.clone(), v.squeeze()));
            }
        }
    }
    if out.is_empty() {
        return Err(PlotError::value("no data to plot"));
    }
    Ok(out)
}

/// Pattern of entry `n`: the `hatches` option (a lone string is accepted
/// with a diagnostic), else the `n`-th default.
fn hatch_pattern(kw: &Kwargs, n: usize, diags: &mut Diagnostics) -> String {
    match kw.get("hatches") {
        Some(serde_json::Value::String(s)) => {
            diags.warn(
                DiagnosticKind::HatchesWrapped,
                "Hatches argument must be of type 'list'. Wrapping string argument as list.",
            );
            s.clone()
        }
        Some(serde_json::Value::Array(items)) if !items.is_empty() => items
            .first()
            .and_then(|v| v.as_str())
            .map(String::from)
            .unwrap_or_else(|| DEFAULT_HATCHES[n % DEFAULT_HATCHES.len()].to_string()),
        _ => DEFAULT_HATCHES[n % DEFAULT_HATCHES.len()].to_string(),
    }
}

/// One hatch artist per level bin, with consecutive default patterns.
fn level_hatches(
    array: &LabeledArray,
    levels: &Levels,
    color: Rgba,
    source: &Projection,
    target: &Projection,
    diags: &mut Diagnostics,
) -> Result<Vec<HatchArtist>> {
    let nan = array.values().iter().filter(|v| !v.is_finite()).count();
    if nan > 0 {
        diags.warn(
            DiagnosticKind::DroppedNan,
            format!("{nan} nan values were dropped when plotting the pattern values"),
        );
    }
    let (vmin, vmax) = match (array.min(), array.max()) {
        (Some(lo), Some(hi)) => (lo, hi),
        _ => return Err(PlotError::value("data has no finite values")),
    };
    let bounds = match levels {
        Levels::Boundaries(b) => b.clone(),
        Levels::Count(_) => build_norm(vmin, vmax, Some(levels), Default::default(), true, diags)?
            .into_norm()
            .boundaries()
            .map(<[f64]>::to_vec)
            .unwrap_or_default(),
    };
    let (ydim, xdim) = map_dims(array)?;
    let mut out = Vec::new();
    for (i, w) in bounds.windows(2).enumerate() {
        let (lo, hi) = (w[0], w[1]);
        let last = i + 2 == bounds.len();
        let cells = grid_cells(array, ydim, xdim, source, target, |v| {
            (v >= lo && (v < hi || (last && v <= hi))).then_some(color)
        })?;
        out.push(HatchArtist {
            label: format!("{lo:2.1}-{hi:2.1}"),
            cells: cells.into_iter().map(|c| c.polygon).collect(),
            pattern: DEFAULT_HATCHES[i % DEFAULT_HATCHES.len()].to_string(),
            color,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LabeledTable;
    use serde_json::json;

    fn mask(name: &str, values: Vec<f64>) -> LabeledArray {
        LabeledArray::new(&["lat", "lon"], &[2, 2], values)
            .unwrap()
            .named(name)
            .with_coord("lat", vec![45.0, 46.0])
            .unwrap()
            .with_coord("lon", vec![-74.0, -73.0])
            .unwrap()
    }

    #[test]
    fn patterns_follow_defaults() {
        let data = vec![
            ("agree", mask("agree", vec![1.0, 0.0, 1.0, f64::NAN])),
            ("signif", mask("signif", vec![1.0, 1.0, 1.0, 1.0])),
        ];
        let fig = hatchmap(data, &HatchmapOptions::default()).unwrap();
        let h: Vec<_> = fig.hatches().collect();
        assert_eq!(h[0].pattern, "/");
        assert_eq!(h[0].cells.len(), 2);
        assert_eq!(h[1].pattern, "\\");
        assert_eq!(h[1].cells.len(), 4);
        assert_eq!(fig.legend_labels(), vec!["agree", "signif"]);
    }

    #[test]
    fn string_hatches_are_wrapped() {
        let opts = HatchmapOptions {
            plot_kw: crate::options::kwargs(json!({"hatches": "xx"})),
            ..Default::default()
        };
        let fig = hatchmap(mask("m", vec![1.0; 4]), &opts).unwrap();
        assert_eq!(fig.hatches().next().unwrap().pattern, "xx");
        assert!(fig.diagnostics.has(DiagnosticKind::HatchesWrapped));
    }

    #[test]
    fn levels_need_single_entry() {
        let opts = HatchmapOptions {
            plot_kw: crate::options::kwargs(json!({"a": {"levels": 3}, "b": {}})),
            ..Default::default()
        };
        let data = vec![("a", mask("a", vec![1.0; 4])), ("b", mask("b", vec![1.0; 4]))];
        assert!(matches!(hatchmap(data, &opts), Err(PlotError::Type(_))));
    }

    #[test]
    fn levels_bin_one_field() {
        let opts = HatchmapOptions {
            plot_kw: crate::options::kwargs(json!({"levels": [0.0, 2.0, 4.0]})),
            ..Default::default()
        };
        let fig = hatchmap(mask("p", vec![1.0, 3.0, 4.0, f64::NAN]), &opts).unwrap();
        let h: Vec<_> = fig.hatches().collect();
        assert_eq!(h.len(), 2);
        assert_eq!(h[0].cells.len(), 1);
        assert_eq!(h[1].cells.len(), 2);
        assert!(fig.diagnostics.has(DiagnosticKind::DroppedNan));
    }

    #[test]
    fn keyed_table_uses_first_variable() {
        let t = LabeledTable::new()
            .with_var("a", mask("a", vec![1.0; 4]))
            .with_var("b", mask("b", vec![1.0; 4]))
            .with_attr("description", "Robust signal");
        let fig = hatchmap(vec![("ens", t)], &HatchmapOptions::default()).unwrap();
        assert!(fig.diagnostics.has(DiagnosticKind::FirstVariableOnly));
        assert_eq!(fig.axes.title.as_ref().unwrap().text, "Robust signal");
    }
}
