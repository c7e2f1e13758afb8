//! Heatmaps whose cells are split into two or four triangles, one per value
//! of a `z` dimension, all sharing a single color scale.

use crate::charts::gridmap::grid_norm;
use crate::charts::{finite_range, resolve_cmap, single_array, unnest_kw};
use crate::colormap::Divergent;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{PlotError, Result};
use crate::figure::{
    Artist, ChartKind, Colorbar, Figure, MeshArtist, MeshCell, Orientation, Ticks, Title,
};
use crate::layout::HAlign;
use crate::models::DataInput;
use crate::naming;
use crate::options::{Kwargs, UseAttrs, get_color, get_f64, get_str, resolve_plot_attrs};
use crate::style::Rgba;
use crate::terms::Locale;

#[derive(Debug, Clone, PartialEq)]
pub struct TriheatmapOptions {
    pub use_attrs: UseAttrs,
    pub fig_kw: Kwargs,
    /// `cmap`, `vmin`, `vmax` and `ec` (triangle edge color) are understood.
    pub plot_kw: Kwargs,
    pub cmap: Option<String>,
    pub divergent: Divergent,
    /// Draw the colorbar shared by every triangle.
    pub cbar: bool,
    pub locale: Locale,
}

impl Default for TriheatmapOptions {
    fn default() -> Self {
        Self {
            use_attrs: UseAttrs::new(),
            fig_kw: Kwargs::new(),
            plot_kw: Kwargs::new(),
            cmap: None,
            divergent: Divergent::Off,
            cbar: true,
            locale: Locale::En,
        }
    }
}

/// Plot a 3-D array as a heatmap of split cells.
///
/// The two remaining dimensions give the columns (first) and rows (second,
/// top to bottom). With two `z` values each cell holds an upper-left and a
/// lower-right triangle; with four, north, east, south and west triangles
/// meeting at the cell center.
pub fn triheatmap(data: impl Into<DataInput>, z: &str, opts: &TriheatmapOptions) -> Result<Figure> {
    let mut fig = Figure::new(ChartKind::Triheatmap, opts.locale);
    fig.apply_fig_kw(&opts.fig_kw);
    let mut diags = Diagnostics::new();

    let data = naming::process_keys(data.into())?;
    let plot_kw = unnest_kw(&opts.plot_kw, &data);
    let (entry, mut array) = single_array(&data, &mut diags)?;

    let layers = array
        .dim_size(z)
        .ok_or_else(|| PlotError::value(format!("dimension '{z}' not found in data")))?;
    let other: Vec<String> = array.dims().iter().filter(|d| *d != z).cloned().collect();
    if other.len() < 2 {
        return Err(PlotError::value(
            "Data must have 3 dimensions. If you only have 2 dimensions, use heatmap.",
        ));
    }
    if other.len() > 2 {
        diags.warn(
            DiagnosticKind::ExtraDimensions,
            "More than 3 dimensions in data. The first two after dim will be used as the dimensions of the heatmap.",
        );
        for d in &other[2..] {
            array = array.isel(d, 0)?;
        }
    }
    if layers != 2 && layers != 4 {
        return Err(PlotError::value(format!(
            "The length of the dimension ({z},{layers}) should be either 2 or 4. It represents the number of triangles."
        )));
    }
    let (xdim, ydim) = (other[0].as_str(), other[1].as_str());
    let array = array.transpose(&[z, xdim, ydim])?;
    let (m, n) = (array.shape()[1], array.shape()[2]);

    let use_attrs = opts
        .use_attrs
        .merge_defaults(&[("cbar_label", "long_name"), ("cbar_units", "units")]);
    let attrs = resolve_plot_attrs(&use_attrs, &entry, opts.locale, (35, 44), &mut diags);

    let cmap_name = get_str(&plot_kw, "cmap")
        .map(str::to_string)
        .or_else(|| opts.cmap.clone());
    let cmap = resolve_cmap(cmap_name.as_deref(), &array, opts.divergent.is_on(), &mut diags)?;
    let (dmin, dmax) = finite_range(array.values().iter().copied())
        .ok_or_else(|| PlotError::value("data has no finite values"))?;
    let vmin = get_f64(&plot_kw, "vmin").unwrap_or(dmin);
    let vmax = get_f64(&plot_kw, "vmax").unwrap_or(dmax);
    let norm = grid_norm(vmin, vmax, None, opts.divergent, &mut diags)?;
    let edge = get_color(&plot_kw, "ec")
        .or_else(|| get_color(&plot_kw, "edgecolor"))
        .unwrap_or(Rgba::WHITE);

    let mut cells = Vec::with_capacity(layers * m * n);
    for k in 0..layers {
        for i in 0..m {
            for j in 0..n {
                let Some(v) = array.get(&[k, i, j]).filter(|v| v.is_finite()) else {
                    continue;
                };
                cells.push(MeshCell {
                    polygon: triangle(layers, k, i as f64, (n - 1 - j) as f64),
                    color: cmap.map(&norm, v),
                });
            }
        }
    }
    fig.axes.push(Artist::Mesh(MeshArtist {
        cells,
        edge: Some(edge),
    }));

    fig.axes.xlim = Some((0.0, m as f64));
    fig.axes.ylim = Some((0.0, n as f64));
    fig.axes.xticks = Ticks::Fixed(
        array
            .coord_labels(xdim)
            .into_iter()
            .enumerate()
            .map(|(i, l)| (i as f64 + 0.5, l))
            .collect(),
    );
    fig.axes.yticks = Ticks::Fixed(
        array
            .coord_labels(ydim)
            .into_iter()
            .enumerate()
            .map(|(j, l)| ((n - 1 - j) as f64 + 0.5, l))
            .collect(),
    );
    fig.axes.xtick_rotation = 45.0;
    fig.axes.xlabel = attrs.xlabel.or_else(|| Some(xdim.to_string()));
    fig.axes.ylabel = attrs.ylabel.or_else(|| Some(ydim.to_string()));
    fig.axes.equal_aspect = true;
    fig.axes.frame = false;

    fig.axes.title = attrs.title.map(|text| Title {
        text,
        loc: HAlign::Center,
    });
    fig.suptitle = attrs.suptitle;
    if opts.cbar {
        fig.colorbar = Some(Colorbar {
            cmap,
            norm,
            label: attrs.cbar_label,
            orientation: Orientation::Vertical,
            ticks: None,
        });
    }
    fig.diagnostics.append(&mut diags);
    Ok(fig)
}

/// Triangle `k` of the unit cell with lower-left corner `(x0, y0)`.
fn triangle(layers: usize, k: usize, x0: f64, y0: f64) -> Vec<(f64, f64)> {
    let (l, r, b, t) = (x0, x0 + 1.0, y0, y0 + 1.0);
    let c = (x0 + 0.5, y0 + 0.5);
    match (layers, k) {
        (2, 0) => vec![(l, t), (r, t), (l, b)],
        (2, _) => vec![(r, t), (r, b), (l, b)],
        // north, east, south, west
        (_, 0) => vec![(l, t), (r, t), c],
        (_, 1) => vec![(r, t), (r, b), c],
        (_, 2) => vec![(r, b), (l, b), c],
        _ => vec![(l, b), (l, t), c],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LabeledArray;

    fn scores(layers: usize, models: usize, indices: usize) -> LabeledArray {
        let n = layers * models * indices;
        LabeledArray::new(
            &["season", "model", "index"],
            &[layers, models, indices],
            (0..n).map(|v| v as f64).collect(),
        )
        .unwrap()
        .named("bias")
        .with_attr("long_name", "Bias")
        .with_attr("units", "K")
        .with_coord("model", (0..models).map(|i| format!("m{i}")).collect::<Vec<_>>())
        .unwrap()
    }

    #[test]
    fn two_triangles_per_cell() {
        let fig = triheatmap(scores(2, 2, 3), "season", &TriheatmapOptions::default()).unwrap();
        let mesh = fig.meshes().next().unwrap();
        assert_eq!(mesh.cells.len(), 12);
        assert!(mesh.cells.iter().all(|c| c.polygon.len() == 3));
        assert_eq!(mesh.edge, Some(Rgba::WHITE));
        assert_eq!(fig.axes.xlim, Some((0.0, 2.0)));
        assert_eq!(fig.axes.ylim, Some((0.0, 3.0)));
        assert_eq!(fig.axes.xlabel.as_deref(), Some("model"));
        assert!(matches!(fig.axes.xticks, Ticks::Fixed(ref t) if t[1] == (1.5, "m1".to_string())));
        let cbar = fig.colorbar.unwrap();
        assert_eq!(cbar.label.as_deref(), Some("Bias (K)"));
        assert_eq!((cbar.norm.vmin(), cbar.norm.vmax()), (0.0, 11.0));
    }

    #[test]
    fn four_triangles_meet_at_the_center() {
        let fig = triheatmap(scores(4, 2, 2), "season", &TriheatmapOptions::default()).unwrap();
        let cells = &fig.meshes().next().unwrap().cells;
        assert_eq!(cells.len(), 16);
        // first cell drawn is the north triangle of the top-left cell
        assert_eq!(cells[0].polygon, vec![(0.0, 2.0), (1.0, 2.0), (0.5, 1.5)]);
        assert!(cells.iter().all(|c| c.polygon.len() == 3));
    }

    #[test]
    fn layer_count_and_rank_are_checked() {
        let err = triheatmap(scores(3, 2, 2), "season", &TriheatmapOptions::default()).unwrap_err();
        assert!(err.to_string().contains("should be either 2 or 4"));

        let flat = LabeledArray::new(&["season", "model"], &[2, 2], vec![1.0; 4]).unwrap();
        let err = triheatmap(flat, "season", &TriheatmapOptions::default()).unwrap_err();
        assert!(err.to_string().contains("use heatmap"));

        assert!(matches!(
            triheatmap(scores(2, 2, 2), "month", &TriheatmapOptions::default()),
            Err(PlotError::Value(_))
        ));
    }

    #[test]
    fn extra_dimensions_take_the_first_slice() {
        let a = LabeledArray::new(
            &["season", "model", "index", "run"],
            &[2, 2, 2, 2],
            (0..16).map(|v| v as f64).collect(),
        )
        .unwrap();
        let opts = TriheatmapOptions {
            cbar: false,
            ..Default::default()
        };
        let fig = triheatmap(a, "season", &opts).unwrap();
        assert!(fig.diagnostics.has(DiagnosticKind::ExtraDimensions));
        assert_eq!(fig.meshes().next().unwrap().cells.len(), 8);
        assert!(fig.colorbar.is_none());
    }
}
