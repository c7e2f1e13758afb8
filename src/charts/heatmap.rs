//! Categorical heatmaps of a 2-D array, one cell per coordinate pair.

use crate::charts::gridmap::grid_norm;
use crate::charts::{finite_range, single_array, unnest_kw};
use crate::colormap::{Divergent, load_palette};
use crate::diagnostics::Diagnostics;
use crate::error::{PlotError, Result};
use crate::figure::{
    Artist, ChartKind, Colorbar, Figure, MeshArtist, MeshCell, Orientation, Ticks, Title,
};
use crate::layout::HAlign;
use crate::models::DataInput;
use crate::naming;
use crate::options::{Kwargs, UseAttrs, get_f64, get_str, resolve_plot_attrs};
use crate::terms::Locale;

#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapOptions {
    pub use_attrs: UseAttrs,
    pub fig_kw: Kwargs,
    /// `cmap`, `vmin` and `vmax` are understood.
    pub plot_kw: Kwargs,
    /// Swap rows and columns.
    pub transpose: bool,
    pub cmap: Option<String>,
    pub divergent: Divergent,
    pub locale: Locale,
}

impl Default for HeatmapOptions {
    fn default() -> Self {
        Self {
            use_attrs: UseAttrs::new(),
            fig_kw: Kwargs::new(),
            plot_kw: Kwargs::new(),
            transpose: false,
            cmap: Some("RdBu".to_string()),
            divergent: Divergent::Off,
            locale: Locale::En,
        }
    }
}

/// Plot a 2-D array as a grid of colored cells. Rows follow the first
/// dimension from top to bottom, columns the second from left to right.
pub fn heatmap(data: impl Into<DataInput>, opts: &HeatmapOptions) -> Result<Figure> {
    let mut fig = Figure::new(ChartKind::Heatmap, opts.locale);
    fig.apply_fig_kw(&opts.fig_kw);
    let mut diags = Diagnostics::new();

    let data = naming::process_keys(data.into())?;
    let plot_kw = unnest_kw(&opts.plot_kw, &data);
    let (entry, mut array) = single_array(&data, &mut diags)?;

    if array.ndim() != 2 {
        return Err(PlotError::value("Array must have exactly two dimensions"));
    }
    if opts.transpose {
        let (a, b) = (array.dims()[0].clone(), array.dims()[1].clone());
        array = array.transpose(&[b.as_str(), a.as_str()])?;
    }
    let row_dim = array.dims()[0].clone();
    let col_dim = array.dims()[1].clone();
    let nrows = array.shape()[0];
    let ncols = array.shape()[1];

    let use_attrs = opts.use_attrs.merge_defaults(&[("cbar_label", "long_name")]);
    let attrs = resolve_plot_attrs(&use_attrs, &entry, opts.locale, (35, 44), &mut diags);

    let cmap_name = get_str(&plot_kw, "cmap").or(opts.cmap.as_deref()).unwrap_or("RdBu");
    let cmap = load_palette(cmap_name)?;
    let (dmin, dmax) = finite_range(array.values().iter().copied())
        .ok_or_else(|| PlotError::value("data has no finite values"))?;
    let vmin = get_f64(&plot_kw, "vmin").unwrap_or(dmin);
    let vmax = get_f64(&plot_kw, "vmax").unwrap_or(dmax);
    let norm = grid_norm(vmin, vmax, None, opts.divergent, &mut diags)?;

    let mut cells = Vec::with_capacity(nrows * ncols);
    for j in 0..nrows {
        let y0 = (nrows - 1 - j) as f64;
        for i in 0..ncols {
            let Some(v) = array.get(&[j, i]).filter(|v| v.is_finite()) else {
                continue;
            };
            let x0 = i as f64;
            cells.push(MeshCell {
                polygon: vec![(x0, y0), (x0 + 1.0, y0), (x0 + 1.0, y0 + 1.0), (x0, y0 + 1.0)],
                color: cmap.map(&norm, v),
            });
        }
    }
    fig.axes.push(Artist::Mesh(MeshArtist { cells, edge: None }));

    fig.axes.xlim = Some((0.0, ncols as f64));
    fig.axes.ylim = Some((0.0, nrows as f64));
    fig.axes.xticks = Ticks::Fixed(
        array
            .coord_labels(&col_dim)
            .into_iter()
            .enumerate()
            .map(|(i, l)| (i as f64 + 0.5, l))
            .collect(),
    );
    fig.axes.yticks = Ticks::Fixed(
        array
            .coord_labels(&row_dim)
            .into_iter()
            .enumerate()
            .map(|(j, l)| ((nrows - 1 - j) as f64 + 0.5, l))
            .collect(),
    );
    fig.axes.xtick_rotation = 45.0;
    fig.axes.xlabel = Some(col_dim);
    fig.axes.ylabel = Some(row_dim);

    fig.axes.title = attrs.title.map(|text| Title {
        text,
        loc: HAlign::Center,
    });
    fig.suptitle = attrs.suptitle;
    fig.colorbar = Some(Colorbar {
        cmap,
        norm,
        label: attrs.cbar_label,
        orientation: Orientation::Vertical,
        ticks: None,
    });
    fig.diagnostics.append(&mut diags);
    Ok(fig)
}
