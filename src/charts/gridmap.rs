//! Colored raster maps of a 2-D field.

use crate::charts::{
    CoordParam, ShowCoords, annotate_coords, finite_range, grid_cells, levels_from_kw, map_dims,
    resolve_cmap, setup_map_axes, single_array, unnest_kw,
};
use crate::colormap::{Divergent, Levels, Normalization, build_norm};
use crate::diagnostics::Diagnostics;
use crate::error::{PlotError, Result};
use crate::figure::{Artist, ChartKind, Colorbar, Figure, MeshArtist, Orientation, Title};
use crate::layout::HAlign;
use crate::models::DataInput;
use crate::naming;
use crate::options::{Kwargs, UseAttrs, get_f64, get_str, resolve_plot_attrs};
use crate::projection::{Projection, infer_transform, take_extent};
use crate::terms::Locale;

#[derive(Debug, Clone, PartialEq)]
pub struct GridmapOptions {
    pub use_attrs: UseAttrs,
    pub fig_kw: Kwargs,
    /// `cmap`, `levels`, `vmin`, `vmax`, `xlim`/`ylim` (map extent in
    /// transform coordinates) are understood.
    pub plot_kw: Kwargs,
    /// Plane the map is drawn in.
    pub projection: Projection,
    /// Coordinate system of the data; inferred from the grid when `None`.
    pub transform: Option<Projection>,
    /// Draw discrete filled levels instead of a continuous mesh.
    pub contourf: bool,
    pub cmap: Option<String>,
    pub levels: Option<Levels>,
    pub divergent: Divergent,
    pub show_time: ShowCoords,
    pub frame: bool,
    pub locale: Locale,
}

impl Default for GridmapOptions {
    fn default() -> Self {
        Self {
            use_attrs: UseAttrs::new(),
            fig_kw: Kwargs::new(),
            plot_kw: Kwargs::new(),
            projection: Projection::default(),
            transform: None,
            contourf: false,
            cmap: None,
            levels: None,
            divergent: Divergent::Off,
            show_time: ShowCoords::Off,
            frame: false,
            locale: Locale::En,
        }
    }
}

/// Number of filled levels when `contourf` is on and none were given.
const DEFAULT_CONTOUR_LEVELS: usize = 10;

/// Plot a gridded field on a map with a vertical colorbar.
pub fn gridmap(data: impl Into<DataInput>, opts: &GridmapOptions) -> Result<Figure> {
    let mut fig = Figure::new(ChartKind::Gridmap, opts.locale);
    fig.apply_fig_kw(&opts.fig_kw);
    let mut diags = Diagnostics::new();

    let data = naming::process_keys(data.into())?;
    let mut plot_kw = unnest_kw(&opts.plot_kw, &data);
    let (entry, array) = single_array(&data, &mut diags)?;

    let transform = match opts.transform {
        Some(t) => Some(t),
        None => infer_transform(&entry, &mut diags),
    };
    let source = transform.unwrap_or(Projection::PlateCarree);

    let use_attrs = opts.use_attrs.merge_defaults(&[
        ("cbar_label", "long_name"),
        ("cbar_units", "units"),
        ("title", "description"),
    ]);
    let attrs = resolve_plot_attrs(&use_attrs, &entry, opts.locale, (18, 30), &mut diags);

    let cmap_name = opts.cmap.clone().or_else(|| get_str(&plot_kw, "cmap").map(String::from));
    let cmap = resolve_cmap(cmap_name.as_deref(), &array, opts.divergent.is_on(), &mut diags)?;

    let (dmin, dmax) = finite_range(array.values().iter().copied())
        .ok_or_else(|| PlotError::value("data has no finite values"))?;
    let vmin = get_f64(&plot_kw, "vmin").unwrap_or(dmin);
    let vmax = get_f64(&plot_kw, "vmax").unwrap_or(dmax);

    let levels = opts.levels.clone().or_else(|| levels_from_kw(&plot_kw)).or(if opts.contourf {
        Some(Levels::Count(DEFAULT_CONTOUR_LEVELS))
    } else {
        None
    });
    let norm = grid_norm(vmin, vmax, levels.as_ref(), opts.divergent, &mut diags)?;

    let (ydim, xdim) = map_dims(&array)?;
    let cells = grid_cells(&array, ydim, xdim, &source, &opts.projection, |v| {
        Some(cmap.map(&norm, v))
    })?;
    fig.axes.push(Artist::Mesh(MeshArtist { cells, edge: None }));

    let extent = if transform.is_some() {
        take_extent(&mut plot_kw, &mut diags)
    } else {
        None
    };
    setup_map_axes(&mut fig, &source, &opts.projection, extent, opts.frame);

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

/// Normalization of a map. Levels or a center go through [`build_norm`]
/// and its rounded bounds; otherwise linear on the raw data range.
pub(crate) fn grid_norm(
    vmin: f64,
    vmax: f64,
    levels: Option<&Levels>,
    divergent: Divergent,
    diags: &mut Diagnostics,
) -> Result<Normalization> {
    if levels.is_none() && !divergent.is_on() {
        return Ok(Normalization::Linear { vmin, vmax });
    }
    let linspace_out = levels.is_some();
    Ok(build_norm(vmin, vmax, levels, divergent, linspace_out, diags)?.into_norm())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;
    use crate::models::LabeledArray;
    use serde_json::json;

    fn field() -> LabeledArray {
        LabeledArray::new(&["lat", "lon"], &[2, 3], vec![1.0, 2.0, 3.0, 4.0, f64::NAN, 6.0])
            .unwrap()
            .named("tas")
            .with_attr("long_name", "Mean temperature")
            .with_attr("units", "K")
            .with_coord("lat", vec![45.0, 46.0])
            .unwrap()
            .with_coord("lon", vec![-75.0, -74.0, -73.0])
            .unwrap()
    }

    #[test]
    fn one_cell_per_finite_value() {
        let fig = gridmap(field(), &GridmapOptions::default()).unwrap();
        let mesh = fig.meshes().next().unwrap();
        assert_eq!(mesh.cells.len(), 5);
        let cbar = fig.colorbar.as_ref().unwrap();
        assert_eq!(cbar.label.as_deref(), Some("Mean temperature (K)"));
        assert_eq!(cbar.orientation, Orientation::Vertical);
        assert!(fig.axes.equal_aspect);
        assert!(!fig.axes.frame);
    }

    #[test]
    fn levels_give_boundary_norm() {
        let opts = GridmapOptions {
            levels: Some(Levels::Count(4)),
            ..Default::default()
        };
        let fig = gridmap(field(), &opts).unwrap();
        let cbar = fig.colorbar.unwrap();
        assert_eq!(cbar.norm.boundaries().map(<[f64]>::len), Some(5));
        assert_eq!(cbar.ticks.map(|t| t.len()), Some(5));
    }

    #[test]
    fn divergent_map_rounds_bounds_around_center() {
        let skewed = LabeledArray::new(&["lat", "lon"], &[1, 3], vec![-0.3, 12.0, 29.7])
            .unwrap()
            .named("tas")
            .with_coord("lat", vec![45.0])
            .unwrap()
            .with_coord("lon", vec![-75.0, -74.0, -73.0])
            .unwrap();
        let opts = GridmapOptions {
            divergent: Divergent::Zero,
            ..Default::default()
        };
        let fig = gridmap(skewed.clone(), &opts).unwrap();
        assert_eq!(
            fig.colorbar.unwrap().norm,
            Normalization::TwoSlope { vmin: -10.0, center: 0.0, vmax: 30.0 }
        );

        let off_center = GridmapOptions {
            divergent: Divergent::At(40.0),
            ..Default::default()
        };
        assert!(matches!(gridmap(skewed, &off_center), Err(PlotError::Value(_))));
    }

    #[test]
    fn single_extent_bound_is_dropped() {
        let opts = GridmapOptions {
            plot_kw: crate::options::kwargs(json!({"xlim": [-80, -70]})),
            ..Default::default()
        };
        let fig = gridmap(field(), &opts).unwrap();
        assert!(fig.diagnostics.has(DiagnosticKind::ExtentDropped));
        assert!(fig.axes.xlim.is_none());
    }

    #[test]
    fn mapping_must_have_one_entry() {
        let data = vec![("a", field()), ("b", field())];
        assert!(matches!(
            gridmap(data, &GridmapOptions::default()),
            Err(PlotError::Value(_))
        ));
    }
}
