//! Backend-neutral figure description returned by every chart call.
//!
//! A [`Figure`] records what to draw (artists in data coordinates, axes
//! decorations, legend, colorbar) plus the diagnostics collected while
//! building it. Rendering is a separate step ([`Figure::save`],
//! [`Figure::to_svg_string`]) handled by [`crate::viz`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::colormap::{Colormap, Normalization};
use crate::diagnostics::Diagnostics;
use crate::error::{PlotError, Result};
use crate::layout::{Anchor, HAlign, VAlign};
use crate::options::{Kwargs, get_f64};
use crate::style::{self, LineDash, MarkerShape, Rgba, Style};
use crate::terms::Locale;

/// How a timeseries legend is drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegendMode {
    /// Lines and shaded bands.
    Full,
    /// Lines only.
    #[default]
    Lines,
    /// Labels at the end of each line, inside the axes.
    InPlot,
    /// Labels at the end of each line, just outside the axes.
    Edge,
    /// No legend.
    None,
}

impl LegendMode {
    /// Parse `"full"`, `"lines"`, `"in_plot"`, `"edge"` or `"none"`.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "lines" => Ok(Self::Lines),
            "in_plot" => Ok(Self::InPlot),
            "edge" => Ok(Self::Edge),
            "none" | "" => Ok(Self::None),
            other => Err(PlotError::value(format!(
                "legend must be one of full, lines, in_plot, edge or none (got '{other}')"
            ))),
        }
    }
}

/// Where a legend sits relative to the plotting area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LegendPlacement {
    /// Overlay inside the axes at an anchor.
    Inside(Anchor),
    /// Separate panel on the right side.
    Right,
    /// Separate band above the axes.
    Top,
    /// Separate band below the axes.
    Bottom,
}

impl Default for LegendPlacement {
    fn default() -> Self {
        LegendPlacement::Inside(Anchor {
            x: 0.97,
            y: 0.97,
            box_align: (1.0, 1.0),
            ha: HAlign::Right,
            va: VAlign::Top,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartKind {
    Timeseries,
    Gridmap,
    Scattermap,
    Heatmap,
    Violin,
    Taylor,
    Hatchmap,
    Partition,
    Stripes,
    Triheatmap,
}

/// Coordinate system of a text position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextCoords {
    Data,
    /// Fractions of the axes box, (0, 0) lower left.
    Axes,
    /// x in axes fraction, y in data units.
    Blended,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextArtist {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub coords: TextCoords,
    pub ha: HAlign,
    pub va: VAlign,
    pub color: Rgba,
    /// Relative to the style font size.
    pub size_scale: f64,
    pub background: Option<Rgba>,
    /// Degrees, counter-clockwise.
    pub rotation: f64,
}

impl TextArtist {
    pub fn new(text: impl Into<String>, x: f64, y: f64, coords: TextCoords) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            coords,
            ha: HAlign::Left,
            va: VAlign::Bottom,
            color: Rgba::BLACK,
            size_scale: 1.0,
            background: None,
            rotation: 0.0,
        }
    }

    /// Placed at a resolved location anchor, in axes coordinates.
    pub fn at_anchor(text: impl Into<String>, anchor: Anchor) -> Self {
        Self {
            ha: anchor.ha,
            va: anchor.va,
            ..Self::new(text, anchor.x, anchor.y, TextCoords::Axes)
        }
    }

    pub fn aligned(mut self, ha: HAlign, va: VAlign) -> Self {
        self.ha = ha;
        self.va = va;
        self
    }

    pub fn colored(mut self, color: Rgba) -> Self {
        self.color = color;
        self
    }

    pub fn with_background(mut self, color: Rgba) -> Self {
        self.background = Some(color);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineArtist {
    pub label: String,
    pub points: Vec<(f64, f64)>,
    pub color: Rgba,
    pub width: f64,
    pub dash: LineDash,
    pub marker: Option<MarkerShape>,
}

/// Filled region between two curves sharing the same x values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandArtist {
    pub label: Option<String>,
    pub xs: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    pub color: Rgba,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterArtist {
    pub label: String,
    pub points: Vec<(f64, f64)>,
    pub colors: Vec<Rgba>,
    /// Marker area in points^2, one per point.
    pub sizes: Vec<f64>,
    pub marker: MarkerShape,
    pub edge: Option<Rgba>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshCell {
    pub polygon: Vec<(f64, f64)>,
    pub color: Rgba,
}

/// Colored polygons (raster maps, heatmaps, stripes).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshArtist {
    pub cells: Vec<MeshCell>,
    /// Outline drawn around every cell.
    #[serde(default)]
    pub edge: Option<Rgba>,
}

/// Hatch pattern drawn over a set of cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HatchArtist {
    pub label: String,
    pub cells: Vec<Vec<(f64, f64)>>,
    pub pattern: String,
    pub color: Rgba,
}

/// One violin: a kernel density outline plus quartile marks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolinArtist {
    pub label: String,
    pub position: f64,
    /// `(value, half width)` pairs along the value axis.
    pub curve: Vec<(f64, f64)>,
    pub median: f64,
    pub q1: f64,
    pub q3: f64,
    pub min: f64,
    pub max: f64,
    pub color: Rgba,
    pub horizontal: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Artist {
    Line(LineArtist),
    Band(BandArtist),
    Scatter(ScatterArtist),
    Mesh(MeshArtist),
    Hatch(HatchArtist),
    Violin(ViolinArtist),
    Text(TextArtist),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Title {
    pub text: String,
    pub loc: HAlign,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Ticks {
    #[default]
    Auto,
    Fixed(Vec<(f64, String)>),
    Hidden,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Glyph {
    Line { dash: LineDash, width: f64 },
    Patch,
    Marker { shape: MarkerShape, size: f64 },
    Hatch(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendEntry {
    pub label: String,
    pub color: Rgba,
    pub glyph: Glyph,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Legend {
    pub title: Option<String>,
    pub entries: Vec<LegendEntry>,
    pub placement: LegendPlacement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Vertical,
    Horizontal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Colorbar {
    pub cmap: Colormap,
    pub norm: Normalization,
    pub label: Option<String>,
    pub orientation: Orientation,
    /// Explicit tick positions; `None` lets the renderer choose.
    pub ticks: Option<Vec<f64>>,
}

/// A single plotting area with its decorations and artists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axes {
    pub title: Option<Title>,
    pub xlabel: Option<String>,
    pub ylabel: Option<String>,
    pub xlim: Option<(f64, f64)>,
    pub ylim: Option<(f64, f64)>,
    pub xticks: Ticks,
    pub yticks: Ticks,
    /// Degrees, counter-clockwise.
    pub xtick_rotation: f64,
    /// x values are decimal years.
    pub x_time: bool,
    pub frame: bool,
    pub grid: bool,
    pub equal_aspect: bool,
    pub artists: Vec<Artist>,
    pub legend: Option<Legend>,
}

impl Default for Axes {
    fn default() -> Self {
        Self {
            title: None,
            xlabel: None,
            ylabel: None,
            xlim: None,
            ylim: None,
            xticks: Ticks::Auto,
            yticks: Ticks::Auto,
            xtick_rotation: 0.0,
            x_time: false,
            frame: true,
            grid: false,
            equal_aspect: false,
            artists: Vec::new(),
            legend: None,
        }
    }
}

impl Axes {
    pub fn push(&mut self, artist: Artist) {
        self.artists.push(artist);
    }

    /// Bounding box of every artist drawn in data coordinates.
    pub fn data_bounds(&self) -> Option<((f64, f64), (f64, f64))> {
        let mut xs = Bounds::default();
        let mut ys = Bounds::default();
        for a in &self.artists {
            match a {
                Artist::Line(l) => l.points.iter().for_each(|(x, y)| {
                    xs.add(*x);
                    ys.add(*y);
                }),
                Artist::Band(b) => {
                    b.xs.iter().for_each(|x| xs.add(*x));
                    b.lower.iter().chain(&b.upper).for_each(|y| ys.add(*y));
                }
                Artist::Scatter(s) => s.points.iter().for_each(|(x, y)| {
                    xs.add(*x);
                    ys.add(*y);
                }),
                Artist::Mesh(m) => m.cells.iter().flat_map(|c| &c.polygon).for_each(|(x, y)| {
                    xs.add(*x);
                    ys.add(*y);
                }),
                Artist::Hatch(h) => h.cells.iter().flatten().for_each(|(x, y)| {
                    xs.add(*x);
                    ys.add(*y);
                }),
                Artist::Violin(v) => {
                    let (lo, hi) = (v.position - 0.5, v.position + 0.5);
                    let (pos, val) = if v.horizontal { (&mut ys, &mut xs) } else { (&mut xs, &mut ys) };
                    pos.add(lo);
                    pos.add(hi);
                    v.curve.iter().for_each(|(value, _)| val.add(*value));
                }
                Artist::Text(t) if t.coords == TextCoords::Data => {
                    xs.add(t.x);
                    ys.add(t.y);
                }
                Artist::Text(_) => {}
            }
        }
        Some((xs.range()?, ys.range()?))
    }
}

#[derive(Default)]
struct Bounds(Option<(f64, f64)>);

impl Bounds {
    fn add(&mut self, v: f64) {
        if !v.is_finite() {
            return;
        }
        self.0 = Some(match self.0 {
            None => (v, v),
            Some((lo, hi)) => (lo.min(v), hi.max(v)),
        });
    }

    fn range(&self) -> Option<(f64, f64)> {
        self.0
    }
}

/// The result of a chart call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub kind: ChartKind,
    /// Pixel size.
    pub size: (u32, u32),
    pub style: Style,
    pub locale: Locale,
    pub suptitle: Option<String>,
    pub axes: Axes,
    pub colorbar: Option<Colorbar>,
    pub diagnostics: Diagnostics,
}

impl Figure {
    /// Empty figure using a snapshot of the process-wide style.
    pub fn new(kind: ChartKind, locale: Locale) -> Self {
        let style = style::current_style();
        Self {
            kind,
            size: style.figure_size,
            style,
            locale,
            suptitle: None,
            axes: Axes::default(),
            colorbar: None,
            diagnostics: Diagnostics::new(),
        }
    }

    /// Apply `fig_kw`: `figsize` in inches (`[w, h]`) scaled by `dpi`
    /// (default 100).
    pub fn apply_fig_kw(&mut self, fig_kw: &Kwargs) {
        let dpi = get_f64(fig_kw, "dpi").unwrap_or(100.0);
        if let Some(size) = fig_kw.get("figsize").and_then(|v| v.as_array()) {
            let dims: Vec<f64> = size.iter().filter_map(|v| v.as_f64()).collect();
            if let [w, h] = dims[..] {
                self.size = ((w * dpi).round().max(1.0) as u32, (h * dpi).round().max(1.0) as u32);
            }
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &LineArtist> {
        self.axes.artists.iter().filter_map(|a| match a {
            Artist::Line(l) => Some(l),
            _ => None,
        })
    }

    pub fn bands(&self) -> impl Iterator<Item = &BandArtist> {
        self.axes.artists.iter().filter_map(|a| match a {
            Artist::Band(b) => Some(b),
            _ => None,
        })
    }

    pub fn scatters(&self) -> impl Iterator<Item = &ScatterArtist> {
        self.axes.artists.iter().filter_map(|a| match a {
            Artist::Scatter(s) => Some(s),
            _ => None,
        })
    }

    pub fn meshes(&self) -> impl Iterator<Item = &MeshArtist> {
        self.axes.artists.iter().filter_map(|a| match a {
            Artist::Mesh(m) => Some(m),
            _ => None,
        })
    }

    pub fn hatches(&self) -> impl Iterator<Item = &HatchArtist> {
        self.axes.artists.iter().filter_map(|a| match a {
            Artist::Hatch(h) => Some(h),
            _ => None,
        })
    }

    pub fn violins(&self) -> impl Iterator<Item = &ViolinArtist> {
        self.axes.artists.iter().filter_map(|a| match a {
            Artist::Violin(v) => Some(v),
            _ => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &TextArtist> {
        self.axes.artists.iter().filter_map(|a| match a {
            Artist::Text(t) => Some(t),
            _ => None,
        })
    }

    /// Labels shown in the legend, in order.
    pub fn legend_labels(&self) -> Vec<&str> {
        self.axes
            .legend
            .as_ref()
            .map(|l| l.entries.iter().map(|e| e.label.as_str()).collect())
            .unwrap_or_default()
    }

    /// Render to an `.svg` or bitmap file, chosen by extension.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        crate::viz::render_to_file(self, path.as_ref()).map_err(PlotError::from)
    }

    /// Render to an in-memory SVG document.
    pub fn to_svg_string(&self) -> Result<String> {
        crate::viz::render_to_svg_string(self).map_err(PlotError::from)
    }
}

/// Whether a label would appear in a legend: non-empty and not starting
/// with an underscore.
pub fn is_legend_label(label: &str) -> bool {
    !label.is_empty() && !label.starts_with('_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn legend_mode_parse() {
        assert_eq!(LegendMode::parse("in_plot").unwrap(), LegendMode::InPlot);
        assert_eq!(LegendMode::parse("Full").unwrap(), LegendMode::Full);
        assert!(LegendMode::parse("outside").is_err());
    }

    #[test]
    fn hidden_labels() {
        assert!(is_legend_label("ssp245"));
        assert!(!is_legend_label("_no_label"));
        assert!(!is_legend_label(""));
    }

    #[test]
    fn figsize_in_inches() {
        let mut fig = Figure::new(ChartKind::Timeseries, Locale::En);
        fig.apply_fig_kw(&crate::options::kwargs(json!({"figsize": [6, 4]})));
        assert_eq!(fig.size, (600, 400));
    }

    #[test]
    fn bounds_skip_nan() {
        let mut ax = Axes::default();
        ax.push(Artist::Line(LineArtist {
            label: String::new(),
            points: vec![(0.0, 1.0), (1.0, f64::NAN), (2.0, 3.0)],
            color: Rgba::BLACK,
            width: 1.0,
            dash: LineDash::Solid,
            marker: None,
        }));
        assert_eq!(ax.data_bounds(), Some(((0.0, 2.0), (1.0, 3.0))));
    }
}
