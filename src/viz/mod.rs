//! Rendering of [`Figure`]s to **SVG** or **PNG** with plotters.
//!
//! - Backend chosen by file extension (`.svg`, anything else is a bitmap)
//! - Locale-aware tick labels (`30,000` vs `30 000`)
//! - Legend inside the axes at an anchor, or as a `Right`, `Top` or `Bottom`
//!   panel that never overlaps the plot
//! - Optional colorbar panel, vertical or horizontal

pub mod colorbar;
pub mod glyph;
pub mod legend;
pub mod text;
pub mod util;

use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Result, anyhow};
use plotters::coord::Shift;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use plotters::style::FontFamily;
use plotters_bitmap::BitMapBackend;
use plotters_svg::SVGBackend;

use crate::figure::{
    Artist, Axes, Colorbar, Figure, LegendPlacement, Orientation, TextArtist, TextCoords, Ticks,
    ViolinArtist,
};
use crate::layout::{HAlign, VAlign};
use crate::style::{LineDash, Rgba};
use colorbar::draw_colorbar;
use legend::{draw_inside_legend, draw_legend_panel, estimate_top_bottom_legend_height_px};
use text::{TextBlock, block_size_px, estimate_text_width_px, line_height_px};
use util::{
    compute_left_label_area_px, font_px, format_tick, format_year, marker_radius_px, nice_step,
    nice_ticks, stroke_px, to_rgba,
};

const MARGIN: i32 = 16;
const TICK_COUNT: usize = 8;
const TICK_LEN: i32 = 5;
/// Share of the data range added on each side of automatic limits.
const AUTO_MARGIN: f64 = 0.05;

/// Environment variable naming a TrueType font to render text with.
pub const FONT_ENV: &str = "FIGANOS_FONT";

const SYSTEM_FONTS: [&str; 8] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// One-time registration of the "sans-serif" family for the `ab_glyph` text
/// path, which does not discover OS fonts by itself.
static INIT_FONTS: Once = Once::new();
static FONTS_READY: AtomicBool = AtomicBool::new(false);

/// Whether text can be drawn. Without a font, figures render shapes only.
pub fn ensure_fonts_registered() -> bool {
    INIT_FONTS.call_once(|| {
        let candidates = std::env::var_os(FONT_ENV)
            .map(PathBuf::from)
            .into_iter()
            .chain(SYSTEM_FONTS.iter().map(PathBuf::from));
        for path in candidates {
            let Ok(bytes) = std::fs::read(&path) else {
                continue;
            };
            // ab_glyph keeps a 'static reference for the life of the process
            let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
            if plotters::style::register_font("sans-serif", FontStyle::Normal, bytes).is_ok() {
                log::debug!("registered font {}", path.display());
                FONTS_READY.store(true, Ordering::Release);
                return;
            }
        }
        log::warn!("no usable font found (set {FONT_ENV}); figures are rendered without text");
    });
    FONTS_READY.load(Ordering::Acquire)
}

pub(crate) fn backend_err<E: std::fmt::Debug>(e: E) -> anyhow::Error {
    anyhow!("{:?}", e)
}

/// Render to `path`: SVG for a `.svg` extension, otherwise a bitmap whose
/// format follows the extension (`.png`, ...).
pub fn render_to_file(fig: &Figure, path: &Path) -> Result<()> {
    let text = ensure_fonts_registered();
    let is_svg = path
        .extension()
        .and_then(|s| s.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("svg"));
    if is_svg {
        let root = SVGBackend::new(path, fig.size).into_drawing_area();
        draw_figure(&root, fig, text)?;
    } else {
        let root = BitMapBackend::new(path, fig.size).into_drawing_area();
        draw_figure(&root, fig, text)?;
    }
    log::debug!("wrote {:?} figure to {}", fig.kind, path.display());
    Ok(())
}

/// Render to an in-memory SVG document.
pub fn render_to_svg_string(fig: &Figure) -> Result<String> {
    let text = ensure_fonts_registered();
    let mut out = String::new();
    {
        let root = SVGBackend::with_string(&mut out, fig.size).into_drawing_area();
        draw_figure(&root, fig, text)?;
    }
    Ok(out)
}

type DataChart<'a, DB> = ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

/// Pixel box of the plotting area (backend coordinates) and the data
/// ranges it shows.
struct PlotFrame {
    px: Range<i32>,
    py: Range<i32>,
    x: Range<f64>,
    y: Range<f64>,
}

impl PlotFrame {
    fn axes_px(&self, fx: f64, fy: f64) -> (i32, i32) {
        let w = (self.px.end - self.px.start) as f64;
        let h = (self.py.end - self.py.start) as f64;
        (
            self.px.start + (fx * w).round() as i32,
            self.py.end - (fy * h).round() as i32,
        )
    }

    fn fraction(v: f64, r: &Range<f64>) -> f64 {
        (v - r.start) / (r.end - r.start)
    }

    fn data_px(&self, x: f64, y: f64) -> (i32, i32) {
        self.axes_px(Self::fraction(x, &self.x), Self::fraction(y, &self.y))
    }

    fn text_px(&self, t: &TextArtist) -> (i32, i32) {
        match t.coords {
            TextCoords::Data => self.data_px(t.x, t.y),
            TextCoords::Axes => self.axes_px(t.x, t.y),
            TextCoords::Blended => self.axes_px(t.x, Self::fraction(t.y, &self.y)),
        }
    }
}

/// Space reserved around the plotting area, in pixels.
#[derive(Debug, Clone, Copy, Default)]
struct Gutters {
    left: i32,
    bottom: i32,
    title: i32,
    right: i32,
}

fn draw_figure<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, fig: &Figure, text: bool) -> Result<()> {
    let font = font_px(fig.style.font_size);
    if !fig.style.transparent {
        root.fill(&WHITE).map_err(backend_err)?;
    }
    let (w, h) = root.dim_in_pixel();
    let (w, h) = (w as i32, h as i32);

    let mut top = 0;
    if let Some(sup) = fig.suptitle.as_deref().filter(|s| text && !s.is_empty()) {
        let size = (font as f64 * 1.4).round() as u32;
        TextBlock::new(size)
            .aligned(HAlign::Center, VAlign::Top)
            .draw(root, sup, (w / 2, MARGIN / 2))?;
        top = MARGIN / 2 + block_size_px(sup, size).1 as i32;
    }
    let body = root.margin(top, 0, 0, 0);

    let (body, cbar) = match &fig.colorbar {
        Some(cb) if cb.orientation == Orientation::Vertical => {
            let (b, c) = body.split_horizontally((w - colorbar::PANEL_W).max(40));
            (b, Some((c, cb)))
        }
        Some(cb) => {
            let label = if text { colorbar::label_height_px(cb, font) } else { 0 };
            let panel = colorbar::PANEL_H + label;
            let (b, c) = body.split_vertically((h - top - panel).max(40));
            (b, Some((c, cb)))
        }
        None => (body, None),
    };

    let axes = &fig.axes;
    let (xr, yr) = limits(axes);
    let gutters = gutters(fig, &xr, &yr, font, text);

    let legend = axes.legend.as_ref().filter(|l| !l.entries.is_empty());
    let (plot_area, legend_area) = match legend.map(|l| l.placement) {
        Some(LegendPlacement::Right) => {
            let (plot, panel) = body.split_horizontally((85).percent_width());
            (plot, Some(panel))
        }
        Some(placement @ (LegendPlacement::Top | LegendPlacement::Bottom)) => {
            let (bw, bh) = body.dim_in_pixel();
            let needed = legend
                .map(|l| estimate_top_bottom_legend_height_px(l, MARGIN + gutters.left, bw as i32, font))
                .unwrap_or(0)
                .max(40);
            if placement == LegendPlacement::Top {
                let (panel, plot) = body.split_vertically(needed);
                (plot, Some(panel))
            } else {
                // keep at least 40px for the plot
                let (plot, panel) = body.split_vertically((bh as i32 - needed).max(40));
                (plot, Some(panel))
            }
        }
        _ => (body, None),
    };

    let frame = draw_axes(root, &plot_area, fig, xr, yr, gutters, font, text)?;

    if let Some(l) = legend {
        match (&l.placement, &legend_area) {
            (LegendPlacement::Inside(anchor), _) => {
                draw_inside_legend(root, l, anchor, (&frame.px, &frame.py), font, text)?;
            }
            (placement, Some(panel)) => {
                let base = panel.get_base_pixel();
                let vertical = *placement == LegendPlacement::Right;
                draw_legend_panel(panel, l, vertical, frame.px.start - base.0, font, text)?;
            }
            _ => {}
        }
    }

    if let Some((area, cb)) = cbar {
        draw_colorbar_panel(&area, cb, &frame, fig, font, text)?;
    }

    root.present().map_err(backend_err)?;
    Ok(())
}

fn draw_colorbar_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    cb: &Colorbar,
    frame: &PlotFrame,
    fig: &Figure,
    font: u32,
    text: bool,
) -> Result<()> {
    let base = area.get_base_pixel();
    let span = match cb.orientation {
        Orientation::Vertical => (frame.py.start - base.1, frame.py.end - base.1),
        Orientation::Horizontal => (frame.px.start - base.0, frame.px.end - base.0),
    };
    draw_colorbar(area, cb, span, fig.locale, font, text)
}

/// Axis limits: explicit ones, else the data bounds padded by
/// [`AUTO_MARGIN`]. Degenerate ranges are widened by one unit each way.
fn limits(axes: &Axes) -> (Range<f64>, Range<f64>) {
    let bounds = axes.data_bounds();
    let auto = |b: Option<(f64, f64)>| match b {
        Some((lo, hi)) if hi > lo => {
            let pad = (hi - lo) * AUTO_MARGIN;
            (lo - pad, hi + pad)
        }
        Some((v, _)) => (v, v),
        None => (0.0, 1.0),
    };
    let widen = |(a, b): (f64, f64)| {
        if (b - a).abs() < f64::EPSILON || !(a.is_finite() && b.is_finite()) {
            let c = if a.is_finite() { a } else { 0.0 };
            (c - 1.0)..(c + 1.0)
        } else {
            a..b
        }
    };
    let x = widen(axes.xlim.unwrap_or_else(|| auto(bounds.map(|b| b.0))));
    let y = widen(axes.ylim.unwrap_or_else(|| auto(bounds.map(|b| b.1))));
    (x, y)
}

/// Grow one range so that data units have the same pixel size on both axes.
fn equalize(x: &mut Range<f64>, y: &mut Range<f64>, pw: i32, ph: i32) {
    if pw <= 0 || ph <= 0 {
        return;
    }
    let (dx, dy) = ((x.end - x.start).abs(), (y.end - y.start).abs());
    let (pw, ph) = (pw as f64, ph as f64);
    let grow = |r: &mut Range<f64>, want: f64| {
        let c = (r.start + r.end) / 2.0;
        let s = (r.end - r.start).signum();
        *r = (c - s * want / 2.0)..(c + s * want / 2.0);
    };
    if dx / dy > pw / ph {
        grow(y, dx * ph / pw);
    } else {
        grow(x, dy * pw / ph);
    }
}

fn tick_labels(ticks: &Ticks, r: &Range<f64>, locale: crate::terms::Locale, time: bool) -> Vec<String> {
    match ticks {
        Ticks::Hidden => Vec::new(),
        Ticks::Fixed(t) => t.iter().map(|(_, l)| l.clone()).collect(),
        Ticks::Auto => {
            let step = nice_step((r.end - r.start).abs(), TICK_COUNT);
            nice_ticks(r.start, r.end, TICK_COUNT)
                .into_iter()
                .map(|v| if time { format_year(v) } else { format_tick(v, step, locale) })
                .collect()
        }
    }
}

fn gutters(fig: &Figure, xr: &Range<f64>, yr: &Range<f64>, font: u32, text: bool) -> Gutters {
    let axes = &fig.axes;
    if !text {
        return Gutters {
            left: TICK_LEN,
            bottom: TICK_LEN,
            ..Default::default()
        };
    }
    let tick_px = font.saturating_sub(2).max(6);
    let line_h = line_height_px(font) as i32;

    let ylabels = tick_labels(&axes.yticks, yr, fig.locale, false);
    let left = compute_left_label_area_px(&ylabels, tick_px, axes.ylabel.is_some()) as i32;

    let xlabels = tick_labels(&axes.xticks, xr, fig.locale, axes.x_time);
    let ticks_h = if xlabels.is_empty() {
        0
    } else if axes.xtick_rotation.abs() >= 1.0 {
        xlabels
            .iter()
            .map(|l| estimate_text_width_px(l, tick_px) as i32)
            .max()
            .unwrap_or(0)
            + TICK_LEN
            + 8
    } else {
        line_height_px(tick_px) as i32 + TICK_LEN + 6
    };
    let desc_h = axes
        .xlabel
        .as_deref()
        .map(|l| block_size_px(l, font).1 as i32 + 6)
        .unwrap_or(0);

    let title = axes
        .title
        .as_ref()
        .map(|t| block_size_px(&t.text, title_px(font)).1 as i32 + 8)
        .unwrap_or(0);

    // labels placed past the right edge of the axes
    let right = axes
        .artists
        .iter()
        .filter_map(|a| match a {
            Artist::Text(t) if t.coords != TextCoords::Data && t.x > 1.0 => {
                Some(block_size_px(&t.text, text_px(font, t)).0 as i32 + 8)
            }
            _ => None,
        })
        .max()
        .unwrap_or(0);

    Gutters {
        left: left.max(TICK_LEN),
        bottom: (ticks_h + desc_h).max(TICK_LEN).max(line_h / 2),
        title,
        right,
    }
}

fn title_px(font: u32) -> u32 {
    (font as f64 * 1.2).round() as u32
}

fn text_px(font: u32, t: &TextArtist) -> u32 {
    (font as f64 * t.size_scale).round().max(6.0) as u32
}

fn auto_label_count(ticks: &Ticks, text: bool) -> usize {
    match ticks {
        Ticks::Auto if text => TICK_COUNT,
        _ => 0,
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_axes<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    area: &DrawingArea<DB, Shift>,
    fig: &Figure,
    mut xr: Range<f64>,
    mut yr: Range<f64>,
    g: Gutters,
    font: u32,
    text: bool,
) -> Result<PlotFrame> {
    let axes = &fig.axes;
    if axes.equal_aspect {
        let (aw, ah) = area.dim_in_pixel();
        let pw = aw as i32 - 2 * MARGIN - g.left - g.right;
        let ph = ah as i32 - 2 * MARGIN - g.title - g.bottom;
        equalize(&mut xr, &mut yr, pw, ph);
    }

    let mut chart = ChartBuilder::on(area)
        .margin(MARGIN)
        .margin_top(MARGIN + g.title)
        .margin_right(MARGIN + g.right)
        .set_label_area_size(LabelAreaPosition::Left, g.left)
        .set_label_area_size(LabelAreaPosition::Bottom, g.bottom)
        .build_cartesian_2d(xr.clone(), yr.clone())
        .map_err(backend_err)?;

    let locale = fig.locale;
    let x_time = axes.x_time;
    let xstep = nice_step((xr.end - xr.start).abs(), TICK_COUNT);
    let ystep = nice_step((yr.end - yr.start).abs(), TICK_COUNT);
    let x_fmt = move |v: &f64| {
        if x_time {
            format_year(*v)
        } else {
            format_tick(*v, xstep, locale)
        }
    };
    let y_fmt = move |v: &f64| format_tick(*v, ystep, locale);
    let tick_px = font.saturating_sub(2).max(6);
    {
        let mut mesh = chart.configure_mesh();
        mesh.x_labels(auto_label_count(&axes.xticks, text))
            .y_labels(auto_label_count(&axes.yticks, text))
            .x_label_formatter(&x_fmt)
            .y_label_formatter(&y_fmt)
            .label_style((FontFamily::SansSerif, tick_px))
            .axis_desc_style((FontFamily::SansSerif, font));
        if !axes.grid {
            mesh.disable_mesh();
        }
        if !axes.frame {
            mesh.axis_style(&TRANSPARENT);
        }
        if text {
            if let Some(x) = &axes.xlabel {
                mesh.x_desc(x.clone());
            }
            if let Some(y) = &axes.ylabel {
                mesh.y_desc(y.clone());
            }
        }
        mesh.draw().map_err(backend_err)?;
    }

    let (px, py) = chart.plotting_area().get_pixel_range();
    let frame = PlotFrame { px, py, x: xr, y: yr };

    for artist in &axes.artists {
        draw_artist(&mut chart, root, &frame, artist, font, text)?;
    }

    if axes.frame {
        root.draw(&Rectangle::new(
            [(frame.px.start, frame.py.start), (frame.px.end, frame.py.end)],
            BLACK.stroke_width(1),
        ))
        .map_err(backend_err)?;
    }
    draw_fixed_ticks(root, &frame, axes, tick_px, text)?;

    if let Some(title) = axes.title.as_ref().filter(|_| text) {
        let x = match title.loc {
            HAlign::Left => frame.px.start,
            HAlign::Center => (frame.px.start + frame.px.end) / 2,
            HAlign::Right => frame.px.end,
        };
        TextBlock::new(title_px(font))
            .aligned(title.loc, VAlign::Bottom)
            .draw(root, &title.text, (x, frame.py.start - 6))?;
    }
    Ok(frame)
}

/// Index ranges of consecutive points accepted by `keep`.
fn runs(n: usize, keep: impl Fn(usize) -> bool) -> Vec<Range<usize>> {
    let mut out = Vec::new();
    let mut start = None;
    for i in 0..n {
        match (keep(i), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                out.push(s..i);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push(s..n);
    }
    out
}

fn finite(p: &(f64, f64)) -> bool {
    p.0.is_finite() && p.1.is_finite()
}

fn draw_artist<DB: DrawingBackend>(
    chart: &mut DataChart<'_, DB>,
    root: &DrawingArea<DB, Shift>,
    frame: &PlotFrame,
    artist: &Artist,
    font: u32,
    text: bool,
) -> Result<()> {
    match artist {
        Artist::Mesh(m) => {
            chart
                .draw_series(
                    m.cells
                        .iter()
                        .filter(|c| c.color.a > 0 && c.polygon.iter().all(finite))
                        .map(|c| Polygon::new(c.polygon.clone(), to_rgba(c.color).filled())),
                )
                .map_err(backend_err)?;
            if let Some(edge) = m.edge {
                let style = to_rgba(edge).stroke_width(1);
                chart
                    .draw_series(
                        m.cells
                            .iter()
                            .filter(|c| !c.polygon.is_empty() && c.polygon.iter().all(finite))
                            .map(|c| {
                                let mut ring = c.polygon.clone();
                                ring.push(c.polygon[0]);
                                PathElement::new(ring, style)
                            }),
                    )
                    .map_err(backend_err)?;
            }
        }
        Artist::Band(b) => {
            let ok = |i: usize| b.xs[i].is_finite() && b.lower[i].is_finite() && b.upper[i].is_finite();
            let n = b.xs.len().min(b.lower.len()).min(b.upper.len());
            for run in runs(n, ok).into_iter().filter(|r| r.len() > 1) {
                let mut poly: Vec<(f64, f64)> = run.clone().map(|i| (b.xs[i], b.lower[i])).collect();
                poly.extend(run.rev().map(|i| (b.xs[i], b.upper[i])));
                chart
                    .draw_series(std::iter::once(Polygon::new(poly, to_rgba(b.color).filled())))
                    .map_err(backend_err)?;
            }
        }
        Artist::Line(l) => {
            let color = to_rgba(l.color);
            let width = stroke_px(l.width);
            for run in runs(l.points.len(), |i| finite(&l.points[i])).into_iter().filter(|r| r.len() > 1) {
                let pts = &l.points[run];
                if l.dash == LineDash::Solid {
                    let style = color.stroke_width(width.round() as u32);
                    chart
                        .draw_series(LineSeries::new(pts.iter().copied(), style))
                        .map_err(backend_err)?;
                } else {
                    let pixels: Vec<(i32, i32)> = pts.iter().map(|(x, y)| frame.data_px(*x, *y)).collect();
                    glyph::draw_polyline(root, &pixels, color, width, l.dash)?;
                }
            }
            if let Some(shape) = l.marker {
                let r = (width * 1.5).round().max(2.0) as i32;
                for (x, y) in l.points.iter().filter(|p| finite(p)) {
                    glyph::draw_marker(root, frame.data_px(*x, *y), r, color, None, shape)?;
                }
            }
        }
        Artist::Scatter(s) => {
            for (i, p) in s.points.iter().enumerate().filter(|(_, p)| finite(p)) {
                let color = s.colors.get(i).or(s.colors.first()).copied().unwrap_or(Rgba::BLACK);
                let size = s.sizes.get(i).or(s.sizes.first()).copied().unwrap_or(36.0);
                glyph::draw_marker(
                    root,
                    frame.data_px(p.0, p.1),
                    marker_radius_px(size),
                    to_rgba(color),
                    s.edge.map(to_rgba),
                    s.marker,
                )?;
            }
        }
        Artist::Hatch(h) => {
            let color = to_rgba(h.color);
            for cell in &h.cells {
                let pixels: Vec<(i32, i32)> = cell
                    .iter()
                    .filter(|p| finite(p))
                    .map(|(x, y)| frame.data_px(*x, *y))
                    .collect();
                let (Some(x0), Some(x1)) = (pixels.iter().map(|p| p.0).min(), pixels.iter().map(|p| p.0).max()) else {
                    continue;
                };
                let (Some(y0), Some(y1)) = (pixels.iter().map(|p| p.1).min(), pixels.iter().map(|p| p.1).max()) else {
                    continue;
                };
                glyph::draw_hatch(root, ((x0, y0), (x1, y1)), &h.pattern, color)?;
            }
        }
        Artist::Violin(v) => draw_violin(chart, v)?,
        Artist::Text(t) if text => {
            let mut block = TextBlock::new(text_px(font, t))
                .aligned(t.ha, t.va)
                .colored(to_rgba(t.color));
            block.background = t.background.map(to_rgba);
            block.vertical = (t.rotation.rem_euclid(180.0) - 90.0).abs() < 45.0;
            block.draw(root, &t.text, frame.text_px(t))?;
        }
        Artist::Text(_) => {}
    }
    Ok(())
}

fn draw_violin<DB: DrawingBackend>(chart: &mut DataChart<'_, DB>, v: &ViolinArtist) -> Result<()> {
    let place = |value: f64, offset: f64| {
        if v.horizontal {
            (value, v.position + offset)
        } else {
            (v.position + offset, value)
        }
    };
    let mut outline: Vec<(f64, f64)> = v.curve.iter().map(|(val, w)| place(*val, *w)).collect();
    outline.extend(v.curve.iter().rev().map(|(val, w)| place(*val, -*w)));
    if outline.len() < 3 {
        return Ok(());
    }
    let dark = RGBColor(64, 64, 64);
    let mut ring = outline.clone();
    ring.push(outline[0]);
    chart
        .draw_series(std::iter::once(Polygon::new(outline, to_rgba(v.color).filled())))
        .map_err(backend_err)?;
    chart
        .draw_series(std::iter::once(PathElement::new(ring, dark.stroke_width(1))))
        .map_err(backend_err)?;
    chart
        .draw_series(std::iter::once(PathElement::new(
            vec![place(v.min, 0.0), place(v.max, 0.0)],
            dark.stroke_width(1),
        )))
        .map_err(backend_err)?;
    chart
        .draw_series(std::iter::once(PathElement::new(
            vec![place(v.q1, 0.0), place(v.q3, 0.0)],
            dark.stroke_width(5),
        )))
        .map_err(backend_err)?;
    chart
        .draw_series(std::iter::once(Circle::new(place(v.median, 0.0), 3, WHITE.filled())))
        .map_err(backend_err)?;
    Ok(())
}

/// Ticks at caller-chosen positions with caller-chosen labels.
fn draw_fixed_ticks<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    frame: &PlotFrame,
    axes: &Axes,
    tick_px: u32,
    text: bool,
) -> Result<()> {
    let stroke = BLACK.stroke_width(1);
    let inside = |p: i32, r: &Range<i32>| p >= r.start && p <= r.end;
    if let Ticks::Fixed(ticks) = &axes.xticks {
        let rotated = axes.xtick_rotation.abs() >= 1.0;
        let y = frame.py.end;
        for (v, label) in ticks {
            let (x, _) = frame.data_px(*v, frame.y.start);
            if !inside(x, &frame.px) {
                continue;
            }
            root.draw(&PathElement::new(vec![(x, y), (x, y + TICK_LEN)], stroke))
                .map_err(backend_err)?;
            if text {
                let mut block = TextBlock::new(tick_px).aligned(HAlign::Center, VAlign::Top);
                block.vertical = rotated;
                block.draw(root, label, (x, y + TICK_LEN + 3))?;
            }
        }
    }
    if let Ticks::Fixed(ticks) = &axes.yticks {
        let x = frame.px.start;
        for (v, label) in ticks {
            let (_, y) = frame.data_px(frame.x.start, *v);
            if !inside(y, &frame.py) {
                continue;
            }
            root.draw(&PathElement::new(vec![(x - TICK_LEN, y), (x, y)], stroke))
                .map_err(backend_err)?;
            if text {
                TextBlock::new(tick_px)
                    .aligned(HAlign::Right, VAlign::Center)
                    .draw(root, label, (x - TICK_LEN - 3, y))?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::figure::LineArtist;

    fn line(points: Vec<(f64, f64)>) -> Artist {
        Artist::Line(LineArtist {
            label: String::new(),
            points,
            color: Rgba::BLACK,
            width: 1.0,
            dash: LineDash::Solid,
            marker: None,
        })
    }

    #[test]
    fn automatic_limits_are_padded() {
        let mut axes = Axes::default();
        axes.push(line(vec![(0.0, 10.0), (10.0, 20.0)]));
        let (x, y) = limits(&axes);
        assert_eq!(x, -0.5..10.5);
        assert_eq!(y, 9.5..20.5);
    }

    #[test]
    fn flat_data_gets_a_range() {
        let mut axes = Axes::default();
        axes.push(line(vec![(0.0, 3.0), (1.0, 3.0)]));
        let (_, y) = limits(&axes);
        assert_eq!(y, 2.0..4.0);
        let (x, _) = limits(&Axes::default());
        assert_eq!(x, 0.0..1.0);
    }

    #[test]
    fn equal_aspect_grows_the_short_side() {
        let (mut x, mut y) = (0.0..10.0, 0.0..10.0);
        equalize(&mut x, &mut y, 200, 100);
        assert_eq!(x, -5.0..15.0);
        assert_eq!(y, 0.0..10.0);
    }

    #[test]
    fn runs_split_on_gaps() {
        let pts = [(0.0, 1.0), (1.0, f64::NAN), (2.0, 2.0), (3.0, 3.0)];
        assert_eq!(runs(pts.len(), |i| finite(&pts[i])), vec![0..1, 2..4]);
    }

    #[test]
    fn frame_maps_blended_text() {
        let frame = PlotFrame {
            px: 100..300,
            py: 50..150,
            x: 0.0..10.0,
            y: 0.0..1.0,
        };
        let t = TextArtist::new("x", 1.0, 0.5, TextCoords::Blended);
        assert_eq!(frame.text_px(&t), (300, 100));
        assert_eq!(frame.data_px(5.0, 0.0), (200, 150));
    }
}
