//! Colorbar panel drawn next to (vertical) or below (horizontal) the axes.

use anyhow::Result;
use plotters::coord::Shift;
use plotters::prelude::*;

use super::backend_err;
use super::text::{TextBlock, block_size_px};
use super::util::{format_tick, nice_step, nice_ticks, to_rgba};
use crate::colormap::Normalization;
use crate::figure::{Colorbar, Orientation};
use crate::layout::{HAlign, VAlign};
use crate::terms::Locale;

/// Width of a vertical colorbar panel.
pub const PANEL_W: i32 = 110;
/// Height of a horizontal colorbar panel, label excluded.
pub const PANEL_H: i32 = 64;
const BAR_THICKNESS: i32 = 18;
const STRIPS: usize = 128;
const TICK_LEN: i32 = 4;

/// Extra height a horizontal colorbar needs for its label.
pub fn label_height_px(cb: &Colorbar, font_px: u32) -> i32 {
    cb.label
        .as_deref()
        .map(|l| block_size_px(l, font_px).1 as i32 + 4)
        .unwrap_or(0)
}

/// Position of a value along the bar, in [0, 1]. Discrete bins are spaced
/// evenly whatever their width.
pub fn bar_fraction(norm: &Normalization, v: f64) -> f64 {
    match norm {
        Normalization::Boundary { boundaries } if boundaries.len() > 1 => {
            let bins = (boundaries.len() - 1) as f64;
            let k = boundaries.iter().skip(1).position(|b| v <= *b).unwrap_or(boundaries.len() - 2);
            let (lo, hi) = (boundaries[k], boundaries[k + 1]);
            let within = if hi > lo { ((v - lo) / (hi - lo)).clamp(0.0, 1.0) } else { 0.0 };
            ((k as f64 + within) / bins).clamp(0.0, 1.0)
        }
        other => other.apply(v),
    }
}

/// Colored `(from, to, color)` pieces of the bar, as fractions of its
/// length.
fn bar_pieces(cb: &Colorbar) -> Vec<(f64, f64, RGBAColor)> {
    match cb.norm.boundaries() {
        Some(b) if b.len() > 1 => {
            let bins = b.len() - 1;
            (0..bins)
                .map(|i| {
                    let mid = (b[i] + b[i + 1]) / 2.0;
                    let color = to_rgba(cb.cmap.map(&cb.norm, mid));
                    (i as f64 / bins as f64, (i + 1) as f64 / bins as f64, color)
                })
                .collect()
        }
        _ => (0..STRIPS)
            .map(|i| {
                let t = (i as f64 + 0.5) / STRIPS as f64;
                (i as f64 / STRIPS as f64, (i + 1) as f64 / STRIPS as f64, to_rgba(cb.cmap.at(t)))
            })
            .collect(),
    }
}

/// Ticks of the bar: explicit ones, else nice values over the norm's range.
fn bar_ticks(cb: &Colorbar) -> Vec<f64> {
    match &cb.ticks {
        Some(t) => t.clone(),
        None => nice_ticks(cb.norm.vmin(), cb.norm.vmax(), 6),
    }
}

/// Draw the bar inside `area`. `span` is the pixel extent along the bar
/// (y range for vertical bars, x range for horizontal ones), chosen to line
/// up with the plotting area.
pub fn draw_colorbar<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    cb: &Colorbar,
    span: (i32, i32),
    locale: Locale,
    font_px: u32,
    text: bool,
) -> Result<()> {
    let vertical = cb.orientation == Orientation::Vertical;
    let (lo, hi) = span;
    let len = (hi - lo).max(1) as f64;
    let cross = 10;
    let at = |f: f64| -> i32 {
        if vertical {
            hi - (f * len).round() as i32
        } else {
            lo + (f * len).round() as i32
        }
    };
    let rect = |a: i32, b: i32| -> [(i32, i32); 2] {
        if vertical {
            [(cross, a), (cross + BAR_THICKNESS, b)]
        } else {
            [(a, cross), (b, cross + BAR_THICKNESS)]
        }
    };

    for (f0, f1, color) in bar_pieces(cb) {
        area.draw(&Rectangle::new(rect(at(f0), at(f1)), color.filled()))
            .map_err(backend_err)?;
    }
    area.draw(&Rectangle::new(rect(at(0.0), at(1.0)), BLACK.stroke_width(1)))
        .map_err(backend_err)?;

    let ticks = bar_ticks(cb);
    let step = ticks
        .windows(2)
        .map(|w| (w[1] - w[0]).abs())
        .filter(|d| *d > 0.0)
        .fold(f64::INFINITY, f64::min);
    let step = if step.is_finite() {
        step
    } else {
        nice_step(cb.norm.vmax() - cb.norm.vmin(), 6)
    };
    let label_style = TextBlock::new(font_px.saturating_sub(2).max(6));
    let edge = cross + BAR_THICKNESS;
    let mut label_extent = 0;
    for t in ticks.iter().filter(|t| t.is_finite()) {
        let p = at(bar_fraction(&cb.norm, *t));
        let (tick, anchor) = if vertical {
            ([(edge, p), (edge + TICK_LEN, p)], (edge + TICK_LEN + 3, p))
        } else {
            ([(p, edge), (p, edge + TICK_LEN)], (p, edge + TICK_LEN + 2))
        };
        area.draw(&PathElement::new(tick.to_vec(), BLACK.stroke_width(1)))
            .map_err(backend_err)?;
        if !text {
            continue;
        }
        let label = format_tick(*t, step, locale);
        let (w, h) = block_size_px(&label, label_style.font_px);
        let extent = if vertical { w } else { h };
        label_extent = label_extent.max(extent as i32);
        let block = if vertical {
            label_style.aligned(HAlign::Left, VAlign::Center)
        } else {
            label_style.aligned(HAlign::Center, VAlign::Top)
        };
        block.draw(area, &label, anchor)?;
    }

    if let Some(label) = cb.label.as_deref().filter(|_| text) {
        let offset = edge + TICK_LEN + 6 + label_extent;
        let mid = (lo + hi) / 2;
        let mut block = TextBlock::new(font_px);
        if vertical {
            block.vertical = true;
            block.aligned(HAlign::Left, VAlign::Center).draw(area, label, (offset, mid))?;
        } else {
            block.aligned(HAlign::Center, VAlign::Top).draw(area, label, (mid, offset))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_bins_are_even() {
        let norm = Normalization::Boundary {
            boundaries: vec![0.0, 1.0, 10.0],
        };
        assert_eq!(bar_fraction(&norm, 0.0), 0.0);
        assert_eq!(bar_fraction(&norm, 1.0), 0.5);
        assert_eq!(bar_fraction(&norm, 5.5), 0.75);
        assert_eq!(bar_fraction(&norm, 10.0), 1.0);
    }

    #[test]
    fn two_slope_centers_the_bar() {
        let norm = Normalization::TwoSlope {
            vmin: -1.0,
            center: 0.0,
            vmax: 4.0,
        };
        assert_eq!(bar_fraction(&norm, 0.0), 0.5);
    }
}
