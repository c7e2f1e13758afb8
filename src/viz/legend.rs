//! Legend layout and drawing: boxes inside the axes and external panels.

use std::ops::Range;

use anyhow::Result;
use plotters::coord::Shift;
use plotters::prelude::*;

use super::backend_err;
use super::glyph::{draw_hatch, draw_marker, draw_polyline};
use super::text::{TextBlock, estimate_text_width_px, line_height_px, wrap_text_to_width};
use super::util::{marker_radius_px, to_rgba};
use crate::figure::{Glyph, Legend, LegendEntry};
use crate::layout::{Anchor, HAlign, VAlign};
use crate::style::LineDash;

// Layout constants (shared by the estimator and the drawing code)
const GLYPH_W: i32 = 24;
const GLYPH_TO_TEXT: i32 = 8;
const TRAILING_GAP: i32 = 12;
const ROW_GAP: i32 = 4;
const PAD: i32 = 6;
const PAD_BAND: i32 = 8;

fn block_extra() -> i32 {
    GLYPH_W + GLYPH_TO_TEXT + TRAILING_GAP
}

/// Rows of entry indices and column positions of a TOP/BOTTOM legend band.
struct TableLayout {
    rows: Vec<Vec<usize>>,
    col_x: Vec<i32>,
    text_cap: Vec<u32>,
}

/// Greedy row packing, then per-column widths from the longest label of each
/// column. When those do not fit the band, columns fall back to uniform
/// slots and labels wrap.
fn table_layout(labels: &[&str], start_x: i32, total_w: i32, font_px: u32) -> TableLayout {
    let usable_row_w = total_w - PAD;
    let per_item_cap: i32 = ((usable_row_w - start_x) as f32 * 0.35).max(140.0) as i32;
    let block_width = |label: &str, cap: i32| -> i32 {
        let lines = wrap_text_to_width(label, font_px, cap.max(40) as u32);
        let widest = lines
            .iter()
            .map(|s| estimate_text_width_px(s, font_px) as i32)
            .max()
            .unwrap_or(0);
        widest + block_extra()
    };

    let mut rows: Vec<Vec<usize>> = Vec::new();
    let mut cur: Vec<usize> = Vec::new();
    let mut x = start_x;
    for (i, label) in labels.iter().enumerate() {
        let cap_now = ((usable_row_w - x).max(40) - block_extra()).min(per_item_cap);
        let mut w = block_width(label, cap_now);
        if x + w > usable_row_w && !cur.is_empty() {
            rows.push(std::mem::take(&mut cur));
            x = start_x;
            w = block_width(label, ((usable_row_w - start_x) - block_extra()).min(per_item_cap));
        }
        x += w;
        cur.push(i);
    }
    if !cur.is_empty() {
        rows.push(cur);
    }

    let k_cols = rows.iter().map(Vec::len).max().unwrap_or(1);
    let mut col_w = vec![60; k_cols];
    for row in &rows {
        for (ci, &i) in row.iter().enumerate() {
            let w = estimate_text_width_px(labels[i], font_px) as i32 + block_extra();
            col_w[ci] = col_w[ci].max(w);
        }
    }
    if start_x + col_w.iter().sum::<i32>() > usable_row_w {
        let uniform = ((usable_row_w - start_x) / k_cols as i32).max(60);
        col_w = vec![uniform; k_cols];
    }
    let col_x = col_w
        .iter()
        .scan(start_x, |acc, w| {
            let x = *acc;
            *acc += w;
            Some(x)
        })
        .collect();
    let text_cap = col_w.iter().map(|w| (w - block_extra()).max(40) as u32).collect();
    TableLayout {
        rows,
        col_x,
        text_cap,
    }
}

/// How tall a TOP/BOTTOM legend band must be to fit all entries, honoring
/// wrapping and multi-row flow. Returns pixels.
pub fn estimate_top_bottom_legend_height_px(
    legend: &Legend,
    start_x: i32,
    total_w: i32,
    font_px: u32,
) -> i32 {
    let labels: Vec<&str> = legend.entries.iter().map(|e| e.label.as_str()).collect();
    let layout = table_layout(&labels, start_x, total_w, font_px);
    let line_h = line_height_px(font_px) as i32;
    let mut height = PAD_BAND + title_height(legend, font_px);
    for (ri, row) in layout.rows.iter().enumerate() {
        let row_h = row
            .iter()
            .enumerate()
            .map(|(ci, &i)| wrap_text_to_width(labels[i], font_px, layout.text_cap[ci]).len().max(1) as i32 * line_h)
            .max()
            .unwrap_or(line_h);
        height += row_h;
        if ri + 1 < layout.rows.len() {
            height += ROW_GAP;
        }
    }
    height + PAD_BAND
}

fn title_height(legend: &Legend, font_px: u32) -> i32 {
    match legend.title.as_deref().filter(|t| !t.trim().is_empty()) {
        Some(t) => (t.lines().count() as u32 * line_height_px(font_px)) as i32 + 4,
        None => 0,
    }
}

/// Draw an entry's glyph in a `GLYPH_W` wide slot starting at `x`,
/// vertically centered on `y`.
fn draw_glyph<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    entry: &LegendEntry,
    x: i32,
    y: i32,
) -> Result<()> {
    let color = to_rgba(entry.color);
    match &entry.glyph {
        Glyph::Line { dash, width } => {
            draw_polyline(area, &[(x, y), (x + GLYPH_W, y)], color, *width, *dash)?;
        }
        Glyph::Patch => {
            area.draw(&Rectangle::new([(x, y - 5), (x + GLYPH_W, y + 5)], color.filled()))
                .map_err(backend_err)?;
        }
        Glyph::Marker { shape, size } => {
            let r = marker_radius_px(*size).min(GLYPH_W / 2);
            draw_marker(area, (x + GLYPH_W / 2, y), r, color, None, *shape)?;
        }
        Glyph::Hatch(pattern) => {
            let rect = ((x, y - 7), (x + GLYPH_W, y + 7));
            draw_hatch(area, rect, pattern, color)?;
            draw_polyline(
                area,
                &[(x, y - 7), (x + GLYPH_W, y - 7), (x + GLYPH_W, y + 7), (x, y + 7), (x, y - 7)],
                BLACK.to_rgba(),
                1.0,
                LineDash::Solid,
            )?;
        }
    }
    Ok(())
}

/// Draw one entry: glyph then wrapped label, top-aligned at `top`. Returns
/// the block height.
fn draw_entry<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    entry: &LegendEntry,
    (x, top): (i32, i32),
    lines: &[String],
    font_px: u32,
    text: bool,
) -> Result<i32> {
    let line_h = line_height_px(font_px) as i32;
    let block_h = lines.len().max(1) as i32 * line_h;
    draw_glyph(area, entry, x, top + line_h / 2)?;
    if text {
        TextBlock::new(font_px)
            .aligned(HAlign::Left, VAlign::Top)
            .draw(area, &lines.join("\n"), (x + GLYPH_W + GLYPH_TO_TEXT, top))?;
    }
    Ok(block_h)
}

/// Draw an external legend panel. Right: a single column. Top/Bottom: a
/// table whose columns line up across rows, starting at the plot's x axis.
pub fn draw_legend_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    legend: &Legend,
    vertical: bool,
    axis_x_start_px: i32,
    font_px: u32,
    text: bool,
) -> Result<()> {
    let (w, _) = area.dim_in_pixel();
    let w = w as i32;
    let title = legend.title.as_deref().filter(|t| !t.trim().is_empty());

    if vertical {
        let mut y = PAD + 6;
        if let Some(t) = title.filter(|_| text) {
            TextBlock::new(font_px)
                .aligned(HAlign::Left, VAlign::Top)
                .draw(area, t, (PAD, y))?;
            y += title_height(legend, font_px);
        }
        let max_text_w = (w - PAD * 2 - GLYPH_W - GLYPH_TO_TEXT).max(40) as u32;
        for entry in &legend.entries {
            let lines = wrap_text_to_width(&entry.label, font_px, max_text_w);
            y += draw_entry(area, entry, (PAD, y), &lines, font_px, text)? + ROW_GAP;
        }
        return Ok(());
    }

    let labels: Vec<&str> = legend.entries.iter().map(|e| e.label.as_str()).collect();
    let layout = table_layout(&labels, axis_x_start_px, w, font_px);
    let line_h = line_height_px(font_px) as i32;
    let mut y_top = PAD_BAND;
    if let Some(t) = title.filter(|_| text) {
        TextBlock::new(font_px)
            .aligned(HAlign::Left, VAlign::Top)
            .draw(area, t, (axis_x_start_px, y_top))?;
        y_top += title_height(legend, font_px);
    }
    for row in &layout.rows {
        let wrapped: Vec<Vec<String>> = row
            .iter()
            .enumerate()
            .map(|(ci, &i)| wrap_text_to_width(labels[i], font_px, layout.text_cap[ci]))
            .collect();
        let row_h = wrapped
            .iter()
            .map(|l| l.len().max(1) as i32 * line_h)
            .max()
            .unwrap_or(line_h);
        for (ci, &i) in row.iter().enumerate() {
            let block_h = wrapped[ci].len().max(1) as i32 * line_h;
            let top = y_top + (row_h - block_h) / 2;
            draw_entry(area, &legend.entries[i], (layout.col_x[ci], top), &wrapped[ci], font_px, text)?;
        }
        y_top += row_h + ROW_GAP;
    }
    Ok(())
}

/// Pixel size of a legend box drawn inside the axes.
pub fn inside_box_size(legend: &Legend, font_px: u32) -> (i32, i32) {
    let line_h = line_height_px(font_px) as i32;
    let widest = legend
        .entries
        .iter()
        .map(|e| e.label.lines().map(|l| estimate_text_width_px(l, font_px)).max().unwrap_or(0) as i32)
        .max()
        .unwrap_or(0);
    let title_w = legend
        .title
        .as_deref()
        .map(|t| t.lines().map(|l| estimate_text_width_px(l, font_px)).max().unwrap_or(0) as i32)
        .unwrap_or(0);
    let rows: i32 = legend
        .entries
        .iter()
        .map(|e| e.label.lines().count().max(1) as i32 * line_h + ROW_GAP)
        .sum();
    let w = (GLYPH_W + GLYPH_TO_TEXT + widest).max(title_w) + 2 * PAD;
    let h = title_height(legend, font_px) + rows - ROW_GAP + 2 * PAD;
    (w, h)
}

/// Draw a legend box inside the plotting area (pixel ranges `px`, `py`) so
/// that the anchor's box-alignment point sits on the anchor.
pub fn draw_inside_legend<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    legend: &Legend,
    anchor: &Anchor,
    (px, py): (&Range<i32>, &Range<i32>),
    font_px: u32,
    text: bool,
) -> Result<()> {
    if legend.entries.is_empty() {
        return Ok(());
    }
    let (w, h) = inside_box_size(legend, font_px);
    let ax = px.start + (anchor.x * (px.end - px.start) as f64).round() as i32;
    let ay = py.end - (anchor.y * (py.end - py.start) as f64).round() as i32;
    let left = ax - (anchor.box_align.0 * w as f64).round() as i32;
    let top = ay - ((1.0 - anchor.box_align.1) * h as f64).round() as i32;

    area.draw(&Rectangle::new([(left, top), (left + w, top + h)], WHITE.mix(0.85).filled()))
        .map_err(backend_err)?;
    area.draw(&Rectangle::new([(left, top), (left + w, top + h)], RGBColor(204, 204, 204).stroke_width(1)))
        .map_err(backend_err)?;

    let mut y = top + PAD;
    if let Some(t) = legend.title.as_deref().filter(|t| text && !t.trim().is_empty()) {
        TextBlock::new(font_px)
            .aligned(HAlign::Center, VAlign::Top)
            .draw(area, t, (left + w / 2, y))?;
        y += title_height(legend, font_px);
    }
    for entry in &legend.entries {
        let lines: Vec<String> = entry.label.lines().map(str::to_string).collect();
        y += draw_entry(area, entry, (left + PAD, y), &lines, font_px, text)? + ROW_GAP;
    }
    Ok(())
}
