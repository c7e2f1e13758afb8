//! Pixel-space drawing primitives shared by the plotting area and legends:
//! markers, dashed strokes and hatch fills.

use anyhow::Result;
use plotters::coord::Shift;
use plotters::prelude::*;

use super::backend_err;
use crate::style::{LineDash, MarkerShape};

/// On/off lengths of a dash pattern, in multiples of the line width.
fn dash_pattern(dash: LineDash) -> Option<&'static [f64]> {
    match dash {
        LineDash::Solid => None,
        LineDash::Dash => Some(&[3.7, 1.6]),
        LineDash::Dot => Some(&[1.0, 1.65]),
        LineDash::DashDot => Some(&[6.4, 1.6, 1.0, 1.6]),
    }
}

/// Cut a polyline into the visible pieces of a dash pattern.
pub fn dash_polyline(points: &[(i32, i32)], dash: LineDash, width: f64) -> Vec<Vec<(i32, i32)>> {
    let Some(pattern) = dash_pattern(dash) else {
        return vec![points.to_vec()];
    };
    let scale = width.max(1.0);
    let lengths: Vec<f64> = pattern.iter().map(|l| l * scale).collect();
    let mut out = Vec::new();
    let mut current: Vec<(i32, i32)> = Vec::new();
    let (mut idx, mut left) = (0usize, lengths[0]);
    for seg in points.windows(2) {
        let (a, b) = ((seg[0].0 as f64, seg[0].1 as f64), (seg[1].0 as f64, seg[1].1 as f64));
        let len = ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt();
        let mut pos = 0.0;
        while pos < len {
            let step = left.min(len - pos);
            let at = |t: f64| {
                let f = t / len;
                ((a.0 + (b.0 - a.0) * f).round() as i32, (a.1 + (b.1 - a.1) * f).round() as i32)
            };
            if idx % 2 == 0 {
                if current.is_empty() {
                    current.push(at(pos));
                }
                current.push(at(pos + step));
            }
            pos += step;
            left -= step;
            if left <= 1e-9 {
                if idx % 2 == 0 && current.len() > 1 {
                    out.push(std::mem::take(&mut current));
                }
                current.clear();
                idx = (idx + 1) % lengths.len();
                left = lengths[idx];
            }
        }
    }
    if current.len() > 1 {
        out.push(current);
    }
    out
}

/// Stroke a polyline given in pixels.
pub fn draw_polyline<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    points: &[(i32, i32)],
    color: RGBAColor,
    width: f64,
    dash: LineDash,
) -> Result<()> {
    let style = ShapeStyle {
        color,
        filled: false,
        stroke_width: width.round().max(1.0) as u32,
    };
    for piece in dash_polyline(points, dash, width) {
        area.draw(&PathElement::new(piece, style))
            .map_err(backend_err)?;
    }
    Ok(())
}

/// Outline of a filled marker, relative to its center. `None` for markers
/// made of strokes only.
pub fn marker_outline(shape: MarkerShape, r: i32) -> Option<Vec<(i32, i32)>> {
    let regular = |n: usize, radius: f64, phase: f64| -> Vec<(i32, i32)> {
        (0..n)
            .map(|k| {
                let a = phase + k as f64 * std::f64::consts::TAU / n as f64;
                ((radius * a.cos()).round() as i32, (-radius * a.sin()).round() as i32)
            })
            .collect()
    };
    let rf = r as f64;
    let half_pi = std::f64::consts::FRAC_PI_2;
    Some(match shape {
        MarkerShape::Circle => regular(24, rf, 0.0),
        MarkerShape::Square => vec![(-r, -r), (r, -r), (r, r), (-r, r)],
        MarkerShape::Triangle => regular(3, rf * 1.2, half_pi),
        MarkerShape::TriangleDown => regular(3, rf * 1.2, -half_pi),
        MarkerShape::TriangleLeft => regular(3, rf * 1.2, std::f64::consts::PI),
        MarkerShape::TriangleRight => regular(3, rf * 1.2, 0.0),
        MarkerShape::Diamond => vec![(0, -r), (r, 0), (0, r), (-r, 0)],
        MarkerShape::Pentagon => regular(5, rf * 1.1, half_pi),
        MarkerShape::Hexagon => regular(6, rf * 1.1, half_pi),
        MarkerShape::Star => {
            let outer = regular(5, rf * 1.3, half_pi);
            let inner = regular(5, rf * 0.55, half_pi + std::f64::consts::PI / 5.0);
            outer.into_iter().zip(inner).flat_map(|(o, i)| [o, i]).collect()
        }
        MarkerShape::Cross | MarkerShape::X | MarkerShape::VLine | MarkerShape::HLine => {
            return None;
        }
    })
}

/// Draw a marker centered on `center`, in pixels.
pub fn draw_marker<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    center: (i32, i32),
    r: i32,
    fill: RGBAColor,
    edge: Option<RGBAColor>,
    shape: MarkerShape,
) -> Result<()> {
    let (x, y) = center;
    let shift = |pts: &[(i32, i32)]| pts.iter().map(|(dx, dy)| (x + dx, y + dy)).collect::<Vec<_>>();
    match marker_outline(shape, r) {
        Some(outline) => {
            let pts = shift(&outline);
            area.draw(&Polygon::new(pts.clone(), fill.filled()))
                .map_err(backend_err)?;
            if let Some(edge) = edge {
                let mut ring = pts;
                ring.push(ring[0]);
                area.draw(&PathElement::new(ring, edge.stroke_width(1)))
                    .map_err(backend_err)?;
            }
        }
        None => {
            let strokes: &[[(i32, i32); 2]] = match shape {
                MarkerShape::Cross => &[[(-1, 0), (1, 0)], [(0, -1), (0, 1)]],
                MarkerShape::X => &[[(-1, -1), (1, 1)], [(-1, 1), (1, -1)]],
                MarkerShape::VLine => &[[(0, -1), (0, 1)]],
                _ => &[[(-1, 0), (1, 0)]],
            };
            for [a, b] in strokes {
                area.draw(&PathElement::new(
                    vec![(x + a.0 * r, y + a.1 * r), (x + b.0 * r, y + b.1 * r)],
                    fill.stroke_width(2),
                ))
                .map_err(backend_err)?;
            }
        }
    }
    Ok(())
}

/// Base spacing in pixels of a hatch drawn with one pattern character.
const HATCH_SPACING: f64 = 10.0;

/// Line segments and dots of a hatch pattern inside a pixel rectangle.
/// Repeating a character (`//`, `xxx`) makes the pattern denser.
/// Positions are aligned on a global grid so neighbouring cells join up.
pub fn hatch_segments(
    rect: ((i32, i32), (i32, i32)),
    pattern: &str,
) -> (Vec<[(i32, i32); 2]>, Vec<(i32, i32)>) {
    let ((x0, y0), (x1, y1)) = rect;
    let (x0, x1) = (x0.min(x1) as f64, x0.max(x1) as f64);
    let (y0, y1) = (y0.min(y1) as f64, y0.max(y1) as f64);
    let count = |chars: &[char]| pattern.chars().filter(|c| chars.contains(c)).count();
    let mut lines = Vec::new();
    let mut dots = Vec::new();
    let px = |x: f64, y: f64| (x.round() as i32, y.round() as i32);

    let family = |n: usize| HATCH_SPACING / n.max(1) as f64;
    let grid = |lo: f64, hi: f64, s: f64| {
        let mut out = Vec::new();
        let mut c = (lo / s).ceil() * s;
        while c <= hi {
            out.push(c);
            c += s;
        }
        out
    };

    let n = count(&['/', 'x', 'X']);
    if n > 0 {
        // x + y = c
        for c in grid(x0 + y0, x1 + y1, family(n) * std::f64::consts::SQRT_2) {
            let (xa, xb) = ((c - y1).max(x0), (c - y0).min(x1));
            if xa < xb {
                lines.push([px(xa, c - xa), px(xb, c - xb)]);
            }
        }
    }
    let n = count(&['\\', 'x', 'X']);
    if n > 0 {
        // y - x = c
        for c in grid(y0 - x1, y1 - x0, family(n) * std::f64::consts::SQRT_2) {
            let (xa, xb) = ((y0 - c).max(x0), (y1 - c).min(x1));
            if xa < xb {
                lines.push([px(xa, xa + c), px(xb, xb + c)]);
            }
        }
    }
    let n = count(&['|', '+']);
    if n > 0 {
        for x in grid(x0, x1, family(n)) {
            lines.push([px(x, y0), px(x, y1)]);
        }
    }
    let n = count(&['-', '+']);
    if n > 0 {
        for y in grid(y0, y1, family(n)) {
            lines.push([px(x0, y), px(x1, y)]);
        }
    }
    let n = count(&['.', 'o', 'O', '*']);
    if n > 0 {
        let s = family(n);
        for y in grid(y0, y1, s) {
            for x in grid(x0, x1, s) {
                dots.push(px(x, y));
            }
        }
    }
    (lines, dots)
}

/// Fill a pixel rectangle with a hatch pattern.
pub fn draw_hatch<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    rect: ((i32, i32), (i32, i32)),
    pattern: &str,
    color: RGBAColor,
) -> Result<()> {
    let (lines, dots) = hatch_segments(rect, pattern);
    let stroke = color.stroke_width(1);
    for [a, b] in lines {
        area.draw(&PathElement::new(vec![a, b], stroke))
            .map_err(backend_err)?;
    }
    let radius = if pattern.contains(['o', 'O']) { 2 } else { 1 };
    let hollow = pattern.contains(['o', 'O']);
    for d in dots {
        let style = if hollow { stroke } else { color.filled() };
        area.draw(&Circle::new(d, radius, style))
            .map_err(backend_err)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_lines_are_untouched() {
        let pts = vec![(0, 0), (10, 0)];
        assert_eq!(dash_polyline(&pts, LineDash::Solid, 1.0), vec![pts]);
    }

    #[test]
    fn dashes_alternate() {
        let pieces = dash_polyline(&[(0, 0), (100, 0)], LineDash::Dash, 2.0);
        // 7.4 px on, 3.2 px off
        assert!(pieces.len() >= 9);
        assert_eq!(pieces[0], vec![(0, 0), (7, 0)]);
        assert_eq!(pieces[1][0], (11, 0));
    }

    #[test]
    fn denser_hatch_has_more_lines() {
        let rect = ((0, 0), (40, 40));
        let (single, _) = hatch_segments(rect, "/");
        let (double, _) = hatch_segments(rect, "//");
        assert!(double.len() > single.len());
        let (cross, _) = hatch_segments(rect, "x");
        assert_eq!(cross.len(), 2 * single.len());
        let (lines, dots) = hatch_segments(rect, "..");
        assert!(lines.is_empty() && !dots.is_empty());
    }

    #[test]
    fn stroke_markers_have_no_outline() {
        assert!(marker_outline(MarkerShape::X, 4).is_none());
        assert_eq!(marker_outline(MarkerShape::Square, 2).unwrap().len(), 4);
    }
}
