//! Utility functions for rendering: colors, tick placement and locale-aware
//! tick labels.

use num_format::ToFormattedString;
use plotters::prelude::*;

use super::text::estimate_text_width_px;
use crate::style::Rgba;
use crate::terms::Locale;

/// Screen resolution used to turn point sizes into pixels.
pub const DPI: f64 = 100.0;

/// Convert a style color to the plotters color type.
#[inline]
pub fn to_rgba(c: Rgba) -> RGBAColor {
    RGBAColor(c.r, c.g, c.b, c.alpha())
}

/// Font size in pixels for a size in points.
pub fn font_px(points: f64) -> u32 {
    (points * DPI / 72.0).round().max(6.0) as u32
}

/// Stroke width in pixels for a width in points.
pub fn stroke_px(points: f64) -> f64 {
    (points * DPI / 72.0).max(1.0)
}

/// Radius in pixels of a marker whose area is `size` points squared.
pub fn marker_radius_px(size: f64) -> i32 {
    ((size.max(0.0).sqrt() / 2.0) * DPI / 72.0).round().max(1.0) as i32
}

/// Largest "nice" step (1, 2, 2.5 or 5 times a power of ten) giving at most
/// `max_ticks` intervals over `span`.
pub fn nice_step(span: f64, max_ticks: usize) -> f64 {
    if !(span.is_finite() && span > 0.0) || max_ticks == 0 {
        return 1.0;
    }
    let raw = span / max_ticks as f64;
    let mag = 10f64.powf(raw.log10().floor());
    [1.0, 2.0, 2.5, 5.0, 10.0]
        .into_iter()
        .map(|m| m * mag)
        .find(|s| *s >= raw)
        .unwrap_or(10.0 * mag)
}

/// Multiples of [`nice_step`] inside `[lo, hi]` (either order).
pub fn nice_ticks(lo: f64, hi: f64, max_ticks: usize) -> Vec<f64> {
    let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
    let step = nice_step(hi - lo, max_ticks);
    let scale = 10f64.powi(decimals_for(step) as i32 + 2);
    let mut out = Vec::new();
    let mut k = (lo / step).ceil();
    while k * step <= hi + step * 1e-9 {
        // 3 * 0.2 is 0.6000000000000001
        out.push((k * step * scale).round() / scale + 0.0);
        k += 1.0;
    }
    out
}

/// Decimals needed to tell ticks `step` apart.
fn decimals_for(step: f64) -> usize {
    if !(step.is_finite() && step > 0.0) || step >= 1.0 {
        return 0;
    }
    let d = (-step.log10()).ceil() as usize;
    // 0.25 needs two decimals, not one
    if ((step * 10f64.powi(d as i32)).round() - step * 10f64.powi(d as i32)).abs() > 1e-9 {
        d + 1
    } else {
        d
    }
}

/// Tick label with locale digit grouping (`30,000` vs `30 000`) and decimal
/// separator (`0.5` vs `0,5`).
pub fn format_tick(v: f64, step: f64, locale: Locale) -> String {
    if !v.is_finite() {
        return String::new();
    }
    let dec = decimals_for(step);
    let body = format!("{:.*}", dec, v.abs());
    let (int_part, frac_part) = match body.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (body.as_str(), None),
    };
    let grouped = int_part
        .parse::<u64>()
        .map(|n| n.to_formatted_string(locale.number_locale()))
        .unwrap_or_else(|_| int_part.to_string());
    let is_zero = body.chars().all(|c| c == '0' || c == '.');
    let mut out = String::new();
    if v < 0.0 && !is_zero {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(f) = frac_part {
        out.push(locale.decimal_separator());
        out.push_str(f);
    }
    out
}

/// Label of a decimal-year tick.
pub fn format_year(v: f64) -> String {
    format!("{}", v.round() as i64)
}

/// Width of the left label area: the widest tick label plus room for tick
/// marks, plus a column for the axis title when there is one.
pub fn compute_left_label_area_px(labels: &[String], font_px: u32, has_desc: bool) -> u32 {
    let widest = labels
        .iter()
        .map(|s| estimate_text_width_px(s, font_px))
        .max()
        .unwrap_or(0);
    let ticks = if labels.is_empty() {
        0
    } else {
        widest.saturating_add(14).clamp(28, 160)
    };
    let desc = if has_desc { font_px + 10 } else { 0 };
    ticks + desc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_are_nice() {
        assert_eq!(nice_step(10.0, 5), 2.0);
        assert_eq!(nice_step(1.0, 4), 0.25);
        assert_eq!(nice_step(700.0, 6), 200.0);
    }

    #[test]
    fn ticks_stay_in_range() {
        assert_eq!(nice_ticks(0.0, 1.0, 5), vec![0.0, 0.2, 0.4, 0.6, 0.8, 1.0]);
        assert_eq!(nice_ticks(3.0, -3.0, 3), vec![-2.0, 0.0, 2.0]);
    }

    #[test]
    fn tick_labels_follow_locale() {
        assert_eq!(format_tick(30000.0, 10000.0, Locale::En), "30,000");
        assert_eq!(format_tick(-0.25, 0.25, Locale::Fr), "-0,25");
        assert_eq!(format_tick(-0.0001, 0.5, Locale::En), "0.0");
        assert_eq!(format_year(2019.9), "2020");
    }

    #[test]
    fn label_area_grows_with_labels() {
        let short = compute_left_label_area_px(&["1".into()], 12, false);
        let long = compute_left_label_area_px(&["1,000,000".into()], 12, true);
        assert!(long > short);
        assert_eq!(compute_left_label_area_px(&[], 12, false), 0);
    }
}
