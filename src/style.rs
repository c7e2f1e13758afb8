//! Colors, marker/dash vocabularies and the process-wide style.
//!
//! The active [`Style`] is global: [`set_style`] / [`use_styles`] affect
//! every figure created afterwards in this process until changed again.
//! Chart calls read it once at construction time.
//!
//! ```rust
//! use figanos::style;
//!
//! let diags = style::use_styles(&["ouranos", "poster"], true);
//! assert!(diags.is_empty());
//! assert_eq!(style::current_style().name, "ouranos+poster");
//! style::reset_style();
//! ```

use std::path::Path;
use std::sync::{LazyLock, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::diagnostics::{Diagnostic, DiagnosticKind};

/// RGBA color representation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    /// Create a new RGBA color.
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque RGB color.
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// From unit-range components.
    pub fn from_unit(r: f64, g: f64, b: f64, a: f64) -> Self {
        let q = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::new(q(r), q(g), q(b), q(a))
    }

    /// Unit-range components `(r, g, b)`.
    pub fn to_unit(self) -> (f64, f64, f64) {
        (
            self.r as f64 / 255.0,
            self.g as f64 / 255.0,
            self.b as f64 / 255.0,
        )
    }

    pub fn with_alpha(self, alpha: f64) -> Self {
        Self {
            a: (alpha.clamp(0.0, 1.0) * 255.0).round() as u8,
            ..self
        }
    }

    pub fn alpha(self) -> f64 {
        self.a as f64 / 255.0
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub const BLACK: Rgba = Rgba::rgb_const(0, 0, 0);
    pub const WHITE: Rgba = Rgba::rgb_const(255, 255, 255);

    pub(crate) const fn rgb_const(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

/// Marker shape for data points. Codes follow the usual one-character
/// plotting vocabulary (`o`, `s`, `D`, `^`, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarkerShape {
    Circle,
    Square,
    Triangle,
    TriangleDown,
    TriangleLeft,
    TriangleRight,
    Diamond,
    Pentagon,
    Star,
    Hexagon,
    Cross,
    X,
    VLine,
    HLine,
}

impl MarkerShape {
    pub fn from_code(code: &str) -> Option<Self> {
        Some(match code {
            "o" => MarkerShape::Circle,
            "s" => MarkerShape::Square,
            "^" => MarkerShape::Triangle,
            "v" => MarkerShape::TriangleDown,
            "<" => MarkerShape::TriangleLeft,
            ">" => MarkerShape::TriangleRight,
            "D" | "d" => MarkerShape::Diamond,
            "p" => MarkerShape::Pentagon,
            "*" => MarkerShape::Star,
            "h" | "H" => MarkerShape::Hexagon,
            "+" | "P" => MarkerShape::Cross,
            "x" | "X" => MarkerShape::X,
            "|" => MarkerShape::VLine,
            "_" => MarkerShape::HLine,
            _ => return None,
        })
    }
}

/// Sequence used to tell Taylor-diagram points apart.
pub const MARKER_SEQUENCE: &str = "oDv^<>p*hH+x|_";

/// Line dash pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineDash {
    Solid,
    Dash,
    Dot,
    DashDot,
}

impl LineDash {
    pub fn from_code(code: &str) -> Option<Self> {
        Some(match code {
            "-" | "solid" => LineDash::Solid,
            "--" | "dashed" => LineDash::Dash,
            ":" | "dotted" => LineDash::Dot,
            "-." | "dashdot" => LineDash::DashDot,
            _ => return None,
        })
    }
}

/// Microsoft Office (2013+) chart series palette, the default color cycle.
pub const OFFICE10: [Rgba; 10] = [
    Rgba::rgb_const(68, 114, 196),  // blue      (#4472C4)
    Rgba::rgb_const(237, 125, 49),  // orange    (#ED7D31)
    Rgba::rgb_const(165, 165, 165), // gray      (#A5A5A5)
    Rgba::rgb_const(255, 192, 0),   // gold      (#FFC000)
    Rgba::rgb_const(91, 155, 213),  // light blue(#5B9BD5)
    Rgba::rgb_const(112, 173, 71),  // green     (#70AD47)
    Rgba::rgb_const(38, 68, 120),   // dark blue (#264478)
    Rgba::rgb_const(158, 72, 14),   // dark org. (#9E480E)
    Rgba::rgb_const(99, 99, 99),    // dark gray (#636363)
    Rgba::rgb_const(153, 115, 0),   // brownish  (#997300)
];

const OURANOS: [Rgba; 8] = [
    Rgba::rgb_const(5, 41, 70),
    Rgba::rgb_const(206, 21, 61),
    Rgba::rgb_const(24, 187, 187),
    Rgba::rgb_const(253, 196, 20),
    Rgba::rgb_const(108, 194, 74),
    Rgba::rgb_const(0, 150, 215),
    Rgba::rgb_const(122, 80, 114),
    Rgba::rgb_const(0, 0, 0),
];

/// Global figure defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub name: String,
    pub color_cycle: Vec<Rgba>,
    pub line_width: f64,
    pub font_size: f64,
    pub figure_size: (u32, u32),
    pub transparent: bool,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            name: "default".into(),
            color_cycle: OFFICE10.to_vec(),
            line_width: 1.5,
            font_size: 12.0,
            figure_size: (800, 500),
            transparent: false,
        }
    }
}

impl Style {
    /// Color `idx` of the cycle (wrapping).
    pub fn cycle_color(&self, idx: usize) -> Rgba {
        if self.color_cycle.is_empty() {
            return OFFICE10[idx % OFFICE10.len()];
        }
        self.color_cycle[idx % self.color_cycle.len()]
    }

    fn apply(&mut self, name: &str, sheet: &StyleSheet) {
        if let Some(c) = &sheet.color_cycle {
            self.color_cycle = c.clone();
        }
        if let Some(v) = sheet.line_width {
            self.line_width = v;
        }
        if let Some(v) = sheet.font_size {
            self.font_size = v;
        }
        if let Some(v) = sheet.figure_size {
            self.figure_size = v;
        }
        if let Some(v) = sheet.transparent {
            self.transparent = v;
        }
        self.name = if self.name == "default" {
            name.to_string()
        } else {
            format!("{}+{}", self.name, name)
        };
    }
}

/// Partial style override; unset fields leave the current value in place.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleSheet {
    #[serde(default)]
    pub color_cycle: Option<Vec<Rgba>>,
    #[serde(default)]
    pub line_width: Option<f64>,
    #[serde(default)]
    pub font_size: Option<f64>,
    #[serde(default)]
    pub figure_size: Option<(u32, u32)>,
    #[serde(default)]
    pub transparent: Option<bool>,
}

/// Names accepted by [`use_styles`].
pub const BUILTIN_STYLES: [&str; 4] = ["ouranos", "paper", "poster", "transparent"];

fn builtin_sheet(name: &str) -> Option<StyleSheet> {
    match name {
        "ouranos" => Some(StyleSheet {
            color_cycle: Some(OURANOS.to_vec()),
            line_width: Some(1.5),
            ..StyleSheet::default()
        }),
        "paper" => Some(StyleSheet {
            font_size: Some(10.0),
            figure_size: Some((700, 450)),
            ..StyleSheet::default()
        }),
        "poster" => Some(StyleSheet {
            font_size: Some(18.0),
            line_width: Some(3.0),
            figure_size: Some((1200, 800)),
            ..StyleSheet::default()
        }),
        "transparent" => Some(StyleSheet {
            transparent: Some(true),
            ..StyleSheet::default()
        }),
        _ => None,
    }
}

static STYLE: LazyLock<RwLock<Style>> = LazyLock::new(|| RwLock::new(Style::default()));

/// Replace the process-wide style.
pub fn set_style(style: Style) {
    match STYLE.write() {
        Ok(mut guard) => *guard = style,
        Err(poisoned) => *poisoned.into_inner() = style,
    }
}

/// Snapshot of the process-wide style.
pub fn current_style() -> Style {
    match STYLE.read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// Back to the library defaults.
pub fn reset_style() {
    set_style(Style::default());
}

/// Apply named styles (built-in names or paths to JSON style sheets) on top
/// of the current style, optionally resetting first. Unknown names are
/// reported and skipped.
pub fn use_styles(names: &[&str], reset: bool) -> Vec<Diagnostic> {
    let mut style = if reset {
        Style::default()
    } else {
        current_style()
    };
    let mut diags = Vec::new();
    for name in names {
        let sheet = if name.ends_with(".json") {
            load_sheet(Path::new(name))
        } else {
            builtin_sheet(name)
        };
        match sheet {
            Some(sheet) => style.apply(name, &sheet),
            None => {
                let d = Diagnostic::new(
                    DiagnosticKind::StyleNotFound,
                    format!("Style {name} not found."),
                );
                log::warn!("{}", d.message);
                diags.push(d);
            }
        }
    }
    set_style(style);
    diags
}

fn load_sheet(path: &Path) -> Option<StyleSheet> {
    let text = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&text).ok()
}

fn named_color(name: &str) -> Option<Rgba> {
    Some(match name {
        "k" | "black" => Rgba::rgb(0, 0, 0),
        "w" | "white" => Rgba::rgb(255, 255, 255),
        "r" | "red" => Rgba::rgb(255, 0, 0),
        "g" | "green" => Rgba::rgb(0, 128, 0),
        "b" | "blue" => Rgba::rgb(0, 0, 255),
        "c" | "cyan" => Rgba::rgb(0, 191, 191),
        "m" | "magenta" => Rgba::rgb(191, 0, 191),
        "y" | "yellow" => Rgba::rgb(191, 191, 0),
        "gray" | "grey" => Rgba::rgb(128, 128, 128),
        "lightgray" | "lightgrey" => Rgba::rgb(211, 211, 211),
        "darkgray" | "darkgrey" => Rgba::rgb(169, 169, 169),
        "orange" => Rgba::rgb(255, 165, 0),
        "purple" => Rgba::rgb(128, 0, 128),
        "brown" => Rgba::rgb(165, 42, 42),
        "pink" => Rgba::rgb(255, 192, 203),
        "navy" => Rgba::rgb(0, 0, 128),
        "teal" => Rgba::rgb(0, 128, 128),
        "olive" => Rgba::rgb(128, 128, 0),
        _ => return None,
    })
}

fn parse_hex(s: &str) -> Option<Rgba> {
    let h = s.strip_prefix('#')?;
    let byte = |i: usize| u8::from_str_radix(h.get(i..i + 2)?, 16).ok();
    match h.len() {
        6 => Some(Rgba::rgb(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Rgba::new(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
        _ => None,
    }
}

/// Parse a color option: hex string, basic name, `C<n>` cycle reference,
/// grayscale string (`"0.5"`), or an `[r, g, b(, a)]` array in unit range or
/// 0-255.
pub fn parse_color(value: &Value) -> Option<Rgba> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Some(c) = parse_hex(s) {
                return Some(c);
            }
            if let Some(idx) = s.strip_prefix('C').and_then(|n| n.parse::<usize>().ok()) {
                return Some(current_style().cycle_color(idx));
            }
            if let Ok(gray) = s.parse::<f64>() {
                return Some(Rgba::from_unit(gray, gray, gray, 1.0));
            }
            named_color(&s.to_ascii_lowercase())
        }
        Value::Array(items) if items.len() == 3 || items.len() == 4 => {
            let comps: Vec<f64> = items.iter().filter_map(Value::as_f64).collect();
            if comps.len() != items.len() {
                return None;
            }
            let unit = comps[..3].iter().all(|c| *c <= 1.0);
            let scale = if unit { 1.0 } else { 255.0 };
            let alpha = comps.get(3).copied().unwrap_or(1.0);
            Some(Rgba::from_unit(
                comps[0] / scale,
                comps[1] / scale,
                comps[2] / scale,
                alpha,
            ))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rgba_creation() {
        let color = Rgba::rgb(255, 128, 64);
        assert_eq!(color.r, 255);
        assert_eq!(color.g, 128);
        assert_eq!(color.b, 64);
        assert_eq!(color.a, 255);
        assert_eq!(color.to_hex(), "#ff8040");
    }

    #[test]
    fn test_parse_color_forms() {
        assert_eq!(parse_color(&json!("#154504")), Some(Rgba::rgb(21, 69, 4)));
        assert_eq!(parse_color(&json!("k")), Some(Rgba::BLACK));
        assert_eq!(parse_color(&json!([1.0, 0.0, 0.0])), Some(Rgba::rgb(255, 0, 0)));
        assert_eq!(parse_color(&json!([0, 128, 255])), Some(Rgba::rgb(0, 128, 255)));
        assert_eq!(parse_color(&json!("0.0")), Some(Rgba::BLACK));
        assert_eq!(parse_color(&json!("not-a-color")), None);
        assert_eq!(parse_color(&json!(3)), None);
    }

    #[test]
    fn test_marker_and_dash_codes() {
        assert_eq!(MarkerShape::from_code("s"), Some(MarkerShape::Square));
        assert_eq!(MarkerShape::from_code("?"), None);
        assert_eq!(LineDash::from_code("--"), Some(LineDash::Dash));
        for ch in MARKER_SEQUENCE.chars() {
            assert!(MarkerShape::from_code(&ch.to_string()).is_some(), "{ch}");
        }
    }

    #[test]
    fn test_cycle_wraps() {
        let s = Style::default();
        assert_eq!(s.cycle_color(0), s.cycle_color(10));
    }
}
