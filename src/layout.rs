//! Text wrapping and location placement.

use serde::{Deserialize, Serialize};

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{PlotError, Result};

/// Wrap `text` greedily, inserting a line break at the first `". "`, else the
/// first `": "`, else the last space found in the `[min_line_len,
/// max_line_len)` window after the previous break. Text shorter than
/// `max_line_len` is returned unchanged.
///
/// A window without any break point stops wrapping and records a
/// [`DiagnosticKind::TextUnbreakable`] diagnostic; the remainder is left as is.
pub fn wrap_text(
    text: &str,
    min_line_len: usize,
    max_line_len: usize,
    diags: &mut Diagnostics,
) -> String {
    let (out, stuck) = wrap_chars(text, min_line_len, max_line_len);
    if stuck {
        diags.warn(
            DiagnosticKind::TextUnbreakable,
            "No spaces, points or colons to break line at.",
        );
    }
    out
}

/// [`wrap_text`] with the usual defaults (18, 30), logging instead of collecting.
pub fn wrap_text_default(text: &str) -> String {
    let mut d = Diagnostics::new();
    wrap_text(text, 18, 30, &mut d)
}

fn find_in(chars: &[char], pat: &[char], start: usize, stop: usize) -> Option<usize> {
    let stop = stop.min(chars.len());
    if start >= stop || stop - start < pat.len() {
        return None;
    }
    (start..=stop - pat.len()).find(|i| chars[*i..*i + pat.len()] == *pat)
}

fn rfind_in(chars: &[char], ch: char, start: usize, stop: usize) -> Option<usize> {
    let stop = stop.min(chars.len());
    (start..stop).rev().find(|i| chars[*i] == ch)
}

fn wrap_chars(text: &str, min_line_len: usize, max_line_len: usize) -> (String, bool) {
    let mut chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    if len < max_line_len {
        return (text.to_string(), false);
    }
    let mut start = min_line_len;
    let mut stop = max_line_len;
    let mut remaining = len;
    let mut stuck = false;
    while remaining > max_line_len {
        let pos = if let Some(p) = find_in(&chars, &['.', ' '], start, stop) {
            p + 1
        } else if let Some(p) = find_in(&chars, &[':', ' '], start, stop) {
            p + 1
        } else if let Some(p) = rfind_in(&chars, ' ', start, stop) {
            p
        } else {
            stuck = true;
            break;
        };
        chars[pos] = '\n';
        remaining = len - pos;
        start = pos + 1 + min_line_len;
        stop = pos + 1 + max_line_len;
    }
    (chars.into_iter().collect(), stuck)
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HAlign {
    Left,
    Center,
    Right,
}

/// Vertical text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VAlign {
    Top,
    Center,
    Bottom,
}

/// A legend-style location: a name (`"upper right"`), a code 1-10, or a
/// point in axes fractions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Loc {
    Name(String),
    Code(i64),
    Fraction(f64, f64),
}

impl From<&str> for Loc {
    fn from(s: &str) -> Self {
        Loc::Name(s.to_string())
    }
}

impl From<i64> for Loc {
    fn from(c: i64) -> Self {
        Loc::Code(c)
    }
}

impl From<(f64, f64)> for Loc {
    fn from(p: (f64, f64)) -> Self {
        Loc::Fraction(p.0, p.1)
    }
}

/// Resolved placement in axes fractions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub x: f64,
    pub y: f64,
    /// Which point of the text box sits on `(x, y)`, in box fractions.
    pub box_align: (f64, f64),
    pub ha: HAlign,
    pub va: VAlign,
}

pub const LOC_NAMES: [&str; 10] = [
    "upper right",
    "upper left",
    "lower left",
    "lower right",
    "right",
    "center left",
    "center right",
    "lower center",
    "upper center",
    "center",
];

impl Loc {
    pub fn resolve(&self) -> Result<Anchor> {
        match self {
            Loc::Code(c) => {
                let idx = usize::try_from(*c - 1)
                    .ok()
                    .filter(|i| *i < LOC_NAMES.len())
                    .ok_or_else(|| PlotError::value("loc must be between 1 and 10, inclusively"))?;
                resolve_name(LOC_NAMES[idx])
            }
            Loc::Name(n) => resolve_name(n),
            Loc::Fraction(x, y) => {
                let mut box_a = [0.0; 2];
                for (i, v) in [*x, *y].iter().enumerate() {
                    if !(0.0..=1.0).contains(v) {
                        return Err(PlotError::value(
                            "Text location coordinates must be between 0 and 1, inclusively",
                        ));
                    }
                    box_a[i] = if *v > 0.5 { 1.0 } else { 0.0 };
                }
                Ok(Anchor {
                    x: *x,
                    y: *y,
                    box_align: (box_a[0], box_a[1]),
                    ha: HAlign::Left,
                    va: VAlign::Bottom,
                })
            }
        }
    }
}

fn resolve_name(name: &str) -> Result<Anchor> {
    if !LOC_NAMES.contains(&name) {
        return Err(PlotError::value(format!(
            "unknown location '{name}'; expected one of {LOC_NAMES:?}"
        )));
    }
    let ha = if name.contains("left") {
        HAlign::Left
    } else if name.contains("right") {
        HAlign::Right
    } else {
        HAlign::Center
    };
    let va = if name.contains("lower") {
        VAlign::Bottom
    } else if name.contains("upper") {
        VAlign::Top
    } else {
        VAlign::Center
    };
    let ((x, y), box_align) = match name {
        "upper right" => ((0.97, 0.97), (1.0, 1.0)),
        "upper left" => ((0.03, 0.97), (0.0, 1.0)),
        "lower left" => ((0.03, 0.03), (0.0, 0.0)),
        "lower right" => ((0.97, 0.03), (1.0, 0.0)),
        "right" => ((0.97, 0.5), (1.0, 0.5)),
        "center right" => ((0.97, 0.5), (0.97, 0.5)),
        "center left" => ((0.03, 0.5), (0.0, 0.5)),
        "lower center" => ((0.5, 0.03), (0.5, 0.0)),
        "upper center" => ((0.5, 0.97), (0.5, 1.0)),
        _ => ((0.5, 0.5), (0.5, 0.5)),
    };
    Ok(Anchor {
        x,
        y,
        box_align,
        ha,
        va,
    })
}
