//! Palette selection from the variable-name taxonomy, and value
//! normalization (linear, centered, or discrete levels).

use std::collections::BTreeMap;
use std::sync::LazyLock;

use ahash::AHashSet;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{PlotError, Result};
use crate::models::LabeledArray;
use crate::style::Rgba;

/// Number of entries in a continuous colormap.
pub const CMAP_N: usize = 256;

static VARIABLE_GROUPS: LazyLock<BTreeMap<String, String>> = LazyLock::new(|| {
    serde_json::from_str(include_str!("../data/variable_groups.json"))
        .expect("embedded variable_groups.json is valid")
});

// One regex per taxonomy key; the key must not sit inside a longer word.
static GROUP_PATTERNS: LazyLock<Vec<(Regex, String)>> = LazyLock::new(|| {
    VARIABLE_GROUPS
        .iter()
        .filter_map(|(key, group)| {
            let pat = format!(r"(?:^|[^a-zA-Z])({})(?:[^a-zA-Z]|$)", regex::escape(key));
            Regex::new(&pat).ok().map(|re| (re, group.clone()))
        })
        .collect()
});

macro_rules! palette {
    ($name:literal) => {
        (
            $name,
            include_str!(concat!(
                "../data/ipcc_colors/continuous_colormaps_rgb_0-255/",
                $name,
                ".txt"
            )),
        )
    };
}

static PALETTE_FILES: [(&str, &str); 18] = [
    palette!("temp_seq"),
    palette!("temp_div"),
    palette!("prec_seq"),
    palette!("prec_div"),
    palette!("wind_seq"),
    palette!("wind_div"),
    palette!("cryo_seq"),
    palette!("cryo_div"),
    palette!("chem_seq"),
    palette!("chem_div"),
    palette!("slev_seq"),
    palette!("slev_div"),
    palette!("misc_seq_1"),
    palette!("misc_seq_2"),
    palette!("misc_seq_3"),
    palette!("misc_div"),
    palette!("RdBu"),
    palette!("viridis"),
];

/// Names of the embedded palettes.
pub fn palette_names() -> impl Iterator<Item = &'static str> {
    PALETTE_FILES.iter().map(|(n, _)| *n)
}

fn groups_matching(text: &str) -> AHashSet<String> {
    GROUP_PATTERNS
        .iter()
        .filter(|(re, _)| re.is_match(text))
        .map(|(_, g)| g.clone())
        .collect()
}

/// Variable group of a name/history pair: the name is searched first, the
/// history only when the name matched nothing. Zero or several distinct
/// groups fall back to `misc`, each with its own diagnostic.
pub fn select_variable_group(
    name: Option<&str>,
    history: Option<&str>,
    diags: &mut Diagnostics,
) -> String {
    let mut matches = name.map(groups_matching).unwrap_or_default();
    if matches.is_empty() {
        if let Some(h) = history {
            matches = groups_matching(h);
        }
    }
    match matches.len() {
        1 => matches.into_iter().next().unwrap_or_else(|| "misc".to_string()),
        0 => {
            diags.warn(
                DiagnosticKind::VariableGroupNotFound,
                "Colormap warning: Variable group not found. Use the cmap argument.",
            );
            "misc".to_string()
        }
        _ => {
            let mut found: Vec<String> = matches.into_iter().collect();
            found.sort();
            diags.warn(
                DiagnosticKind::VariableGroupAmbiguous,
                format!(
                    "Colormap warning: More than one variable group found ({}). Use the cmap argument.",
                    found.join(", ")
                ),
            );
            "misc".to_string()
        }
    }
}

/// Variable group of an array (name, then `history` attribute).
pub fn var_group_of(array: &LabeledArray, diags: &mut Diagnostics) -> String {
    let history = array.attr_text("history");
    select_variable_group(array.name(), history.as_deref(), diags)
}

/// 256-entry continuous colormap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Colormap {
    pub name: String,
    colors: Vec<Rgba>,
}

impl Colormap {
    /// Linear interpolation between evenly spaced unit-range anchors.
    pub fn from_anchors(name: impl Into<String>, anchors: &[(f64, f64, f64)], n: usize) -> Self {
        let n = n.max(2);
        let colors = match anchors {
            [] => vec![Rgba::BLACK; n],
            [only] => vec![Rgba::from_unit(only.0, only.1, only.2, 1.0); n],
            _ => (0..n)
                .map(|i| {
                    let t = i as f64 / (n - 1) as f64 * (anchors.len() - 1) as f64;
                    let k = (t.floor() as usize).min(anchors.len() - 2);
                    let f = t - k as f64;
                    let (a, b) = (anchors[k], anchors[k + 1]);
                    Rgba::from_unit(
                        a.0 + (b.0 - a.0) * f,
                        a.1 + (b.1 - a.1) * f,
                        a.2 + (b.2 - a.2) * f,
                        1.0,
                    )
                })
                .collect(),
        };
        Self {
            name: name.into(),
            colors,
        }
    }

    pub fn reversed(&self) -> Self {
        let mut colors = self.colors.clone();
        colors.reverse();
        let name = match self.name.strip_suffix("_r") {
            Some(base) => base.to_string(),
            None => format!("{}_r", self.name),
        };
        Self { name, colors }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[Rgba] {
        &self.colors
    }

    /// Color at a unit-range position (clamped). NaN is fully transparent.
    pub fn at(&self, frac: f64) -> Rgba {
        if frac.is_nan() || self.colors.is_empty() {
            return Rgba::new(0, 0, 0, 0);
        }
        let i = (frac.clamp(0.0, 1.0) * (self.colors.len() - 1) as f64).round() as usize;
        self.colors[i]
    }

    /// Color of a data value under `norm`.
    pub fn map(&self, norm: &Normalization, value: f64) -> Rgba {
        self.at(norm.apply(value))
    }
}

fn parse_palette(name: &str, text: &str) -> Result<Colormap> {
    let mut anchors = Vec::new();
    for (ln, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let comps: Vec<f64> = line
            .split_whitespace()
            .map(|t| t.parse::<f64>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| PlotError::Resource {
                name: name.to_string(),
                reason: format!("line {}: {e}", ln + 1),
            })?;
        if comps.len() != 3 {
            return Err(PlotError::Resource {
                name: name.to_string(),
                reason: format!("line {}: expected 3 components, got {}", ln + 1, comps.len()),
            });
        }
        anchors.push((comps[0] / 255.0, comps[1] / 255.0, comps[2] / 255.0));
    }
    if anchors.is_empty() {
        return Err(PlotError::Resource {
            name: name.to_string(),
            reason: "no colors".into(),
        });
    }
    Ok(Colormap::from_anchors(name, &anchors, CMAP_N))
}

/// Load an embedded palette by file name. A `.txt` extension is ignored and
/// a `_r` suffix reverses the palette.
pub fn load_palette(filename: &str) -> Result<Colormap> {
    let mut base = filename.trim_end_matches(".txt");
    let mut reverse = false;
    if let Some(stripped) = base.strip_suffix("_r") {
        base = stripped;
        reverse = true;
    }
    let (name, text) = PALETTE_FILES
        .iter()
        .find(|(n, _)| *n == base)
        .ok_or_else(|| PlotError::Resource {
            name: filename.to_string(),
            reason: "Colormap not found".into(),
        })?;
    let cmap = parse_palette(name, text)?;
    Ok(if reverse { cmap.reversed() } else { cmap })
}

/// Palette file for a variable group: `{group}_div` when divergent, else
/// `{group}_seq`, with `misc` -> `misc_seq_3` and `misc2` -> `misc_seq_2`
/// (or `misc_div`).
pub fn palette_file_for(group: &str, divergent: bool) -> String {
    if divergent {
        let group = if group == "misc2" { "misc" } else { group };
        format!("{group}_div")
    } else {
        match group {
            "misc" => "misc_seq_3".to_string(),
            "misc2" => "misc_seq_2".to_string(),
            g => format!("{g}_seq"),
        }
    }
}

/// Build a colormap from an explicit file name, or from a variable group.
pub fn build_colormap(
    group: Option<&str>,
    divergent: bool,
    filename: Option<&str>,
) -> Result<Colormap> {
    match (filename, group) {
        (Some(f), _) => load_palette(f),
        (None, Some(g)) => load_palette(&palette_file_for(g, divergent)),
        (None, None) => Err(PlotError::value(
            "a variable group or a palette file name is required",
        )),
    }
}

/// Whether (and around which value) a palette diverges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum Divergent {
    #[default]
    Off,
    /// Centered on zero.
    Zero,
    /// Centered on the given value.
    At(f64),
}

impl Divergent {
    pub fn center(self) -> Option<f64> {
        match self {
            Divergent::Off => None,
            Divergent::Zero => Some(0.0),
            Divergent::At(c) => Some(c),
        }
    }

    pub fn is_on(self) -> bool {
        !matches!(self, Divergent::Off)
    }
}

impl From<bool> for Divergent {
    fn from(b: bool) -> Self {
        if b { Divergent::Zero } else { Divergent::Off }
    }
}

impl From<f64> for Divergent {
    fn from(c: f64) -> Self {
        Divergent::At(c)
    }
}

/// Discrete levels: a count, or explicit boundaries used verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Levels {
    Count(usize),
    Boundaries(Vec<f64>),
}

/// Maps data values onto [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Normalization {
    Linear { vmin: f64, vmax: f64 },
    TwoSlope { vmin: f64, center: f64, vmax: f64 },
    Boundary { boundaries: Vec<f64> },
}

impl Normalization {
    /// Unit-range position of `v`, clamped. NaN stays NaN.
    pub fn apply(&self, v: f64) -> f64 {
        if v.is_nan() {
            return f64::NAN;
        }
        let out = match self {
            Normalization::Linear { vmin, vmax } => {
                if vmax > vmin {
                    (v - vmin) / (vmax - vmin)
                } else {
                    0.5
                }
            }
            Normalization::TwoSlope { vmin, center, vmax } => {
                if v < *center {
                    if center > vmin {
                        0.5 * (v - vmin) / (center - vmin)
                    } else {
                        0.0
                    }
                } else if vmax > center {
                    0.5 + 0.5 * (v - center) / (vmax - center)
                } else {
                    1.0
                }
            }
            Normalization::Boundary { boundaries } => {
                let bins = boundaries.len().saturating_sub(1);
                if bins <= 1 {
                    0.5
                } else {
                    let i = boundaries
                        .iter()
                        .skip(1)
                        .position(|b| v < *b)
                        .unwrap_or(bins - 1);
                    i as f64 / (bins - 1) as f64
                }
            }
        };
        out.clamp(0.0, 1.0)
    }

    pub fn vmin(&self) -> f64 {
        match self {
            Normalization::Linear { vmin, .. } | Normalization::TwoSlope { vmin, .. } => *vmin,
            Normalization::Boundary { boundaries } => boundaries.first().copied().unwrap_or(0.0),
        }
    }

    pub fn vmax(&self) -> f64 {
        match self {
            Normalization::Linear { vmax, .. } | Normalization::TwoSlope { vmax, .. } => *vmax,
            Normalization::Boundary { boundaries } => boundaries.last().copied().unwrap_or(1.0),
        }
    }

    pub fn boundaries(&self) -> Option<&[f64]> {
        match self {
            Normalization::Boundary { boundaries } => Some(boundaries),
            _ => None,
        }
    }
}

/// Result of [`build_norm`]: a normalization, or the raw boundaries when
/// `linspace_out` was requested.
#[derive(Debug, Clone, PartialEq)]
pub enum NormOutput {
    Norm(Normalization),
    Boundaries(Vec<f64>),
}

impl NormOutput {
    /// The normalization, building a boundary one from raw boundaries.
    pub fn into_norm(self) -> Normalization {
        match self {
            NormOutput::Norm(n) => n,
            NormOutput::Boundaries(b) => Normalization::Boundary { boundaries: b },
        }
    }
}

/// Round `vmin` down and `vmax` up to a precision set by the span:
/// tens from 25, units from 1, tenths from 0.1, else hundredths.
pub fn nice_bounds(vmin: f64, vmax: f64) -> (f64, f64) {
    let span = vmax - vmin;
    let step = if span >= 25.0 {
        10.0
    } else if span >= 1.0 {
        1.0
    } else if span >= 0.1 {
        0.1
    } else {
        0.01
    };
    ((vmin / step).floor() * step, (vmax / step).ceil() * step)
}

/// `n` evenly spaced values from `a` to `b` inclusive.
pub fn linspace(a: f64, b: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![a],
        _ => (0..n)
            .map(|i| a + (b - a) * i as f64 / (n - 1) as f64)
            .collect(),
    }
}

/// Derive a normalization from data extrema.
///
/// - levels count + center: two linear halves meeting at the center
///   (center must lie strictly inside the rounded range);
/// - explicit boundaries: used verbatim, center ignored with a diagnostic;
/// - levels count alone: `levels + 1` evenly spaced boundaries;
/// - center alone: two-slope normalization;
/// - neither: linear.
///
/// With `linspace_out`, computed boundaries are returned raw.
pub fn build_norm(
    vmin: f64,
    vmax: f64,
    levels: Option<&Levels>,
    divergent: Divergent,
    linspace_out: bool,
    diags: &mut Diagnostics,
) -> Result<NormOutput> {
    let (rvmin, rvmax) = nice_bounds(vmin, vmax);
    let center = divergent.center();

    match (levels, center) {
        (Some(Levels::Count(n)), Some(c)) => {
            if c <= rvmin || c >= rvmax {
                return Err(PlotError::value(
                    "vmin, center and vmax must be in ascending order.",
                ));
            }
            let half = if n % 2 == 1 { (n + 1) / 2 + 1 } else { n / 2 + 1 };
            let mut lin = linspace(rvmin, c, half);
            lin.extend(linspace(c, rvmax, half).into_iter().skip(1));
            Ok(boundaries_out(lin, linspace_out))
        }
        (Some(Levels::Boundaries(b)), c) => {
            if c.is_some() {
                diags.warn(
                    DiagnosticKind::CenterIgnored,
                    "Divergent argument ignored when levels is a list. Use levels as a number instead.",
                );
            }
            Ok(NormOutput::Norm(Normalization::Boundary {
                boundaries: b.clone(),
            }))
        }
        (Some(Levels::Count(n)), None) => {
            Ok(boundaries_out(linspace(rvmin, rvmax, n + 1), linspace_out))
        }
        (None, Some(c)) => {
            if c <= rvmin || c >= rvmax {
                return Err(PlotError::value(
                    "vmin, center and vmax must be in ascending order.",
                ));
            }
            Ok(NormOutput::Norm(Normalization::TwoSlope {
                vmin: rvmin,
                center: c,
                vmax: rvmax,
            }))
        }
        (None, None) => Ok(NormOutput::Norm(Normalization::Linear {
            vmin: rvmin,
            vmax: rvmax,
        })),
    }
}

fn boundaries_out(lin: Vec<f64>, linspace_out: bool) -> NormOutput {
    if linspace_out {
        NormOutput::Boundaries(lin)
    } else {
        NormOutput::Norm(Normalization::Boundary { boundaries: lin })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_embedded_palette_parses() {
        for name in palette_names() {
            let c = load_palette(name).unwrap();
            assert_eq!(c.len(), CMAP_N, "{name}");
        }
    }

    #[test]
    fn reversed_suffix() {
        let a = load_palette("temp_seq").unwrap();
        let r = load_palette("temp_seq_r.txt").unwrap();
        assert_eq!(a.at(0.0), r.at(1.0));
        assert_eq!(r.name, "temp_seq_r");
    }

    #[test]
    fn palette_file_mapping() {
        assert_eq!(palette_file_for("misc", false), "misc_seq_3");
        assert_eq!(palette_file_for("misc2", false), "misc_seq_2");
        assert_eq!(palette_file_for("misc2", true), "misc_div");
        assert_eq!(palette_file_for("temp", true), "temp_div");
        assert_eq!(palette_file_for("prec", false), "prec_seq");
    }

    #[test]
    fn nice_bounds_by_span() {
        assert_eq!(nice_bounds(3.0, 41.0), (0.0, 50.0));
        assert_eq!(nice_bounds(0.2, 4.5), (0.0, 5.0));
        assert_eq!(nice_bounds(-2.4, 7.1), (-3.0, 8.0));
    }

    #[test]
    fn levels_around_a_center() {
        let mut d = Diagnostics::new();
        let err = build_norm(0.0, 30.0, Some(&Levels::Count(6)), Divergent::Zero, false, &mut d);
        assert!(matches!(err, Err(PlotError::Value(_))));

        let out = build_norm(-10.0, 10.0, Some(&Levels::Count(6)), Divergent::Zero, true, &mut d)
            .unwrap();
        let NormOutput::Boundaries(b) = out else {
            panic!("expected raw boundaries");
        };
        assert_eq!(b.len(), 7);
        assert!(b.contains(&0.0));
        assert_eq!((b[0], b[6]), (-10.0, 10.0));
    }

    #[test]
    fn norm_kind_follows_arguments() {
        let mut d = Diagnostics::new();
        let two = build_norm(-0.3, 29.7, None, Divergent::Zero, false, &mut d).unwrap();
        assert_eq!(
            two.into_norm(),
            Normalization::TwoSlope { vmin: -10.0, center: 0.0, vmax: 30.0 }
        );
        assert!(build_norm(1.0, 9.0, None, Divergent::Zero, false, &mut d).is_err());

        let even = build_norm(0.0, 10.0, Some(&Levels::Count(5)), Divergent::Off, false, &mut d)
            .unwrap();
        assert_eq!(even.into_norm().boundaries().map(<[f64]>::len), Some(6));

        let fixed = Levels::Boundaries(vec![0.0, 1.0, 5.0]);
        let verbatim = build_norm(0.0, 10.0, Some(&fixed), Divergent::Zero, false, &mut d).unwrap();
        assert_eq!(verbatim.into_norm().boundaries(), Some(&[0.0, 1.0, 5.0][..]));
        assert!(d.has(DiagnosticKind::CenterIgnored));

        let lin = build_norm(0.2, 4.5, None, Divergent::Off, false, &mut d).unwrap();
        assert_eq!(lin.into_norm(), Normalization::Linear { vmin: 0.0, vmax: 5.0 });
    }

    #[test]
    fn normalizations_map_into_unit_range() {
        let lin = Normalization::Linear { vmin: 0.0, vmax: 10.0 };
        assert_eq!(lin.apply(5.0), 0.5);
        assert_eq!(lin.apply(20.0), 1.0);
        let two = Normalization::TwoSlope {
            vmin: -2.0,
            center: 0.0,
            vmax: 10.0,
        };
        assert_eq!(two.apply(-1.0), 0.25);
        assert_eq!(two.apply(5.0), 0.75);
        let b = Normalization::Boundary {
            boundaries: vec![0.0, 1.0, 2.0, 3.0],
        };
        assert_eq!(b.apply(0.5), 0.0);
        assert_eq!(b.apply(1.5), 0.5);
        assert_eq!(b.apply(9.0), 1.0);
        assert!(b.apply(f64::NAN).is_nan());
    }
}
