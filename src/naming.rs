//! Climate-scenario naming conventions and their fixed colors.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::error::{PlotError, Result};
use crate::models::{DataInput, Entry, NamedData};
use crate::options::Kwargs;
use crate::style::Rgba;

static SCENARIO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(SSP|RCP|CMIP)([0-9]{1,3})").expect("valid scenario regex")
});

/// Reformat scenario shorthands: `ssp245` -> `SSP2-4.5`, `rcp45` -> `RCP4.5`,
/// `cmip6` -> `CMIP6`. Everything else is left untouched.
pub fn canonicalize(name: &str) -> String {
    SCENARIO
        .replace_all(name, |caps: &Captures| {
            let family = caps[1].to_uppercase();
            let digits: Vec<char> = caps[2].chars().collect();
            match digits.as_slice() {
                [a, b, c] => format!("{family}{a}-{b}.{c}"),
                [a, b] => format!("{family}{a}.{b}"),
                _ => caps[0].to_uppercase(),
            }
        })
        .into_owned()
}

/// One row of the ordered scenario color table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalColor {
    pub key: String,
    pub rgb: [u8; 3],
}

impl CategoricalColor {
    pub fn color(&self) -> Rgba {
        Rgba::rgb(self.rgb[0], self.rgb[1], self.rgb[2])
    }
}

static CATEGORICAL: LazyLock<Vec<CategoricalColor>> = LazyLock::new(|| {
    serde_json::from_str(include_str!("../data/categorical_colors.json"))
        .expect("embedded categorical_colors.json is valid")
});

/// The ordered scenario color table. Order matters: lookups are first-match.
pub fn categorical_colors() -> &'static [CategoricalColor] {
    &CATEGORICAL
}

/// Color of the first table key contained in `name`.
pub fn resolve_color(name: &str) -> Option<Rgba> {
    resolve_color_in(name, categorical_colors())
}

pub fn resolve_color_in(name: &str, table: &[CategoricalColor]) -> Option<Rgba> {
    table
        .iter()
        .find(|row| name.contains(row.key.as_str()))
        .map(CategoricalColor::color)
}

/// Normalize caller input into the mapping form with canonical keys.
/// Two keys collapsing onto the same canonical name is an error.
pub fn process_keys(data: DataInput) -> Result<NamedData> {
    let mut named = data.into_named();
    if named.bare {
        return Ok(named);
    }
    let mut out: Vec<(String, Entry)> = Vec::with_capacity(named.entries.len());
    for (k, e) in named.entries.drain(..) {
        let key = canonicalize(&k);
        if out.iter().any(|(existing, _)| *existing == key) {
            return Err(PlotError::value(format!(
                "keys collide after normalization: '{key}'"
            )));
        }
        out.push((key, e));
    }
    named.entries = out;
    Ok(named)
}

/// Apply [`canonicalize`] to option keys so that they keep matching the
/// data keys after normalization.
pub fn process_kw_keys(kw: &Kwargs) -> Result<Kwargs> {
    let mut out = Kwargs::new();
    for (k, v) in kw {
        let key = canonicalize(k);
        if out.contains_key(&key) {
            return Err(PlotError::value(format!(
                "option keys collide after normalization: '{key}'"
            )));
        }
        out.insert(key, v.clone());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_forms() {
        assert_eq!(canonicalize("ssp245"), "SSP2-4.5");
        assert_eq!(canonicalize("rcp45"), "RCP4.5");
        assert_eq!(canonicalize("cmip6"), "CMIP6");
        assert_eq!(canonicalize("tas_ssp585_p50"), "tas_SSP5-8.5_p50");
        assert_eq!(canonicalize("observations"), "observations");
    }

    #[test]
    fn canonical_forms_are_fixed_points() {
        for name in ["ssp245", "rcp45", "cmip6", "tas_ssp585_p50", "observations", "Ssp370-lowNTCF"] {
            let once = canonicalize(name);
            assert_eq!(canonicalize(&once), once, "{name}");
        }
    }

    #[test]
    fn table_is_embedded_and_ordered() {
        let t = categorical_colors();
        assert!(t.len() >= 11);
        assert_eq!(t[0].key, "SSP1-1.9");
    }
}
