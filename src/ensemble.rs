//! Middle/upper/lower decomposition of three-member ensembles.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::classify::ShapeCategory;
use crate::error::{PlotError, Result};
use crate::figure::LegendMode;
use crate::terms::{self, Locale};

static HAS_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9]{1,2}$|_[Mm]ax$|_[Mm]in$|_[Mm]ean$").expect("valid suffix regex")
});
static SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9]{1,2}$|[Mm]ax$|[Mm]in$|[Mm]ean$").expect("valid suffix regex")
});

/// Which line an ensemble member is drawn as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineSlot {
    Middle,
    Upper,
    Lower,
}

/// Source name per slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortedEnsembleLines {
    pub middle: String,
    pub upper: String,
    pub lower: String,
}

/// Trailing `NN`, `max`, `min` or `mean` of a member name.
pub fn get_suffix(name: &str) -> Result<String> {
    if !HAS_SUFFIX.is_match(name) {
        return Err(PlotError::value(format!("Mean, min or max not found in {name}")));
    }
    SUFFIX
        .find(name)
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| PlotError::value(format!("Mean, min or max not found in {name}")))
}

/// Slot for a suffix: `max` and percentiles >= 51 are upper, `min` and
/// percentiles <= 49 lower, `mean` and 50 middle.
pub fn slot_of(suffix: &str) -> Result<LineSlot> {
    match suffix {
        "max" | "Max" => Ok(LineSlot::Upper),
        "min" | "Min" => Ok(LineSlot::Lower),
        "mean" | "Mean" => Ok(LineSlot::Middle),
        digits => {
            let n: u32 = digits.parse().map_err(|_| {
                PlotError::value(r#"Arrays names must end in format "_mean" or "_p50" "#)
            })?;
            Ok(match n {
                51.. => LineSlot::Upper,
                50 => LineSlot::Middle,
                _ => LineSlot::Lower,
            })
        }
    }
}

/// Assign exactly one of three names to each slot.
pub fn sort_lines<S: AsRef<str>>(names: &[S]) -> Result<SortedEnsembleLines> {
    if names.len() != 3 {
        return Err(PlotError::value(format!(
            "Ensembles must contain exactly three arrays, got {}",
            names.len()
        )));
    }
    let (mut middle, mut upper, mut lower) = (None, None, None);
    for name in names {
        let name = name.as_ref();
        let slot = slot_of(&get_suffix(name)?)?;
        let target = match slot {
            LineSlot::Middle => &mut middle,
            LineSlot::Upper => &mut upper,
            LineSlot::Lower => &mut lower,
        };
        if let Some(prev) = target.replace(name.to_string()) {
            return Err(PlotError::value(format!(
                "'{prev}' and '{name}' both map to the {slot:?} line"
            )));
        }
    }
    match (middle, upper, lower) {
        (Some(middle), Some(upper), Some(lower)) => Ok(SortedEnsembleLines {
            middle,
            upper,
            lower,
        }),
        _ => Err(PlotError::value(
            "Ensembles need one middle, one upper and one lower member",
        )),
    }
}

/// Legend label of the shaded band. Only the `full` legend labels bands.
pub fn fill_between_label(
    sorted: &SortedEnsembleLines,
    category: ShapeCategory,
    legend: LegendMode,
    locale: Locale,
) -> Result<Option<String>> {
    if legend != LegendMode::Full {
        return Ok(None);
    }
    if category.is_percentile() {
        let lower = get_suffix(&sorted.lower)?;
        let upper = get_suffix(&sorted.upper)?;
        let template = terms::localized_term("{}th-{}th percentiles", locale);
        Ok(Some(terms::fill(&template, &[&lower, &upper])))
    } else if category == ShapeCategory::EnsStatsVarDs {
        Ok(Some(terms::localized_term("min-max range", locale)))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffixes() {
        assert_eq!(get_suffix("tas_p90").unwrap(), "90");
        assert_eq!(get_suffix("tas_Max").unwrap(), "Max");
        assert_eq!(get_suffix("5").unwrap(), "5");
        assert!(get_suffix("tasmax").is_err());
    }

    #[test]
    fn thresholds() {
        assert_eq!(slot_of("51").unwrap(), LineSlot::Upper);
        assert_eq!(slot_of("50").unwrap(), LineSlot::Middle);
        assert_eq!(slot_of("49").unwrap(), LineSlot::Lower);
    }

    #[test]
    fn every_slot_filled_once() {
        let sorted = sort_lines(&["x_max", "x_mean", "x_min"]).unwrap();
        assert_eq!(
            sorted,
            SortedEnsembleLines {
                middle: "x_mean".into(),
                upper: "x_max".into(),
                lower: "x_min".into(),
            }
        );

        let sorted = sort_lines(&["x_p90", "x_p10", "x_p50"]).unwrap();
        assert_eq!((sorted.lower.as_str(), sorted.middle.as_str()), ("x_p10", "x_p50"));
        assert_eq!(sorted.upper, "x_p90");

        let sorted = sort_lines(&["y_Min", "y_Max", "y_Mean"]).unwrap();
        assert_eq!(sorted.middle, "y_Mean");
        assert_eq!(sorted.upper, "y_Max");
        assert_eq!(sorted.lower, "y_Min");
    }

    #[test]
    fn wrong_count_or_unknown_suffix() {
        assert!(sort_lines(&["x_min", "x_max"]).is_err());
        assert!(sort_lines(&["x_min", "x_mean", "x_max", "x_p50"]).is_err());
        assert!(sort_lines(&["x_min", "x_total", "x_max"]).is_err());
    }

    #[test]
    fn band_label_by_category() {
        let pct = sort_lines(&["tas_p10", "tas_p50", "tas_p90"]).unwrap();
        assert_eq!(
            fill_between_label(&pct, ShapeCategory::EnsPctVarDs, LegendMode::Full, Locale::En)
                .unwrap()
                .as_deref(),
            Some("10th-90th percentiles")
        );
        assert_eq!(
            fill_between_label(&pct, ShapeCategory::EnsPctVarDs, LegendMode::Lines, Locale::En)
                .unwrap(),
            None
        );
        let stats = sort_lines(&["tas_min", "tas_mean", "tas_max"]).unwrap();
        assert_eq!(
            fill_between_label(&stats, ShapeCategory::EnsStatsVarDs, LegendMode::Full, Locale::En)
                .unwrap()
                .as_deref(),
            Some("min-max range")
        );
    }

    #[test]
    fn duplicate_slot_is_an_error() {
        assert!(sort_lines(&["x_p10", "x_p20", "x_p50"]).is_err());
        assert!(sort_lines(&["x_mean", "x_p50", "x_max"]).is_err());
    }
}
