//! Shape classification of named entries.
//!
//! Every entry maps to exactly one [`ShapeCategory`]. Checks run in a fixed
//! priority order: percentile-suffixed variables, then statistic-suffixed
//! variables, then a `percentiles` dimension, then a `realization`
//! dimension, then the plain default.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::{Entry, LabeledArray, LabeledTable};

pub const PERCENTILES_DIM: &str = "percentiles";
pub const REALIZATION_DIM: &str = "realization";

static PCT_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_p[0-9]{1,2}").expect("valid percentile regex"));
static STATS_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_[Mm]ax|_[Mm]in").expect("valid statistics regex"));

/// Ensemble representation convention of one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeCategory {
    /// Table with at least two `_pNN` variables.
    EnsPctVarDs,
    /// Table with at least two `_min`/`_max` variables.
    EnsStatsVarDs,
    /// Table with a `percentiles` dimension.
    EnsPctDimDs,
    /// Array with a `percentiles` dimension.
    EnsPctDimDa,
    /// Table with a `realization` dimension.
    EnsRealsDs,
    /// Array with a `realization` dimension.
    EnsRealsDa,
    /// Table without ensemble signature.
    Ds,
    /// Array without ensemble signature.
    Da,
}

impl ShapeCategory {
    pub const ALL: [ShapeCategory; 8] = [
        ShapeCategory::EnsPctVarDs,
        ShapeCategory::EnsStatsVarDs,
        ShapeCategory::EnsPctDimDs,
        ShapeCategory::EnsPctDimDa,
        ShapeCategory::EnsRealsDs,
        ShapeCategory::EnsRealsDa,
        ShapeCategory::Ds,
        ShapeCategory::Da,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ShapeCategory::EnsPctVarDs => "ENS_PCT_VAR_DS",
            ShapeCategory::EnsStatsVarDs => "ENS_STATS_VAR_DS",
            ShapeCategory::EnsPctDimDs => "ENS_PCT_DIM_DS",
            ShapeCategory::EnsPctDimDa => "ENS_PCT_DIM_DA",
            ShapeCategory::EnsRealsDs => "ENS_REALS_DS",
            ShapeCategory::EnsRealsDa => "ENS_REALS_DA",
            ShapeCategory::Ds => "DS",
            ShapeCategory::Da => "DA",
        }
    }

    /// Categories whose band is labelled as a percentile range.
    pub fn is_percentile(self) -> bool {
        matches!(
            self,
            ShapeCategory::EnsPctVarDs | ShapeCategory::EnsPctDimDs | ShapeCategory::EnsPctDimDa
        )
    }
}

impl fmt::Display for ShapeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify one entry. Pure and total.
pub fn classify(entry: &Entry) -> ShapeCategory {
    match entry {
        Entry::Table(t) => classify_table(t),
        Entry::Array(a) => classify_array(a),
    }
}

pub fn classify_table(table: &LabeledTable) -> ShapeCategory {
    let names = table.var_names();
    let pct = names.iter().filter(|n| PCT_VAR.is_match(n)).count();
    let stats = names.iter().filter(|n| STATS_VAR.is_match(n)).count();
    if pct >= 2 {
        ShapeCategory::EnsPctVarDs
    } else if stats >= 2 {
        ShapeCategory::EnsStatsVarDs
    } else if table.has_dim(PERCENTILES_DIM) {
        ShapeCategory::EnsPctDimDs
    } else if table.has_dim(REALIZATION_DIM) {
        ShapeCategory::EnsRealsDs
    } else {
        ShapeCategory::Ds
    }
}

pub fn classify_array(array: &LabeledArray) -> ShapeCategory {
    if array.has_dim(PERCENTILES_DIM) {
        ShapeCategory::EnsPctDimDa
    } else if array.has_dim(REALIZATION_DIM) {
        ShapeCategory::EnsRealsDa
    } else {
        ShapeCategory::Da
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regexes_search_anywhere_in_name() {
        assert!(PCT_VAR.is_match("tx_max_p50"));
        assert!(PCT_VAR.is_match("tas_p5_annual"));
        assert!(!PCT_VAR.is_match("tas_P50"));
        assert!(STATS_VAR.is_match("tg_Min"));
        assert!(!STATS_VAR.is_match("tg_mean"));
    }

    fn series(name: &str) -> LabeledArray {
        LabeledArray::from_vec("time", vec![1.0, 2.0]).named(name)
    }

    fn along(dim: &str) -> LabeledArray {
        LabeledArray::new(&["time", dim], &[2, 3], vec![0.0; 6])
            .unwrap()
            .named("tas")
    }

    #[test]
    fn one_input_per_category() {
        let cases: Vec<(Entry, ShapeCategory)> = vec![
            (
                LabeledTable::new()
                    .with_var("tas_p10", series("tas_p10"))
                    .with_var("tas_p50", series("tas_p50"))
                    .with_var("tas_p90", series("tas_p90"))
                    .into(),
                ShapeCategory::EnsPctVarDs,
            ),
            (
                LabeledTable::new()
                    .with_var("tas_min", series("tas_min"))
                    .with_var("tas_mean", series("tas_mean"))
                    .with_var("tas_max", series("tas_max"))
                    .into(),
                ShapeCategory::EnsStatsVarDs,
            ),
            (
                LabeledTable::new().with_var("tas", along(PERCENTILES_DIM)).into(),
                ShapeCategory::EnsPctDimDs,
            ),
            (along(PERCENTILES_DIM).into(), ShapeCategory::EnsPctDimDa),
            (
                LabeledTable::new().with_var("tas", along(REALIZATION_DIM)).into(),
                ShapeCategory::EnsRealsDs,
            ),
            (along(REALIZATION_DIM).into(), ShapeCategory::EnsRealsDa),
            (
                LabeledTable::new()
                    .with_var("tas", series("tas"))
                    .with_var("pr", series("pr"))
                    .into(),
                ShapeCategory::Ds,
            ),
            (series("tas").into(), ShapeCategory::Da),
        ];
        assert_eq!(cases.len(), ShapeCategory::ALL.len());
        for (entry, expected) in &cases {
            let first = classify(entry);
            assert_eq!(first, *expected);
            assert_eq!(classify(entry), first, "{expected} is not stable");
        }
    }

    #[test]
    fn percentile_variables_win_over_percentiles_dim() {
        let t = LabeledTable::new()
            .with_var("tas_p10", along(PERCENTILES_DIM).named("tas_p10"))
            .with_var("tas_p90", along(PERCENTILES_DIM).named("tas_p90"));
        assert_eq!(classify_table(&t), ShapeCategory::EnsPctVarDs);
    }

    #[test]
    fn single_suffix_match_is_not_an_ensemble() {
        let t = LabeledTable::new()
            .with_var("tas_max", series("tas_max"))
            .with_var("tas", series("tas"));
        assert_eq!(classify_table(&t), ShapeCategory::Ds);

        let t = LabeledTable::new()
            .with_var("tas_p50", series("tas_p50"))
            .with_var("pr", series("pr"));
        assert_eq!(classify_table(&t), ShapeCategory::Ds);
    }

    #[test]
    fn names_are_stable() {
        let names: Vec<&str> = ShapeCategory::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(names.len(), 8);
        assert_eq!(ShapeCategory::EnsRealsDa.to_string(), "ENS_REALS_DA");
    }
}
