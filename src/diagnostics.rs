//! Structured soft errors.
//!
//! Cosmetic or metadata problems never abort a chart call. They are recorded
//! here, logged through the `log` facade, and handed back on the figure so
//! callers can inspect them without a global warnings hook.

use serde::Serialize;
use std::fmt;

/// What went wrong. Each kind maps to a recoverable condition with a safe
/// default substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticKind {
    /// Requested metadata attribute absent; empty string substituted.
    MissingAttribute,
    /// No variable group matched; `misc` palette used.
    VariableGroupNotFound,
    /// Several distinct variable groups matched; `misc` palette used.
    VariableGroupAmbiguous,
    /// Non-standard calendar time axis converted to the standard calendar.
    CalendarConverted,
    /// `use_attrs` key outside the supported vocabulary, ignored.
    UnsupportedUseAttr,
    /// Caller-supplied `label` option stripped.
    LabelIgnored,
    /// `center` ignored because explicit boundaries were given.
    CenterIgnored,
    /// Text window with no break point; wrapping stopped early.
    TextUnbreakable,
    /// Unknown named style.
    StyleNotFound,
    /// Only the first variable of a table is used.
    FirstVariableOnly,
    /// NaN values were dropped before plotting.
    DroppedNan,
    /// Points with negative correlation were removed.
    NegativeCorrelation,
    /// Scalar coordinate needed for an annotation is missing.
    MissingCoordinate,
    /// String `hatches` wrapped into a one-element list.
    HatchesWrapped,
    /// Rotated-pole parameters could not be found on the data.
    RotatedPoleNotFound,
    /// Only one of `xlim`/`ylim` given; both ignored.
    ExtentDropped,
    /// Option key that this chart does not understand.
    UnusedOption,
    /// More dimensions than the chart draws; the first slice of the rest is used.
    ExtraDimensions,
}

/// A single soft error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Ordered collector of diagnostics for one chart call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record and log a diagnostic.
    pub fn warn(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        self.push(Diagnostic::new(kind, message));
    }

    pub fn push(&mut self, d: Diagnostic) {
        log::warn!("{}", d.message);
        self.items.push(d);
    }

    /// Move every diagnostic of `other` into `self` (already logged, not re-logged).
    pub fn append(&mut self, other: &mut Diagnostics) {
        self.items.append(&mut other.items);
    }

    pub fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, iter: I) {
        for d in iter {
            self.push(d);
        }
    }

    pub fn has(&self, kind: DiagnosticKind) -> bool {
        self.items.iter().any(|d| d.kind == kind)
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.items.iter().filter(|d| d.kind == kind).count()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_counted_separately() {
        let mut d = Diagnostics::new();
        d.warn(DiagnosticKind::VariableGroupNotFound, "Variable group not found");
        d.warn(DiagnosticKind::VariableGroupAmbiguous, "More than one variable group");
        d.warn(DiagnosticKind::VariableGroupAmbiguous, "More than one variable group");
        assert_eq!(d.len(), 3);
        assert_eq!(d.count(DiagnosticKind::VariableGroupNotFound), 1);
        assert_eq!(d.count(DiagnosticKind::VariableGroupAmbiguous), 2);
        assert!(!d.has(DiagnosticKind::LabelIgnored));
    }

    #[test]
    fn append_drains_other() {
        let mut a = Diagnostics::new();
        let mut b = Diagnostics::new();
        b.warn(DiagnosticKind::LabelIgnored, "x");
        a.append(&mut b);
        assert_eq!(a.len(), 1);
        assert!(b.is_empty());
    }
}
