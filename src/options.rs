//! Option dictionaries, metadata-driven labels and their defaults.
//!
//! Backend-passthrough options (`plot_kw`, `fig_kw`, ...) are plain JSON
//! objects. Defaults are merged without ever overwriting a caller value, and
//! every merge returns a fresh map so that no two entries share one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{PlotError, Result};
use crate::layout::wrap_text;
use crate::models::{Entry, NamedData};
use crate::style::{self, Rgba};
use crate::terms::Locale;

/// Backend-passthrough keyword options.
pub type Kwargs = serde_json::Map<String, Value>;

/// Build [`Kwargs`] from a JSON value; anything but an object gives an
/// empty map.
pub fn kwargs(value: Value) -> Kwargs {
    match value {
        Value::Object(m) => m,
        _ => Kwargs::new(),
    }
}

/// Builder-style "set if absent".
pub fn with_default(mut kw: Kwargs, key: &str, value: impl Into<Value>) -> Kwargs {
    if !kw.contains_key(key) {
        kw.insert(key.to_string(), value.into());
    }
    kw
}

/// Drop a caller-supplied `label`; charts always set their own.
pub fn strip_label(mut kw: Kwargs, entry: &str, diags: &mut Diagnostics) -> Kwargs {
    if kw.remove("label").is_some() {
        diags.warn(
            DiagnosticKind::LabelIgnored,
            format!("\"label\" entry in plot_kw[{entry}] will be ignored."),
        );
    }
    kw
}

/// Split `plot_kw` into one option map per data entry, in entry order.
///
/// Bare data takes the whole map. Mapping data expects a nested map keyed
/// by data keys; entries without options get an empty map and an unknown
/// key is a [`PlotError::Key`].
pub fn per_entry_kw(plot_kw: &Kwargs, data: &NamedData) -> Result<Vec<Kwargs>> {
    if data.bare {
        return Ok(vec![plot_kw.clone(); data.len()]);
    }
    if let Some(unknown) = plot_kw.keys().find(|k| data.get(k).is_none()) {
        return Err(PlotError::key(format!(
            "plot_kw must be a nested dictionary with keys corresponding to the keys in \"data\" (unknown key '{unknown}')"
        )));
    }
    data.keys()
        .map(|k| match plot_kw.get(k) {
            None | Some(Value::Null) => Ok(Kwargs::new()),
            Some(Value::Object(m)) => Ok(m.clone()),
            Some(other) => Err(PlotError::type_err(format!(
                "plot_kw['{k}'] must be a dictionary, got {other}"
            ))),
        })
        .collect()
}

pub fn get_f64(kw: &Kwargs, key: &str) -> Option<f64> {
    match kw.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn get_str<'a>(kw: &'a Kwargs, key: &str) -> Option<&'a str> {
    kw.get(key).and_then(Value::as_str)
}

pub fn get_bool(kw: &Kwargs, key: &str) -> Option<bool> {
    kw.get(key).and_then(Value::as_bool)
}

/// Color option, accepting every form [`style::parse_color`] understands.
pub fn get_color(kw: &Kwargs, key: &str) -> Option<Rgba> {
    kw.get(key).and_then(style::parse_color)
}

/// Plot elements that can be filled from metadata.
pub const USE_ATTRS_KEYS: [&str; 8] = [
    "title",
    "ylabel",
    "yunits",
    "xlabel",
    "xunits",
    "cbar_label",
    "cbar_units",
    "suptitle",
];

/// Mapping of plot element (`title`, `ylabel`, ...) to the metadata key
/// providing its text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UseAttrs(BTreeMap<String, String>);

impl UseAttrs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, element: &str, attr: &str) -> Self {
        self.0.insert(element.to_string(), attr.to_string());
        self
    }

    pub fn get(&self, element: &str) -> Option<&str> {
        self.0.get(element).map(String::as_str)
    }

    pub fn contains(&self, element: &str) -> bool {
        self.0.contains_key(element)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// A new mapping with `defaults` filled in where the caller set nothing.
    pub fn merge_defaults(&self, defaults: &[(&str, &str)]) -> Self {
        let mut out = self.clone();
        for (el, attr) in defaults {
            out.0
                .entry(el.to_string())
                .or_insert_with(|| attr.to_string());
        }
        out
    }

    /// Report elements outside [`USE_ATTRS_KEYS`]. They are kept but unused.
    pub fn validate(&self, diags: &mut Diagnostics) {
        for key in self.0.keys() {
            if !USE_ATTRS_KEYS.contains(&key.as_str()) {
                diags.warn(
                    DiagnosticKind::UnsupportedUseAttr,
                    format!("Use_attrs element \"{key}\" not supported"),
                );
            }
        }
    }
}

impl<const N: usize> From<[(&str, &str); N]> for UseAttrs {
    fn from(pairs: [(&str, &str); N]) -> Self {
        pairs
            .iter()
            .fold(UseAttrs::new(), |acc, (k, v)| acc.with(k, v))
    }
}

/// Metadata value `key` of an entry as text.
///
/// Lookup order: `{key}_{locale}` before `{key}` (non-English locales); for
/// each name the array attributes, or for a table its first variable then
/// the table itself. Not found gives an empty string and a
/// [`DiagnosticKind::MissingAttribute`] diagnostic.
pub fn get_attribute(key: &str, entry: &Entry, locale: Locale, diags: &mut Diagnostics) -> String {
    let mut names = Vec::with_capacity(2);
    if locale != Locale::En {
        names.push(format!("{key}_{}", locale.code()));
    }
    names.push(key.to_string());

    for name in &names {
        let found = match entry {
            Entry::Array(a) => a.attr(name),
            Entry::Table(t) => t
                .first_var()
                .and_then(|v| v.attr(name))
                .or_else(|| t.attr(name)),
        };
        if let Some(v) = found {
            return v.as_text();
        }
    }
    diags.warn(
        DiagnosticKind::MissingAttribute,
        format!("Attribute \"{key}\" not found."),
    );
    String::new()
}

/// `label (units)`, or `label` alone when units are empty.
pub fn label_with_units(label: &str, units: &str) -> String {
    if units.is_empty() {
        label.to_string()
    } else {
        format!("{label} ({units})")
    }
}

/// Texts resolved from metadata through [`UseAttrs`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlotAttrs {
    pub title: Option<String>,
    pub xlabel: Option<String>,
    pub ylabel: Option<String>,
    pub cbar_label: Option<String>,
    pub suptitle: Option<String>,
}

/// Resolve every element of `use_attrs` against `entry`. The title is
/// wrapped with `title_wrap` (min, max line length), axis labels with the
/// usual defaults; units are appended only when non-empty.
pub fn resolve_plot_attrs(
    use_attrs: &UseAttrs,
    entry: &Entry,
    locale: Locale,
    title_wrap: (usize, usize),
    diags: &mut Diagnostics,
) -> PlotAttrs {
    use_attrs.validate(diags);

    let lookup = |element: &str, diags: &mut Diagnostics| {
        use_attrs
            .get(element)
            .map(|attr| get_attribute(attr, entry, locale, diags))
    };

    let title = lookup("title", diags).map(|t| wrap_text(&t, title_wrap.0, title_wrap.1, diags));
    let suptitle = lookup("suptitle", diags);

    let labelled = |label: &str, units: &str, diags: &mut Diagnostics| {
        let text = lookup(label, diags)?;
        let units = lookup(units, diags).unwrap_or_default();
        Some(wrap_text(&label_with_units(&text, &units), 18, 30, diags))
    };
    let ylabel = labelled("ylabel", "yunits", diags);
    let xlabel = labelled("xlabel", "xunits", diags);
    let cbar_label = labelled("cbar_label", "cbar_units", diags);

    PlotAttrs {
        title,
        xlabel,
        ylabel,
        cbar_label,
        suptitle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataInput, LabeledArray, LabeledTable};
    use serde_json::json;

    #[test]
    fn merge_keeps_caller_values() {
        let ua = UseAttrs::from([("title", "long_name")])
            .merge_defaults(&[("title", "description"), ("ylabel", "long_name")]);
        assert_eq!(ua.get("title"), Some("long_name"));
        assert_eq!(ua.get("ylabel"), Some("long_name"));

        let kw = with_default(kwargs(json!({"color": "red"})), "color", "blue");
        assert_eq!(get_str(&kw, "color"), Some("red"));
    }

    #[test]
    fn per_entry_kw_checks_keys() {
        let a = LabeledArray::from_vec("time", vec![1.0]);
        let data = DataInput::from(vec![("a", a.clone()), ("b", a)]).into_named();
        let kw = kwargs(json!({"a": {"lw": 2}}));
        let per = per_entry_kw(&kw, &data).unwrap();
        assert_eq!(per.len(), 2);
        assert!(per[1].is_empty());

        let bad = kwargs(json!({"c": {}}));
        assert!(matches!(per_entry_kw(&bad, &data), Err(PlotError::Key(_))));
        let flat = kwargs(json!({"a": 3}));
        assert!(matches!(per_entry_kw(&flat, &data), Err(PlotError::Type(_))));
    }

    #[test]
    fn attribute_lookup_order() {
        let mut d = Diagnostics::new();
        let t = LabeledTable::new()
            .with_var(
                "tas",
                LabeledArray::from_vec("time", vec![1.0])
                    .with_attr("long_name", "Temperature")
                    .with_attr("long_name_fr", "Température"),
            )
            .with_attr("description", "table level");
        let e = Entry::from(t);
        assert_eq!(get_attribute("long_name", &e, Locale::En, &mut d), "Temperature");
        assert_eq!(get_attribute("long_name", &e, Locale::Fr, &mut d), "Température");
        assert_eq!(get_attribute("description", &e, Locale::En, &mut d), "table level");
        assert!(d.is_empty());
        assert_eq!(get_attribute("units", &e, Locale::En, &mut d), "");
        assert!(d.has(DiagnosticKind::MissingAttribute));
    }

    #[test]
    fn plot_attrs_units_only_when_present() {
        let mut d = Diagnostics::new();
        let e = Entry::from(
            LabeledArray::from_vec("time", vec![1.0])
                .with_attr("long_name", "Precip")
                .with_attr("units", ""),
        );
        let ua = UseAttrs::from([("ylabel", "long_name"), ("yunits", "units"), ("zlabel", "x")]);
        let attrs = resolve_plot_attrs(&ua, &e, Locale::En, (35, 48), &mut d);
        assert_eq!(attrs.ylabel.as_deref(), Some("Precip"));
        assert!(d.has(DiagnosticKind::UnsupportedUseAttr));
    }
}
