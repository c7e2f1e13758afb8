//! Metadata locale and translation of fixed chart terms.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// Language used for metadata lookups (`long_name_fr`, ...) and fixed terms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    En,
    Fr,
}

impl Locale {
    /// Map a user-provided locale tag. Unknown tags fall back to English.
    ///
    /// Accepted (case-insensitive): `en`, `en_US`, `en_CA`, `fr`, `fr_FR`, `fr_CA`, `french`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.to_lowercase().replace('-', "_").as_str() {
            "fr" | "fr_fr" | "fr_ca" | "french" => Locale::Fr,
            _ => Locale::En,
        }
    }

    /// Two-letter code used as attribute suffix.
    pub fn code(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Fr => "fr",
        }
    }

    /// Digit-grouping locale for tick labels.
    pub fn number_locale(self) -> &'static num_format::Locale {
        match self {
            Locale::En => &num_format::Locale::en,
            Locale::Fr => &num_format::Locale::fr,
        }
    }

    pub fn decimal_separator(self) -> char {
        match self {
            Locale::En => '.',
            Locale::Fr => ',',
        }
    }
}

type TermTable = BTreeMap<String, BTreeMap<String, String>>;

static TERMS: LazyLock<TermTable> = LazyLock::new(|| {
    serde_json::from_str(include_str!("../data/terms.json")).expect("embedded terms.json is valid")
});

/// Translate `term`. English and unknown terms come back unchanged.
pub fn localized_term(term: &str, locale: Locale) -> String {
    if locale == Locale::En {
        return term.to_string();
    }
    match TERMS.get(term).and_then(|t| t.get(locale.code())) {
        Some(s) => s.clone(),
        None => {
            log::warn!("No {} translation known for term '{term}'.", locale.code());
            term.to_string()
        }
    }
}

/// Substitute `{}` placeholders in order.
pub fn fill(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut it = args.iter();
    while let Some(pos) = rest.find("{}") {
        out.push_str(&rest[..pos]);
        match it.next() {
            Some(a) => out.push_str(a),
            None => out.push_str("{}"),
        }
        rest = &rest[pos + 2..];
    }
    out.push_str(rest);
    out
}

/// Upper-case the first character.
pub fn capitalize(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        Some(f) => f.to_uppercase().chain(c).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_map_with_english_fallback() {
        assert_eq!(Locale::from_tag("fr-CA"), Locale::Fr);
        assert_eq!(Locale::from_tag("de"), Locale::En);
    }

    #[test]
    fn translation_and_placeholders() {
        assert_eq!(localized_term("time", Locale::Fr), "temps");
        assert_eq!(localized_term("time", Locale::En), "time");
        assert_eq!(localized_term("unknown term", Locale::Fr), "unknown term");
        let t = localized_term("{}th-{}th percentiles", Locale::En);
        assert_eq!(fill(&t, &["10", "90"]), "10th-90th percentiles");
        assert_eq!(capitalize("temps"), "Temps");
    }
}
