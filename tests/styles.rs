use std::fs;

use figanos::style::{self, BUILTIN_STYLES};
use figanos::{DiagnosticKind, LabeledArray, StripesOptions, stripes};

// The style is process-wide, so everything touching it lives in one test.
#[test]
fn styles_stack_and_reach_new_figures() {
    style::reset_style();

    let diags = style::use_styles(&["paper", "transparent"], true);
    assert!(diags.is_empty());
    let s = style::current_style();
    assert_eq!(s.name, "paper+transparent");
    assert_eq!(s.font_size, 10.0);
    assert!(s.transparent);

    let dir = tempfile::tempdir().unwrap();
    let sheet = dir.path().join("big.json");
    fs::write(&sheet, r#"{"font_size": 20.0, "figure_size": [300, 200]}"#).unwrap();
    let sheet = sheet.to_string_lossy().into_owned();
    let diags = style::use_styles(&[sheet.as_str(), "fancy"], false);
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].kind, DiagnosticKind::StyleNotFound);
    assert_eq!(diags[0].message, "Style fancy not found.");
    assert_eq!(style::current_style().font_size, 20.0);
    assert!(style::current_style().transparent);

    let a = LabeledArray::from_vec("time", vec![0.0, 1.0])
        .named("tas")
        .with_coord("time", vec![2000.0, 2001.0])
        .unwrap();
    let fig = stripes(a, &StripesOptions::default()).unwrap();
    assert_eq!(fig.size, (300, 200));
    assert!(fig.style.transparent);
    assert!(fig.to_svg_string().unwrap().contains("width=\"300\""));

    style::reset_style();
    assert_eq!(style::current_style(), style::Style::default());
    assert!(BUILTIN_STYLES.contains(&"ouranos"));
}
