//! figanos
//!
//! A plotting layer for climate data. Chart functions take labeled arrays
//! or tables (or a mapping of names to either), read their metadata and
//! ensemble conventions, and return a backend-neutral [`Figure`] that can be
//! inspected or rendered to SVG/PNG.
//!
//! ### Features
//! - Timeseries with realization, percentile and min/max ensembles drawn as
//!   lines plus shaded bands
//! - Gridded and station maps with IPCC-style palettes picked from the
//!   variable name, divergent or sequential
//! - Heatmaps (plain or split into triangles), violins, Taylor diagrams,
//!   hatch maps, uncertainty partition charts and climate stripes
//! - Titles, axis labels and legends from metadata attributes, in English
//!   or French
//! - Style sheets applied process-wide ([`style::use_styles`])
//!
//! Soft problems (missing attributes, dropped options) are collected in
//! [`Figure::diagnostics`] and logged through the `log` facade; hard ones
//! are returned as [`PlotError`].
//!
//! ### Example
//! ```no_run
//! use figanos::{LabeledArray, TimeseriesOptions, timeseries};
//!
//! let tas = LabeledArray::from_vec("time", vec![1.0, 1.5, 1.2, 2.1])
//!     .named("tas")
//!     .with_attr("long_name", "Mean temperature")
//!     .with_attr("units", "K")
//!     .with_coord("time", vec![2000_i64, 2001, 2002, 2003])?;
//! let fig = timeseries(tas, &TimeseriesOptions::default())?;
//! fig.save("tas.svg")?;
//! # Ok::<(), figanos::PlotError>(())
//! ```

pub mod calendar;
pub mod charts;
pub mod classify;
pub mod colormap;
pub mod diagnostics;
pub mod ensemble;
pub mod error;
pub mod figure;
pub mod layout;
pub mod models;
pub mod naming;
pub mod options;
pub mod projection;
pub mod style;
pub mod terms;
pub mod viz;

pub use charts::{
    GridmapOptions, HatchmapOptions, HeatmapOptions, PartitionOptions, ScattermapOptions,
    StripesOptions, TaylorOptions, TimeseriesOptions, TriheatmapOptions, ViolinOptions, gridmap,
    hatchmap, heatmap, partition, scattermap, stripes, taylordiagram, timeseries, triheatmap,
    violin,
};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use error::{PlotError, Result};
pub use figure::{Artist, ChartKind, Figure, LegendMode};
pub use models::{DataInput, Entry, LabeledArray, LabeledTable};
pub use terms::Locale;
