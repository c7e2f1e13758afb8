//! Labeled arrays, tables and the named input mapping every chart accepts.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::calendar::{self, Calendar, CfDatetime};
use crate::error::{PlotError, Result};

/// Sentinel key marking data that was passed bare instead of in a mapping.
/// Labels starting with `_` never reach a legend.
pub const NO_LABEL: &str = "_no_label";

/// Metadata value. Most attributes are strings; a few carry numbers or
/// lists of member names (e.g. uncertainty components).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Str(String),
    Num(f64),
    List(Vec<String>),
}

impl AttrValue {
    /// Textual rendition used for labels.
    pub fn as_text(&self) -> String {
        match self {
            AttrValue::Str(s) => s.clone(),
            AttrValue::Num(n) => format_number(*n),
            AttrValue::List(v) => v.join(", "),
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            AttrValue::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Num(n) => Some(*n),
            AttrValue::Str(s) => s.trim().parse().ok(),
            AttrValue::List(_) => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Str(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Str(s)
    }
}

impl From<f64> for AttrValue {
    fn from(n: f64) -> Self {
        AttrValue::Num(n)
    }
}

impl From<Vec<String>> for AttrValue {
    fn from(v: Vec<String>) -> Self {
        AttrValue::List(v)
    }
}

impl From<Vec<&str>> for AttrValue {
    fn from(v: Vec<&str>) -> Self {
        AttrValue::List(v.into_iter().map(String::from).collect())
    }
}

/// Integral floats print without a fractional part (`50`, not `50.0`).
pub(crate) fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

/// Values of one coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CoordValues {
    Float(Vec<f64>),
    Int(Vec<i64>),
    Str(Vec<String>),
    Time(Vec<NaiveDateTime>),
    CfTime {
        calendar: Calendar,
        dates: Vec<CfDatetime>,
    },
}

impl CoordValues {
    pub fn len(&self) -> usize {
        match self {
            CoordValues::Float(v) => v.len(),
            CoordValues::Int(v) => v.len(),
            CoordValues::Str(v) => v.len(),
            CoordValues::Time(v) => v.len(),
            CoordValues::CfTime { dates, .. } => dates.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_time(&self) -> bool {
        matches!(self, CoordValues::Time(_) | CoordValues::CfTime { .. })
    }

    /// Display label of element `i`.
    pub fn label(&self, i: usize) -> Option<String> {
        match self {
            CoordValues::Float(v) => v.get(i).map(|x| format_number(*x)),
            CoordValues::Int(v) => v.get(i).map(|x| x.to_string()),
            CoordValues::Str(v) => v.get(i).cloned(),
            CoordValues::Time(v) => v.get(i).map(|t| t.format("%Y-%m-%d").to_string()),
            CoordValues::CfTime { dates, .. } => dates
                .get(i)
                .map(|d| format!("{:04}-{:02}-{:02}", d.year, d.month, d.day)),
        }
    }

    /// Numeric position of element `i`. Times become fractional years.
    pub fn as_f64(&self, i: usize) -> Option<f64> {
        match self {
            CoordValues::Float(v) => v.get(i).copied(),
            CoordValues::Int(v) => v.get(i).map(|x| *x as f64),
            CoordValues::Str(_) => None,
            CoordValues::Time(v) => v.get(i).map(calendar::decimal_year),
            CoordValues::CfTime { calendar, dates } => dates.get(i).map(|d| {
                let len = calendar.days_in_year(d.year) as f64;
                d.year as f64 + (d.day_of_year(*calendar) as f64 - 1.0) / len
            }),
        }
    }

    pub fn take(&self, idx: &[usize]) -> CoordValues {
        fn pick<T: Clone>(v: &[T], idx: &[usize]) -> Vec<T> {
            idx.iter().filter_map(|i| v.get(*i).cloned()).collect()
        }
        match self {
            CoordValues::Float(v) => CoordValues::Float(pick(v, idx)),
            CoordValues::Int(v) => CoordValues::Int(pick(v, idx)),
            CoordValues::Str(v) => CoordValues::Str(pick(v, idx)),
            CoordValues::Time(v) => CoordValues::Time(pick(v, idx)),
            CoordValues::CfTime { calendar, dates } => CoordValues::CfTime {
                calendar: *calendar,
                dates: pick(dates, idx),
            },
        }
    }
}

impl From<Vec<f64>> for CoordValues {
    fn from(v: Vec<f64>) -> Self {
        CoordValues::Float(v)
    }
}

impl From<Vec<i64>> for CoordValues {
    fn from(v: Vec<i64>) -> Self {
        CoordValues::Int(v)
    }
}

impl From<Vec<String>> for CoordValues {
    fn from(v: Vec<String>) -> Self {
        CoordValues::Str(v)
    }
}

impl From<Vec<&str>> for CoordValues {
    fn from(v: Vec<&str>) -> Self {
        CoordValues::Str(v.into_iter().map(String::from).collect())
    }
}

impl From<Vec<NaiveDateTime>> for CoordValues {
    fn from(v: Vec<NaiveDateTime>) -> Self {
        CoordValues::Time(v)
    }
}

/// A coordinate attached to zero (scalar), one or several dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub dims: Vec<String>,
    pub values: CoordValues,
}

impl Coordinate {
    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }
}

/// N-dimensional numeric array with named dimensions, coordinates and
/// metadata. Values are stored row-major; missing values are `NaN`.
///
/// Deserialization runs the same checks as [`LabeledArray::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLabeledArray")]
pub struct LabeledArray {
    name: Option<String>,
    dims: Vec<String>,
    shape: Vec<usize>,
    values: Vec<f64>,
    #[serde(default)]
    coords: BTreeMap<String, Coordinate>,
    #[serde(default)]
    attrs: BTreeMap<String, AttrValue>,
}

/// Unchecked wire form of [`LabeledArray`].
#[derive(Deserialize)]
struct RawLabeledArray {
    name: Option<String>,
    dims: Vec<String>,
    shape: Vec<usize>,
    values: Vec<f64>,
    #[serde(default)]
    coords: BTreeMap<String, Coordinate>,
    #[serde(default)]
    attrs: BTreeMap<String, AttrValue>,
}

impl TryFrom<RawLabeledArray> for LabeledArray {
    type Error = PlotError;

    fn try_from(raw: RawLabeledArray) -> Result<Self> {
        let dims: Vec<&str> = raw.dims.iter().map(String::as_str).collect();
        let mut array = LabeledArray::new(&dims, &raw.shape, raw.values)?;
        array.name = raw.name;
        array.attrs = raw.attrs;
        for (name, coord) in raw.coords {
            let cdims: Vec<&str> = coord.dims.iter().map(String::as_str).collect();
            array = if cdims.is_empty() {
                array.with_scalar_coord(&name, coord.values)?
            } else {
                array.with_aux_coord(&name, &cdims, coord.values)?
            };
        }
        Ok(array)
    }
}

impl LabeledArray {
    /// Build an array, checking that `dims`, `shape` and `values` agree.
    pub fn new(dims: &[&str], shape: &[usize], values: Vec<f64>) -> Result<Self> {
        if dims.len() != shape.len() {
            return Err(PlotError::value(format!(
                "{} dimension names for a {}-dimensional shape",
                dims.len(),
                shape.len()
            )));
        }
        let expected: usize = shape.iter().product();
        if expected != values.len() {
            return Err(PlotError::value(format!(
                "shape {shape:?} needs {expected} values, got {}",
                values.len()
            )));
        }
        for (i, d) in dims.iter().enumerate() {
            if dims[..i].contains(d) {
                return Err(PlotError::value(format!("duplicate dimension '{d}'")));
            }
        }
        Ok(Self {
            name: None,
            dims: dims.iter().map(|d| d.to_string()).collect(),
            shape: shape.to_vec(),
            values,
            coords: BTreeMap::new(),
            attrs: BTreeMap::new(),
        })
    }

    /// One-dimensional array along `dim`.
    pub fn from_vec(dim: &str, values: Vec<f64>) -> Self {
        Self {
            name: None,
            dims: vec![dim.to_string()],
            shape: vec![values.len()],
            values,
            coords: BTreeMap::new(),
            attrs: BTreeMap::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// Attach a coordinate along dimension `dim` (same name as the dimension).
    pub fn with_coord(self, dim: &str, values: impl Into<CoordValues>) -> Result<Self> {
        self.with_aux_coord(dim, &[dim], values)
    }

    /// Attach a coordinate spanning `dims` (row-major over those dims).
    pub fn with_aux_coord(
        mut self,
        name: &str,
        dims: &[&str],
        values: impl Into<CoordValues>,
    ) -> Result<Self> {
        let values = values.into();
        let mut expected = 1usize;
        for d in dims {
            expected *= self
                .dim_size(d)
                .ok_or_else(|| PlotError::value(format!("coordinate '{name}': no dimension '{d}'")))?;
        }
        if values.len() != expected {
            return Err(PlotError::value(format!(
                "coordinate '{name}' has {} values, expected {expected}",
                values.len()
            )));
        }
        self.coords.insert(
            name.to_string(),
            Coordinate {
                dims: dims.iter().map(|d| d.to_string()).collect(),
                values,
            },
        );
        Ok(self)
    }

    /// Attach a dimensionless coordinate such as a point's `lat`.
    pub fn with_scalar_coord(mut self, name: &str, values: impl Into<CoordValues>) -> Result<Self> {
        let values = values.into();
        if values.len() != 1 {
            return Err(PlotError::value(format!(
                "scalar coordinate '{name}' must hold exactly one value"
            )));
        }
        self.coords.insert(
            name.to_string(),
            Coordinate {
                dims: Vec::new(),
                values,
            },
        );
        Ok(self)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn axis_of(&self, dim: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == dim)
    }

    pub fn has_dim(&self, dim: &str) -> bool {
        self.axis_of(dim).is_some()
    }

    pub fn dim_size(&self, dim: &str) -> Option<usize> {
        self.axis_of(dim).map(|a| self.shape[a])
    }

    pub fn coords(&self) -> &BTreeMap<String, Coordinate> {
        &self.coords
    }

    pub fn coord(&self, name: &str) -> Option<&Coordinate> {
        self.coords.get(name)
    }

    pub fn attrs(&self) -> &BTreeMap<String, AttrValue> {
        &self.attrs
    }

    pub fn attr(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.get(key)
    }

    pub fn attr_text(&self, key: &str) -> Option<String> {
        self.attrs.get(key).map(AttrValue::as_text)
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        self.attrs.insert(key.into(), value.into());
    }

    /// Element at a full multi-index.
    pub fn get(&self, index: &[usize]) -> Option<f64> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut flat = 0usize;
        for (i, (ix, n)) in index.iter().zip(&self.shape).enumerate() {
            if ix >= n {
                return None;
            }
            flat = flat * self.shape[i] + ix;
        }
        self.values.get(flat).copied()
    }

    /// Same metadata, new values of identical size.
    pub fn with_values(&self, values: Vec<f64>) -> Result<Self> {
        if values.len() != self.values.len() {
            return Err(PlotError::value(format!(
                "replacement holds {} values, expected {}",
                values.len(),
                self.values.len()
            )));
        }
        let mut out = self.clone();
        out.values = values;
        Ok(out)
    }

    /// Keep positions `idx` along `dim` (in that order).
    pub fn take(&self, dim: &str, idx: &[usize]) -> Result<Self> {
        let axis = self.require_axis(dim)?;
        let n = self.shape[axis];
        if let Some(bad) = idx.iter().find(|i| **i >= n) {
            return Err(PlotError::value(format!(
                "index {bad} out of bounds for dimension '{dim}' of size {n}"
            )));
        }
        let flat = gather_indices(&self.shape, axis, idx);
        let mut shape = self.shape.clone();
        shape[axis] = idx.len();

        let mut coords = BTreeMap::new();
        for (name, c) in &self.coords {
            let mut c = c.clone();
            if let Some(caxis) = c.dims.iter().position(|d| d == dim) {
                let cshape: Vec<usize> = c
                    .dims
                    .iter()
                    .map(|d| self.dim_size(d).unwrap_or(1))
                    .collect();
                c.values = c.values.take(&gather_indices(&cshape, caxis, idx));
            }
            coords.insert(name.clone(), c);
        }

        Ok(Self {
            name: self.name.clone(),
            dims: self.dims.clone(),
            shape,
            values: flat.iter().map(|i| self.values[*i]).collect(),
            coords,
            attrs: self.attrs.clone(),
        })
    }

    /// Select one position along `dim`, dropping the dimension. Coordinates
    /// along `dim` alone become scalar coordinates.
    pub fn isel(&self, dim: &str, index: usize) -> Result<Self> {
        let axis = self.require_axis(dim)?;
        let mut out = self.take(dim, &[index])?;
        out.dims.remove(axis);
        out.shape.remove(axis);
        for c in out.coords.values_mut() {
            c.dims.retain(|d| d != dim);
        }
        Ok(out)
    }

    /// Select by coordinate label along `dim`.
    pub fn sel(&self, dim: &str, label: &str) -> Result<Self> {
        let labels = self.coord_labels(dim);
        let index = labels.iter().position(|l| l == label).ok_or_else(|| {
            PlotError::key(format!("'{label}' not found along dimension '{dim}'"))
        })?;
        self.isel(dim, index)
    }

    /// Drop every length-one dimension.
    pub fn squeeze(&self) -> Self {
        let mut out = self.clone();
        while let Some(d) = out
            .dims
            .iter()
            .zip(&out.shape)
            .find(|(_, n)| **n == 1)
            .map(|(d, _)| d.clone())
        {
            match out.isel(&d, 0) {
                Ok(next) => out = next,
                Err(_) => break,
            }
        }
        out
    }

    /// Reorder dimensions. `order` must be a permutation of `dims()`.
    pub fn transpose(&self, order: &[&str]) -> Result<Self> {
        if order.len() != self.dims.len() || order.iter().any(|d| !self.has_dim(d)) {
            return Err(PlotError::value(format!(
                "{order:?} is not a permutation of {:?}",
                self.dims
            )));
        }
        let perm: Vec<usize> = order.iter().filter_map(|d| self.axis_of(d)).collect();
        let new_shape: Vec<usize> = perm.iter().map(|a| self.shape[*a]).collect();
        let old_strides = strides(&self.shape);
        let mut values = Vec::with_capacity(self.values.len());
        let mut idx = vec![0usize; new_shape.len()];
        for _ in 0..self.values.len() {
            let src: usize = idx
                .iter()
                .zip(&perm)
                .map(|(i, a)| i * old_strides[*a])
                .sum();
            values.push(self.values[src]);
            // odometer increment
            for k in (0..idx.len()).rev() {
                idx[k] += 1;
                if idx[k] < new_shape[k] {
                    break;
                }
                idx[k] = 0;
            }
        }
        Ok(Self {
            name: self.name.clone(),
            dims: order.iter().map(|d| d.to_string()).collect(),
            shape: new_shape,
            values,
            coords: self.coords.clone(),
            attrs: self.attrs.clone(),
        })
    }

    /// Display labels along `dim`, falling back to positional indices.
    pub fn coord_labels(&self, dim: &str) -> Vec<String> {
        let n = self.dim_size(dim).unwrap_or(0);
        match self.coords.get(dim) {
            Some(c) if c.dims.len() == 1 && c.dims[0] == dim => (0..n)
                .map(|i| c.values.label(i).unwrap_or_else(|| i.to_string()))
                .collect(),
            _ => (0..n).map(|i| i.to_string()).collect(),
        }
    }

    /// Numeric positions along `dim`, falling back to positional indices.
    pub fn coord_f64(&self, dim: &str) -> Vec<f64> {
        let n = self.dim_size(dim).unwrap_or(0);
        match self.coords.get(dim) {
            Some(c) if c.dims.len() == 1 && c.dims[0] == dim => (0..n)
                .map(|i| c.values.as_f64(i).unwrap_or(i as f64))
                .collect(),
            _ => (0..n).map(|i| i as f64).collect(),
        }
    }

    /// Value of a scalar coordinate (or a length-one coordinate).
    pub fn scalar_coord(&self, name: &str) -> Option<&CoordValues> {
        self.coords
            .get(name)
            .filter(|c| c.values.len() == 1)
            .map(|c| &c.values)
    }

    /// NaN-aware minimum.
    pub fn min(&self) -> Option<f64> {
        self.values
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.min(v))))
    }

    /// NaN-aware maximum.
    pub fn max(&self) -> Option<f64> {
        self.values
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.max(v))))
    }

    fn require_axis(&self, dim: &str) -> Result<usize> {
        self.axis_of(dim).ok_or_else(|| {
            PlotError::value(format!(
                "dimension '{dim}' not found (dimensions: {:?})",
                self.dims
            ))
        })
    }

    pub(crate) fn replace_coord(&mut self, name: &str, values: CoordValues) {
        if let Some(c) = self.coords.get_mut(name) {
            c.values = values;
        }
    }
}

fn strides(shape: &[usize]) -> Vec<usize> {
    let mut s = vec![1usize; shape.len()];
    for k in (0..shape.len().saturating_sub(1)).rev() {
        s[k] = s[k + 1] * shape[k + 1];
    }
    s
}

/// Flat source indices selecting `idx` along `axis` of a row-major `shape`.
fn gather_indices(shape: &[usize], axis: usize, idx: &[usize]) -> Vec<usize> {
    let outer: usize = shape[..axis].iter().product();
    let inner: usize = shape[axis + 1..].iter().product();
    let n = shape[axis];
    let mut out = Vec::with_capacity(outer * idx.len() * inner);
    for o in 0..outer {
        for k in idx {
            let base = (o * n + k) * inner;
            out.extend(base..base + inner);
        }
    }
    out
}

/// A named collection of arrays sharing aligned dimensions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabeledTable {
    vars: Vec<LabeledArray>,
    #[serde(default)]
    attrs: BTreeMap<String, AttrValue>,
}

impl LabeledTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) variable `name`.
    pub fn with_var(mut self, name: &str, array: LabeledArray) -> Self {
        self.insert(name, array);
        self
    }

    pub fn insert(&mut self, name: &str, array: LabeledArray) {
        let array = array.named(name);
        match self.vars.iter_mut().find(|v| v.name() == Some(name)) {
            Some(slot) => *slot = array,
            None => self.vars.push(array),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn vars(&self) -> &[LabeledArray] {
        &self.vars
    }

    pub fn var(&self, name: &str) -> Option<&LabeledArray> {
        self.vars.iter().find(|v| v.name() == Some(name))
    }

    pub fn var_names(&self) -> Vec<&str> {
        self.vars.iter().filter_map(|v| v.name()).collect()
    }

    pub fn first_var(&self) -> Option<&LabeledArray> {
        self.vars.first()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Union of variable dimensions, in first-seen order.
    pub fn dims(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for v in &self.vars {
            for d in v.dims() {
                if !out.contains(d) {
                    out.push(d.clone());
                }
            }
        }
        out
    }

    pub fn has_dim(&self, dim: &str) -> bool {
        self.vars.iter().any(|v| v.has_dim(dim))
    }

    pub fn attrs(&self) -> &BTreeMap<String, AttrValue> {
        &self.attrs
    }

    pub fn attr(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.get(key)
    }

    /// Apply `f` to every variable.
    pub fn try_map<F>(&self, mut f: F) -> Result<Self>
    where
        F: FnMut(&LabeledArray) -> Result<LabeledArray>,
    {
        let mut vars = Vec::with_capacity(self.vars.len());
        for v in &self.vars {
            vars.push(f(v)?);
        }
        Ok(Self {
            vars,
            attrs: self.attrs.clone(),
        })
    }

    /// `isel` on every variable carrying `dim`.
    pub fn isel(&self, dim: &str, index: usize) -> Result<Self> {
        self.try_map(|v| {
            if v.has_dim(dim) {
                v.isel(dim, index)
            } else {
                Ok(v.clone())
            }
        })
    }
}

/// One named input: an array or a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Entry {
    Array(LabeledArray),
    Table(LabeledTable),
}

impl Entry {
    pub fn dims(&self) -> Vec<String> {
        match self {
            Entry::Array(a) => a.dims().to_vec(),
            Entry::Table(t) => t.dims(),
        }
    }

    pub fn has_dim(&self, dim: &str) -> bool {
        match self {
            Entry::Array(a) => a.has_dim(dim),
            Entry::Table(t) => t.has_dim(dim),
        }
    }

    pub fn attrs(&self) -> &BTreeMap<String, AttrValue> {
        match self {
            Entry::Array(a) => a.attrs(),
            Entry::Table(t) => t.attrs(),
        }
    }

    pub fn is_table(&self) -> bool {
        matches!(self, Entry::Table(_))
    }

    pub fn as_array(&self) -> Option<&LabeledArray> {
        match self {
            Entry::Array(a) => Some(a),
            Entry::Table(_) => None,
        }
    }

    pub fn as_table(&self) -> Option<&LabeledTable> {
        match self {
            Entry::Table(t) => Some(t),
            Entry::Array(_) => None,
        }
    }

    /// The array itself, or the first variable of a table.
    pub fn first_array(&self) -> Option<&LabeledArray> {
        match self {
            Entry::Array(a) => Some(a),
            Entry::Table(t) => t.first_var(),
        }
    }

    pub fn try_map<F>(&self, mut f: F) -> Result<Entry>
    where
        F: FnMut(&LabeledArray) -> Result<LabeledArray>,
    {
        match self {
            Entry::Array(a) => Ok(Entry::Array(f(a)?)),
            Entry::Table(t) => Ok(Entry::Table(t.try_map(f)?)),
        }
    }
}

impl From<LabeledArray> for Entry {
    fn from(a: LabeledArray) -> Self {
        Entry::Array(a)
    }
}

impl From<LabeledTable> for Entry {
    fn from(t: LabeledTable) -> Self {
        Entry::Table(t)
    }
}

/// What a chart function accepts: a bare array, a bare table, or a mapping
/// of names to either.
#[derive(Debug, Clone, PartialEq)]
pub enum DataInput {
    Array(LabeledArray),
    Table(LabeledTable),
    Named(Vec<(String, Entry)>),
}

impl DataInput {
    /// Normalize into the mapping form. Bare input gets the sentinel key.
    pub fn into_named(self) -> NamedData {
        match self {
            DataInput::Array(a) => NamedData {
                entries: vec![(NO_LABEL.to_string(), Entry::Array(a))],
                bare: true,
            },
            DataInput::Table(t) => NamedData {
                entries: vec![(NO_LABEL.to_string(), Entry::Table(t))],
                bare: true,
            },
            DataInput::Named(entries) => NamedData {
                entries,
                bare: false,
            },
        }
    }
}

impl From<LabeledArray> for DataInput {
    fn from(a: LabeledArray) -> Self {
        DataInput::Array(a)
    }
}

impl From<LabeledTable> for DataInput {
    fn from(t: LabeledTable) -> Self {
        DataInput::Table(t)
    }
}

impl From<Entry> for DataInput {
    fn from(e: Entry) -> Self {
        match e {
            Entry::Array(a) => DataInput::Array(a),
            Entry::Table(t) => DataInput::Table(t),
        }
    }
}

impl From<Vec<(String, Entry)>> for DataInput {
    fn from(v: Vec<(String, Entry)>) -> Self {
        DataInput::Named(v)
    }
}

impl<E: Into<Entry>> From<Vec<(&str, E)>> for DataInput {
    fn from(v: Vec<(&str, E)>) -> Self {
        DataInput::Named(v.into_iter().map(|(k, e)| (k.to_string(), e.into())).collect())
    }
}

impl From<BTreeMap<String, Entry>> for DataInput {
    fn from(m: BTreeMap<String, Entry>) -> Self {
        DataInput::Named(m.into_iter().collect())
    }
}

/// Normalized input: ordered named entries plus whether the caller passed
/// bare data.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedData {
    pub entries: Vec<(String, Entry)>,
    pub bare: bool,
}

impl NamedData {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, e)| e)
    }

    /// First entry; every chart derives its labels from it.
    pub fn first(&self) -> Result<&Entry> {
        self.entries
            .first()
            .map(|(_, e)| e)
            .ok_or_else(|| PlotError::value("no data to plot"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> LabeledArray {
        // 2 x 3, values 0..6
        LabeledArray::new(&["y", "x"], &[2, 3], (0..6).map(|v| v as f64).collect())
            .unwrap()
            .with_coord("x", vec![10.0, 20.0, 30.0])
            .unwrap()
            .with_coord("y", vec!["a", "b"])
            .unwrap()
    }

    #[test]
    fn new_rejects_mismatched_shape() {
        assert!(LabeledArray::new(&["x"], &[3], vec![1.0, 2.0]).is_err());
        assert!(LabeledArray::new(&["x", "x"], &[1, 1], vec![1.0]).is_err());
    }

    #[test]
    fn deserialized_arrays_are_checked() {
        let bad = r#"{"name": "tas", "dims": ["lat", "lon"], "shape": [2, 3], "values": [1.0]}"#;
        let err = serde_json::from_str::<LabeledArray>(bad).unwrap_err();
        assert!(err.to_string().contains("needs 6 values"));

        let short_coord = r#"{"dims": ["x"], "shape": [2], "values": [1.0, 2.0],
            "coords": {"x": {"dims": ["x"], "values": {"Float": [1.0]}}}}"#;
        assert!(serde_json::from_str::<LabeledArray>(short_coord).is_err());

        let a = grid().named("tas").with_attr("units", "K");
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(serde_json::from_str::<LabeledArray>(&json).unwrap(), a);
    }

    #[test]
    fn isel_drops_dim_and_keeps_scalar_coord() {
        let a = grid();
        let row = a.isel("y", 1).unwrap();
        assert_eq!(row.dims(), &["x".to_string()]);
        assert_eq!(row.values(), &[3.0, 4.0, 5.0]);
        assert_eq!(
            row.scalar_coord("y").and_then(|c| c.label(0)),
            Some("b".to_string())
        );
    }

    #[test]
    fn sel_by_label_and_take() {
        let a = grid();
        let col = a.sel("x", "20").unwrap();
        assert_eq!(col.values(), &[1.0, 4.0]);
        let t = a.take("x", &[2, 0]).unwrap();
        assert_eq!(t.values(), &[2.0, 0.0, 5.0, 3.0]);
        assert_eq!(t.coord_f64("x"), vec![30.0, 10.0]);
    }

    #[test]
    fn transpose_and_get() {
        let a = grid();
        let t = a.transpose(&["x", "y"]).unwrap();
        assert_eq!(t.shape(), &[3, 2]);
        assert_eq!(t.values(), &[0.0, 3.0, 1.0, 4.0, 2.0, 5.0]);
        assert_eq!(t.get(&[2, 1]), Some(5.0));
    }

    #[test]
    fn squeeze_and_nan_aware_extrema() {
        let a = LabeledArray::new(&["time", "lat"], &[3, 1], vec![1.0, f64::NAN, -2.0]).unwrap();
        let s = a.squeeze();
        assert_eq!(s.dims(), &["time".to_string()]);
        assert_eq!(s.min(), Some(-2.0));
        assert_eq!(s.max(), Some(1.0));
    }

    #[test]
    fn table_dims_union_and_replace() {
        let t = LabeledTable::new()
            .with_var("a", LabeledArray::from_vec("time", vec![1.0]))
            .with_var("b", LabeledArray::from_vec("lat", vec![1.0]))
            .with_var("a", LabeledArray::from_vec("time", vec![2.0]));
        assert_eq!(t.len(), 2);
        assert_eq!(t.dims(), vec!["time".to_string(), "lat".to_string()]);
        assert_eq!(t.var("a").unwrap().values(), &[2.0]);
    }

    #[test]
    fn bare_input_gets_sentinel() {
        let named = DataInput::from(LabeledArray::from_vec("time", vec![1.0])).into_named();
        assert!(named.bare);
        assert_eq!(named.keys().collect::<Vec<_>>(), vec![NO_LABEL]);
    }
}
