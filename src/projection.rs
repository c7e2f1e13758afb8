//! Map projections and data transforms for the map charts.
//!
//! Map charts draw in the plane of a target [`Projection`]. Data coordinates
//! are interpreted in a source projection (the *transform*): geographic
//! longitude/latitude for `lat`/`lon` grids, a rotated-pole system for
//! `rlat`/`rlon` grids.

use serde::{Deserialize, Serialize};

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::models::{Entry, LabeledArray};
use crate::options::Kwargs;

/// Sphere radius used by the conic projection, in metres.
const EARTH_RADIUS: f64 = 6_370_997.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Projection {
    /// Longitude/latitude as plane coordinates.
    PlateCarree,
    /// Spherical Lambert conformal conic.
    LambertConformal {
        central_longitude: f64,
        central_latitude: f64,
        standard_parallels: (f64, f64),
    },
    /// Coordinates on a sphere whose north pole is moved to
    /// (`pole_longitude`, `pole_latitude`).
    RotatedPole {
        pole_longitude: f64,
        pole_latitude: f64,
        central_rotated_longitude: f64,
    },
}

impl Default for Projection {
    fn default() -> Self {
        Projection::lambert_conformal()
    }
}

impl Projection {
    /// Lambert conformal conic with the usual North American defaults.
    pub fn lambert_conformal() -> Self {
        Projection::LambertConformal {
            central_longitude: -96.0,
            central_latitude: 39.0,
            standard_parallels: (33.0, 45.0),
        }
    }

    pub fn rotated_pole(pole_longitude: f64, pole_latitude: f64) -> Self {
        Projection::RotatedPole {
            pole_longitude,
            pole_latitude,
            central_rotated_longitude: 0.0,
        }
    }

    /// Geographic (lon, lat) in degrees to plane coordinates. `None` where
    /// the projection is undefined.
    pub fn project(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        if !lon.is_finite() || !lat.is_finite() {
            return None;
        }
        match *self {
            Projection::PlateCarree => Some((lon, lat)),
            Projection::LambertConformal { .. } => {
                let c = LambertConstants::of(self)?;
                let phi = lat.to_radians();
                let t = (std::f64::consts::FRAC_PI_4 + phi / 2.0).tan();
                if t <= 0.0 || !t.is_finite() {
                    return None;
                }
                let rho = EARTH_RADIUS * c.f / t.powf(c.n);
                let theta = c.n * wrap_degrees(lon - c.lon0).to_radians();
                Some((rho * theta.sin(), c.rho0 - rho * theta.cos()))
            }
            Projection::RotatedPole {
                pole_longitude,
                pole_latitude,
                central_rotated_longitude,
            } => {
                let (rlon, rlat) = geographic_to_rotated(lon, lat, pole_longitude, pole_latitude);
                Some((wrap_degrees(rlon + central_rotated_longitude), rlat))
            }
        }
    }

    /// Plane coordinates back to geographic (lon, lat) in degrees.
    pub fn to_geographic(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        match *self {
            Projection::PlateCarree => Some((x, y)),
            Projection::LambertConformal { .. } => {
                let c = LambertConstants::of(self)?;
                let sign = c.n.signum();
                let dy = c.rho0 - y;
                let rho = sign * (x * x + dy * dy).sqrt();
                let theta = (sign * x).atan2(sign * dy);
                let lat = if rho == 0.0 {
                    sign * 90.0
                } else {
                    (2.0 * (EARTH_RADIUS * c.f / rho).powf(1.0 / c.n).atan()
                        - std::f64::consts::FRAC_PI_2)
                        .to_degrees()
                };
                Some((wrap_degrees(c.lon0 + (theta / c.n).to_degrees()), lat))
            }
            Projection::RotatedPole {
                pole_longitude,
                pole_latitude,
                central_rotated_longitude,
            } => Some(rotated_to_geographic(
                x - central_rotated_longitude,
                y,
                pole_longitude,
                pole_latitude,
            )),
        }
    }

    /// Move a point from `source` plane coordinates into this projection.
    pub fn transform_from(&self, source: &Projection, x: f64, y: f64) -> Option<(f64, f64)> {
        if source == self {
            return Some((x, y));
        }
        let (lon, lat) = source.to_geographic(x, y)?;
        self.project(lon, lat)
    }

    /// Plane bounding box of a rectangle given in `source` coordinates,
    /// sampled along its edges.
    pub fn extent_from(&self, source: &Projection, extent: [f64; 4]) -> Option<((f64, f64), (f64, f64))> {
        const STEPS: usize = 32;
        let [x0, x1, y0, y1] = extent;
        let mut pts = Vec::with_capacity(STEPS * 4);
        for i in 0..=STEPS {
            let f = i as f64 / STEPS as f64;
            let x = x0 + (x1 - x0) * f;
            let y = y0 + (y1 - y0) * f;
            pts.extend([(x, y0), (x, y1), (x0, y), (x1, y)]);
        }
        let projected: Vec<(f64, f64)> = pts
            .into_iter()
            .filter_map(|(x, y)| self.transform_from(source, x, y))
            .collect();
        let fold = |sel: fn(&(f64, f64)) -> f64| {
            projected.iter().map(sel).fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            })
        };
        let (xs, ys) = (fold(|p| p.0), fold(|p| p.1));
        (xs.0.is_finite() && ys.0.is_finite()).then_some((xs, ys))
    }
}

struct LambertConstants {
    n: f64,
    f: f64,
    rho0: f64,
    lon0: f64,
}

impl LambertConstants {
    fn of(p: &Projection) -> Option<Self> {
        let Projection::LambertConformal {
            central_longitude,
            central_latitude,
            standard_parallels: (sp1, sp2),
        } = *p
        else {
            return None;
        };
        let (p1, p2, p0) = (sp1.to_radians(), sp2.to_radians(), central_latitude.to_radians());
        let tq = |phi: f64| (std::f64::consts::FRAC_PI_4 + phi / 2.0).tan();
        let n = if (sp1 - sp2).abs() < 1e-10 {
            p1.sin()
        } else {
            (p1.cos() / p2.cos()).ln() / (tq(p2) / tq(p1)).ln()
        };
        if n == 0.0 || !n.is_finite() {
            return None;
        }
        let f = p1.cos() * tq(p1).powf(n) / n;
        let rho0 = EARTH_RADIUS * f / tq(p0).powf(n);
        Some(Self {
            n,
            f,
            rho0,
            lon0: central_longitude,
        })
    }
}

fn wrap_degrees(lon: f64) -> f64 {
    let w = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if w == -180.0 && lon > 0.0 { 180.0 } else { w }
}

/// Rotated (lon, lat) to geographic (lon, lat), all in degrees.
pub fn rotated_to_geographic(rlon: f64, rlat: f64, pole_lon: f64, pole_lat: f64) -> (f64, f64) {
    let (lam, phi) = (rlon.to_radians(), rlat.to_radians());
    let (lam_p, phi_p) = (pole_lon.to_radians(), pole_lat.to_radians());
    let lat = (phi_p.sin() * phi.sin() + phi_p.cos() * phi.cos() * lam.cos()).clamp(-1.0, 1.0).asin();
    let lon = lam_p - std::f64::consts::PI
        + (phi.cos() * lam.sin()).atan2(phi_p.sin() * phi.cos() * lam.cos() - phi_p.cos() * phi.sin());
    (wrap_degrees(lon.to_degrees()), lat.to_degrees())
}

/// Geographic (lon, lat) to rotated (lon, lat), all in degrees.
pub fn geographic_to_rotated(lon: f64, lat: f64, pole_lon: f64, pole_lat: f64) -> (f64, f64) {
    let phi = lat.to_radians();
    let (lam_p, phi_p) = (pole_lon.to_radians(), pole_lat.to_radians());
    let d = lon.to_radians() - lam_p - std::f64::consts::PI;
    let rlat = (phi_p.sin() * phi.sin() - phi_p.cos() * phi.cos() * d.cos()).clamp(-1.0, 1.0).asin();
    let rlon = (phi.cos() * d.sin()).atan2(phi_p.sin() * phi.cos() * d.cos() + phi_p.cos() * phi.sin());
    (wrap_degrees(rlon.to_degrees()), rlat.to_degrees())
}

/// Rotated-pole transform from grid-mapping attributes.
///
/// The parameters are read from the array attributes, or from the variable
/// named by its `grid_mapping` attribute (default `rotated_pole`) when the
/// entry is a table.
pub fn rotated_pole_of(entry: &Entry, diags: &mut Diagnostics) -> Option<Projection> {
    let from_attrs = |a: &LabeledArray| {
        let lon = a.attr("grid_north_pole_longitude")?.as_f64()?;
        let lat = a.attr("grid_north_pole_latitude")?.as_f64()?;
        let central = a
            .attr("north_pole_grid_longitude")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        Some(Projection::RotatedPole {
            pole_longitude: lon,
            pole_latitude: lat,
            central_rotated_longitude: central,
        })
    };
    let found = match entry {
        Entry::Array(a) => from_attrs(a),
        Entry::Table(t) => {
            let mapping = t
                .first_var()
                .and_then(|v| v.attr_text("grid_mapping"))
                .unwrap_or_else(|| "rotated_pole".to_string());
            t.var(&mapping).and_then(from_attrs)
        }
    };
    if found.is_none() {
        diags.warn(
            DiagnosticKind::RotatedPoleNotFound,
            "Rotated pole not found. Specify a transform if necessary.",
        );
    }
    found
}

/// Source projection implied by the grid dimensions of `entry`.
pub fn infer_transform(entry: &Entry, diags: &mut Diagnostics) -> Option<Projection> {
    if entry.has_dim("lat") && entry.has_dim("lon") {
        Some(Projection::PlateCarree)
    } else if entry.has_dim("rlat") && entry.has_dim("rlon") {
        rotated_pole_of(entry, diags)
    } else {
        None
    }
}

/// Remove `xlim`/`ylim` from `plot_kw` and turn them into a map extent
/// `[x0, x1, y0, y1]` in transform coordinates. Both are required; when only
/// one is given both are dropped.
pub fn take_extent(plot_kw: &mut Kwargs, diags: &mut Diagnostics) -> Option<[f64; 4]> {
    let pair = |v: Option<serde_json::Value>| -> Option<(f64, f64)> {
        let arr = v?;
        let items = arr.as_array()?;
        match items.as_slice() {
            [a, b] => Some((a.as_f64()?, b.as_f64()?)),
            _ => None,
        }
    };
    let had_x = plot_kw.contains_key("xlim");
    let had_y = plot_kw.contains_key("ylim");
    let xlim = pair(plot_kw.remove("xlim"));
    let ylim = pair(plot_kw.remove("ylim"));
    match (xlim, ylim) {
        (Some((x0, x1)), Some((y0, y1))) => Some([x0, x1, y0, y1]),
        _ if had_x || had_y => {
            diags.warn(
                DiagnosticKind::ExtentDropped,
                "Requires both xlim and ylim with 'transform'. Xlim or ylim was dropped",
            );
            None
        }
        _ => None,
    }
}

/// Cell edges for a 1-D axis of cell centres: midpoints between neighbours,
/// extrapolated by half a step at both ends.
pub fn cell_edges(centres: &[f64]) -> Vec<f64> {
    match centres {
        [] => Vec::new(),
        [c] => vec![c - 0.5, c + 0.5],
        _ => {
            let n = centres.len();
            let mut edges = Vec::with_capacity(n + 1);
            edges.push(centres[0] - (centres[1] - centres[0]) / 2.0);
            edges.extend(centres.windows(2).map(|w| (w[0] + w[1]) / 2.0));
            edges.push(centres[n - 1] + (centres[n - 1] - centres[n - 2]) / 2.0);
            edges
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LabeledArray;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn rotated_origin_maps_to_pole_offset() {
        let (lon, lat) = rotated_to_geographic(0.0, 0.0, 83.0, 42.5);
        assert!(close(lon, -97.0), "{lon}");
        assert!(close(lat, 47.5), "{lat}");
        let (rlon, rlat) = geographic_to_rotated(lon, lat, 83.0, 42.5);
        assert!(close(rlon, 0.0) && close(rlat, 0.0), "{rlon} {rlat}");
    }

    #[test]
    fn lambert_centre_is_origin_and_inverts() {
        let p = Projection::lambert_conformal();
        let (x, y) = p.project(-96.0, 39.0).unwrap();
        assert!(x.abs() < 1e-6 && y.abs() < 1e-6);
        let (px, py) = p.project(-75.0, 45.5).unwrap();
        let (lon, lat) = p.to_geographic(px, py).unwrap();
        assert!(close(lon, -75.0) && close(lat, 45.5), "{lon} {lat}");
    }

    #[test]
    fn extent_needs_both_limits() {
        let mut d = Diagnostics::new();
        let mut kw = crate::options::kwargs(serde_json::json!({"xlim": [-80, -60], "cmap": "x"}));
        assert_eq!(take_extent(&mut kw, &mut d), None);
        assert!(d.has(DiagnosticKind::ExtentDropped));
        assert!(!kw.contains_key("xlim"));

        let mut kw = crate::options::kwargs(serde_json::json!({"xlim": [-80, -60], "ylim": [40, 50]}));
        assert_eq!(take_extent(&mut kw, &mut d), Some([-80.0, -60.0, 40.0, 50.0]));
    }

    #[test]
    fn transform_from_grid_dims() {
        let mut d = Diagnostics::new();
        let geo = LabeledArray::new(&["lat", "lon"], &[1, 1], vec![1.0]).unwrap();
        assert_eq!(infer_transform(&Entry::from(geo), &mut d), Some(Projection::PlateCarree));

        let rot = LabeledArray::new(&["rlat", "rlon"], &[1, 1], vec![1.0])
            .unwrap()
            .with_attr("grid_north_pole_longitude", 83.0)
            .with_attr("grid_north_pole_latitude", 42.5);
        assert_eq!(
            infer_transform(&Entry::from(rot), &mut d),
            Some(Projection::rotated_pole(83.0, 42.5))
        );
        assert!(d.is_empty());

        let bare = LabeledArray::new(&["rlat", "rlon"], &[1, 1], vec![1.0]).unwrap();
        assert_eq!(infer_transform(&Entry::from(bare), &mut d), None);
        assert!(d.has(DiagnosticKind::RotatedPoleNotFound));
    }

    #[test]
    fn edges_extrapolate() {
        assert_eq!(cell_edges(&[0.0, 1.0, 2.0]), vec![-0.5, 0.5, 1.5, 2.5]);
    }
}
