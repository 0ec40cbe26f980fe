//! Coordinates and distance calculations

#[allow(deprecated)]
use geo::HaversineDistance;
use geo::Point;
use serde::{Deserialize, Serialize};

/// Mean earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// WGS84 coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

impl Coord {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// `[lon, lat]`, the axis order used by the spatial index
    #[inline]
    pub fn to_lon_lat(self) -> [f64; 2] {
        [self.lon, self.lat]
    }
}

/// Distance model used by heuristics and overlay geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceCalc {
    /// Great-circle (haversine) distance
    #[default]
    Earth,
    /// Equirectangular projection, cheaper and accurate over short distances
    Plane,
}

impl DistanceCalc {
    #[inline]
    pub fn distance(&self, a: Coord, b: Coord) -> f64 {
        match self {
            DistanceCalc::Earth => haversine_distance(a, b),
            DistanceCalc::Plane => plane_distance(a, b),
        }
    }

    pub fn polyline_length(&self, points: &[Coord]) -> f64 {
        points.windows(2).map(|w| self.distance(w[0], w[1])).sum()
    }
}

#[allow(deprecated)]
pub fn haversine_distance(a: Coord, b: Coord) -> f64 {
    let p1 = Point::new(a.lon, a.lat);
    let p2 = Point::new(b.lon, b.lat);
    p1.haversine_distance(&p2)
}

pub fn plane_distance(a: Coord, b: Coord) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let left = ((a.lat + b.lat) / 2.0).to_radians().cos() * d_lon;
    EARTH_RADIUS_M * (d_lat * d_lat + left * left).sqrt()
}

/// Project `p` onto segment `a`-`b`.
///
/// Works in a local frame where longitude is scaled by the cosine of the
/// segment's mid latitude. Returns the projected point and the clamped
/// segment parameter `t` in `[0, 1]`.
pub fn project_onto_segment(p: Coord, a: Coord, b: Coord) -> (Coord, f64) {
    let scale_x = ((a.lat + b.lat) / 2.0).to_radians().cos();

    let dx = (b.lon - a.lon) * scale_x;
    let dy = b.lat - a.lat;
    let len_sq = dx * dx + dy * dy;

    if len_sq < 1e-24 {
        // Degenerate segment
        return (a, 0.0);
    }

    let t = (((p.lon - a.lon) * scale_x * dx + (p.lat - a.lat) * dy) / len_sq).clamp(0.0, 1.0);
    let projected = Coord::new(a.lat + t * (b.lat - a.lat), a.lon + t * (b.lon - a.lon));
    (projected, t)
}
