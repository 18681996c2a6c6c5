//! Coordinate helpers: bounding boxes and great-circle distance.

use crate::models::Coordinate;

/// Mean Earth radius in miles.
pub const EARTH_RADIUS_MILES: f64 = 3959.0;

/// Calculate the distance between two points in miles using the Haversine formula.
pub fn distance_miles(a: Coordinate, b: Coordinate) -> f64 {
    let lat1_rad = a.lat.to_radians();
    let lat2_rad = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_MILES * c
}

/// An axis-aligned box in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lng: f64,
    pub max_lat: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    /// Square box extending `half_width` degrees from `center` in every direction.
    pub fn around(center: Coordinate, half_width: f64) -> Self {
        Self {
            min_lat: center.lat - half_width,
            min_lng: center.lng - half_width,
            max_lat: center.lat + half_width,
            max_lng: center.lng + half_width,
        }
    }

    /// Overpass QL bbox filter order: south, west, north, east.
    pub fn to_overpass(&self) -> String {
        format!(
            "{},{},{},{}",
            self.min_lat, self.min_lng, self.max_lat, self.max_lng
        )
    }
}
