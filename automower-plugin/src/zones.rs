//! Garden zones and nearest-zone lookup

use automower_api::Position;
use serde::{Deserialize, Serialize};

const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Label used when the location cannot be determined
pub const UNKNOWN_ZONE: &str = "Unknown";

/// A named point in the garden
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Zone {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
        }
    }

    fn is_valid(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// Great-circle distance in kilometres
pub fn distance_km(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lat1, lon1) = (a.0.to_radians(), a.1.to_radians());
    let (lat2, lon2) = (b.0.to_radians(), b.1.to_radians());

    let h = ((lat2 - lat1) / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * ((lon2 - lon1) / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

pub fn nearest_zone<'a>(position: Position, zones: &'a [Zone]) -> Option<&'a Zone> {
    let here = (position.latitude, position.longitude);
    zones
        .iter()
        .filter(|z| z.is_valid())
        .min_by(|a, b| {
            distance_km(here, (a.latitude, a.longitude))
                .total_cmp(&distance_km(here, (b.latitude, b.longitude)))
        })
}

/// Name of the zone the mower is in, or [`UNKNOWN_ZONE`]
pub fn zone_label(position: Option<Position>, zones: &[Zone]) -> String {
    position
        .and_then(|p| nearest_zone(p, zones))
        .map(|z| z.name.clone())
        .unwrap_or_else(|| UNKNOWN_ZONE.to_string())
}
