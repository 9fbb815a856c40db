use serde::{Deserialize, Serialize};

/// Mean Earth radius used for every distance in the dashboard.
pub const EARTH_RADIUS_MILES: f64 = 3959.0;

/// A point on the globe, in degrees.
///
/// Latitude and longitude are named fields so callers never have to guess the
/// order. Map layers that speak GeoJSON hand us `[lon, lat]`; use
/// [`Coordinates::from_geojson`] for those.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
  pub lat: f64,
  pub lon: f64,
}

impl Coordinates {
  pub fn new(lat: f64, lon: f64) -> Self {
    Self { lat, lon }
  }

  /// Builds coordinates from a GeoJSON position, which is `[lon, lat]`.
  pub fn from_geojson(position: [f64; 2]) -> Self {
    Self {
      lat: position[1],
      lon: position[0],
    }
  }

  pub fn to_geojson(self) -> [f64; 2] {
    [self.lon, self.lat]
  }

  /// Great-circle distance in miles (Haversine).
  pub fn distance_miles(&self, other: &Coordinates) -> f64 {
    let d_lat = (other.lat - self.lat).to_radians();
    let d_lon = (other.lon - self.lon).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
      + self.lat.to_radians().cos() * other.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_MILES * c
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const DENVER: Coordinates = Coordinates {
    lat: 39.7392,
    lon: -104.9903,
  };

  #[test]
  fn test_distance_to_self_is_zero() {
    assert_eq!(DENVER.distance_miles(&DENVER), 0.0);
  }

  #[test]
  fn test_distance_is_symmetric() {
    let points = [
      DENVER,
      Coordinates::new(39.7392, -104.9847),
      Coordinates::new(40.7128, -74.0060),
      Coordinates::new(-33.8688, 151.2093),
      Coordinates::new(0.0, 179.9),
      Coordinates::new(0.0, -179.9),
    ];

    for a in &points {
      for b in &points {
        let there = a.distance_miles(b);
        let back = b.distance_miles(a);
        assert!((there - back).abs() < 1e-9, "{:?} <-> {:?}", a, b);
      }
    }
  }

  #[test]
  fn test_short_hop_across_denver() {
    let distance = DENVER.distance_miles(&Coordinates::new(39.7392, -104.9847));
    assert!((distance - 0.2976).abs() < 0.001, "got {}", distance);
  }

  #[test]
  fn test_denver_to_new_york() {
    let distance = DENVER.distance_miles(&Coordinates::new(40.7128, -74.0060));
    assert!((distance - 1626.0).abs() < 10.0, "got {}", distance);
  }

  #[test]
  fn test_antimeridian_is_short() {
    let distance = Coordinates::new(0.0, 179.9).distance_miles(&Coordinates::new(0.0, -179.9));
    assert!(distance < 15.0, "got {}", distance);
  }

  #[test]
  fn test_geojson_order_is_lon_lat() {
    let point = Coordinates::from_geojson([-104.9903, 39.7392]);
    assert_eq!(point, DENVER);
    assert_eq!(point.to_geojson(), [-104.9903, 39.7392]);
  }
}
