use geo::{Area, Coord, LineString, Polygon};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Geographic point in degrees, WGS 84 axis order on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn validate(&self) -> Result<(), AppError> {
        if !self.latitude.is_finite() || !self.longitude.is_finite() {
            return Err(AppError::Validation(
                "coordinates must be finite numbers".into(),
            ));
        }

        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(AppError::Validation(format!(
                "latitude {} out of range [-90, 90]",
                self.latitude
            )));
        }

        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(AppError::Validation(format!(
                "longitude {} out of range [-180, 180]",
                self.longitude
            )));
        }

        Ok(())
    }
}

/// Checks that a vertex list forms a usable closed geofence ring.
///
/// The ring is implicitly closed; an explicit closing vertex equal to the
/// first is accepted. At least 3 distinct vertices must remain and the
/// ring must enclose a non-zero area.
pub fn validate_geofence(vertices: &[GeoPoint]) -> Result<(), AppError> {
    for vertex in vertices {
        vertex.validate()?;
    }

    let ring = match vertices {
        [first, .., last] if first == last => &vertices[..vertices.len() - 1],
        other => other,
    };

    let mut distinct: Vec<GeoPoint> = Vec::with_capacity(ring.len());
    for vertex in ring {
        if !distinct.contains(vertex) {
            distinct.push(*vertex);
        }
    }

    if distinct.len() < 3 {
        return Err(AppError::Validation(
            "geofence needs at least 3 distinct vertices".into(),
        ));
    }

    let exterior = LineString::from(
        ring.iter()
            .map(|vertex| Coord {
                x: vertex.longitude,
                y: vertex.latitude,
            })
            .collect::<Vec<_>>(),
    );

    if Polygon::new(exterior, vec![]).unsigned_area() == 0.0 {
        return Err(AppError::Validation("geofence encloses no area".into()));
    }

    Ok(())
}
