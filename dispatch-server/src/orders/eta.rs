//! Coarse ETA estimator
//!
//! The angular distance between two points (degrees) is scaled to km at
//! ~111 km per degree and divided by a constant 30 km/h. Not a routing
//! engine; only monotonicity in angular distance is relied on.

use shared::order::Coordinates;

const KM_PER_DEGREE: f64 = 111.0;
const AVERAGE_SPEED_KMH: f64 = 30.0;

/// Estimated minutes to travel from `from` to `to`
pub fn estimate_minutes(from: Coordinates, to: Coordinates) -> f64 {
    let d_lat = to.latitude - from.latitude;
    let d_lon = to.longitude - from.longitude;
    let distance_km = d_lat.hypot(d_lon) * KM_PER_DEGREE;
    distance_km / AVERAGE_SPEED_KMH * 60.0
}
