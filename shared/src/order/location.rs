//! Provider position reports and live tracking updates

use super::types::{Coordinates, Location};
use serde::{Deserialize, Serialize};

/// Provider position report (append-only, server-assigned timestamp)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLocation {
    pub id: String,
    pub order_id: String,
    pub provider_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: i64,
}

impl OrderLocation {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    pub fn to_location(&self) -> Location {
        Location::at(self.latitude, self.longitude)
    }
}

/// One message of the Track stream
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocationUpdate {
    pub order_id: String,
    pub provider_id: String,
    pub current_location: Location,
    pub estimated_arrival_minutes: f64,
    pub timestamp: i64,
}
