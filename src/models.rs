use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::registry::Location;

/// The two services tracked per monitored street. Behavior differences
/// (keywords, icon, label) live in the lookup methods rather than in
/// separate sensor types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    Water,
    Heat,
}

impl ServiceType {
    pub const ALL: [ServiceType; 2] = [ServiceType::Water, ServiceType::Heat];

    /// Substrings that mark an interruption notice as concerning this
    /// service. Lowercase, both diacritic and plain spellings.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            ServiceType::Water => &["apă", "apa", "apei", "apă potabilă"],
            ServiceType::Heat => &["căldură", "caldura", "caldurii", "încălzire", "incalzire"],
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            ServiceType::Water => "mdi:water-pump",
            ServiceType::Heat => "mdi:radiator",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ServiceType::Water => "water",
            ServiceType::Heat => "heat",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceStatus {
    Unknown,
    Normal,
    Interrupted,
    #[serde(rename = "Connection error")]
    ConnectionError,
    Timeout,
    #[serde(rename = "Site error")]
    SiteError,
}

impl ServiceStatus {
    /// Network/site failures clear the availability flag; matching
    /// outcomes keep the sensor available.
    pub fn is_available(&self) -> bool {
        matches!(self, ServiceStatus::Normal | ServiceStatus::Interrupted)
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceStatus::Unknown => "Unknown",
            ServiceStatus::Normal => "Normal",
            ServiceStatus::Interrupted => "Interrupted",
            ServiceStatus::ConnectionError => "Connection error",
            ServiceStatus::Timeout => "Timeout",
            ServiceStatus::SiteError => "Site error",
        };
        f.write_str(s)
    }
}

/// One exposed sensor: the state of one service for one monitored street.
#[derive(Debug, Clone, Serialize)]
pub struct SensorReading {
    pub sensor_id: String,
    pub location_id: String,
    pub street: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    pub service: ServiceType,
    pub status: ServiceStatus,
    pub available: bool,
    pub icon: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

pub fn sensor_id(location_id: &str, service: ServiceType) -> String {
    format!("termo_{}_{}", service.label(), location_id)
}

pub struct MonitorState {
    pub locations: HashMap<String, Location>,
    pub sensors: HashMap<String, SensorReading>,
}

impl MonitorState {
    pub fn new() -> Self {
        Self {
            locations: HashMap::new(),
            sensors: HashMap::new(),
        }
    }

    /// Inserts the location and its two sensors, all in `Unknown` state
    /// until the first polling cycle reaches them.
    pub fn add_location(&mut self, location: Location) {
        for service in ServiceType::ALL {
            let id = sensor_id(&location.id, service);
            self.sensors.insert(
                id.clone(),
                SensorReading {
                    sensor_id: id,
                    location_id: location.id.clone(),
                    street: location.street.clone(),
                    zone: location.zone.map(|z| z.to_string()),
                    service,
                    status: ServiceStatus::Unknown,
                    available: true,
                    icon: service.icon(),
                    last_update: None,
                    period: None,
                    detail: None,
                },
            );
        }
        self.locations.insert(location.id.clone(), location);
    }

    /// Removes the location and both of its sensors. Returns false if the
    /// id was not registered.
    pub fn remove_location(&mut self, location_id: &str) -> bool {
        if self.locations.remove(location_id).is_none() {
            return false;
        }
        for service in ServiceType::ALL {
            self.sensors.remove(&sensor_id(location_id, service));
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Location;

    fn location(street: &str) -> Location {
        Location {
            id: crate::registry::location_id(street, None),
            street: street.to_string(),
            zone: None,
            title: format!("Termoenergetica - {street}"),
        }
    }

    #[test]
    fn add_location_creates_one_sensor_per_service() {
        let mut state = MonitorState::new();
        state.add_location(location("Calea Victoriei"));

        assert_eq!(state.locations.len(), 1);
        assert_eq!(state.sensors.len(), 2);
        assert!(state.sensors.contains_key("termo_water_calea_victoriei"));
        assert!(state.sensors.contains_key("termo_heat_calea_victoriei"));
        for sensor in state.sensors.values() {
            assert_eq!(sensor.status, ServiceStatus::Unknown);
            assert!(sensor.last_update.is_none());
        }
    }

    #[test]
    fn remove_location_drops_both_sensors() {
        let mut state = MonitorState::new();
        state.add_location(location("Calea Victoriei"));
        state.add_location(location("Strada Lunga"));

        assert!(state.remove_location("calea_victoriei"));
        assert_eq!(state.locations.len(), 1);
        assert_eq!(state.sensors.len(), 2);
        assert!(!state.remove_location("calea_victoriei"));
    }

    #[test]
    fn sensor_ids_are_distinct_across_streets_and_services() {
        let ids = [
            sensor_id("calea_victoriei", ServiceType::Water),
            sensor_id("calea_victoriei", ServiceType::Heat),
            sensor_id("strada_lunga", ServiceType::Water),
            sensor_id("strada_lunga", ServiceType::Heat),
        ];
        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn status_strings_match_the_exposed_vocabulary() {
        assert_eq!(ServiceStatus::ConnectionError.to_string(), "Connection error");
        assert_eq!(ServiceStatus::SiteError.to_string(), "Site error");
        assert_eq!(
            serde_json::to_value(ServiceStatus::ConnectionError).unwrap(),
            serde_json::json!("Connection error")
        );
    }
}
