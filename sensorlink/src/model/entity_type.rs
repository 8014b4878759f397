use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed catalog of entity kinds served by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityType {
    Actuator,
    Datastream,
    FeatureOfInterest,
    HistoricalLocation,
    Location,
    MultiDatastream,
    Observation,
    ObservedProperty,
    Sensor,
    Task,
    TaskingCapability,
    Thing,
}

impl EntityType {
    pub const ALL: [EntityType; 12] = [
        EntityType::Actuator,
        EntityType::Datastream,
        EntityType::FeatureOfInterest,
        EntityType::HistoricalLocation,
        EntityType::Location,
        EntityType::MultiDatastream,
        EntityType::Observation,
        EntityType::ObservedProperty,
        EntityType::Sensor,
        EntityType::Task,
        EntityType::TaskingCapability,
        EntityType::Thing,
    ];

    pub fn entity_name(&self) -> &'static str {
        match self {
            EntityType::Actuator => "Actuator",
            EntityType::Datastream => "Datastream",
            EntityType::FeatureOfInterest => "FeatureOfInterest",
            EntityType::HistoricalLocation => "HistoricalLocation",
            EntityType::Location => "Location",
            EntityType::MultiDatastream => "MultiDatastream",
            EntityType::Observation => "Observation",
            EntityType::ObservedProperty => "ObservedProperty",
            EntityType::Sensor => "Sensor",
            EntityType::Task => "Task",
            EntityType::TaskingCapability => "TaskingCapability",
            EntityType::Thing => "Thing",
        }
    }

    /// Collection name used in resource paths.
    pub fn plural(&self) -> &'static str {
        match self {
            EntityType::Actuator => "Actuators",
            EntityType::Datastream => "Datastreams",
            EntityType::FeatureOfInterest => "FeaturesOfInterest",
            EntityType::HistoricalLocation => "HistoricalLocations",
            EntityType::Location => "Locations",
            EntityType::MultiDatastream => "MultiDatastreams",
            EntityType::Observation => "Observations",
            EntityType::ObservedProperty => "ObservedProperties",
            EntityType::Sensor => "Sensors",
            EntityType::Task => "Tasks",
            EntityType::TaskingCapability => "TaskingCapabilities",
            EntityType::Thing => "Things",
        }
    }

    /// Case-sensitive lookup by singular name.
    pub fn from_name(name: &str) -> Option<EntityType> {
        EntityType::ALL.iter().copied().find(|t| t.entity_name() == name)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.entity_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_roundtrip_through_lookup() {
        for t in EntityType::ALL {
            assert_eq!(EntityType::from_name(t.entity_name()), Some(t));
        }
    }

    #[test]
    fn lookup_is_case_sensitive() {
        assert_eq!(EntityType::from_name("datastream"), None);
        assert_eq!(EntityType::from_name("Datastreams"), None);
    }

    #[test]
    fn irregular_plurals() {
        assert_eq!(EntityType::FeatureOfInterest.plural(), "FeaturesOfInterest");
        assert_eq!(EntityType::ObservedProperty.plural(), "ObservedProperties");
        assert_eq!(EntityType::TaskingCapability.plural(), "TaskingCapabilities");
    }
}
