use sensorlink::model::NamedEntity;
use sensorlink::{CustomLinks, EntityType, LinkPattern};
use serde_json::{json, Map, Value};

const ROOT: &str = "https://sensors.example.com/v1.1";

fn doc(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

#[test]
fn thing_properties_gain_links_to_related_entities() {
    let resolver = CustomLinks::new(LinkPattern::default(), true, 5);
    let mut thing = NamedEntity::new(EntityType::Thing, "weather station").with_properties(doc(json!({
        "owner.Task@iot.id": "a-1",
        "mount": {"pole.Location@iot.id": 12, "note": "north side"},
        "installed": "2024-03-01"
    })));

    resolver.expand_entity(&mut thing, ROOT);
    assert_eq!(
        thing.properties.clone().map(Value::Object),
        Some(json!({
            "owner.Task@iot.id": "a-1",
            "mount": {
                "pole.Location@iot.id": 12,
                "note": "north side",
                "pole.Location@iot.navigationLink": "https://sensors.example.com/v1.1/Locations(12)"
            },
            "installed": "2024-03-01",
            "owner.Task@iot.navigationLink": "https://sensors.example.com/v1.1/Tasks('a-1')"
        }))
    );

    resolver.clean_entity(&mut thing);
    assert_eq!(
        thing.properties.map(Value::Object),
        Some(json!({
            "owner.Task@iot.id": "a-1",
            "mount": {"pole.Location@iot.id": 12, "note": "north side"},
            "installed": "2024-03-01"
        }))
    );
}

#[test]
fn restricted_pattern_ignores_other_types() {
    let resolver = CustomLinks::new(LinkPattern::new([EntityType::Sensor]), true, 0);
    let mut properties = doc(json!({"a.Sensor@iot.id": 1, "b.Thing@iot.id": 2, "c.Unknown@iot.id": 3}));
    resolver.expand(&mut properties, ROOT, 0);
    assert!(properties.contains_key("a.Sensor@iot.navigationLink"));
    assert!(!properties.contains_key("b.Thing@iot.navigationLink"));
    assert!(!properties.contains_key("c.Unknown@iot.navigationLink"));
}

#[test]
fn pattern_reports_entity_type_of_key() {
    let pattern = LinkPattern::default();
    assert_eq!(pattern.type_for_custom_link_name("my.home.Thing"), Some(EntityType::Thing));
    assert_eq!(pattern.type_for_custom_link_name("home.thing"), None);
    assert_eq!(pattern.type_for_custom_link_name("Thing"), None);
}
