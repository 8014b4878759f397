use crate::model::entity_type::EntityType;
use crate::model::id::Id;
use serde_json::Value;

/// Renders an id as it appears between the parentheses of a resource path.
/// Numbers stay bare, text is single-quoted with `'` doubled and percent-encoded.
pub fn quote_id(id: &Value) -> String {
    match id {
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", urlencoding::encode(&s.replace('\'', "''"))),
        other => format!("'{}'", urlencoding::encode(&other.to_string())),
    }
}

pub fn self_link(service_root: &str, entity_type: EntityType, id: &Value) -> String {
    format!("{}/{}({})", service_root.trim_end_matches('/'), entity_type.plural(), quote_id(id))
}

pub fn self_link_for(service_root: &str, entity_type: EntityType, id: &Id) -> String {
    self_link(service_root, entity_type, &id.to_json())
}
